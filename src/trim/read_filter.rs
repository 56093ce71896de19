use crate::common::{DiscardReason, ReadPair, Verdict, PHRED_OFFSET};

///////////////////////////////
/// Settings for the per-read length and quality checks
#[derive(Debug, Clone)]
pub struct FilterParams {
    /// Minimum reverse-read length after trimming
    pub min_length: usize,
    /// Trailing bases below this Phred score are removed
    pub min_quality: u8,
    /// Forward read must be at least this long to hold barcode and UMI
    pub forward_min_length: usize,
    /// Bases removed from the 5' end of the reverse read
    pub trimming_rv: usize,
}

///////////////////////////////
/// Length and quality filtering of one read pair. Checks short-circuit; the first failing check is the reason
#[derive(Debug, Clone)]
pub struct ReadFilter {
    params: FilterParams,
}

impl ReadFilter {
    pub fn new(params: FilterParams) -> ReadFilter {
        ReadFilter { params }
    }

    pub fn filter(&self, rp: &ReadPair) -> Verdict<ReadPair> {
        if rp.r1.len() < self.params.forward_min_length {
            return Verdict::Discarded(DiscardReason::TooShort);
        }

        let from = self.params.trimming_rv.min(rp.r2.len());
        let r2 = &rp.r2[from..];
        let q2 = &rp.q2[from.min(rp.q2.len())..];
        if r2.len() < self.params.min_length {
            return Verdict::Discarded(DiscardReason::TooShort);
        }

        let keep = trim_trailing_quality(q2, self.params.min_quality);
        if keep < self.params.min_length {
            return Verdict::Discarded(DiscardReason::LowQuality);
        }

        Verdict::Pass(rp.with_reverse(&r2[..keep], &q2[..keep]))
    }
}

///////////////////////////////
/// Length remaining once trailing bases with quality below the threshold are removed
pub fn trim_trailing_quality(qual: &[u8], min_quality: u8) -> usize {
    let mut keep = qual.len();
    while keep > 0 && qual[keep - 1].saturating_sub(PHRED_OFFSET) < min_quality {
        keep -= 1;
    }
    keep
}
