use super::PairId;

///////////////////////////////
/// Why a read was dropped by a stage. Never fatal; only counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscardReason {
    TooShort,
    LowQuality,
    Contaminant,
    NoMatch,
    AmbiguousBarcode,
    Chimeric,
    Unmapped,
    NoFeature,
    AmbiguousGene,
}

impl DiscardReason {
    pub const ALL: [DiscardReason; 9] = [
        DiscardReason::TooShort,
        DiscardReason::LowQuality,
        DiscardReason::Contaminant,
        DiscardReason::NoMatch,
        DiscardReason::AmbiguousBarcode,
        DiscardReason::Chimeric,
        DiscardReason::Unmapped,
        DiscardReason::NoFeature,
        DiscardReason::AmbiguousGene,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::TooShort => "too_short",
            DiscardReason::LowQuality => "low_quality",
            DiscardReason::Contaminant => "contaminant",
            DiscardReason::NoMatch => "no_match",
            DiscardReason::AmbiguousBarcode => "ambiguous_barcode",
            DiscardReason::Chimeric => "chimeric",
            DiscardReason::Unmapped => "unmapped",
            DiscardReason::NoFeature => "no_feature",
            DiscardReason::AmbiguousGene => "ambiguous_gene",
        }
    }
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///////////////////////////////
/// Outcome for one read at one stage. Every stage emits exactly one per input read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<T> {
    Pass(T),
    Discarded(DiscardReason),
    Deduplicated(PairId),
}

impl<T> Verdict<T> {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Verdict<U> {
        match self {
            Verdict::Pass(v) => Verdict::Pass(f(v)),
            Verdict::Discarded(reason) => Verdict::Discarded(reason),
            Verdict::Deduplicated(first) => Verdict::Deduplicated(first),
        }
    }
}
