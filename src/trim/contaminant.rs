use rustc_hash::FxHashMap;

use crate::common::{DiscardReason, PairId, ReadPair, Verdict};
use crate::engine::AlignmentRecord;

///////////////////////////////
/// Verdicts of the contaminant screen, in read order. A read is a contaminant if its alignment
/// against the contaminant index reaches the identity threshold
pub fn screen_contaminants(
    reads: Vec<ReadPair>,
    alignments: &[AlignmentRecord],
    min_identity: f64,
) -> Vec<(ReadPair, Verdict<()>)> {
    let mut best_identity: FxHashMap<PairId, f64> = FxHashMap::default();
    for aln in alignments {
        let identity = aln.identity();
        best_identity
            .entry(aln.pair_id)
            .and_modify(|v| *v = v.max(identity))
            .or_insert(identity);
    }

    reads
        .into_iter()
        .map(|rp| {
            let verdict = match best_identity.get(&rp.id) {
                Some(&identity) if identity >= min_identity => {
                    Verdict::Discarded(DiscardReason::Contaminant)
                }
                _ => Verdict::Pass(()),
            };
            (rp, verdict)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(id: u64) -> ReadPair {
        ReadPair {
            id: PairId(id),
            name: format!("r{}", id).into_bytes(),
            r1: b"ACGT".to_vec(),
            q1: b"IIII".to_vec(),
            r2: b"ACGT".to_vec(),
            q2: b"IIII".to_vec(),
        }
    }

    fn aln(id: u64, nm: u32) -> AlignmentRecord {
        AlignmentRecord {
            pair_id: PairId(id),
            reference: "Rn45s".to_string(),
            position: 0,
            mapq: 255,
            reverse: false,
            aligned_length: 10,
            edit_distance: Some(nm),
        }
    }

    #[test]
    fn test_any_alignment_with_zero_threshold() {
        let out = screen_contaminants(vec![rp(0), rp(1), rp(2)], &[aln(1, 4)], 0.0);
        let verdicts: Vec<_> = out.into_iter().map(|(r, v)| (r.id, v)).collect();
        assert_eq!(
            verdicts,
            vec![
                (PairId(0), Verdict::Pass(())),
                (PairId(1), Verdict::Discarded(DiscardReason::Contaminant)),
                (PairId(2), Verdict::Pass(())),
            ]
        );
    }

    #[test]
    fn test_identity_threshold() {
        let out = screen_contaminants(vec![rp(0), rp(1)], &[aln(0, 1), aln(1, 3)], 0.9);
        assert_eq!(out[0].1, Verdict::Discarded(DiscardReason::Contaminant));
        assert_eq!(out[1].1, Verdict::Pass(()));
    }
}
