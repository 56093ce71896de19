use bio::alignment::distance::hamming;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use super::BarcodeDictionary;
use crate::common::{DiscardReason, Verdict};

///////////////////////////////
/// A barcode read assigned to a spot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarcodeMatch {
    /// Index of the spot in the dictionary
    pub spot: usize,
    pub mismatches: u32,
    pub molecular_barcode: Option<Vec<u8>>,
}

///////////////////////////////
/// Maps observed barcodes to dictionary entries within a Hamming distance bound.
///
/// Two barcodes within distance k of each other must agree exactly on at least one of k+1
/// disjoint blocks (pigeonhole principle). Each block is therefore indexed, and only entries
/// sharing a block with the observed barcode are compared in full. This finds every entry
/// within k, which is all that is needed to decide both the best hit and ties.
#[derive(Clone, Debug)]
pub struct BarcodeMatcher {
    dict: BarcodeDictionary,
    allowed_missed: u32,

    // [start, end) of each block; empty when the bound is too large to partition the barcode
    blocks: Vec<(usize, usize)>,
    block_index: Vec<FxHashMap<Vec<u8>, Vec<u32>>>,
}

impl BarcodeMatcher {
    pub fn new(dict: BarcodeDictionary, allowed_missed: u32) -> BarcodeMatcher {
        let blocks = partition_blocks(dict.barcode_length(), allowed_missed as usize + 1);

        let mut block_index: Vec<FxHashMap<Vec<u8>, Vec<u32>>> =
            vec![FxHashMap::default(); blocks.len()];
        for (entry_index, entry) in dict.entries().iter().enumerate() {
            for (block, &(from, to)) in blocks.iter().enumerate() {
                block_index[block]
                    .entry(entry.sequence[from..to].to_vec())
                    .or_default()
                    .push(entry_index as u32);
            }
        }

        BarcodeMatcher {
            dict,
            allowed_missed,
            blocks,
            block_index,
        }
    }

    pub fn dictionary(&self) -> &BarcodeDictionary {
        &self.dict
    }

    ///////////////////////////////
    /// Assign an observed barcode to a spot. Ties for the minimum distance are ambiguous, never picked
    pub fn find(&self, observed: &[u8]) -> Verdict<BarcodeMatch> {
        if observed.len() != self.dict.barcode_length() {
            return Verdict::Discarded(DiscardReason::TooShort);
        }

        //Exact hits are unique since the dictionary holds no duplicates
        if let Some(spot) = self.dict.find_exact(observed) {
            return Verdict::Pass(BarcodeMatch {
                spot,
                mismatches: 0,
                molecular_barcode: None,
            });
        }
        if self.allowed_missed == 0 {
            return Verdict::Discarded(DiscardReason::NoMatch);
        }

        let candidates = self.candidates(observed);
        let best = candidates
            .iter()
            .map(|&spot| (spot, hamming(observed, &self.dict.get(spot).sequence) as u32))
            .min_set_by_key(|&(_, dist)| dist);

        match best.as_slice() {
            [] => Verdict::Discarded(DiscardReason::NoMatch),
            [(_, dist), ..] if *dist > self.allowed_missed => {
                Verdict::Discarded(DiscardReason::NoMatch)
            }
            [(spot, dist)] => Verdict::Pass(BarcodeMatch {
                spot: *spot,
                mismatches: *dist,
                molecular_barcode: None,
            }),
            _ => Verdict::Discarded(DiscardReason::AmbiguousBarcode),
        }
    }

    ///////////////////////////////
    /// Entries sharing at least one block with the observed barcode; everything if there is no index
    fn candidates(&self, observed: &[u8]) -> Vec<usize> {
        if self.blocks.is_empty() {
            return (0..self.dict.len()).collect();
        }

        let mut found: Vec<usize> = Vec::new();
        for (block, &(from, to)) in self.blocks.iter().enumerate() {
            if let Some(hits) = self.block_index[block].get(&observed[from..to]) {
                found.extend(hits.iter().map(|&i| i as usize));
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}

///////////////////////////////
/// Split a length into n nearly equal [start, end) ranges. Empty if any range would be empty
fn partition_blocks(len: usize, n: usize) -> Vec<(usize, usize)> {
    if n == 0 || n > len {
        return Vec::new();
    }
    let base = len / n;
    let extra = len % n;

    let mut blocks = Vec::with_capacity(n);
    let mut from = 0;
    for i in 0..n {
        let size = base + usize::from(i < extra);
        blocks.push((from, from + size));
        from += size;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::SpatialBarcodeEntry;

    fn dict(list: &[(&str, &str)]) -> BarcodeDictionary {
        BarcodeDictionary::from_entries(
            list.iter()
                .map(|(seq, id)| SpatialBarcodeEntry {
                    sequence: seq.as_bytes().to_vec(),
                    identifier: id.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn brute_force(d: &BarcodeDictionary, observed: &[u8], k: u32) -> Verdict<BarcodeMatch> {
        let best = d
            .entries()
            .iter()
            .enumerate()
            .map(|(i, e)| (i, hamming(observed, &e.sequence) as u32))
            .min_set_by_key(|&(_, dist)| dist);
        match best.as_slice() {
            [(_, dist), ..] if *dist > k => Verdict::Discarded(DiscardReason::NoMatch),
            [(spot, dist)] => Verdict::Pass(BarcodeMatch {
                spot: *spot,
                mismatches: *dist,
                molecular_barcode: None,
            }),
            _ => Verdict::Discarded(DiscardReason::AmbiguousBarcode),
        }
    }

    #[test]
    fn test_partition_blocks() {
        assert_eq!(partition_blocks(4, 2), vec![(0, 2), (2, 4)]);
        assert_eq!(partition_blocks(4, 3), vec![(0, 2), (2, 3), (3, 4)]);
        assert_eq!(partition_blocks(27, 7).last(), Some(&(24, 27)));
        assert!(partition_blocks(3, 4).is_empty());
    }

    #[test]
    fn test_one_mismatch_unique() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1"), ("TTTT", "spot2")]), 1);
        assert_eq!(
            m.find(b"AAAT"),
            Verdict::Pass(BarcodeMatch {
                spot: 0,
                mismatches: 1,
                molecular_barcode: None
            })
        );
        assert_eq!(m.dictionary().get(0).identifier, "spot1");
    }

    #[test]
    fn test_exact() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1"), ("TTTT", "spot2")]), 1);
        assert_eq!(
            m.find(b"TTTT"),
            Verdict::Pass(BarcodeMatch {
                spot: 1,
                mismatches: 0,
                molecular_barcode: None
            })
        );
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1"), ("TTTT", "spot2")]), 2);
        assert_eq!(
            m.find(b"ATAT"),
            Verdict::Discarded(DiscardReason::AmbiguousBarcode)
        );
    }

    #[test]
    fn test_beyond_bound_is_no_match() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1"), ("TTTT", "spot2")]), 1);
        assert_eq!(m.find(b"ATAT"), Verdict::Discarded(DiscardReason::NoMatch));
        assert_eq!(m.find(b"ACGA"), Verdict::Discarded(DiscardReason::NoMatch));
    }

    #[test]
    fn test_zero_tolerance() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1"), ("TTTT", "spot2")]), 0);
        assert_eq!(m.find(b"AAAT"), Verdict::Discarded(DiscardReason::NoMatch));
    }

    #[test]
    fn test_wrong_length() {
        let m = BarcodeMatcher::new(dict(&[("AAAA", "spot1")]), 1);
        assert_eq!(m.find(b"AAA"), Verdict::Discarded(DiscardReason::TooShort));
    }

    #[test]
    fn test_n_counts_as_mismatch() {
        let m = BarcodeMatcher::new(dict(&[("ACGTAC", "a"), ("TGCATG", "b")]), 1);
        assert_eq!(
            m.find(b"ACGNAC"),
            Verdict::Pass(BarcodeMatch {
                spot: 0,
                mismatches: 1,
                molecular_barcode: None
            })
        );
    }

    #[test]
    fn test_large_bound_falls_back_to_scan() {
        let d = dict(&[("AAA", "a"), ("CCC", "b")]);
        let m = BarcodeMatcher::new(d, 5);
        assert!(m.blocks.is_empty());
        assert_eq!(
            m.find(b"ACC"),
            Verdict::Pass(BarcodeMatch {
                spot: 1,
                mismatches: 1,
                molecular_barcode: None
            })
        );
    }

    #[test]
    fn test_index_agrees_with_full_scan() {
        let d = dict(&[
            ("ACGTACGTAC", "1"),
            ("ACGTACGTTT", "2"),
            ("TTGTACGTAC", "3"),
            ("GGGGCCCCAA", "4"),
            ("ACGTCCCCAA", "5"),
            ("CATGCATGCA", "6"),
        ]);
        let observed: [&[u8]; 8] = [
            b"ACGTACGTAA",
            b"ACGTACGTTC",
            b"TTGTACGTTT",
            b"GGGGCCCCTT",
            b"ACGTCCCCTC",
            b"CATGCATGGG",
            b"NNNNNNNNNN",
            b"ACGGACGTAC",
        ];
        for k in 0..4 {
            let m = BarcodeMatcher::new(d.clone(), k);
            for obs in observed.iter() {
                assert_eq!(m.find(obs), brute_force(&d, obs, k), "k={} obs={:?}", k, obs);
            }
        }
    }
}
