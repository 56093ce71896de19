use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::barcode::BarcodeMatch;
use crate::common::{DiscardReason, PairId, Verdict};

///////////////////////////////
/// Molecular barcodes observed so far, per spot, with the first read that carried each.
/// Owned by the run; passed explicitly to the detector
#[derive(Debug, Default, Clone)]
pub struct SeenMolecules {
    per_spot: FxHashMap<usize, FxHashMap<Vec<u8>, PairId>>,
}

impl SeenMolecules {
    pub fn new() -> SeenMolecules {
        SeenMolecules::default()
    }

    pub fn first_occurrence(&self, spot: usize, umi: &[u8]) -> Option<PairId> {
        self.per_spot.get(&spot).and_then(|m| m.get(umi)).copied()
    }

    /// Number of distinct (spot, molecular barcode) pairs
    pub fn num_molecules(&self) -> usize {
        self.per_spot.values().map(|m| m.len()).sum()
    }

    pub fn num_spots(&self) -> usize {
        self.per_spot.len()
    }
}

///////////////////////////////
/// Rejects chimeric barcode reads and collapses reads of the same molecule.
/// Reads must be given in input order for first-occurrence-wins to be reproducible
#[derive(Debug, Clone, Copy)]
pub struct ChimeraDetector {
    pub molecular_barcodes: bool,
    pub allowed_kimera: u32,
}

impl ChimeraDetector {
    pub fn new(molecular_barcodes: bool, allowed_kimera: u32) -> ChimeraDetector {
        ChimeraDetector {
            molecular_barcodes,
            allowed_kimera,
        }
    }

    ///////////////////////////////
    /// Classify one read. Chimera check first, then deduplication within the spot
    pub fn classify(
        &self,
        id: PairId,
        bc_match: &BarcodeMatch,
        seen: &mut SeenMolecules,
    ) -> Verdict<()> {
        if !self.molecular_barcodes {
            return Verdict::Pass(());
        }

        if bc_match.mismatches > self.allowed_kimera {
            return Verdict::Discarded(DiscardReason::Chimeric);
        }

        let umi = match &bc_match.molecular_barcode {
            Some(umi) => umi,
            None => return Verdict::Pass(()),
        };

        match seen
            .per_spot
            .entry(bc_match.spot)
            .or_default()
            .entry(umi.clone())
        {
            Entry::Occupied(first) => Verdict::Deduplicated(*first.get()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Verdict::Pass(())
            }
        }
    }
}
