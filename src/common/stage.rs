///////////////////////////////
/// Read-processing stages, in the order they run. Ordering is used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Trimming,
    ContaminantFilter,
    BarcodeDemux,
    Dedup,
    Alignment,
    Annotation,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Trimming,
        Stage::ContaminantFilter,
        Stage::BarcodeDemux,
        Stage::Dedup,
        Stage::Alignment,
        Stage::Annotation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Trimming => "trimming",
            Stage::ContaminantFilter => "contaminant_filter",
            Stage::BarcodeDemux => "barcode_demux",
            Stage::Dedup => "dedup",
            Stage::Alignment => "alignment",
            Stage::Annotation => "annotation",
        }
    }

    /// Stage fed by the output of this one
    pub fn next(&self) -> Option<Stage> {
        let pos = Stage::ALL.iter().position(|s| s == self)?;
        Stage::ALL.get(pos + 1).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
