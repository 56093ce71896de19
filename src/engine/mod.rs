pub mod aligner;
pub mod annotator;
pub mod process;
pub mod sam;

pub use aligner::{Aligner, AlignmentOutput, StarAligner};
pub use annotator::{
    AnnotationEngine, AnnotationParams, FeatureAssignment, GeneAssignment, HtseqCount, HtseqMode,
    Strandedness,
};
pub use sam::AlignmentRecord;
