pub mod count_matrix;
pub mod paired_fastq;
pub mod stage_report;

pub use count_matrix::ExpressionMatrix;
pub use count_matrix::ExpressionRecord;
pub use paired_fastq::PairedFastqReader;
pub use stage_report::DiscardedRecord;
