mod umi_dedup;

pub use umi_dedup::ChimeraDetector;
pub use umi_dedup::SeenMolecules;
