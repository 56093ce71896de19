pub mod contaminant;
pub mod read_filter;

pub use contaminant::screen_contaminants;
pub use read_filter::{trim_trailing_quality, FilterParams, ReadFilter};
