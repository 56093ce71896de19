pub mod dictionary;
pub mod matcher;

pub use dictionary::BarcodeDictionary;
pub use dictionary::SpatialBarcodeEntry;

pub use matcher::BarcodeMatch;
pub use matcher::BarcodeMatcher;
