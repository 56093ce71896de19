pub mod core;
pub mod params;
pub mod sanity;
pub mod state;
