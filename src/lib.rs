pub mod barcode;
pub mod command;
pub mod common;
pub mod engine;
pub mod fileformat;
pub mod runtime;
pub mod trim;
pub mod umi;
pub mod utils;
