use clap::Subcommand;

pub mod pipeline;

pub use pipeline::PipelineCMD;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Run all stages, from raw reads to a spot by gene matrix
    Pipeline(PipelineCMD),
}
