mod command;
pub mod core;

pub use self::command::PipelineCMD;
pub use self::core::core::{Pipeline, PipelineOutcome, RunContext};
pub use self::core::params;
pub use self::core::state::PipelineState;
