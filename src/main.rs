use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use stpipeline::command::Commands;
use stpipeline::runtime::{self, LogLevel, LogMode};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    /// Log level; overrides --verbose
    #[arg(long = "log-level", global = true, value_parser)]
    log_level: Option<LogLevel>,
    /// Where the log goes: terminal, path, both or discard
    #[arg(long = "log-mode", global = true, value_parser)]
    log_mode: Option<LogMode>,
    /// Run log file, appended to
    #[arg(long = "log-file", global = true, value_parser)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn log_config(&self) -> runtime::Config {
        let default_level = if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        let default_mode = if self.log_file.is_some() {
            LogMode::Path
        } else {
            LogMode::Terminal
        };
        runtime::Config {
            log_level: self.log_level.unwrap_or(LogLevel(default_level)),
            log_mode: self.log_mode.unwrap_or(default_mode),
            log_path: self.log_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = runtime::setup_global_logger(&cli.log_config()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Pipeline(mut cmd) => cmd.try_execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
