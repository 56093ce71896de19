use crate::runtime;

///////////////////////////////
/// Logging options, as given on the command line
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: runtime::LogLevel,
    pub log_mode: runtime::LogMode,
    pub log_path: Option<std::path::PathBuf>,
}

impl Config {
    ///////////////////////////////
    /// Resolve the output mode: a log path without explicit mode means the run log goes to file
    pub fn effective_mode(&self) -> runtime::LogMode {
        match (&self.log_path, self.log_mode) {
            (None, runtime::LogMode::Path) | (None, runtime::LogMode::Both) => {
                runtime::LogMode::Terminal
            }
            (_, mode) => mode,
        }
    }
}
