use log::debug;
use log::info;
use std::process::Command;
use std::process::Stdio;

use crate::runtime::Error;

///////////////////////////////
/// Check that an external program can be started. Its exit status is not inspected,
/// as not every tool accepts a version flag
pub fn check_executable(name: &str) -> Result<(), Error> {
    debug!("Checking for {}", name);
    match Command::new(name)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => {
            info!("Found {}", name);
            Ok(())
        }
        Err(e) => Err(Error::configuration(
            name,
            Some(format!("either not installed or not in PATH ({})", e)),
        )),
    }
}
