use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::common::Stage;
use crate::runtime::Error;
use crate::utils::command_to_string;

/// How often a running engine is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bytes of engine stderr kept for the failure report
const STDERR_TAIL: u64 = 2048;

///////////////////////////////
/// Run an external engine to completion, killing it when the timeout expires.
/// stderr is captured to a file in the stage workdir; stdout is discarded
pub fn run_engine(
    stage: Stage,
    engine: &str,
    mut cmd: Command,
    workdir: &Path,
    timeout: Duration,
) -> Result<(), Error> {
    let cmd_str = command_to_string(&cmd);
    info!("[{}] running {}", stage, cmd_str);

    let path_stderr = workdir.join(format!("{}.stderr.log", engine_file_stem(engine)));
    let stderr_file = File::create(&path_stderr)?;

    let mut child = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|e| {
            Error::engine_invocation(
                stage,
                engine,
                &cmd_str,
                None,
                Some(format!(
                    "failed to start ({}). Make sure it is in your $PATH and you have execution permissions",
                    e
                )),
            )
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if started.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::engine_invocation(
                    stage,
                    engine,
                    &cmd_str,
                    None,
                    Some(format!("timed out after {}s", timeout.as_secs())),
                ));
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };
    debug!(
        "[{}] {} finished in {:.1}s with {}",
        stage,
        engine,
        started.elapsed().as_secs_f64(),
        status
    );

    if !status.success() {
        return Err(Error::engine_invocation(
            stage,
            engine,
            &cmd_str,
            status.code(),
            read_tail(&path_stderr).filter(|s| !s.is_empty()),
        ));
    }
    Ok(())
}

fn engine_file_stem(engine: &str) -> String {
    Path::new(engine)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "engine".to_string())
}

///////////////////////////////
/// Last part of a log file, trimmed
fn read_tail(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    file.seek(SeekFrom::Start(len.saturating_sub(STDERR_TAIL))).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = Command::new("true");
        assert!(run_engine(Stage::Alignment, "true", cmd, dir.path(), Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo index is broken >&2; exit 3");
        let err = run_engine(Stage::Alignment, "sh", cmd, dir.path(), Duration::from_secs(10))
            .unwrap_err();
        match err {
            Error::EngineInvocation {
                stage, status, msg, ..
            } => {
                assert_eq!(stage, Stage::Alignment);
                assert_eq!(status, Some(3));
                assert_eq!(msg.as_deref(), Some("index is broken"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = Command::new("surely-not-an-installed-aligner");
        let err = run_engine(
            Stage::ContaminantFilter,
            "surely-not-an-installed-aligner",
            cmd,
            dir.path(),
            Duration::from_secs(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "EngineInvocationError");
        assert_eq!(err.stage(), Some(Stage::ContaminantFilter));
    }

    #[test]
    fn test_timeout_kills() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let started = Instant::now();
        let err = run_engine(Stage::Annotation, "sleep", cmd, dir.path(), Duration::from_millis(300))
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(format!("{err}").contains("timed out"));
    }
}
