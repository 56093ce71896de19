use thiserror::Error;

use crate::common::Stage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error for {:?}{}.", path, Error::format_msg_as_detail(msg))]
    Configuration {
        path: std::path::PathBuf,
        msg: Option<String>,
    },

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error(
        "Stage {} failed: engine '{}' on execute '{}' ({}){}",
        stage,
        engine,
        cmd,
        Error::format_status(status),
        Error::format_msg_as_detail(msg)
    )]
    EngineInvocation {
        stage: Stage,
        engine: String,
        cmd: String,
        status: Option<i32>,
        msg: Option<String>,
    },

    #[error("Integrity violation in stage {stage}: {msg}")]
    IntegrityViolation { stage: Stage, msg: String },

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[cold]
    pub fn configuration<P: AsRef<std::path::Path>, M: Into<String>>(
        path: P,
        msg: Option<M>,
    ) -> Self {
        Error::Configuration {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn invalid_parameter<P: Into<String>, R: Into<String>>(parameter: P, reason: R) -> Self {
        Error::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    #[cold]
    pub fn engine_invocation<E: Into<String>, C: Into<String>, M: Into<String>>(
        stage: Stage,
        engine: E,
        cmd: C,
        status: Option<i32>,
        msg: Option<M>,
    ) -> Self {
        Error::EngineInvocation {
            stage,
            engine: engine.into(),
            cmd: cmd.into(),
            status,
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn integrity_violation<M: Into<String>>(stage: Stage, msg: M) -> Self {
        Error::IntegrityViolation {
            stage,
            msg: msg.into(),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    /// Kind shown in the failure report
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration { .. } | Error::InvalidParameter { .. } => "ConfigurationError",
            Error::EngineInvocation { .. } => "EngineInvocationError",
            Error::IntegrityViolation { .. } => "IntegrityViolation",
            Error::ParseError { .. } => "ParseError",
            Error::Io(_) => "IoError",
        }
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::EngineInvocation { stage, .. } | Error::IntegrityViolation { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }

    pub fn format_status(status: &Option<i32>) -> String {
        match status {
            Some(code) => format!("exit status {}", code),
            None => "no exit status".to_string(),
        }
    }
}
