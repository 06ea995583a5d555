//! Error types for autorandr
//!
//! Most of these end up as a log line and an exit code,
//! the binary decides which ones are fatal.

use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No fingerprint strategy produced any connected display")]
    FingerprintUnavailable,

    #[error("Profile '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("Cannot save current configuration as profile '{0}': this name is a reserved virtual configuration")]
    ReservedName(String),

    #[error("Invalid profile name '{0}'")]
    InvalidProfileName(String),

    #[error("Failed to start {program}")]
    ToolMissing {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Invalid directive on line {line}: {message}")]
    Directive { line: usize, message: String },

    #[error("Unable to parse display report: {0}")]
    Report(String),

    #[error("Invalid settings on line {line}: {message}")]
    Settings { line: usize, message: String },

    #[error("Invalid settings: {0}")]
    SettingsValue(String),

    #[error("Underlying I/O error")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern")]
    Glob(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, Error>;
