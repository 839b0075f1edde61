//! Error types for provisioning runs.
//!
//! Every failure of a run falls into one [`ErrorKind`]. All kinds except
//! [`ErrorKind::Notification`] abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unsupported variable, missing file, bad project config
    Configuration,
    /// Wrong branch checked out or dirty working tree
    GitState,
    /// Malformed inventory, playbook or cache artifact
    Parse,
    /// Non-zero exit from git or the provisioning executor
    ExternalCommand,
    /// Unknown host set, or no host to look at
    Lookup,
    /// Chat notification could not be delivered
    Notification,
}

/// Errors raised by the provisioning engine.
#[derive(Debug, Error)]
pub enum ShovelError {
    #[error("attempt to access unsupported env var {0}")]
    UnsupportedVariable(String),

    #[error("missing {0} env var")]
    MissingVariable(&'static str),

    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("checkout of branch {expected} required for provisioning (currently on {actual})")]
    WrongBranch { expected: String, actual: String },

    #[error("found some modified files. Commit these files first:\n{}", .files.join("\n"))]
    DirtyTree { files: Vec<String> },

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("inventory error: {0}")]
    Inventory(#[from] inventory::Error),

    #[error("no hosts in inventory {}", .0.display())]
    NoHosts(PathBuf),

    #[error("command failed: {command}{}", format_detail(.detail))]
    ExternalCommand { command: String, detail: String },

    #[error("interrupted while running {0}")]
    Interrupted(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" ({detail})")
    }
}

impl ShovelError {
    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedVariable(_)
            | Self::MissingVariable(_)
            | Self::MissingFile(_)
            | Self::InvalidConfig(_)
            | Self::Prompt(_)
            | Self::Io(_) => ErrorKind::Configuration,
            Self::WrongBranch { .. } | Self::DirtyTree { .. } => ErrorKind::GitState,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Inventory(inventory::Error::UnknownHostSet(_)) | Self::NoHosts(_) => {
                ErrorKind::Lookup
            }
            Self::Inventory(inner) if inner.is_parse_error() => ErrorKind::Parse,
            Self::Inventory(_) => ErrorKind::Configuration,
            Self::ExternalCommand { .. } | Self::Interrupted(_) => ErrorKind::ExternalCommand,
            Self::Notification(_) => ErrorKind::Notification,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn command(cmd: &str, args: &[&str], detail: impl Into<String>) -> Self {
        Self::ExternalCommand {
            command: command_line(cmd, args),
            detail: detail.into(),
        }
    }

    /// `cmd` stopped because the operator pressed Ctrl-C.
    pub fn interrupted(cmd: &str, args: &[&str]) -> Self {
        Self::Interrupted(command_line(cmd, args))
    }
}

fn command_line(cmd: &str, args: &[&str]) -> String {
    if args.is_empty() {
        cmd.to_string()
    } else {
        format!("{} {}", cmd, args.join(" "))
    }
}

impl From<dialoguer::Error> for ShovelError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Prompt(err.to_string())
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ShovelError>;
