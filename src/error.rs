use std::ffi::NulError;

use nix::errno::Errno;
use thiserror::Error;

/// Errors surfaced to the interactive loop. None of these terminate the
/// shell; they are reported and the next line is read.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("input line too long (limit {0} bytes)")]
    LineTooLong(usize),

    #[error("too many pipeline stages (limit {0})")]
    TooManyStages(usize),

    #[error("too many arguments for command (limit {0})")]
    TooManyArgs(usize),

    #[error("empty command in pipeline")]
    EmptyStage,

    #[error("too many background jobs (limit {0})")]
    RegistryFull(usize),

    #[error("argument contains an interior NUL byte")]
    BadArgument(#[from] NulError),

    #[error("{0}")]
    Sys(#[from] Errno),
}
