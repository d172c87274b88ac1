use std::io;

use thiserror::Error;

/// Errors surfaced by [`Shell`](crate::shell::Shell) operations.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The OS could not start the process, or writing to its stdin failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The process input was requested before the process was launched.
    #[error("process not started")]
    NotStarted,
}
