// ABOUTME: Runtime adapter error types.
// ABOUTME: NotFound is distinguished from every other failure; CLI failures use SNAFU context.

use snafu::Snafu;

use crate::types::Ctid;

/// Failure running an external runtime command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("failed to run {program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("{program} {args} exited with {code}: {output}"))]
    Exited {
        program: String,
        args: String,
        code: String,
        output: String,
    },
}

impl CommandError {
    /// Combined output of a failed command, if it ran at all.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Exited { output, .. } => Some(output),
            CommandError::Spawn { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The identity does not exist on the host. Not a failure for probes.
    #[error("container {0} does not exist")]
    NotFound(Ctid),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("runtime error: {0}")]
    Other(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}
