// SPDX-License-Identifier: MIT

//! Supervision error types.

use thiserror::Error;

/// Errors that prevent supervision from starting. Once a run is underway,
/// operational failures (delivery, broken pipes, stubborn children) are
/// logged and absorbed rather than surfaced here.
#[derive(Debug, Error)]
pub enum SuperviseError {
    /// Command not found or could not be spawned.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// No command was given and standard input is an interactive terminal,
    /// so there is nothing to supervise.
    #[error("no command given and standard input is a terminal")]
    NoInput,
}
