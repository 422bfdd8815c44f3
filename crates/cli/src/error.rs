//! Errors surfaced by the `backdrop` binary.
//!
//! Exit codes: 10 synthesis, 11 output write, 12 `--params`, 13 report
//! encoding. Clap exits with 2 before any of these run.

use backdrop_core::SynthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Rejected size, layer count or parameter value.
    #[error(transparent)]
    Synth(SynthError),

    /// A PNG, output directory or manifest could not be written.
    #[error("output failed: {0}")]
    Output(String),

    /// `--params` is not valid JSON.
    #[error("invalid --params JSON: {0}")]
    Params(#[source] serde_json::Error),

    /// The `--json` report could not be encoded.
    #[error("cannot encode report: {0}")]
    Report(#[source] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Synth(_) => 10,
            CliError::Output(_) => 11,
            CliError::Params(_) => 12,
            CliError::Report(_) => 13,
        }
    }
}

impl From<SynthError> for CliError {
    fn from(e: SynthError) -> Self {
        match e {
            SynthError::Io(msg) => CliError::Output(msg),
            other => CliError::Synth(other),
        }
    }
}
