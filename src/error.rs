//! Error taxonomy for per-sample/per-gene calling.
//!
//! Non-fatal cases never surface as `Err` from the calling loop -- they are
//! logged and resolved to a defined sentinel output. Fatal cases (bad input
//! files, missing required arguments) propagate as `anyhow::Error` and map
//! to a non-zero exit code in `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("sample {sample} has no observed variants in the window for gene {gene}")]
    NoVariants { sample: String, gene: String },

    #[error("solver could not find a feasible solution for sample {sample}, gene {gene}")]
    Infeasible { sample: String, gene: String },

    #[error("solver aborted or timed out for sample {sample}, gene {gene}: {reason}")]
    SolverAborted {
        sample: String,
        gene: String,
        reason: String,
    },
}

/// Outcome of a single solver invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Error(String),
}
