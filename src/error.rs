//! Error taxonomy for the batch engine.
//!
//! Every variant carries the triggering operation id (and, where useful,
//! its human-readable description) so a caller can localize the fault to
//! a specific member of the batch without re-deriving it from context.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation failed for operation {op_id} ({op_desc}): {reason}")]
    Validation {
        op_id: String,
        op_desc: String,
        reason: String,
    },

    #[error("operation {op_id} conflicts with {other_id}: {reason}")]
    Conflict {
        op_id: String,
        other_id: String,
        reason: String,
    },

    #[error("dependency error: {0}")]
    Dependency(String),

    #[error("prerequisite resolution failed for {op_id}: {reason}")]
    PrereqResolution { op_id: String, reason: String },

    #[error("filesystem error on operation {op_id} ({path}): {source}")]
    Filesystem {
        op_id: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup budget exceeded: need {needed_mb:.3}MB, have {remaining_mb:.3}MB")]
    BudgetExceeded { needed_mb: f64, remaining_mb: f64 },

    #[error("operation cancelled before {op_id}")]
    Cancelled { op_id: String },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("{count} distinct rollback errors occurred: {}", format_many(errors))]
    Rollback { count: usize, errors: Vec<Error> },
}

fn format_many(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn validation(op_id: impl Into<String>, op_desc: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            op_id: op_id.into(),
            op_desc: op_desc.into(),
            reason: reason.into(),
        }
    }

    pub fn conflict(op_id: impl Into<String>, other_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Conflict {
            op_id: op_id.into(),
            other_id: other_id.into(),
            reason: reason.into(),
        }
    }

    pub fn filesystem(op_id: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            op_id: op_id.into(),
            path: path.into(),
            source,
        }
    }

    pub fn rollback_errors(errors: Vec<Error>) -> Self {
        Error::Rollback { count: errors.len(), errors }
    }
}
