use std::path::PathBuf;

use thiserror::Error;

use crate::core::status::JobStatus;

#[derive(Debug, Error)]
pub enum BlancError {
    #[error("unknown job status '{value}'")]
    UnknownStatus { value: String },
    #[error("job '{id}' not found")]
    UnknownJob { id: String },
    #[error("cannot move job from '{from}' to '{to}' (allowed: {})", join_statuses(.allowed))]
    IllegalTransition {
        from: JobStatus,
        to: JobStatus,
        allowed: &'static [JobStatus],
    },
    #[error("job '{id}' changed underneath us: expected '{expected}', found '{found}'")]
    Conflict {
        id: String,
        expected: JobStatus,
        found: String,
    },
    #[error("store rejected job '{id}': {message}")]
    Rejected { id: String, message: String },
    #[error("job store {path}: {message}")]
    Store { path: PathBuf, message: String },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("config: {message}")]
    Config { message: String },
    #[error("terminal: {message}")]
    Terminal { message: String },
    #[error("invalid command: {message}")]
    InvalidCommand { message: String },
}

impl BlancError {
    /// Rejections issued by the store rather than the local policy.
    pub fn is_store_rejection(&self) -> bool {
        matches!(
            self,
            BlancError::UnknownJob { .. }
                | BlancError::Conflict { .. }
                | BlancError::Rejected { .. }
        )
    }
}

fn join_statuses(statuses: &[JobStatus]) -> String {
    if statuses.is_empty() {
        return "none".to_string();
    }
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
