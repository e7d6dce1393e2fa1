use tracing::{info, warn};

use crate::core::error::BlancError;
use crate::core::job::Job;
use crate::core::status::{JobStatus, StatusField};
use crate::core::store::JobStore;
use crate::core::transition::{allowed_transitions, is_transition_allowed};

/// Outcome of a committed status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Checks a requested move against the local policy without touching the store.
pub fn validate(job: &Job, target: JobStatus) -> Result<JobStatus, BlancError> {
    let from = job.status().ok_or_else(|| BlancError::UnknownStatus {
        value: job.blanc_status.to_string(),
    })?;

    if !is_transition_allowed(from, target) {
        warn!(job = %job.id, %from, to = %target, "transition denied locally");
        return Err(BlancError::IllegalTransition {
            from,
            to: target,
            allowed: allowed_transitions(from),
        });
    }

    Ok(from)
}

/// Applies `target` to `job` optimistically and commits it to `store`.
///
/// On success `job` is replaced with the stored record. If the store
/// rejects the change, `job` is restored to the status it had before.
pub fn change_status<S: JobStore + ?Sized>(
    store: &S,
    job: &mut Job,
    target: JobStatus,
) -> Result<StatusChange, BlancError> {
    let from = validate(job, target)?;
    let previous: StatusField = job.blanc_status.clone();

    job.set_status(target);
    match store.commit_status(&job.id, from, target) {
        Ok(stored) => {
            info!(job = %stored.id, %from, to = %target, "status changed");
            *job = stored;
            Ok(StatusChange {
                job_id: job.id.clone(),
                from,
                to: target,
            })
        }
        Err(err) => {
            warn!(job = %job.id, %from, to = %target, error = %err, "rolling back");
            job.blanc_status = previous;
            Err(err)
        }
    }
}

/// Convenience wrapper for callers that only know the job id.
pub fn change_status_by_id<S: JobStore + ?Sized>(
    store: &S,
    id: &str,
    target: JobStatus,
) -> Result<StatusChange, BlancError> {
    let mut job = store.get(id)?;
    change_status(store, &mut job, target)
}
