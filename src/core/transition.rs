use crate::core::status::JobStatus;

type S = JobStatus;

/// Destinations reachable directly from `current`, in the order the
/// dashboard presents them.
pub fn allowed_transitions(current: JobStatus) -> &'static [JobStatus] {
    match current {
        S::Submitted => &[S::FollowUpWithClient, S::WaitingForParts, S::Canceled],
        S::WaitingForParts => &[S::Submitted, S::FollowUpWithClient, S::Canceled],
        S::FollowUpWithClient => &[S::WaitingForParts, S::Submitted, S::Canceled],
        S::VisitCompleted => &[S::FollowUpWithClient, S::JobIsDone, S::Canceled],
        S::JobIsDone => &[S::Canceled],
        S::Rescheduled => &[S::Submitted, S::Canceled],
        S::Canceled => &[],
    }
}

/// String-keyed lookup. Unrecognized literals get no options.
pub fn allowed_transitions_for(current: &str) -> &'static [JobStatus] {
    match JobStatus::parse(current) {
        Some(status) => allowed_transitions(status),
        None => &[],
    }
}

pub fn is_transition_allowed(current: JobStatus, target: JobStatus) -> bool {
    allowed_transitions(current).contains(&target)
}

pub fn is_transition_allowed_str(current: &str, target: &str) -> bool {
    match JobStatus::parse(target) {
        Some(target) => allowed_transitions_for(current).contains(&target),
        None => false,
    }
}

pub fn is_terminal(status: JobStatus) -> bool {
    allowed_transitions(status).is_empty()
}
