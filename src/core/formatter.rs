use crate::core::filter::StatusCounts;
use crate::core::job::Job;
use crate::core::lifecycle::StatusChange;
use crate::core::status::JobStatus;

pub fn format_job_row(job: &Job) -> String {
    let scheduled = job.scheduled_for.as_deref().unwrap_or("--");
    let provider = job.provider.as_deref().unwrap_or("unassigned");
    format!(
        "{:<8} {:<22} {:<10} {:<12} {}",
        job.id,
        truncate(&job.customer, 22),
        scheduled,
        truncate(provider, 12),
        job.blanc_status
    )
}

pub fn format_job_detail(job: &Job) -> Vec<String> {
    let mut lines = vec![
        format!("Job      : {}", job.id),
        format!("Customer : {}", or_unknown(&job.customer)),
        format!("Address  : {}", or_unknown(&job.address)),
        format!("Service  : {}", or_unknown(&job.service)),
        format!(
            "Provider : {}",
            job.provider.as_deref().unwrap_or("unassigned")
        ),
        format!(
            "Scheduled: {}",
            job.scheduled_for.as_deref().unwrap_or("--")
        ),
    ];

    match job.status() {
        Some(_) => lines.push(format!("Status   : {}", job.blanc_status)),
        None => lines.push(format!("Status   : {} (unrecognized)", job.blanc_status)),
    }
    if let Some(zb) = &job.zb_status {
        lines.push(format!("Booking  : {zb}"));
    }
    if let Some(updated) = &job.updated_at {
        lines.push(format!("Updated  : {updated}"));
    }
    lines.push(format!("Next     : {}", format_targets(job.next_statuses())));
    lines
}

pub fn format_targets(targets: &[JobStatus]) -> String {
    if targets.is_empty() {
        return "(none)".to_string();
    }
    targets
        .iter()
        .enumerate()
        .map(|(idx, status)| format!("[{}] {}", idx + 1, status))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn format_change(change: &StatusChange) -> String {
    format!("{}: {} -> {}", change.job_id, change.from, change.to)
}

pub fn format_counts(counts: &StatusCounts) -> String {
    let mut parts: Vec<String> = counts
        .known
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(status, n)| format!("{status}={n}"))
        .collect();
    if counts.unknown > 0 {
        parts.push(format!("unknown={}", counts.unknown));
    }
    if parts.is_empty() {
        return "no jobs".to_string();
    }
    format!("{} jobs: {}", counts.total(), parts.join(" "))
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
