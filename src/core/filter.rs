use std::cmp::Ordering;

use clap::ValueEnum;

use crate::core::job::Job;
use crate::core::status::JobStatus;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    /// Empty means any status.
    pub statuses: Vec<JobStatus>,
    pub search: Option<String>,
    pub provider: Option<String>,
    pub include_unknown: bool,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        match job.status() {
            Some(status) => {
                if !self.statuses.is_empty() && !self.statuses.contains(&status) {
                    return false;
                }
            }
            None => {
                if !self.include_unknown {
                    return false;
                }
            }
        }

        if let Some(provider) = self.provider.as_deref() {
            let matches_provider = job
                .provider
                .as_deref()
                .map(|p| p.eq_ignore_ascii_case(provider))
                .unwrap_or(false);
            if !matches_provider {
                return false;
            }
        }

        if let Some(needle) = self.search.as_deref() {
            let needle = needle.trim().to_lowercase();
            if needle.is_empty() {
                return true;
            }
            let haystacks = [&job.id, &job.customer, &job.address, &job.service];
            return haystacks
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        }

        true
    }

    pub fn apply<'a>(&self, jobs: &'a [Job]) -> Vec<&'a Job> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    #[default]
    Id,
    Customer,
    Scheduled,
    Status,
}

fn compare(a: &Job, b: &Job, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Customer => a.customer.to_lowercase().cmp(&b.customer.to_lowercase()),
        SortKey::Scheduled => match (a.scheduled_date(), b.scheduled_date()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Status => {
            let rank = |job: &Job| job.status().map(JobStatus::rank).unwrap_or(usize::MAX);
            rank(a).cmp(&rank(b))
        }
    }
}

/// Stable sort. Undated and unknown-status jobs stay last in either direction.
pub fn sort_jobs(jobs: &mut [&Job], key: SortKey, descending: bool) {
    jobs.sort_by(|a, b| {
        let trailing = |job: &Job| match key {
            SortKey::Scheduled => job.scheduled_date().is_none(),
            SortKey::Status => job.status().is_none(),
            _ => false,
        };
        match (trailing(a), trailing(b)) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            _ => {}
        }
        let ordering = compare(a, b, key);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCounts {
    pub known: [(JobStatus, usize); 7],
    pub unknown: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.known.iter().map(|(_, n)| n).sum::<usize>() + self.unknown
    }
}

pub fn status_counts(jobs: &[Job]) -> StatusCounts {
    let mut known = JobStatus::ALL.map(|status| (status, 0usize));
    let mut unknown = 0;
    for job in jobs {
        match job.status() {
            Some(status) => known[status.rank()].1 += 1,
            None => unknown += 1,
        }
    }
    StatusCounts { known, unknown }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::StatusField;
    use crate::core::store::demo_jobs;

    fn ids(jobs: &[&Job]) -> Vec<String> {
        jobs.iter().map(|job| job.id.clone()).collect()
    }

    fn with_unknown() -> Vec<Job> {
        let mut jobs = demo_jobs();
        let mut odd = Job::new("J-0999", "Legacy Import");
        odd.blanc_status = StatusField::Unknown("On Hold".to_string());
        jobs.push(odd);
        jobs
    }

    #[test]
    fn empty_filter_hides_only_unknown_statuses() {
        let jobs = with_unknown();
        assert_eq!(JobFilter::default().apply(&jobs).len(), 6);
        let filter = JobFilter {
            include_unknown: true,
            ..JobFilter::default()
        };
        assert_eq!(filter.apply(&jobs).len(), 7);
    }

    #[test]
    fn filters_combine() {
        let jobs = demo_jobs();
        let filter = JobFilter {
            statuses: vec![JobStatus::Submitted, JobStatus::VisitCompleted],
            provider: Some("sam".to_string()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&filter.apply(&jobs)), vec!["J-1001", "J-1003"]);

        let filter = JobFilter {
            search: Some("  HARBOR ".to_string()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&filter.apply(&jobs)), vec!["J-1002"]);
    }

    #[test]
    fn provider_filter_excludes_unassigned() {
        let jobs = demo_jobs();
        let filter = JobFilter {
            provider: Some("Ana".to_string()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&filter.apply(&jobs)), vec!["J-1002", "J-1005"]);
    }

    #[test]
    fn provider_filter_is_exact_apart_from_case() {
        let jobs = demo_jobs();
        for provider in [" Sam", "Sam ", "Sa"] {
            let filter = JobFilter {
                provider: Some(provider.to_string()),
                ..JobFilter::default()
            };
            assert!(filter.apply(&jobs).is_empty(), "{provider:?} should not match");
        }
        let filter = JobFilter {
            provider: Some("SAM".to_string()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&filter.apply(&jobs)), vec!["J-1001", "J-1003"]);
    }

    #[test]
    fn sorts_by_customer_ignoring_case() {
        let mut jobs = demo_jobs();
        jobs[2].customer = "tom becker".to_string();
        let mut view: Vec<&Job> = jobs.iter().collect();
        sort_jobs(&mut view, SortKey::Customer, false);
        assert_eq!(
            ids(&view),
            vec!["J-1002", "J-1004", "J-1001", "J-1005", "J-1006", "J-1003"]
        );
    }

    #[test]
    fn sorts_by_id_descending() {
        let jobs = demo_jobs();
        let mut view: Vec<&Job> = jobs.iter().collect();
        sort_jobs(&mut view, SortKey::Id, true);
        assert_eq!(
            ids(&view),
            vec!["J-1006", "J-1005", "J-1004", "J-1003", "J-1002", "J-1001"]
        );
    }

    #[test]
    fn sorts_by_schedule_with_undated_last() {
        let mut jobs = demo_jobs();
        jobs[0].scheduled_for = None;
        let mut view: Vec<&Job> = jobs.iter().collect();
        sort_jobs(&mut view, SortKey::Scheduled, false);
        assert_eq!(
            ids(&view),
            vec!["J-1005", "J-1003", "J-1002", "J-1004", "J-1006", "J-1001"]
        );
        sort_jobs(&mut view, SortKey::Scheduled, true);
        assert_eq!(ids(&view).first().map(String::as_str), Some("J-1006"));
        assert_eq!(ids(&view).last().map(String::as_str), Some("J-1001"));
    }

    #[test]
    fn sorts_by_status_rank() {
        let jobs = with_unknown();
        let mut view: Vec<&Job> = jobs.iter().collect();
        sort_jobs(&mut view, SortKey::Status, false);
        assert_eq!(
            ids(&view),
            vec!["J-1001", "J-1002", "J-1004", "J-1003", "J-1005", "J-1006", "J-0999"]
        );
    }

    #[test]
    fn counts_per_status() {
        let jobs = with_unknown();
        let counts = status_counts(&jobs);
        assert_eq!(counts.total(), 7);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.known[0], (JobStatus::Submitted, 1));
        assert_eq!(counts.known[6], (JobStatus::Canceled, 0));
    }
}
