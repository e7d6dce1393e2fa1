use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::status::{JobStatus, StatusField};
use crate::core::transition::allowed_transitions;

/// Local mirror of a job owned by the booking system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub blanc_status: StatusField,
    /// Status as reported by the booking system itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zb_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            customer: customer.into(),
            address: String::new(),
            service: String::new(),
            provider: None,
            scheduled_for: None,
            blanc_status: StatusField::Known(JobStatus::Submitted),
            zb_status: None,
            updated_at: None,
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.blanc_status.known()
    }

    /// Targets to offer for this job; none when the status is unknown.
    pub fn next_statuses(&self) -> &'static [JobStatus] {
        match self.status() {
            Some(status) => allowed_transitions(status),
            None => &[],
        }
    }

    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        self.scheduled_for
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.blanc_status = StatusField::Known(status);
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
}
