use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::BlancError;

/// Local lifecycle status of a job (`blanc_status`).
///
/// The wire form is the exact literal used by the dashboard and the booking
/// system mirror, spaces and capitalization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Submitted,
    WaitingForParts,
    FollowUpWithClient,
    VisitCompleted,
    JobIsDone,
    Rescheduled,
    Canceled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Submitted,
        JobStatus::WaitingForParts,
        JobStatus::FollowUpWithClient,
        JobStatus::VisitCompleted,
        JobStatus::JobIsDone,
        JobStatus::Rescheduled,
        JobStatus::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "Submitted",
            JobStatus::WaitingForParts => "Waiting for parts",
            JobStatus::FollowUpWithClient => "Follow Up with Client",
            JobStatus::VisitCompleted => "Visit completed",
            JobStatus::JobIsDone => "Job is Done",
            JobStatus::Rescheduled => "Rescheduled",
            JobStatus::Canceled => "Canceled",
        }
    }

    /// Exact, case-sensitive match against the seven literals.
    pub fn parse(literal: &str) -> Option<JobStatus> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == literal)
    }

    /// Position in [`JobStatus::ALL`], used for stable status ordering.
    pub fn rank(self) -> usize {
        JobStatus::ALL
            .iter()
            .position(|status| *status == self)
            .unwrap_or(JobStatus::ALL.len())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = BlancError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::parse(s).ok_or_else(|| BlancError::UnknownStatus {
            value: s.to_string(),
        })
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        JobStatus::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown job status '{raw}'")))
    }
}

/// A `blanc_status` value as mirrored from the booking system.
///
/// The external system may introduce literals this build does not know;
/// those are kept verbatim instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusField {
    Known(JobStatus),
    Unknown(String),
}

impl StatusField {
    pub fn from_literal(literal: &str) -> Self {
        match JobStatus::parse(literal) {
            Some(status) => StatusField::Known(status),
            None => StatusField::Unknown(literal.to_string()),
        }
    }

    pub fn known(&self) -> Option<JobStatus> {
        match self {
            StatusField::Known(status) => Some(*status),
            StatusField::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusField::Known(status) => status.as_str(),
            StatusField::Unknown(raw) => raw.as_str(),
        }
    }
}

impl Default for StatusField {
    fn default() -> Self {
        StatusField::Known(JobStatus::Submitted)
    }
}

impl From<JobStatus> for StatusField {
    fn from(status: JobStatus) -> Self {
        StatusField::Known(status)
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Null means "not set"; other non-string values are kept as unknown text.
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(serde_json::Value::Null) => StatusField::default(),
            Some(serde_json::Value::String(literal)) => StatusField::from_literal(&literal),
            Some(other) => StatusField::Unknown(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_round_trip_through_parse() {
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(JobStatus::parse("submitted"), None);
        assert_eq!(JobStatus::parse(" Submitted"), None);
        assert_eq!(JobStatus::parse("Waiting for Parts"), None);
        assert_eq!(JobStatus::parse("Job is Done"), Some(JobStatus::JobIsDone));
    }

    #[test]
    fn from_str_reports_unknown_literal() {
        let err = "Closed".parse::<JobStatus>().unwrap_err();
        assert!(matches!(err, BlancError::UnknownStatus { value } if value == "Closed"));
    }

    #[test]
    fn status_field_keeps_unknown_literal() {
        let field: StatusField = serde_json::from_str("\"On Hold\"").unwrap();
        assert_eq!(field, StatusField::Unknown("On Hold".to_string()));
        assert_eq!(field.known(), None);
        assert_eq!(serde_json::to_string(&field).unwrap(), "\"On Hold\"");

        let field: StatusField = serde_json::from_str("\"Visit completed\"").unwrap();
        assert_eq!(field.known(), Some(JobStatus::VisitCompleted));
    }

    #[test]
    fn status_field_tolerates_null_and_non_strings() {
        let field: StatusField = serde_json::from_str("null").unwrap();
        assert_eq!(field, StatusField::Known(JobStatus::Submitted));

        let field: StatusField = serde_json::from_str("7").unwrap();
        assert_eq!(field, StatusField::Unknown("7".to_string()));
        assert_eq!(field.known(), None);
    }

    #[test]
    fn strict_deserialize_rejects_unknown() {
        assert!(serde_json::from_str::<JobStatus>("\"Done\"").is_err());
        let status: JobStatus = serde_json::from_str("\"Follow Up with Client\"").unwrap();
        assert_eq!(status, JobStatus::FollowUpWithClient);
    }
}
