use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::core::error::BlancError;
use crate::core::lifecycle::{change_status_by_id, StatusChange};
use crate::core::status::JobStatus;
use crate::core::store::JobStore;

static RE_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<id>[^\s#]+?)\s*->\s*(?P<status>\S.*?)\s*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct BatchStep {
    pub line: usize,
    pub job_id: String,
    pub target: JobStatus,
}

/// A script line that was either understood or rejected at parse time.
pub type ParsedLine = Result<BatchStep, BlancError>;

#[derive(Debug)]
pub struct BatchOutcome {
    pub line: usize,
    pub result: Result<StatusChange, BlancError>,
}

/// One result per non-blank script line, in file order.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}

fn parse_step(line_no: usize, trimmed: &str) -> ParsedLine {
    let caps = RE_STEP.captures(trimmed).ok_or_else(|| BlancError::Parse {
        line: line_no,
        message: format!("expected '<job-id> -> <status>', got '{trimmed}'"),
    })?;

    let literal = &caps["status"];
    let target = JobStatus::parse(literal).ok_or_else(|| BlancError::Parse {
        line: line_no,
        message: format!("unknown job status '{literal}'"),
    })?;

    Ok(BatchStep {
        line: line_no,
        job_id: caps["id"].to_string(),
        target,
    })
}

/// Parses `<job-id> -> <status>` lines. Blank lines and `#` comments are skipped.
///
/// A malformed line becomes an `Err` entry for that line; only a read
/// failure aborts.
pub fn parse_steps(source: impl BufRead) -> Result<Vec<ParsedLine>, BlancError> {
    let mut steps = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| BlancError::Parse {
            line: line_no,
            message: e.to_string(),
        })?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        steps.push(parse_step(line_no, trimmed));
    }

    Ok(steps)
}

pub fn parse_batch_file(path: &Path) -> Result<Vec<ParsedLine>, BlancError> {
    let file = File::open(path).map_err(|e| BlancError::InvalidCommand {
        message: format!("cannot open {}: {e}", path.display()),
    })?;
    parse_steps(BufReader::new(file))
}

/// Applies every step in order; a failing or malformed line does not stop the rest.
pub fn run_batch<S: JobStore + ?Sized>(store: &S, steps: Vec<ParsedLine>) -> BatchReport {
    let mut outcomes = Vec::with_capacity(steps.len());
    for parsed in steps {
        let outcome = match parsed {
            Ok(step) => {
                let result = change_status_by_id(store, &step.job_id, step.target);
                match &result {
                    Ok(_) => debug!(line = step.line, job = %step.job_id, "batch step applied"),
                    Err(err) => warn!(
                        line = step.line,
                        job = %step.job_id,
                        error = %err,
                        "batch step failed"
                    ),
                }
                BatchOutcome {
                    line: step.line,
                    result,
                }
            }
            Err(err) => {
                let line = match &err {
                    BlancError::Parse { line, .. } => *line,
                    _ => 0,
                };
                warn!(line, error = %err, "batch line skipped");
                BatchOutcome {
                    line,
                    result: Err(err),
                }
            }
        };
        outcomes.push(outcome);
    }
    BatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::core::store::{demo_jobs, MemoryJobStore};

    fn ok_steps(script: &str) -> Vec<BatchStep> {
        parse_steps(Cursor::new(script))
            .unwrap()
            .into_iter()
            .map(|parsed| parsed.unwrap())
            .collect()
    }

    #[test]
    fn parses_steps_and_skips_comments() {
        let script = "# morning run\n\nJ-1001 -> Waiting for parts\n  J-1003->Job is Done  \n";
        assert_eq!(
            ok_steps(script),
            vec![
                BatchStep {
                    line: 3,
                    job_id: "J-1001".to_string(),
                    target: JobStatus::WaitingForParts,
                },
                BatchStep {
                    line: 4,
                    job_id: "J-1003".to_string(),
                    target: JobStatus::JobIsDone,
                },
            ]
        );
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let parsed = parse_steps(Cursor::new("J-1 -> Canceled\nJ-2 Canceled\n")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].is_ok());
        assert!(matches!(parsed[1], Err(BlancError::Parse { line: 2, .. })));

        let parsed = parse_steps(Cursor::new("J-1 -> canceled\n")).unwrap();
        assert!(matches!(
            &parsed[0],
            Err(BlancError::Parse { line: 1, message }) if message.contains("canceled")
        ));
    }

    #[test]
    fn malformed_line_does_not_block_later_lines() {
        let store = MemoryJobStore::new(demo_jobs());
        let script = "J-1006 -> Submitted\nJ-1001 => Canceled\n\
                      J-1002 -> Done\nJ-1003 -> Job is Done\n";
        let report = run_batch(&store, parse_steps(Cursor::new(script)).unwrap());

        let lines: Vec<usize> = report.outcomes.iter().map(|o| o.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
        assert_eq!(report.applied(), 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcomes[1].result,
            Err(BlancError::Parse { line: 2, .. })
        ));
        assert_eq!(store.get("J-1003").unwrap().status(), Some(JobStatus::JobIsDone));
    }

    #[test]
    fn failures_do_not_abort_the_run() {
        let store = MemoryJobStore::new(demo_jobs());
        let script = "J-1005 -> Visit completed\nJ-1003 -> Job is Done\n\
                      J-1003 -> Canceled\nJ-404 -> Canceled\n";
        let report = run_batch(&store, parse_steps(Cursor::new(script)).unwrap());
        assert_eq!(report.applied(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(store.get("J-1003").unwrap().status(), Some(JobStatus::Canceled));
    }

    #[test]
    fn reads_script_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moves.blanc");
        std::fs::write(&path, "J-1006 -> Submitted\n").unwrap();
        let steps = parse_batch_file(&path).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(parse_batch_file(&dir.path().join("missing.blanc")).is_err());
    }
}
