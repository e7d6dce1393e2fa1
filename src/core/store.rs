use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::core::error::BlancError;
use crate::core::job::Job;
use crate::core::status::JobStatus;
use crate::core::transition::is_transition_allowed;

/// Authoritative side of a status change.
///
/// The local policy only decides what to offer; the store decides what
/// actually sticks and may still refuse.
pub trait JobStore {
    fn list(&self) -> Result<Vec<Job>, BlancError>;

    fn get(&self, id: &str) -> Result<Job, BlancError> {
        self.list()?
            .into_iter()
            .find(|job| job.id == id)
            .ok_or_else(|| BlancError::UnknownJob { id: id.to_string() })
    }

    /// Moves `id` from `expected` to `target` and returns the stored record.
    fn commit_status(
        &self,
        id: &str,
        expected: JobStatus,
        target: JobStatus,
    ) -> Result<Job, BlancError>;
}

fn apply_commit(
    jobs: &mut [Job],
    id: &str,
    expected: JobStatus,
    target: JobStatus,
) -> Result<Job, BlancError> {
    let job = jobs
        .iter_mut()
        .find(|job| job.id == id)
        .ok_or_else(|| BlancError::UnknownJob { id: id.to_string() })?;

    if job.status() != Some(expected) {
        return Err(BlancError::Conflict {
            id: id.to_string(),
            expected,
            found: job.blanc_status.to_string(),
        });
    }

    if !is_transition_allowed(expected, target) {
        return Err(BlancError::Rejected {
            id: id.to_string(),
            message: format!("'{expected}' -> '{target}' is not permitted"),
        });
    }

    job.set_status(target);
    job.touch();
    Ok(job.clone())
}

/// Jobs persisted as a JSON array in a single file.
///
/// Writers serialize on an advisory lock held on a sibling `.lock` file, so a
/// commit's read, check and replace happen as one step across processes.
#[derive(Debug, Clone)]
pub struct JsonJobStore {
    path: PathBuf,
}

impl JsonJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, message: impl ToString) -> BlancError {
        BlancError::Store {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Exclusive lock, released when the returned file is dropped.
    fn lock_exclusive(&self) -> Result<File, BlancError> {
        let mut lock_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "jobs.json".into());
        lock_name.push(".lock");
        let lock_path = self.path.with_file_name(lock_name);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.store_error(e))?;
        file.lock_exclusive().map_err(|e| self.store_error(e))?;
        Ok(file)
    }

    fn load(&self) -> Result<Vec<Job>, BlancError> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "job store missing, treating as empty");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| self.store_error(e))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let jobs: Vec<Job> = serde_json::from_str(&raw).map_err(|e| self.store_error(e))?;
        debug!(path = %self.path.display(), count = jobs.len(), "loaded jobs");
        Ok(jobs)
    }

    /// Replaces the file through a uniquely named temp file in the same
    /// directory. Callers must hold the lock.
    fn write_jobs(&self, jobs: &[Job]) -> Result<(), BlancError> {
        let encoded = serde_json::to_string_pretty(jobs).map_err(|e| self.store_error(e))?;
        let mut tmp = NamedTempFile::new_in(self.parent_dir()).map_err(|e| self.store_error(e))?;
        tmp.write_all(encoded.as_bytes())
            .and_then(|_| tmp.write_all(b"\n"))
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.store_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.store_error(e.error))?;
        Ok(())
    }

    pub fn save(&self, jobs: &[Job]) -> Result<(), BlancError> {
        let _lock = self.lock_exclusive()?;
        self.write_jobs(jobs)
    }
}

impl JobStore for JsonJobStore {
    fn list(&self) -> Result<Vec<Job>, BlancError> {
        self.load()
    }

    fn commit_status(
        &self,
        id: &str,
        expected: JobStatus,
        target: JobStatus,
    ) -> Result<Job, BlancError> {
        let _lock = self.lock_exclusive()?;
        let mut jobs = self.load()?;
        let stored = apply_commit(&mut jobs, id, expected, target)?;
        self.write_jobs(&jobs)?;
        info!(job = id, from = %expected, to = %target, "status committed");
        Ok(stored)
    }
}

/// In-process store used for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Job>>, BlancError> {
        self.jobs.lock().map_err(|_| BlancError::Store {
            path: PathBuf::from("<memory>"),
            message: "job list lock poisoned".to_string(),
        })
    }
}

#[cfg(test)]
impl MemoryJobStore {
    /// Overwrites a job's status without any checks, standing in for an
    /// edit made elsewhere.
    pub fn force_status(&self, id: &str, status: JobStatus) -> Result<(), BlancError> {
        let mut jobs = self.lock()?;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| BlancError::UnknownJob { id: id.to_string() })?;
        job.set_status(status);
        Ok(())
    }
}

impl JobStore for MemoryJobStore {
    fn list(&self) -> Result<Vec<Job>, BlancError> {
        Ok(self.lock()?.clone())
    }

    fn commit_status(
        &self,
        id: &str,
        expected: JobStatus,
        target: JobStatus,
    ) -> Result<Job, BlancError> {
        let mut jobs = self.lock()?;
        apply_commit(&mut jobs, id, expected, target)
    }
}

/// A small roster for `--demo` runs.
pub fn demo_jobs() -> Vec<Job> {
    let rows: [(&str, &str, &str, &str, Option<&str>, &str, JobStatus); 6] = [
        (
            "J-1001",
            "Maria Lopez",
            "18 Birch Ln",
            "Dryer repair",
            Some("Sam"),
            "2024-05-02",
            JobStatus::Submitted,
        ),
        (
            "J-1002",
            "Greenway Cafe",
            "4 Harbor St",
            "Walk-in cooler",
            Some("Ana"),
            "2024-05-03",
            JobStatus::WaitingForParts,
        ),
        (
            "J-1003",
            "Tom Becker",
            "77 Oak Ave",
            "Dishwasher leak",
            Some("Sam"),
            "2024-05-01",
            JobStatus::VisitCompleted,
        ),
        (
            "J-1004",
            "Lee Family",
            "9 Pine Ct",
            "Oven igniter",
            None,
            "2024-05-06",
            JobStatus::FollowUpWithClient,
        ),
        (
            "J-1005",
            "Northside Gym",
            "300 Main St",
            "Ice machine",
            Some("Ana"),
            "2024-04-28",
            JobStatus::JobIsDone,
        ),
        (
            "J-1006",
            "R. Okafor",
            "12 Elm Rd",
            "Washer noise",
            None,
            "2024-05-08",
            JobStatus::Rescheduled,
        ),
    ];

    rows.into_iter()
        .map(|(id, customer, address, service, provider, date, status)| {
            let mut job = Job::new(id, customer);
            job.address = address.to_string();
            job.service = service.to_string();
            job.provider = provider.map(str::to_string);
            job.scheduled_for = Some(date.to_string());
            job.set_status(status);
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_json_store() -> (tempfile::TempDir, JsonJobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("jobs.json"));
        store.save(&demo_jobs()).unwrap();
        (dir, store)
    }

    #[test]
    fn json_store_commits_and_persists() {
        let (_dir, store) = seeded_json_store();
        let job = store
            .commit_status("J-1003", JobStatus::VisitCompleted, JobStatus::JobIsDone)
            .unwrap();
        assert_eq!(job.status(), Some(JobStatus::JobIsDone));
        assert!(job.updated_at.is_some());

        let reloaded = JsonJobStore::new(store.path()).get("J-1003").unwrap();
        assert_eq!(reloaded.status(), Some(JobStatus::JobIsDone));
        let mut leftovers: Vec<String> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        leftovers.sort();
        assert_eq!(leftovers, vec!["jobs.json", "jobs.json.lock"]);
    }

    #[test]
    fn json_store_rejects_moves_outside_the_table() {
        let (_dir, store) = seeded_json_store();
        let err = store
            .commit_status("J-1006", JobStatus::Rescheduled, JobStatus::JobIsDone)
            .unwrap_err();
        assert!(matches!(err, BlancError::Rejected { id, .. } if id == "J-1006"));
        assert_eq!(store.get("J-1006").unwrap().status(), Some(JobStatus::Rescheduled));
    }

    #[test]
    fn concurrent_commits_from_separate_handles_do_not_both_win() {
        let (_dir, store) = seeded_json_store();
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));

        let handles: Vec<_> = [JobStatus::WaitingForParts, JobStatus::Canceled]
            .into_iter()
            .map(|target| {
                let handle = JsonJobStore::new(store.path());
                let barrier = std::sync::Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    (target, handle.commit_status("J-1001", JobStatus::Submitted, target))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<JobStatus> = results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(target, _)| *target)
            .collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .any(|(_, result)| matches!(result, Err(BlancError::Conflict { .. }))));
        assert_eq!(store.get("J-1001").unwrap().status(), Some(winners[0]));
    }

    #[test]
    fn null_or_odd_status_does_not_hide_other_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(
            &path,
            r#"[
                {"id":"J-1","blanc_status":"Job is Done"},
                {"id":"J-2","blanc_status":null},
                {"id":"J-3","blanc_status":42}
            ]"#,
        )
        .unwrap();

        let jobs = JsonJobStore::new(&path).list().unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].status(), Some(JobStatus::JobIsDone));
        assert_eq!(jobs[1].status(), Some(JobStatus::Submitted));
        assert_eq!(jobs[2].status(), None);
        assert!(jobs[2].next_statuses().is_empty());
    }

    #[test]
    fn stale_expectation_is_a_conflict() {
        let (_dir, store) = seeded_json_store();
        let err = store
            .commit_status("J-1001", JobStatus::Rescheduled, JobStatus::Submitted)
            .unwrap_err();
        assert!(matches!(err, BlancError::Conflict { found, .. } if found == "Submitted"));
    }

    #[test]
    fn store_refuses_moves_outside_the_table() {
        let store = MemoryJobStore::new(demo_jobs());
        let err = store
            .commit_status("J-1005", JobStatus::JobIsDone, JobStatus::VisitCompleted)
            .unwrap_err();
        assert!(matches!(err, BlancError::Rejected { .. }));
        assert_eq!(store.get("J-1005").unwrap().status(), Some(JobStatus::JobIsDone));
    }

    #[test]
    fn missing_job_is_reported() {
        let store = MemoryJobStore::new(demo_jobs());
        let err = store.get("J-9999").unwrap_err();
        assert!(matches!(err, BlancError::UnknownJob { id } if id == "J-9999"));
    }

    #[test]
    fn missing_file_reads_as_empty_and_bad_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonJobStore::new(dir.path().join("absent.json"));
        assert!(store.list().unwrap().is_empty());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonJobStore::new(&path).list().unwrap_err();
        assert!(matches!(err, BlancError::Store { .. }));
    }
}
