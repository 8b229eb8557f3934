//! Fire-and-forget background jobs (alarms).
//!
//! Jobs are tokio tasks that sleep until their deadline and then run a
//! blocking closure on the blocking pool. The command loop never awaits
//! them. Each job removes itself from the pending table just before it
//! runs, so `pending()` only lists jobs that can still be cancelled.

pub mod alarm;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info};

pub use alarm::{next_occurrence, parse_alarm_time};

pub type JobId = u64;

struct PendingJob {
    label: String,
    abort: AbortHandle,
}

/// Cancellable timer jobs on a tokio runtime.
pub struct Scheduler {
    handle: Handle,
    next_id: AtomicU64,
    jobs: Arc<Mutex<HashMap<JobId, PendingJob>>>,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: AtomicU64::new(1),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `job` once `delay` has elapsed.
    pub fn schedule_in<F>(&self, delay: Duration, label: impl Into<String>, job: F) -> JobId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.into();
        let jobs = Arc::clone(&self.jobs);

        // Held across spawn + insert so a zero-delay job cannot deregister
        // before it is registered.
        let mut table = self.jobs.lock();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(done) = jobs.lock().remove(&id) {
                debug!(job = id, label = %done.label, "scheduled job firing");
            }
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                tracing::warn!(job = id, "scheduled job failed: {e}");
            }
        });
        table.insert(
            id,
            PendingJob {
                label: label.clone(),
                abort: task.abort_handle(),
            },
        );
        info!(job = id, label = %label, delay_ms = delay.as_millis() as u64, "job scheduled");
        id
    }

    /// Run `job` at a local wall-clock time. Past times fire immediately.
    pub fn schedule_at<F>(&self, when: DateTime<Local>, label: impl Into<String>, job: F) -> JobId
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = (when - Local::now()).to_std().unwrap_or(Duration::ZERO);
        self.schedule_in(delay, label, job)
    }

    /// Cancel a job that has not fired yet.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.jobs.lock().remove(&id) {
            Some(job) => {
                job.abort.abort();
                info!(job = id, label = %job.label, "job cancelled");
                true
            }
            None => false,
        }
    }

    /// Jobs that have not fired, ordered by id.
    pub fn pending(&self) -> Vec<(JobId, String)> {
        let mut list: Vec<(JobId, String)> = self
            .jobs
            .lock()
            .iter()
            .map(|(id, job)| (*id, job.label.clone()))
            .collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }

    /// Abort every pending job. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<(JobId, PendingJob)> = self.jobs.lock().drain().collect();
        for (_, job) in &drained {
            job.abort.abort();
        }
        if !drained.is_empty() {
            info!(cancelled = drained.len(), "scheduler shut down");
        }
        drained.len()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.jobs.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn job_fires_and_leaves_pending_table() {
        let scheduler = Scheduler::new(Handle::current());
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = scheduler.schedule_in(Duration::from_millis(20), "ping", move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending(), vec![(id, "ping".to_string())]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(scheduler.pending().is_empty());
        assert!(!scheduler.cancel(id));
    }

    #[tokio::test]
    async fn cancelled_job_never_runs() {
        let scheduler = Scheduler::new(Handle::current());
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let id = scheduler.schedule_in(Duration::from_millis(50), "never", move || {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_aborts_everything() {
        let scheduler = Scheduler::new(Handle::current());
        let a = scheduler.schedule_in(Duration::from_secs(60), "a", || {});
        let b = scheduler.schedule_in(Duration::from_secs(60), "b", || {});
        assert!(a < b);
        assert_eq!(scheduler.pending().len(), 2);
        assert_eq!(scheduler.shutdown(), 2);
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn past_deadline_fires_immediately() {
        let scheduler = Scheduler::new(Handle::current());
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        scheduler.schedule_at(Local::now() - chrono::Duration::minutes(5), "late", move || {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
