//! The synchronous dispatcher: polls installed [`Job`]s and runs whichever
//! are due.

use jiff::{SignedDuration, Zoned};

use crate::callable::Outcome;
use crate::error::{default_error_handler, ErrorEvent, ErrorHandler};
use crate::job::Job;
use crate::recurrence::JobHandle;
use crate::registry::Registry;
use crate::time::Clock;

/// Owns a set of jobs and runs whichever are due when polled.
///
/// Polling is the caller's responsibility: embed a call to [`Scheduler::run_pending`]
/// in your own loop (a `tick()` handler, an event-loop callback, a
/// `std::thread::sleep` loop, whatever fits the host program). This crate
/// never spawns its own background thread.
pub struct Scheduler {
    registry: Registry<Job>,
    error_handler: ErrorHandler,
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) clock: Clock,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            error_handler: default_error_handler(),
            clock: Clock::default(),
        }
    }

    /// Replace the default "log and continue" callable-error hook.
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    /// Install a job built with [`crate::every`] / [`crate::every_single`].
    /// Returns a [`JobHandle`] identifying the installed job, independent of
    /// its (possibly non-unique) name, for later cancellation.
    pub fn add(&mut self, job: Job) -> JobHandle {
        let handle = job.handle();
        self.registry.install(job);
        handle
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Unschedule the job identified by `handle`.
    pub fn cancel_job(&mut self, handle: &JobHandle) {
        self.registry.remove_where(|j| j.handle() == *handle);
    }

    /// Unschedule every job carrying `tag`.
    pub fn cancel_tag(&mut self, tag: &str) {
        self.registry.remove_where(|j| j.is_tagged(tag));
    }

    /// A defensive copy of every job's description, for inspection.
    pub fn get_jobs(&self) -> Vec<String> {
        self.registry.iter().map(Job::description).collect()
    }

    pub fn jobs_tagged(&self, tag: &str) -> Vec<String> {
        self.registry
            .iter()
            .filter(|j| j.is_tagged(tag))
            .map(Job::description)
            .collect()
    }

    /// The earliest `next_run` among installed jobs, if any are scheduled.
    pub fn next_run(&self) -> Option<&Zoned> {
        self.registry.iter().filter_map(Job::next_run).min()
    }

    /// Seconds until the next job is due, or `None` if no job is scheduled.
    pub fn idle_seconds(&self) -> Option<i64> {
        let next = self.next_run()?;
        let now = self.clock.now_in(next.time_zone());
        Some(next.duration_since(&now).as_secs())
    }

    /// Run every job whose `next_run` is at or before the instant this call
    /// began. Jobs installed or rescheduled mid-run are not re-examined
    /// until the next call: the due set is a snapshot taken at entry.
    pub fn run_pending(&mut self) {
        let now = self.clock.now();
        let due: Vec<bool> = self.registry.iter().map(|j| j.should_run(&now)).collect();

        let mut cancelled: Vec<JobHandle> = Vec::new();
        for (job, is_due) in self.registry.iter_mut().zip(due) {
            if !is_due {
                continue;
            }
            if job.is_overdue(&now) {
                cancelled.push(job.handle());
                continue;
            }
            match job.execute(&now) {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Cancel) => cancelled.push(job.handle()),
                Err(error) => {
                    (self.error_handler)(ErrorEvent {
                        job_description: job.description(),
                        error,
                    });
                }
            }
        }

        if !cancelled.is_empty() {
            self.registry.remove_where(|j| cancelled.contains(&j.handle()));
        }
    }

    /// Run every installed job once immediately, regardless of `next_run`,
    /// sleeping `delay` between each. Intended for manual "run everything
    /// now" invocations (e.g. a CLI `--run-once` flag), not normal polling.
    pub fn run_all(&mut self, delay: SignedDuration) {
        let now = self.clock.now();
        let mut cancelled: Vec<JobHandle> = Vec::new();
        let mut first = true;
        for job in self.registry.iter_mut() {
            if !first && !delay.is_zero() {
                std::thread::sleep(delay.unsigned_abs());
            }
            first = false;
            match job.execute(&now) {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Cancel) => cancelled.push(job.handle()),
                Err(_) => {}
            }
        }
        if !cancelled.is_empty() {
            self.registry.remove_where(|j| cancelled.contains(&j.handle()));
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::time::mock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count() {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn scheduler() -> Scheduler {
        Scheduler {
            registry: Registry::new(),
            error_handler: default_error_handler(),
            clock: Clock::Mock(mock::Mock::default()),
        }
    }

    #[test]
    fn run_pending_skips_jobs_not_yet_due() {
        CALLS.store(0, Ordering::SeqCst);
        let mut s = scheduler();
        let job = Job::new(60, Clock::Mock(mock::Mock::default()))
            .seconds()
            .unwrap()
            .run("count", count)
            .unwrap();
        s.add(job);
        s.run_pending();
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_pending_runs_due_jobs_and_reschedules() {
        CALLS.store(0, Ordering::SeqCst);
        let mut s = scheduler();
        let clock = Clock::Mock(mock::Mock::default());
        let job = Job::new(1, clock).seconds().unwrap().run("count", count).unwrap();
        s.add(job);
        s.clock.add_duration(SignedDuration::from_secs(1));
        s.run_pending();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancel_tag_removes_tagged_jobs() {
        let mut s = scheduler();
        let job = Job::new(1, Clock::Mock(mock::Mock::default()))
            .seconds()
            .unwrap()
            .tag(&["daily-report"])
            .run("count", count)
            .unwrap();
        s.add(job);
        s.cancel_tag("daily-report");
        assert!(s.is_empty());
    }

    #[test]
    fn cancel_job_by_handle_leaves_jobs_sharing_its_name_alone() {
        let mut s = scheduler();
        let handle_a = s.add(
            Job::new(1, Clock::Mock(mock::Mock::default()))
                .seconds()
                .unwrap()
                .run("count", count)
                .unwrap(),
        );
        s.add(
            Job::new(1, Clock::Mock(mock::Mock::default()))
                .seconds()
                .unwrap()
                .run("count", count)
                .unwrap(),
        );
        s.cancel_job(&handle_a);
        assert_eq!(s.len(), 1);
    }
}
