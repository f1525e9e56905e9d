//! The async dispatcher: the same polling contract as [`crate::scheduler::Scheduler`],
//! but due jobs are awaited concurrently via [`futures::future::join_all`]
//! rather than run one at a time on the caller's thread.

use futures::future::join_all;
use jiff::{SignedDuration, Zoned};

use crate::async_job::AsyncJob;
use crate::callable::Outcome;
use crate::error::{default_error_handler, ErrorEvent, ErrorHandler};
use crate::recurrence::JobHandle;
use crate::registry::Registry;
use crate::time::Clock;

pub struct AsyncScheduler {
    registry: Registry<AsyncJob>,
    error_handler: ErrorHandler,
    pub(crate) clock: Clock,
}

impl AsyncScheduler {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            error_handler: default_error_handler(),
            clock: Clock::default(),
        }
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    /// Install a job built with [`crate::every_async`] / [`crate::every_single_async`].
    /// Returns a [`JobHandle`] identifying the installed job, independent of
    /// its (possibly non-unique) name, for later cancellation.
    pub fn add(&mut self, job: AsyncJob) -> JobHandle {
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

    pub fn get_jobs(&self) -> Vec<String> {
        self.registry.iter().map(AsyncJob::description).collect()
    }

    pub fn next_run(&self) -> Option<&Zoned> {
        self.registry.iter().filter_map(AsyncJob::next_run).min()
    }

    pub fn idle_seconds(&self) -> Option<i64> {
        let next = self.next_run()?;
        let now = self.clock.now_in(next.time_zone());
        Some(next.duration_since(&now).as_secs())
    }

    /// Await every job whose `next_run` is at or before the instant this
    /// call began, fanning all due jobs out concurrently and joining before
    /// returning. Like the sync dispatcher, the due set is a snapshot taken
    /// at entry: jobs rescheduled mid-run are picked up on the next call.
    pub async fn run_pending(&mut self) {
        let now = self.clock.now();
        let now_ref = &now;
        let due = self.registry.iter_mut().filter(|job| job.should_run(now_ref));

        let mut cancelled: Vec<JobHandle> = Vec::new();
        let mut runnable = Vec::new();
        for job in due {
            if job.is_overdue(now_ref) {
                cancelled.push(job.handle());
                continue;
            }
            runnable.push(job);
        }

        let results = join_all(runnable.into_iter().map(|job| async move {
            let handle = job.handle();
            let description = job.description();
            let result = job.execute(now_ref).await;
            (result, handle, description)
        }))
        .await;

        for (result, handle, description) in results {
            match result {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::Cancel) => cancelled.push(handle),
                Err(error) => (self.error_handler)(ErrorEvent {
                    job_description: description,
                    error,
                }),
            }
        }
        if !cancelled.is_empty() {
            self.registry.remove_where(|j| cancelled.contains(&j.handle()));
        }
    }

    pub async fn run_all(&mut self, delay: SignedDuration) {
        let now = self.clock.now();
        let futures_iter = self.registry.iter_mut().map(|job| {
            let now_ref = &now;
            let handle = job.handle();
            async move { (job.execute(now_ref).await, handle) }
        });
        let results = join_all(futures_iter).await;
        if !delay.is_zero() {
            std::thread::sleep(delay.unsigned_abs());
        }

        let mut cancelled: Vec<JobHandle> = Vec::new();
        for (result, handle) in results {
            if let Ok(Outcome::Cancel) = result {
                cancelled.push(handle);
            }
        }
        if !cancelled.is_empty() {
            self.registry.remove_where(|j| cancelled.contains(&j.handle()));
        }
    }
}

impl Default for AsyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_job::AsyncJob;
    use crate::time::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    async fn count() {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn scheduler() -> AsyncScheduler {
        AsyncScheduler {
            registry: Registry::new(),
            error_handler: default_error_handler(),
            clock: Clock::Mock(mock::Mock::default()),
        }
    }

    #[test]
    fn run_pending_runs_due_jobs_concurrently() {
        CALLS.store(0, Ordering::SeqCst);
        let mut s = scheduler();
        let clock = Clock::Mock(mock::Mock::default());
        let job1 = AsyncJob::new(1, clock.clone()).seconds().unwrap().run("count", count).unwrap();
        let clock2 = Clock::Mock(mock::Mock::default());
        let job2 = AsyncJob::new(1, clock2).seconds().unwrap().run("count", count).unwrap();
        s.add(job1);
        s.add(job2);
        s.clock.add_duration(SignedDuration::from_secs(1));
        futures::executor::block_on(s.run_pending());
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn cancel_job_by_handle_leaves_jobs_sharing_its_name_alone() {
        let mut s = scheduler();
        let handle_a = s.add(
            AsyncJob::new(1, Clock::Mock(mock::Mock::default()))
                .seconds()
                .unwrap()
                .run("count", count)
                .unwrap(),
        );
        s.add(
            AsyncJob::new(1, Clock::Mock(mock::Mock::default()))
                .seconds()
                .unwrap()
                .run("count", count)
                .unwrap(),
        );
        s.cancel_job(&handle_a);
        assert_eq!(s.len(), 1);
    }
}
