//! The async counterpart of [`crate::job::Job`]: same [`Recurrence`], but
//! the attached work returns a future instead of running inline.

use jiff::Zoned;

use crate::async_callable::{
    AsyncBinaryCallable, AsyncCallable, AsyncNullaryCallable, AsyncTernaryCallable, AsyncUnaryCallable,
};
use crate::callable::Outcome;
use crate::error::{CallableError, Result};
use crate::recurrence::{Deadline, JobHandle, Recurrence, Tag};
use crate::time::{Clock, FoldPolicy};
use std::future::Future;

pub struct AsyncJob {
    pub(crate) recurrence: Recurrence,
    pub(crate) callable: Option<Box<dyn AsyncCallable>>,
}

macro_rules! forward_unit_methods {
    ($($method:ident),* $(,)?) => {
        $(
            pub fn $method(mut self) -> Result<Self> {
                self.recurrence = self.recurrence.$method()?;
                Ok(self)
            }
        )*
    };
}

impl AsyncJob {
    pub(crate) fn new(interval: u32, clock: Clock) -> Self {
        Self {
            recurrence: Recurrence::new(interval, clock),
            callable: None,
        }
    }

    forward_unit_methods!(seconds, second, minutes, minute, hours, hour, days, day, weeks, week);

    pub fn monday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.monday()?;
        Ok(self)
    }
    pub fn tuesday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.tuesday()?;
        Ok(self)
    }
    pub fn wednesday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.wednesday()?;
        Ok(self)
    }
    pub fn thursday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.thursday()?;
        Ok(self)
    }
    pub fn friday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.friday()?;
        Ok(self)
    }
    pub fn saturday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.saturday()?;
        Ok(self)
    }
    pub fn sunday(mut self) -> Result<Self> {
        self.recurrence = self.recurrence.sunday()?;
        Ok(self)
    }

    pub fn to(mut self, latest: u32) -> Result<Self> {
        self.recurrence = self.recurrence.to(latest)?;
        Ok(self)
    }

    pub fn at(mut self, time_str: &str) -> Result<Self> {
        self.recurrence = self.recurrence.at(time_str)?;
        Ok(self)
    }

    pub fn until(mut self, deadline: impl Into<Deadline>) -> Result<Self> {
        self.recurrence = self.recurrence.until(deadline)?;
        Ok(self)
    }

    pub fn in_timezone(mut self, tz_name: &str) -> Result<Self> {
        self.recurrence = self.recurrence.in_timezone(tz_name)?;
        Ok(self)
    }

    pub fn fold_policy(mut self, policy: FoldPolicy) -> Self {
        self.recurrence = self.recurrence.fold_policy(policy);
        self
    }

    pub fn tag(mut self, tags: &[&str]) -> Self {
        self.recurrence.tag(tags);
        self
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.recurrence.has_tag(tag)
    }

    pub fn run<Fut, R>(mut self, name: impl Into<String>, work: fn() -> Fut) -> Result<Self>
    where
        Fut: Future<Output = R> + Send + 'static,
        R: crate::callable::IntoOutcome + 'static,
    {
        self.callable = Some(Box::new(AsyncNullaryCallable::new(name, work)));
        self.finalize()
    }

    pub fn run_one_arg<Fut, R, T1>(mut self, name: impl Into<String>, work: fn(T1) -> Fut, arg1: T1) -> Result<Self>
    where
        Fut: Future<Output = R> + Send + 'static,
        R: crate::callable::IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(AsyncUnaryCallable::new(name, work, arg1)));
        self.finalize()
    }

    pub fn run_two_args<Fut, R, T1, T2>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2) -> Fut,
        arg1: T1,
        arg2: T2,
    ) -> Result<Self>
    where
        Fut: Future<Output = R> + Send + 'static,
        R: crate::callable::IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(AsyncBinaryCallable::new(name, work, arg1, arg2)));
        self.finalize()
    }

    pub fn run_three_args<Fut, R, T1, T2, T3>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2, T3) -> Fut,
        arg1: T1,
        arg2: T2,
        arg3: T3,
    ) -> Result<Self>
    where
        Fut: Future<Output = R> + Send + 'static,
        R: crate::callable::IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
        T3: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(AsyncTernaryCallable::new(name, work, arg1, arg2, arg3)));
        self.finalize()
    }

    fn finalize(mut self) -> Result<Self> {
        self.recurrence.schedule_next_run()?;
        Ok(self)
    }

    pub fn handle(&self) -> JobHandle {
        self.recurrence.handle()
    }

    pub fn next_run(&self) -> Option<&Zoned> {
        self.recurrence.next_run.as_ref()
    }

    pub fn last_run(&self) -> Option<&Zoned> {
        self.recurrence.last_run.as_ref()
    }

    pub fn description(&self) -> String {
        match &self.callable {
            Some(c) => c.name().to_string(),
            None => "<job without a callable>".to_string(),
        }
    }

    pub(crate) fn should_run(&self, now: &Zoned) -> bool {
        self.recurrence.should_run(now)
    }

    pub(crate) fn is_overdue(&self, now: &Zoned) -> bool {
        self.recurrence.is_overdue(now)
    }

    /// Await the job's callable, advance `next_run`, and report whether the
    /// job should be unscheduled.
    pub(crate) async fn execute(&mut self, now: &Zoned) -> std::result::Result<Outcome, CallableError> {
        let callable = self
            .callable
            .as_ref()
            .expect("an AsyncJob always has a callable once finalized");
        let result = callable.call().await;

        self.recurrence.last_run = Some(now.clone());
        if let Err(e) = self.recurrence.schedule_next_run() {
            tracing::debug!(job = %self.description(), error = %e, "failed to reschedule after run");
        }

        match result {
            Ok(Outcome::Cancel) => Ok(Outcome::Cancel),
            Ok(Outcome::Continue) => {
                if self.recurrence.next_run.as_ref().is_some_and(|nr| self.is_overdue(nr)) {
                    Ok(Outcome::Cancel)
                } else {
                    Ok(Outcome::Continue)
                }
            }
            Err(source) => Err(CallableError {
                name: callable.name().to_string(),
                source,
            }),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.recurrence.tags.iter()
    }
}

impl std::fmt::Debug for AsyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJob")
            .field("description", &self.description())
            .field("next_run", &self.next_run())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::mock;

    fn job() -> AsyncJob {
        AsyncJob::new(1, Clock::Mock(mock::Mock::default()))
    }

    async fn noop() {}

    #[test]
    fn seconds_job_computes_next_run_one_second_out() {
        let j = job().seconds().unwrap().run("noop", noop).unwrap();
        let expected = mock::START.checked_add(jiff::SignedDuration::from_secs(1)).unwrap();
        assert_eq!(j.next_run(), Some(&expected));
    }

    #[test]
    fn execute_advances_last_run_and_reschedules() {
        let mut j = job().seconds().unwrap().run("noop", noop).unwrap();
        let now = mock::START.clone();
        let outcome = futures::executor::block_on(j.execute(&now)).unwrap();
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(j.last_run(), Some(&now));
    }
}
