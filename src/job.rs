//! A single synchronous scheduled job: a [`Recurrence`] paired with the
//! [`Callable`] it runs when due.

use jiff::Zoned;

use crate::callable::{
    BinaryCallable, Callable, IntoOutcome, NullaryCallable, Outcome, QuaternaryCallable,
    QuinaryCallable, SenaryCallable, TernaryCallable, UnaryCallable,
};
use crate::error::{CallableError, Result};
use crate::recurrence::{Deadline, JobHandle, Recurrence, Tag};
use crate::time::{Clock, FoldPolicy};

/// A fluent, periodic job. Constructed via [`crate::every`] /
/// [`crate::every_single`], finalized by one of the `run*` methods.
pub struct Job {
    pub(crate) recurrence: Recurrence,
    pub(crate) callable: Option<Box<dyn Callable>>,
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

macro_rules! forward_weekday_methods {
    ($($method:ident),* $(,)?) => {
        $(
            pub fn $method(mut self) -> Result<Self> {
                self.recurrence = self.recurrence.$method()?;
                Ok(self)
            }
        )*
    };
}

impl Job {
    pub(crate) fn new(interval: u32, clock: Clock) -> Self {
        Self {
            recurrence: Recurrence::new(interval, clock),
            callable: None,
        }
    }

    forward_unit_methods!(seconds, second, minutes, minute, hours, hour, days, day, weeks, week);
    forward_weekday_methods!(monday, tuesday, wednesday, thursday, friday, saturday, sunday);

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

    /// Attach a zero-argument work function and compute the first `next_run`.
    pub fn run<R>(mut self, name: impl Into<String>, work: fn() -> R) -> Result<Self>
    where
        R: IntoOutcome + 'static,
    {
        self.callable = Some(Box::new(NullaryCallable::new(name, work)));
        self.finalize()
    }

    pub fn run_one_arg<R, T1>(mut self, name: impl Into<String>, work: fn(T1) -> R, arg1: T1) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(UnaryCallable::new(name, work, arg1)));
        self.finalize()
    }

    pub fn run_two_args<R, T1, T2>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2) -> R,
        arg1: T1,
        arg2: T2,
    ) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(BinaryCallable::new(name, work, arg1, arg2)));
        self.finalize()
    }

    pub fn run_three_args<R, T1, T2, T3>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2, T3) -> R,
        arg1: T1,
        arg2: T2,
        arg3: T3,
    ) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
        T3: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(TernaryCallable::new(name, work, arg1, arg2, arg3)));
        self.finalize()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_four_args<R, T1, T2, T3, T4>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2, T3, T4) -> R,
        arg1: T1,
        arg2: T2,
        arg3: T3,
        arg4: T4,
    ) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
        T3: Clone + Send + Sync + 'static,
        T4: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(QuaternaryCallable::new(name, work, arg1, arg2, arg3, arg4)));
        self.finalize()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_five_args<R, T1, T2, T3, T4, T5>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2, T3, T4, T5) -> R,
        arg1: T1,
        arg2: T2,
        arg3: T3,
        arg4: T4,
        arg5: T5,
    ) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
        T3: Clone + Send + Sync + 'static,
        T4: Clone + Send + Sync + 'static,
        T5: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(QuinaryCallable::new(
            name, work, arg1, arg2, arg3, arg4, arg5,
        )));
        self.finalize()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_six_args<R, T1, T2, T3, T4, T5, T6>(
        mut self,
        name: impl Into<String>,
        work: fn(T1, T2, T3, T4, T5, T6) -> R,
        arg1: T1,
        arg2: T2,
        arg3: T3,
        arg4: T4,
        arg5: T5,
        arg6: T6,
    ) -> Result<Self>
    where
        R: IntoOutcome + 'static,
        T1: Clone + Send + Sync + 'static,
        T2: Clone + Send + Sync + 'static,
        T3: Clone + Send + Sync + 'static,
        T4: Clone + Send + Sync + 'static,
        T5: Clone + Send + Sync + 'static,
        T6: Clone + Send + Sync + 'static,
    {
        self.callable = Some(Box::new(SenaryCallable::new(
            name, work, arg1, arg2, arg3, arg4, arg5, arg6,
        )));
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

    /// Run the job's callable, advance `next_run`, and report whether the
    /// job should be unscheduled: either it asked to cancel, or its deadline
    /// has passed.
    pub(crate) fn execute(&mut self, now: &Zoned) -> std::result::Result<Outcome, CallableError> {
        let callable = self
            .callable
            .as_ref()
            .expect("a Job always has a callable once finalized");
        let result = callable.call();

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

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("description", &self.description())
            .field("next_run", &self.next_run())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::time::mock;
    use pretty_assertions::assert_eq;

    fn job() -> Job {
        Job::new(1, Clock::Mock(mock::Mock::default()))
    }

    fn noop() {}

    #[test]
    fn seconds_job_computes_next_run_one_second_out() {
        let j = job().seconds().unwrap().run("noop", noop).unwrap();
        let expected = mock::START.checked_add(jiff::SignedDuration::from_secs(1)).unwrap();
        assert_eq!(j.next_run(), Some(&expected));
    }

    #[test]
    fn singular_alias_rejects_interval_other_than_one() {
        let err = Job::new(2, Clock::Mock(mock::Mock::default())).second().unwrap_err();
        assert!(err.is_interval_error());
    }

    #[test]
    fn daily_at_time_in_the_future_today_is_kept_same_day() {
        let j = job()
            .days()
            .unwrap()
            .at("13:00:00")
            .unwrap()
            .run("noop", noop)
            .unwrap();
        assert_eq!(j.next_run().unwrap().date(), mock::START.date());
    }

    #[test]
    fn daily_at_time_already_passed_today_rolls_to_tomorrow() {
        let j = job()
            .days()
            .unwrap()
            .at("09:00:00")
            .unwrap()
            .run("noop", noop)
            .unwrap();
        assert_eq!(j.next_run().unwrap().date(), mock::START.date().tomorrow().unwrap());
    }

    #[test]
    fn weekday_anchor_requires_single_week_interval() {
        let err = Job::new(2, Clock::Mock(mock::Mock::default())).monday().unwrap_err();
        assert!(matches!(err, ScheduleError::WeekdayRequiresSingleWeek(_)));
    }

    #[test]
    fn at_without_unit_or_weekday_is_rejected() {
        let err = job().at("10:00").unwrap_err();
        assert!(matches!(err, ScheduleError::AtTimeInvalidUnit));
    }

    #[test]
    fn execute_checks_the_freshly_computed_next_run_against_the_deadline() {
        // the run that's about to happen (at +5s) is still before the
        // deadline (+7s), but the run after it (+10s) would not be: the job
        // must cancel now rather than wait for one more overdue run.
        let deadline = mock::START.checked_add(jiff::SignedDuration::from_secs(7)).unwrap();
        let mut j = Job::new(5, Clock::Mock(mock::Mock::default()))
            .seconds()
            .unwrap()
            .until(deadline)
            .unwrap()
            .run("noop", noop)
            .unwrap();
        let first_run = mock::START.checked_add(jiff::SignedDuration::from_secs(5)).unwrap();
        let outcome = j.execute(&first_run).unwrap();
        assert_eq!(outcome, Outcome::Cancel);
    }

    #[test]
    fn handle_identifies_the_job_independent_of_its_name() {
        let a = job().seconds().unwrap().run("noop", noop).unwrap();
        let b = job().seconds().unwrap().run("noop", noop).unwrap();
        assert_ne!(a.handle(), b.handle());
    }
}
