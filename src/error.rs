//! The error taxonomy surfaced by the builder, the recurrence engine, and
//! the dispatcher's callable-error reporting hook.

use thiserror::Error;

use crate::time::Weekday;

/// Every failure this crate can produce.
///
/// Builder and finalize failures (`Invalid*`, `Unit*`, `Weekday*`,
/// `UnknownTimezone`, `AmbiguousTime`, `NoUnitSet`) are raised synchronously
/// at the call site that violated an invariant; the partially-built job is
/// simply dropped.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid unit for at() (valid units are `days`, `hours`, and `minutes`)")]
    AtTimeInvalidUnit,

    #[error("invalid time format for a daily job (valid format is HH:MM(:SS)?)")]
    InvalidDailyAtStr,

    #[error("invalid time format for an hourly job (valid format is (MM)?:SS)")]
    InvalidHourlyAtStr,

    #[error("invalid time format for a minutely job (valid format is :SS)")]
    InvalidMinuteAtStr,

    #[error("invalid hour ({0} is not between 0 and 23)")]
    InvalidHour(u32),

    #[error("use {plural}() instead of {singular}()")]
    IntervalError {
        singular: &'static str,
        plural: &'static str,
    },

    #[error("scheduling jobs on {0} is only allowed for weekly jobs; using a specific day on a job scheduled every 2 or more weeks is not supported")]
    WeekdayRequiresSingleWeek(Weekday),

    #[error("cannot anchor to {new} weekly, job is already anchored to {existing}")]
    WeekdayAlreadySet { existing: Weekday, new: Weekday },

    #[error("cannot set {requested} mode, already using {existing}")]
    UnitAlreadySet {
        existing: crate::time::TimeUnit,
        requested: crate::time::TimeUnit,
    },

    #[error("`latest` ({latest}) must be >= `interval` ({interval})")]
    InvalidInterval { interval: u32, latest: u32 },

    #[error("at() requires `days`, `hours`, `minutes`, or a weekday anchor to already be set")]
    UnspecifiedStartDay,

    #[error("a weekday anchor requires `unit` to be `weeks`")]
    StartDayRequiresWeeks,

    #[error("cannot schedule a job to run until a time in the past")]
    InvalidUntilTime,

    #[error("invalid string format for until(): {0:?}")]
    InvalidUntilString(String),

    #[error("unknown IANA timezone: {0:?}")]
    UnknownTimezone(String),

    #[error("ambiguous local time during a DST transition: {0}")]
    AmbiguousTime(String),

    #[error("job has no unit set; call .seconds()/.minutes()/.../.monday() etc. before .do()")]
    NoUnitSet,
}

/// `ScheduleValueError` and `IntervalError` are, in the library this crate is
/// modeled on, subclasses of a single base exception. Rust has no exception
/// hierarchy, so both live as `ScheduleError` variants; these helpers group
/// variants the way calling code usually wants to match them.
impl ScheduleError {
    /// True for anything that represents a malformed *value* passed to the
    /// builder, as opposed to a structural misuse of the grammar.
    pub fn is_value_error(&self) -> bool {
        !matches!(self, ScheduleError::IntervalError { .. })
    }

    pub fn is_interval_error(&self) -> bool {
        matches!(self, ScheduleError::IntervalError { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// An error raised by a job's own work function.
///
/// Carries whatever the callable produced as its failure value, boxed so
/// that callables can return any `std::error::Error` without the scheduler
/// needing to know its concrete type.
#[derive(Debug, Error)]
#[error("job {name:?} failed: {source}")]
pub struct CallableError {
    pub name: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// Delivered to the scheduler's error hook whenever a due job's callable
/// returns an error. The loop continues; the job stays scheduled and is
/// retried at its next `next_run`.
#[derive(Debug)]
pub struct ErrorEvent {
    pub job_description: String,
    pub error: CallableError,
}

/// Callback invoked for every `ErrorEvent`. Defaults to a `tracing::debug!`
/// line, matching this crate's default "swallow and log" policy.
pub type ErrorHandler = Box<dyn Fn(ErrorEvent) + Send + Sync>;

pub(crate) fn default_error_handler() -> ErrorHandler {
    Box::new(|event: ErrorEvent| {
        tracing::debug!(
            job = %event.job_description,
            error = %event.error,
            "job callable returned an error"
        );
    })
}
