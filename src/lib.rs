//! A fluent, in-process periodic job scheduler.
//!
//! ```
//! use metronome::{every, Scheduler};
//!
//! fn greet() {
//!     println!("hello");
//! }
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.add(every(10).seconds().unwrap().run("greet", greet).unwrap());
//!
//! scheduler.run_pending();
//! ```
//!
//! Jobs are built with [`every`] / [`every_single`], describing a cadence
//! (`.seconds()`, `.days()`, `.monday()`, ...), an optional wall-clock anchor
//! (`.at("10:30")`), an optional IANA timezone (`.in_timezone("Europe/Berlin")`),
//! an optional deadline (`.until(...)`), and finally a work function via one
//! of the `.run*` methods. A [`Scheduler`] owns a set of built jobs and runs
//! whichever are due each time [`Scheduler::run_pending`] is called; embedding
//! that call in your own loop is the only "runtime" this crate asks for.
//!
//! The [`async_job`] / [`async_scheduler`] modules mirror this API for work
//! functions that return a future, behind the `async` Cargo feature.

#[cfg(feature = "async")]
mod async_callable;
#[cfg(feature = "async")]
mod async_job;
#[cfg(feature = "async")]
mod async_scheduler;
mod callable;
mod error;
mod job;
mod patterns;
mod recurrence;
mod registry;
mod time;

pub use callable::{
    BinaryCallable, Callable, IntoOutcome, NullaryCallable, Outcome, QuaternaryCallable,
    QuinaryCallable, SenaryCallable, TernaryCallable, UnaryCallable,
};
pub use error::{CallableError, ErrorEvent, ErrorHandler, Result, ScheduleError};
pub use job::Job;
pub use recurrence::{Deadline, JobHandle, Tag};
pub use scheduler::Scheduler;
pub use time::{FoldPolicy, TimeUnit, Weekday};

#[cfg(feature = "async")]
pub use async_callable::{
    AsyncBinaryCallable, AsyncCallable, AsyncNullaryCallable, AsyncTernaryCallable, AsyncUnaryCallable,
};
#[cfg(feature = "async")]
pub use async_job::AsyncJob;
#[cfg(feature = "async")]
pub use async_scheduler::AsyncScheduler;

mod scheduler;

use time::Clock;

/// Start building a job that repeats every `interval` units of a cadence
/// you choose next (`.seconds()`, `.minutes()`, `.monday()`, ...).
pub fn every(interval: u32) -> Job {
    Job::new(interval, Clock::Real)
}

/// Shorthand for `every(1)`, required by the singular cadence aliases
/// (`.second()`, `.day()`, ...) and by weekday anchors.
pub fn every_single() -> Job {
    Job::new(1, Clock::Real)
}

/// The async counterpart of [`every`].
#[cfg(feature = "async")]
pub fn every_async(interval: u32) -> AsyncJob {
    AsyncJob::new(interval, Clock::Real)
}

/// The async counterpart of [`every_single`].
#[cfg(feature = "async")]
pub fn every_single_async() -> AsyncJob {
    AsyncJob::new(1, Clock::Real)
}
