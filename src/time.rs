//! Access to "now" and the vocabulary for expressing recurrence cadence.
//!
//! Every point that needs the current time goes through [`Clock`], so tests
//! can swap in a fixed instant instead of reading the system clock.

use std::fmt;

use jiff::tz::{Disambiguation, TimeZone};
use jiff::{civil, SignedDuration, Zoned};

use crate::error::{Result, ScheduleError};

/// Jobs can be periodic over one of these units of time.
///
/// Deliberately does not include month or year: the domain this crate
/// models (and the library it is modeled on) only ever expresses recurrence
/// in units that divide evenly into a fixed number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    fn seconds_per_unit(self) -> i64 {
        use TimeUnit::{Days, Hours, Minutes, Seconds, Weeks};
        match self {
            Seconds => 1,
            Minutes => 60,
            Hours => 3_600,
            Days => 86_400,
            Weeks => 7 * 86_400,
        }
    }

    /// The elapsed-time duration covered by `interval` repetitions of this unit.
    ///
    /// This is deliberately calendar-insensitive (a day is always 86,400
    /// seconds, even across a DST transition): the base cadence is computed
    /// as pure elapsed time, and any wall-clock correction happens
    /// separately as an explicit snap against an anchor.
    pub fn duration(self, interval: u32) -> SignedDuration {
        SignedDuration::from_secs(i64::from(interval) * self.seconds_per_unit())
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TimeUnit::{Days, Hours, Minutes, Seconds, Weeks};
        let s = match self {
            Seconds => "second",
            Minutes => "minute",
            Hours => "hour",
            Days => "day",
            Weeks => "week",
        };
        write!(f, "{s}")
    }
}

/// A day of the week a weekly job can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Number of days from Monday, `0..=6`.
    pub(crate) fn num_days_from_monday(self) -> i64 {
        use Weekday::{Friday, Monday, Saturday, Sunday, Thursday, Tuesday, Wednesday};
        match self {
            Monday => 0,
            Tuesday => 1,
            Wednesday => 2,
            Thursday => 3,
            Friday => 4,
            Saturday => 5,
            Sunday => 6,
        }
    }

    pub(crate) fn from_civil(w: civil::Weekday) -> Self {
        use civil::Weekday as C;
        match w {
            C::Monday => Weekday::Monday,
            C::Tuesday => Weekday::Tuesday,
            C::Wednesday => Weekday::Wednesday,
            C::Thursday => Weekday::Thursday,
            C::Friday => Weekday::Friday,
            C::Saturday => Weekday::Saturday,
            C::Sunday => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Weekday::{Friday, Monday, Saturday, Sunday, Thursday, Tuesday, Wednesday};
        let s = match self {
            Monday => "Mon",
            Tuesday => "Tue",
            Wednesday => "Wed",
            Thursday => "Thu",
            Friday => "Fri",
            Saturday => "Sat",
            Sunday => "Sun",
        };
        write!(f, "{s}")
    }
}

/// How to resolve a wall-clock anchor that lands in a DST fold (the clock
/// value exists twice) or a gap (the clock value never happens).
///
/// Gaps are always resolved the same way regardless of policy: the
/// candidate advances by exactly the size of the gap, landing on the first
/// instant that actually exists, per the spec this crate implements. The
/// policy only changes which side of a *fold* wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldPolicy {
    /// Pick the first (pre-transition) occurrence. Also resolves gaps by
    /// advancing past them. This is the default.
    #[default]
    First,
    /// Pick the second (post-transition) occurrence of a fold.
    Last,
    /// Refuse to guess; a fold or gap becomes `ScheduleError::AmbiguousTime`.
    Raise,
}

impl FoldPolicy {
    fn disambiguation(self) -> Disambiguation {
        match self {
            FoldPolicy::First => Disambiguation::Compatible,
            FoldPolicy::Last => Disambiguation::Later,
            FoldPolicy::Raise => Disambiguation::Reject,
        }
    }
}

/// Combine a civil date and time into a zoned instant in `tz`, resolving any
/// DST fold or gap according to `policy`.
pub(crate) fn civil_in_zone(
    date: civil::Date,
    time: civil::Time,
    tz: &TimeZone,
    policy: FoldPolicy,
) -> Result<Zoned> {
    let dt = date.to_datetime(time);
    tz.to_ambiguous_zoned(dt)
        .disambiguate(policy.disambiguation())
        .map_err(|e| ScheduleError::AmbiguousTime(e.to_string()))
}

/// Source of "now", injectable for deterministic tests.
#[derive(Debug, Clone)]
pub(crate) enum Clock {
    Real,
    #[cfg(test)]
    Mock(mock::Mock),
}

impl Default for Clock {
    fn default() -> Self {
        Clock::Real
    }
}

impl Clock {
    /// Current instant in `tz`, truncated to whole seconds.
    pub(crate) fn now_in(&self, tz: &TimeZone) -> Zoned {
        let raw = match self {
            Clock::Real => Zoned::now().with_time_zone(tz.clone()),
            #[cfg(test)]
            Clock::Mock(m) => m.now().with_time_zone(tz.clone()),
        };
        truncate_to_seconds(&raw)
    }

    /// Current instant in the host's local zone.
    pub(crate) fn now(&self) -> Zoned {
        self.now_in(&TimeZone::system())
    }

    #[cfg(test)]
    pub(crate) fn add_duration(&mut self, duration: SignedDuration) {
        match self {
            Clock::Mock(m) => m.add_duration(duration),
            Clock::Real => unreachable!("cannot advance the real clock"),
        }
    }
}

fn truncate_to_seconds(z: &Zoned) -> Zoned {
    z.with()
        .nanosecond(0)
        .build()
        .unwrap_or_else(|_| z.clone())
}

#[cfg(test)]
pub(crate) mod mock {
    use super::{SignedDuration, TimeZone, Zoned};
    use std::sync::LazyLock;

    /// A fixed starting instant used across the test suite: 2021-01-01 12:00:00 local.
    pub(crate) static START: LazyLock<Zoned> = LazyLock::new(|| {
        jiff::civil::date(2021, 1, 1)
            .at(12, 0, 0, 0)
            .to_zoned(TimeZone::system())
            .expect("static test instant is always constructible")
    });

    #[derive(Debug, Clone)]
    pub(crate) struct Mock {
        stamp: Zoned,
    }

    impl Mock {
        pub(crate) fn new(stamp: Zoned) -> Self {
            Self { stamp }
        }

        pub(crate) fn now(&self) -> Zoned {
            self.stamp.clone()
        }

        pub(crate) fn add_duration(&mut self, duration: SignedDuration) {
            self.stamp = self
                .stamp
                .checked_add(duration)
                .expect("test durations never overflow");
        }
    }

    impl Default for Mock {
        fn default() -> Self {
            Self::new(START.clone())
        }
    }
}
