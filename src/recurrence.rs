//! The recurrence engine: everything needed to compute `next_run` from a
//! declarative cadence, independent of what kind of work a job performs.
//!
//! [`Job`](crate::job::Job) and [`AsyncJob`](crate::async_job::AsyncJob)
//! both embed a [`Recurrence`] and forward their builder methods to it, so
//! the DST-aware scheduling math in [`Recurrence::schedule_next_run`] is
//! written and tested exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "random")]
use rand::Rng;

use jiff::fmt::strtime;
use jiff::tz::TimeZone;
use jiff::{civil, SignedDuration, Span, Zoned};

use crate::error::{Result, ScheduleError};
use crate::time::{civil_in_zone, Clock, FoldPolicy, TimeUnit, Weekday};

pub type Tag = String;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// A stable identity for an installed job, assigned once at construction and
/// independent of the job's (possibly non-unique) human-readable name.
/// `Scheduler::add` / `AsyncScheduler::add` return one; `cancel_job` takes
/// one back to remove exactly that job, never one sharing its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

/// The value accepted by `.until(...)`.
///
/// Beyond an absolute [`Zoned`] instant, this also accepts a [`Span`] (added
/// to "now"), a [`civil::Time`] (combined with today's date in the job's
/// zone), or a string tried against the same small format list as the
/// library this crate is modeled on: `"%Y-%m-%d %H:%M:%S"`, `"%Y-%m-%d %H:%M"`,
/// `"%Y-%m-%d"`, `"%H:%M:%S"`, `"%H:%M"`.
pub enum Deadline {
    At(Zoned),
    In(Span),
    TodayAt(civil::Time),
    Str(String),
}

impl From<Zoned> for Deadline {
    fn from(z: Zoned) -> Self {
        Deadline::At(z)
    }
}

impl From<Span> for Deadline {
    fn from(s: Span) -> Self {
        Deadline::In(s)
    }
}

impl From<civil::Time> for Deadline {
    fn from(t: civil::Time) -> Self {
        Deadline::TodayAt(t)
    }
}

impl From<&str> for Deadline {
    fn from(s: &str) -> Self {
        Deadline::Str(s.to_string())
    }
}

impl From<String> for Deadline {
    fn from(s: String) -> Self {
        Deadline::Str(s)
    }
}

const UNTIL_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const UNTIL_DATE_FORMAT: &str = "%Y-%m-%d";
const UNTIL_TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Everything about a job except the work it performs: interval, unit,
/// anchors, timezone, deadline, tags, and the computed schedule state.
#[derive(Debug, Clone)]
pub struct Recurrence {
    pub(crate) handle: JobHandle,
    pub(crate) interval: u32,
    pub(crate) latest: Option<u32>,
    pub(crate) unit: Option<TimeUnit>,
    pub(crate) at_time: Option<civil::Time>,
    pub(crate) start_day: Option<Weekday>,
    pub(crate) timezone: Option<TimeZone>,
    pub(crate) tags: HashSet<Tag>,
    pub(crate) last_run: Option<Zoned>,
    pub(crate) next_run: Option<Zoned>,
    pub(crate) period: Option<SignedDuration>,
    pub(crate) cancel_after: Option<Zoned>,
    pub(crate) fold_policy: FoldPolicy,
    pub(crate) clock: Clock,
}

impl Recurrence {
    pub(crate) fn new(interval: u32, clock: Clock) -> Self {
        Self {
            handle: JobHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
            interval,
            latest: None,
            unit: None,
            at_time: None,
            start_day: None,
            timezone: None,
            tags: HashSet::new(),
            last_run: None,
            next_run: None,
            period: None,
            cancel_after: None,
            fold_policy: FoldPolicy::default(),
            clock,
        }
    }

    pub(crate) fn handle(&self) -> JobHandle {
        self.handle
    }

    pub(crate) fn now(&self) -> Zoned {
        match &self.timezone {
            Some(tz) => self.clock.now_in(tz),
            None => self.clock.now(),
        }
    }

    fn zone(&self) -> TimeZone {
        self.timezone.clone().unwrap_or_else(TimeZone::system)
    }

    pub(crate) fn tag(&mut self, tags: &[&str]) {
        for &t in tags {
            self.tags.insert(t.to_string());
        }
    }

    pub(crate) fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    fn set_unit_mode(mut self, unit: TimeUnit) -> Result<Self> {
        match self.unit {
            Some(existing) if existing != unit => Err(ScheduleError::UnitAlreadySet {
                existing,
                requested: unit,
            }),
            _ => {
                self.unit = Some(unit);
                Ok(self)
            }
        }
    }

    fn set_single_unit_mode(self, unit: TimeUnit, singular: &'static str, plural: &'static str) -> Result<Self> {
        if self.interval != 1 {
            Err(ScheduleError::IntervalError { singular, plural })
        } else {
            self.set_unit_mode(unit)
        }
    }

    pub fn seconds(self) -> Result<Self> {
        self.set_unit_mode(TimeUnit::Seconds)
    }
    pub fn second(self) -> Result<Self> {
        self.set_single_unit_mode(TimeUnit::Seconds, "second", "seconds")
    }
    pub fn minutes(self) -> Result<Self> {
        self.set_unit_mode(TimeUnit::Minutes)
    }
    pub fn minute(self) -> Result<Self> {
        self.set_single_unit_mode(TimeUnit::Minutes, "minute", "minutes")
    }
    pub fn hours(self) -> Result<Self> {
        self.set_unit_mode(TimeUnit::Hours)
    }
    pub fn hour(self) -> Result<Self> {
        self.set_single_unit_mode(TimeUnit::Hours, "hour", "hours")
    }
    pub fn days(self) -> Result<Self> {
        self.set_unit_mode(TimeUnit::Days)
    }
    pub fn day(self) -> Result<Self> {
        self.set_single_unit_mode(TimeUnit::Days, "day", "days")
    }
    pub fn weeks(self) -> Result<Self> {
        self.set_unit_mode(TimeUnit::Weeks)
    }
    pub fn week(self) -> Result<Self> {
        self.set_single_unit_mode(TimeUnit::Weeks, "week", "weeks")
    }

    fn set_weekday_mode(mut self, weekday: Weekday) -> Result<Self> {
        if self.interval != 1 {
            return Err(ScheduleError::WeekdayRequiresSingleWeek(weekday));
        }
        if let Some(existing) = self.start_day {
            return Err(ScheduleError::WeekdayAlreadySet {
                existing,
                new: weekday,
            });
        }
        self.start_day = Some(weekday);
        self.weeks()
    }

    pub fn monday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Monday)
    }
    pub fn tuesday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Tuesday)
    }
    pub fn wednesday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Wednesday)
    }
    pub fn thursday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Thursday)
    }
    pub fn friday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Friday)
    }
    pub fn saturday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Saturday)
    }
    pub fn sunday(self) -> Result<Self> {
        self.set_weekday_mode(Weekday::Sunday)
    }

    /// Schedule the job to run at a randomized interval in `[interval, latest]`.
    pub fn to(mut self, latest: u32) -> Result<Self> {
        if latest < self.interval {
            return Err(ScheduleError::InvalidInterval {
                interval: self.interval,
                latest,
            });
        }
        self.latest = Some(latest);
        Ok(self)
    }

    /// Interpret `at()` and the wall-clock snap in the named IANA zone
    /// instead of the host's local zone.
    pub fn in_timezone(mut self, tz_name: &str) -> Result<Self> {
        let tz = TimeZone::get(tz_name)
            .map_err(|_| ScheduleError::UnknownTimezone(tz_name.to_string()))?;
        self.timezone = Some(tz);
        Ok(self)
    }

    /// Set the scheduler-wide policy for resolving a DST fold.
    pub fn fold_policy(mut self, policy: FoldPolicy) -> Self {
        self.fold_policy = policy;
        self
    }

    /// Parse and store a wall-clock anchor. See the `at()` format table in
    /// the crate docs for accepted strings per unit.
    pub fn at(mut self, time_str: &str) -> Result<Self> {
        use TimeUnit::{Days, Hours, Minutes};

        let days_or_hours_or_minutes = matches!(self.unit, Some(Days) | Some(Hours) | Some(Minutes));
        if !days_or_hours_or_minutes && self.start_day.is_none() {
            return Err(ScheduleError::AtTimeInvalidUnit);
        }

        let is_daily = self.unit == Some(Days) || self.start_day.is_some();
        if is_daily && !crate::patterns::DAILY_RE.is_match(time_str) {
            return Err(ScheduleError::InvalidDailyAtStr);
        }
        if self.unit == Some(Hours) && !crate::patterns::HOURLY_RE.is_match(time_str) {
            return Err(ScheduleError::InvalidHourlyAtStr);
        }
        if self.unit == Some(Minutes) && !crate::patterns::MINUTE_RE.is_match(time_str) {
            return Err(ScheduleError::InvalidMinuteAtStr);
        }

        let parts: Vec<&str> = time_str.split(':').collect();
        let (mut hour, mut minute, second): (i64, i64, i64) = match parts.len() {
            3 => (
                parts[0].parse().unwrap(),
                parts[1].parse().unwrap(),
                parts[2].parse().unwrap(),
            ),
            2 if self.unit == Some(Minutes) => (0, 0, parts[1].parse().unwrap()),
            2 if self.unit == Some(Hours) => {
                if parts[0].is_empty() {
                    (0, parts[1].parse().unwrap(), 0)
                } else {
                    (0, parts[0].parse().unwrap(), parts[1].parse().unwrap())
                }
            }
            _ => (parts[0].parse().unwrap(), parts[1].parse().unwrap(), 0),
        };

        if is_daily {
            if !(0..=23).contains(&hour) {
                return Err(ScheduleError::InvalidHour(hour as u32));
            }
        } else if self.unit == Some(Hours) {
            hour = 0;
        } else if self.unit == Some(Minutes) {
            hour = 0;
            minute = 0;
        }

        self.at_time = Some(civil::Time::new(hour as i8, minute as i8, second as i8, 0)
            .map_err(|_| ScheduleError::InvalidDailyAtStr)?);
        Ok(self)
    }

    /// Schedule the job to be cancelled once `deadline` has passed.
    pub fn until(mut self, deadline: impl Into<Deadline>) -> Result<Self> {
        let resolved = self.resolve_deadline(deadline.into())?;
        if resolved < self.now() {
            return Err(ScheduleError::InvalidUntilTime);
        }
        self.cancel_after = Some(resolved);
        Ok(self)
    }

    fn resolve_deadline(&self, deadline: Deadline) -> Result<Zoned> {
        let tz = self.zone();
        match deadline {
            Deadline::At(z) => Ok(z),
            Deadline::In(span) => self
                .now()
                .checked_add(span)
                .map_err(|_| ScheduleError::InvalidUntilTime),
            Deadline::TodayAt(time) => civil_in_zone(self.now().date(), time, &tz, self.fold_policy),
            Deadline::Str(s) => self.parse_until_str(&s),
        }
    }

    fn parse_until_str(&self, s: &str) -> Result<Zoned> {
        let tz = self.zone();
        for fmt in UNTIL_DATETIME_FORMATS {
            if let Ok(tm) = strtime::parse(fmt, s) {
                if let Ok(dt) = tm.to_datetime() {
                    return civil_in_zone(dt.date(), dt.time(), &tz, self.fold_policy);
                }
            }
        }
        if let Ok(tm) = strtime::parse(UNTIL_DATE_FORMAT, s) {
            if let Ok(date) = tm.to_date() {
                return civil_in_zone(date, civil::Time::midnight(), &tz, self.fold_policy);
            }
        }
        for fmt in UNTIL_TIME_FORMATS {
            if let Ok(tm) = strtime::parse(fmt, s) {
                if let Ok(time) = tm.to_time() {
                    return civil_in_zone(self.now().date(), time, &tz, self.fold_policy);
                }
            }
        }
        Err(ScheduleError::InvalidUntilString(s.to_string()))
    }

    pub(crate) fn is_overdue(&self, when: &Zoned) -> bool {
        self.cancel_after.as_ref().is_some_and(|d| when > d)
    }

    pub(crate) fn should_run(&self, now: &Zoned) -> bool {
        self.next_run.as_ref().is_some_and(|nr| now >= nr)
    }

    /// Compute `next_run` from `self.last_run` (or "now" if this is the
    /// first scheduling). This is the recurrence engine's single contract:
    /// `compute_next(spec, reference) -> instant`.
    pub(crate) fn schedule_next_run(&mut self) -> Result<()> {
        let unit = self.unit.ok_or(ScheduleError::NoUnitSet)?;

        // 4.2.1 base cadence
        let interval = match self.latest {
            Some(latest) => {
                if latest < self.interval {
                    return Err(ScheduleError::InvalidInterval {
                        interval: self.interval,
                        latest,
                    });
                }
                #[cfg(feature = "random")]
                {
                    rand::thread_rng().gen_range(self.interval..=latest)
                }
                #[cfg(not(feature = "random"))]
                {
                    self.interval
                }
            }
            None => self.interval,
        };
        let period = unit.duration(interval);
        self.period = Some(period);

        let reference = self.last_run.clone().unwrap_or_else(|| self.now());
        let mut candidate = reference
            .checked_add(period)
            .expect("scheduling math never overflows a realistic calendar range");

        // 4.2.2 weekday anchoring
        if let Some(start_day) = self.start_day {
            if unit != TimeUnit::Weeks {
                return Err(ScheduleError::StartDayRequiresWeeks);
            }
            let weekday_num = start_day.num_days_from_monday();
            let today_num = Weekday::from_civil(candidate.weekday()).num_days_from_monday();
            let mut days_ahead = weekday_num - today_num;
            if days_ahead <= 0 {
                days_ahead += 7;
            }
            candidate = candidate
                .checked_add(TimeUnit::Days.duration(days_ahead as u32))
                .expect("scheduling math never overflows")
                .checked_sub(period)
                .expect("scheduling math never overflows");
        }

        // 4.2.3 wall-clock snap + "catch up today"
        if let Some(at_time) = self.at_time {
            use TimeUnit::{Days, Hours, Minutes};
            if !matches!(unit, Days | Hours | Minutes) && self.start_day.is_none() {
                return Err(ScheduleError::UnspecifiedStartDay);
            }

            let is_daily = unit == Days || self.start_day.is_some();
            let hour = if is_daily { at_time.hour() } else { candidate.hour() as i8 };
            let minute = if is_daily || unit == Hours {
                at_time.minute()
            } else {
                candidate.minute() as i8
            };
            let second = at_time.second();
            let snapped_time = civil::Time::new(hour, minute, second, 0)
                .map_err(|_| ScheduleError::InvalidDailyAtStr)?;
            let tz = self.zone();
            candidate = civil_in_zone(candidate.date(), snapped_time, &tz, self.fold_policy)?;

            let went_overlong = self
                .last_run
                .as_ref()
                .is_some_and(|lr| candidate.duration_since(lr) > period);
            if self.last_run.is_none() || went_overlong {
                let now = self.now();
                if unit == Days && at_time > now.time() && self.interval == 1 {
                    candidate = candidate
                        .checked_sub(TimeUnit::Days.duration(1))
                        .expect("scheduling math never overflows");
                } else if unit == Hours
                    && (at_time.minute() > now.minute() as i8
                        || (at_time.minute() == now.minute() as i8
                            && at_time.second() > now.second() as i8))
                {
                    candidate = candidate
                        .checked_sub(TimeUnit::Hours.duration(1))
                        .expect("scheduling math never overflows");
                } else if unit == Minutes && at_time.second() > now.second() as i8 {
                    candidate = candidate
                        .checked_sub(TimeUnit::Minutes.duration(1))
                        .expect("scheduling math never overflows");
                }
            }
        }

        // 4.2.4 weekday + at_time overshoot guard
        if self.start_day.is_some() && self.at_time.is_some() {
            let now = self.now();
            let elapsed = candidate.duration_since(&now);
            if elapsed.as_secs() >= 7 * 86_400 {
                candidate = candidate
                    .checked_sub(period)
                    .expect("scheduling math never overflows");
            }
        }

        self.next_run = Some(candidate);
        Ok(())
    }
}
