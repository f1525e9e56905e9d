//! Regexes validating the `at()` time-string grammar, one per unit.

use std::sync::LazyLock;

use regex::Regex;

/// `HH:MM` or `HH:MM:SS`, for daily (and weekday-anchored) jobs.
pub(crate) static DAILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-2]\d:)?[0-5]\d:[0-5]\d$|^[0-2]\d:[0-5]\d$").unwrap());

/// `MM:SS` or `:MM`, for hourly jobs.
pub(crate) static HOURLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-5]\d)?:[0-5]\d$").unwrap());

/// `:SS`, for minutely jobs.
pub(crate) static MINUTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:[0-5]\d$").unwrap());
