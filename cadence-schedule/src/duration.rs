//! Non-negative durations with fractional millisecond precision.
//!
//! Schedules emit fractional delays (repeated `x1.1` growth lands on values
//! like `1464.1ms`), so [`Duration`] stores milliseconds as an `f64` instead
//! of the integral nanoseconds of [`std::time::Duration`]. Every constructor
//! validates its input; a `Duration` is never negative and never NaN.

use crate::error::{ScheduleError, ScheduleResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative span of time measured in milliseconds.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(try_from = "DurationLiteral", into = "f64")]
pub struct Duration {
    millis: f64,
}

impl Duration {
    /// The empty duration.
    pub const ZERO: Duration = Duration { millis: 0.0 };

    /// The largest representable duration.
    pub const MAX: Duration = Duration { millis: f64::MAX };

    /// Create a duration from whole milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self {
            millis: millis as f64,
        }
    }

    /// Create a duration from whole seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self {
            millis: secs as f64 * 1_000.0,
        }
    }

    /// Create a duration from fractional milliseconds.
    ///
    /// Fails with [`ScheduleError::InvalidDuration`] for negative, NaN or
    /// infinite values.
    pub fn try_from_millis(millis: f64) -> ScheduleResult<Self> {
        if millis.is_nan() {
            return Err(ScheduleError::invalid_duration(
                millis.to_string(),
                "not a number",
            ));
        }
        if millis.is_infinite() {
            return Err(ScheduleError::invalid_duration(
                millis.to_string(),
                "must be finite",
            ));
        }
        if millis < 0.0 {
            return Err(ScheduleError::invalid_duration(
                millis.to_string(),
                "must not be negative",
            ));
        }
        // Normalize -0.0 so equality and hashing agree.
        Ok(Self {
            millis: millis + 0.0,
        })
    }

    /// Create a duration from a magnitude and a unit.
    pub fn from_unit(magnitude: f64, unit: DurationUnit) -> ScheduleResult<Self> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(ScheduleError::invalid_duration(
                format!("{magnitude} {unit}"),
                "magnitude must be a finite, non-negative number",
            ));
        }
        Self::try_from_millis(magnitude * unit.millis())
    }

    /// Parse a duration literal such as `"100 millis"`, `"1 seconds"` or a
    /// bare millisecond count like `"250"`.
    pub fn parse(input: &str) -> ScheduleResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ScheduleError::invalid_duration(input, "empty literal"));
        }

        let mut parts = trimmed.split_whitespace();
        let magnitude = parts.next().unwrap_or_default();
        let unit = parts.next();
        if parts.next().is_some() {
            return Err(ScheduleError::invalid_duration(
                input,
                "expected '<magnitude> <unit>'",
            ));
        }

        let value: f64 = magnitude.parse().map_err(|_| {
            ScheduleError::invalid_duration(input, format!("'{magnitude}' is not a number"))
        })?;
        let unit = match unit {
            Some(unit) => unit
                .parse::<DurationUnit>()
                .map_err(|err| ScheduleError::invalid_duration(input, err))?,
            None => DurationUnit::Millis,
        };

        Self::from_unit(value, unit).map_err(|err| match err {
            ScheduleError::InvalidDuration { reason, .. } => {
                ScheduleError::invalid_duration(input, reason)
            }
            other => other,
        })
    }

    /// The duration in milliseconds.
    #[must_use]
    pub fn to_millis(self) -> f64 {
        self.millis
    }

    /// Whether this is the empty duration.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.millis == 0.0
    }

    /// Convert to a [`std::time::Duration`], saturating at its maximum.
    #[must_use]
    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.millis / 1_000.0)
            .unwrap_or(std::time::Duration::MAX)
    }

    /// Multiply by a non-negative factor, saturating at [`Duration::MAX`].
    pub(crate) fn scale(self, factor: f64) -> Self {
        Self::saturating(self.millis * factor)
    }

    /// Subtract, clamping at zero.
    pub(crate) fn saturating_sub(self, rhs: Self) -> Self {
        Self::saturating(self.millis - rhs.millis)
    }

    /// Build from a computed millisecond value, clamping it into range.
    pub(crate) fn saturating(millis: f64) -> Self {
        if millis.is_nan() || millis <= 0.0 {
            Self::ZERO
        } else if millis >= f64::MAX {
            Self::MAX
        } else {
            Self { millis }
        }
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis
    }
}

impl Eq for Duration {}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.millis.total_cmp(&other.millis)
    }
}

impl Hash for Duration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.millis.to_bits().hash(state);
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Self) -> Self::Output {
        Self::saturating(self.millis + rhs.millis)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Duration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis)
    }
}

impl FromStr for Duration {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self::saturating(d.as_secs_f64() * 1_000.0)
    }
}

impl From<Duration> for f64 {
    fn from(d: Duration) -> Self {
        d.millis
    }
}

impl TryFrom<DurationLiteral> for Duration {
    type Error = ScheduleError;

    fn try_from(literal: DurationLiteral) -> Result<Self, Self::Error> {
        literal.resolve()
    }
}

/// Units recognized by the duration literal parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    /// Nanoseconds.
    Nanos,
    /// Microseconds.
    Micros,
    /// Milliseconds.
    Millis,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
    /// Weeks.
    Weeks,
}

impl DurationUnit {
    /// Milliseconds in one of this unit.
    #[must_use]
    pub fn millis(self) -> f64 {
        match self {
            Self::Nanos => 1e-6,
            Self::Micros => 1e-3,
            Self::Millis => 1.0,
            Self::Seconds => 1_000.0,
            Self::Minutes => 60_000.0,
            Self::Hours => 3_600_000.0,
            Self::Days => 86_400_000.0,
            Self::Weeks => 604_800_000.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Nanos => "nanos",
            Self::Micros => "micros",
            Self::Millis => "millis",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nano" | "nanos" => Ok(Self::Nanos),
            "micro" | "micros" => Ok(Self::Micros),
            "milli" | "millis" => Ok(Self::Millis),
            "second" | "seconds" => Ok(Self::Seconds),
            "minute" | "minutes" => Ok(Self::Minutes),
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            "week" | "weeks" => Ok(Self::Weeks),
            other => Err(format!("unknown unit '{other}'")),
        }
    }
}

/// A duration as written in a config document: a millisecond count or a
/// literal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationLiteral {
    /// Milliseconds.
    Millis(f64),
    /// A literal such as `"5 seconds"`.
    Text(String),
}

impl DurationLiteral {
    /// Validate and convert into a [`Duration`].
    pub fn resolve(&self) -> ScheduleResult<Duration> {
        match self {
            Self::Millis(millis) => Duration::try_from_millis(*millis),
            Self::Text(text) => Duration::parse(text),
        }
    }
}

impl From<Duration> for DurationLiteral {
    fn from(d: Duration) -> Self {
        Self::Millis(d.millis)
    }
}
