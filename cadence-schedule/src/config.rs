//! Declarative schedule configuration.
//!
//! [`ScheduleConfig`] mirrors the schedule constructors as plain data so
//! policies can live in JSON documents:
//!
//! ```json
//! {
//!   "kind": "intersect",
//!   "left": {
//!     "kind": "union",
//!     "left": { "kind": "exponential", "base": "100 millis" },
//!     "right": { "kind": "spaced", "interval": "5 seconds" }
//!   },
//!   "right": { "kind": "recur_up_to", "max_elapsed": 30000 }
//! }
//! ```
//!
//! Durations accept a millisecond number or a literal string. Nothing is
//! validated until [`ScheduleConfig::build`].

use crate::duration::DurationLiteral;
use crate::error::{ScheduleError, ScheduleResult};
use crate::primitives::DEFAULT_EXPONENTIAL_FACTOR;
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A schedule described as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// See [`Schedule::forever`].
    Forever,
    /// See [`Schedule::recurs`].
    Recurs {
        /// Number of recurrences.
        times: i64,
    },
    /// See [`Schedule::fixed`].
    Fixed {
        /// Delay between attempts.
        interval: DurationLiteral,
    },
    /// See [`Schedule::spaced`].
    Spaced {
        /// Delay between attempts.
        interval: DurationLiteral,
    },
    /// See [`Schedule::windowed`].
    Windowed {
        /// Window length.
        interval: DurationLiteral,
    },
    /// See [`Schedule::exponential`].
    Exponential {
        /// First delay.
        base: DurationLiteral,
        /// Growth per step.
        #[serde(default = "default_factor")]
        factor: f64,
    },
    /// See [`Schedule::linear`].
    Linear {
        /// First delay and increment.
        base: DurationLiteral,
    },
    /// See [`Schedule::fibonacci`].
    Fibonacci {
        /// First delay.
        one: DurationLiteral,
    },
    /// See [`Schedule::recur_up_to`].
    RecurUpTo {
        /// Elapsed time budget.
        max_elapsed: DurationLiteral,
    },
    /// See [`Schedule::union`].
    Union {
        /// First schedule.
        left: Box<ScheduleConfig>,
        /// Second schedule.
        right: Box<ScheduleConfig>,
    },
    /// See [`Schedule::intersect`].
    Intersect {
        /// First schedule.
        left: Box<ScheduleConfig>,
        /// Second schedule.
        right: Box<ScheduleConfig>,
    },
    /// See [`Schedule::add_delay`].
    AddDelay {
        /// Wrapped schedule.
        schedule: Box<ScheduleConfig>,
        /// Extra delay per step.
        extra: DurationLiteral,
    },
    /// See [`Schedule::up_to`].
    UpTo {
        /// Wrapped schedule.
        schedule: Box<ScheduleConfig>,
        /// Elapsed time budget.
        max_elapsed: DurationLiteral,
    },
    /// See [`Schedule::take`].
    Take {
        /// Wrapped schedule.
        schedule: Box<ScheduleConfig>,
        /// Maximum recurrences.
        times: i64,
    },
}

fn default_factor() -> f64 {
    DEFAULT_EXPONENTIAL_FACTOR
}

impl Default for ScheduleConfig {
    /// Exponential backoff from 100ms, capped at 5s per wait, for at most
    /// 30s in total.
    fn default() -> Self {
        Self::exponential("100 millis")
            .union(Self::Spaced {
                interval: DurationLiteral::Text("5 seconds".into()),
            })
            .intersect(Self::RecurUpTo {
                max_elapsed: DurationLiteral::Text("30 seconds".into()),
            })
    }
}

impl ScheduleConfig {
    /// Exponential backoff with the default factor.
    pub fn exponential(base: impl Into<String>) -> Self {
        Self::Exponential {
            base: DurationLiteral::Text(base.into()),
            factor: DEFAULT_EXPONENTIAL_FACTOR,
        }
    }

    /// A schedule that never retries.
    pub fn no_retry() -> Self {
        Self::Recurs { times: 0 }
    }

    /// Combine with `other` as a union.
    pub fn union(self, other: ScheduleConfig) -> Self {
        Self::Union {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Combine with `other` as an intersection.
    pub fn intersect(self, other: ScheduleConfig) -> Self {
        Self::Intersect {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> ScheduleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this config to JSON.
    pub fn to_json(&self) -> ScheduleResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate every parameter and build the schedule.
    pub fn build<I>(&self) -> ScheduleResult<Schedule<I>> {
        let schedule = self.build_inner()?;
        debug!(schedule = %schedule, "Built schedule from config");
        Ok(schedule)
    }

    fn build_inner<I>(&self) -> ScheduleResult<Schedule<I>> {
        let schedule = match self {
            Self::Forever => Schedule::forever(),
            Self::Recurs { times } => Schedule::checked_recurs(*times)?,
            Self::Fixed { interval } => Schedule::fixed(interval.resolve()?),
            Self::Spaced { interval } => Schedule::spaced(interval.resolve()?),
            Self::Windowed { interval } => Schedule::windowed(interval.resolve()?),
            Self::Exponential { base, factor } => Schedule::exponential(base.resolve()?, *factor)?,
            Self::Linear { base } => Schedule::linear(base.resolve()?),
            Self::Fibonacci { one } => Schedule::fibonacci(one.resolve()?),
            Self::RecurUpTo { max_elapsed } => recur_up_to(max_elapsed)?,
            Self::Union { left, right } => left.build_inner()?.union(right.build_inner()?),
            Self::Intersect { left, right } => {
                left.build_inner()?.intersect(right.build_inner()?)
            }
            Self::AddDelay { schedule, extra } => {
                schedule.build_inner()?.add_delay(extra.resolve()?)
            }
            Self::UpTo {
                schedule,
                max_elapsed,
            } => schedule.build_inner()?.intersect(recur_up_to(max_elapsed)?),
            Self::Take { schedule, times } => schedule
                .build_inner()?
                .intersect(Schedule::checked_recurs(*times)?),
        };
        Ok(schedule)
    }
}

/// Numeric budgets are schedule parameters; literal strings are durations.
fn recur_up_to<I>(max_elapsed: &DurationLiteral) -> ScheduleResult<Schedule<I>> {
    match max_elapsed {
        DurationLiteral::Millis(millis) => Schedule::checked_recur_up_to(*millis),
        DurationLiteral::Text(_) => Ok(Schedule::recur_up_to(max_elapsed.resolve()?)),
    }
}

impl TryFrom<&ScheduleConfig> for Schedule<()> {
    type Error = ScheduleError;

    fn try_from(config: &ScheduleConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}
