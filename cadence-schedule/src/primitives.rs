//! Primitive schedules.
//!
//! Each primitive has a constructor on [`Schedule`] and a step function used
//! by [`Schedule::step`]'s dispatch.

use crate::duration::Duration;
use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::{Decision, Kind, Schedule, State};

/// Growth factor used by exponential backoff when none is given.
pub const DEFAULT_EXPONENTIAL_FACTOR: f64 = 2.0;

impl<I> Schedule<I> {
    /// Recur forever with no delay.
    #[must_use]
    pub fn forever() -> Self {
        Self::from_kind(Kind::Forever)
    }

    /// Recur `times` times with no delay, then stop.
    #[must_use]
    pub fn recurs(times: u64) -> Self {
        Self::from_kind(Kind::Recurs(times))
    }

    /// Like [`Schedule::recurs`], for counts that arrive as signed numbers.
    ///
    /// Fails with [`ScheduleError::InvalidScheduleParameter`] when `times`
    /// is negative.
    pub fn checked_recurs(times: i64) -> ScheduleResult<Self> {
        let times = u64::try_from(times).map_err(|_| {
            ScheduleError::invalid_parameter("recurs", format!("{times} is negative"))
        })?;
        Ok(Self::recurs(times))
    }

    /// Recur forever, waiting `interval` every time.
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self::from_kind(Kind::Fixed(interval))
    }

    /// Recur forever, waiting `interval` after each attempt.
    ///
    /// Behaves like [`Schedule::fixed`]; the name is kept for callers that
    /// distinguish spacing from a fixed cadence.
    #[must_use]
    pub fn spaced(interval: Duration) -> Self {
        Self::from_kind(Kind::Spaced(interval))
    }

    /// Recur forever, sleeping until the next `interval` boundary of the
    /// run's timeline.
    ///
    /// Windows are anchored at the elapsed time of the first step, so a
    /// windowed schedule combined with others stays on its own cadence.
    #[must_use]
    pub fn windowed(interval: Duration) -> Self {
        Self::from_kind(Kind::Windowed(interval))
    }

    /// Exponential backoff: emits `base`, `base * factor`,
    /// `base * factor^2`, ...
    ///
    /// Fails with [`ScheduleError::InvalidScheduleParameter`] for a negative
    /// or non-finite factor.
    pub fn exponential(base: Duration, factor: f64) -> ScheduleResult<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(ScheduleError::invalid_parameter(
                "factor",
                format!("{factor} is not a finite, non-negative number"),
            ));
        }
        Ok(Self::from_kind(Kind::Exponential { base, factor }))
    }

    /// Linear backoff: emits `base`, `2 * base`, `3 * base`, ...
    #[must_use]
    pub fn linear(base: Duration) -> Self {
        Self::from_kind(Kind::Linear(base))
    }

    /// Fibonacci backoff: emits `one`, `one`, `2 * one`, `3 * one`,
    /// `5 * one`, ...
    #[must_use]
    pub fn fibonacci(one: Duration) -> Self {
        Self::from_kind(Kind::Fibonacci(one))
    }

    /// Recur with no delay while the run's elapsed time is below
    /// `max_elapsed`.
    ///
    /// This is a gate: intersect it with a delay-producing schedule.
    #[must_use]
    pub fn recur_up_to(max_elapsed: Duration) -> Self {
        Self::from_kind(Kind::RecurUpTo(max_elapsed))
    }

    /// Like [`Schedule::recur_up_to`], for budgets given as raw milliseconds.
    ///
    /// Fails with [`ScheduleError::InvalidScheduleParameter`] for negative
    /// or non-finite budgets.
    pub fn checked_recur_up_to(max_elapsed_millis: f64) -> ScheduleResult<Self> {
        let max_elapsed = Duration::try_from_millis(max_elapsed_millis).map_err(|err| {
            let reason = match err {
                ScheduleError::InvalidDuration { reason, .. } => reason,
                other => other.to_string(),
            };
            ScheduleError::invalid_parameter("recur_up_to", reason)
        })?;
        Ok(Self::recur_up_to(max_elapsed))
    }
}

pub(crate) fn step_forever() -> Decision {
    Decision::proceed(Duration::ZERO, State::Stateless)
}

pub(crate) fn step_recurs(times: u64, count: u64) -> Decision {
    if count < times {
        Decision::proceed(Duration::ZERO, State::Count(count + 1))
    } else {
        Decision::Done
    }
}

pub(crate) fn step_constant(interval: Duration) -> Decision {
    Decision::proceed(interval, State::Stateless)
}

pub(crate) fn step_windowed(
    interval: Duration,
    elapsed: Duration,
    anchor: Option<Duration>,
) -> Decision {
    let Some(start) = anchor else {
        return Decision::proceed(interval, State::Window(Some(elapsed)));
    };

    let delay = if interval.is_zero() {
        Duration::ZERO
    } else {
        let into_window = elapsed.saturating_sub(start).to_millis() % interval.to_millis();
        Duration::saturating(interval.to_millis() - into_window)
    };
    Decision::proceed(delay, State::Window(Some(start)))
}

pub(crate) fn step_exponential(current: Duration, factor: f64) -> Decision {
    Decision::proceed(current, State::Delay(current.scale(factor)))
}

pub(crate) fn step_linear(base: Duration, count: u64) -> Decision {
    let next = count.saturating_add(1);
    Decision::proceed(base.scale(next as f64), State::Count(next))
}

pub(crate) fn step_fibonacci(current: Duration, next: Duration) -> Decision {
    Decision::proceed(
        current,
        State::Fibonacci {
            current: next,
            next: current + next,
        },
    )
}

pub(crate) fn step_recur_up_to(max_elapsed: Duration, elapsed: Duration) -> Decision {
    if elapsed < max_elapsed {
        Decision::proceed(Duration::ZERO, State::Stateless)
    } else {
        Decision::Done
    }
}
