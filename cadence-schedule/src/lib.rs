//! # cadence-schedule
//!
//! Composable retry and backoff schedules.
//!
//! A schedule is a pure decision engine: given the current input and the
//! time already spent waiting, it says whether another attempt should happen
//! and how long to wait first. Nothing here sleeps or performs I/O; callers
//! turn the decided delays into real waits.
//!
//! ## Core Concepts
//!
//! - **[`Schedule`]**: An immutable policy description, runnable any number
//!   of times
//! - **[`Decision`]**: The result of one [`Schedule::step`]
//! - **[`Duration`]**: Non-negative time with fractional milliseconds
//! - **[`run`]** / **[`Driver`]**: Drive a schedule over inputs
//! - **[`ScheduleConfig`]**: Schedules described as JSON-friendly data
//!
//! ## Primitives
//!
//! - [`Schedule::forever`]: Recur immediately, forever
//! - [`Schedule::recurs`]: Recur immediately, `n` times
//! - [`Schedule::fixed`] / [`Schedule::spaced`]: Constant delay
//! - [`Schedule::windowed`]: Sleep until the next window boundary
//! - [`Schedule::exponential`]: `base * factor^n`
//! - [`Schedule::linear`] / [`Schedule::fibonacci`]: Gentler growth
//! - [`Schedule::recur_up_to`]: Gate on total elapsed time
//!
//! ## Combinators
//!
//! - [`Schedule::union`]: Continue while either side does, shorter delay wins
//! - [`Schedule::intersect`]: Continue while both sides do, longer delay wins
//! - [`Schedule::add_delay`] / [`Schedule::add_delay_with`]: Extra wait per step
//! - [`Schedule::while_input`]: Stop on inputs a predicate rejects
//!
//! ## Example
//!
//! ```
//! use cadence_schedule::{delays, Duration, Schedule};
//!
//! // Double from 100ms, never wait more than 5s, give up after 30s in total.
//! let schedule: Schedule = Schedule::exponential(Duration::parse("100 millis")?, 2.0)?
//!     .union(Schedule::spaced(Duration::parse("5 seconds")?))
//!     .intersect(Schedule::recur_up_to(Duration::parse("30 seconds")?));
//!
//! let trace = delays(&schedule, 100);
//! assert_eq!(
//!     trace.millis(),
//!     vec![100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 5000.0, 5000.0, 5000.0, 5000.0, 5000.0]
//! );
//! assert!(!trace.truncated());
//! # Ok::<(), cadence_schedule::ScheduleError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod combinators;
pub mod config;
pub mod driver;
pub mod duration;
pub mod error;
pub mod primitives;
pub mod schedule;

// Re-exports
pub use config::ScheduleConfig;
pub use driver::{delays, run, Driver, Termination, Trace};
pub use duration::{Duration, DurationLiteral, DurationUnit};
pub use error::{ScheduleError, ScheduleResult};
pub use primitives::DEFAULT_EXPONENTIAL_FACTOR;
pub use schedule::{Decision, DelayFn, ExtraDelay, InputPredicate, Schedule, ScheduleState};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        delays, run, Decision, Driver, Duration, Schedule, ScheduleConfig, ScheduleError,
        ScheduleResult, Trace,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let schedule: Schedule = Schedule::recurs(2);
        let trace: Trace = delays(&schedule, 5);
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_config_defaults() {
        let schedule: Schedule = ScheduleConfig::default().build().unwrap();
        assert!(!delays(&schedule, 100).truncated());
    }

    #[test]
    fn test_retry_after_task_duration() {
        // Each attempt itself takes 5ms, on top of the schedule's own delay.
        let schedule: Schedule = Schedule::recurs(5).add_delay(Duration::parse("5 millis").unwrap());
        let trace = delays(&schedule, 10);

        assert_eq!(trace.millis(), vec![5.0; 5]);
        assert_eq!(trace.termination, Termination::Completed);
    }
}
