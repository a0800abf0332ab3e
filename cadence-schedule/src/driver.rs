//! Driving schedules over inputs.
//!
//! [`Driver`] steps one run of a schedule at a time, for callers that do real
//! work between attempts. [`run`] and [`delays`] drive a whole run up front
//! and collect the decided delays into a [`Trace`].

use crate::duration::Duration;
use crate::schedule::{Decision, Schedule, ScheduleState};
use tracing::{debug, trace};

/// Cursor over a single run of a schedule.
///
/// Elapsed time is the sum of the delays decided so far, not wall-clock time.
#[derive(Debug)]
pub struct Driver<'a, I> {
    schedule: &'a Schedule<I>,
    /// `None` once the schedule has reported `Done`.
    state: Option<ScheduleState>,
    elapsed: Duration,
    steps: u64,
}

impl<'a, I> Driver<'a, I> {
    /// Start a fresh run of `schedule`.
    pub fn new(schedule: &'a Schedule<I>) -> Self {
        Self {
            schedule,
            state: Some(schedule.initial()),
            elapsed: Duration::ZERO,
            steps: 0,
        }
    }

    /// Step once with `input`.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// schedule is done. A finished driver keeps returning `None`.
    pub fn next(&mut self, input: &I) -> Option<Duration> {
        let state = self.state.take()?;

        match self.schedule.step(input, self.elapsed, &state) {
            Decision::Continue { delay, state } => {
                self.steps += 1;
                self.elapsed += delay;
                self.state = Some(state);

                trace!(
                    step = self.steps,
                    delay_ms = delay.to_millis(),
                    elapsed_ms = self.elapsed.to_millis(),
                    "Schedule continues"
                );
                Some(delay)
            }
            Decision::Done => {
                debug!(
                    steps = self.steps,
                    elapsed_ms = self.elapsed.to_millis(),
                    "Schedule done"
                );
                None
            }
        }
    }

    /// Total delay decided so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of continuing steps so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether the schedule has reported `Done`.
    pub fn is_done(&self) -> bool {
        self.state.is_none()
    }

    /// Discard progress and start over from the schedule's initial state.
    pub fn reset(&mut self) {
        self.state = Some(self.schedule.initial());
        self.elapsed = Duration::ZERO;
        self.steps = 0;
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The schedule reported `Done`.
    Completed,
    /// The step budget ran out first.
    MaxSteps,
    /// The input sequence ran out first.
    InputExhausted,
    /// The step budget was zero; nothing was stepped.
    EmptyBudget,
}

/// Delays decided during one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Delay before each continuation, in order.
    pub delays: Vec<Duration>,
    /// Sum of all delays.
    pub elapsed: Duration,
    /// Why the run stopped.
    pub termination: Termination,
}

impl Trace {
    /// Whether the run was cut short before the schedule finished on its own.
    pub fn truncated(&self) -> bool {
        matches!(
            self.termination,
            Termination::MaxSteps | Termination::InputExhausted
        )
    }

    /// Number of continuations.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Whether no continuation was decided.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// The delays in milliseconds.
    pub fn millis(&self) -> Vec<f64> {
        self.delays.iter().map(|d| d.to_millis()).collect()
    }
}

/// Drive `schedule` over `inputs`, stepping at most `max_steps` times.
///
/// # Example
///
/// ```
/// use cadence_schedule::{run, Schedule};
///
/// let schedule: Schedule = Schedule::recurs(5);
/// let trace = run(&schedule, std::iter::repeat(()), 10);
///
/// assert_eq!(trace.millis(), vec![0.0; 5]);
/// assert!(!trace.truncated());
/// ```
pub fn run<I, It>(schedule: &Schedule<I>, inputs: It, max_steps: usize) -> Trace
where
    It: IntoIterator<Item = I>,
{
    if max_steps == 0 {
        debug!(schedule = %schedule, "Zero step budget, nothing to run");
        return Trace {
            delays: Vec::new(),
            elapsed: Duration::ZERO,
            termination: Termination::EmptyBudget,
        };
    }

    let mut driver = schedule.driver();
    let mut inputs = inputs.into_iter();
    let mut delays = Vec::new();

    let termination = loop {
        if delays.len() >= max_steps {
            break Termination::MaxSteps;
        }
        let Some(input) = inputs.next() else {
            break Termination::InputExhausted;
        };
        match driver.next(&input) {
            Some(delay) => delays.push(delay),
            None => break Termination::Completed,
        }
    };

    debug!(
        schedule = %schedule,
        steps = delays.len(),
        elapsed_ms = driver.elapsed().to_millis(),
        ?termination,
        "Schedule run finished"
    );

    Trace {
        delays,
        elapsed: driver.elapsed(),
        termination,
    }
}

/// Drive `schedule` with an endless stream of default inputs.
pub fn delays<I: Default>(schedule: &Schedule<I>, max_steps: usize) -> Trace {
    run(schedule, std::iter::repeat_with(I::default), max_steps)
}
