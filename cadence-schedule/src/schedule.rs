//! The schedule core: descriptions, opaque state and step decisions.
//!
//! A [`Schedule`] is an immutable description built from a closed set of
//! kinds. Running it never mutates the description; each run threads its own
//! [`ScheduleState`] through [`Schedule::step`].

use crate::combinators;
use crate::driver::Driver;
use crate::duration::Duration;
use crate::primitives;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Extra delay computed from the current input.
pub type DelayFn<I> = Arc<dyn Fn(&I) -> Duration + Send + Sync>;

/// Predicate over the current input.
pub type InputPredicate<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// A retry/backoff policy description.
///
/// Build one from the primitive constructors ([`Schedule::exponential`],
/// [`Schedule::recurs`], ...) and compose with [`Schedule::union`],
/// [`Schedule::intersect`] and [`Schedule::add_delay`]. `I` is the input the
/// schedule is stepped with; it defaults to `()` for input-independent
/// policies.
pub struct Schedule<I = ()> {
    pub(crate) kind: Kind<I>,
}

/// The closed set of schedule kinds.
pub(crate) enum Kind<I> {
    Forever,
    Recurs(u64),
    Fixed(Duration),
    Spaced(Duration),
    Windowed(Duration),
    Exponential { base: Duration, factor: f64 },
    Linear(Duration),
    Fibonacci(Duration),
    RecurUpTo(Duration),
    Union(Box<Schedule<I>>, Box<Schedule<I>>),
    Intersect(Box<Schedule<I>>, Box<Schedule<I>>),
    AddDelay(Box<Schedule<I>>, ExtraDelay<I>),
    WhileInput(Box<Schedule<I>>, InputPredicate<I>),
}

impl<I> Schedule<I> {
    pub(crate) fn from_kind(kind: Kind<I>) -> Self {
        Self { kind }
    }

    /// The state a fresh run starts from.
    #[must_use]
    pub fn initial(&self) -> ScheduleState {
        let state = match &self.kind {
            Kind::Forever | Kind::Fixed(_) | Kind::Spaced(_) | Kind::RecurUpTo(_) => {
                State::Stateless
            }
            Kind::Recurs(_) | Kind::Linear(_) => State::Count(0),
            Kind::Windowed(_) => State::Window(None),
            Kind::Exponential { base, .. } => State::Delay(*base),
            Kind::Fibonacci(one) => State::Fibonacci {
                current: *one,
                next: *one,
            },
            Kind::Union(a, b) => State::Race(
                Some(Box::new(a.initial())),
                Some(Box::new(b.initial())),
            ),
            Kind::Intersect(a, b) => {
                State::Pair(Box::new(a.initial()), Box::new(b.initial()))
            }
            Kind::AddDelay(inner, _) | Kind::WhileInput(inner, _) => return inner.initial(),
        };
        ScheduleState(state)
    }

    /// Evaluate one step.
    ///
    /// `elapsed` is the sum of all delays decided so far in the current run.
    /// Stepping is total: a state produced by a different schedule is
    /// discarded and the step restarts from [`Schedule::initial`].
    #[must_use]
    pub fn step(&self, input: &I, elapsed: Duration, state: &ScheduleState) -> Decision {
        if let Some(decision) = self.try_step(input, elapsed, state) {
            return decision;
        }

        warn!(
            schedule = %self,
            "State does not belong to this schedule, restarting from initial state"
        );
        self.try_step(input, elapsed, &self.initial())
            .unwrap_or(Decision::Done)
    }

    fn try_step(&self, input: &I, elapsed: Duration, state: &ScheduleState) -> Option<Decision> {
        let decision = match (&self.kind, &state.0) {
            (Kind::Forever, _) => primitives::step_forever(),
            (Kind::Recurs(times), State::Count(count)) => primitives::step_recurs(*times, *count),
            (Kind::Fixed(interval) | Kind::Spaced(interval), _) => {
                primitives::step_constant(*interval)
            }
            (Kind::Windowed(interval), State::Window(anchor)) => {
                primitives::step_windowed(*interval, elapsed, *anchor)
            }
            (Kind::Exponential { factor, .. }, State::Delay(current)) => {
                primitives::step_exponential(*current, *factor)
            }
            (Kind::Linear(base), State::Count(count)) => primitives::step_linear(*base, *count),
            (Kind::Fibonacci(_), State::Fibonacci { current, next }) => {
                primitives::step_fibonacci(*current, *next)
            }
            (Kind::RecurUpTo(max_elapsed), _) => primitives::step_recur_up_to(*max_elapsed, elapsed),
            (Kind::Union(a, b), State::Race(left, right)) => combinators::step_union(
                a,
                b,
                input,
                elapsed,
                left.as_deref(),
                right.as_deref(),
            ),
            (Kind::Intersect(a, b), State::Pair(left, right)) => {
                combinators::step_intersect(a, b, input, elapsed, left, right)
            }
            (Kind::AddDelay(inner, extra), _) => {
                combinators::step_add_delay(inner, extra, input, elapsed, state)
            }
            (Kind::WhileInput(inner, predicate), _) => {
                combinators::step_while_input(inner, predicate, input, elapsed, state)
            }
            _ => return None,
        };
        Some(decision)
    }

    /// Start an incremental run of this schedule.
    #[must_use]
    pub fn driver(&self) -> Driver<'_, I> {
        Driver::new(self)
    }
}

impl<I> Clone for Schedule<I> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            Kind::Forever => Kind::Forever,
            Kind::Recurs(times) => Kind::Recurs(*times),
            Kind::Fixed(interval) => Kind::Fixed(*interval),
            Kind::Spaced(interval) => Kind::Spaced(*interval),
            Kind::Windowed(interval) => Kind::Windowed(*interval),
            Kind::Exponential { base, factor } => Kind::Exponential {
                base: *base,
                factor: *factor,
            },
            Kind::Linear(base) => Kind::Linear(*base),
            Kind::Fibonacci(one) => Kind::Fibonacci(*one),
            Kind::RecurUpTo(max_elapsed) => Kind::RecurUpTo(*max_elapsed),
            Kind::Union(a, b) => Kind::Union(a.clone(), b.clone()),
            Kind::Intersect(a, b) => Kind::Intersect(a.clone(), b.clone()),
            Kind::AddDelay(inner, extra) => Kind::AddDelay(inner.clone(), extra.clone()),
            Kind::WhileInput(inner, predicate) => {
                Kind::WhileInput(inner.clone(), Arc::clone(predicate))
            }
        };
        Self { kind }
    }
}

impl<I> fmt::Display for Schedule<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Forever => f.write_str("forever"),
            Kind::Recurs(times) => write!(f, "recurs({times})"),
            Kind::Fixed(interval) => write!(f, "fixed({interval})"),
            Kind::Spaced(interval) => write!(f, "spaced({interval})"),
            Kind::Windowed(interval) => write!(f, "windowed({interval})"),
            Kind::Exponential { base, factor } => write!(f, "exponential({base}, {factor})"),
            Kind::Linear(base) => write!(f, "linear({base})"),
            Kind::Fibonacci(one) => write!(f, "fibonacci({one})"),
            Kind::RecurUpTo(max_elapsed) => write!(f, "recur_up_to({max_elapsed})"),
            Kind::Union(a, b) => write!(f, "union({a}, {b})"),
            Kind::Intersect(a, b) => write!(f, "intersect({a}, {b})"),
            Kind::AddDelay(inner, extra) => write!(f, "add_delay({inner}, {extra:?})"),
            Kind::WhileInput(inner, _) => write!(f, "while_input({inner})"),
        }
    }
}

impl<I> fmt::Debug for Schedule<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schedule").field(&format_args!("{self}")).finish()
    }
}

/// Delay added on top of a child schedule's delay.
pub enum ExtraDelay<I> {
    /// The same extra delay every step.
    Constant(Duration),
    /// Recomputed from the input on every step.
    FromInput(DelayFn<I>),
}

impl<I> ExtraDelay<I> {
    /// The extra delay for this input.
    pub fn resolve(&self, input: &I) -> Duration {
        match self {
            Self::Constant(extra) => *extra,
            Self::FromInput(f) => f(input),
        }
    }
}

impl<I> Clone for ExtraDelay<I> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(extra) => Self::Constant(*extra),
            Self::FromInput(f) => Self::FromInput(Arc::clone(f)),
        }
    }
}

impl<I> fmt::Debug for ExtraDelay<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(extra) => write!(f, "{extra}"),
            Self::FromInput(_) => f.write_str("<fn>"),
        }
    }
}

impl<I> From<Duration> for ExtraDelay<I> {
    fn from(extra: Duration) -> Self {
        Self::Constant(extra)
    }
}

/// Per-run state of a schedule. Opaque outside this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleState(pub(crate) State);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum State {
    Stateless,
    Count(u64),
    Delay(Duration),
    Fibonacci { current: Duration, next: Duration },
    /// Anchor of the first window, once observed.
    Window(Option<Duration>),
    Pair(Box<ScheduleState>, Box<ScheduleState>),
    /// `None` marks a child that has already reported `Done`.
    Race(Option<Box<ScheduleState>>, Option<Box<ScheduleState>>),
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Try again after `delay`, continuing from `state`.
    Continue {
        /// Wait before the next attempt.
        delay: Duration,
        /// State for the next step.
        state: ScheduleState,
    },
    /// No further attempts.
    Done,
}

impl Decision {
    pub(crate) fn proceed(delay: Duration, state: State) -> Self {
        Self::Continue {
            delay,
            state: ScheduleState(state),
        }
    }

    /// The delay, if this decision continues.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Continue { delay, .. } => Some(*delay),
            Self::Done => None,
        }
    }

    /// Whether this is the terminal decision.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Split a continuing decision into its delay and next state.
    #[must_use]
    pub fn into_parts(self) -> Option<(Duration, ScheduleState)> {
        match self {
            Self::Continue { delay, state } => Some((delay, state)),
            Self::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_states() {
        let s: Schedule = Schedule::recurs(3);
        assert_eq!(s.initial(), ScheduleState(State::Count(0)));

        let s: Schedule = Schedule::exponential(Duration::from_millis(100), 2.0).unwrap();
        assert_eq!(
            s.initial(),
            ScheduleState(State::Delay(Duration::from_millis(100)))
        );

        let s: Schedule = Schedule::forever().union(Schedule::recurs(1));
        assert_eq!(
            s.initial(),
            ScheduleState(State::Race(
                Some(Box::new(ScheduleState(State::Stateless))),
                Some(Box::new(ScheduleState(State::Count(0)))),
            ))
        );
    }

    #[test]
    fn test_add_delay_shares_child_state() {
        let s: Schedule = Schedule::recurs(2).add_delay(Duration::from_millis(5));
        assert_eq!(s.initial(), ScheduleState(State::Count(0)));
    }

    #[test]
    fn test_step_does_not_mutate_description() {
        let s: Schedule = Schedule::recurs(1);
        let state = s.initial();

        let first = s.step(&(), Duration::ZERO, &state);
        let again = s.step(&(), Duration::ZERO, &state);
        assert_eq!(first, again);

        let (_, next) = first.into_parts().unwrap();
        assert!(s.step(&(), Duration::ZERO, &next).is_done());
    }

    #[test]
    fn test_foreign_state_restarts() {
        let s: Schedule = Schedule::recurs(2);
        let foreign = Schedule::<()>::exponential(Duration::from_millis(1), 2.0)
            .unwrap()
            .initial();

        let decision = s.step(&(), Duration::ZERO, &foreign);
        assert_eq!(
            decision,
            Decision::proceed(Duration::ZERO, State::Count(1))
        );
    }

    #[test]
    fn test_decision_accessors() {
        let d = Decision::proceed(Duration::from_millis(7), State::Stateless);
        assert_eq!(d.delay(), Some(Duration::from_millis(7)));
        assert!(!d.is_done());
        assert_eq!(Decision::Done.delay(), None);
        assert!(Decision::Done.into_parts().is_none());
    }

    #[test]
    fn test_display() {
        let s: Schedule = Schedule::exponential(Duration::from_millis(100), 2.0)
            .unwrap()
            .union(Schedule::spaced(Duration::from_secs(5)))
            .intersect(Schedule::recur_up_to(Duration::from_secs(30)));

        assert_eq!(
            s.to_string(),
            "intersect(union(exponential(100ms, 2), spaced(5000ms)), recur_up_to(30000ms))"
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let s: Schedule = Schedule::recurs(2).add_delay(Duration::from_millis(1));
        let copy = s.clone();
        assert_eq!(s.to_string(), copy.to_string());
        assert_eq!(s.initial(), copy.initial());
    }
}
