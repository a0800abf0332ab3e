//! Combinators that wrap one or two schedules into a new one.
//!
//! Combinators never consult the elapsed time themselves; they hand it to
//! their children unchanged.

use crate::duration::Duration;
use crate::schedule::{Decision, ExtraDelay, InputPredicate, Kind, Schedule, ScheduleState, State};
use std::sync::Arc;

impl<I> Schedule<I> {
    /// Race two schedules: continue while either continues, waiting the
    /// shorter of their delays.
    ///
    /// Once a side reports `Done` it is never stepped again.
    #[must_use]
    pub fn union(self, other: Schedule<I>) -> Self {
        Self::from_kind(Kind::Union(Box::new(self), Box::new(other)))
    }

    /// Continue only while both schedules continue, waiting the longer of
    /// their delays.
    #[must_use]
    pub fn intersect(self, other: Schedule<I>) -> Self {
        Self::from_kind(Kind::Intersect(Box::new(self), Box::new(other)))
    }

    /// Add a constant extra delay on top of every delay.
    #[must_use]
    pub fn add_delay(self, extra: Duration) -> Self {
        Self::from_kind(Kind::AddDelay(Box::new(self), ExtraDelay::Constant(extra)))
    }

    /// Add an extra delay computed from the current input on every step.
    #[must_use]
    pub fn add_delay_with<F>(self, extra: F) -> Self
    where
        F: Fn(&I) -> Duration + Send + Sync + 'static,
    {
        Self::from_kind(Kind::AddDelay(
            Box::new(self),
            ExtraDelay::FromInput(Arc::new(extra)),
        ))
    }

    /// Stop as soon as `predicate` rejects the current input.
    ///
    /// This is how data-dependent policies are expressed, e.g. retrying only
    /// transient errors.
    #[must_use]
    pub fn while_input<F>(self, predicate: F) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Self::from_kind(Kind::WhileInput(Box::new(self), Arc::new(predicate)))
    }

    /// Stop once the run's elapsed time reaches `max_elapsed`.
    #[must_use]
    pub fn up_to(self, max_elapsed: Duration) -> Self {
        self.intersect(Schedule::recur_up_to(max_elapsed))
    }

    /// Stop after at most `times` recurrences.
    #[must_use]
    pub fn take(self, times: u64) -> Self {
        self.intersect(Schedule::recurs(times))
    }
}

pub(crate) fn step_union<I>(
    a: &Schedule<I>,
    b: &Schedule<I>,
    input: &I,
    elapsed: Duration,
    left: Option<&ScheduleState>,
    right: Option<&ScheduleState>,
) -> Decision {
    let left = left.and_then(|state| a.step(input, elapsed, state).into_parts());
    let right = right.and_then(|state| b.step(input, elapsed, state).into_parts());

    match (left, right) {
        (None, None) => Decision::Done,
        (Some((delay, state)), None) => {
            Decision::proceed(delay, State::Race(Some(Box::new(state)), None))
        }
        (None, Some((delay, state))) => {
            Decision::proceed(delay, State::Race(None, Some(Box::new(state))))
        }
        (Some((left_delay, left)), Some((right_delay, right))) => Decision::proceed(
            left_delay.min(right_delay),
            State::Race(Some(Box::new(left)), Some(Box::new(right))),
        ),
    }
}

pub(crate) fn step_intersect<I>(
    a: &Schedule<I>,
    b: &Schedule<I>,
    input: &I,
    elapsed: Duration,
    left: &ScheduleState,
    right: &ScheduleState,
) -> Decision {
    let Some((left_delay, left)) = a.step(input, elapsed, left).into_parts() else {
        return Decision::Done;
    };
    let Some((right_delay, right)) = b.step(input, elapsed, right).into_parts() else {
        return Decision::Done;
    };

    Decision::proceed(
        left_delay.max(right_delay),
        State::Pair(Box::new(left), Box::new(right)),
    )
}

pub(crate) fn step_add_delay<I>(
    inner: &Schedule<I>,
    extra: &ExtraDelay<I>,
    input: &I,
    elapsed: Duration,
    state: &ScheduleState,
) -> Decision {
    match inner.step(input, elapsed, state) {
        Decision::Continue { delay, state } => Decision::Continue {
            delay: delay + extra.resolve(input),
            state,
        },
        Decision::Done => Decision::Done,
    }
}

pub(crate) fn step_while_input<I>(
    inner: &Schedule<I>,
    predicate: &InputPredicate<I>,
    input: &I,
    elapsed: Duration,
    state: &ScheduleState,
) -> Decision {
    if predicate(input) {
        inner.step(input, elapsed, state)
    } else {
        Decision::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{delays, run, Termination};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn exponential(base: u64) -> Schedule {
        Schedule::exponential(ms(base), 2.0).unwrap()
    }

    /// Pairs of schedules with different shapes and lengths.
    fn pairs() -> Vec<(Schedule, Schedule)> {
        vec![
            (exponential(100), Schedule::spaced(ms(500))),
            (Schedule::recurs(3), Schedule::fixed(ms(50))),
            (Schedule::recurs(2), Schedule::recurs(4)),
            (
                Schedule::linear(ms(10)).take(5),
                Schedule::fibonacci(ms(7)).take(3),
            ),
            (Schedule::fixed(ms(300)).take(4), exponential(40).take(6)),
        ]
    }

    #[test]
    fn test_union_takes_min_and_stops_when_both_stop() {
        for (a, b) in pairs() {
            let ta = delays(&a, 20);
            let tb = delays(&b, 20);
            let tu = delays(&a.clone().union(b.clone()), 20);

            assert_eq!(tu.len(), ta.len().max(tb.len()), "{a} | {b}");
            for (i, delay) in tu.delays.iter().enumerate() {
                let expected = match (ta.delays.get(i), tb.delays.get(i)) {
                    (Some(x), Some(y)) => *x.min(y),
                    (Some(x), None) | (None, Some(x)) => *x,
                    (None, None) => unreachable!(),
                };
                assert_eq!(*delay, expected, "{a} | {b} at step {i}");
            }
        }
    }

    #[test]
    fn test_intersect_takes_max_and_stops_when_either_stops() {
        for (a, b) in pairs() {
            let ta = delays(&a, 20);
            let tb = delays(&b, 20);
            let ti = delays(&a.clone().intersect(b.clone()), 20);

            assert_eq!(ti.len(), ta.len().min(tb.len()), "{a} & {b}");
            for (i, delay) in ti.delays.iter().enumerate() {
                assert_eq!(*delay, ta.delays[i].max(tb.delays[i]), "{a} & {b} at step {i}");
            }
        }
    }

    #[test]
    fn test_union_and_intersect_commute() {
        for (a, b) in pairs() {
            assert_eq!(
                delays(&a.clone().union(b.clone()), 20),
                delays(&b.clone().union(a.clone()), 20)
            );
            assert_eq!(
                delays(&a.clone().intersect(b.clone()), 20),
                delays(&b.intersect(a), 20)
            );
        }
    }

    #[test]
    fn test_union_stops_stepping_done_side() {
        let steps = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&steps);
        let counted: Schedule<()> = Schedule::recurs(1).add_delay_with(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Duration::ZERO
        });

        let trace = delays(&counted.union(Schedule::recurs(4)), 10);
        assert_eq!(trace.len(), 4);
        // Extra delay only runs on continuing steps; the done side is not stepped again.
        assert_eq!(steps.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_union_state_marks_done_side() {
        let s: Schedule = Schedule::recurs(0).union(Schedule::forever());
        let decision = s.step(&(), Duration::ZERO, &s.initial());
        assert_eq!(
            decision,
            Decision::proceed(
                Duration::ZERO,
                State::Race(None, Some(Box::new(ScheduleState(State::Stateless))))
            )
        );
    }

    #[test]
    fn test_windowed_union_follows_both_cadences() {
        let s: Schedule =
            Schedule::windowed(Duration::from_secs(2)).union(Schedule::windowed(Duration::from_secs(3)));

        assert_eq!(
            delays(&s, 10).millis(),
            vec![
                2_000.0, 1_000.0, 1_000.0, 2_000.0, 2_000.0, 1_000.0, 1_000.0, 2_000.0, 2_000.0,
                1_000.0,
            ]
        );
    }

    #[rstest]
    #[case(Schedule::recurs(5), 5)]
    #[case(Schedule::forever(), 3)]
    #[case(Schedule::fixed(ms(20)), 0)]
    fn test_add_delay_constant(#[case] schedule: Schedule, #[case] extra: u64) {
        let base = delays(&schedule, 10);
        let shifted = delays(&schedule.add_delay(ms(extra)), 10);

        assert_eq!(shifted.len(), base.len());
        assert_eq!(shifted.termination, base.termination);
        for (before, after) in base.delays.iter().zip(&shifted.delays) {
            assert_eq!(*after, *before + ms(extra));
        }
    }

    #[test]
    fn test_add_delay_exponential() {
        let s = Schedule::exponential(Duration::from_secs(1), 1.1)
            .unwrap()
            .add_delay(Duration::from_secs(2));
        let expected = [3_000.0, 3_100.0, 3_210.0, 3_331.0, 3_464.1, 3_610.51];

        for (actual, expected) in delays::<()>(&s, 6).millis().iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
        }
    }

    #[test]
    fn test_add_delay_from_input() {
        let s = Schedule::<u64>::forever().add_delay_with(|attempt| ms(*attempt * 10));
        let trace = run(&s, [1, 2, 3], 10);

        assert_eq!(trace.millis(), vec![10.0, 20.0, 30.0]);
        assert_eq!(trace.termination, Termination::InputExhausted);
    }

    #[test]
    fn test_add_delay_recomputed_every_step() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let s: Schedule = Schedule::recurs(3).add_delay_with(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            ms(1)
        });

        delays(&s, 10);
        delays(&s, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Failure {
        Transient,
        Fatal,
    }

    #[test]
    fn test_while_input_stops_on_rejected_input() {
        let s = Schedule::<Failure>::spaced(ms(100))
            .while_input(|failure| *failure == Failure::Transient);

        let trace = run(
            &s,
            [Failure::Transient, Failure::Transient, Failure::Fatal, Failure::Transient],
            10,
        );
        assert_eq!(trace.millis(), vec![100.0, 100.0]);
        assert_eq!(trace.termination, Termination::Completed);
    }

    #[test]
    fn test_up_to_and_take() {
        let s: Schedule = Schedule::fixed(ms(100)).up_to(ms(250));
        assert_eq!(delays(&s, 10).millis(), vec![100.0, 100.0, 100.0]);

        let s: Schedule = Schedule::fixed(ms(100)).take(2);
        assert_eq!(delays(&s, 10).millis(), vec![100.0, 100.0]);
    }
}
