//! A small executor for manual sagas: ordered steps, each optionally paired
//! with a compensation that undoes it.
//!
//! On the first failing step the compensations of every step that already
//! committed run in reverse order. A step fails either with a store fault
//! (`Err`) or with a business outcome ([`StepFlow::Abort`]). Forward steps mark
//! the point of no return: once one starts, earlier compensations are
//! discarded and later failures are not rolled back.

use tracing::{debug, error, warn};

use crate::cup::tracker::error::{Result, TrackerError};

/// Result of a successful step action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFlow<O> {
    /// Proceed to the next step.
    Continue,
    /// Stop the saga, compensate, and report `O` to the caller.
    Abort(O),
}

type Action<'a, S, O> = Box<dyn FnMut(&mut S) -> Result<StepFlow<O>> + 'a>;
type Compensation<'a, S> = Box<dyn FnMut(&mut S) -> Result<()> + 'a>;

enum StepKind<'a, S> {
    Compensable(Compensation<'a, S>),
    Guard,
    Forward,
}

/// One saga step.
pub struct Step<'a, S, O> {
    name: &'static str,
    action: Action<'a, S, O>,
    kind: StepKind<'a, S>,
}

impl<'a, S, O> Step<'a, S, O> {
    /// A step with side effects that `compensation` reverses.
    pub fn compensable(
        name: &'static str,
        action: impl FnMut(&mut S) -> Result<StepFlow<O>> + 'a,
        compensation: impl FnMut(&mut S) -> Result<()> + 'a,
    ) -> Self {
        Self {
            name,
            action: Box::new(action),
            kind: StepKind::Compensable(Box::new(compensation)),
        }
    }

    /// A step without side effects; its failure still rolls back earlier steps.
    pub fn guard(
        name: &'static str,
        action: impl FnMut(&mut S) -> Result<StepFlow<O>> + 'a,
    ) -> Self {
        Self {
            name,
            action: Box::new(action),
            kind: StepKind::Guard,
        }
    }

    /// A step past the point of no return; neither it nor earlier steps are
    /// compensated if it or a later step fails.
    pub fn forward(
        name: &'static str,
        action: impl FnMut(&mut S) -> Result<StepFlow<O>> + 'a,
    ) -> Self {
        Self {
            name,
            action: Box::new(action),
            kind: StepKind::Forward,
        }
    }
}

/// How a saga run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome<O> {
    Completed,
    Aborted { step: &'static str, outcome: O },
}

/// Ordered list of steps executed against shared state `S`.
pub struct Saga<'a, S, O> {
    name: &'static str,
    steps: Vec<Step<'a, S, O>>,
}

impl<'a, S, O> Saga<'a, S, O> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step<'a, S, O>) -> Self {
        self.steps.push(step);
        self
    }

    /// Runs every step in order.
    ///
    /// A store fault is returned after compensation. If a compensation itself
    /// fails, [`TrackerError::CompensationFailed`] is returned instead and the
    /// remaining compensations are still attempted.
    pub fn run(self, state: &mut S) -> Result<SagaOutcome<O>> {
        let saga = self.name;
        let mut committed: Vec<(&'static str, Compensation<'a, S>)> = Vec::new();

        for Step {
            name,
            mut action,
            kind,
        } in self.steps
        {
            if matches!(kind, StepKind::Forward) && !committed.is_empty() {
                debug!(saga, step = name, disarmed = committed.len(), "past point of no return");
                committed.clear();
            }

            debug!(saga, step = name, "running step");
            match action(state) {
                Ok(StepFlow::Continue) => {
                    if let StepKind::Compensable(compensation) = kind {
                        committed.push((name, compensation));
                    }
                }
                Ok(StepFlow::Abort(outcome)) => {
                    debug!(saga, step = name, "step aborted saga");
                    compensate(saga, committed, state)?;
                    return Ok(SagaOutcome::Aborted {
                        step: name,
                        outcome,
                    });
                }
                Err(err) => {
                    warn!(saga, step = name, error = %err, "step failed");
                    compensate(saga, committed, state)?;
                    return Err(err);
                }
            }
        }

        Ok(SagaOutcome::Completed)
    }
}

fn compensate<S>(
    saga: &'static str,
    committed: Vec<(&'static str, Compensation<'_, S>)>,
    state: &mut S,
) -> Result<()> {
    let mut first_failure = None;

    for (step, mut compensation) in committed.into_iter().rev() {
        debug!(saga, step, "compensating");
        if let Err(err) = compensation(state) {
            error!(saga, step, error = %err, "compensation failed");
            if first_failure.is_none() {
                first_failure = Some(TrackerError::CompensationFailed {
                    step: step.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    fn push(state: &mut Trace, event: &str) {
        state.events.push(event.to_string());
    }

    fn ok_step(name: &'static str) -> Step<'static, Trace, &'static str> {
        Step::compensable(
            name,
            move |state: &mut Trace| {
                push(state, &format!("do {name}"));
                Ok(StepFlow::Continue)
            },
            move |state: &mut Trace| {
                push(state, &format!("undo {name}"));
                Ok(())
            },
        )
    }

    #[test]
    fn completes_without_compensating() {
        let mut trace = Trace::default();
        let outcome = Saga::new("test")
            .step(ok_step("a"))
            .step(ok_step("b"))
            .run(&mut trace)
            .unwrap();
        assert_eq!(outcome, SagaOutcome::Completed);
        assert_eq!(trace.events, vec!["do a", "do b"]);
    }

    #[test]
    fn abort_compensates_committed_steps_in_reverse() {
        let mut trace = Trace::default();
        let outcome = Saga::new("test")
            .step(ok_step("a"))
            .step(ok_step("b"))
            .step(Step::guard("check", |state: &mut Trace| {
                push(state, "check");
                Ok(StepFlow::Abort("missing"))
            }))
            .step(ok_step("never"))
            .run(&mut trace)
            .unwrap();

        assert_eq!(
            outcome,
            SagaOutcome::Aborted {
                step: "check",
                outcome: "missing"
            }
        );
        assert_eq!(trace.events, vec!["do a", "do b", "check", "undo b", "undo a"]);
    }

    #[test]
    fn failing_step_is_not_compensated_itself() {
        let mut trace = Trace::default();
        let result = Saga::new("test")
            .step(ok_step("a"))
            .step(Step::compensable(
                "b",
                |_: &mut Trace| Err(TrackerError::Store("offline".to_string())),
                |state: &mut Trace| {
                    push(state, "undo b");
                    Ok(())
                },
            ))
            .run(&mut trace);

        assert!(matches!(result, Err(TrackerError::Store(_))));
        assert_eq!(trace.events, vec!["do a", "undo a"]);
    }

    #[test]
    fn forward_steps_disarm_earlier_compensations() {
        let mut trace = Trace::default();
        let result = Saga::new("test")
            .step(ok_step("a"))
            .step(Step::forward("write", |state: &mut Trace| {
                push(state, "write");
                Ok(StepFlow::Continue)
            }))
            .step(Step::forward("log", |_: &mut Trace| {
                Err(TrackerError::Store("log unavailable".to_string()))
            }))
            .run(&mut trace);

        assert!(matches!(result, Err(TrackerError::Store(_))));
        assert_eq!(trace.events, vec!["do a", "write"]);
    }

    #[test]
    fn compensation_failure_is_reported_after_attempting_all() {
        let mut trace = Trace::default();
        let result = Saga::new("test")
            .step(ok_step("a"))
            .step(Step::compensable(
                "b",
                |state: &mut Trace| {
                    push(state, "do b");
                    Ok(StepFlow::Continue)
                },
                |_: &mut Trace| Err(TrackerError::Store("restore failed".to_string())),
            ))
            .step(Step::guard("check", |_: &mut Trace| Ok(StepFlow::Abort("stop"))))
            .run(&mut trace);

        match result {
            Err(TrackerError::CompensationFailed { step, message }) => {
                assert_eq!(step, "b");
                assert!(message.contains("restore failed"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(trace.events, vec!["do a", "do b", "undo a"]);
    }
}
