//! The CEGAR loop: abstract, check, refine.
//!
//! ```
//! use std::rc::Rc;
//!
//! use zone_cegar::cegar::{CegarChecker, CegarResult};
//! use zone_cegar::checker::ZoneTraceChecker;
//! use zone_cegar::constr::ClockConstr;
//! use zone_cegar::interpolate::ZoneInterpolater;
//! use zone_cegar::op::ClockOp;
//! use zone_cegar::prec::GenericLocPrec;
//! use zone_cegar::refine::InterpolatingRefiner;
//! use zone_cegar::stop::StopHandler;
//! use zone_cegar::tcfa::TcfaBuilder;
//! use zone_cegar::zone::ZonePrec;
//!
//! let mut builder = TcfaBuilder::new();
//! let x = builder.clock("x");
//! let idle = builder.location("idle");
//! let err = builder.location("err");
//! builder.invariant(idle, ClockConstr::leq(x, 2));
//! builder.edge(idle, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
//! builder.initial(idle).error(err);
//! let model = Rc::new(builder.build().unwrap());
//!
//! let stop = StopHandler::new();
//! let refiner = InterpolatingRefiner::new(ZoneInterpolater::default(), stop.clone());
//! let checker = CegarChecker::new(ZoneTraceChecker, refiner, stop);
//! let result = checker.check(model, GenericLocPrec::with_default(ZonePrec::empty())).unwrap();
//! assert!(matches!(result, CegarResult::Safe { .. }));
//! ```

use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::checker::{ConcreteTrace, TraceChecker, TraceVerdict};
use crate::error::CegarError;
use crate::explore::Explorer;
use crate::interpolate::Interpolater;
use crate::prec::GenericLocPrec;
use crate::refine::{InterpolatingRefiner, RefineOutcome};
use crate::split::{CounterexampleSplitter, Splitter};
use crate::stop::StopHandler;
use crate::tcfa::Tcfa;
use crate::zone::ZonePrec;

/// Verdict of a verification run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CegarResult {
    /// No error state is reachable. `states` is the size of the final abstraction.
    Safe { iterations: usize, states: usize },
    /// An error state is reachable along `trace`.
    Unsafe { trace: ConcreteTrace, iterations: usize },
    Cancelled,
}

impl fmt::Display for CegarResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CegarResult::Safe { iterations, states } => {
                write!(f, "SAFE after {} iterations ({} abstract states)", iterations, states)
            }
            CegarResult::Unsafe { trace, iterations } => {
                write!(f, "UNSAFE after {} iterations: {}", iterations, trace)
            }
            CegarResult::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

pub struct CegarChecker<C, I, S = CounterexampleSplitter> {
    checker: C,
    refiner: InterpolatingRefiner<I, S>,
    stop: StopHandler,
    max_iterations: Option<usize>,
}

impl<C, I, S> CegarChecker<C, I, S>
where
    C: TraceChecker,
    I: Interpolater,
    S: Splitter,
{
    pub fn new(checker: C, refiner: InterpolatingRefiner<I, S>, stop: StopHandler) -> Self {
        Self {
            checker,
            refiner,
            stop,
            max_iterations: None,
        }
    }

    /// Gives up with [`CegarError::IterationLimit`] after `n` iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Verifies that no error location of `model` is reachable, starting
    /// from the abstraction induced by `prec`.
    pub fn check(&self, model: Rc<Tcfa>, prec: GenericLocPrec<ZonePrec>) -> Result<CegarResult, CegarError> {
        let mut system = Explorer::build(model, prec);
        let mut iterations = 0;

        loop {
            if self.stop.is_stopped() {
                info!("Cancelled after {} iterations", iterations);
                return Ok(CegarResult::Cancelled);
            }
            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    return Err(CegarError::IterationLimit(max));
                }
            }
            iterations += 1;
            debug!("Iteration {}: {} abstract states", iterations, system.state_count());

            let Some(cex) = Explorer::find_counterexample(&mut system) else {
                info!("Safe after {} iterations", iterations);
                return Ok(CegarResult::Safe {
                    iterations,
                    states: system.state_count(),
                });
            };

            match self.checker.check(&system, &cex)? {
                TraceVerdict::Feasible(trace) => {
                    info!("Unsafe after {} iterations", iterations);
                    return Ok(CegarResult::Unsafe { trace, iterations });
                }
                TraceVerdict::Infeasible(trace) => match self.refiner.refine(system, &cex, &trace)? {
                    RefineOutcome::Refined(refined) => system = refined,
                    RefineOutcome::Cancelled => {
                        info!("Cancelled during iteration {}", iterations);
                        return Ok(CegarResult::Cancelled);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::checker::ZoneTraceChecker;
    use crate::constr::ClockConstr;
    use crate::interpolate::ZoneInterpolater;
    use crate::op::ClockOp;
    use crate::tcfa::TcfaBuilder;

    /// `a (x <= bound) --> b (urgent) --[x > 2]--> err`
    fn model(bound: i64) -> Rc<Tcfa> {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let a = builder.location("a");
        let b = builder.urgent_location("b");
        let err = builder.location("err");
        builder.invariant(a, ClockConstr::leq(x, bound));
        builder.edge(a, b, Vec::new());
        builder.edge(b, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
        builder.initial(a).error(err);
        Rc::new(builder.build().unwrap())
    }

    fn checker(stop: StopHandler) -> CegarChecker<ZoneTraceChecker, ZoneInterpolater> {
        let refiner = InterpolatingRefiner::new(ZoneInterpolater::default(), stop.clone());
        CegarChecker::new(ZoneTraceChecker, refiner, stop)
    }

    fn empty_prec() -> GenericLocPrec<ZonePrec> {
        GenericLocPrec::with_default(ZonePrec::empty())
    }

    #[test]
    fn test_safe() {
        let result = checker(StopHandler::new()).check(model(2), empty_prec()).unwrap();
        match result {
            CegarResult::Safe { iterations, states } => {
                assert_eq!(iterations, 2);
                // b was split once
                assert_eq!(states, 4);
            }
            other => panic!("expected safe, got {}", other),
        }
    }

    #[test]
    fn test_unsafe() {
        let result = checker(StopHandler::new()).check(model(3), empty_prec()).unwrap();
        match result {
            CegarResult::Unsafe { trace, iterations } => {
                assert_eq!(iterations, 1);
                assert_eq!(trace.len(), 3);
            }
            other => panic!("expected unsafe, got {}", other),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let stop = StopHandler::new();
        stop.stop();
        let result = checker(stop).check(model(2), empty_prec()).unwrap();
        assert_eq!(result, CegarResult::Cancelled);
    }

    #[test]
    fn test_iteration_limit() {
        let result = checker(StopHandler::new())
            .with_max_iterations(1)
            .check(model(2), empty_prec());
        assert_eq!(result, Err(CegarError::IterationLimit(1)));
    }
}
