//! Interpolants for infeasible abstract counterexamples.
//!
//! An interpolant separates what is reachable along a counterexample from
//! what leads to its failure. Here formulas are zones, either positive
//! ([`ItpFormula::Reach`], an over-approximation of the reachable
//! valuations) or negated ([`ItpFormula::Avoid`], the complement of the
//! valuations from which the failure is reachable). The splitter only looks
//! at the atoms of the zone, so both polarities split the same way.

use std::fmt;

use log::{debug, trace};

use crate::checker::{action_between, forward_zones, state_zone, ConcreteTrace};
use crate::error::SolverError;
use crate::op::ClockOp;
use crate::system::AbstractSystem;
use crate::tcfa::TcfaAction;
use crate::transfer::ZoneBackwardTransfer;
use crate::types::StateId;
use crate::valuation::Valuation;
use crate::zone::ZoneState;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ItpFormula {
    /// Holds inside the zone.
    Reach(ZoneState),
    /// Holds outside the zone.
    Avoid(ZoneState),
}

impl ItpFormula {
    pub fn zone(&self) -> &ZoneState {
        match self {
            ItpFormula::Reach(zone) | ItpFormula::Avoid(zone) => zone,
        }
    }

    pub fn holds(&self, valuation: &Valuation) -> bool {
        match self {
            ItpFormula::Reach(zone) => zone.contains(valuation),
            ItpFormula::Avoid(zone) => !zone.contains(valuation),
        }
    }
}

impl fmt::Display for ItpFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItpFormula::Reach(zone) => write!(f, "{}", zone),
            ItpFormula::Avoid(zone) => write!(f, "not {}", zone),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Interpolant {
    /// A single formula at the failure index.
    Binary { index: usize, formula: ItpFormula },
    /// One formula per position, up to and including the failure index.
    Sequence(Vec<ItpFormula>),
}

impl Interpolant {
    /// Returns the counterexample index of the last formula, or `None` for an
    /// empty sequence.
    pub fn failure_index(&self) -> Option<usize> {
        match self {
            Interpolant::Binary { index, .. } => Some(*index),
            Interpolant::Sequence(formulas) => formulas.len().checked_sub(1),
        }
    }

    /// Returns the formulas with their counterexample positions.
    pub fn formulas(&self) -> Vec<(usize, &ItpFormula)> {
        match self {
            Interpolant::Binary { index, formula } => vec![(*index, formula)],
            Interpolant::Sequence(formulas) => formulas.iter().enumerate().collect(),
        }
    }
}

impl fmt::Display for Interpolant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolant::Binary { index, formula } => write!(f, "[{}: {}]", index, formula),
            Interpolant::Sequence(formulas) => {
                write!(f, "[")?;
                for (i, formula) in formulas.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", i, formula)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Computes an interpolant for an infeasible counterexample.
///
/// `trace` is the feasible prefix reported by the trace checker; the failure
/// index is `trace.len() - 1`.
pub trait Interpolater {
    fn interpolate(
        &self,
        system: &AbstractSystem,
        cex: &[StateId],
        trace: &ConcreteTrace,
    ) -> Result<Interpolant, SolverError>;
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum InterpolantKind {
    #[default]
    Binary,
    Sequence,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    /// Strongest reachable zones from the initial state.
    #[default]
    Forward,
    /// Weakest zones leading to the failure.
    Backward,
}

/// Exact zone interpolation.
#[derive(Debug, Default, Copy, Clone)]
pub struct ZoneInterpolater {
    pub kind: InterpolantKind,
    pub direction: Direction,
}

impl ZoneInterpolater {
    pub fn new(kind: InterpolantKind, direction: Direction) -> Self {
        Self { kind, direction }
    }

    /// Zones `B_0..=B_f` of valuations from which the failure at `f` follows.
    ///
    /// Positions before an edge that cannot be replayed backwards are empty.
    fn backward_zones(&self, system: &AbstractSystem, cex: &[StateId], failure: usize) -> Vec<ZoneState> {
        let model = system.model();
        let clocks = model.clock_count();
        let zone = |i: usize| state_zone(system, cex[i]);
        let action = |i: usize| action_between(system, cex[i], cex[i + 1]);

        let mut zones = vec![ZoneState::bottom(clocks); failure + 1];
        let bad = if failure + 1 == cex.len() {
            let loc = system.state(cex[failure]).map(|s| s.loc());
            match loc.and_then(|loc| model.error_pre_zone(loc)) {
                Some(error) => zone(failure).intersect(error),
                None => ZoneState::bottom(clocks),
            }
        } else {
            let a = action(failure);
            if replayable(&a) {
                ZoneBackwardTransfer.pre(zone(failure + 1), &a).intersect(zone(failure))
            } else {
                ZoneState::bottom(clocks)
            }
        };
        zones[failure] = bad;

        for i in (0..failure).rev() {
            let a = action(i);
            if !replayable(&a) || zones[i + 1].is_bottom() {
                break;
            }
            zones[i] = ZoneBackwardTransfer.pre(&zones[i + 1], &a).intersect(zone(i));
        }
        zones
    }
}

fn replayable(action: &TcfaAction) -> bool {
    action
        .clock_ops()
        .iter()
        .all(|op| matches!(op, ClockOp::Reset { .. } | ClockOp::Guard(_)))
}

impl Interpolater for ZoneInterpolater {
    fn interpolate(
        &self,
        system: &AbstractSystem,
        cex: &[StateId],
        trace: &ConcreteTrace,
    ) -> Result<Interpolant, SolverError> {
        assert!(
            !trace.is_empty() && trace.len() <= cex.len(),
            "Trace of length {} for counterexample of length {}",
            trace.len(),
            cex.len()
        );
        let failure = trace.len() - 1;

        let forward = forward_zones(system, cex);
        if forward.len() != trace.len() {
            return Err(SolverError::Unknown(format!(
                "trace reaches {} states but zones reach {}",
                trace.len(),
                forward.len()
            )));
        }

        let backward = match self.direction {
            Direction::Forward => None,
            Direction::Backward => Some(self.backward_zones(system, cex, failure)),
        };

        let formula = |i: usize| -> ItpFormula {
            if let Some(backward) = &backward {
                let bad = &backward[i];
                if !bad.is_bottom() && !bad.intersects(&forward[i]) {
                    return ItpFormula::Avoid(bad.clone());
                }
                trace!("interpolate: no backward formula at {}, using forward", i);
            }
            ItpFormula::Reach(forward[i].clone())
        };

        let interpolant = match self.kind {
            InterpolantKind::Binary => Interpolant::Binary {
                index: failure,
                formula: formula(failure),
            },
            InterpolantKind::Sequence => Interpolant::Sequence((0..=failure).map(formula).collect()),
        };
        debug!("Interpolant: {}", interpolant);
        Ok(interpolant)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::checker::{TraceChecker, TraceVerdict, ZoneTraceChecker};
    use crate::constr::ClockConstr;
    use crate::explore::Explorer;
    use crate::prec::GenericLocPrec;
    use crate::tcfa::TcfaBuilder;
    use crate::types::Clock;
    use crate::zone::ZonePrec;

    /// `a (x <= 2) --> b (urgent) --[x > 2]--> err`
    fn setup() -> (AbstractSystem, Vec<StateId>, ConcreteTrace) {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let a = builder.location("a");
        let b = builder.urgent_location("b");
        let err = builder.location("err");
        builder.invariant(a, ClockConstr::leq(x, 2));
        builder.edge(a, b, Vec::new());
        builder.edge(b, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
        builder.initial(a).error(err);
        let model = Rc::new(builder.build().unwrap());

        let mut system = Explorer::build(model, GenericLocPrec::with_default(ZonePrec::empty()));
        let cex = Explorer::find_counterexample(&mut system).unwrap();
        let trace = match ZoneTraceChecker.check(&system, &cex).unwrap() {
            TraceVerdict::Infeasible(trace) => trace,
            TraceVerdict::Feasible(trace) => panic!("unexpected feasible trace {}", trace),
        };
        (system, cex, trace)
    }

    fn x() -> Clock {
        Clock::new(1)
    }

    #[test]
    fn test_forward_binary() {
        let (system, cex, trace) = setup();
        assert_eq!(trace.len(), 2);
        let itp = ZoneInterpolater::default().interpolate(&system, &cex, &trace).unwrap();
        let expected = ZoneState::top(1).and(&ClockConstr::leq(x(), 2));
        assert_eq!(
            itp,
            Interpolant::Binary {
                index: 1,
                formula: ItpFormula::Reach(expected)
            }
        );
        assert_eq!(itp.failure_index(), Some(1));
    }

    #[test]
    fn test_failure_index_of_sequence() {
        let top = ItpFormula::Reach(ZoneState::top(1));
        assert_eq!(Interpolant::Sequence(vec![top.clone(), top]).failure_index(), Some(1));
        assert_eq!(Interpolant::Sequence(Vec::new()).failure_index(), None);
        assert_eq!(Interpolant::Sequence(Vec::new()).to_string(), "[]");
    }

    #[test]
    fn test_backward_binary() {
        let (system, cex, trace) = setup();
        let interpolater = ZoneInterpolater::new(InterpolantKind::Binary, Direction::Backward);
        let itp = interpolater.interpolate(&system, &cex, &trace).unwrap();
        let bad = ZoneState::top(1).and(&ClockConstr::gt(x(), 2));
        assert_eq!(
            itp,
            Interpolant::Binary {
                index: 1,
                formula: ItpFormula::Avoid(bad)
            }
        );
    }

    #[test]
    fn test_sequence_falls_back_to_forward() {
        let (system, cex, trace) = setup();
        let interpolater = ZoneInterpolater::new(InterpolantKind::Sequence, Direction::Backward);
        let itp = interpolater.interpolate(&system, &cex, &trace).unwrap();
        let formulas = itp.formulas();
        assert_eq!(formulas.len(), 2);
        // Every valuation of a can wait for the guard, so position 0 has no
        // backward separation
        assert_eq!(formulas[0].1, &ItpFormula::Reach(ZoneState::zero(1)));
        assert!(matches!(formulas[1].1, ItpFormula::Avoid(_)));
    }

    #[test]
    fn test_formulas_separate_trace() {
        let (system, cex, trace) = setup();
        for direction in [Direction::Forward, Direction::Backward] {
            let interpolater = ZoneInterpolater::new(InterpolantKind::Sequence, direction);
            let itp = interpolater.interpolate(&system, &cex, &trace).unwrap();
            for (i, formula) in itp.formulas() {
                assert!(formula.holds(&trace.steps()[i].valuation));
            }
        }
    }

    #[test]
    fn test_trace_mismatch_is_solver_error() {
        let (system, cex, _) = setup();
        let bogus = ConcreteTrace::new(vec![
            crate::checker::ConcreteStep {
                loc: system.state(cex[0]).unwrap().loc(),
                valuation: Valuation::zero(1),
            };
            3
        ]);
        let result = ZoneInterpolater::default().interpolate(&system, &cex, &bogus);
        assert!(matches!(result, Err(SolverError::Unknown(_))));
    }
}
