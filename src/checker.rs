//! Concrete feasibility checking of abstract counterexamples.

use std::fmt;

use log::debug;

use crate::error::SolverError;
use crate::system::AbstractSystem;
use crate::tcfa::TcfaAction;
use crate::transfer::ZoneForwardTransfer;
use crate::types::{Loc, StateId};
use crate::valuation::Valuation;
use crate::zone::ZoneState;

/// One step of a concrete trace.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConcreteStep {
    pub loc: Loc,
    pub valuation: Valuation,
}

/// Concrete witness of the feasible prefix of an abstract counterexample.
///
/// Step `i` holds a valuation reachable at position `i` along the abstract
/// path. The length is the number of positions that are reachable.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConcreteTrace {
    steps: Vec<ConcreteStep>,
}

impl ConcreteTrace {
    pub fn new(steps: Vec<ConcreteStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[ConcreteStep] {
        &self.steps
    }
}

impl fmt::Display for ConcreteTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{} {}", step.loc, step.valuation)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TraceVerdict {
    /// The whole counterexample is realizable and ends in an error valuation.
    Feasible(ConcreteTrace),
    /// Only a prefix is realizable; its length marks the failure state.
    Infeasible(ConcreteTrace),
}

/// Decides whether an abstract counterexample is realizable.
pub trait TraceChecker {
    fn check(&self, system: &AbstractSystem, cex: &[StateId]) -> Result<TraceVerdict, SolverError>;
}

/// Exact forward zones along an abstract path.
///
/// `Z_0` is the initial zone met with the first state; `Z_{i+1}` is the
/// image of `Z_i` under the edge between states `i` and `i+1`, met with
/// state `i+1`. The result stops at the first empty zone.
pub(crate) fn forward_zones(system: &AbstractSystem, cex: &[StateId]) -> Vec<ZoneState> {
    let model = system.model();
    let mut zones = Vec::with_capacity(cex.len());

    let first = state_zone(system, cex[0]);
    let mut current = model.initial_zone().intersect(first);
    for i in 0.. {
        if current.is_bottom() {
            break;
        }
        zones.push(current.clone());
        if i + 1 == cex.len() {
            break;
        }
        let post = ZoneForwardTransfer.post(&current, &action_between(system, cex[i], cex[i + 1]));
        current = post.intersect(state_zone(system, cex[i + 1]));
    }
    zones
}

pub(crate) fn state_zone(system: &AbstractSystem, id: StateId) -> &ZoneState {
    match system.state(id) {
        Some(state) => state.zone(),
        None => panic!("Counterexample refers to unknown state {}", id),
    }
}

pub(crate) fn action_between(system: &AbstractSystem, source: StateId, target: StateId) -> TcfaAction {
    match system.edge_between(source, target) {
        Some(edge) => system.model().action(edge),
        None => panic!("No transition from {} to {} in counterexample", source, target),
    }
}

/// Built-in trace checker computing exact forward zones.
#[derive(Debug, Default, Copy, Clone)]
pub struct ZoneTraceChecker;

impl TraceChecker for ZoneTraceChecker {
    fn check(&self, system: &AbstractSystem, cex: &[StateId]) -> Result<TraceVerdict, SolverError> {
        assert!(!cex.is_empty(), "Empty counterexample");
        let zones = forward_zones(system, cex);
        assert!(
            !zones.is_empty(),
            "First state {} of counterexample holds no initial valuation",
            cex[0]
        );

        let model = system.model();
        let mut steps = Vec::with_capacity(zones.len());
        let mut feasible = false;
        for (i, zone) in zones.iter().enumerate() {
            let loc = abstract_state_loc(system, cex[i]);
            let mut witness = zone.clone();
            if i + 1 == cex.len() {
                if let (Some(pre), Some(error)) = (model.error_pre_zone(loc), model.error_zone(loc)) {
                    let doomed = zone.intersect(pre);
                    if !doomed.is_bottom() {
                        // Wait in the location until the error zone is hit
                        let location = model.location(loc);
                        feasible = true;
                        witness = ZoneForwardTransfer
                            .elapse(&doomed, location.is_urgent(), location.invariants())
                            .intersect(error);
                    }
                }
            }
            let valuation = match witness.sample() {
                Some(v) => v,
                None => unreachable!("non-empty zone {} has no sample", witness),
            };
            steps.push(ConcreteStep { loc, valuation });
        }

        let trace = ConcreteTrace::new(steps);
        if feasible {
            debug!("Counterexample is feasible: {}", trace);
            Ok(TraceVerdict::Feasible(trace))
        } else {
            debug!(
                "Counterexample is infeasible after {} of {} states",
                trace.len(),
                cex.len()
            );
            Ok(TraceVerdict::Infeasible(trace))
        }
    }
}

fn abstract_state_loc(system: &AbstractSystem, id: StateId) -> Loc {
    match system.state(id) {
        Some(state) => state.loc(),
        None => panic!("Counterexample refers to unknown state {}", id),
    }
}
