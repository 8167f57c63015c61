//! Successor and predecessor computation on zones.

use log::trace;

use crate::constr::ClockConstr;
use crate::op::ClockOp;
use crate::tcfa::TcfaAction;
use crate::zone::{ZonePrec, ZoneState};

/// Computes the abstract successors of a state under an action.
///
/// For a backward transfer function the "successors" are predecessors.
pub trait TransferFunction<S, A, P> {
    fn succ_states(&self, state: &S, action: &A, prec: &P) -> Vec<S>;
}

/// Exact forward image of a zone under a timed edge.
#[derive(Debug, Default, Copy, Clone)]
pub struct ZoneForwardTransfer;

impl ZoneForwardTransfer {
    /// Lets time pass in a location: delay unless urgent, bounded by the
    /// invariant.
    pub fn elapse(&self, state: &ZoneState, urgent: bool, invariants: &[ClockConstr]) -> ZoneState {
        let mut ops = state.transform();
        if !urgent {
            ops.up();
        }
        for constr in invariants {
            ops.and(constr);
        }
        ops.done()
    }

    /// Delay in the source (unless urgent), source invariant, the clock
    /// operations in order, target invariant.
    pub fn post(&self, state: &ZoneState, action: &TcfaAction) -> ZoneState {
        let mut ops = state.transform();
        if !action.is_source_urgent() {
            ops.up();
        }
        for constr in action.source_invariants() {
            ops.and(constr);
        }
        for op in action.clock_ops() {
            ops.execute(op);
        }
        for constr in action.target_invariants() {
            ops.and(constr);
        }
        let result = ops.done();
        trace!("post({}, {}) = {}", state, action, result);
        result
    }
}

impl TransferFunction<ZoneState, TcfaAction, ZonePrec> for ZoneForwardTransfer {
    fn succ_states(&self, state: &ZoneState, action: &TcfaAction, _prec: &ZonePrec) -> Vec<ZoneState> {
        let succ = self.post(state, action);
        if succ.is_bottom() {
            Vec::new()
        } else {
            vec![succ]
        }
    }
}

/// Exact weakest precondition of a zone under a timed edge.
///
/// Only resets and guards can be replayed backwards. Any other clock
/// operation on the edge is a malformed action and panics.
#[derive(Debug, Default, Copy, Clone)]
pub struct ZoneBackwardTransfer;

impl ZoneBackwardTransfer {
    pub fn pre(&self, state: &ZoneState, action: &TcfaAction) -> ZoneState {
        let mut ops = state.transform();

        for op in action.clock_ops().iter().rev() {
            match *op {
                ClockOp::Reset { clock, value } => {
                    ops.and(&ClockConstr::eq(clock, value));
                    ops.free(clock);
                }
                ClockOp::Guard(ref constr) => {
                    ops.and(constr);
                }
                _ => panic!(
                    "Clock operation `{}` on edge {} can not be applied backwards",
                    op,
                    action.edge()
                ),
            }
        }

        for constr in action.target_invariants() {
            ops.and(constr);
        }

        if !action.is_source_urgent() {
            ops.down();
        }

        for constr in action.source_invariants() {
            ops.and(constr);
        }

        let result = ops.done();
        trace!("pre({}, {}) = {}", state, action, result);
        result
    }
}

impl TransferFunction<ZoneState, TcfaAction, ZonePrec> for ZoneBackwardTransfer {
    fn succ_states(&self, state: &ZoneState, action: &TcfaAction, _prec: &ZonePrec) -> Vec<ZoneState> {
        let pred = self.pre(state, action);
        if pred.is_bottom() {
            Vec::new()
        } else {
            vec![pred]
        }
    }
}
