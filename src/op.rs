//! Clock operations labelling the edges of a timed automaton.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::constr::{check_constant, ClockConstr};
use crate::types::Clock;
use crate::valuation::Valuation;

/// A single clock operation. Edges carry an ordered list of them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ClockOp {
    /// `clock := value`
    Reset { clock: Clock, value: i64 },
    /// `[constr]`, blocks unless the constraint holds.
    Guard(ClockConstr),
    /// `clock := value`
    Copy { clock: Clock, value: Clock },
    /// `clock := clock + offset`
    Shift { clock: Clock, offset: i64 },
    /// `clock := *`
    Free(Clock),
}

impl ClockOp {
    pub fn reset(clock: Clock, value: i64) -> Self {
        assert!(value >= 0, "Reset of {} to negative value {}", clock, value);
        let op = ClockOp::Reset { clock, value };
        check_constant(value, &op);
        op
    }

    pub fn shift(clock: Clock, offset: i64) -> Self {
        let op = ClockOp::Shift { clock, offset };
        check_constant(offset, &op);
        op
    }

    pub fn guard(constr: ClockConstr) -> Self {
        ClockOp::Guard(constr)
    }

    /// Returns the clocks read or written by the operation.
    pub fn clocks(&self) -> Vec<Clock> {
        match self {
            ClockOp::Reset { clock, .. } | ClockOp::Shift { clock, .. } | ClockOp::Free(clock) => vec![*clock],
            ClockOp::Copy { clock, value } => vec![*clock, *value],
            ClockOp::Guard(constr) => constr.clocks(),
        }
    }

    /// Applies the operation to a concrete valuation.
    ///
    /// Returns `None` if a guard blocks or a shift would make the clock
    /// negative. `Free` is non-deterministic and resolved to zero here.
    pub fn apply(&self, valuation: &Valuation) -> Option<Valuation> {
        let mut result = valuation.clone();
        match *self {
            ClockOp::Reset { clock, value } => {
                result.set(clock, BigRational::from_integer(BigInt::from(value)));
            }
            ClockOp::Guard(constr) => {
                if !constr.holds(valuation) {
                    return None;
                }
            }
            ClockOp::Copy { clock, value } => {
                result.set(clock, valuation.get(value).clone());
            }
            ClockOp::Shift { clock, offset } => {
                let shifted = valuation.get(clock) + BigRational::from_integer(BigInt::from(offset));
                if shifted.is_negative() {
                    return None;
                }
                result.set(clock, shifted);
            }
            ClockOp::Free(clock) => {
                result.set(clock, BigRational::zero());
            }
        }
        Some(result)
    }
}

impl fmt::Display for ClockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockOp::Reset { clock, value } => write!(f, "{} := {}", clock, value),
            ClockOp::Guard(constr) => write!(f, "[{}]", constr),
            ClockOp::Copy { clock, value } => write!(f, "{} := {}", clock, value),
            ClockOp::Shift { clock, offset } => write!(f, "{} := {} + {}", clock, clock, offset),
            ClockOp::Free(clock) => write!(f, "free {}", clock),
        }
    }
}
