//! Clock constraints: the atomic vocabulary of the zone domain.
//!
//! A constraint compares the difference of two clocks against an integer
//! bound, `left - right ⋈ bound`, where a missing `right` clock stands for the
//! reference clock (the constant zero). Constraints are plain values:
//! equality is structural and there is no interning.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::types::Clock;
use crate::valuation::Valuation;

/// Comparison operator of a clock constraint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CmpOp {
    Lt,
    Leq,
    Eq,
    Geq,
    Gt,
}

impl CmpOp {
    /// Returns the operator of the complementary atom, if the complement is a
    /// single comparison (`Eq` has no such complement).
    pub fn complement(self) -> Option<CmpOp> {
        match self {
            CmpOp::Lt => Some(CmpOp::Geq),
            CmpOp::Leq => Some(CmpOp::Gt),
            CmpOp::Geq => Some(CmpOp::Lt),
            CmpOp::Gt => Some(CmpOp::Leq),
            CmpOp::Eq => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Leq => "<=",
            CmpOp::Eq => "=",
            CmpOp::Geq => ">=",
            CmpOp::Gt => ">",
        }
    }
}

/// Largest magnitude of a constraint bound or reset value.
///
/// Closure sums bounds along paths of the clock graph, so constants stay well
/// below `i64::MAX` to leave room for those sums.
pub const MAX_CONSTANT: i64 = 1 << 40;

pub(crate) fn check_constant(value: i64, what: &dyn fmt::Display) {
    assert!(
        (-MAX_CONSTANT..=MAX_CONSTANT).contains(&value),
        "Constant {} in {} is out of range (max magnitude {})",
        value,
        what,
        MAX_CONSTANT
    );
}

/// A clock constraint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ClockConstr {
    True,
    False,
    /// `left - right ⋈ bound`, with `right = None` meaning the reference clock.
    Cmp {
        left: Clock,
        right: Option<Clock>,
        op: CmpOp,
        bound: i64,
    },
}

impl ClockConstr {
    pub fn unit(clock: Clock, op: CmpOp, bound: i64) -> Self {
        let constr = ClockConstr::Cmp {
            left: clock,
            right: None,
            op,
            bound,
        };
        check_constant(bound, &constr);
        constr
    }

    pub fn diff(left: Clock, right: Clock, op: CmpOp, bound: i64) -> Self {
        assert_ne!(left, right, "Difference constraint over a single clock {}", left);
        let constr = ClockConstr::Cmp {
            left,
            right: Some(right),
            op,
            bound,
        };
        check_constant(bound, &constr);
        constr
    }

    pub fn lt(clock: Clock, bound: i64) -> Self {
        Self::unit(clock, CmpOp::Lt, bound)
    }
    pub fn leq(clock: Clock, bound: i64) -> Self {
        Self::unit(clock, CmpOp::Leq, bound)
    }
    pub fn eq(clock: Clock, bound: i64) -> Self {
        Self::unit(clock, CmpOp::Eq, bound)
    }
    pub fn geq(clock: Clock, bound: i64) -> Self {
        Self::unit(clock, CmpOp::Geq, bound)
    }
    pub fn gt(clock: Clock, bound: i64) -> Self {
        Self::unit(clock, CmpOp::Gt, bound)
    }

    /// Returns the clocks mentioned by the constraint.
    pub fn clocks(&self) -> Vec<Clock> {
        match *self {
            ClockConstr::True | ClockConstr::False => Vec::new(),
            ClockConstr::Cmp { left, right: None, .. } => vec![left],
            ClockConstr::Cmp {
                left,
                right: Some(right),
                ..
            } => vec![left, right],
        }
    }

    /// Checks whether the constraint is an atom, i.e. a strict or non-strict
    /// inequality whose negation is again a single inequality.
    pub fn is_atom(&self) -> bool {
        matches!(self, ClockConstr::Cmp { op, .. } if *op != CmpOp::Eq)
    }

    /// Returns the negation of the constraint as a disjunction.
    pub fn negate(&self) -> Vec<ClockConstr> {
        match *self {
            ClockConstr::True => vec![ClockConstr::False],
            ClockConstr::False => vec![ClockConstr::True],
            ClockConstr::Cmp {
                left,
                right,
                op: CmpOp::Eq,
                bound,
            } => vec![
                ClockConstr::Cmp {
                    left,
                    right,
                    op: CmpOp::Lt,
                    bound,
                },
                ClockConstr::Cmp {
                    left,
                    right,
                    op: CmpOp::Gt,
                    bound,
                },
            ],
            ClockConstr::Cmp { left, right, op, bound } => vec![ClockConstr::Cmp {
                left,
                right,
                op: op.complement().expect("non-Eq operators have a complement"),
                bound,
            }],
        }
    }

    /// Evaluates the constraint under a concrete valuation.
    pub fn holds(&self, valuation: &Valuation) -> bool {
        match *self {
            ClockConstr::True => true,
            ClockConstr::False => false,
            ClockConstr::Cmp { left, right, op, bound } => {
                let lhs = match right {
                    Some(right) => valuation.get(left) - valuation.get(right),
                    None => valuation.get(left).clone(),
                };
                let rhs = BigRational::from_integer(BigInt::from(bound));
                match op {
                    CmpOp::Lt => lhs < rhs,
                    CmpOp::Leq => lhs <= rhs,
                    CmpOp::Eq => lhs == rhs,
                    CmpOp::Geq => lhs >= rhs,
                    CmpOp::Gt => lhs > rhs,
                }
            }
        }
    }
}

impl fmt::Display for ClockConstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockConstr::True => write!(f, "true"),
            ClockConstr::False => write!(f, "false"),
            ClockConstr::Cmp {
                left,
                right: None,
                op,
                bound,
            } => write!(f, "{} {} {}", left, op.symbol(), bound),
            ClockConstr::Cmp {
                left,
                right: Some(right),
                op,
                bound,
            } => write!(f, "{} - {} {} {}", left, right, op.symbol(), bound),
        }
    }
}
