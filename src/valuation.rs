//! Concrete clock valuations.
//!
//! Clock values are non-negative rationals. Strict zone bounds (`x < 1`)
//! need values strictly between integers, so valuations use
//! [`BigRational`] rather than a fixed-width number type.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::types::Clock;

/// Assignment of a rational value to every clock of a model.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Valuation {
    values: Vec<BigRational>,
}

impl Valuation {
    /// All clocks are zero.
    pub fn zero(clocks: usize) -> Self {
        Self {
            values: vec![BigRational::zero(); clocks],
        }
    }

    /// Builds a valuation from integer values, `values[0]` being clock 1.
    pub fn from_integers(values: &[i64]) -> Self {
        Self {
            values: values.iter().map(|&v| BigRational::from_integer(BigInt::from(v))).collect(),
        }
    }

    pub fn from_values(values: Vec<BigRational>) -> Self {
        Self { values }
    }

    /// Returns the number of clocks.
    pub fn clock_count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, clock: Clock) -> &BigRational {
        &self.values[clock.index() - 1]
    }

    pub fn set(&mut self, clock: Clock, value: BigRational) {
        assert!(!value.is_negative(), "Clock {} set to negative value {}", clock, value);
        self.values[clock.index() - 1] = value;
    }

    /// Returns the value of the DBM row/column `index`, 0 being the reference clock.
    pub(crate) fn at(&self, index: usize) -> BigRational {
        if index == 0 {
            BigRational::zero()
        } else {
            self.values[index - 1].clone()
        }
    }

    /// Lets `delay` time units elapse.
    pub fn delay(&self, delay: &BigRational) -> Self {
        assert!(!delay.is_negative(), "Negative delay {}", delay);
        Self {
            values: self.values.iter().map(|v| v + delay).collect(),
        }
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "c{}={}", i + 1, value)?;
        }
        write!(f, ")")
    }
}
