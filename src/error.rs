//! Error types.
//!
//! Only recoverable conditions are errors: an inconclusive solver, an
//! exhausted iteration budget, a malformed model. Broken invariants of the
//! kernel itself are panics.

use std::fmt;

use crate::types::{Clock, Loc};

/// Failure of a trace checker or interpolater.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SolverError {
    /// The solver gave up without an answer.
    Unknown(String),
    /// The solver ran out of time.
    Timeout,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Unknown(reason) => write!(f, "Solver returned unknown: {}", reason),
            SolverError::Timeout => write!(f, "Solver timed out"),
        }
    }
}

impl std::error::Error for SolverError {}

/// Error of a refinement step or a whole verification run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CegarError {
    Solver(SolverError),
    /// The loop did not converge within the given number of iterations.
    IterationLimit(usize),
}

impl From<SolverError> for CegarError {
    fn from(e: SolverError) -> Self {
        CegarError::Solver(e)
    }
}

impl fmt::Display for CegarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CegarError::Solver(e) => write!(f, "Solver error: {}", e),
            CegarError::IterationLimit(n) => write!(f, "No verdict after {} iterations", n),
        }
    }
}

impl std::error::Error for CegarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CegarError::Solver(e) => Some(e),
            CegarError::IterationLimit(_) => None,
        }
    }
}

/// Malformed model handed to [`TcfaBuilder::build`][crate::tcfa::TcfaBuilder::build].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ModelError {
    NoInitialLocation,
    UnknownLocation(Loc),
    UnknownClock(Clock),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NoInitialLocation => write!(f, "Model has no initial location"),
            ModelError::UnknownLocation(loc) => write!(f, "Unknown location {}", loc),
            ModelError::UnknownClock(clock) => write!(f, "Unknown clock {}", clock),
        }
    }
}

impl std::error::Error for ModelError {}
