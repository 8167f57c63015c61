//! Type-safe identifiers for clocks, locations, edges and abstract states.
//!
//! Newtype wrappers keep the different index spaces apart: a clock index can
//! not be used where a location is expected, and the reference clock (index 0)
//! can never be constructed as a [`Clock`].
use std::fmt;

/// A clock identifier (1-indexed).
///
/// Index 0 is reserved for the reference clock (the constant zero), which is
/// row/column 0 of every difference-bound matrix.
///
/// # Invariants
///
/// - Clock IDs must be >= 1
/// - The ID is the row/column of the clock in a DBM
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Clock(u32);

impl Clock {
    /// Creates a new clock with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Clocks must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Clock IDs must be >= 1");
        Clock(id)
    }

    /// Returns the raw clock ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns the row/column of this clock in a DBM.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<Clock> for u32 {
    fn from(clock: Clock) -> Self {
        clock.0
    }
}

/// A control location of an automaton (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Loc(u32);

impl Loc {
    pub fn new(index: u32) -> Self {
        Loc(index)
    }

    /// Returns the raw location index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<usize> for Loc {
    fn from(index: usize) -> Self {
        Loc(index as u32)
    }
}

/// An edge of an automaton (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeId(u32);

impl EdgeId {
    pub fn new(index: u32) -> Self {
        EdgeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Handle of an abstract state.
///
/// IDs are assigned monotonically by the owning
/// [`AbstractSystem`][crate::system::AbstractSystem], so the order of IDs is
/// the order of creation. An ID is never reused, even after its state was
/// split and removed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(u32);

impl StateId {
    pub(crate) const fn new(raw: u32) -> Self {
        StateId(raw)
    }

    /// Return the internal representation of the handle.
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn next(self) -> Self {
        StateId(self.0 + 1)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}
