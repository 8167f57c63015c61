//! Abstract domains and the location-lifted domain.

use std::fmt;

use crate::types::Loc;
use crate::zone::ZoneState;

/// Partial order of an abstract domain.
pub trait Domain<S> {
    fn is_top(&self, state: &S) -> bool;
    fn is_bottom(&self, state: &S) -> bool;
    /// Entailment: every concrete state of `left` is one of `right`.
    fn is_leq(&self, left: &S, right: &S) -> bool;
}

/// The zone domain.
#[derive(Debug, Default, Copy, Clone)]
pub struct ZoneDomain;

impl Domain<ZoneState> for ZoneDomain {
    fn is_top(&self, state: &ZoneState) -> bool {
        state.is_top()
    }

    fn is_bottom(&self, state: &ZoneState) -> bool {
        state.is_bottom()
    }

    fn is_leq(&self, left: &ZoneState, right: &ZoneState) -> bool {
        left.is_leq(right)
    }
}

/// A state of some inner domain together with a vector of control locations.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct LocState<S> {
    locs: Vec<Loc>,
    state: S,
}

impl<S> LocState<S> {
    pub fn new(locs: Vec<Loc>, state: S) -> Self {
        Self { locs, state }
    }

    /// Single-process state.
    pub fn single(loc: Loc, state: S) -> Self {
        Self { locs: vec![loc], state }
    }

    pub fn locs(&self) -> &[Loc] {
        &self.locs
    }

    /// Returns the location of a single-process state.
    pub fn loc(&self) -> Loc {
        assert_eq!(self.locs.len(), 1, "State has {} locations, expected one", self.locs.len());
        self.locs[0]
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Replaces the inner state, keeping the locations.
    pub fn with_state(&self, state: S) -> Self {
        Self {
            locs: self.locs.clone(),
            state,
        }
    }
}

impl<S: fmt::Display> fmt::Display for LocState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, loc) in self.locs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", loc)?;
        }
        write!(f, ") {}", self.state)
    }
}

/// Lifts an inner domain to [`LocState`]s.
///
/// Nothing is top, since a state always pins down its locations. Two states
/// are only comparable at equal location vectors.
pub struct LocDomain<'a, S> {
    domain: &'a dyn Domain<S>,
}

impl<'a, S> LocDomain<'a, S> {
    pub fn new(domain: &'a dyn Domain<S>) -> Self {
        Self { domain }
    }
}

impl<S> Domain<LocState<S>> for LocDomain<'_, S> {
    fn is_top(&self, _state: &LocState<S>) -> bool {
        false
    }

    fn is_bottom(&self, state: &LocState<S>) -> bool {
        self.domain.is_bottom(&state.state)
    }

    fn is_leq(&self, left: &LocState<S>, right: &LocState<S>) -> bool {
        left.locs == right.locs && self.domain.is_leq(&left.state, &right.state)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constr::ClockConstr;
    use crate::types::Clock;

    #[test]
    fn test_loc_domain() {
        let inner = ZoneDomain;
        let domain = LocDomain::new(&inner);
        let x = Clock::new(1);

        let small = LocState::single(Loc::new(0), ZoneState::top(1).and(&ClockConstr::leq(x, 2)));
        let big = LocState::single(Loc::new(0), ZoneState::top(1));
        let elsewhere = LocState::single(Loc::new(1), ZoneState::top(1));

        assert!(domain.is_leq(&small, &big));
        assert!(!domain.is_leq(&big, &small));
        assert!(!domain.is_leq(&small, &elsewhere));
        assert!(!domain.is_top(&big));
        assert!(inner.is_top(big.state()));
        assert!(domain.is_bottom(&small.with_state(ZoneState::bottom(1))));
        assert_eq!(small.to_string(), "(L0) {c1 <= 2}");
    }
}
