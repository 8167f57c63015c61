//! Timed control-flow automata.
//!
//! A [`Tcfa`] is a set of locations (each with an invariant and an urgency
//! flag) connected by edges labelled with ordered lists of clock operations.
//! Safety properties are given as error conditions: a location together with
//! a zone of clock valuations that must not be reached there.
//!
//! # Example
//!
//! ```
//! use zone_cegar::constr::ClockConstr;
//! use zone_cegar::op::ClockOp;
//! use zone_cegar::tcfa::TcfaBuilder;
//!
//! let mut builder = TcfaBuilder::new();
//! let x = builder.clock("x");
//! let idle = builder.location("idle");
//! let busy = builder.location("busy");
//! builder.invariant(busy, ClockConstr::leq(x, 3));
//! builder.edge(idle, busy, vec![ClockOp::reset(x, 0)]);
//! builder.initial(idle);
//! builder.error_zone(busy, vec![ClockConstr::gt(x, 3)]);
//! let tcfa = builder.build().unwrap();
//!
//! assert_eq!(tcfa.location_count(), 2);
//! assert_eq!(tcfa.outgoing(idle).count(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::constr::ClockConstr;
use crate::error::ModelError;
use crate::op::ClockOp;
use crate::types::{Clock, EdgeId, Loc};
use crate::zone::ZoneState;

#[derive(Debug, Clone)]
pub struct Location {
    name: String,
    urgent: bool,
    invariants: Vec<ClockConstr>,
}

impl Location {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_urgent(&self) -> bool {
        self.urgent
    }

    pub fn invariants(&self) -> &[ClockConstr] {
        &self.invariants
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    source: Loc,
    target: Loc,
    ops: Vec<ClockOp>,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn source(&self) -> Loc {
        self.source
    }

    pub fn target(&self) -> Loc {
        self.target
    }

    pub fn ops(&self) -> &[ClockOp] {
        &self.ops
    }
}

/// An edge of the automaton with everything a transfer function needs to
/// know about its endpoints.
#[derive(Debug, Clone)]
pub struct TcfaAction {
    edge: EdgeId,
    source: Loc,
    target: Loc,
    ops: Vec<ClockOp>,
    source_invariants: Vec<ClockConstr>,
    target_invariants: Vec<ClockConstr>,
    source_urgent: bool,
}

impl TcfaAction {
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn source(&self) -> Loc {
        self.source
    }

    pub fn target(&self) -> Loc {
        self.target
    }

    /// Returns the clock operations in execution order.
    pub fn clock_ops(&self) -> &[ClockOp] {
        &self.ops
    }

    pub fn source_invariants(&self) -> &[ClockConstr] {
        &self.source_invariants
    }

    pub fn target_invariants(&self) -> &[ClockConstr] {
        &self.target_invariants
    }

    pub fn is_source_urgent(&self) -> bool {
        self.source_urgent
    }
}

impl fmt::Display for TcfaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {} [", self.edge, self.source, self.target)?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", op)?;
        }
        write!(f, "]")
    }
}

/// A timed control-flow automaton with error conditions.
#[derive(Debug, Clone)]
pub struct Tcfa {
    clocks: Vec<String>,
    locations: Vec<Location>,
    edges: Vec<Edge>,
    initial: Loc,
    errors: BTreeMap<Loc, ZoneState>,
    error_pre: BTreeMap<Loc, ZoneState>,
}

impl Tcfa {
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    pub fn clocks(&self) -> impl Iterator<Item = Clock> {
        (1..=self.clocks.len() as u32).map(Clock::new)
    }

    pub fn clock_name(&self, clock: Clock) -> &str {
        &self.clocks[clock.index() - 1]
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn locations(&self) -> impl Iterator<Item = Loc> {
        (0..self.locations.len()).map(Loc::from)
    }

    pub fn location(&self, loc: Loc) -> &Location {
        &self.locations[loc.index()]
    }

    pub fn is_urgent(&self, loc: Loc) -> bool {
        self.location(loc).urgent
    }

    /// Returns the invariant of `loc` as a zone.
    pub fn invariant_zone(&self, loc: Loc) -> ZoneState {
        let mut ops = ZoneState::top(self.clock_count()).transform();
        for constr in &self.location(loc).invariants {
            ops.and(constr);
        }
        ops.done()
    }

    pub fn initial_loc(&self) -> Loc {
        self.initial
    }

    /// The initial valuations: all clocks zero, restricted by the invariant
    /// of the initial location.
    pub fn initial_zone(&self) -> ZoneState {
        ZoneState::zero(self.clock_count()).intersect(&self.invariant_zone(self.initial))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn outgoing(&self, loc: Loc) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == loc)
    }

    /// Returns the error zone of `loc`, if the location has an error condition.
    pub fn error_zone(&self, loc: Loc) -> Option<&ZoneState> {
        self.errors.get(&loc)
    }

    /// Returns the valuations of `loc` from which its error zone is reached
    /// by letting time pass within the invariant.
    ///
    /// For urgent locations this is the error zone met with the invariant.
    pub fn error_pre_zone(&self, loc: Loc) -> Option<&ZoneState> {
        self.error_pre.get(&loc)
    }

    pub fn error_locs(&self) -> impl Iterator<Item = Loc> + '_ {
        self.errors.keys().copied()
    }

    pub fn action(&self, id: EdgeId) -> TcfaAction {
        let edge = self.edge(id);
        let source = self.location(edge.source);
        let target = self.location(edge.target);
        TcfaAction {
            edge: id,
            source: edge.source,
            target: edge.target,
            ops: edge.ops.clone(),
            source_invariants: source.invariants.clone(),
            target_invariants: target.invariants.clone(),
            source_urgent: source.urgent,
        }
    }
}

/// Incremental construction of a [`Tcfa`].
#[derive(Debug, Default)]
pub struct TcfaBuilder {
    clocks: Vec<String>,
    locations: Vec<Location>,
    edges: Vec<Edge>,
    invariants: Vec<(Loc, ClockConstr)>,
    initial: Option<Loc>,
    errors: BTreeMap<Loc, Vec<ClockConstr>>,
}

impl TcfaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&mut self, name: impl Into<String>) -> Clock {
        self.clocks.push(name.into());
        Clock::new(self.clocks.len() as u32)
    }

    pub fn location(&mut self, name: impl Into<String>) -> Loc {
        self.add_location(name.into(), false)
    }

    /// Adds a location in which no time may pass.
    pub fn urgent_location(&mut self, name: impl Into<String>) -> Loc {
        self.add_location(name.into(), true)
    }

    fn add_location(&mut self, name: String, urgent: bool) -> Loc {
        self.locations.push(Location {
            name,
            urgent,
            invariants: Vec::new(),
        });
        Loc::from(self.locations.len() - 1)
    }

    pub fn invariant(&mut self, loc: Loc, constr: ClockConstr) -> &mut Self {
        self.invariants.push((loc, constr));
        self
    }

    pub fn edge(&mut self, source: Loc, target: Loc, ops: Vec<ClockOp>) -> EdgeId {
        let id = EdgeId::new(self.edges.len() as u32);
        self.edges.push(Edge { id, source, target, ops });
        id
    }

    pub fn initial(&mut self, loc: Loc) -> &mut Self {
        self.initial = Some(loc);
        self
    }

    /// Marks `loc` as an error location regardless of clock values.
    pub fn error(&mut self, loc: Loc) -> &mut Self {
        self.error_zone(loc, Vec::new())
    }

    /// Marks the valuations of `loc` satisfying all of `constrs` as errors.
    ///
    /// A location has at most one error condition; a later call replaces it.
    pub fn error_zone(&mut self, loc: Loc, constrs: Vec<ClockConstr>) -> &mut Self {
        self.errors.insert(loc, constrs);
        self
    }

    fn check_loc(&self, loc: Loc) -> Result<(), ModelError> {
        if loc.index() < self.locations.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownLocation(loc))
        }
    }

    fn check_clocks(&self, clocks: Vec<Clock>) -> Result<(), ModelError> {
        match clocks.into_iter().find(|c| c.index() > self.clocks.len()) {
            Some(clock) => Err(ModelError::UnknownClock(clock)),
            None => Ok(()),
        }
    }

    pub fn build(mut self) -> Result<Tcfa, ModelError> {
        let initial = self.initial.ok_or(ModelError::NoInitialLocation)?;
        self.check_loc(initial)?;
        for (loc, constr) in std::mem::take(&mut self.invariants) {
            self.check_loc(loc)?;
            self.check_clocks(constr.clocks())?;
            self.locations[loc.index()].invariants.push(constr);
        }
        for edge in &self.edges {
            self.check_loc(edge.source)?;
            self.check_loc(edge.target)?;
            for op in &edge.ops {
                self.check_clocks(op.clocks())?;
            }
        }

        let mut errors = BTreeMap::new();
        let mut error_pre = BTreeMap::new();
        for (&loc, constrs) in &self.errors {
            self.check_loc(loc)?;
            let mut ops = ZoneState::top(self.clocks.len()).transform();
            for constr in constrs {
                self.check_clocks(constr.clocks())?;
                ops.and(constr);
            }
            let zone = ops.done();

            let location = &self.locations[loc.index()];
            let mut ops = zone.transform();
            for constr in &location.invariants {
                ops.and(constr);
            }
            if !location.urgent {
                ops.down();
            }
            for constr in &location.invariants {
                ops.and(constr);
            }
            error_pre.insert(loc, ops.done());
            errors.insert(loc, zone);
        }

        debug!(
            "Built TCFA: {} clocks, {} locations, {} edges, {} error locations",
            self.clocks.len(),
            self.locations.len(),
            self.edges.len(),
            errors.len()
        );

        Ok(Tcfa {
            clocks: self.clocks,
            locations: self.locations,
            edges: self.edges,
            initial,
            errors,
            error_pre,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_build_and_action() {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let l0 = builder.location("l0");
        let l1 = builder.urgent_location("l1");
        builder.invariant(l0, ClockConstr::leq(x, 5));
        let e = builder.edge(l0, l1, vec![ClockOp::guard(ClockConstr::geq(x, 3))]);
        builder.initial(l0).error(l1);
        let tcfa = builder.build().unwrap();

        assert_eq!(tcfa.clock_name(x), "x");
        assert!(tcfa.is_urgent(l1));
        assert!(tcfa.error_zone(l1).unwrap().is_top());
        assert!(tcfa.error_zone(l0).is_none());
        assert!(tcfa.error_pre_zone(l1).unwrap().is_top());
        assert_eq!(tcfa.initial_zone(), ZoneState::zero(1));

        let action = tcfa.action(e);
        assert_eq!(action.source(), l0);
        assert_eq!(action.target(), l1);
        assert!(!action.is_source_urgent());
        assert_eq!(action.source_invariants(), &[ClockConstr::leq(x, 5)]);
        assert!(action.target_invariants().is_empty());
        assert_eq!(action.to_string(), "e0: L0 -> L1 [[c1 >= 3]]");
    }

    #[test]
    fn test_build_errors() {
        assert_eq!(TcfaBuilder::new().build().unwrap_err(), ModelError::NoInitialLocation);

        let mut builder = TcfaBuilder::new();
        let l0 = builder.location("l0");
        builder.initial(l0);
        builder.edge(l0, Loc::new(3), Vec::new());
        assert_eq!(builder.build().unwrap_err(), ModelError::UnknownLocation(Loc::new(3)));

        let mut builder = TcfaBuilder::new();
        let l0 = builder.location("l0");
        builder.initial(l0).invariant(l0, ClockConstr::leq(Clock::new(2), 1));
        assert_eq!(builder.build().unwrap_err(), ModelError::UnknownClock(Clock::new(2)));
    }

    #[test]
    fn test_error_pre_zone() {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let lazy = builder.location("lazy");
        let eager = builder.urgent_location("eager");
        builder.invariant(lazy, ClockConstr::leq(x, 4));
        builder.initial(lazy);
        builder.error_zone(lazy, vec![ClockConstr::geq(x, 3)]);
        builder.error_zone(eager, vec![ClockConstr::geq(x, 3)]);
        let tcfa = builder.build().unwrap();

        // Waiting in `lazy` reaches x >= 3 from anywhere below the invariant
        assert_eq!(
            tcfa.error_pre_zone(lazy).unwrap(),
            &ZoneState::top(1).and(&ClockConstr::leq(x, 4))
        );
        assert_eq!(tcfa.error_pre_zone(eager), tcfa.error_zone(eager));
    }

    #[test]
    fn test_initial_zone_respects_invariant() {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let l0 = builder.location("l0");
        builder.initial(l0).invariant(l0, ClockConstr::geq(x, 1));
        let tcfa = builder.build().unwrap();
        assert!(tcfa.initial_zone().is_bottom());
    }
}
