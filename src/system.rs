//! The abstract state-transition graph refined by CEGAR.
//!
//! An [`AbstractSystem`] partitions the state space of every location into
//! zones. Each abstract state is a cell of its location's invariant; a
//! transition `s --e--> t` exists iff some valuation of `s` reaches `t`
//! through edge `e`. The system exclusively owns its states, transitions and
//! location precision. Splitting replaces a state by pieces and recomputes
//! the transitions of the pieces exactly, so the graph is always the precise
//! abstraction of the model under the current partition.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use log::{debug, trace};

use crate::domain::LocState;
use crate::prec::GenericLocPrec;
use crate::tcfa::Tcfa;
use crate::transfer::ZoneForwardTransfer;
use crate::types::{EdgeId, Loc, StateId};
use crate::zone::{ZonePrec, ZoneState};

/// A node of the abstract graph.
#[derive(Debug, Clone)]
pub struct AbstractState {
    id: StateId,
    state: LocState<ZoneState>,
    initial: bool,
    part_of_counterexample: bool,
}

impl AbstractState {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn loc(&self) -> Loc {
        self.state.loc()
    }

    pub fn zone(&self) -> &ZoneState {
        self.state.state()
    }

    pub fn loc_state(&self) -> &LocState<ZoneState> {
        &self.state
    }

    /// Whether the state contains an initial valuation of the model.
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn is_part_of_counterexample(&self) -> bool {
        self.part_of_counterexample
    }
}

impl fmt::Display for AbstractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.state)?;
        if self.initial {
            write!(f, " (initial)")?;
        }
        Ok(())
    }
}

/// A labelled edge `source --edge--> target` of the abstract graph.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Transition {
    pub source: StateId,
    pub edge: EdgeId,
    pub target: StateId,
}

#[derive(Debug, Clone)]
pub struct AbstractSystem {
    model: Rc<Tcfa>,
    states: BTreeMap<StateId, AbstractState>,
    transitions: BTreeSet<Transition>,
    prec: GenericLocPrec<ZonePrec>,
    previous_split_index: usize,
    last_counterexample: Vec<StateId>,
    next_id: StateId,
}

impl AbstractSystem {
    /// Creates a system without states. See [`Explorer::build`][crate::explore::Explorer::build].
    pub(crate) fn new(model: Rc<Tcfa>, prec: GenericLocPrec<ZonePrec>) -> Self {
        Self {
            model,
            states: BTreeMap::new(),
            transitions: BTreeSet::new(),
            prec,
            previous_split_index: 0,
            last_counterexample: Vec::new(),
            next_id: StateId::new(0),
        }
    }

    pub fn model(&self) -> &Rc<Tcfa> {
        &self.model
    }

    pub fn prec(&self) -> &GenericLocPrec<ZonePrec> {
        &self.prec
    }

    pub(crate) fn set_prec(&mut self, prec: GenericLocPrec<ZonePrec>) {
        self.prec = prec;
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn state(&self, id: StateId) -> Option<&AbstractState> {
        self.states.get(&id)
    }

    /// Returns the states in creation order.
    pub fn states(&self) -> impl Iterator<Item = &AbstractState> {
        self.states.values()
    }

    pub fn states_at(&self, loc: Loc) -> impl Iterator<Item = &AbstractState> {
        self.states.values().filter(move |s| s.loc() == loc)
    }

    pub fn initial_states(&self) -> impl Iterator<Item = &AbstractState> {
        self.states.values().filter(|s| s.initial)
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn successors(&self, id: StateId) -> impl Iterator<Item = (EdgeId, StateId)> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.source == id)
            .map(|t| (t.edge, t.target))
    }

    pub fn predecessors(&self, id: StateId) -> impl Iterator<Item = (StateId, EdgeId)> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.target == id)
            .map(|t| (t.source, t.edge))
    }

    /// Returns the smallest edge labelling a transition from `source` to `target`.
    pub fn edge_between(&self, source: StateId, target: StateId) -> Option<EdgeId> {
        self.successors(source).find(|&(_, t)| t == target).map(|(e, _)| e)
    }

    /// Checks whether an error valuation is reachable from the state by
    /// waiting in its location.
    pub fn is_error_state(&self, id: StateId) -> bool {
        let Some(state) = self.state(id) else {
            return false;
        };
        match self.model.error_pre_zone(state.loc()) {
            Some(error) => state.zone().intersects(error),
            None => false,
        }
    }

    pub fn previous_split_index(&self) -> usize {
        self.previous_split_index
    }

    pub fn set_previous_split_index(&mut self, index: usize) {
        self.previous_split_index = index;
    }

    pub fn last_counterexample(&self) -> &[StateId] {
        &self.last_counterexample
    }

    pub(crate) fn set_last_counterexample(&mut self, cex: Vec<StateId>) {
        self.last_counterexample = cex;
    }

    pub fn set_part_of_counterexample(&mut self, id: StateId, flag: bool) {
        if let Some(state) = self.states.get_mut(&id) {
            state.part_of_counterexample = flag;
        }
    }

    pub(crate) fn add_state(&mut self, loc: Loc, zone: ZoneState) -> StateId {
        let id = self.next_id;
        self.next_id = id.next();
        let initial = loc == self.model.initial_loc() && zone.intersects(&self.model.initial_zone());
        let state = AbstractState {
            id,
            state: LocState::single(loc, zone),
            initial,
            part_of_counterexample: false,
        };
        trace!("add_state: {}", state);
        self.states.insert(id, state);
        id
    }

    /// Adds `source --edge--> target` if some valuation of `source` reaches `target`.
    pub(crate) fn connect(&mut self, source: StateId, edge: EdgeId, target: StateId) -> bool {
        let action = self.model.action(edge);
        let reachable = {
            let src = &self.states[&source];
            let tgt = &self.states[&target];
            debug_assert_eq!(src.loc(), action.source());
            debug_assert_eq!(tgt.loc(), action.target());
            ZoneForwardTransfer.post(src.zone(), &action).intersects(tgt.zone())
        };
        if reachable {
            self.transitions.insert(Transition { source, edge, target });
        }
        reachable
    }

    /// Replaces a state by the given pieces of its zone.
    ///
    /// The pieces must partition the zone of the state. Transitions of the
    /// pieces are recomputed against the old neighbours, including
    /// self-loops. Returns the IDs of the new states.
    ///
    /// # Panics
    ///
    /// Panics if the state does not exist.
    pub fn split_state(&mut self, id: StateId, pieces: Vec<ZoneState>) -> Vec<StateId> {
        let old = match self.states.remove(&id) {
            Some(state) => state,
            None => panic!("Cannot split unknown state {}", id),
        };
        let loc = old.loc();

        let (touching, kept): (BTreeSet<Transition>, BTreeSet<Transition>) = std::mem::take(&mut self.transitions)
            .into_iter()
            .partition(|t| t.source == id || t.target == id);
        self.transitions = kept;

        let new_ids: Vec<StateId> = pieces.into_iter().map(|zone| self.add_state(loc, zone)).collect();

        for t in &touching {
            match (t.source == id, t.target == id) {
                (true, true) => {
                    for &a in &new_ids {
                        for &b in &new_ids {
                            self.connect(a, t.edge, b);
                        }
                    }
                }
                (true, false) => {
                    for &a in &new_ids {
                        self.connect(a, t.edge, t.target);
                    }
                }
                (false, true) => {
                    for &b in &new_ids {
                        self.connect(t.source, t.edge, b);
                    }
                }
                (false, false) => unreachable!(),
            }
        }

        debug!(
            "Split {} at {} into {} states: {:?}",
            id,
            loc,
            new_ids.len(),
            new_ids.iter().map(|s| s.get()).collect::<Vec<_>>()
        );
        new_ids
    }
}
