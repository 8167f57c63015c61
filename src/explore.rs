//! Construction of the initial abstraction and search for abstract
//! counterexamples.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use log::{debug, info};

use crate::prec::{GenericLocPrec, LocPrec};
use crate::system::AbstractSystem;
use crate::tcfa::Tcfa;
use crate::types::StateId;
use crate::zone::ZonePrec;

pub struct Explorer;

impl Explorer {
    /// Builds the abstraction of `model` induced by `prec`.
    ///
    /// The states at a location are the non-empty cells that the atoms of the
    /// location's precision cut out of its invariant.
    pub fn build(model: Rc<Tcfa>, prec: GenericLocPrec<ZonePrec>) -> AbstractSystem {
        let mut system = AbstractSystem::new(Rc::clone(&model), prec);

        let mut by_loc = BTreeMap::new();
        for loc in model.locations() {
            let cells = system.prec().prec(loc).cells(&model.invariant_zone(loc));
            let ids: Vec<StateId> = cells.into_iter().map(|zone| system.add_state(loc, zone)).collect();
            by_loc.insert(loc, ids);
        }

        for edge in model.edges() {
            for &source in &by_loc[&edge.source()] {
                for &target in &by_loc[&edge.target()] {
                    system.connect(source, edge.id(), target);
                }
            }
        }

        info!(
            "Built abstraction: {} states, {} transitions, {} initial",
            system.state_count(),
            system.transition_count(),
            system.initial_states().count()
        );
        system
    }

    /// Searches for a path from an initial state to an error state.
    ///
    /// After a refinement that split the last counterexample at index `i > 0`,
    /// its first `i` states are untouched and the search resumes from there.
    /// A full breadth-first search follows if that finds nothing. The states
    /// of the returned path are flagged as part of the counterexample.
    pub fn find_counterexample(system: &mut AbstractSystem) -> Option<Vec<StateId>> {
        let resumed = if system.previous_split_index() > 0 {
            Self::resume(system)
        } else {
            None
        };

        let cex = match resumed {
            Some(cex) => Some(cex),
            None => {
                let initial: Vec<StateId> = system.initial_states().map(|s| s.id()).collect();
                Self::search(system, Vec::new(), initial)
            }
        };

        match &cex {
            Some(path) => {
                debug!(
                    "Abstract counterexample of length {}: {:?}",
                    path.len(),
                    path.iter().map(|s| s.get()).collect::<Vec<_>>()
                );
                for &id in path {
                    system.set_part_of_counterexample(id, true);
                }
                system.set_last_counterexample(path.clone());
            }
            None => {
                debug!("No abstract counterexample");
                system.set_last_counterexample(Vec::new());
            }
        }
        cex
    }

    fn resume(system: &AbstractSystem) -> Option<Vec<StateId>> {
        let last = system.last_counterexample();
        let index = system.previous_split_index();
        if index > last.len() {
            return None;
        }
        let prefix = &last[..index];
        let valid = prefix.iter().all(|&id| system.contains(id))
            && system.state(prefix[0]).is_some_and(|s| s.is_initial())
            && prefix.windows(2).all(|w| system.edge_between(w[0], w[1]).is_some());
        if !valid {
            return None;
        }
        debug!("Resuming search after prefix of length {}", prefix.len());
        let (head, tail) = prefix.split_at(prefix.len() - 1);
        Self::search(system, head.to_vec(), tail.to_vec())
    }

    /// Breadth-first search from `roots`, prepending `prefix` to the result.
    fn search(system: &AbstractSystem, prefix: Vec<StateId>, roots: Vec<StateId>) -> Option<Vec<StateId>> {
        let mut parent: BTreeMap<StateId, StateId> = BTreeMap::new();
        let mut visited: BTreeSet<StateId> = prefix.iter().copied().collect();
        let mut queue = VecDeque::new();
        for root in roots {
            if visited.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(id) = queue.pop_front() {
            if system.is_error_state(id) {
                let mut path = vec![id];
                let mut current = id;
                while let Some(&p) = parent.get(&current) {
                    path.push(p);
                    current = p;
                }
                path.reverse();
                let mut cex = prefix;
                cex.extend(path);
                return Some(cex);
            }
            for (_, next) in system.successors(id) {
                if visited.insert(next) {
                    parent.insert(next, id);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}
