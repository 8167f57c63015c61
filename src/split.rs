//! Splitting abstract states along interpolants.

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::domain::{Domain, LocDomain, ZoneDomain};
use crate::interpolate::Interpolant;
use crate::prec::LocPrec;
use crate::system::AbstractSystem;
use crate::types::StateId;

/// Refines an abstract system along an interpolant.
pub trait Splitter {
    /// Splits states of `cex` and returns the smallest counterexample index
    /// at which a state was split, or `cex.len()` if nothing was split.
    fn split(&self, system: &mut AbstractSystem, cex: &[StateId], interpolant: &Interpolant) -> usize;
}

/// Splits each counterexample state by the atoms of its interpolant formula.
#[derive(Debug, Default, Copy, Clone)]
pub struct CounterexampleSplitter;

impl Splitter for CounterexampleSplitter {
    fn split(&self, system: &mut AbstractSystem, cex: &[StateId], interpolant: &Interpolant) -> usize {
        let zones = ZoneDomain;
        let domain = LocDomain::new(&zones);
        let mut split: BTreeSet<StateId> = BTreeSet::new();
        let mut first = cex.len();

        for (index, formula) in interpolant.formulas() {
            let id = cex[index];
            if split.contains(&id) {
                continue;
            }
            let Some(state) = system.state(id) else {
                trace!("split: {} at index {} is gone", id, index);
                continue;
            };
            if domain.is_bottom(state.loc_state()) {
                continue;
            }

            let loc = state.loc();
            let atoms = formula.zone().atoms();
            let (pieces, used) = state.zone().split_by(atoms.iter());
            if pieces.len() < 2 {
                trace!("split: {} is not cut by {}", id, formula);
                continue;
            }

            let refined = system.prec().prec(loc).join(used.iter().copied());
            let prec = system.prec().refine_loc(loc, refined);
            system.set_prec(prec);
            system.split_state(id, pieces);

            split.insert(id);
            first = first.min(index);
        }

        debug!("Split {} states, first at index {}", split.len(), first);
        first
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::constr::ClockConstr;
    use crate::explore::Explorer;
    use crate::interpolate::ItpFormula;
    use crate::op::ClockOp;
    use crate::prec::GenericLocPrec;
    use crate::tcfa::TcfaBuilder;
    use crate::types::{Clock, Loc};
    use crate::valuation::Valuation;
    use crate::zone::{ZonePrec, ZoneState};

    fn setup() -> (AbstractSystem, Vec<StateId>) {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let a = builder.location("a");
        let b = builder.urgent_location("b");
        let err = builder.location("err");
        builder.invariant(b, ClockConstr::leq(x, 10));
        builder.edge(a, b, vec![ClockOp::guard(ClockConstr::leq(x, 2))]);
        builder.edge(b, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
        builder.initial(a).error(err);
        let model = Rc::new(builder.build().unwrap());

        let mut system = Explorer::build(model, GenericLocPrec::with_default(ZonePrec::empty()));
        let cex = Explorer::find_counterexample(&mut system).unwrap();
        (system, cex)
    }

    #[test]
    fn test_split_partitions_state() {
        let (mut system, cex) = setup();
        let x = Clock::new(1);
        let old = system.state(cex[1]).unwrap().zone().clone();
        let itp = Interpolant::Binary {
            index: 1,
            formula: ItpFormula::Reach(ZoneState::top(1).and(&ClockConstr::leq(x, 2))),
        };

        let before = system.state_count();
        let first = CounterexampleSplitter.split(&mut system, &cex, &itp);
        assert_eq!(first, 1);
        assert_eq!(system.state_count(), before + 1);
        assert!(!system.contains(cex[1]));

        // The pieces partition the old zone
        let pieces: Vec<ZoneState> = system.states_at(Loc::new(1)).map(|s| s.zone().clone()).collect();
        assert_eq!(pieces.len(), 2);
        assert!(!pieces[0].intersects(&pieces[1]));
        for value in 0..=10 {
            let v = Valuation::from_integers(&[value]);
            let hits = pieces.iter().filter(|p| p.contains(&v)).count();
            assert_eq!(hits, usize::from(old.contains(&v)));
        }

        assert!(system.prec().prec(Loc::new(1)).contains(&ClockConstr::leq(x, 2)));
        assert!(system.prec().prec(Loc::new(0)).is_empty());
    }

    #[test]
    fn test_split_skips_uncut_states() {
        let (mut system, cex) = setup();
        let itp = Interpolant::Sequence(vec![
            ItpFormula::Reach(ZoneState::top(1)),
            ItpFormula::Reach(ZoneState::top(1)),
        ]);
        let before = system.state_count();
        let first = CounterexampleSplitter.split(&mut system, &cex, &itp);
        assert_eq!(first, cex.len());
        assert_eq!(system.state_count(), before);
    }

    #[test]
    fn test_split_reports_smallest_index() {
        let (mut system, cex) = setup();
        let x = Clock::new(1);
        let cut = ItpFormula::Avoid(ZoneState::top(1).and(&ClockConstr::gt(x, 2)));
        let itp = Interpolant::Sequence(vec![cut.clone(), cut]);
        let first = CounterexampleSplitter.split(&mut system, &cex, &itp);
        assert_eq!(first, 0);
        assert_eq!(system.states_at(Loc::new(0)).count(), 2);
        assert_eq!(system.states_at(Loc::new(1)).count(), 2);
    }
}
