//! The zone abstract domain.
//!
//! A [`ZoneState`] is an immutable, canonical DBM. All modifications go
//! through the scoped builder [`ZoneOps`], obtained from
//! [`ZoneState::transform`]: the builder accumulates operations, closes the
//! matrix lazily when an operator needs canonical input, and hands out a
//! canonical zone again in [`ZoneOps::done`]. A non-canonical intermediate
//! matrix is therefore never observable.
//!
//! # Example
//!
//! ```
//! use zone_cegar::constr::ClockConstr;
//! use zone_cegar::types::Clock;
//! use zone_cegar::zone::ZoneState;
//!
//! let x = Clock::new(1);
//! let mut ops = ZoneState::zero(1).transform();
//! ops.up().and(&ClockConstr::leq(x, 5));
//! let zone = ops.done();
//!
//! assert!(zone.is_leq(&ZoneState::top(1)));
//! assert_eq!(zone, ZoneState::top(1).and(&ClockConstr::leq(x, 5)));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use log::trace;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::constr::{check_constant, ClockConstr, CmpOp};
use crate::dbm::{Bound, Dbm};
use crate::op::ClockOp;
use crate::prec::Prec;
use crate::types::Clock;
use crate::valuation::Valuation;

/// A canonical zone.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ZoneState {
    dbm: Dbm,
}

impl ZoneState {
    /// All clocks non-negative, nothing else.
    pub fn top(clocks: usize) -> Self {
        Self { dbm: Dbm::top(clocks) }
    }

    /// The single valuation where all clocks are zero.
    pub fn zero(clocks: usize) -> Self {
        Self { dbm: Dbm::zero(clocks) }
    }

    pub fn bottom(clocks: usize) -> Self {
        Self {
            dbm: Dbm::bottom(clocks),
        }
    }

    /// Returns the number of clocks, excluding the reference clock.
    pub fn clock_count(&self) -> usize {
        self.dbm.clocks()
    }

    pub fn dbm(&self) -> &Dbm {
        &self.dbm
    }

    pub fn is_bottom(&self) -> bool {
        self.dbm.is_empty()
    }

    pub fn is_top(&self) -> bool {
        self.dbm == Dbm::top(self.clock_count())
    }

    /// Entailment: every valuation of `self` is a valuation of `other`.
    pub fn is_leq(&self, other: &ZoneState) -> bool {
        self.dbm.is_subset_of(&other.dbm)
    }

    /// Starts a scoped transformation of this zone.
    pub fn transform(&self) -> ZoneOps {
        ZoneOps {
            dbm: self.dbm.clone(),
            dirty: false,
        }
    }

    pub fn and(&self, constr: &ClockConstr) -> ZoneState {
        let mut ops = self.transform();
        ops.and(constr);
        ops.done()
    }

    pub fn intersect(&self, other: &ZoneState) -> ZoneState {
        let mut ops = self.transform();
        ops.intersect(other);
        ops.done()
    }

    pub fn intersects(&self, other: &ZoneState) -> bool {
        !self.intersect(other).is_bottom()
    }

    /// Returns a conjunction of atoms equivalent to the zone.
    ///
    /// Trivial bounds (`x >= 0`, infinite cells) are left out, as are
    /// difference bounds implied by the two unit bounds of their clocks.
    pub fn atoms(&self) -> Vec<ClockConstr> {
        if self.is_bottom() {
            return vec![ClockConstr::False];
        }
        let n = self.dbm.dim();
        let mut atoms = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let bound = self.dbm.get(i, j);
                let Bound::Finite { value, strict } = bound else {
                    continue;
                };
                if i == 0 && bound == Bound::LE_ZERO {
                    continue;
                }
                if i != 0 && j != 0 && self.dbm.get(i, 0) + self.dbm.get(0, j) <= bound {
                    continue;
                }
                atoms.push(cell_constr(i, j, value, strict));
            }
        }
        atoms
    }

    /// Returns the clocks the zone says anything about.
    pub fn constrained_clocks(&self) -> BTreeSet<Clock> {
        self.atoms().iter().flat_map(|atom| atom.clocks()).collect()
    }

    /// Splits the zone by the given atoms.
    ///
    /// Every atom that cuts some piece into two non-empty parts is applied to
    /// all pieces. Returns the non-empty pieces, which partition the zone, and
    /// the atoms that actually cut.
    pub fn split_by<'a, I>(&self, atoms: I) -> (Vec<ZoneState>, Vec<ClockConstr>)
    where
        I: IntoIterator<Item = &'a ClockConstr>,
    {
        if self.is_bottom() {
            return (Vec::new(), Vec::new());
        }
        let mut pieces = vec![self.clone()];
        let mut used = Vec::new();
        for atom in atoms {
            if !atom.is_atom() {
                continue;
            }
            let negated = atom.negate()[0];
            let mut next = Vec::with_capacity(pieces.len() * 2);
            let mut cut = false;
            for piece in &pieces {
                let inside = piece.and(atom);
                let outside = piece.and(&negated);
                match (inside.is_bottom(), outside.is_bottom()) {
                    (false, false) => {
                        cut = true;
                        next.push(inside);
                        next.push(outside);
                    }
                    (false, true) => next.push(inside),
                    (true, false) => next.push(outside),
                    (true, true) => unreachable!("non-empty piece {} vanished under {}", piece, atom),
                }
            }
            if cut {
                trace!("split_by: {} cuts into {} pieces", atom, next.len());
                used.push(*atom);
            }
            pieces = next;
        }
        (pieces, used)
    }

    /// Checks whether the valuation lies in the zone.
    pub fn contains(&self, valuation: &Valuation) -> bool {
        assert_eq!(
            valuation.clock_count(),
            self.clock_count(),
            "Valuation over {} clocks checked against zone over {} clocks",
            valuation.clock_count(),
            self.clock_count()
        );
        if self.is_bottom() {
            return false;
        }
        let n = self.dbm.dim();
        for i in 0..n {
            for j in 0..n {
                if let Bound::Finite { value, strict } = self.dbm.get(i, j) {
                    let diff = valuation.at(i) - valuation.at(j);
                    let bound = rat(value);
                    let ok = if strict { diff < bound } else { diff <= bound };
                    if !ok {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Picks some valuation of the zone, or `None` if it is empty.
    ///
    /// Clocks are assigned in order; on a canonical matrix every value that
    /// respects the already assigned clocks extends to a full valuation.
    pub fn sample(&self) -> Option<Valuation> {
        if self.is_bottom() {
            return None;
        }
        let n = self.dbm.dim();
        let mut values = vec![BigRational::zero(); n];
        for k in 1..n {
            let mut lower = (BigRational::zero(), false);
            let mut upper: Option<(BigRational, bool)> = None;
            for j in 0..k {
                if let Bound::Finite { value, strict } = self.dbm.get(j, k) {
                    let lo = &values[j] - rat(value);
                    if lo > lower.0 || (lo == lower.0 && strict && !lower.1) {
                        lower = (lo, strict);
                    }
                }
                if let Bound::Finite { value, strict } = self.dbm.get(k, j) {
                    let up = &values[j] + rat(value);
                    let tighter = match &upper {
                        None => true,
                        Some((u, s)) => up < *u || (up == *u && strict && !*s),
                    };
                    if tighter {
                        upper = Some((up, strict));
                    }
                }
            }
            values[k] = match (lower, upper) {
                ((lo, false), _) => lo,
                ((lo, true), None) => lo + BigRational::one(),
                ((lo, true), Some((up, _))) => (lo + up) / rat(2),
            };
        }
        values.remove(0);
        Some(Valuation::from_values(values))
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "false");
        }
        let atoms = self.atoms();
        if atoms.is_empty() {
            return write!(f, "true");
        }
        write!(f, "{{")?;
        for (i, atom) in atoms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", atom)?;
        }
        write!(f, "}}")
    }
}

fn rat(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

/// Constraint of a DBM cell. Derived bounds may exceed
/// [`MAX_CONSTANT`][crate::constr::MAX_CONSTANT], so the variant is built
/// directly.
fn cell_constr(i: usize, j: usize, value: i64, strict: bool) -> ClockConstr {
    let upper = if strict { CmpOp::Lt } else { CmpOp::Leq };
    let (left, right, op, bound) = if j == 0 {
        (Clock::new(i as u32), None, upper, value)
    } else if i == 0 {
        let lower = if strict { CmpOp::Gt } else { CmpOp::Geq };
        (Clock::new(j as u32), None, lower, -value)
    } else {
        (Clock::new(i as u32), Some(Clock::new(j as u32)), upper, value)
    };
    ClockConstr::Cmp { left, right, op, bound }
}

/// Scoped builder over a zone.
///
/// Operations are applied in call order. `and` may leave the matrix
/// non-canonical; every operator that needs canonical input closes it first.
#[derive(Debug, Clone)]
pub struct ZoneOps {
    dbm: Dbm,
    dirty: bool,
}

impl ZoneOps {
    fn check_clock(&self, clock: Clock) {
        assert!(
            clock.index() <= self.dbm.clocks(),
            "Clock {} out of range for a zone over {} clocks",
            clock,
            self.dbm.clocks()
        );
    }

    fn canonize(&mut self) {
        if self.dirty {
            self.dbm.close();
            self.dirty = false;
        }
    }

    fn constrain(&mut self, i: usize, j: usize, bound: Bound) {
        if self.dbm.constrain(i, j, bound) {
            self.dirty = true;
        } else {
            self.dirty = false;
        }
    }

    pub fn and(&mut self, constr: &ClockConstr) -> &mut Self {
        match *constr {
            ClockConstr::True => {}
            ClockConstr::False => {
                self.dbm = Dbm::bottom(self.dbm.clocks());
                self.dirty = false;
            }
            ClockConstr::Cmp { left, right, op, bound } => {
                self.check_clock(left);
                if let Some(right) = right {
                    self.check_clock(right);
                }
                let i = left.index();
                let j = right.map_or(0, Clock::index);
                match op {
                    CmpOp::Lt => self.constrain(i, j, Bound::lt(bound)),
                    CmpOp::Leq => self.constrain(i, j, Bound::leq(bound)),
                    CmpOp::Eq => {
                        self.constrain(i, j, Bound::leq(bound));
                        self.constrain(j, i, Bound::leq(-bound));
                    }
                    CmpOp::Geq => self.constrain(j, i, Bound::leq(-bound)),
                    CmpOp::Gt => self.constrain(j, i, Bound::lt(-bound)),
                }
            }
        }
        self
    }

    pub fn intersect(&mut self, other: &ZoneState) -> &mut Self {
        assert_eq!(self.dbm.dim(), other.dbm.dim(), "Zone dimension mismatch");
        if other.is_bottom() {
            self.dbm = Dbm::bottom(self.dbm.clocks());
            self.dirty = false;
            return self;
        }
        let n = self.dbm.dim();
        for i in 0..n {
            for j in 0..n {
                let bound = other.dbm.get(i, j);
                if i != j && !bound.is_infinity() {
                    self.constrain(i, j, bound);
                }
            }
        }
        self
    }

    /// Delay successors.
    pub fn up(&mut self) -> &mut Self {
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.up();
        }
        self
    }

    /// Delay predecessors.
    pub fn down(&mut self) -> &mut Self {
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.down();
        }
        self
    }

    pub fn free(&mut self, clock: Clock) -> &mut Self {
        self.check_clock(clock);
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.free(clock.index());
        }
        self
    }

    pub fn reset(&mut self, clock: Clock, value: i64) -> &mut Self {
        self.check_clock(clock);
        check_constant(value, &ClockOp::Reset { clock, value });
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.reset(clock.index(), value);
        }
        self
    }

    pub fn copy(&mut self, clock: Clock, value: Clock) -> &mut Self {
        self.check_clock(clock);
        self.check_clock(value);
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.copy(clock.index(), value.index());
        }
        self
    }

    pub fn shift(&mut self, clock: Clock, offset: i64) -> &mut Self {
        self.check_clock(clock);
        check_constant(offset, &ClockOp::Shift { clock, offset });
        self.canonize();
        if !self.dbm.is_empty() {
            self.dbm.shift(clock.index(), offset);
            self.dirty = !self.dbm.is_empty();
        }
        self
    }

    /// Executes a clock operation with its forward semantics.
    pub fn execute(&mut self, op: &ClockOp) -> &mut Self {
        match *op {
            ClockOp::Reset { clock, value } => self.reset(clock, value),
            ClockOp::Guard(ref constr) => self.and(constr),
            ClockOp::Copy { clock, value } => self.copy(clock, value),
            ClockOp::Shift { clock, offset } => self.shift(clock, offset),
            ClockOp::Free(clock) => self.free(clock),
        }
    }

    /// Finishes the transformation, returning a canonical zone.
    pub fn done(mut self) -> ZoneState {
        self.canonize();
        ZoneState { dbm: self.dbm }
    }
}

/// Precision of the zone domain: the atoms tracked at a location.
///
/// The abstract states of a location are the non-empty cells these atoms cut
/// out of the location invariant.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct ZonePrec {
    atoms: BTreeSet<ClockConstr>,
}

impl ZonePrec {
    pub fn new<I>(atoms: I) -> Self
    where
        I: IntoIterator<Item = ClockConstr>,
    {
        let atoms: BTreeSet<ClockConstr> = atoms.into_iter().collect();
        for atom in &atoms {
            assert!(atom.is_atom(), "ZonePrec can only track atoms, got {}", atom);
        }
        Self { atoms }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &ClockConstr> {
        self.atoms.iter()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn contains(&self, atom: &ClockConstr) -> bool {
        self.atoms.contains(atom)
    }

    /// Returns a precision tracking the atoms of both.
    pub fn join<I>(&self, atoms: I) -> ZonePrec
    where
        I: IntoIterator<Item = ClockConstr>,
    {
        let mut joined = self.atoms.clone();
        joined.extend(atoms.into_iter().filter(ClockConstr::is_atom));
        ZonePrec { atoms: joined }
    }

    /// Partitions `base` into the non-empty cells induced by the atoms.
    pub fn cells(&self, base: &ZoneState) -> Vec<ZoneState> {
        base.split_by(self.atoms.iter()).0
    }
}

impl Prec for ZonePrec {}

impl fmt::Display for ZonePrec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZonePrec{{")?;
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", atom)?;
        }
        write!(f, "}}")
    }
}
