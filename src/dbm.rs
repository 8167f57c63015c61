//! Difference-bound matrices.
//!
//! A DBM over `n` clocks is an `(n+1) x (n+1)` matrix `D` where row/column 0
//! is the reference clock and `D[i][j]` is an upper bound on `x_i - x_j`.
//! See "Timed Automata: Semantics, Algorithms and Tools" by Bengtsson and Yi
//! for the algorithms used here.
//!
//! This module is the raw matrix layer. The operators `up`, `down`, `free`,
//! `reset` and `copy` expect a canonical matrix and keep it canonical;
//! `constrain` and `shift` may break canonicity and must be followed by
//! [`Dbm::close`]. The [`zone`][crate::zone] module wraps all of this in a
//! builder that tracks canonicity.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Upper bound of a DBM cell: `(value, strict)` or infinity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Bound {
    Finite { value: i64, strict: bool },
    Infinity,
}

impl Bound {
    /// `(0, <=)`, the diagonal of every non-empty DBM.
    pub const LE_ZERO: Bound = Bound::Finite {
        value: 0,
        strict: false,
    };

    pub const fn leq(value: i64) -> Self {
        Bound::Finite { value, strict: false }
    }

    pub const fn lt(value: i64) -> Self {
        Bound::Finite { value, strict: true }
    }

    pub fn is_infinity(self) -> bool {
        self == Bound::Infinity
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Bound::Infinity, Bound::Infinity) => Ordering::Equal,
            (Bound::Infinity, _) => Ordering::Greater,
            (_, Bound::Infinity) => Ordering::Less,
            (Bound::Finite { value: a, strict: sa }, Bound::Finite { value: b, strict: sb }) => {
                // (c, <) is tighter than (c, <=)
                a.cmp(&b).then_with(|| sb.cmp(&sa))
            }
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Bound {
    type Output = Bound;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Bound::Infinity, _) | (_, Bound::Infinity) => Bound::Infinity,
            (Bound::Finite { value: a, strict: sa }, Bound::Finite { value: b, strict: sb }) => match a.checked_add(b) {
                Some(value) => Bound::Finite {
                    value,
                    strict: sa || sb,
                },
                None => panic!("Bound overflow: {} + {}", self, rhs),
            },
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Infinity => write!(f, "<inf"),
            Bound::Finite { value, strict: true } => write!(f, "<{}", value),
            Bound::Finite { value, strict: false } => write!(f, "<={}", value),
        }
    }
}

/// A difference-bound matrix stored row-major in a flat vector.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Dbm {
    dim: usize,
    cells: Vec<Bound>,
}

impl Dbm {
    /// All clocks non-negative and otherwise unconstrained.
    pub fn top(clocks: usize) -> Self {
        let dim = clocks + 1;
        let mut dbm = Self {
            dim,
            cells: vec![Bound::Infinity; dim * dim],
        };
        for i in 0..dim {
            dbm.set(i, i, Bound::LE_ZERO);
            dbm.set(0, i, Bound::LE_ZERO);
        }
        dbm
    }

    /// All clocks equal to zero.
    pub fn zero(clocks: usize) -> Self {
        let dim = clocks + 1;
        Self {
            dim,
            cells: vec![Bound::LE_ZERO; dim * dim],
        }
    }

    /// The canonical empty matrix.
    pub fn bottom(clocks: usize) -> Self {
        let dim = clocks + 1;
        Self {
            dim,
            cells: vec![Bound::lt(0); dim * dim],
        }
    }

    /// Returns the dimension (number of clocks + 1).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the number of clocks, excluding the reference clock.
    pub fn clocks(&self) -> usize {
        self.dim - 1
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Bound {
        self.cells[i * self.dim + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, bound: Bound) {
        let index = i * self.dim + j;
        self.cells[index] = bound;
    }

    /// Checks for the canonical empty representation.
    pub fn is_empty(&self) -> bool {
        self.get(0, 0) < Bound::LE_ZERO
    }

    fn make_empty(&mut self) {
        self.cells.fill(Bound::lt(0));
    }

    /// Tightens `D[i][j]` to `bound` if it is tighter.
    ///
    /// Returns `false` if the new bound closes a negative cycle with
    /// `D[j][i]`; the matrix is then made empty. Otherwise the matrix may no
    /// longer be canonical.
    pub fn constrain(&mut self, i: usize, j: usize, bound: Bound) -> bool {
        if self.is_empty() {
            return false;
        }
        if bound + self.get(j, i) < Bound::LE_ZERO {
            self.make_empty();
            return false;
        }
        if bound < self.get(i, j) {
            self.set(i, j, bound);
        }
        true
    }

    /// Floyd-Warshall shortest-path closure.
    ///
    /// Returns `false` (and makes the matrix empty) if a negative cycle exists.
    pub fn close(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        let n = self.dim;
        for k in 0..n {
            for i in 0..n {
                let ik = self.get(i, k);
                if ik.is_infinity() {
                    continue;
                }
                for j in 0..n {
                    let ikj = ik + self.get(k, j);
                    if ikj < self.get(i, j) {
                        self.set(i, j, ikj);
                    }
                }
            }
        }
        for i in 0..n {
            if self.get(i, i) < Bound::LE_ZERO {
                self.make_empty();
                return false;
            }
        }
        true
    }

    /// Removes all upper bounds on clocks (delay successors).
    pub fn up(&mut self) {
        for i in 1..self.dim {
            self.set(i, 0, Bound::Infinity);
        }
    }

    /// Weakest precondition of delay: valuations from which some delay
    /// reaches the matrix.
    pub fn down(&mut self) {
        for i in 1..self.dim {
            self.set(0, i, Bound::LE_ZERO);
            for j in 1..self.dim {
                if self.get(j, i) < self.get(0, i) {
                    self.set(0, i, self.get(j, i));
                }
            }
        }
    }

    /// Forgets everything about clock `x` except `x >= 0`.
    pub fn free(&mut self, x: usize) {
        for i in 0..self.dim {
            if i != x {
                self.set(x, i, Bound::Infinity);
                self.set(i, x, self.get(i, 0));
            }
        }
    }

    /// Assigns `x := value`.
    pub fn reset(&mut self, x: usize, value: i64) {
        for i in 0..self.dim {
            if i != x {
                self.set(x, i, Bound::leq(value) + self.get(0, i));
                self.set(i, x, self.get(i, 0) + Bound::leq(-value));
            }
        }
    }

    /// Assigns `x := y`.
    pub fn copy(&mut self, x: usize, y: usize) {
        if x == y {
            return;
        }
        for i in 0..self.dim {
            if i != x {
                self.set(x, i, self.get(y, i));
                self.set(i, x, self.get(i, y));
            }
        }
        self.set(x, y, Bound::LE_ZERO);
        self.set(y, x, Bound::LE_ZERO);
    }

    /// Assigns `x := x + offset`. Clears canonicity: `x >= 0` is re-imposed
    /// and the matrix must be closed again.
    pub fn shift(&mut self, x: usize, offset: i64) {
        for i in 0..self.dim {
            if i != x {
                self.set(x, i, self.get(x, i) + Bound::leq(offset));
                self.set(i, x, self.get(i, x) + Bound::leq(-offset));
            }
        }
        self.constrain(0, x, Bound::LE_ZERO);
    }

    /// Cell-wise inclusion on canonical matrices.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        assert_eq!(self.dim, other.dim, "DBM dimension mismatch");
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        self.cells.iter().zip(other.cells.iter()).all(|(a, b)| a <= b)
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>5}", self.get(i, j).to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_bound_order() {
        assert!(Bound::lt(3) < Bound::leq(3));
        assert!(Bound::leq(3) < Bound::lt(4));
        assert!(Bound::leq(100) < Bound::Infinity);
        assert_eq!(Bound::Infinity, Bound::Infinity);
    }

    #[test]
    fn test_bound_add() {
        assert_eq!(Bound::leq(3) + Bound::leq(-1), Bound::leq(2));
        assert_eq!(Bound::leq(3) + Bound::lt(-1), Bound::lt(2));
        assert_eq!(Bound::lt(3) + Bound::Infinity, Bound::Infinity);
    }

    #[test]
    #[should_panic(expected = "Bound overflow")]
    fn test_bound_add_overflow() {
        let _ = Bound::leq(i64::MAX) + Bound::lt(1);
    }

    #[test]
    fn test_top_is_closed() {
        let mut dbm = Dbm::top(2);
        let before = dbm.clone();
        assert!(dbm.close());
        assert_eq!(dbm, before);
    }

    #[test]
    fn test_constrain_detects_cycle() {
        let mut dbm = Dbm::top(1);
        // x <= 2
        assert!(dbm.constrain(1, 0, Bound::leq(2)));
        // x > 2
        assert!(!dbm.constrain(0, 1, Bound::lt(-2)));
        assert!(dbm.is_empty());
        assert_eq!(dbm, Dbm::bottom(1));
    }

    #[test]
    fn test_close_derives_bounds() {
        let mut dbm = Dbm::top(2);
        // x <= 3, y - x <= 1
        dbm.constrain(1, 0, Bound::leq(3));
        dbm.constrain(2, 1, Bound::leq(1));
        assert!(dbm.close());
        assert_eq!(dbm.get(2, 0), Bound::leq(4));
    }

    #[test]
    fn test_close_negative_cycle() {
        let mut dbm = Dbm::top(2);
        // x - y < 0, y - x <= 0
        dbm.constrain(1, 2, Bound::lt(0));
        dbm.constrain(2, 1, Bound::LE_ZERO);
        assert!(!dbm.close());
        assert!(dbm.is_empty());
    }

    #[test]
    fn test_up_down() {
        let mut dbm = Dbm::zero(1);
        dbm.up();
        assert_eq!(dbm.get(1, 0), Bound::Infinity);
        assert_eq!(dbm.get(0, 1), Bound::LE_ZERO);

        let mut dbm = Dbm::top(1);
        // x >= 2, x <= 5
        dbm.constrain(0, 1, Bound::leq(-2));
        dbm.constrain(1, 0, Bound::leq(5));
        dbm.close();
        dbm.down();
        assert_eq!(dbm.get(0, 1), Bound::LE_ZERO);
        assert_eq!(dbm.get(1, 0), Bound::leq(5));
    }

    #[test]
    fn test_reset_and_free() {
        let mut dbm = Dbm::top(2);
        dbm.constrain(1, 0, Bound::leq(5));
        dbm.close();
        dbm.reset(2, 0);
        assert_eq!(dbm.get(2, 0), Bound::LE_ZERO);
        assert_eq!(dbm.get(1, 2), Bound::leq(5));
        dbm.free(2);
        assert_eq!(dbm.get(2, 0), Bound::Infinity);
        assert_eq!(dbm.get(0, 2), Bound::LE_ZERO);
        assert_eq!(dbm.get(1, 2), Bound::leq(5));
    }

    #[test]
    fn test_subset() {
        let mut small = Dbm::top(1);
        small.constrain(1, 0, Bound::leq(2));
        small.close();
        let big = Dbm::top(1);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
        assert!(Dbm::bottom(1).is_subset_of(&small));
        assert!(!small.is_subset_of(&Dbm::bottom(1)));
    }
}
