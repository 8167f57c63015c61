//! Precisions and their per-location indexing.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::types::Loc;

/// Precision of an abstract domain.
pub trait Prec: Clone + Eq + fmt::Debug + fmt::Display {}

/// Assignment of a precision to every control location.
pub trait LocPrec<P: Prec> {
    /// Returns the precision at `loc`.
    ///
    /// # Panics
    ///
    /// Panics if there is neither an explicit entry nor a default.
    fn prec(&self, loc: Loc) -> &P;
}

/// Location precision backed by an explicit map and an optional shared default.
///
/// Values are immutable: [`refine`][GenericLocPrec::refine] returns a new
/// instance that shares the default with the old one.
#[derive(Debug, Clone)]
pub struct GenericLocPrec<P: Prec> {
    mapping: BTreeMap<Loc, P>,
    default: Option<Rc<P>>,
}

impl<P: Prec> GenericLocPrec<P> {
    /// Explicit entries only, no default.
    pub fn create(mapping: BTreeMap<Loc, P>) -> Self {
        Self { mapping, default: None }
    }

    /// Same precision everywhere.
    pub fn with_default(default: P) -> Self {
        Self {
            mapping: BTreeMap::new(),
            default: Some(Rc::new(default)),
        }
    }

    pub fn create_with_default(mapping: BTreeMap<Loc, P>, default: P) -> Self {
        Self {
            mapping,
            default: Some(Rc::new(default)),
        }
    }

    /// Non-panicking variant of [`LocPrec::prec`].
    pub fn try_prec(&self, loc: Loc) -> Option<&P> {
        self.mapping.get(&loc).or(self.default.as_deref())
    }

    pub fn default_prec(&self) -> Option<&P> {
        self.default.as_deref()
    }

    /// Returns the number of explicit entries.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Loc, &P)> {
        self.mapping.iter().map(|(&loc, prec)| (loc, prec))
    }

    /// Returns a refined precision with the given entries inserted.
    ///
    /// An entry is skipped when the location has no explicit entry and the
    /// new precision equals the default, so the mapping does not fill up with
    /// copies of the default.
    pub fn refine<I>(&self, updates: I) -> Self
    where
        I: IntoIterator<Item = (Loc, P)>,
    {
        let mut mapping = self.mapping.clone();
        for (loc, prec) in updates {
            if let Some(default) = &self.default {
                if !mapping.contains_key(&loc) && prec == **default {
                    trace!("refine: skipping default precision at {}", loc);
                    continue;
                }
            }
            mapping.insert(loc, prec);
        }
        Self {
            mapping,
            default: self.default.clone(),
        }
    }

    pub fn refine_loc(&self, loc: Loc, prec: P) -> Self {
        self.refine([(loc, prec)])
    }
}

impl<P: Prec> LocPrec<P> for GenericLocPrec<P> {
    fn prec(&self, loc: Loc) -> &P {
        match self.try_prec(loc) {
            Some(prec) => prec,
            None => panic!("Location not found: no precision for {}", loc),
        }
    }
}

impl<P: Prec> PartialEq for GenericLocPrec<P> {
    fn eq(&self, other: &Self) -> bool {
        self.mapping == other.mapping && self.default.as_deref() == other.default.as_deref()
    }
}

impl<P: Prec> Eq for GenericLocPrec<P> {}

impl<P: Prec> fmt::Display for GenericLocPrec<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericLocPrec(precs: {}", self.mapping.len())?;
        match &self.default {
            Some(default) => write!(f, ", default: {})", default),
            None => write!(f, ", default: none)"),
        }
    }
}
