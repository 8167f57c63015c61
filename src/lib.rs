//! # zone-cegar: Zone-based CEGAR for timed automata
//!
//! **`zone-cegar`** checks that no error location of a timed control-flow automaton is reachable.
//! It abstracts the state space of every location into a partition of zones, searches the abstraction
//! for a path to an error, and either confirms the path on the exact semantics or refines the partition
//! so that the spurious path disappears.
//!
//! ## What is a zone?
//!
//! A zone is a convex set of clock valuations described by constraints `x ~ c` and `x - y ~ c`.
//! Zones are stored as **difference-bound matrices** (DBMs) in canonical form,
//! so two zones are equal exactly when they contain the same valuations.
//!
//! ## Key Features
//!
//! - **Exact zone operations**: delay (`up`), past (`down`), reset, free, copy, shift and intersection, see [`zone`].
//! - **Forward and backward transfer** along automaton edges, honouring invariants and urgent locations, see [`transfer`].
//! - **Interpolation** of infeasible counterexamples, binary or sequence, forward or backward, see [`interpolate`].
//! - **Lazy refinement**: only states on the counterexample are split, and the next search resumes after the untouched prefix.
//! - **Cooperative cancellation** through a shared [`StopHandler`][crate::stop::StopHandler].
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use zone_cegar::cegar::{CegarChecker, CegarResult};
//! use zone_cegar::checker::ZoneTraceChecker;
//! use zone_cegar::constr::ClockConstr;
//! use zone_cegar::interpolate::ZoneInterpolater;
//! use zone_cegar::op::ClockOp;
//! use zone_cegar::prec::GenericLocPrec;
//! use zone_cegar::refine::InterpolatingRefiner;
//! use zone_cegar::stop::StopHandler;
//! use zone_cegar::tcfa::TcfaBuilder;
//! use zone_cegar::zone::ZonePrec;
//!
//! // 1. Describe the automaton
//! let mut builder = TcfaBuilder::new();
//! let x = builder.clock("x");
//! let wait = builder.location("wait");
//! let check = builder.urgent_location("check");
//! let err = builder.location("err");
//! builder.invariant(wait, ClockConstr::leq(x, 2));
//! builder.edge(wait, check, Vec::new());
//! builder.edge(check, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
//! builder.initial(wait).error(err);
//! let model = Rc::new(builder.build().unwrap());
//!
//! // 2. Assemble the loop
//! let stop = StopHandler::new();
//! let refiner = InterpolatingRefiner::new(ZoneInterpolater::default(), stop.clone());
//! let checker = CegarChecker::new(ZoneTraceChecker, refiner, stop);
//!
//! // 3. Start from the coarsest abstraction: one state per location
//! let result = checker.check(model, GenericLocPrec::with_default(ZonePrec::empty())).unwrap();
//! assert!(matches!(result, CegarResult::Safe { iterations: 2, .. }));
//! ```
//!
//! ## Core Components
//!
//! - **[`zone`]**: Zones, the scoped [`ZoneOps`][crate::zone::ZoneOps] builder and zone precisions.
//! - **[`system`]**: The abstract graph that is refined.
//! - **[`refine`]**: One refinement step; [`cegar`] runs the whole loop.
//! - **[`dot`]**: Visualizing abstract systems using Graphviz.

pub mod cegar;
pub mod checker;
pub mod constr;
pub mod dbm;
pub mod domain;
pub mod dot;
pub mod error;
pub mod explore;
pub mod interpolate;
pub mod op;
pub mod prec;
pub mod refine;
pub mod split;
pub mod stop;
pub mod system;
pub mod tcfa;
pub mod transfer;
pub mod types;
pub mod valuation;
pub mod zone;
