//! End-to-end tests for the CEGAR loop.
//!
//! Tests cover the zone transfer scenario, verdicts on safe and unsafe models,
//! all interpolation strategies, cancellation and solver failures.

use std::rc::Rc;

use test_log::test;

use zone_cegar::cegar::{CegarChecker, CegarResult};
use zone_cegar::checker::{TraceChecker, TraceVerdict, ZoneTraceChecker};
use zone_cegar::constr::{ClockConstr, CmpOp};
use zone_cegar::dot::DotVisualizer;
use zone_cegar::error::{CegarError, SolverError};
use zone_cegar::interpolate::{Direction, InterpolantKind, ZoneInterpolater};
use zone_cegar::op::ClockOp;
use zone_cegar::prec::GenericLocPrec;
use zone_cegar::refine::InterpolatingRefiner;
use zone_cegar::stop::StopHandler;
use zone_cegar::system::AbstractSystem;
use zone_cegar::tcfa::{Tcfa, TcfaBuilder};
use zone_cegar::transfer::{ZoneBackwardTransfer, ZoneForwardTransfer};
use zone_cegar::types::{Clock, Loc, StateId};
use zone_cegar::zone::{ZonePrec, ZoneState};

fn empty_prec() -> GenericLocPrec<ZonePrec> {
    GenericLocPrec::with_default(ZonePrec::empty())
}

fn checker(interpolater: ZoneInterpolater, stop: StopHandler) -> CegarChecker<ZoneTraceChecker, ZoneInterpolater> {
    let refiner = InterpolatingRefiner::new(interpolater, stop.clone());
    CegarChecker::new(ZoneTraceChecker, refiner, stop)
}

/// `l0 (x <= 5) --[x >= 3]; y := 0--> l1`, error `y >= 3` in `l1`
fn reset_model(l0_urgent: bool, l1_urgent: bool) -> Rc<Tcfa> {
    let mut builder = TcfaBuilder::new();
    let x = builder.clock("x");
    let y = builder.clock("y");
    let l0 = if l0_urgent {
        builder.urgent_location("l0")
    } else {
        builder.location("l0")
    };
    let l1 = if l1_urgent {
        builder.urgent_location("l1")
    } else {
        builder.location("l1")
    };
    builder.invariant(l0, ClockConstr::leq(x, 5));
    builder.edge(
        l0,
        l1,
        vec![ClockOp::guard(ClockConstr::geq(x, 3)), ClockOp::reset(y, 0)],
    );
    builder.initial(l0);
    builder.error_zone(l1, vec![ClockConstr::geq(y, 3)]);
    Rc::new(builder.build().unwrap())
}

/// `a (x <= 2) --> b (urgent) --[x > 2]--> err`, `a --[x >= 1]--> c --> err`
fn two_paths_model() -> Rc<Tcfa> {
    let mut builder = TcfaBuilder::new();
    let x = builder.clock("x");
    let a = builder.location("a");
    let b = builder.urgent_location("b");
    let c = builder.location("c");
    let err = builder.location("err");
    builder.invariant(a, ClockConstr::leq(x, 2));
    builder.edge(a, b, Vec::new());
    builder.edge(b, err, vec![ClockOp::guard(ClockConstr::gt(x, 2))]);
    builder.edge(a, c, vec![ClockOp::guard(ClockConstr::geq(x, 1))]);
    builder.edge(c, err, Vec::new());
    builder.initial(a).error(err);
    Rc::new(builder.build().unwrap())
}

// ─── Transfer Scenario ─────────────────────────────────────────────────────────

#[test]
fn scenario_forward_then_backward() {
    let x = Clock::new(1);
    let y = Clock::new(2);

    let mut pres = Vec::new();
    for urgent in [true, false] {
        let model = reset_model(urgent, false);
        let action = model.action(model.edges()[0].id());

        let post = ZoneForwardTransfer.post(&model.initial_zone(), &action);
        if urgent {
            // No time may pass in l0, so the guard never holds
            assert!(post.is_bottom());
        } else {
            let expected = ZoneState::top(2)
                .and(&ClockConstr::eq(y, 0))
                .and(&ClockConstr::geq(x, 3))
                .and(&ClockConstr::leq(x, 5));
            assert_eq!(post, expected);
        }

        let target = ZoneState::top(2)
            .and(&ClockConstr::eq(y, 0))
            .and(&ClockConstr::geq(x, 3))
            .and(&ClockConstr::leq(x, 5));
        pres.push(ZoneBackwardTransfer.pre(&target, &action));
    }

    let urgent_pre = ZoneState::top(2).and(&ClockConstr::geq(x, 3)).and(&ClockConstr::leq(x, 5));
    let lazy_pre = ZoneState::top(2)
        .and(&ClockConstr::leq(x, 5))
        .and(&ClockConstr::diff(x, y, CmpOp::Leq, 5));
    assert_eq!(pres[0], urgent_pre);
    assert_eq!(pres[1], lazy_pre);
    assert!(pres[0].is_leq(&pres[1]));
}

// ─── Verdicts ──────────────────────────────────────────────────────────────────

#[test]
fn waiting_reaches_error() {
    let result = checker(ZoneInterpolater::default(), StopHandler::new())
        .check(reset_model(false, false), empty_prec())
        .unwrap();
    match result {
        CegarResult::Unsafe { trace, iterations } => {
            assert_eq!(iterations, 1);
            assert_eq!(trace.len(), 2);
            let last = &trace.steps()[1];
            assert!(ClockConstr::geq(Clock::new(2), 3).holds(&last.valuation));
        }
        other => panic!("expected unsafe, got {}", other),
    }
}

#[test]
fn urgent_target_is_safe_for_every_strategy() {
    for kind in [InterpolantKind::Binary, InterpolantKind::Sequence] {
        for direction in [Direction::Forward, Direction::Backward] {
            let interpolater = ZoneInterpolater::new(kind, direction);
            let result = checker(interpolater, StopHandler::new())
                .check(reset_model(false, true), empty_prec())
                .unwrap();
            match result {
                CegarResult::Safe { iterations, .. } => assert_eq!(iterations, 2, "{:?} {:?}", kind, direction),
                other => panic!("{:?} {:?}: expected safe, got {}", kind, direction, other),
            }
        }
    }
}

#[test]
fn spurious_path_refined_before_real_one() {
    let result = checker(ZoneInterpolater::default(), StopHandler::new())
        .check(two_paths_model(), empty_prec())
        .unwrap();
    match result {
        CegarResult::Unsafe { trace, iterations } => {
            assert_eq!(iterations, 2);
            let locs: Vec<Loc> = trace.steps().iter().map(|s| s.loc).collect();
            // a, c, err
            assert_eq!(locs, vec![Loc::new(0), Loc::new(2), Loc::new(3)]);
            assert!(ClockConstr::geq(Clock::new(1), 1).holds(&trace.steps()[1].valuation));
        }
        other => panic!("expected unsafe, got {}", other),
    }
}

#[test]
fn initial_precision_avoids_refinement() {
    // Cutting l1 at y <= 0 up front leaves no spurious path
    let model = reset_model(false, true);
    let prec = empty_prec().refine_loc(
        Loc::new(1),
        ZonePrec::new([ClockConstr::leq(Clock::new(2), 0), ClockConstr::geq(Clock::new(1), 3)]),
    );
    let result = checker(ZoneInterpolater::default(), StopHandler::new())
        .check(model, prec)
        .unwrap();
    assert!(matches!(result, CegarResult::Safe { iterations: 1, .. }));
}

#[test]
fn visualizer_sees_every_refinement() {
    let visualizer = Rc::new(DotVisualizer::default());
    let stop = StopHandler::new();
    let refiner = InterpolatingRefiner::new(ZoneInterpolater::default(), stop.clone())
        .with_visualizer(Box::new(Rc::clone(&visualizer)));
    let result = CegarChecker::new(ZoneTraceChecker, refiner, stop)
        .check(two_paths_model(), empty_prec())
        .unwrap();
    assert!(matches!(result, CegarResult::Unsafe { iterations: 2, .. }));
    assert_eq!(visualizer.graphs().len(), 1);
    assert_eq!(visualizer.interpolants().len(), 1);
    assert!(visualizer.graphs()[0].starts_with("digraph {"));
}

// ─── Cancellation and Failures ─────────────────────────────────────────────────

#[test]
fn cancelled_run() {
    let stop = StopHandler::new();
    stop.stop();
    let result = checker(ZoneInterpolater::default(), stop.clone())
        .check(two_paths_model(), empty_prec())
        .unwrap();
    assert_eq!(result, CegarResult::Cancelled);

    // The same handle can be reused after a reset
    stop.reset();
    let result = checker(ZoneInterpolater::default(), stop)
        .check(two_paths_model(), empty_prec())
        .unwrap();
    assert!(matches!(result, CegarResult::Unsafe { .. }));
}

struct TimeoutChecker;

impl TraceChecker for TimeoutChecker {
    fn check(&self, _system: &AbstractSystem, _cex: &[StateId]) -> Result<TraceVerdict, SolverError> {
        Err(SolverError::Timeout)
    }
}

#[test]
fn solver_timeout_propagates() {
    let stop = StopHandler::new();
    let refiner = InterpolatingRefiner::new(ZoneInterpolater::default(), stop.clone());
    let result = CegarChecker::new(TimeoutChecker, refiner, stop).check(two_paths_model(), empty_prec());
    assert_eq!(result, Err(CegarError::Solver(SolverError::Timeout)));
}

#[test]
fn iteration_limit() {
    let result = checker(ZoneInterpolater::default(), StopHandler::new())
        .with_max_iterations(1)
        .check(two_paths_model(), empty_prec());
    assert_eq!(result, Err(CegarError::IterationLimit(1)));
}
