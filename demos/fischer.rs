//! Fischer's mutual exclusion protocol for two processes.
//!
//! Each process moves through `idle -> req -> wait -> cs`. Entering `req`
//! resets its clock, `req` must be left within `k` time units (writing its id
//! to the shared variable), and `cs` may only be entered from `wait` after
//! more than `k` time units if the shared variable still holds its id. The
//! shared variable is folded into the locations of the product automaton.
//!
//! With `--buggy` the wait guard becomes `x >= k`, which breaks mutual
//! exclusion.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example fischer -- --k 2
//! cargo run --example fischer -- --buggy --interpolant sequence --direction backward
//! cargo run --example fischer -- --dot fischer.dot
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use log::info;

use zone_cegar::cegar::{CegarChecker, CegarResult};
use zone_cegar::checker::ZoneTraceChecker;
use zone_cegar::constr::ClockConstr;
use zone_cegar::dot::DotVisualizer;
use zone_cegar::interpolate::{Direction, InterpolantKind, ZoneInterpolater};
use zone_cegar::op::ClockOp;
use zone_cegar::prec::GenericLocPrec;
use zone_cegar::refine::InterpolatingRefiner;
use zone_cegar::stop::StopHandler;
use zone_cegar::tcfa::{Tcfa, TcfaBuilder};
use zone_cegar::types::{Clock, Loc};
use zone_cegar::zone::ZonePrec;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Kind {
    Binary,
    Sequence,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Dir {
    Forward,
    Backward,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Deadline of the request phase.
    #[arg(long, value_name = "INT", default_value = "2")]
    k: i64,

    /// Use the non-strict wait guard.
    #[arg(long)]
    buggy: bool,

    /// Interpolant shape.
    #[arg(long, value_enum, default_value = "binary")]
    interpolant: Kind,

    /// Interpolation direction.
    #[arg(long, value_enum, default_value = "forward")]
    direction: Dir,

    /// Give up after this many iterations.
    #[arg(long, value_name = "INT", default_value = "1000")]
    max_iterations: usize,

    /// Write the last refined abstraction to this file.
    #[arg(long, value_name = "FILE")]
    dot: Option<String>,
}

const IDLE: usize = 0;
const REQ: usize = 1;
const WAIT: usize = 2;
const CS: usize = 3;
const PHASES: [&str; 4] = ["idle", "req", "wait", "cs"];

/// Product location: phases of both processes and the shared variable.
type Key = ([usize; 2], usize);

fn fischer(k: i64, buggy: bool) -> color_eyre::Result<Tcfa> {
    let mut builder = TcfaBuilder::new();
    let clocks: [Clock; 2] = [builder.clock("x1"), builder.clock("x2")];

    let mut locs: BTreeMap<Key, Loc> = BTreeMap::new();
    for p1 in 0..4 {
        for p2 in 0..4 {
            for id in 0..3 {
                let name = format!("{}.{}.id={}", PHASES[p1], PHASES[p2], id);
                let loc = builder.location(name);
                for (i, phase) in [p1, p2].into_iter().enumerate() {
                    if phase == REQ {
                        builder.invariant(loc, ClockConstr::leq(clocks[i], k));
                    }
                }
                if p1 == CS && p2 == CS {
                    builder.error(loc);
                }
                locs.insert(([p1, p2], id), loc);
            }
        }
    }

    for (&(phases, id), &source) in &locs {
        for i in 0..2 {
            let me = i + 1;
            let x = clocks[i];
            let mut step = |phase: usize, id: usize, ops: Vec<ClockOp>| {
                let mut next = phases;
                next[i] = phase;
                builder.edge(source, locs[&(next, id)], ops);
            };
            match phases[i] {
                IDLE if id == 0 => step(REQ, id, vec![ClockOp::reset(x, 0)]),
                REQ => step(WAIT, me, vec![ClockOp::reset(x, 0)]),
                WAIT if id == me => {
                    let guard = if buggy {
                        ClockConstr::geq(x, k)
                    } else {
                        ClockConstr::gt(x, k)
                    };
                    step(CS, id, vec![ClockOp::guard(guard)]);
                }
                WAIT => step(IDLE, id, Vec::new()),
                CS => step(IDLE, 0, Vec::new()),
                _ => {}
            }
        }
    }

    builder.initial(locs[&([IDLE, IDLE], 0)]);
    Ok(builder.build()?)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let model = Rc::new(fischer(args.k, args.buggy)?);
    info!(
        "Fischer model: {} locations, {} edges, {} clocks",
        model.location_count(),
        model.edges().len(),
        model.clock_count()
    );

    let kind = match args.interpolant {
        Kind::Binary => InterpolantKind::Binary,
        Kind::Sequence => InterpolantKind::Sequence,
    };
    let direction = match args.direction {
        Dir::Forward => Direction::Forward,
        Dir::Backward => Direction::Backward,
    };

    let visualizer = Rc::new(DotVisualizer::default());
    let stop = StopHandler::new();
    let refiner = InterpolatingRefiner::new(ZoneInterpolater::new(kind, direction), stop.clone())
        .with_visualizer(Box::new(Rc::clone(&visualizer)));
    let checker = CegarChecker::new(ZoneTraceChecker, refiner, stop).with_max_iterations(args.max_iterations);

    let result = checker.check(Rc::clone(&model), GenericLocPrec::with_default(ZonePrec::empty()))?;
    match &result {
        CegarResult::Unsafe { trace, iterations } => {
            println!("UNSAFE after {} iterations, counterexample:", iterations);
            for step in trace.steps() {
                println!("  {:<20} {}", model.location(step.loc).name(), step.valuation);
            }
        }
        _ => println!("{}", result),
    }

    if let Some(path) = &args.dot {
        match visualizer.graphs().last() {
            Some(dot) => {
                std::fs::write(path, dot)?;
                println!("Wrote last abstraction to {}", path);
            }
            None => println!("No refinement happened, nothing written"),
        }
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
