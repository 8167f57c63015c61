//! One refinement step of the CEGAR loop.

use log::{debug, info};

use crate::checker::ConcreteTrace;
use crate::dot::{NullVisualizer, Visualizer};
use crate::error::CegarError;
use crate::interpolate::Interpolater;
use crate::split::{CounterexampleSplitter, Splitter};
use crate::stop::StopHandler;
use crate::system::AbstractSystem;
use crate::types::StateId;

/// Result of a refinement step.
#[derive(Debug)]
pub enum RefineOutcome {
    Refined(AbstractSystem),
    Cancelled,
}

/// Refines an abstract system by interpolating an infeasible counterexample
/// and splitting its states.
pub struct InterpolatingRefiner<I, S = CounterexampleSplitter> {
    interpolater: I,
    splitter: S,
    stop: StopHandler,
    visualizer: Box<dyn Visualizer>,
}

impl<I: Interpolater> InterpolatingRefiner<I> {
    pub fn new(interpolater: I, stop: StopHandler) -> Self {
        Self::with_splitter(interpolater, CounterexampleSplitter, stop)
    }
}

impl<I: Interpolater, S: Splitter> InterpolatingRefiner<I, S> {
    pub fn with_splitter(interpolater: I, splitter: S, stop: StopHandler) -> Self {
        Self {
            interpolater,
            splitter,
            stop,
            visualizer: Box::new(NullVisualizer),
        }
    }

    pub fn with_visualizer(mut self, visualizer: Box<dyn Visualizer>) -> Self {
        self.visualizer = visualizer;
        self
    }

    /// Refines `system` so that the infeasible counterexample `cex` is
    /// excluded from its current form.
    ///
    /// `trace` is the feasible prefix returned by the trace checker. The
    /// counterexample flags of `cex` are cleared and the smallest split index
    /// is remembered so the next search can resume from the untouched prefix.
    ///
    /// # Panics
    ///
    /// Panics if `trace` does not fit `cex`, or if the splitter makes no
    /// progress.
    pub fn refine(
        &self,
        mut system: AbstractSystem,
        cex: &[StateId],
        trace: &ConcreteTrace,
    ) -> Result<RefineOutcome, CegarError> {
        assert!(
            !trace.is_empty() && trace.len() <= cex.len(),
            "Trace of length {} does not fit counterexample of length {}",
            trace.len(),
            cex.len()
        );
        debug!("Refining: failure at state {} (index {})", cex[trace.len() - 1], trace.len() - 1);

        let interpolant = self.interpolater.interpolate(&system, cex, trace)?;
        self.visualizer.visualize_interpolant(&interpolant);
        if self.stop.is_stopped() {
            return Ok(RefineOutcome::Cancelled);
        }

        let before = system.state_count();
        let first = self.splitter.split(&mut system, cex, &interpolant);
        if self.stop.is_stopped() {
            return Ok(RefineOutcome::Cancelled);
        }
        let after = system.state_count();
        assert!(before < after, "Refinement did not split any state of the counterexample");

        system.set_previous_split_index(first);
        for &id in cex {
            system.set_part_of_counterexample(id, false);
        }
        info!("Refined: {} -> {} states, first split at {}", before, after, first);
        self.visualizer.visualize_system(&system);
        Ok(RefineOutcome::Refined(system))
    }
}
