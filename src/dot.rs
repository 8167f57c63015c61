//! Abstract system to DOT (Graphviz) conversion, and visualizers.
//!
//! The generated DOT output follows these conventions:
//! - **States** are grouped by location into clusters, labelled with their
//!   id and zone
//! - **Initial states** have a bold border
//! - **States on the current counterexample** are filled
//! - **Error states** (an error valuation is reachable by waiting) are drawn
//!   with a double border
//! - **Transitions** are labelled with the edge they follow
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use zone_cegar::explore::Explorer;
//! use zone_cegar::prec::GenericLocPrec;
//! use zone_cegar::tcfa::TcfaBuilder;
//! use zone_cegar::zone::ZonePrec;
//!
//! let mut builder = TcfaBuilder::new();
//! let a = builder.location("a");
//! builder.initial(a);
//! let model = Rc::new(builder.build().unwrap());
//!
//! let system = Explorer::build(model, GenericLocPrec::with_default(ZonePrec::empty()));
//! let dot = system.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use log::warn;

use crate::interpolate::Interpolant;
use crate::system::AbstractSystem;

/// Configuration options for DOT output generation.
///
/// # Examples
///
/// ```
/// use zone_cegar::dot::DotConfig;
///
/// let config = DotConfig {
///     show_zones: false,
///     ..DotConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for abstract states (default: "box")
    pub state_shape: &'static str,
    /// Fill color for states on the current counterexample (default: "lightcoral")
    pub counterexample_color: &'static str,
    /// Style for transitions (default: "solid")
    pub edge_style: &'static str,
    /// Whether to print zones inside the states (default: true)
    pub show_zones: bool,
    /// Whether to group states by location (default: true)
    pub cluster_locations: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "box",
            counterexample_color: "lightcoral",
            edge_style: "solid",
            show_zones: true,
            cluster_locations: true,
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl AbstractSystem {
    /// Converts the abstract system to DOT (Graphviz) format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the abstract system to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        let model = self.model();
        for loc in model.locations() {
            if config.cluster_locations {
                writeln!(dot, "subgraph cluster_{} {{", loc.index())?;
                writeln!(dot, "label=\"{}\";", escape(model.location(loc).name()))?;
            }
            for state in self.states_at(loc) {
                let mut label = state.id().to_string();
                if config.show_zones {
                    write!(label, "\\n{}", escape(&state.zone().to_string()))?;
                }
                let mut attrs = vec![format!("label=\"{}\"", label)];
                if state.is_initial() {
                    attrs.push("penwidth=2".to_string());
                }
                if state.is_part_of_counterexample() {
                    attrs.push(format!("style=filled, fillcolor={}", config.counterexample_color));
                }
                if self.is_error_state(state.id()) {
                    attrs.push("peripheries=2".to_string());
                }
                writeln!(dot, "{} [{}];", state.id().get(), attrs.join(", "))?;
            }
            if config.cluster_locations {
                writeln!(dot, "}}")?;
            }
        }

        for t in self.transitions() {
            writeln!(
                dot,
                "{} -> {} [label=\"{}\", style={}];",
                t.source.get(),
                t.target.get(),
                t.edge,
                config.edge_style
            )?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

/// Observer of the refinement loop. Never affects control flow.
pub trait Visualizer {
    fn visualize_system(&self, system: &AbstractSystem);
    fn visualize_interpolant(&self, interpolant: &Interpolant);
}

impl<V: Visualizer + ?Sized> Visualizer for Rc<V> {
    fn visualize_system(&self, system: &AbstractSystem) {
        (**self).visualize_system(system)
    }

    fn visualize_interpolant(&self, interpolant: &Interpolant) {
        (**self).visualize_interpolant(interpolant)
    }
}

/// Visualizer that does nothing.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullVisualizer;

impl Visualizer for NullVisualizer {
    fn visualize_system(&self, _system: &AbstractSystem) {}
    fn visualize_interpolant(&self, _interpolant: &Interpolant) {}
}

/// Collects a DOT rendering of every system it is shown.
///
/// Interpolants are kept as text alongside the graphs.
#[derive(Debug, Default)]
pub struct DotVisualizer {
    config: DotConfig,
    graphs: RefCell<Vec<String>>,
    interpolants: RefCell<Vec<String>>,
}

impl DotVisualizer {
    pub fn new(config: DotConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn graphs(&self) -> Vec<String> {
        self.graphs.borrow().clone()
    }

    pub fn interpolants(&self) -> Vec<String> {
        self.interpolants.borrow().clone()
    }
}

impl Visualizer for DotVisualizer {
    fn visualize_system(&self, system: &AbstractSystem) {
        match system.to_dot_with_config(&self.config) {
            Ok(dot) => self.graphs.borrow_mut().push(dot),
            Err(e) => warn!("Could not render abstract system: {}", e),
        }
    }

    fn visualize_interpolant(&self, interpolant: &Interpolant) {
        self.interpolants.borrow_mut().push(interpolant.to_string());
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constr::ClockConstr;
    use crate::explore::Explorer;
    use crate::interpolate::ItpFormula;
    use crate::op::ClockOp;
    use crate::prec::GenericLocPrec;
    use crate::tcfa::TcfaBuilder;
    use crate::zone::{ZonePrec, ZoneState};

    fn system() -> AbstractSystem {
        let mut builder = TcfaBuilder::new();
        let x = builder.clock("x");
        let a = builder.location("a");
        let b = builder.location("\"b\"");
        builder.invariant(a, ClockConstr::leq(x, 3));
        builder.edge(a, b, vec![ClockOp::reset(x, 0)]);
        builder.initial(a).error(b);
        let model = Rc::new(builder.build().unwrap());
        let mut system = Explorer::build(model, GenericLocPrec::with_default(ZonePrec::empty()));
        Explorer::find_counterexample(&mut system);
        system
    }

    /// Basic test: verify DOT output is generated without errors
    #[test]
    fn test_to_dot_basic() {
        let dot = system().to_dot().unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("0 -> 1 [label=\"e0\""));
        assert!(dot.contains("c1 <= 3"));
        assert!(dot.contains("fillcolor=lightcoral"));
        assert!(dot.contains("label=\"\\\"b\\\"\""));
    }

    /// Test with custom configuration
    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            show_zones: false,
            cluster_locations: false,
            ..DotConfig::default()
        };
        let dot = system().to_dot_with_config(&config).unwrap();
        assert!(!dot.contains("c1 <= 3"));
        assert!(!dot.contains("subgraph"));
    }

    #[test]
    fn test_dot_visualizer_collects() {
        let visualizer = DotVisualizer::default();
        visualizer.visualize_system(&system());
        visualizer.visualize_interpolant(&Interpolant::Binary {
            index: 0,
            formula: ItpFormula::Reach(ZoneState::top(1)),
        });
        assert_eq!(visualizer.graphs().len(), 1);
        assert_eq!(visualizer.interpolants(), vec!["[0: true]".to_string()]);
    }

    /// Helper test to write DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let dot = system().to_dot().unwrap();

        std::fs::write("test_output.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);

        for format in ["png", "svg"] {
            let output = std::process::Command::new("dot")
                .arg(format!("-T{}", format))
                .arg("test_output.dot")
                .arg("-o")
                .arg(format!("test_output.{}", format))
                .output();

            if let Ok(output) = output {
                if output.status.success() {
                    println!("Generated test_output.{}", format);
                }
            }
        }
    }
}
