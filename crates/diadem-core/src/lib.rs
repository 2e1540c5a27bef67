//! diadem core: bucket elimination for influence diagrams.
//!
//! This crate drives the whole algorithm over the model and algebra crates:
//! - [`bucket`]: append-only factor arena and per-variable buckets
//! - [`engine`]: the forward elimination pass, root aggregation, and the
//!   capability-probed query surface
//! - [`policy`]: policy factors recovered by the backward pass
//! - [`config`]: the validated solver configuration
//! - [`trace`]: structured trace events for external observers
//!
//! # Example
//!
//! ```
//! use diadem_core::{BucketElimination, SolverConfig};
//! use diadem_model::Diagram;
//!
//! let mut b = Diagram::builder();
//! let x = b.chance(2);
//! let d = b.decision(2);
//! b.observes(d, [x]);
//! b.probability([x], vec![0.6, 0.4]);
//! b.utility([x, d], vec![10.0, 0.0, 0.0, 5.0]);
//! let diagram = b.build().unwrap();
//!
//! let mut solver = BucketElimination::new(diagram, SolverConfig::default()).unwrap();
//! let solution = solver.solve().unwrap();
//! assert!((solution.meu - 8.0).abs() < 1e-9);
//! ```

pub mod bucket;
pub mod config;
pub mod engine;
pub mod policy;
pub mod trace;

pub use bucket::{BucketStore, FactorArena, FactorHandle, Placement};
pub use config::SolverConfig;
pub use engine::{eliminate, BucketElimination, ElimOp, QueryAnswer, Solution, SolveStats};
pub use policy::{Policy, PolicyFactor};
pub use trace::{
    event_names, FanoutSink, JsonlSink, MemorySink, NullSink, Phase, TraceEvent, TraceSink,
};

// Re-export the shared taxonomy so downstream users need one import.
pub use diadem_common::{CapabilitySet, Error, ErrorCategory, QueryKind, Result};
