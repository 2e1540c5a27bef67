//! Influence-diagram models and elimination orderings.
//!
//! [`Diagram`] is the model facade the solver consumes: typed variables,
//! typed factors, the temporal decision sequence with per-decision
//! observation sets, and the LIMID flag. [`ordering`] is the ordering
//! oracle: constrained elimination orders plus induced width.

pub mod diagram;
pub mod graph;
pub mod ordering;

pub use diagram::{Block, Diagram, DiagramBuilder, ModelError, VarKind};
pub use graph::InteractionGraph;
pub use ordering::{constrained_order, induced_width, EliminationOrder, OrderingMethod};
