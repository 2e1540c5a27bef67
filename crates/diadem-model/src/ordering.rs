//! The ordering oracle: constrained elimination orders and induced width.
//!
//! Bucket elimination on a standard ID needs a total order consistent with
//! the model's temporal partial order: the hidden chance block is
//! eliminated first, then the last decision, then the chance variables
//! observed just before it, and so on. Decisions are fixed points; inside
//! each chance block a greedy heuristic picks the next variable, with ties
//! broken toward the lowest id so orders are deterministic.

use crate::diagram::{Block, Diagram};
use crate::graph::InteractionGraph;
use diadem_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Heuristic used inside chance blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMethod {
    /// Fewest fill-in edges at elimination time.
    #[default]
    MinFill,
    /// Smallest remaining degree.
    MinDegree,
    /// Ascending variable id; useful for reproducing orders by hand.
    Lexicographic,
}

impl std::fmt::Display for OrderingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingMethod::MinFill => write!(f, "min_fill"),
            OrderingMethod::MinDegree => write!(f, "min_degree"),
            OrderingMethod::Lexicographic => write!(f, "lexicographic"),
        }
    }
}

/// A total elimination order with O(1) position lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EliminationOrder {
    order: Vec<usize>,
    pos: Vec<usize>,
}

impl EliminationOrder {
    fn new(order: Vec<usize>, n_vars: usize) -> Self {
        debug_assert_eq!(order.len(), n_vars);
        let mut pos = vec![0usize; n_vars];
        for (p, &v) in order.iter().enumerate() {
            pos[v] = p;
        }
        Self { order, pos }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of a variable within the order (0 = eliminated first).
    pub fn position(&self, var: usize) -> usize {
        self.pos[var]
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }
}

/// Compute a total elimination order consistent with the model's temporal
/// partial order.
///
/// Fails with [`Error::UnsupportedModel`] for LIMIDs: their elimination
/// order is unconstrained and this oracle has no blocks to respect.
pub fn constrained_order(dg: &Diagram, method: OrderingMethod) -> Result<EliminationOrder> {
    if dg.is_limid() {
        return Err(Error::UnsupportedModel(
            "constrained ordering requires a standard ID, not a LIMID".into(),
        ));
    }

    let mut graph = InteractionGraph::from_diagram(dg);
    let mut order = Vec::with_capacity(dg.n_vars());
    for block in dg.elimination_blocks() {
        match block {
            Block::Decision(d) => {
                graph.eliminate(d);
                order.push(d);
            }
            Block::Chance(vars) => {
                let mut remaining: BTreeSet<usize> = vars.into_iter().collect();
                while let Some(next) = pick(&graph, &remaining, method) {
                    graph.eliminate(next);
                    remaining.remove(&next);
                    order.push(next);
                }
            }
        }
    }

    if order.len() != dg.n_vars() {
        return Err(Error::InvalidOrder(format!(
            "elimination blocks cover {} of {} variables",
            order.len(),
            dg.n_vars()
        )));
    }
    Ok(EliminationOrder::new(order, dg.n_vars()))
}

/// Induced width of an order: the largest remaining-neighbor count seen
/// when each variable is eliminated from the moralized graph.
pub fn induced_width(dg: &Diagram, order: &EliminationOrder) -> usize {
    let mut graph = InteractionGraph::from_diagram(dg);
    let mut width = 0;
    for v in order.iter() {
        width = width.max(graph.eliminate(v));
    }
    width
}

/// Greedy pick inside a chance block; ties go to the lowest id.
fn pick(
    graph: &InteractionGraph,
    candidates: &BTreeSet<usize>,
    method: OrderingMethod,
) -> Option<usize> {
    let score = |v: usize| -> usize {
        match method {
            OrderingMethod::MinFill => graph.fill_count(v),
            OrderingMethod::MinDegree => graph.degree(v),
            OrderingMethod::Lexicographic => v,
        }
    };
    // BTreeSet iterates ascending, so min_by_key keeps the lowest id on ties.
    candidates.iter().copied().min_by_key(|&v| score(v))
}
