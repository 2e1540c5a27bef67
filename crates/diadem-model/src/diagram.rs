//! The influence-diagram model facade.
//!
//! A [`Diagram`] combines chance variables (with probability tables) and
//! decision variables (choices under the decision maker's control) with
//! utility tables, under a temporal partial order: decisions form a
//! sequence, and each decision carries the set of chance variables observed
//! before it. Observation sets must grow along the sequence (no forgetting).
//!
//! Models are built through [`DiagramBuilder`] and validated once at
//! `build()`; a built diagram is immutable. The `limid` flag marks relaxed
//! models (unconstrained order, fixed per-decision parent sets) that the
//! bucket-elimination solver must reject.

use diadem_factor::{Factor, FactorError, FactorKind, Scope, Var};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Tolerance for the decision-invariance check on probability tables.
const INVARIANCE_TOL: f64 = 1e-9;

/// Variable type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Chance,
    Decision,
}

impl std::fmt::Display for VarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarKind::Chance => write!(f, "chance"),
            VarKind::Decision => write!(f, "decision"),
        }
    }
}

/// Errors raised during model construction and validation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("variable x{id} has an empty domain")]
    EmptyDomain { id: usize },

    #[error("unknown variable x{id} in factor {factor}")]
    UnknownVariable { factor: usize, id: usize },

    #[error("x{id} observed by x{decision} is not a chance variable")]
    ObservedNotChance { decision: usize, id: usize },

    #[error("unknown variable x{id} observed by x{decision}")]
    UnknownObservedVariable { decision: usize, id: usize },

    #[error("x{id} is not a decision variable")]
    NotADecision { id: usize },

    #[error("observation sets shrink at decision x{decision}; standard IDs require no forgetting")]
    NonMonotoneObservations { decision: usize },

    #[error("probability factor {factor} varies with decision x{decision}")]
    DecisionDependentProbability { factor: usize, decision: usize },

    #[error("probability factor {factor} has negative value at index {index}")]
    NegativeProbability { factor: usize, index: usize },

    #[error(transparent)]
    Factor(#[from] FactorError),
}

/// One elimination block, in elimination (reverse temporal) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Chance variables freely orderable within the block.
    Chance(Vec<usize>),
    /// A single decision variable, a fixed point of the order.
    Decision(usize),
}

#[derive(Debug, Clone, Copy)]
struct VarInfo {
    var: Var,
    kind: VarKind,
}

/// An immutable influence-diagram model.
#[derive(Debug, Clone)]
pub struct Diagram {
    vars: Vec<VarInfo>,
    factors: Vec<Factor>,
    decisions: Vec<usize>,
    observed: Vec<BTreeSet<usize>>,
    limid: bool,
}

impl Diagram {
    pub fn builder() -> DiagramBuilder {
        DiagramBuilder::default()
    }

    /// Number of variables; ids are dense in `0..n_vars()`.
    pub fn n_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn var(&self, id: usize) -> Var {
        self.vars[id].var
    }

    pub fn kind(&self, id: usize) -> VarKind {
        self.vars[id].kind
    }

    /// Initial factor list, each tagged Probability or Utility.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Whether this model is a LIMID (unconstrained elimination order).
    pub fn is_limid(&self) -> bool {
        self.limid
    }

    /// Decision variables in temporal order.
    pub fn decisions(&self) -> &[usize] {
        &self.decisions
    }

    /// Chance variables observed before the `k`-th decision.
    pub fn observed_before(&self, k: usize) -> &BTreeSet<usize> {
        &self.observed[k]
    }

    /// Chance variables never observed by any decision.
    pub fn hidden_chance(&self) -> BTreeSet<usize> {
        let seen: BTreeSet<usize> = self.observed.last().cloned().unwrap_or_default();
        (0..self.n_vars())
            .filter(|&id| self.kind(id) == VarKind::Chance && !seen.contains(&id))
            .collect()
    }

    /// Elimination blocks in reverse temporal order: the hidden chance
    /// block, then the last decision, then the chance block observed just
    /// before it, and so on back to the earliest observations.
    pub fn elimination_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(2 * self.decisions.len() + 1);
        blocks.push(Block::Chance(self.hidden_chance().into_iter().collect()));
        for k in (0..self.decisions.len()).rev() {
            blocks.push(Block::Decision(self.decisions[k]));
            let fresh: Vec<usize> = if k == 0 {
                self.observed[k].iter().copied().collect()
            } else {
                self.observed[k]
                    .difference(&self.observed[k - 1])
                    .copied()
                    .collect()
            };
            blocks.push(Block::Chance(fresh));
        }
        blocks.retain(|b| !matches!(b, Block::Chance(vs) if vs.is_empty()));
        blocks
    }
}

#[derive(Debug, Clone)]
struct RawFactor {
    ids: Vec<usize>,
    kind: FactorKind,
    values: Vec<f64>,
}

/// Incremental builder for [`Diagram`].
///
/// Declaration calls are infallible; all validation happens in
/// [`DiagramBuilder::build`].
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    states: Vec<usize>,
    kinds: Vec<VarKind>,
    raw: Vec<RawFactor>,
    decisions: Vec<usize>,
    observations: Vec<(usize, Vec<usize>)>,
    limid: bool,
}

impl DiagramBuilder {
    /// Declare a chance variable; returns its id.
    pub fn chance(&mut self, states: usize) -> usize {
        self.declare(states, VarKind::Chance)
    }

    /// Declare a decision variable; the temporal sequence follows call
    /// order. Returns its id.
    pub fn decision(&mut self, states: usize) -> usize {
        let id = self.declare(states, VarKind::Decision);
        self.decisions.push(id);
        id
    }

    fn declare(&mut self, states: usize, kind: VarKind) -> usize {
        let id = self.states.len();
        self.states.push(states);
        self.kinds.push(kind);
        id
    }

    /// Declare chance variables observed before a decision.
    pub fn observes(
        &mut self,
        decision: usize,
        vars: impl IntoIterator<Item = usize>,
    ) -> &mut Self {
        self.observations.push((decision, vars.into_iter().collect()));
        self
    }

    /// Attach a probability table over the given variables.
    pub fn probability(
        &mut self,
        ids: impl IntoIterator<Item = usize>,
        values: Vec<f64>,
    ) -> &mut Self {
        self.raw.push(RawFactor {
            ids: ids.into_iter().collect(),
            kind: FactorKind::Probability,
            values,
        });
        self
    }

    /// Attach a utility table over the given variables.
    pub fn utility(&mut self, ids: impl IntoIterator<Item = usize>, values: Vec<f64>) -> &mut Self {
        self.raw.push(RawFactor {
            ids: ids.into_iter().collect(),
            kind: FactorKind::Utility,
            values,
        });
        self
    }

    /// Mark the model as a LIMID (relaxed, unconstrained order).
    pub fn limid(&mut self, limid: bool) -> &mut Self {
        self.limid = limid;
        self
    }

    /// Validate and freeze the model.
    pub fn build(&self) -> Result<Diagram, ModelError> {
        for (id, &states) in self.states.iter().enumerate() {
            if states == 0 {
                return Err(ModelError::EmptyDomain { id });
            }
        }
        let vars: Vec<VarInfo> = self
            .states
            .iter()
            .zip(&self.kinds)
            .enumerate()
            .map(|(id, (&states, &kind))| VarInfo {
                var: Var::new(id, states),
                kind,
            })
            .collect();

        // Observation sets: targets are decisions, members are chance vars.
        let mut observed = vec![BTreeSet::new(); self.decisions.len()];
        for (decision, members) in &self.observations {
            let Some(k) = self.decisions.iter().position(|d| d == decision) else {
                return Err(ModelError::NotADecision { id: *decision });
            };
            for &id in members {
                if id >= vars.len() {
                    return Err(ModelError::UnknownObservedVariable {
                        decision: *decision,
                        id,
                    });
                }
                if vars[id].kind != VarKind::Chance {
                    return Err(ModelError::ObservedNotChance {
                        decision: *decision,
                        id,
                    });
                }
                observed[k].insert(id);
            }
        }
        for k in 1..observed.len() {
            if !observed[k - 1].is_subset(&observed[k]) {
                return Err(ModelError::NonMonotoneObservations {
                    decision: self.decisions[k],
                });
            }
        }

        // Factors: known scope variables, valid tables, non-negative
        // probabilities, decision-invariant probabilities.
        let mut factors = Vec::with_capacity(self.raw.len());
        for (fi, raw) in self.raw.iter().enumerate() {
            let mut scope_vars = Vec::with_capacity(raw.ids.len());
            for &id in &raw.ids {
                if id >= vars.len() {
                    return Err(ModelError::UnknownVariable { factor: fi, id });
                }
                scope_vars.push(vars[id].var);
            }
            let scope = Scope::new(scope_vars)?;
            let factor = Factor::new(scope, raw.kind, raw.values.clone())?;

            if raw.kind == FactorKind::Probability {
                if let Some(index) = factor.values().iter().position(|&v| v < 0.0) {
                    return Err(ModelError::NegativeProbability { factor: fi, index });
                }
                for &id in &raw.ids {
                    if vars[id].kind == VarKind::Decision
                        && !is_invariant_in(&factor, vars[id].var)
                    {
                        return Err(ModelError::DecisionDependentProbability {
                            factor: fi,
                            decision: id,
                        });
                    }
                }
            }
            factors.push(factor);
        }

        Ok(Diagram {
            vars,
            factors,
            decisions: self.decisions.clone(),
            observed,
            limid: self.limid,
        })
    }
}

/// Whether the table is constant across the values of `var`.
fn is_invariant_in(factor: &Factor, var: Var) -> bool {
    let base = factor.slice(var.id(), 0);
    (1..var.states()).all(|k| {
        let other = factor.slice(var.id(), k);
        base.values()
            .iter()
            .zip(other.values())
            .all(|(a, b)| (a - b).abs() <= INVARIANCE_TOL)
    })
}
