//! Decision policies recovered by the backward pass.
//!
//! Each decision variable maps to a policy factor: the combined
//! probability-utility valuation over the decision and its informational
//! parents, exactly as the decision's bucket held it. The solver stores the
//! raw factor; recovering the optimal action is an explicit arg-max step
//! the consumer performs through [`PolicyFactor::best_response`].

use diadem_common::{Error, Result};
use diadem_factor::{Factor, Var};
use serde::Serialize;
use std::collections::BTreeMap;

/// The combined valuation for one decision variable.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyFactor {
    decision: Var,
    factor: Factor,
}

impl PolicyFactor {
    pub fn new(decision: Var, factor: Factor) -> Self {
        Self { decision, factor }
    }

    pub fn decision(&self) -> Var {
        self.decision
    }

    /// The raw combined factor over the decision and its parents.
    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    /// Informational parents: the factor's scope minus the decision itself.
    pub fn parents(&self) -> Vec<Var> {
        self.factor
            .scope()
            .iter()
            .filter(|v| v.id() != self.decision.id())
            .collect()
    }

    /// Arg-max over the decision given a full assignment of its parents
    /// (variable id to domain value). Ties resolve to the lowest action
    /// index; a decision the valuation does not constrain also yields 0.
    pub fn best_response(&self, assignment: &BTreeMap<usize, usize>) -> Result<usize> {
        let mut f = self.factor.clone();
        for v in self.parents() {
            let Some(&value) = assignment.get(&v.id()) else {
                return Err(Error::Precondition(format!(
                    "missing assignment for parent {v}"
                )));
            };
            if value >= v.states() {
                return Err(Error::Precondition(format!(
                    "value {value} out of range for {v}"
                )));
            }
            f = f.slice(v.id(), value);
        }
        if !f.scope().contains(self.decision.id()) {
            return Ok(0);
        }
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (action, &value) in f.values().iter().enumerate() {
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        Ok(best)
    }
}

/// Policies for every decision variable, keyed by variable id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Policy {
    entries: BTreeMap<usize, PolicyFactor>,
}

impl Policy {
    pub(crate) fn insert(&mut self, decision: usize, factor: PolicyFactor) {
        self.entries.insert(decision, factor);
    }

    pub fn get(&self, decision: usize) -> Option<&PolicyFactor> {
        self.entries.get(&decision)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate (decision id, policy factor) in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PolicyFactor)> {
        self.entries.iter().map(|(&d, f)| (d, f))
    }

    /// Total bytes held by the policy tables.
    pub fn table_bytes(&self) -> usize {
        self.entries.values().map(|p| p.factor.table_bytes()).sum()
    }
}
