//! Solver capability model.
//!
//! Exact-inference solvers differ in which query families they can answer:
//! a decision-oriented solver computes expected utilities and policies, a
//! summation-oriented one computes marginals or a partition function. Rather
//! than every solver inheriting one broad interface and stubbing the queries
//! it cannot serve, each solver advertises a [`CapabilitySet`] that callers
//! probe before asking. A query outside the advertised set fails with
//! [`crate::Error::UnsupportedQuery`], which distinguishes "this solver will
//! never answer that" from "the solver has not run yet".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Query families a solver may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Scalar maximum expected utility of a decision model.
    MaxExpectedUtility,
    /// Per-decision policy factors over informational parents.
    DecisionPolicy,
    /// Per-variable marginal beliefs.
    Marginals,
    /// Partition function / probability of evidence.
    PartitionFunction,
    /// Upper/lower bounds on the optimum.
    Bounds,
    /// Single best joint configuration (MPE/MAP style).
    BestConfiguration,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::MaxExpectedUtility => write!(f, "max_expected_utility"),
            QueryKind::DecisionPolicy => write!(f, "decision_policy"),
            QueryKind::Marginals => write!(f, "marginals"),
            QueryKind::PartitionFunction => write!(f, "partition_function"),
            QueryKind::Bounds => write!(f, "bounds"),
            QueryKind::BestConfiguration => write!(f, "best_configuration"),
        }
    }
}

/// The set of query kinds a solver advertises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    kinds: BTreeSet<QueryKind>,
}

impl CapabilitySet {
    /// Empty capability set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Capability set containing exactly the given kinds.
    pub fn of(kinds: impl IntoIterator<Item = QueryKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Whether the solver advertises this query kind.
    pub fn supports(&self, kind: QueryKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Iterate advertised kinds in stable order.
    pub fn iter(&self) -> impl Iterator<Item = QueryKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Number of advertised kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kinds are advertised.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probing_reports_membership() {
        let caps = CapabilitySet::of([QueryKind::MaxExpectedUtility, QueryKind::DecisionPolicy]);
        assert!(caps.supports(QueryKind::MaxExpectedUtility));
        assert!(caps.supports(QueryKind::DecisionPolicy));
        assert!(!caps.supports(QueryKind::Marginals));
        assert!(!caps.supports(QueryKind::Bounds));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn empty_set_supports_nothing() {
        let caps = CapabilitySet::none();
        assert!(caps.is_empty());
        assert!(!caps.supports(QueryKind::MaxExpectedUtility));
    }

    #[test]
    fn duplicate_kinds_collapse() {
        let caps = CapabilitySet::of([
            QueryKind::Marginals,
            QueryKind::Marginals,
            QueryKind::Marginals,
        ]);
        assert_eq!(caps.len(), 1);
    }

    #[test]
    fn serde_round_trip() {
        let caps = CapabilitySet::of([QueryKind::MaxExpectedUtility, QueryKind::BestConfiguration]);
        let json = serde_json::to_string(&caps).unwrap();
        assert!(json.contains("max_expected_utility"));
        assert!(json.contains("best_configuration"));
        let back: CapabilitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }
}
