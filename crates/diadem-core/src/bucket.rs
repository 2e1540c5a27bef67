//! Factor arena and per-variable buckets.
//!
//! The arena is an append-only sequence of factors addressed by stable
//! integer handles; handles are never reused or invalidated, and the arena
//! only grows during the forward pass. The bucket store maps each variable
//! to the set of handles currently resident in its bucket, plus the Root
//! Set of fully eliminated (zero-scope) factors.
//!
//! Buckets are never cleared. Once a variable's bucket has been processed,
//! its resident set is final: routing only ever targets buckets strictly
//! after the variable being processed, so the backward pass can read each
//! decision bucket exactly as it stood at processing time.

use diadem_factor::{Factor, Scope};
use diadem_model::EliminationOrder;
use std::collections::BTreeSet;

/// Stable handle into the factor arena.
pub type FactorHandle = usize;

/// Append-only factor storage.
#[derive(Debug, Default)]
pub struct FactorArena {
    factors: Vec<Factor>,
}

impl FactorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factor; the returned handle stays valid for the arena's
    /// lifetime.
    pub fn push(&mut self, factor: Factor) -> FactorHandle {
        self.factors.push(factor);
        self.factors.len() - 1
    }

    pub fn get(&self, handle: FactorHandle) -> &Factor {
        &self.factors[handle]
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorHandle, &Factor)> {
        self.factors.iter().enumerate()
    }

    /// Total bytes held by all dense tables; the dominant resource cost,
    /// bounded by the induced width of the elimination order.
    pub fn table_bytes(&self) -> usize {
        self.factors.iter().map(Factor::table_bytes).sum()
    }
}

/// Where a routed factor ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inserted into the bucket of this variable.
    Bucket(usize),
    /// Zero scope: recorded in the Root Set.
    Root,
}

/// Per-variable resident factor sets plus the Root Set.
#[derive(Debug)]
pub struct BucketStore {
    buckets: Vec<BTreeSet<FactorHandle>>,
    roots: Vec<FactorHandle>,
}

impl BucketStore {
    pub fn new(n_vars: usize) -> Self {
        Self {
            buckets: vec![BTreeSet::new(); n_vars],
            roots: Vec::new(),
        }
    }

    /// Assign every arena factor to the bucket of the earliest-eliminated
    /// variable in its scope. Zero-scope factors go straight to the Root
    /// Set; every other factor lands in exactly one bucket.
    pub fn partition(&mut self, arena: &FactorArena, order: &EliminationOrder) {
        let mut assigned = vec![false; arena.len()];
        for x in order.iter() {
            for (h, factor) in arena.iter() {
                if !assigned[h] && factor.scope().contains(x) {
                    self.buckets[x].insert(h);
                    assigned[h] = true;
                }
            }
        }
        for (h, factor) in arena.iter() {
            if !assigned[h] {
                debug_assert!(factor.is_scalar(), "non-scalar factor {h} escaped partition");
                self.roots.push(h);
            }
        }
    }

    /// Insert a newly created factor into the bucket of the next variable
    /// strictly after `after` (an order position) whose scope contains it;
    /// first match wins. Zero-scope factors join the Root Set instead.
    ///
    /// Returns `None` when a non-empty scope has no downstream variable,
    /// which means the order and the factor's scope disagree.
    pub fn route(
        &mut self,
        handle: FactorHandle,
        scope: &Scope,
        after: usize,
        order: &EliminationOrder,
    ) -> Option<Placement> {
        if scope.is_empty() {
            self.roots.push(handle);
            return Some(Placement::Root);
        }
        for &y in &order.as_slice()[after + 1..] {
            if scope.contains(y) {
                self.buckets[y].insert(handle);
                return Some(Placement::Bucket(y));
            }
        }
        None
    }

    /// Resident handles of a variable's bucket.
    pub fn bucket(&self, var: usize) -> &BTreeSet<FactorHandle> {
        &self.buckets[var]
    }

    /// The Root Set: handles of fully eliminated factors.
    pub fn roots(&self) -> &[FactorHandle] {
        &self.roots
    }

    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diadem_factor::FactorKind;
    use diadem_model::{constrained_order, Diagram, OrderingMethod};

    fn weather() -> (Diagram, EliminationOrder) {
        let mut b = Diagram::builder();
        let x = b.chance(2);
        let d = b.decision(2);
        b.observes(d, [x]);
        b.probability([x], vec![0.6, 0.4]);
        b.utility([x, d], vec![10.0, 0.0, 0.0, 5.0]);
        let dg = b.build().unwrap();
        let order = constrained_order(&dg, OrderingMethod::MinFill).unwrap();
        (dg, order)
    }

    fn seeded(dg: &Diagram) -> FactorArena {
        let mut arena = FactorArena::new();
        for f in dg.factors() {
            arena.push(f.clone());
        }
        arena
    }

    #[test]
    fn handles_are_stable_and_dense() {
        let (dg, _) = weather();
        let mut arena = seeded(&dg);
        assert_eq!(arena.len(), 2);
        let h = arena.push(Factor::scalar(FactorKind::Probability, 1.0));
        assert_eq!(h, 2);
        assert_eq!(arena.get(0).kind(), FactorKind::Probability);
        assert_eq!(arena.table_bytes(), (2 + 4 + 1) * 8);
    }

    #[test]
    fn partition_assigns_to_earliest_variable() {
        let (dg, order) = weather();
        let arena = seeded(&dg);
        let mut store = BucketStore::new(dg.n_vars());
        store.partition(&arena, &order);
        // order is [d, x]: U(x,d) contains d, so it lands in d's bucket;
        // P(x) only mentions x.
        assert_eq!(store.bucket(1).iter().copied().collect::<Vec<_>>(), [1]);
        assert_eq!(store.bucket(0).iter().copied().collect::<Vec<_>>(), [0]);
        assert!(store.roots().is_empty());
    }

    #[test]
    fn partition_sends_scalar_inputs_to_roots() {
        let (dg, order) = weather();
        let mut arena = seeded(&dg);
        let h = arena.push(Factor::scalar(FactorKind::Utility, 2.5));
        let mut store = BucketStore::new(dg.n_vars());
        store.partition(&arena, &order);
        assert_eq!(store.roots(), &[h]);
    }

    #[test]
    fn route_picks_first_downstream_bucket() {
        let (dg, order) = weather();
        let mut arena = seeded(&dg);
        let mut store = BucketStore::new(dg.n_vars());
        store.partition(&arena, &order);

        // message over x created while processing d (position 0)
        let g = arena.get(1).max_out(1);
        let scope = g.scope().clone();
        let h = arena.push(g);
        assert_eq!(
            store.route(h, &scope, 0, &order),
            Some(Placement::Bucket(0))
        );
        assert!(store.bucket(0).contains(&h));
    }

    #[test]
    fn route_sends_scalars_to_roots() {
        let (dg, order) = weather();
        let mut arena = seeded(&dg);
        let mut store = BucketStore::new(dg.n_vars());
        store.partition(&arena, &order);

        let f = arena.get(0).sum_out(0);
        let scope = f.scope().clone();
        let h = arena.push(f);
        assert_eq!(store.route(h, &scope, 1, &order), Some(Placement::Root));
        assert_eq!(store.roots(), &[h]);
    }

    #[test]
    fn route_rejects_upstream_only_scopes() {
        let (dg, order) = weather();
        let mut arena = seeded(&dg);
        let mut store = BucketStore::new(dg.n_vars());
        store.partition(&arena, &order);

        // scope {d} has no variable after position 1
        let g = arena.get(1).sum_out(0);
        let scope = g.scope().clone();
        let h = arena.push(g);
        assert_eq!(store.route(h, &scope, 1, &order), None);
    }
}
