//! Ordered variable scopes and their table geometry.
//!
//! A scope is a duplicate-free set of variables kept sorted by id. The sort
//! order fixes the dense-table layout for every factor over the scope: the
//! first (lowest-id) variable varies fastest, so the linear index of a joint
//! assignment `a` is `Σ_i a_i · stride_i` with `stride_0 = 1` and
//! `stride_i = stride_{i-1} · states_{i-1}`.

use super::factor::FactorError;
use super::var::Var;
use serde::Serialize;

/// An ordered, duplicate-free set of variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    vars: Vec<Var>,
}

impl Scope {
    /// The empty scope (the scope of a scalar factor).
    pub fn empty() -> Self {
        Self { vars: Vec::new() }
    }

    /// Build a scope from variables in any order.
    ///
    /// Fails on duplicate variable ids.
    pub fn new(mut vars: Vec<Var>) -> Result<Self, FactorError> {
        vars.sort();
        for pair in vars.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(FactorError::DuplicateVariable { id: pair[0].id() });
            }
        }
        Ok(Self { vars })
    }

    /// Scope over a single variable.
    pub fn singleton(var: Var) -> Self {
        Self { vars: vec![var] }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn iter(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars.iter().copied()
    }

    /// Whether the scope contains the variable with this id.
    pub fn contains(&self, id: usize) -> bool {
        self.position(id).is_some()
    }

    /// Position of the variable with this id within the sorted scope.
    pub fn position(&self, id: usize) -> Option<usize> {
        self.vars.binary_search_by_key(&id, Var::id).ok()
    }

    /// Number of cells in a dense table over this scope (1 for the empty
    /// scope).
    pub fn table_len(&self) -> usize {
        self.vars.iter().map(Var::states).product()
    }

    /// Per-position strides for the dense layout (first variable fastest).
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.vars.len());
        let mut acc = 1usize;
        for v in &self.vars {
            strides.push(acc);
            acc *= v.states();
        }
        strides
    }

    /// Stride of the variable with this id, if present.
    pub fn stride_of(&self, id: usize) -> Option<usize> {
        self.position(id).map(|p| self.strides()[p])
    }

    /// Set union, keeping the sorted layout.
    ///
    /// Variables shared by both scopes must agree on cardinality; scopes
    /// drawn from one model always do.
    pub fn union(&self, other: &Scope) -> Scope {
        let mut vars = Vec::with_capacity(self.vars.len() + other.vars.len());
        let (mut i, mut j) = (0, 0);
        while i < self.vars.len() && j < other.vars.len() {
            let (a, b) = (self.vars[i], other.vars[j]);
            match a.id().cmp(&b.id()) {
                std::cmp::Ordering::Less => {
                    vars.push(a);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    vars.push(b);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    debug_assert_eq!(a.states(), b.states(), "cardinality mismatch for {a}");
                    vars.push(a);
                    i += 1;
                    j += 1;
                }
            }
        }
        vars.extend_from_slice(&self.vars[i..]);
        vars.extend_from_slice(&other.vars[j..]);
        Scope { vars }
    }

    /// The scope with the variable of this id removed (no-op if absent).
    pub fn without(&self, id: usize) -> Scope {
        Scope {
            vars: self.vars.iter().copied().filter(|v| v.id() != id).collect(),
        }
    }

    /// Strides of `self` embedded into `sup`'s layout: one entry per `sup`
    /// position, 0 where the variable is absent from `self`.
    ///
    /// Walking `sup`'s table with these strides as per-digit increments
    /// visits the `self` cell matching each joint assignment.
    pub fn embedded_strides(&self, sup: &Scope) -> Vec<usize> {
        let own = self.strides();
        sup.vars
            .iter()
            .map(|v| self.position(v.id()).map_or(0, |p| own[p]))
            .collect()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(id: usize, states: usize) -> Var {
        Var::new(id, states)
    }

    #[test]
    fn new_sorts_and_rejects_duplicates() {
        let s = Scope::new(vec![v(3, 2), v(1, 4)]).unwrap();
        assert_eq!(s.vars()[0].id(), 1);
        assert_eq!(s.vars()[1].id(), 3);

        assert!(matches!(
            Scope::new(vec![v(2, 2), v(2, 2)]),
            Err(FactorError::DuplicateVariable { id: 2 })
        ));
    }

    #[test]
    fn table_len_and_strides() {
        let s = Scope::new(vec![v(0, 2), v(1, 3), v(2, 4)]).unwrap();
        assert_eq!(s.table_len(), 24);
        assert_eq!(s.strides(), vec![1, 2, 6]);
        assert_eq!(s.stride_of(1), Some(2));
        assert_eq!(s.stride_of(9), None);
    }

    #[test]
    fn empty_scope_is_scalar() {
        let s = Scope::empty();
        assert_eq!(s.table_len(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn union_merges_sorted() {
        let a = Scope::new(vec![v(0, 2), v(2, 3)]).unwrap();
        let b = Scope::new(vec![v(1, 4), v(2, 3)]).unwrap();
        let u = a.union(&b);
        let ids: Vec<usize> = u.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(u.table_len(), 24);
    }

    #[test]
    fn without_removes_only_target() {
        let s = Scope::new(vec![v(0, 2), v(1, 3)]).unwrap();
        let w = s.without(0);
        assert_eq!(w.len(), 1);
        assert!(w.contains(1));
        assert_eq!(s.without(5), s);
    }

    #[test]
    fn embedded_strides_zero_for_absent() {
        let sub = Scope::new(vec![v(1, 3)]).unwrap();
        let sup = Scope::new(vec![v(0, 2), v(1, 3), v(2, 2)]).unwrap();
        assert_eq!(sub.embedded_strides(&sup), vec![0, 1, 0]);
    }
}
