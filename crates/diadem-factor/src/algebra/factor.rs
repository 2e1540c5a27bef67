//! Dense factors: real-valued tables over discrete variable scopes.
//!
//! A factor maps every joint assignment of its scope to a value, stored as a
//! dense table in the layout fixed by [`Scope`] (first variable fastest).
//! Factors are immutable once built; every operation produces a new factor.
//!
//! Each factor carries a [`FactorKind`] tag. The algebra itself never infers
//! a kind: binary operations keep the left operand's tag and callers retag
//! derived factors explicitly via [`Factor::into_kind`].
//!
//! # Division convention
//!
//! [`Factor::divide`] maps any division by zero to exactly `0.0`, covering
//! both `0/0` and `u/0`. A zero denominator only arises from a zero-mass
//! branch, whose contribution is immaterial downstream; zero keeps later
//! sums and maxima finite.

use super::scope::Scope;
use serde::Serialize;
use thiserror::Error;

/// Semantic tag of a factor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// A (conditional) probability table.
    Probability,
    /// A utility table.
    Utility,
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactorKind::Probability => write!(f, "probability"),
            FactorKind::Utility => write!(f, "utility"),
        }
    }
}

/// Errors raised while constructing factors or scopes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactorError {
    #[error("duplicate variable x{id} in scope")]
    DuplicateVariable { id: usize },
    #[error("table length mismatch: scope holds {expected} cells, got {actual}")]
    TableLength { expected: usize, actual: usize },
    #[error("non-finite value at table index {index}")]
    NonFinite { index: usize },
}

/// A dense factor over a discrete scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Factor {
    scope: Scope,
    kind: FactorKind,
    values: Vec<f64>,
}

impl Factor {
    /// Build a factor from a scope and a dense table.
    ///
    /// The table must have exactly `scope.table_len()` finite entries, laid
    /// out with the first (lowest-id) scope variable varying fastest.
    pub fn new(scope: Scope, kind: FactorKind, values: Vec<f64>) -> Result<Self, FactorError> {
        if values.len() != scope.table_len() {
            return Err(FactorError::TableLength {
                expected: scope.table_len(),
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(FactorError::NonFinite { index });
        }
        Ok(Self {
            scope,
            kind,
            values,
        })
    }

    /// A scalar (empty-scope) factor.
    pub fn scalar(kind: FactorKind, value: f64) -> Self {
        debug_assert!(value.is_finite());
        Self {
            scope: Scope::empty(),
            kind,
            values: vec![value],
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn kind(&self) -> FactorKind {
        self.kind
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of scope variables.
    pub fn arity(&self) -> usize {
        self.scope.len()
    }

    /// Whether the factor has an empty scope.
    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    /// Bytes held by the dense table.
    pub fn table_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f64>()
    }

    /// The same table under a different kind tag.
    pub fn into_kind(mut self, kind: FactorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Value at a joint assignment given in scope order (sorted by id).
    pub fn value_at(&self, assignment: &[usize]) -> Option<f64> {
        if assignment.len() != self.scope.len() {
            return None;
        }
        let strides = self.scope.strides();
        let mut idx = 0usize;
        for ((&a, v), s) in assignment.iter().zip(self.scope.vars()).zip(&strides) {
            if a >= v.states() {
                return None;
            }
            idx += a * s;
        }
        Some(self.values[idx])
    }

    /// Pointwise product over the union scope.
    pub fn product(&self, other: &Factor) -> Factor {
        self.binary_op(other, |a, b| a * b)
    }

    /// Pointwise sum over the union scope.
    pub fn add(&self, other: &Factor) -> Factor {
        self.binary_op(other, |a, b| a + b)
    }

    /// Pointwise quotient over the union scope, broadcasting over the scope
    /// difference. Division by zero yields `0.0` (see module docs).
    pub fn divide(&self, other: &Factor) -> Factor {
        self.binary_op(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    /// Sum the variable out of the scope.
    pub fn sum_out(&self, id: usize) -> Factor {
        self.eliminate(id, 0.0, |a, b| a + b)
    }

    /// Maximize the variable out of the scope.
    pub fn max_out(&self, id: usize) -> Factor {
        self.eliminate(id, f64::NEG_INFINITY, f64::max)
    }

    /// Minimize the variable out of the scope.
    pub fn min_out(&self, id: usize) -> Factor {
        self.eliminate(id, f64::INFINITY, f64::min)
    }

    /// Fix the variable to one domain value; the scope loses the variable.
    ///
    /// Slicing a variable outside the scope returns the factor unchanged.
    pub fn slice(&self, id: usize, value: usize) -> Factor {
        let Some(pos) = self.scope.position(id) else {
            return self.clone();
        };
        debug_assert!(value < self.scope.vars()[pos].states());
        let scope = self.scope.without(id);
        let src_strides: Vec<usize> = scope
            .vars()
            .iter()
            .map(|v| self.scope.stride_of(v.id()).unwrap_or(0))
            .collect();
        let base = value * self.scope.strides()[pos];

        let mut values = Vec::with_capacity(scope.table_len());
        let mut digits = vec![0usize; scope.len()];
        let mut offs = [base];
        loop {
            values.push(self.values[offs[0]]);
            if !advance(&scope, &mut digits, &mut offs, &[&src_strides]) {
                break;
            }
        }
        Factor {
            scope,
            kind: self.kind,
            values,
        }
    }

    /// Scalar maximum over the whole table.
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn binary_op(&self, other: &Factor, op: impl Fn(f64, f64) -> f64) -> Factor {
        let scope = self.scope.union(&other.scope);
        let sa = self.scope.embedded_strides(&scope);
        let sb = other.scope.embedded_strides(&scope);

        let mut values = Vec::with_capacity(scope.table_len());
        let mut digits = vec![0usize; scope.len()];
        let mut offs = [0usize, 0usize];
        loop {
            values.push(op(self.values[offs[0]], other.values[offs[1]]));
            if !advance(&scope, &mut digits, &mut offs, &[&sa, &sb]) {
                break;
            }
        }
        Factor {
            scope,
            kind: self.kind,
            values,
        }
    }

    fn eliminate(&self, id: usize, init: f64, op: impl Fn(f64, f64) -> f64) -> Factor {
        let scope = self.scope.without(id);
        let tgt_strides = scope.embedded_strides(&self.scope);

        let mut values = vec![init; scope.table_len()];
        let mut digits = vec![0usize; self.scope.len()];
        let mut offs = [0usize];
        let mut src = 0usize;
        loop {
            values[offs[0]] = op(values[offs[0]], self.values[src]);
            src += 1;
            if !advance(&self.scope, &mut digits, &mut offs, &[&tgt_strides]) {
                break;
            }
        }
        Factor {
            scope,
            kind: self.kind,
            values,
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}[", self.kind, self.scope)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Advance a mixed-radix counter over `scope`, keeping each offset in sync
/// with its stride vector. Returns false after the last assignment.
fn advance(scope: &Scope, digits: &mut [usize], offs: &mut [usize], strides: &[&[usize]]) -> bool {
    for (j, v) in scope.vars().iter().enumerate() {
        digits[j] += 1;
        for (off, s) in offs.iter_mut().zip(strides) {
            *off += s[j];
        }
        if digits[j] < v.states() {
            return true;
        }
        for (off, s) in offs.iter_mut().zip(strides) {
            *off -= s[j] * digits[j];
        }
        digits[j] = 0;
    }
    false
}
