//! Dense factor algebra for diadem.

pub mod algebra;

pub use algebra::factor::{Factor, FactorError, FactorKind};
pub use algebra::scope::Scope;
pub use algebra::var::Var;
