//! Shared foundations for the diadem workspace.
//!
//! This crate carries the pieces every other diadem crate agrees on:
//! - the unified [`Error`] taxonomy with stable codes and categories
//! - the solver capability model ([`QueryKind`], [`CapabilitySet`]) used to
//!   probe what a solver can answer instead of calling stubbed methods

pub mod capabilities;
pub mod error;

pub use capabilities::{CapabilitySet, QueryKind};
pub use error::{Error, ErrorCategory, Result};
