//! Solver configuration.

use diadem_model::OrderingMethod;
use serde::{Deserialize, Serialize};

/// Configuration for the bucket-elimination solver.
///
/// Two knobs: the ordering heuristic used inside chance blocks, and a debug
/// toggle that enables per-bucket trace events (bucket contents before and
/// after processing). Fields are typed and validated by construction; there
/// is no string-encoded property surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Heuristic for ordering chance variables within their blocks.
    pub ordering: OrderingMethod,
    /// Emit per-bucket debug trace events.
    pub debug: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingMethod::MinFill,
            debug: false,
        }
    }
}

impl SolverConfig {
    pub fn new(ordering: OrderingMethod) -> Self {
        Self {
            ordering,
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_min_fill() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.ordering, OrderingMethod::MinFill);
        assert!(!cfg.debug);
    }

    #[test]
    fn builder_style_toggles() {
        let cfg = SolverConfig::new(OrderingMethod::MinDegree).with_debug(true);
        assert_eq!(cfg.ordering, OrderingMethod::MinDegree);
        assert!(cfg.debug);
    }

    #[test]
    fn serde_round_trip() {
        let cfg = SolverConfig::new(OrderingMethod::Lexicographic).with_debug(true);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("lexicographic"));
        let back: SolverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
