//! The bucket-elimination solver for standard influence diagrams.
//!
//! A single forward pass walks the constrained elimination order, processing
//! each variable's bucket with the rule for its type:
//!
//! - **chance**: multiply the bucket's probability factors, sum the variable
//!   out to get the probability message, and push each utility factor
//!   through the same combination, dividing by the probability message so
//!   downstream combination stays a correct conditional-expectation
//!   calculus;
//! - **decision**: probability factors resident in a decision bucket are
//!   constants as functions of the decision, so they are conditioned at
//!   value 0 and forwarded; utility factors are summed and the variable is
//!   maximized out.
//!
//! Fully eliminated (zero-scope) messages accumulate in the Root Set, whose
//! combination yields the maximum expected utility. A backward pass then
//! recombines each decision bucket into its policy factor.

use crate::bucket::{BucketStore, FactorArena, FactorHandle, Placement};
use crate::config::SolverConfig;
use crate::policy::{Policy, PolicyFactor};
use crate::trace::{event_names, NullSink, Phase, TraceEvent, TraceSink};
use diadem_common::{CapabilitySet, Error, QueryKind, Result};
use diadem_factor::{Factor, FactorKind};
use diadem_model::{constrained_order, induced_width, Diagram, EliminationOrder, VarKind};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Elimination operators the engine can request from the algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElimOp {
    Sum,
    Max,
    Min,
}

impl FromStr for ElimOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(ElimOp::Sum),
            "max" => Ok(ElimOp::Max),
            "min" => Ok(ElimOp::Min),
            other => Err(Error::UnknownOperator { name: other.into() }),
        }
    }
}

/// Eliminate a variable from a factor with the given operator.
pub fn eliminate(factor: &Factor, var: usize, op: ElimOp) -> Factor {
    match op {
        ElimOp::Sum => factor.sum_out(var),
        ElimOp::Max => factor.max_out(var),
        ElimOp::Min => factor.min_out(var),
    }
}

/// Resource accounting for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    /// Factors alive in the arena at the end of the run (inputs plus
    /// messages).
    pub factors_created: usize,
    /// Bytes held by all arena tables.
    pub table_bytes: usize,
    /// Bytes held by the policy tables.
    pub policy_table_bytes: usize,
}

/// Output of a completed solve: the MEU scalar, the full policy, and the
/// run's ordering artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub meu: f64,
    pub policy: Policy,
    pub order: EliminationOrder,
    pub induced_width: usize,
    pub stats: SolveStats,
}

/// Answer to a capability-probed query.
#[derive(Debug, Clone, Serialize)]
pub enum QueryAnswer {
    MaxExpectedUtility(f64),
    DecisionPolicy(Policy),
}

/// Internal artifacts of one run; kept for inspection by accessors.
struct RunArtifacts {
    arena: FactorArena,
    store: BucketStore,
    order: EliminationOrder,
    meu: f64,
    policy: Policy,
}

/// Bucket elimination (BE) for standard influence diagrams.
///
/// Computes the maximum expected utility and an optimal decision policy
/// under a fixed elimination order that respects the model's temporal
/// partial order. LIMIDs are rejected at construction: their unconstrained
/// order requires a different algorithm.
pub struct BucketElimination {
    diagram: Diagram,
    config: SolverConfig,
    sink: Arc<dyn TraceSink>,
    run: Option<RunArtifacts>,
}

impl std::fmt::Debug for BucketElimination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketElimination")
            .field("diagram", &self.diagram)
            .field("config", &self.config)
            .field("solved", &self.run.is_some())
            .finish_non_exhaustive()
    }
}

impl BucketElimination {
    /// Create a solver for a standard ID.
    ///
    /// Fails with [`Error::UnsupportedModel`] when the model is a LIMID.
    pub fn new(diagram: Diagram, config: SolverConfig) -> Result<Self> {
        if diagram.is_limid() {
            return Err(Error::UnsupportedModel(
                "bucket elimination requires a standard ID; LIMIDs have no constrained order"
                    .into(),
            ));
        }
        Ok(Self {
            diagram,
            config,
            sink: Arc::new(NullSink),
            run: None,
        })
    }

    /// Attach a trace sink. Events are a side channel; results do not
    /// depend on the sink.
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Query kinds this solver can answer.
    pub fn capabilities() -> CapabilitySet {
        CapabilitySet::of([QueryKind::MaxExpectedUtility, QueryKind::DecisionPolicy])
    }

    /// Probe a single query kind.
    pub fn supports(kind: QueryKind) -> bool {
        Self::capabilities().supports(kind)
    }

    /// Run the full algorithm: ordering, partitioning, forward elimination,
    /// root aggregation, backward policy construction.
    pub fn solve(&mut self) -> Result<Solution> {
        let order = constrained_order(&self.diagram, self.config.ordering)?;
        let width = induced_width(&self.diagram, &order);
        info!(
            variables = self.diagram.n_vars(),
            induced_width = width,
            ordering = %self.config.ordering,
            "starting bucket elimination"
        );
        self.sink.emit(
            TraceEvent::new(event_names::SOLVE_STARTED, Phase::Init)
                .with_detail("order", order.as_slice())
                .with_detail("induced_width", width),
        );

        let mut arena = FactorArena::new();
        for factor in self.diagram.factors() {
            arena.push(factor.clone());
        }
        let mut store = BucketStore::new(self.diagram.n_vars());
        store.partition(&arena, &order);
        self.sink.emit(
            TraceEvent::new(event_names::BUCKETS_PARTITIONED, Phase::Partition)
                .with_detail("factors", arena.len()),
        );

        self.forward(&order, &mut arena, &mut store)?;

        let meu = self.aggregate(&arena, &store);
        let policy = self.backward(&order, &arena, &store);

        let stats = SolveStats {
            factors_created: arena.len(),
            table_bytes: arena.table_bytes(),
            policy_table_bytes: policy.table_bytes(),
        };
        self.sink.emit(
            TraceEvent::new(event_names::SOLVE_FINISHED, Phase::Policy)
                .with_detail("meu", meu)
                .with_detail("table_bytes", stats.table_bytes),
        );
        info!(meu, table_bytes = stats.table_bytes, "bucket elimination finished");

        let solution = Solution {
            meu,
            policy: policy.clone(),
            order: order.clone(),
            induced_width: width,
            stats,
        };
        self.run = Some(RunArtifacts {
            arena,
            store,
            order,
            meu,
            policy,
        });
        Ok(solution)
    }

    /// MEU of the completed run.
    pub fn meu(&self) -> Result<f64> {
        Ok(self.solved()?.meu)
    }

    /// Policy of the completed run.
    pub fn policy(&self) -> Result<&Policy> {
        Ok(&self.solved()?.policy)
    }

    /// Answer a query against the completed run.
    ///
    /// Unsupported kinds fail with [`Error::UnsupportedQuery`] whether or
    /// not the solver has run: "not applicable" is distinct from "not yet
    /// run".
    pub fn query(&self, kind: QueryKind) -> Result<QueryAnswer> {
        match kind {
            QueryKind::MaxExpectedUtility => {
                Ok(QueryAnswer::MaxExpectedUtility(self.solved()?.meu))
            }
            QueryKind::DecisionPolicy => {
                Ok(QueryAnswer::DecisionPolicy(self.solved()?.policy.clone()))
            }
            other => Err(Error::UnsupportedQuery { query: other }),
        }
    }

    fn solved(&self) -> Result<&RunArtifacts> {
        self.run
            .as_ref()
            .ok_or_else(|| Error::Precondition("solve() has not completed".into()))
    }

    /// Forward pass: eliminate variables in order, one bucket at a time.
    fn forward(
        &self,
        order: &EliminationOrder,
        arena: &mut FactorArena,
        store: &mut BucketStore,
    ) -> Result<()> {
        for (pos, x) in order.iter().enumerate() {
            let residents: Vec<FactorHandle> = store.bucket(x).iter().copied().collect();
            if residents.is_empty() {
                continue;
            }
            if self.config.debug {
                self.sink.emit(
                    TraceEvent::new(event_names::BUCKET_STARTED, Phase::Forward)
                        .with_detail("variable", x)
                        .with_detail("kind", self.diagram.kind(x).to_string())
                        .with_detail("residents", &residents),
                );
            }

            let mut phi = Vec::new();
            let mut psi = Vec::new();
            for &h in &residents {
                match arena.get(h).kind() {
                    FactorKind::Probability => phi.push(h),
                    FactorKind::Utility => psi.push(h),
                }
            }

            match self.diagram.kind(x) {
                VarKind::Chance => {
                    debug!(variable = x, "eliminating chance variable");
                    self.chance_bucket(x, pos, &phi, &psi, order, arena, store)?;
                }
                VarKind::Decision => {
                    debug!(variable = x, "eliminating decision variable");
                    self.decision_bucket(x, pos, &phi, &psi, order, arena, store)?;
                }
            }

            if self.config.debug {
                self.sink.emit(
                    TraceEvent::new(event_names::BUCKET_PROCESSED, Phase::Forward)
                        .with_detail("variable", x)
                        .with_detail("factors", arena.len()),
                );
            }
        }
        Ok(())
    }

    /// Chance-bucket rule: multiply `phi`, sum the variable out, and divide
    /// each combined utility message by the probability message.
    fn chance_bucket(
        &self,
        x: usize,
        pos: usize,
        phi: &[FactorHandle],
        psi: &[FactorHandle],
        order: &EliminationOrder,
        arena: &mut FactorArena,
        store: &mut BucketStore,
    ) -> Result<()> {
        let mut comb = Factor::scalar(FactorKind::Probability, 1.0);
        for &h in phi {
            comb = comb.product(arena.get(h));
        }
        let f = eliminate(&comb, x, ElimOp::Sum).into_kind(FactorKind::Probability);

        let mut messages = Vec::with_capacity(psi.len());
        for &u in psi {
            let g = eliminate(&comb.product(arena.get(u)), x, ElimOp::Sum)
                .divide(&f)
                .into_kind(FactorKind::Utility);
            messages.push(g);
        }

        self.append(f, pos, order, arena, store)?;
        for g in messages {
            self.append(g, pos, order, arena, store)?;
        }
        Ok(())
    }

    /// Decision-bucket rule: condition resident probabilities at an
    /// arbitrary value (they are decision-invariant by model validation),
    /// sum the utilities, and maximize the variable out.
    fn decision_bucket(
        &self,
        x: usize,
        pos: usize,
        phi: &[FactorHandle],
        psi: &[FactorHandle],
        order: &EliminationOrder,
        arena: &mut FactorArena,
        store: &mut BucketStore,
    ) -> Result<()> {
        for &p in phi {
            let sliced = arena.get(p).slice(x, 0).into_kind(FactorKind::Probability);
            self.append(sliced, pos, order, arena, store)?;
        }

        let mut comb = Factor::scalar(FactorKind::Utility, 0.0);
        for &u in psi {
            comb = comb.add(arena.get(u));
        }
        let g = eliminate(&comb, x, ElimOp::Max).into_kind(FactorKind::Utility);
        self.append(g, pos, order, arena, store)?;
        Ok(())
    }

    /// Append a derived factor to the arena and insert it downstream (or
    /// into the Root Set when fully eliminated).
    fn append(
        &self,
        factor: Factor,
        pos: usize,
        order: &EliminationOrder,
        arena: &mut FactorArena,
        store: &mut BucketStore,
    ) -> Result<Placement> {
        let scope = factor.scope().clone();
        let kind = factor.kind();
        let handle = arena.push(factor);
        let placement = store.route(handle, &scope, pos, order).ok_or_else(|| {
            Error::InvalidOrder(format!(
                "derived factor {handle} over {scope} has no downstream bucket"
            ))
        })?;
        match placement {
            Placement::Bucket(y) => {
                debug!(handle, bucket = y, %kind, "message routed");
                if self.config.debug {
                    self.sink.emit(
                        TraceEvent::new(event_names::MESSAGE_ROUTED, Phase::Forward)
                            .with_detail("handle", handle)
                            .with_detail("kind", kind.to_string())
                            .with_detail("bucket", y),
                    );
                }
            }
            Placement::Root => {
                debug!(handle, %kind, "root recorded");
                self.sink.emit(
                    TraceEvent::new(event_names::ROOT_RECORDED, Phase::Forward)
                        .with_detail("handle", handle)
                        .with_detail("kind", kind.to_string()),
                );
            }
        }
        Ok(placement)
    }

    /// Combine the Root Set into the scalar MEU: probabilities multiply,
    /// utilities add, and the maximum of the product is the optimum.
    fn aggregate(&self, arena: &FactorArena, store: &BucketStore) -> f64 {
        let mut p = Factor::scalar(FactorKind::Probability, 1.0);
        let mut u = Factor::scalar(FactorKind::Utility, 0.0);
        for &h in store.roots() {
            match arena.get(h).kind() {
                FactorKind::Probability => p = p.product(arena.get(h)),
                FactorKind::Utility => u = u.add(arena.get(h)),
            }
        }
        let meu = p.product(&u).max_value();
        self.sink.emit(
            TraceEvent::new(event_names::MEU_COMPUTED, Phase::Aggregate)
                .with_detail("meu", meu)
                .with_detail("roots", store.roots().len()),
        );
        meu
    }

    /// Backward pass: recombine each decision bucket into its policy
    /// factor. Chance variables are skipped; each bucket is read exactly as
    /// it stood when its variable was processed.
    fn backward(
        &self,
        order: &EliminationOrder,
        arena: &FactorArena,
        store: &BucketStore,
    ) -> Policy {
        let mut policy = Policy::default();
        for &x in order.as_slice().iter().rev() {
            if self.diagram.kind(x) != VarKind::Decision {
                continue;
            }
            let mut p = Factor::scalar(FactorKind::Probability, 1.0);
            let mut u = Factor::scalar(FactorKind::Utility, 0.0);
            for &h in store.bucket(x) {
                match arena.get(h).kind() {
                    FactorKind::Probability => p = p.product(arena.get(h)),
                    FactorKind::Utility => u = u.add(arena.get(h)),
                }
            }
            let factor = p.product(&u).into_kind(FactorKind::Utility);
            debug!(decision = x, scope = %factor.scope(), "policy factor built");
            self.sink.emit(
                TraceEvent::new(event_names::POLICY_EMITTED, Phase::Policy)
                    .with_detail("decision", x)
                    .with_detail("scope_vars", factor.scope().len()),
            );
            policy.insert(x, PolicyFactor::new(self.diagram.var(x), factor));
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diadem_model::Diagram;

    /// Hidden weather, observed forecast, umbrella decision.
    fn forecast_model() -> Diagram {
        let mut b = Diagram::builder();
        let w = b.chance(2);
        let f = b.chance(2);
        let d = b.decision(2);
        b.observes(d, [f]);
        b.probability([w], vec![0.3, 0.7]);
        b.probability([w, f], vec![0.7, 0.2, 0.3, 0.8]);
        b.utility([w, d], vec![70.0, 20.0, 0.0, 100.0]);
        b.build().unwrap()
    }

    fn solve(diagram: Diagram) -> (BucketElimination, Solution) {
        let mut solver = BucketElimination::new(diagram, SolverConfig::default()).unwrap();
        let solution = solver.solve().unwrap();
        (solver, solution)
    }

    #[test]
    fn elim_op_parses_known_names() {
        assert_eq!("sum".parse::<ElimOp>().unwrap(), ElimOp::Sum);
        assert_eq!("max".parse::<ElimOp>().unwrap(), ElimOp::Max);
        assert_eq!("min".parse::<ElimOp>().unwrap(), ElimOp::Min);
    }

    #[test]
    fn elim_op_rejects_unknown_names() {
        let err = "product".parse::<ElimOp>().unwrap_err();
        assert!(matches!(err, Error::UnknownOperator { name } if name == "product"));
    }

    #[test]
    fn forecast_meu_matches_hand_computation() {
        let (_, solution) = solve(forecast_model());
        assert!((solution.meu - 73.5).abs() < 1e-9);
        assert_eq!(solution.induced_width, 2);
    }

    #[test]
    fn residents_have_their_bucket_variable_earliest() {
        let (solver, _) = solve(forecast_model());
        let run = solver.run.as_ref().unwrap();
        for y in run.order.iter() {
            for &h in run.store.bucket(y) {
                let scope = run.arena.get(h).scope();
                assert!(scope.contains(y), "bucket {y} holds a factor without it");
                let earliest = scope
                    .iter()
                    .map(|v| run.order.position(v.id()))
                    .min()
                    .unwrap();
                assert_eq!(
                    earliest,
                    run.order.position(y),
                    "factor {h} resides in a later bucket than its earliest variable"
                );
            }
        }
    }

    #[test]
    fn root_set_is_exactly_zero_scope_factors() {
        let (solver, _) = solve(forecast_model());
        let run = solver.run.as_ref().unwrap();
        let mut scalars: Vec<FactorHandle> = run
            .arena
            .iter()
            .filter(|(_, f)| f.is_scalar())
            .map(|(h, _)| h)
            .collect();
        scalars.sort_unstable();
        let mut roots = run.store.roots().to_vec();
        roots.sort_unstable();
        assert_eq!(roots, scalars);
    }

    #[test]
    fn derived_kinds_follow_bucket_rules() {
        let (solver, _) = solve(forecast_model());
        let run = solver.run.as_ref().unwrap();
        // inputs 0..3; W's bucket emits P(F) then the conditional expected
        // utility; D's bucket emits the maximized utility; F's bucket emits
        // the scalar probability and utility roots.
        let kinds: Vec<FactorKind> = (3..run.arena.len())
            .map(|h| run.arena.get(h).kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FactorKind::Probability,
                FactorKind::Utility,
                FactorKind::Utility,
                FactorKind::Probability,
                FactorKind::Utility,
            ]
        );
    }

    #[test]
    fn decision_resident_probabilities_are_conditioned() {
        // P carries the decision in its scope (invariantly), so it lands in
        // the decision's bucket and goes through the slice rule.
        let mut b = Diagram::builder();
        let x = b.chance(2);
        let d = b.decision(2);
        b.observes(d, [x]);
        b.probability([x, d], vec![0.6, 0.4, 0.6, 0.4]);
        b.utility([x, d], vec![10.0, 0.0, 0.0, 5.0]);
        let (solver, solution) = solve(b.build().unwrap());
        assert!((solution.meu - 8.0).abs() < 1e-9);

        let run = solver.run.as_ref().unwrap();
        // handle 2 is the sliced probability: scope {x}, values 0.6/0.4
        let sliced = run.arena.get(2);
        assert_eq!(sliced.kind(), FactorKind::Probability);
        assert_eq!(sliced.scope().len(), 1);
        assert!(sliced.scope().contains(x));
        assert_eq!(sliced.values(), &[0.6, 0.4]);
    }

    #[test]
    fn empty_buckets_create_no_factors() {
        let mut b = Diagram::builder();
        let x = b.chance(2);
        let _isolated = b.chance(3);
        b.probability([x], vec![0.5, 0.5]);
        let (solver, _) = solve(b.build().unwrap());
        let run = solver.run.as_ref().unwrap();
        // one input plus the single message from x's bucket
        assert_eq!(run.arena.len(), 2);
        assert_eq!(run.store.roots().len(), 1);
    }

    #[test]
    fn accessors_guard_until_solved() {
        let solver =
            BucketElimination::new(forecast_model(), SolverConfig::default()).unwrap();
        assert!(matches!(solver.meu(), Err(Error::Precondition(_))));
        assert!(matches!(solver.policy(), Err(Error::Precondition(_))));
        assert!(matches!(
            solver.query(QueryKind::MaxExpectedUtility),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn unsupported_queries_fail_before_and_after_solve() {
        let mut solver =
            BucketElimination::new(forecast_model(), SolverConfig::default()).unwrap();
        assert!(matches!(
            solver.query(QueryKind::Marginals),
            Err(Error::UnsupportedQuery {
                query: QueryKind::Marginals
            })
        ));
        solver.solve().unwrap();
        assert!(matches!(
            solver.query(QueryKind::PartitionFunction),
            Err(Error::UnsupportedQuery { .. })
        ));
        assert!(matches!(
            solver.query(QueryKind::MaxExpectedUtility),
            Ok(QueryAnswer::MaxExpectedUtility(_))
        ));
    }

    #[test]
    fn capability_probing() {
        assert!(BucketElimination::supports(QueryKind::MaxExpectedUtility));
        assert!(BucketElimination::supports(QueryKind::DecisionPolicy));
        assert!(!BucketElimination::supports(QueryKind::Marginals));
        assert!(!BucketElimination::supports(QueryKind::BestConfiguration));
    }

    #[test]
    fn limid_rejected_at_construction() {
        let mut b = Diagram::builder();
        b.chance(2);
        b.limid(true);
        let err = BucketElimination::new(b.build().unwrap(), SolverConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
    }
}
