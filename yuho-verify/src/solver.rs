#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use crate::counterexample::Value;
use crate::logic::SolverQuery;

/// Values read back from a satisfying assignment, keyed by constant symbol.
///
/// Solvers may leave constants out; the driver fills the gaps.
pub type Model = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum SolverResponse {
    Sat(Model),
    Unsat,
    /// Neither sat nor unsat, with the solver's reason.
    Unknown(String),
    /// The deadline passed before an answer.
    Timeout,
}

/// SMT backend capability. One `check` per query; implementations must
/// return [`SolverResponse::Timeout`] rather than block past `timeout`.
pub trait Solver {
    fn name(&self) -> &str;

    fn check(&mut self, query: &SolverQuery, timeout: Duration) -> SolverResponse;
}

impl<S: Solver + ?Sized> Solver for &mut S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn check(&mut self, query: &SolverQuery, timeout: Duration) -> SolverResponse {
        (**self).check(query, timeout)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn check(&mut self, query: &SolverQuery, timeout: Duration) -> SolverResponse {
        (**self).check(query, timeout)
    }
}

#[cfg(feature = "z3")]
pub mod z3_backend {
    use std::time::Duration;

    use z3::{
        ast::{Bool, Int, Real},
        Config, Context, Params, SatResult,
    };

    use super::{Model, Solver, SolverResponse};
    use crate::counterexample::{parse_model, parse_value, Value};
    use crate::logic::{SolverQuery, Sort};

    /// Feeds the SMT-LIB rendering of each query to Z3.
    pub struct Z3Solver {
        ctx: &'static Context,
        random_seed: Option<u32>,
    }

    impl Default for Z3Solver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Z3Solver {
        pub fn new() -> Self {
            let mut cfg = Config::new();
            cfg.set_model_generation(true);
            // One context per prover; queries get fresh solvers.
            let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
            Self {
                ctx,
                random_seed: None,
            }
        }

        pub fn with_random_seed(mut self, seed: u32) -> Self {
            self.random_seed = Some(seed);
            self
        }

        fn read_model(&self, solver: &z3::Solver<'static>, query: &SolverQuery) -> Model {
            let Some(model) = solver.get_model() else {
                return Model::new();
            };
            let printed = parse_model(&model.to_string());
            let ctx = self.ctx;
            let mut out = Model::new();
            for c in &query.signature.constants {
                let name = c.symbol.as_str();
                let value = match &c.sort {
                    Sort::Int => model
                        .eval(&Int::new_const(ctx, name), true)
                        .and_then(|v| v.as_i64())
                        .map(Value::Int),
                    Sort::Bool => model
                        .eval(&Bool::new_const(ctx, name), true)
                        .and_then(|v| v.as_bool())
                        .map(Value::Bool),
                    Sort::Real => model
                        .eval(&Real::new_const(ctx, name), true)
                        .and_then(|v| v.as_real())
                        .filter(|(_, d)| *d != 0)
                        .map(|(n, d)| Value::Real(n as f64 / d as f64)),
                    _ => None,
                };
                let value = value
                    .or_else(|| printed.get(&c.symbol).map(|text| parse_value(text, &c.sort)));
                if let Some(v) = value {
                    out.insert(c.symbol.clone(), v);
                }
            }
            out
        }
    }

    impl Solver for Z3Solver {
        fn name(&self) -> &str {
            "z3"
        }

        fn check(&mut self, query: &SolverQuery, timeout: Duration) -> SolverResponse {
            let solver = z3::Solver::new(self.ctx);
            let mut params = Params::new(self.ctx);
            params.set_u32("timeout", u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
            if let Some(seed) = self.random_seed {
                params.set_u32("random_seed", seed);
            }
            solver.set_params(&params);
            solver.from_string(query.to_smtlib());

            match solver.check() {
                SatResult::Unsat => SolverResponse::Unsat,
                SatResult::Sat => SolverResponse::Sat(self.read_model(&solver, query)),
                SatResult::Unknown => {
                    let reason = solver
                        .get_reason_unknown()
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::debug!(reason = %reason, "z3 returned unknown");
                    if reason.contains("timeout") || reason.contains("canceled") {
                        SolverResponse::Timeout
                    } else {
                        SolverResponse::Unknown(reason)
                    }
                }
            }
        }
    }
}
