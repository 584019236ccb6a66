#![forbid(unsafe_code)]

//! Verification Driver: refutes principles with an injected [`Solver`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};
use yuho_ast::{PrincipleDef, QuantKind};
use yuho_core::TypedProgram;

use crate::counterexample::{Counterexample, Value};
use crate::logic::{CmpOp, ConstDecl, LogicalForm, Signature, SolverQuery, Sort, Term};
use crate::options::VerifyOptions;
use crate::solver::{Model, Solver, SolverResponse};
use crate::summary::VerificationSummary;
use crate::translate::{QuantifierTranslator, TranslationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    /// The negated principle is unsatisfiable.
    Valid,
    /// A model of the negation exists; see the counterexample.
    Invalid,
    /// The solver answered neither sat nor unsat.
    Unknown,
    TimedOut,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Valid => "valid",
            Verdict::Invalid => "invalid",
            Verdict::Unknown => "unknown",
            Verdict::TimedOut => "timed out",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerificationResult {
    pub principle_name: String,
    pub verdict: Verdict,
    /// Present exactly when the verdict is `Invalid`.
    pub counterexample: Option<Counterexample>,
    /// SMT-LIB2 rendering of the translated principle.
    pub logical_form: String,
    /// Solver reason for `Unknown`/`TimedOut`.
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }

    /// Variable name to literal text, for renderers.
    pub fn counterexample_flat(&self) -> Option<BTreeMap<String, String>> {
        self.counterexample.as_ref().map(Counterexample::to_flat)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "principle {}: {}", self.principle_name, self.verdict)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        if let Some(ce) = &self.counterexample {
            write!(f, "\n{ce}")?;
        }
        Ok(())
    }
}

/// The query whose satisfiability refutes `form`: the background assumptions
/// plus the negated formula.
///
/// Leading universal binders become existential under the negation and are
/// lifted to free constants, so the model names them. A refinement guard on a
/// lifted binder is asserted and its bounds copied onto the constant.
pub fn refutation_query(form: &LogicalForm) -> SolverQuery {
    let mut signature = form.signature.clone();
    let mut assertions = form.assumptions.clone();

    let mut goal = &form.formula;
    loop {
        match goal {
            Term::Quant {
                kind: QuantKind::Forall,
                symbol,
                sort,
                body,
            } => {
                let mut decl = ConstDecl {
                    symbol: symbol.clone(),
                    name: source_name(symbol).to_string(),
                    sort: sort.clone(),
                    lower: None,
                    upper: None,
                };
                goal = body.as_ref();
                if let Term::Implies(guard, inner) = goal {
                    if is_bounds_guard(guard, symbol, &mut decl) {
                        assertions.push(guard.as_ref().clone());
                        goal = inner.as_ref();
                    }
                }
                signature.add_constant(decl);
            }
            _ => break,
        }
    }
    assertions.push(Term::not(goal.clone()));

    SolverQuery {
        signature,
        assertions,
    }
}

/// `x@2` was written `x`.
fn source_name(symbol: &str) -> &str {
    symbol.split('@').next().unwrap_or(symbol)
}

/// Recognizes `lo <= v`, `v <= hi` and their conjunction over `symbol`,
/// recording the bounds on `decl`.
fn is_bounds_guard(guard: &Term, symbol: &str, decl: &mut ConstDecl) -> bool {
    match guard {
        Term::Cmp(CmpOp::Le, lo, v) if is_var(v, symbol) => match lo.as_ref() {
            Term::Int(n) => {
                decl.lower = Some(*n);
                true
            }
            _ => false,
        },
        Term::Cmp(CmpOp::Le, v, hi) if is_var(v, symbol) => match hi.as_ref() {
            Term::Int(n) => {
                decl.upper = Some(*n);
                true
            }
            _ => false,
        },
        Term::And(parts) if !parts.is_empty() => {
            parts.iter().all(|p| is_bounds_guard(p, symbol, decl))
        }
        _ => false,
    }
}

fn is_var(t: &Term, symbol: &str) -> bool {
    matches!(t, Term::Var(s) if s == symbol)
}

/// One value per declared constant; gaps in the solver's model get the
/// sort's default.
fn complete_model(mut model: Model, signature: &Signature) -> Counterexample {
    let mut assignments = BTreeMap::new();
    for c in &signature.constants {
        let value = match model.remove(&c.symbol) {
            Some(v) => v,
            None => {
                warn!(constant = %c.symbol, "solver model omitted a constant; using the default");
                let variants = match &c.sort {
                    Sort::Enum(name) => signature.enum_variants(name),
                    _ => None,
                };
                Value::default_for(&c.sort, variants)
            }
        };
        assignments.insert(c.symbol.clone(), value);
    }
    Counterexample { assignments }
}

pub struct VerificationDriver<S> {
    solver: S,
    options: VerifyOptions,
}

impl<S: Solver> VerificationDriver<S> {
    pub fn new(solver: S, options: VerifyOptions) -> Self {
        Self { solver, options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn into_solver(self) -> S {
        self.solver
    }

    /// One solver check of the refutation query. Never retries.
    #[tracing::instrument(skip_all, fields(principle = %form.principle, timeout_ms = timeout_ms))]
    pub fn verify(&mut self, form: &LogicalForm, timeout_ms: u64) -> VerificationResult {
        let query = refutation_query(form);
        let started = Instant::now();
        let response = self.solver.check(&query, Duration::from_millis(timeout_ms));
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (verdict, counterexample, detail) = match response {
            SolverResponse::Unsat => (Verdict::Valid, None, None),
            SolverResponse::Sat(model) => (
                Verdict::Invalid,
                Some(complete_model(model, &query.signature)),
                None,
            ),
            SolverResponse::Unknown(reason) => (Verdict::Unknown, None, Some(reason)),
            SolverResponse::Timeout => (
                Verdict::TimedOut,
                None,
                Some(format!("no answer within {timeout_ms} ms")),
            ),
        };
        info!(
            solver = self.solver.name(),
            verdict = %verdict,
            elapsed_ms,
            "principle checked"
        );

        VerificationResult {
            principle_name: form.principle.clone(),
            verdict,
            counterexample,
            logical_form: form.to_smtlib(),
            detail,
            elapsed_ms,
        }
    }

    /// Translates then verifies. A translation error means no solver call.
    pub fn verify_principle(
        &mut self,
        program: &TypedProgram,
        principle: &PrincipleDef,
    ) -> Result<VerificationResult, TranslationError> {
        let form = QuantifierTranslator::for_program(program)
            .with_max_depth(self.options.max_quantifier_depth)
            .translate(principle)?;
        Ok(self.verify(&form, self.options.timeout_ms()))
    }

    /// Every principle of `program`, independently.
    pub fn verify_program(&mut self, program: &TypedProgram) -> VerificationSummary {
        let mut summary = VerificationSummary::new(&program.name);
        for principle in program.principles() {
            match self.verify_principle(program, principle) {
                Ok(result) => summary.record(result),
                Err(err) => {
                    warn!(principle = %principle.name.node, error = %err, "principle not translated");
                    summary.record_error(&principle.name.node, err);
                }
            }
        }
        summary
    }
}
