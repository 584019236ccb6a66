#![forbid(unsafe_code)]

pub mod counterexample;
pub mod driver;
pub mod enumerate;
pub mod explain;
pub mod logic;
pub mod options;
pub mod solver;
pub mod summary;
pub mod translate;

pub use counterexample::{parse_model, parse_value, Counterexample, Value};
pub use driver::{refutation_query, Verdict, VerificationDriver, VerificationResult};
pub use enumerate::EnumerativeSolver;
pub use explain::explain_principle;
pub use logic::{LogicalForm, Signature, SolverQuery, Sort, Term};
pub use options::{SmtProfile, VerifyOptions, MAX_QUANTIFIER_DEPTH};
pub use solver::{Model, Solver, SolverResponse};
#[cfg(feature = "z3")]
pub use solver::z3_backend::Z3Solver;
pub use summary::{PrincipleOutcome, VerificationSummary};
pub use translate::{QuantifierTranslator, TranslationError, TranslationErrorKind};

/// Translates and verifies every principle of `program` with the built-in
/// enumerative solver.
pub fn verify_program(program: &yuho_core::TypedProgram, options: VerifyOptions) -> VerificationSummary {
    let solver = EnumerativeSolver::from_options(&options);
    VerificationDriver::new(solver, options).verify_program(program)
}

/// Like [`verify_program`], backed by Z3.
#[cfg(feature = "z3")]
pub fn verify_program_z3(
    program: &yuho_core::TypedProgram,
    options: VerifyOptions,
) -> VerificationSummary {
    let mut solver = Z3Solver::new();
    if let Some(seed) = options.random_seed {
        solver = solver.with_random_seed(seed);
    }
    VerificationDriver::new(solver, options).verify_program(program)
}
