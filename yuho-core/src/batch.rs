#![forbid(unsafe_code)]

//! Parallel checking of independent programs.

use rayon::prelude::*;
use yuho_ast::Program;

use crate::error::SemanticError;
use crate::sema::{Checker, TypedProgram};

/// Checks each program on the rayon pool. Results line up with `programs`.
///
/// Every program gets its own Type Environment and Scope Stack; nothing is
/// shared between units.
pub fn check_batch(
    checker: &Checker,
    programs: &[Program],
) -> Vec<Result<TypedProgram, Vec<SemanticError>>> {
    tracing::debug!(programs = programs.len(), "batch check");
    programs.par_iter().map(|p| checker.check(p)).collect()
}
