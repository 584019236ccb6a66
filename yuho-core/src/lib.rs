#![forbid(unsafe_code)]

mod batch;
mod consteval;
mod control_flow;
pub mod conflict;
pub mod domain;
pub mod env;
mod error;
pub mod legal;
pub mod scope;
mod sema;
mod types;

pub use batch::check_batch;
pub use conflict::{check_conflict, Conflict, ConflictDetector, ConflictKind, ConflictReport};
pub use consteval::{eval as const_eval, ConstValue};
pub use control_flow::check_mutual_exclusivity;
pub use env::{EnumInfo, FieldInfo, FunctionSig, LegalTestInfo, TypeEnv};
pub use error::{ErrorKind, SemanticError};
pub use legal::{check_match_exhaustiveness, evaluate_test_definition};
pub use sema::{CheckOptions, Checker, TypedProgram};
pub use types::{is_assignable, GenericBinding, Type};
