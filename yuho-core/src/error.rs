#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use yuho_ast::Span;

/// What went wrong, with the data a caller may want to match on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnboundTypeVariable(String),
    ArityMismatch { expected: usize, got: usize },
    DuplicateField(String),
    CircularInheritance(String),
    OutOfBounds,
    InvalidCitation,
    InvalidTemporalWindow,
    NonBooleanRequirement(String),
    NonExhaustiveMatch,
    AmbiguousVariantPath { variants: Vec<String> },
    ConflictDetected(String),

    UndefinedSymbol(String),
    DuplicateDefinition(String),
    TypeMismatch { expected: String, got: String },
    UnreachableMatchArm,
    ConstraintViolation(String),
    InvalidDate(String),
    InvalidConstraint(String),
    UnknownField { ty: String, field: String },
    MissingField { ty: String, field: String },
    /// Advisory only; never fails a check.
    ShadowedBinding(String),
}

impl ErrorKind {
    /// Stable kind name for renderers.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::UnboundTypeVariable(_) => "UnboundTypeVariableError",
            ErrorKind::ArityMismatch { .. } => "ArityMismatchError",
            ErrorKind::DuplicateField(_) => "DuplicateFieldError",
            ErrorKind::CircularInheritance(_) => "CircularInheritanceError",
            ErrorKind::OutOfBounds => "OutOfBoundsError",
            ErrorKind::InvalidCitation => "InvalidCitationError",
            ErrorKind::InvalidTemporalWindow => "InvalidTemporalWindowError",
            ErrorKind::NonBooleanRequirement(_) => "NonBooleanRequirementError",
            ErrorKind::NonExhaustiveMatch => "NonExhaustiveMatchError",
            ErrorKind::AmbiguousVariantPath { .. } => "AmbiguousVariantPathError",
            ErrorKind::ConflictDetected(_) => "ConflictDetected",
            ErrorKind::UndefinedSymbol(_) => "UndefinedSymbolError",
            ErrorKind::DuplicateDefinition(_) => "DuplicateDefinitionError",
            ErrorKind::TypeMismatch { .. } => "TypeMismatchError",
            ErrorKind::UnreachableMatchArm => "UnreachableMatchArmError",
            ErrorKind::ConstraintViolation(_) => "ConstraintViolationError",
            ErrorKind::InvalidDate(_) => "InvalidDateError",
            ErrorKind::InvalidConstraint(_) => "InvalidConstraintError",
            ErrorKind::UnknownField { .. } => "UnknownFieldError",
            ErrorKind::MissingField { .. } => "MissingFieldError",
            ErrorKind::ShadowedBinding(_) => "ShadowedBindingWarning",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorKind::ShadowedBinding(_))
    }
}

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq, Serialize)]
#[error("semantic error: {message}")]
#[diagnostic(code(yuho::sema))]
#[allow(unused_assignments)]
pub struct SemanticError {
    pub kind: ErrorKind,
    pub message: String,
    #[label]
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}
