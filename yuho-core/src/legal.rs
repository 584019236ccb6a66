#![forbid(unsafe_code)]

//! Legal tests and `match` arm rules.

use std::collections::HashSet;

use yuho_ast::{Literal, Match, Pattern};

use crate::env::LegalTestInfo;
use crate::error::{ErrorKind, SemanticError};

/// Every requirement must be boolean; a test is the conjunction of them all.
pub fn evaluate_test_definition(test: &LegalTestInfo) -> Result<(), Vec<SemanticError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for req in &test.requirements {
        if !seen.insert(req.name.as_str()) {
            errors.push(SemanticError::new(
                ErrorKind::DuplicateDefinition(req.name.clone()),
                format!(
                    "requirement `{}` is listed twice in legal test `{}`",
                    req.name, test.name
                ),
                req.span,
            ));
        }
        if !req.ty.is_bool() {
            errors.push(SemanticError::new(
                ErrorKind::NonBooleanRequirement(req.name.clone()),
                format!(
                    "requirement `{}` of legal test `{}` must be bool, found {}",
                    req.name,
                    test.name,
                    req.ty.display()
                ),
                req.span,
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A match needs exactly one wildcard arm.
pub fn check_match_exhaustiveness<B>(m: &Match<B>) -> Result<(), SemanticError> {
    let mut wildcards = m
        .arms
        .iter()
        .filter(|arm| matches!(arm.pattern, Pattern::Wildcard { .. }));

    if wildcards.next().is_none() {
        return Err(SemanticError::new(
            ErrorKind::NonExhaustiveMatch,
            "non-exhaustive match: add a wildcard `_` arm",
            m.span,
        ));
    }
    if let Some(second) = wildcards.next() {
        return Err(SemanticError::new(
            ErrorKind::UnreachableMatchArm,
            "unreachable match arm: a match may have only one wildcard `_` arm",
            second.pattern.span(),
        ));
    }
    Ok(())
}

/// Arms that can never be selected: anything after the wildcard, and repeats
/// of an earlier unguarded literal or variant pattern.
///
/// Extra wildcards are left to [`check_match_exhaustiveness`].
pub fn unreachable_arms<B>(m: &Match<B>) -> Vec<SemanticError> {
    let mut errors = Vec::new();
    let mut seen: Vec<PatternKey> = Vec::new();
    let mut after_wildcard = false;

    for arm in &m.arms {
        if let Pattern::Wildcard { .. } = arm.pattern {
            after_wildcard = true;
            continue;
        }
        if after_wildcard {
            errors.push(SemanticError::new(
                ErrorKind::UnreachableMatchArm,
                "unreachable match arm: the wildcard `_` arm must be last",
                arm.pattern.span(),
            ));
            continue;
        }
        if arm.guard.is_some() {
            continue;
        }
        let Some(key) = PatternKey::of(&arm.pattern) else {
            continue;
        };
        if seen.contains(&key) {
            errors.push(SemanticError::new(
                ErrorKind::UnreachableMatchArm,
                format!("unreachable match arm: duplicate pattern `{key}`"),
                arm.pattern.span(),
            ));
        } else {
            seen.push(key);
        }
    }
    errors
}

/// Comparable identity of a pattern that matches one fixed value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PatternKey {
    Literal(Literal),
    Variant(String, String),
}

impl PatternKey {
    pub(crate) fn of(p: &Pattern) -> Option<Self> {
        match p {
            Pattern::Literal { value, .. } => Some(PatternKey::Literal(value.clone())),
            Pattern::Variant { ty, variant, .. } => {
                Some(PatternKey::Variant(ty.node.clone(), variant.node.clone()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKey::Literal(lit) => write!(f, "{lit}"),
            PatternKey::Variant(ty, v) => write!(f, "{ty}::{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::RequirementInfo;
    use crate::types::Type;
    use yuho_ast::build::*;
    use yuho_ast::{Span, Stmt};

    fn test_info(reqs: &[(&str, Type)]) -> LegalTestInfo {
        LegalTestInfo {
            name: "Cheating".into(),
            span: Span::default(),
            requirements: reqs
                .iter()
                .map(|(n, ty)| RequirementInfo {
                    name: n.to_string(),
                    ty: ty.clone(),
                    span: Span::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn non_boolean_requirement_is_named() {
        let info = test_info(&[("deception", Type::BOOL), ("amount", Type::INT)]);
        let errs = evaluate_test_definition(&info).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].kind,
            ErrorKind::NonBooleanRequirement("amount".into())
        );
    }

    #[test]
    fn all_boolean_requirements_pass() {
        let info = test_info(&[("deception", Type::BOOL), ("inducement", Type::BOOL)]);
        assert!(evaluate_test_definition(&info).is_ok());
        assert_eq!(info.conjunction().collect::<Vec<_>>(), ["deception", "inducement"]);
    }

    #[test]
    fn missing_wildcard_is_non_exhaustive() {
        let Stmt::Match(m) = match_stmt(var("x"), vec![stmt_arm(lit_pat(Literal::Int(1)), vec![])])
        else {
            unreachable!()
        };
        let err = check_match_exhaustiveness(&m).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonExhaustiveMatch);
    }

    #[test]
    fn arms_after_wildcard_and_duplicates_are_unreachable() {
        let Stmt::Match(m) = match_stmt(
            var("x"),
            vec![
                stmt_arm(lit_pat(Literal::Int(1)), vec![]),
                stmt_arm(lit_pat(Literal::Int(1)), vec![]),
                stmt_arm(wildcard(), vec![]),
                stmt_arm(lit_pat(Literal::Int(2)), vec![]),
            ],
        ) else {
            unreachable!()
        };
        assert!(check_match_exhaustiveness(&m).is_ok());
        let errs = unreachable_arms(&m);
        assert_eq!(errs.len(), 2);
        assert!(errs[0].message.contains("duplicate"));
        assert!(errs[1].message.contains("last"));
    }
}
