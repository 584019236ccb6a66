#![forbid(unsafe_code)]

//! Plain-English rendering of principles for audit output.

use yuho_ast::{
    BinOp, Expr, ExprKind, Pattern, Primitive, PrincipleDef, QuantKind, TypeExpr, TypeKind, UnaryOp,
};

/// Renders `principle` as indented English, one quantifier per line.
///
/// ```text
/// Principle 'AllPositive' states that:
///
///   For all x of type integer,
///     x > 0
/// ```
pub fn explain_principle(principle: &PrincipleDef) -> String {
    format!(
        "Principle '{}' states that:\n\n{}",
        principle.name.node,
        explain(&principle.body, 0)
    )
}

fn explain(e: &Expr, depth: usize) -> String {
    match &e.kind {
        ExprKind::Quantifier {
            kind,
            var,
            ty,
            body,
        } => {
            let depth = depth + 1;
            let indent = "  ".repeat(depth);
            let head = match kind {
                QuantKind::Forall => format!("For all {} of type {},", var.node, type_name(ty)),
                QuantKind::Exists => {
                    format!("There exists a {} of type {} such that", var.node, type_name(ty))
                }
            };
            format!("{indent}{head}\n{}", explain(body, depth))
        }
        _ => format!("{}{}", "  ".repeat(depth + 1), inline(e)),
    }
}

fn inline(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Literal(lit) => lit.to_string(),
        ExprKind::Ident(id) => id.node.clone(),
        ExprKind::Variant { ty, variant } => format!("{}::{}", ty.node, variant.node),
        ExprKind::Unary { op, expr } => match op {
            UnaryOp::Not => format!("not {}", operand(expr)),
            UnaryOp::Neg => format!("-{}", operand(expr)),
        },
        ExprKind::Binary { left, op, right } => {
            format!("{} {} {}", operand(left), op_name(*op), operand(right))
        }
        ExprKind::Member { base, member } => format!("{}.{}", inline(base), member.node),
        ExprKind::Call { callee, args } => {
            let args = args.iter().map(inline).collect::<Vec<_>>().join(", ");
            format!("{}({args})", callee.node)
        }
        ExprKind::StructLit { name, fields } => {
            let fields = fields
                .iter()
                .map(|(f, v)| format!("{}: {}", f.node, inline(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {{ {fields} }}", name.node)
        }
        ExprKind::Match(m) => {
            let arms = m
                .arms
                .iter()
                .map(|arm| format!("{} gives {}", pattern(&arm.pattern), inline(&arm.body)))
                .collect::<Vec<_>>()
                .join("; ");
            format!("depending on {}: {arms}", inline(&m.scrutinee))
        }
        ExprKind::Satisfies { test, subject } => {
            format!("{} satisfies {}", inline(subject), test.node)
        }
        ExprKind::Quantifier {
            kind,
            var,
            ty,
            body,
        } => match kind {
            QuantKind::Forall => {
                format!("for all {} of type {}, {}", var.node, type_name(ty), inline(body))
            }
            QuantKind::Exists => format!(
                "there exists a {} of type {} such that {}",
                var.node,
                type_name(ty),
                inline(body)
            ),
        },
    }
}

/// Nested binaries are parenthesized.
fn operand(e: &Expr) -> String {
    match e.kind {
        ExprKind::Binary { .. } => format!("({})", inline(e)),
        _ => inline(e),
    }
}

fn pattern(p: &Pattern) -> String {
    match p {
        Pattern::Wildcard { .. } => "otherwise".into(),
        Pattern::Literal { value, .. } => value.to_string(),
        Pattern::Variant { ty, variant, .. } => format!("{}::{}", ty.node, variant.node),
        Pattern::Binding(id) => id.node.clone(),
        Pattern::Satisfies { test, .. } => format!("satisfying {}", test.node),
    }
}

fn op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Implies => "implies",
        other => other.symbol(),
    }
}

fn type_name(ty: &TypeExpr) -> String {
    match &ty.kind {
        TypeKind::Primitive(p) => match p {
            Primitive::Int => "integer",
            Primitive::Bool => "boolean",
            Primitive::String => "string",
            Primitive::Float => "floating-point number",
            Primitive::Money => "money",
            Primitive::Percent => "percentage",
            Primitive::Date => "date",
            Primitive::Duration => "duration",
            Primitive::Pass => "pass",
        }
        .to_string(),
        TypeKind::Refinement {
            base,
            lower: Some(lo),
            upper: Some(hi),
        } => format!("{} between {lo} and {hi}", type_name(base)),
        TypeKind::Refinement {
            base,
            lower: Some(lo),
            upper: None,
        } => format!("{} of at least {lo}", type_name(base)),
        TypeKind::Refinement {
            base,
            lower: None,
            upper: Some(hi),
        } => format!("{} of at most {hi}", type_name(base)),
        TypeKind::Refinement { base, .. } => type_name(base),
        TypeKind::Positive(inner) => format!("positive {}", type_name(inner)),
        TypeKind::NonEmpty(inner) => format!("non-empty {}", type_name(inner)),
        TypeKind::MoneyWithCurrency(code) => format!("money in {code}"),
        TypeKind::Union(a, b) => format!("{} or {}", type_name(a), type_name(b)),
        _ => ty.display(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yuho_ast::build::*;

    #[test]
    fn all_positive_reads_as_english() {
        let p = principle(
            "AllPositive",
            forall("x", int_ty(), bin(var("x"), BinOp::Gt, int(0))),
        );
        assert_eq!(
            explain_principle(&p),
            "Principle 'AllPositive' states that:\n\n  For all x of type integer,\n    x > 0"
        );
    }

    #[test]
    fn nested_quantifiers_indent() {
        let p = principle(
            "SomeCase",
            forall(
                "n",
                int_ty(),
                exists("c", named("Case", vec![]), satisfies(var("c"), "Theft")),
            ),
        );
        let text = explain_principle(&p);
        assert!(text.contains("\n  For all n of type integer,\n"));
        assert!(text.contains("\n    There exists a c of type Case such that\n"));
        assert!(text.ends_with("\n      c satisfies Theft"));
    }

    #[test]
    fn connectives_use_words() {
        let body = bin(
            var("b"),
            BinOp::And,
            not(bin(var("b"), BinOp::Eq, boolean(false))),
        );
        let p = principle("Both", forall("b", bool_ty(), body));
        assert!(explain_principle(&p).ends_with("b and not (b == false)"));
    }

    #[test]
    fn bounded_types_mention_their_range() {
        let p = principle(
            "Adults",
            forall("age", refined(int_ty(), Some(18), Some(150)), bin(var("age"), BinOp::Ge, int(18))),
        );
        assert!(explain_principle(&p).contains("For all age of type integer between 18 and 150,"));
    }
}
