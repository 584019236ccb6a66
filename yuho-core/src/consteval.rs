//! Folding of constant expressions, for refinement bounds and field constraints.

use yuho_ast::{BinOp, Expr, ExprKind, Literal, UnaryOp};

#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(n) => Some(*n as f64),
            ConstValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

/// Folds `expr`; `env` supplies values for identifiers. `None` means not constant
/// (or an arithmetic fault such as overflow or division by zero).
pub fn eval(expr: &Expr, env: &dyn Fn(&str) -> Option<ConstValue>) -> Option<ConstValue> {
    match &expr.kind {
        ExprKind::Literal(lit) => match lit {
            Literal::Int(n) => Some(ConstValue::Int(*n)),
            Literal::Float(x) | Literal::Money(x) | Literal::Percent(x) => {
                Some(ConstValue::Float(*x))
            }
            Literal::Bool(b) => Some(ConstValue::Bool(*b)),
            Literal::String(s) => Some(ConstValue::Str(s.clone())),
            _ => None,
        },
        ExprKind::Ident(id) => env(&id.node),
        ExprKind::Unary { op, expr } => match (op, eval(expr, env)?) {
            (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
            (UnaryOp::Neg, ConstValue::Int(n)) => n.checked_neg().map(ConstValue::Int),
            (UnaryOp::Neg, ConstValue::Float(x)) => Some(ConstValue::Float(-x)),
            _ => None,
        },
        ExprKind::Binary { left, op, right } => {
            let l = eval(left, env)?;
            // Short-circuit so `false && <non-constant>` still folds.
            match (op, &l) {
                (BinOp::And, ConstValue::Bool(false)) => return Some(ConstValue::Bool(false)),
                (BinOp::Or, ConstValue::Bool(true)) => return Some(ConstValue::Bool(true)),
                (BinOp::Implies, ConstValue::Bool(false)) => {
                    return Some(ConstValue::Bool(true));
                }
                _ => {}
            }
            let r = eval(right, env)?;
            binary(*op, l, r)
        }
        _ => None,
    }
}

fn binary(op: BinOp, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    match (op, l, r) {
        (BinOp::And, Bool(a), Bool(b)) => Some(Bool(a && b)),
        (BinOp::Or, Bool(a), Bool(b)) => Some(Bool(a || b)),
        (BinOp::Implies, Bool(a), Bool(b)) => Some(Bool(!a || b)),

        (BinOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Int),
        (BinOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map(Int),
        (BinOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map(Int),
        (BinOp::Div, Int(a), Int(b)) => a.checked_div(b).map(Int),
        (BinOp::Mod, Int(a), Int(b)) => a.checked_rem(b).map(Int),

        (BinOp::Eq, Str(a), Str(b)) => Some(Bool(a == b)),
        (BinOp::Ne, Str(a), Str(b)) => Some(Bool(a != b)),
        (BinOp::Eq, Bool(a), Bool(b)) => Some(Bool(a == b)),
        (BinOp::Ne, Bool(a), Bool(b)) => Some(Bool(a != b)),

        (op, Int(a), Int(b)) if op.is_comparison() => Some(Bool(compare(op, a.cmp(&b)))),
        (op, l, r) => {
            let (a, b) = (l.as_f64()?, r.as_f64()?);
            if op.is_comparison() {
                let ord = a.partial_cmp(&b)?;
                return Some(Bool(compare(op, ord)));
            }
            let v = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div if b != 0.0 => a / b,
                _ => return None,
            };
            Some(Float(v))
        }
    }
}

fn compare(op: BinOp, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinOp::Eq => ord == Equal,
        BinOp::Ne => ord != Equal,
        BinOp::Lt => ord == Less,
        BinOp::Gt => ord == Greater,
        BinOp::Le => ord != Greater,
        BinOp::Ge => ord != Less,
        _ => false,
    }
}
