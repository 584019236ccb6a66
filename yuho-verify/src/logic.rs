#![forbid(unsafe_code)]

//! Solver-independent logical IR and its SMT-LIB2 rendering.

use std::fmt::{self, Write as _};

use serde::Serialize;
use yuho_ast::QuantKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Sort {
    Int,
    Real,
    Bool,
    String,
    /// Finite datatype declared from an enum.
    Enum(String),
    /// Declared with no interpretation (struct types).
    Uninterpreted(String),
}

impl Sort {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Int => f.write_str("Int"),
            Sort::Real => f.write_str("Real"),
            Sort::Bool => f.write_str("Bool"),
            Sort::String => f.write_str("String"),
            Sort::Enum(n) | Sort::Uninterpreted(n) => f.write_str(n),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CmpOp {
    Eq,
    Distinct,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn smt(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Distinct => "distinct",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// Integer division (`div`) on Int, `/` on Real.
    Div,
    Mod,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Term {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    /// Reference to a bound variable or declared constant, by symbol.
    Var(String),
    EnumVariant { sort: String, variant: String },
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    Cmp(CmpOp, Box<Term>, Box<Term>),
    /// `sort` decides `div` versus `/`.
    Arith {
        op: ArithOp,
        sort: Sort,
        left: Box<Term>,
        right: Box<Term>,
    },
    Neg(Box<Term>),
    ToReal(Box<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),
    /// Application of a declared (uninterpreted) function.
    Apply(String, Vec<Term>),
    Quant {
        kind: QuantKind,
        symbol: String,
        sort: Sort,
        body: Box<Term>,
    },
}

impl Term {
    pub fn not(t: Term) -> Term {
        Term::Not(Box::new(t))
    }

    pub fn cmp(op: CmpOp, l: Term, r: Term) -> Term {
        Term::Cmp(op, Box::new(l), Box::new(r))
    }

    pub fn implies(l: Term, r: Term) -> Term {
        Term::Implies(Box::new(l), Box::new(r))
    }

    /// `And` that flattens the trivial cases.
    pub fn and(mut terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::Bool(true),
            1 => terms.remove(0),
            _ => Term::And(terms),
        }
    }

    /// Number of nested quantifiers on the deepest path.
    pub fn quantifier_depth(&self) -> usize {
        match self {
            Term::Quant { body, .. } => 1 + body.quantifier_depth(),
            Term::Not(t) | Term::Neg(t) | Term::ToReal(t) => t.quantifier_depth(),
            Term::And(ts) | Term::Or(ts) | Term::Apply(_, ts) => {
                ts.iter().map(Term::quantifier_depth).max().unwrap_or(0)
            }
            Term::Implies(a, b) | Term::Cmp(_, a, b) => a.quantifier_depth().max(b.quantifier_depth()),
            Term::Arith { left, right, .. } => left.quantifier_depth().max(right.quantifier_depth()),
            Term::Ite(c, a, b) => c
                .quantifier_depth()
                .max(a.quantifier_depth())
                .max(b.quantifier_depth()),
            Term::Int(_)
            | Term::Real(_)
            | Term::Bool(_)
            | Term::Str(_)
            | Term::Var(_)
            | Term::EnumVariant { .. } => 0,
        }
    }

    fn write_smt(&self, out: &mut String) {
        match self {
            Term::Int(n) if *n < 0 => {
                let _ = write!(out, "(- {})", n.unsigned_abs());
            }
            Term::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Term::Real(x) => {
                let text = if x.fract() == 0.0 && x.is_finite() {
                    format!("{:.1}", x.abs())
                } else {
                    format!("{}", x.abs())
                };
                if *x < 0.0 {
                    let _ = write!(out, "(- {text})");
                } else {
                    out.push_str(&text);
                }
            }
            Term::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Term::Str(s) => {
                let _ = write!(out, "\"{}\"", s.replace('"', "\"\""));
            }
            Term::Var(s) => out.push_str(s),
            Term::EnumVariant { sort, variant } => out.push_str(&constructor(sort, variant)),
            Term::Not(t) => app(out, "not", [t.as_ref()]),
            Term::And(ts) => app(out, "and", ts),
            Term::Or(ts) => app(out, "or", ts),
            Term::Implies(a, b) => app(out, "=>", [a.as_ref(), b.as_ref()]),
            Term::Cmp(op, a, b) => app(out, op.smt(), [a.as_ref(), b.as_ref()]),
            Term::Arith {
                op,
                sort,
                left,
                right,
            } => {
                let name = match (op, sort) {
                    (ArithOp::Add, _) => "+",
                    (ArithOp::Sub, _) => "-",
                    (ArithOp::Mul, _) => "*",
                    (ArithOp::Div, Sort::Real) => "/",
                    (ArithOp::Div, _) => "div",
                    (ArithOp::Mod, _) => "mod",
                };
                app(out, name, [left.as_ref(), right.as_ref()]);
            }
            Term::Neg(t) => app(out, "-", [t.as_ref()]),
            Term::ToReal(t) => app(out, "to_real", [t.as_ref()]),
            Term::Ite(c, a, b) => app(out, "ite", [c.as_ref(), a.as_ref(), b.as_ref()]),
            Term::Apply(f, args) if args.is_empty() => out.push_str(f),
            Term::Apply(f, args) => app(out, f, args),
            Term::Quant {
                kind,
                symbol,
                sort,
                body,
            } => {
                let _ = write!(out, "({} (({symbol} {sort})) ", kind.keyword());
                body.write_smt(out);
                out.push(')');
            }
        }
    }

    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        self.write_smt(&mut out);
        out
    }
}

fn app<'t>(out: &mut String, head: &str, args: impl IntoIterator<Item = &'t Term>) {
    out.push('(');
    out.push_str(head);
    for a in args {
        out.push(' ');
        a.write_smt(out);
    }
    out.push(')');
}

/// Constructor symbol of an enum variant.
pub fn constructor(sort: &str, variant: &str) -> String {
    format!("{sort}.{variant}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SortDecl {
    Uninterpreted(String),
    Enum { name: String, variants: Vec<String> },
}

impl SortDecl {
    pub fn name(&self) -> &str {
        match self {
            SortDecl::Uninterpreted(n) | SortDecl::Enum { name: n, .. } => n,
        }
    }
}

/// A free constant of a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConstDecl {
    pub symbol: String,
    /// Name as written in the principle.
    pub name: String,
    pub sort: Sort,
    /// Refinement bounds, when the declared type carries them.
    pub lower: Option<i64>,
    pub upper: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FunDecl {
    pub name: String,
    pub params: Vec<Sort>,
    pub ret: Sort,
}

/// Declarations shared by a logical form and the queries built from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Signature {
    pub sorts: Vec<SortDecl>,
    pub functions: Vec<FunDecl>,
    pub constants: Vec<ConstDecl>,
}

impl Signature {
    pub fn add_sort(&mut self, decl: SortDecl) {
        if !self.sorts.iter().any(|s| s.name() == decl.name()) {
            self.sorts.push(decl);
        }
    }

    pub fn add_function(&mut self, decl: FunDecl) {
        if !self.functions.iter().any(|f| f.name == decl.name) {
            self.functions.push(decl);
        }
    }

    pub fn add_constant(&mut self, decl: ConstDecl) {
        if !self.constants.iter().any(|c| c.symbol == decl.symbol) {
            self.constants.push(decl);
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn enum_variants(&self, sort: &str) -> Option<&[String]> {
        self.sorts.iter().find_map(|s| match s {
            SortDecl::Enum { name, variants } if name == sort => Some(variants.as_slice()),
            _ => None,
        })
    }

    fn write_smt(&self, out: &mut String) {
        for s in &self.sorts {
            match s {
                SortDecl::Uninterpreted(n) => {
                    let _ = writeln!(out, "(declare-sort {n} 0)");
                }
                SortDecl::Enum { name, variants } => {
                    let ctors = variants
                        .iter()
                        .map(|v| format!("({})", constructor(name, v)))
                        .collect::<Vec<_>>()
                        .join(" ");
                    let _ = writeln!(out, "(declare-datatype {name} ({ctors}))");
                }
            }
        }
        for f in &self.functions {
            let params = f
                .params
                .iter()
                .map(Sort::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "(declare-fun {} ({params}) {})", f.name, f.ret);
        }
        for c in &self.constants {
            let _ = writeln!(out, "(declare-const {} {})", c.symbol, c.sort);
        }
    }
}

/// A translated principle: declarations, background assumptions from
/// constant declarations, and the formula itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogicalForm {
    pub principle: String,
    pub signature: Signature,
    pub assumptions: Vec<Term>,
    pub formula: Term,
    /// Advisory notes raised during translation (shadowed binders).
    pub warnings: Vec<String>,
}

impl LogicalForm {
    /// SMT-LIB2 text of the form, for audit output.
    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; principle {}", self.principle);
        self.signature.write_smt(&mut out);
        for a in &self.assumptions {
            let _ = writeln!(out, "(assert {})", a.to_smtlib());
        }
        let _ = writeln!(out, "(assert {})", self.formula.to_smtlib());
        out
    }
}

/// What a solver is asked: is the conjunction of `assertions` satisfiable?
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolverQuery {
    pub signature: Signature,
    pub assertions: Vec<Term>,
}

impl SolverQuery {
    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        self.signature.write_smt(&mut out);
        for a in &self.assertions {
            let _ = writeln!(out, "(assert {})", a.to_smtlib());
        }
        out
    }

    /// Complete script for an external solver process.
    pub fn to_script(&self) -> String {
        let mut out = self.to_smtlib();
        out.push_str("(check-sat)\n(get-model)\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_numbers_use_unary_minus() {
        assert_eq!(Term::Int(-5).to_smtlib(), "(- 5)");
        assert_eq!(Term::Real(-1.5).to_smtlib(), "(- 1.5)");
        assert_eq!(Term::Real(2.0).to_smtlib(), "2.0");
    }

    #[test]
    fn quantifier_rendering() {
        let t = Term::Quant {
            kind: QuantKind::Forall,
            symbol: "x".into(),
            sort: Sort::Int,
            body: Box::new(Term::cmp(CmpOp::Gt, Term::Var("x".into()), Term::Int(0))),
        };
        assert_eq!(t.to_smtlib(), "(forall ((x Int)) (> x 0))");
        assert_eq!(t.quantifier_depth(), 1);
    }

    #[test]
    fn integer_and_real_division() {
        let div = |sort| Term::Arith {
            op: ArithOp::Div,
            sort,
            left: Box::new(Term::Var("a".into())),
            right: Box::new(Term::Var("b".into())),
        };
        assert_eq!(div(Sort::Int).to_smtlib(), "(div a b)");
        assert_eq!(div(Sort::Real).to_smtlib(), "(/ a b)");
    }

    #[test]
    fn signature_declares_everything_once() {
        let mut sig = Signature::default();
        sig.add_sort(SortDecl::Enum {
            name: "Status".into(),
            variants: vec!["Active".into(), "Inactive".into()],
        });
        sig.add_sort(SortDecl::Uninterpreted("Case".into()));
        sig.add_sort(SortDecl::Uninterpreted("Case".into()));
        sig.add_function(FunDecl {
            name: "Case.amount".into(),
            params: vec![Sort::Uninterpreted("Case".into())],
            ret: Sort::Int,
        });
        let q = SolverQuery {
            signature: sig,
            assertions: vec![Term::Bool(true)],
        };
        let text = q.to_smtlib();
        assert_eq!(text.matches("declare-sort").count(), 1);
        assert!(text.contains("(declare-datatype Status ((Status.Active) (Status.Inactive)))"));
        assert!(text.contains("(declare-fun Case.amount (Case) Int)"));
        assert!(q.to_script().ends_with("(get-model)\n"));
    }
}
