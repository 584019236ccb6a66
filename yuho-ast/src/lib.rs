#![forbid(unsafe_code)]

//! Parsed-program interface for the statute DSL.
//!
//! The parser lives outside this workspace; it hands over a [`Program`] built
//! from these nodes. Nothing here re-parses text.

use std::fmt;

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

pub mod build;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

/// Byte range plus the line/column range it covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
    pub start: LineCol,
    pub end: LineCol,
}

impl Span {
    pub fn new(offset: usize, len: usize, start: LineCol, end: LineCol) -> Self {
        Self {
            offset,
            len,
            start,
            end,
        }
    }

    /// A span on a single line, columns counted from 1.
    pub fn on_line(line: u32, column: u32, offset: usize, len: usize) -> Self {
        let width = u32::try_from(len).unwrap_or(u32::MAX);
        Self {
            offset,
            len,
            start: LineCol { line, column },
            end: LineCol {
                line,
                column: column.saturating_add(width),
            },
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.offset.into(), span.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub type Ident = Spanned<String>;

impl Ident {
    pub fn as_str(&self) -> &str {
        &self.node
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// File or module name the parser read this program from.
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Struct(StructDef),
    Enum(EnumDef),
    TypeAlias(TypeAliasDef),
    LegalTest(LegalTestDef),
    Principle(PrincipleDef),
    Function(FunctionDef),
    Declaration(LetStmt),
    Scope(ScopeDef),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Struct(s) => s.span,
            Item::Enum(e) => e.span,
            Item::TypeAlias(a) => a.span,
            Item::LegalTest(t) => t.span,
            Item::Principle(p) => p.span,
            Item::Function(f) => f.span,
            Item::Declaration(d) => d.span,
            Item::Scope(s) => s.span,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Item::Struct(s) => &s.name,
            Item::Enum(e) => &e.name,
            Item::TypeAlias(a) => &a.name,
            Item::LegalTest(t) => &t.name,
            Item::Principle(p) => &p.name,
            Item::Function(f) => &f.name,
            Item::Declaration(d) => &d.name,
            Item::Scope(s) => &s.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub parent: Option<Ident>,
    pub fields: Vec<FieldDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
    /// Predicate over the field's own value, referenced by the field name.
    pub constraint: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub span: Span,
    pub name: Ident,
    pub variants: Vec<Ident>,
    pub mutually_exclusive: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDef {
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub target: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegalTestDef {
    pub span: Span,
    pub name: Ident,
    pub requirements: Vec<Requirement>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrincipleDef {
    pub span: Span,
    pub name: Ident,
    pub body: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub params: Vec<Param>,
    pub ret: TypeExpr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeDef {
    pub span: Span,
    pub name: Ident,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Return(ReturnStmt),
    If(IfStmt),
    Match(MatchStmt),
    Expr(Expr),
    Pass(Span),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LetStmt {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub span: Span,
    pub target: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub span: Span,
    pub cond: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

/// `match` over a scrutinee; `B` is the arm body (an expression or a block).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match<B> {
    pub span: Span,
    pub scrutinee: Box<Expr>,
    pub arms: Vec<MatchArm<B>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchArm<B> {
    pub span: Span,
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: B,
}

pub type MatchExpr = Match<Expr>;
pub type MatchStmt = Match<Block>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Wildcard { span: Span },
    Literal { span: Span, value: Literal },
    Variant { span: Span, ty: Ident, variant: Ident },
    Binding(Ident),
    /// `satisfies LegalTestName`
    Satisfies { span: Span, test: Ident },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Wildcard { span }
            | Pattern::Literal { span, .. }
            | Pattern::Variant { span, .. }
            | Pattern::Satisfies { span, .. } => *span,
            Pattern::Binding(id) => id.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Ident),
    /// `Enum::Variant`
    Variant {
        ty: Ident,
        variant: Ident,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        member: Ident,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    /// `TypeName { field: value, ... }`
    StructLit {
        name: Ident,
        fields: Vec<(Ident, Expr)>,
    },
    Match(Box<MatchExpr>),
    /// `subject satisfies LegalTestName`
    Satisfies {
        test: Ident,
        subject: Box<Expr>,
    },
    Quantifier {
        kind: QuantKind,
        var: Ident,
        ty: TypeExpr,
        body: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantKind {
    Forall,
    Exists,
}

impl QuantKind {
    pub fn keyword(self) -> &'static str {
        match self {
            QuantKind::Forall => "forall",
            QuantKind::Exists => "exists",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Money(f64),
    Percent(f64),
    /// Date text as written, e.g. `01-01-2020`.
    Date(String),
    /// Duration text as written, e.g. `1y2m3d`.
    Duration(String),
    Pass,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Money(x) => write!(f, "${x}"),
            Literal::Percent(x) => write!(f, "{x}%"),
            Literal::Date(d) => write!(f, "{d}"),
            Literal::Duration(d) => write!(f, "{d}"),
            Literal::Pass => write!(f, "pass"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
    Implies,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "=>",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Implies)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub span: Span,
    pub kind: TypeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Primitive(Primitive),
    /// A declared struct, enum or alias, with type arguments for generics.
    Named {
        name: Ident,
        args: Vec<TypeExpr>,
    },
    /// A type parameter such as `T`.
    Var(Ident),
    /// `BoundedInt<lower, upper>` style range over a numeric base.
    Refinement {
        base: Box<TypeExpr>,
        lower: Option<i64>,
        upper: Option<i64>,
    },
    Citation {
        section: String,
        subsection: String,
        act: String,
    },
    Temporal {
        inner: Box<TypeExpr>,
        valid_from: Option<String>,
        valid_until: Option<String>,
    },
    Array(Box<TypeExpr>),
    /// `Positive<T>`: strictly above zero.
    Positive(Box<TypeExpr>),
    /// `NonEmpty<T>` over strings and arrays.
    NonEmpty(Box<TypeExpr>),
    /// A date strictly between the optional `after` and `before` dates.
    ValidDate {
        after: Option<String>,
        before: Option<String>,
    },
    Union(Box<TypeExpr>, Box<TypeExpr>),
    /// `money<USD>`.
    MoneyWithCurrency(String),
}

impl TypeExpr {
    /// Canonical source-like rendering; spans do not take part.
    pub fn display(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(p) => p.as_str().to_string(),
            TypeKind::Named { name, args } => {
                if args.is_empty() {
                    name.node.clone()
                } else {
                    let args_s = args
                        .iter()
                        .map(|a| a.display())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}<{args_s}>", name.node)
                }
            }
            TypeKind::Var(v) => v.node.clone(),
            TypeKind::Refinement { base, lower, upper } => {
                let lo = lower.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
                let hi = upper.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
                format!("{}[{lo}..{hi}]", base.display())
            }
            TypeKind::Citation {
                section,
                subsection,
                act,
            } => format!("Citation<{section:?}, {subsection:?}, {act:?}>"),
            TypeKind::Temporal {
                inner,
                valid_from,
                valid_until,
            } => {
                let from = valid_from.as_deref().unwrap_or("_");
                let until = valid_until.as_deref().unwrap_or("_");
                format!("Temporal<{}, {from}, {until}>", inner.display())
            }
            TypeKind::Array(inner) => format!("[{}]", inner.display()),
            TypeKind::Positive(inner) => format!("Positive<{}>", inner.display()),
            TypeKind::NonEmpty(inner) => format!("NonEmpty<{}>", inner.display()),
            TypeKind::ValidDate { after, before } => format!(
                "ValidDate<{}, {}>",
                after.as_deref().unwrap_or("_"),
                before.as_deref().unwrap_or("_")
            ),
            TypeKind::Union(a, b) => format!("{} | {}", a.display(), b.display()),
            TypeKind::MoneyWithCurrency(code) => format!("money<{code}>"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Int,
    Float,
    Bool,
    String,
    Money,
    Percent,
    Date,
    Duration,
    Pass,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Money => "money",
            Primitive::Percent => "percent",
            Primitive::Date => "date",
            Primitive::Duration => "duration",
            Primitive::Pass => "pass",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Primitive::Int,
            "float" => Primitive::Float,
            "bool" => Primitive::Bool,
            "string" => Primitive::String,
            "money" => Primitive::Money,
            "percent" => Primitive::Percent,
            "date" => Primitive::Date,
            "duration" => Primitive::Duration,
            "pass" => Primitive::Pass,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Primitive::Int | Primitive::Float | Primitive::Money | Primitive::Percent
        )
    }
}
