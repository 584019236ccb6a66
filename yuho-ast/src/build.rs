//! Span-free constructors for assembling programs by hand.
//!
//! Every node gets [`Span::default`]; tests and tools that need real
//! locations set `span` fields afterwards.

use crate::*;

pub fn sp() -> Span {
    Span::default()
}

pub fn ident(name: &str) -> Ident {
    Spanned::new(sp(), name.to_string())
}

pub fn program(name: &str, items: Vec<Item>) -> Program {
    Program {
        name: name.to_string(),
        items,
    }
}

// ---- types ----

pub fn ty(kind: TypeKind) -> TypeExpr {
    TypeExpr { span: sp(), kind }
}

pub fn prim(p: Primitive) -> TypeExpr {
    ty(TypeKind::Primitive(p))
}

pub fn int_ty() -> TypeExpr {
    prim(Primitive::Int)
}

pub fn bool_ty() -> TypeExpr {
    prim(Primitive::Bool)
}

pub fn string_ty() -> TypeExpr {
    prim(Primitive::String)
}

pub fn named(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    ty(TypeKind::Named {
        name: ident(name),
        args,
    })
}

pub fn ty_var(name: &str) -> TypeExpr {
    ty(TypeKind::Var(ident(name)))
}

pub fn refined(base: TypeExpr, lower: Option<i64>, upper: Option<i64>) -> TypeExpr {
    ty(TypeKind::Refinement {
        base: Box::new(base),
        lower,
        upper,
    })
}

pub fn citation(section: &str, subsection: &str, act: &str) -> TypeExpr {
    ty(TypeKind::Citation {
        section: section.to_string(),
        subsection: subsection.to_string(),
        act: act.to_string(),
    })
}

pub fn temporal(inner: TypeExpr, valid_from: Option<&str>, valid_until: Option<&str>) -> TypeExpr {
    ty(TypeKind::Temporal {
        inner: Box::new(inner),
        valid_from: valid_from.map(str::to_string),
        valid_until: valid_until.map(str::to_string),
    })
}

pub fn positive(inner: TypeExpr) -> TypeExpr {
    ty(TypeKind::Positive(Box::new(inner)))
}

pub fn non_empty(inner: TypeExpr) -> TypeExpr {
    ty(TypeKind::NonEmpty(Box::new(inner)))
}

pub fn valid_date(after: Option<&str>, before: Option<&str>) -> TypeExpr {
    ty(TypeKind::ValidDate {
        after: after.map(str::to_string),
        before: before.map(str::to_string),
    })
}

pub fn union(a: TypeExpr, b: TypeExpr) -> TypeExpr {
    ty(TypeKind::Union(Box::new(a), Box::new(b)))
}

pub fn money_in(code: &str) -> TypeExpr {
    ty(TypeKind::MoneyWithCurrency(code.to_string()))
}

pub fn array(inner: TypeExpr) -> TypeExpr {
    ty(TypeKind::Array(Box::new(inner)))
}

// ---- declarations ----

pub fn field(name: &str, ty: TypeExpr) -> FieldDef {
    FieldDef {
        span: sp(),
        name: ident(name),
        ty,
        constraint: None,
    }
}

impl FieldDef {
    pub fn with_constraint(mut self, constraint: Expr) -> Self {
        self.constraint = Some(constraint);
        self
    }
}

pub fn struct_def(name: &str, fields: Vec<FieldDef>) -> StructDef {
    StructDef {
        span: sp(),
        name: ident(name),
        type_params: Vec::new(),
        parent: None,
        fields,
    }
}

impl StructDef {
    pub fn generic(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| ident(p)).collect();
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(ident(parent));
        self
    }
}

pub fn enum_def(name: &str, variants: &[&str]) -> EnumDef {
    EnumDef {
        span: sp(),
        name: ident(name),
        variants: variants.iter().map(|v| ident(v)).collect(),
        mutually_exclusive: false,
    }
}

impl EnumDef {
    pub fn exclusive(mut self) -> Self {
        self.mutually_exclusive = true;
        self
    }
}

pub fn alias(name: &str, params: &[&str], target: TypeExpr) -> TypeAliasDef {
    TypeAliasDef {
        span: sp(),
        name: ident(name),
        type_params: params.iter().map(|p| ident(p)).collect(),
        target,
    }
}

pub fn legal_test(name: &str, requirements: Vec<(&str, TypeExpr)>) -> LegalTestDef {
    LegalTestDef {
        span: sp(),
        name: ident(name),
        requirements: requirements
            .into_iter()
            .map(|(n, ty)| Requirement {
                span: sp(),
                name: ident(n),
                ty,
            })
            .collect(),
    }
}

pub fn principle(name: &str, body: Expr) -> PrincipleDef {
    PrincipleDef {
        span: sp(),
        name: ident(name),
        body,
    }
}

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        span: sp(),
        name: ident(name),
        ty,
    }
}

pub fn function(name: &str, params: Vec<Param>, ret: TypeExpr, body: Vec<Stmt>) -> FunctionDef {
    FunctionDef {
        span: sp(),
        name: ident(name),
        type_params: Vec::new(),
        params,
        ret,
        body: block(body),
    }
}

pub fn scope(name: &str, items: Vec<Item>) -> ScopeDef {
    ScopeDef {
        span: sp(),
        name: ident(name),
        items,
    }
}

// ---- statements ----

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block { span: sp(), stmts }
}

pub fn let_stmt(name: &str, ty: TypeExpr, value: Expr) -> LetStmt {
    LetStmt {
        span: sp(),
        name: ident(name),
        ty,
        value,
    }
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        span: sp(),
        target: ident(target),
        value,
    })
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(ReturnStmt { span: sp(), value })
}

pub fn if_stmt(cond: Expr, then_stmts: Vec<Stmt>, else_stmts: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If(IfStmt {
        span: sp(),
        cond,
        then_block: block(then_stmts),
        else_block: else_stmts.map(block),
    })
}

pub fn match_stmt(scrutinee: Expr, arms: Vec<MatchArm<Block>>) -> Stmt {
    Stmt::Match(Match {
        span: sp(),
        scrutinee: Box::new(scrutinee),
        arms,
    })
}

pub fn arm<B>(pattern: Pattern, body: B) -> MatchArm<B> {
    MatchArm {
        span: sp(),
        pattern,
        guard: None,
        body,
    }
}

pub fn stmt_arm(pattern: Pattern, stmts: Vec<Stmt>) -> MatchArm<Block> {
    arm(pattern, block(stmts))
}

impl<B> MatchArm<B> {
    pub fn guarded(mut self, guard: Expr) -> Self {
        self.guard = Some(guard);
        self
    }
}

// ---- patterns ----

pub fn wildcard() -> Pattern {
    Pattern::Wildcard { span: sp() }
}

pub fn lit_pat(value: Literal) -> Pattern {
    Pattern::Literal { span: sp(), value }
}

pub fn variant_pat(ty: &str, variant: &str) -> Pattern {
    Pattern::Variant {
        span: sp(),
        ty: ident(ty),
        variant: ident(variant),
    }
}

pub fn satisfies_pat(test: &str) -> Pattern {
    Pattern::Satisfies {
        span: sp(),
        test: ident(test),
    }
}

// ---- expressions ----

pub fn expr(kind: ExprKind) -> Expr {
    Expr { span: sp(), kind }
}

pub fn var(name: &str) -> Expr {
    expr(ExprKind::Ident(ident(name)))
}

pub fn int(n: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Int(n)))
}

pub fn boolean(b: bool) -> Expr {
    expr(ExprKind::Literal(Literal::Bool(b)))
}

pub fn string(s: &str) -> Expr {
    expr(ExprKind::Literal(Literal::String(s.to_string())))
}

pub fn date(text: &str) -> Expr {
    expr(ExprKind::Literal(Literal::Date(text.to_string())))
}

pub fn money(amount: f64) -> Expr {
    expr(ExprKind::Literal(Literal::Money(amount)))
}

pub fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
    expr(ExprKind::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn not(e: Expr) -> Expr {
    expr(ExprKind::Unary {
        op: UnaryOp::Not,
        expr: Box::new(e),
    })
}

pub fn neg(e: Expr) -> Expr {
    expr(ExprKind::Unary {
        op: UnaryOp::Neg,
        expr: Box::new(e),
    })
}

pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: ident(callee),
        args,
    })
}

pub fn member(base: Expr, name: &str) -> Expr {
    expr(ExprKind::Member {
        base: Box::new(base),
        member: ident(name),
    })
}

pub fn variant(ty: &str, variant: &str) -> Expr {
    expr(ExprKind::Variant {
        ty: ident(ty),
        variant: ident(variant),
    })
}

pub fn struct_lit(name: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::StructLit {
        name: ident(name),
        fields: fields.into_iter().map(|(n, e)| (ident(n), e)).collect(),
    })
}

pub fn match_expr(scrutinee: Expr, arms: Vec<MatchArm<Expr>>) -> Expr {
    expr(ExprKind::Match(Box::new(Match {
        span: sp(),
        scrutinee: Box::new(scrutinee),
        arms,
    })))
}

pub fn satisfies(subject: Expr, test: &str) -> Expr {
    expr(ExprKind::Satisfies {
        test: ident(test),
        subject: Box::new(subject),
    })
}

pub fn forall(var: &str, ty: TypeExpr, body: Expr) -> Expr {
    quant(QuantKind::Forall, var, ty, body)
}

pub fn exists(var: &str, ty: TypeExpr, body: Expr) -> Expr {
    quant(QuantKind::Exists, var, ty, body)
}

fn quant(kind: QuantKind, var: &str, ty: TypeExpr, body: Expr) -> Expr {
    expr(ExprKind::Quantifier {
        kind,
        var: ident(var),
        ty,
        body: Box::new(body),
    })
}

/// `depth` nested `forall`s over `int`, innermost body `x_n >= 0`.
pub fn nested_foralls(depth: usize) -> Expr {
    let mut body = if depth == 0 {
        boolean(true)
    } else {
        bin(var(&format!("x{}", depth - 1)), BinOp::Ge, int(0))
    };
    for i in (0..depth).rev() {
        body = forall(&format!("x{i}"), int_ty(), body);
    }
    body
}
