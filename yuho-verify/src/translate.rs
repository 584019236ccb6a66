#![forbid(unsafe_code)]
#![allow(unused_assignments)]

//! Quantifier Translator: principle expressions to the logical IR.

use std::collections::{HashMap, HashSet};

use chrono::Datelike;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use yuho_ast::{
    BinOp, Expr, ExprKind, Ident, Item, LetStmt, Literal, Match, Pattern, Primitive,
    PrincipleDef, QuantKind, Span, TypeExpr, TypeKind, UnaryOp,
};
use yuho_core::domain::parse_date;
use yuho_core::env::TypeDefKind;
use yuho_core::{Type, TypeEnv, TypedProgram};

use crate::logic::{
    ArithOp, CmpOp, ConstDecl, FunDecl, LogicalForm, Signature, Sort, SortDecl, Term,
};
use crate::options::MAX_QUANTIFIER_DEPTH;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TranslationErrorKind {
    QuantifierDepthExceeded { depth: usize, limit: usize },
    UnboundQuantifierType(String),
    UnboundVariable(String),
    UnknownLegalTest(String),
    SortMismatch { expected: String, got: String },
    Unsupported(String),
}

impl TranslationErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            TranslationErrorKind::QuantifierDepthExceeded { .. } => "QuantifierDepthExceededError",
            TranslationErrorKind::UnboundQuantifierType(_) => "UnboundQuantifierType",
            TranslationErrorKind::UnboundVariable(_) => "UnboundVariableError",
            TranslationErrorKind::UnknownLegalTest(_) => "UnknownLegalTestError",
            TranslationErrorKind::SortMismatch { .. } => "SortMismatchError",
            TranslationErrorKind::Unsupported(_) => "UnsupportedError",
        }
    }
}

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq, Serialize)]
#[error("translation error: {message}")]
#[diagnostic(code(yuho::verify))]
pub struct TranslationError {
    pub kind: TranslationErrorKind,
    pub message: String,
    #[label]
    pub span: Span,
}

impl TranslationError {
    pub fn new(kind: TranslationErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

type Lowered = Result<(Term, Sort), TranslationError>;

/// Lowers principles against one Type Environment.
///
/// Holds no per-principle state; every [`QuantifierTranslator::translate`]
/// call starts from an empty scope.
#[derive(Clone, Debug)]
pub struct QuantifierTranslator<'a> {
    env: &'a TypeEnv,
    globals: Vec<&'a LetStmt>,
    max_depth: usize,
}

impl<'a> QuantifierTranslator<'a> {
    pub fn new(env: &'a TypeEnv) -> Self {
        Self {
            env,
            globals: Vec::new(),
            max_depth: MAX_QUANTIFIER_DEPTH,
        }
    }

    /// Also makes the program's `let` declarations available as constants.
    pub fn for_program(program: &'a TypedProgram) -> Self {
        fn walk<'p>(items: &'p [Item], out: &mut Vec<&'p LetStmt>) {
            for item in items {
                match item {
                    Item::Declaration(l) => out.push(l),
                    Item::Scope(s) => walk(&s.items, out),
                    _ => {}
                }
            }
        }
        let mut globals = Vec::new();
        walk(&program.program.items, &mut globals);
        Self {
            globals,
            ..Self::new(&program.env)
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[tracing::instrument(skip_all, fields(principle = %principle.name.node))]
    pub fn translate(&self, principle: &PrincipleDef) -> Result<LogicalForm, TranslationError> {
        let mut lw = Lowering {
            tr: self,
            sig: Signature::default(),
            scopes: Vec::new(),
            used: self.globals.iter().map(|g| g.name.node.clone()).collect(),
            declared_globals: HashSet::new(),
            struct_sorts: HashMap::new(),
            assumptions: Vec::new(),
            warnings: Vec::new(),
        };
        let (formula, sort) = lw.term(&principle.body, 0)?;
        if sort != Sort::Bool {
            return Err(TranslationError::new(
                TranslationErrorKind::SortMismatch {
                    expected: "Bool".into(),
                    got: sort.to_string(),
                },
                format!("principle `{}` is not a boolean statement", principle.name.node),
                principle.body.span,
            ));
        }
        tracing::debug!(
            depth = formula.quantifier_depth(),
            constants = lw.sig.constants.len(),
            "principle translated"
        );
        Ok(LogicalForm {
            principle: principle.name.node.clone(),
            signature: lw.sig,
            assumptions: lw.assumptions,
            formula,
            warnings: lw.warnings,
        })
    }
}

/// A name visible in the principle body.
struct Bound {
    name: String,
    term: Term,
    sort: Sort,
}

struct Lowering<'t, 'a> {
    tr: &'t QuantifierTranslator<'a>,
    sig: Signature,
    scopes: Vec<Bound>,
    /// Every symbol handed out so far, plus global names.
    used: HashSet<String>,
    declared_globals: HashSet<String>,
    /// Uninterpreted sort name to the struct type it stands for.
    struct_sorts: HashMap<String, (String, Vec<Type>)>,
    assumptions: Vec<Term>,
    warnings: Vec<String>,
}

/// Refinement bounds of a resolved type.
type Bounds = (Option<i64>, Option<i64>);

impl Lowering<'_, '_> {
    fn term(&mut self, e: &Expr, depth: usize) -> Lowered {
        match &e.kind {
            ExprKind::Literal(lit) => self.literal(lit, e.span),
            ExprKind::Ident(id) => self.ident(id),
            ExprKind::Variant { ty, variant } => self.variant(ty, variant, e.span),
            ExprKind::Unary { op, expr } => {
                let (t, s) = self.term(expr, depth)?;
                match op {
                    UnaryOp::Not => {
                        expect_sort(&Sort::Bool, &s, expr.span)?;
                        Ok((Term::not(t), Sort::Bool))
                    }
                    UnaryOp::Neg => {
                        if !s.is_numeric() {
                            return Err(mismatch("Int or Real", &s, expr.span));
                        }
                        Ok((Term::Neg(Box::new(t)), s))
                    }
                }
            }
            ExprKind::Binary { left, op, right } => {
                let l = self.term(left, depth)?;
                let r = self.term(right, depth)?;
                binary(l, *op, r, left.span, right.span)
            }
            ExprKind::Member { base, member } => self.member(base, member, depth),
            ExprKind::Call { callee, args } => self.call(callee, args, depth),
            ExprKind::StructLit { name, .. } => Err(TranslationError::new(
                TranslationErrorKind::Unsupported("struct literal".into()),
                format!("struct literal `{}` cannot appear in a principle", name.node),
                e.span,
            )),
            ExprKind::Match(m) => self.match_expr(m, depth),
            ExprKind::Satisfies { test, subject } => {
                let (subject, sort) = self.term(subject, depth)?;
                Ok((self.satisfies(test, subject, &sort)?, Sort::Bool))
            }
            ExprKind::Quantifier {
                kind,
                var,
                ty,
                body,
            } => self.quantifier(*kind, var, ty, body, depth),
        }
    }

    fn quantifier(
        &mut self,
        kind: QuantKind,
        var: &Ident,
        ty: &TypeExpr,
        body: &Expr,
        depth: usize,
    ) -> Lowered {
        let depth = depth + 1;
        let limit = self.tr.max_depth;
        if depth > limit {
            return Err(TranslationError::new(
                TranslationErrorKind::QuantifierDepthExceeded { depth, limit },
                format!("quantifier nesting depth {depth} exceeds the limit of {limit}"),
                var.span,
            ));
        }

        let resolved = self.tr.resolve(ty, &[], 0)?;
        let (sort, bounds) = self.sort_of(&resolved, ty.span)?;

        if self.is_bound(&var.node) {
            tracing::warn!(var = %var.node, "quantified variable shadows an outer binding");
            self.warnings.push(format!(
                "`{} {}` shadows an outer binding of `{}`",
                kind.keyword(),
                var.node,
                var.node
            ));
        }
        let symbol = self.fresh(&var.node);
        self.scopes.push(Bound {
            name: var.node.clone(),
            term: Term::Var(symbol.clone()),
            sort: sort.clone(),
        });
        let lowered = self.term(body, depth);
        self.scopes.pop();
        let (body_term, body_sort) = lowered?;
        expect_sort(&Sort::Bool, &body_sort, body.span)?;

        let guard = bounds_guard(&Term::Var(symbol.clone()), bounds);
        let body_term = match (kind, guard) {
            (_, None) => body_term,
            (QuantKind::Forall, Some(g)) => Term::implies(g, body_term),
            (QuantKind::Exists, Some(g)) => Term::and(vec![g, body_term]),
        };
        Ok((
            Term::Quant {
                kind,
                symbol,
                sort,
                body: Box::new(body_term),
            },
            Sort::Bool,
        ))
    }

    fn fresh(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{name}@{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|b| b.name == name)
            || self.tr.globals.iter().any(|g| g.name.node == name)
    }

    fn ident(&mut self, id: &Ident) -> Lowered {
        if let Some(b) = self.scopes.iter().rev().find(|b| b.name == id.node) {
            return Ok((b.term.clone(), b.sort.clone()));
        }
        let Some(global) = self.tr.globals.iter().find(|g| g.name.node == id.node).copied() else {
            return Err(TranslationError::new(
                TranslationErrorKind::UnboundVariable(id.node.clone()),
                format!("`{}` is not bound by a quantifier or declaration", id.node),
                id.span,
            ));
        };
        self.global(global)
    }

    fn global(&mut self, global: &LetStmt) -> Lowered {
        let name = global.name.node.clone();
        let resolved = self.tr.resolve(&global.ty, &[], 0)?;
        let (sort, bounds) = self.sort_of(&resolved, global.ty.span)?;
        if self.declared_globals.insert(name.clone()) {
            self.sig.add_constant(ConstDecl {
                symbol: name.clone(),
                name: name.clone(),
                sort: sort.clone(),
                lower: bounds.0,
                upper: bounds.1,
            });
            if let Some(g) = bounds_guard(&Term::Var(name.clone()), bounds) {
                self.assumptions.push(g);
            }
            // Declarations are evaluated outside any quantifier.
            let saved = std::mem::take(&mut self.scopes);
            let value = self.term(&global.value, 0);
            self.scopes = saved;
            match value {
                Ok((v, vs)) => match coerce(v, &vs, &sort) {
                    Some(v) => self
                        .assumptions
                        .push(Term::cmp(CmpOp::Eq, Term::Var(name.clone()), v)),
                    None => tracing::debug!(%name, "declaration value has another sort; left free"),
                },
                Err(e) => tracing::debug!(%name, error = %e.message, "declaration value left free"),
            }
        }
        Ok((Term::Var(name), sort))
    }

    fn literal(&mut self, lit: &Literal, span: Span) -> Lowered {
        Ok(match lit {
            Literal::Int(n) => (Term::Int(*n), Sort::Int),
            Literal::Float(x) | Literal::Money(x) | Literal::Percent(x) => (Term::Real(*x), Sort::Real),
            Literal::Bool(b) => (Term::Bool(*b), Sort::Bool),
            Literal::String(s) => (Term::Str(s.clone()), Sort::String),
            Literal::Date(text) => match parse_date(text) {
                Some(d) => (Term::Int(i64::from(d.num_days_from_ce())), Sort::Int),
                None => {
                    return Err(TranslationError::new(
                        TranslationErrorKind::Unsupported(format!("date `{text}`")),
                        format!("date literal `{text}` cannot be parsed"),
                        span,
                    ));
                }
            },
            Literal::Duration(text) => {
                return Err(TranslationError::new(
                    TranslationErrorKind::Unsupported("duration literal".into()),
                    format!("duration literal `{text}` has no logical encoding"),
                    span,
                ));
            }
            Literal::Pass => {
                return Err(TranslationError::new(
                    TranslationErrorKind::Unsupported("pass".into()),
                    "`pass` has no logical encoding",
                    span,
                ));
            }
        })
    }

    fn variant(&mut self, ty: &Ident, variant: &Ident, span: Span) -> Lowered {
        let path = format!("{}::{}", ty.node, variant.node);
        let known = self
            .tr
            .env
            .enum_info(&ty.node)
            .is_some_and(|info| info.has_variant(&variant.node));
        if !known {
            return Err(TranslationError::new(
                TranslationErrorKind::UnboundVariable(path.clone()),
                format!("unknown enum variant `{path}`"),
                span,
            ));
        }
        let sort = self.enum_sort(&ty.node);
        Ok((
            Term::EnumVariant {
                sort: ty.node.clone(),
                variant: variant.node.clone(),
            },
            sort,
        ))
    }

    fn member(&mut self, base: &Expr, member: &Ident, depth: usize) -> Lowered {
        let (base_term, base_sort) = self.term(base, depth)?;
        let Sort::Uninterpreted(sort_name) = &base_sort else {
            return Err(mismatch("a struct sort", &base_sort, base.span));
        };
        let Some((struct_name, args)) = self.struct_sorts.get(sort_name).cloned() else {
            return Err(mismatch("a struct sort", &base_sort, base.span));
        };
        let Some(field_ty) = self.tr.env.field_type(&struct_name, &args, &member.node) else {
            return Err(TranslationError::new(
                TranslationErrorKind::UnboundVariable(format!("{struct_name}.{}", member.node)),
                format!("struct `{struct_name}` has no field `{}`", member.node),
                member.span,
            ));
        };
        let (field_sort, _) = self.sort_of(&field_ty, member.span)?;
        let accessor = format!("{sort_name}.{}", member.node);
        self.sig.add_function(FunDecl {
            name: accessor.clone(),
            params: vec![base_sort.clone()],
            ret: field_sort.clone(),
        });
        Ok((Term::Apply(accessor, vec![base_term]), field_sort))
    }

    fn call(&mut self, callee: &Ident, args: &[Expr], depth: usize) -> Lowered {
        let Some(sig) = self.tr.env.function(&callee.node).cloned() else {
            return Err(TranslationError::new(
                TranslationErrorKind::UnboundVariable(callee.node.clone()),
                format!("unknown function `{}`", callee.node),
                callee.span,
            ));
        };
        if !sig.type_params.is_empty() {
            return Err(TranslationError::new(
                TranslationErrorKind::Unsupported(format!("generic function `{}`", sig.name)),
                format!("generic function `{}` cannot be used in a principle", sig.name),
                callee.span,
            ));
        }
        if sig.params.len() != args.len() {
            return Err(TranslationError::new(
                TranslationErrorKind::Unsupported(format!("call to `{}`", sig.name)),
                format!(
                    "function `{}` takes {} argument(s), found {}",
                    sig.name,
                    sig.params.len(),
                    args.len()
                ),
                callee.span,
            ));
        }
        let mut params = Vec::with_capacity(args.len());
        let mut terms = Vec::with_capacity(args.len());
        for ((_, pty), arg) in sig.params.iter().zip(args) {
            let (psort, _) = self.sort_of(pty, callee.span)?;
            let (t, s) = self.term(arg, depth)?;
            let t = coerce(t, &s, &psort).ok_or_else(|| mismatch(&psort.to_string(), &s, arg.span))?;
            params.push(psort);
            terms.push(t);
        }
        let (ret, _) = self.sort_of(&sig.ret, callee.span)?;
        self.sig.add_function(FunDecl {
            name: sig.name.clone(),
            params,
            ret: ret.clone(),
        });
        Ok((Term::Apply(sig.name, terms), ret))
    }

    /// One uninterpreted predicate per requirement, conjoined.
    fn satisfies(&mut self, test: &Ident, subject: Term, sort: &Sort) -> Result<Term, TranslationError> {
        let Some(info) = self.tr.env.legal_test(&test.node) else {
            return Err(TranslationError::new(
                TranslationErrorKind::UnknownLegalTest(test.node.clone()),
                format!("`satisfies` names unknown legal test `{}`", test.node),
                test.span,
            ));
        };
        let mut conjuncts = Vec::new();
        for req in info.conjunction() {
            let mut name = format!("{}.{req}", info.name);
            if self
                .sig
                .function(&name)
                .is_some_and(|f| f.params.first() != Some(sort))
            {
                name = format!("{}.{req}.{sort}", info.name);
            }
            self.sig.add_function(FunDecl {
                name: name.clone(),
                params: vec![sort.clone()],
                ret: Sort::Bool,
            });
            conjuncts.push(Term::Apply(name, vec![subject.clone()]));
        }
        Ok(Term::and(conjuncts))
    }

    /// Arms become a right-nested `ite` chain ending at the first arm that always matches.
    fn match_expr(&mut self, m: &Match<Expr>, depth: usize) -> Lowered {
        let (scrutinee, scrut_sort) = self.term(&m.scrutinee, depth)?;

        let mut arms: Vec<(Option<Term>, Term, Sort, Span)> = Vec::new();
        let mut closed = false;
        for arm in &m.arms {
            let mark = self.scopes.len();
            let cond = match &arm.pattern {
                Pattern::Wildcard { .. } => None,
                Pattern::Literal { span, value } => {
                    let (lit, lit_sort) = self.literal(value, *span)?;
                    let lit = coerce(lit, &lit_sort, &scrut_sort)
                        .ok_or_else(|| mismatch(&scrut_sort.to_string(), &lit_sort, *span))?;
                    Some(Term::cmp(CmpOp::Eq, scrutinee.clone(), lit))
                }
                Pattern::Variant { span, ty, variant } => {
                    let (v, v_sort) = self.variant(ty, variant, *span)?;
                    expect_sort(&scrut_sort, &v_sort, *span)?;
                    Some(Term::cmp(CmpOp::Eq, scrutinee.clone(), v))
                }
                Pattern::Binding(id) => {
                    self.scopes.push(Bound {
                        name: id.node.clone(),
                        term: scrutinee.clone(),
                        sort: scrut_sort.clone(),
                    });
                    None
                }
                Pattern::Satisfies { test, .. } => {
                    Some(self.satisfies(test, scrutinee.clone(), &scrut_sort)?)
                }
            };
            let lowered = self.arm_body(arm.guard.as_ref(), &arm.body, depth);
            self.scopes.truncate(mark);
            let (guard, (body, body_sort)) = lowered?;

            let cond = match (cond, guard) {
                (None, None) => None,
                (Some(c), None) | (None, Some(c)) => Some(c),
                (Some(c), Some(g)) => Some(Term::and(vec![c, g])),
            };
            let always = cond.is_none();
            arms.push((cond, body, body_sort, arm.body.span));
            if always {
                closed = true;
                break;
            }
        }
        if !closed {
            return Err(TranslationError::new(
                TranslationErrorKind::Unsupported("non-exhaustive match".into()),
                "a match in a principle needs an arm that always matches",
                m.span,
            ));
        }

        let result_sort = if arms.iter().any(|a| a.2 == Sort::Real)
            && arms.iter().all(|a| a.2.is_numeric())
        {
            Sort::Real
        } else {
            arms[0].2.clone()
        };
        let mut out: Option<Term> = None;
        for (cond, body, sort, span) in arms.into_iter().rev() {
            let body = coerce(body, &sort, &result_sort)
                .ok_or_else(|| mismatch(&result_sort.to_string(), &sort, span))?;
            out = Some(match (cond, out) {
                (Some(c), Some(rest)) => Term::Ite(Box::new(c), Box::new(body), Box::new(rest)),
                _ => body,
            });
        }
        match out {
            Some(t) => Ok((t, result_sort)),
            None => Err(TranslationError::new(
                TranslationErrorKind::Unsupported("empty match".into()),
                "a match in a principle needs at least one arm",
                m.span,
            )),
        }
    }

    fn arm_body(
        &mut self,
        guard: Option<&Expr>,
        body: &Expr,
        depth: usize,
    ) -> Result<(Option<Term>, (Term, Sort)), TranslationError> {
        let guard = match guard {
            Some(g) => {
                let (t, s) = self.term(g, depth)?;
                expect_sort(&Sort::Bool, &s, g.span)?;
                Some(t)
            }
            None => None,
        };
        Ok((guard, self.term(body, depth)?))
    }

    fn enum_sort(&mut self, name: &str) -> Sort {
        if let Some(info) = self.tr.env.enum_info(name) {
            self.sig.add_sort(SortDecl::Enum {
                name: info.name.clone(),
                variants: info.variants.clone(),
            });
        }
        Sort::Enum(name.to_string())
    }

    /// Sort of a resolved type, declaring it on first use.
    fn sort_of(&mut self, ty: &Type, span: Span) -> Result<(Sort, Bounds), TranslationError> {
        Ok(match ty {
            Type::Primitive(p) => (
                match p {
                    Primitive::Int | Primitive::Date | Primitive::Duration => Sort::Int,
                    Primitive::Float | Primitive::Money | Primitive::Percent => Sort::Real,
                    Primitive::Bool => Sort::Bool,
                    Primitive::String => Sort::String,
                    Primitive::Pass => {
                        return Err(TranslationError::new(
                            TranslationErrorKind::Unsupported("pass".into()),
                            "type `pass` has no logical sort",
                            span,
                        ));
                    }
                },
                (None, None),
            ),
            Type::Struct { name: s, args } => {
                let name = sort_name(ty);
                self.struct_sorts
                    .entry(name.clone())
                    .or_insert_with(|| (s.clone(), args.clone()));
                self.sig.add_sort(SortDecl::Uninterpreted(name.clone()));
                (Sort::Uninterpreted(name), (None, None))
            }
            Type::Enum(name) => (self.enum_sort(name), (None, None)),
            Type::Refinement { base, lower, upper } => {
                let (sort, _) = self.sort_of(base, span)?;
                (sort, (*lower, *upper))
            }
            Type::Citation { .. } => (Sort::String, (None, None)),
            Type::Temporal { inner, .. } => self.sort_of(inner, span)?,
            Type::Positive(inner) if inner.base() == &Type::INT => {
                let (sort, _) = self.sort_of(inner, span)?;
                (sort, ty.bounds().unwrap_or((None, None)))
            }
            Type::ValidDate { after, before } => {
                let days = |d: &chrono::NaiveDate| i64::from(d.num_days_from_ce());
                (
                    Sort::Int,
                    (
                        after.as_ref().map(|d| days(d) + 1),
                        before.as_ref().map(|d| days(d) - 1),
                    ),
                )
            }
            Type::MoneyWithCurrency(_) => (Sort::Real, (None, None)),
            // Strict real bounds, string length and sort unions have no encoding here.
            Type::Positive(_)
            | Type::NonEmpty(_)
            | Type::Union(..)
            | Type::Array(_)
            | Type::Var(_)
            | Type::Unknown => {
                return Err(TranslationError::new(
                    TranslationErrorKind::Unsupported(ty.display()),
                    format!("type `{}` has no logical sort", ty.display()),
                    span,
                ));
            }
        })
    }
}

impl QuantifierTranslator<'_> {
    /// Type expression to a resolved type, through aliases.
    fn resolve(&self, te: &TypeExpr, params: &[String], fuel: usize) -> Result<Type, TranslationError> {
        const MAX_ALIAS_DEPTH: usize = 32;
        Ok(match &te.kind {
            TypeKind::Primitive(p) => Type::Primitive(*p),
            TypeKind::Var(v) if params.contains(&v.node) => Type::Var(v.node.clone()),
            TypeKind::Var(v) => return Err(unbound_type(&v.node, v.span)),
            TypeKind::Named { name, args } => {
                let n = name.node.as_str();
                if args.is_empty() && params.iter().any(|p| p == n) {
                    return Ok(Type::Var(n.to_string()));
                }
                if let Some(p) = Primitive::from_name(n) {
                    return Ok(Type::Primitive(p));
                }
                let Some(def) = self.env.lookup(n) else {
                    return Err(unbound_type(n, name.span));
                };
                let arg_tys = args
                    .iter()
                    .map(|a| self.resolve(a, params, fuel))
                    .collect::<Result<Vec<_>, _>>()?;
                let binding = self.env.instantiate(n, &arg_tys).map_err(|(expected, got)| {
                    TranslationError::new(
                        TranslationErrorKind::UnboundQuantifierType(n.to_string()),
                        format!("type `{n}` expects {expected} type argument(s), found {got}"),
                        te.span,
                    )
                })?;
                match &def.kind {
                    TypeDefKind::Struct(_) => Type::Struct {
                        name: n.to_string(),
                        args: arg_tys,
                    },
                    TypeDefKind::Enum(_) => Type::Enum(n.to_string()),
                    TypeDefKind::Alias(target) => {
                        if fuel >= MAX_ALIAS_DEPTH {
                            return Err(unbound_type(n, name.span));
                        }
                        let inner = self.resolve(target, &def.type_params, fuel + 1)?;
                        binding.substitute(&inner)
                    }
                }
            }
            TypeKind::Refinement { base, lower, upper } => Type::Refinement {
                base: Box::new(self.resolve(base, params, fuel)?),
                lower: *lower,
                upper: *upper,
            },
            TypeKind::Citation {
                section,
                subsection,
                act,
            } => Type::Citation {
                section: section.clone(),
                subsection: subsection.clone(),
                act: act.clone(),
            },
            TypeKind::Temporal {
                inner,
                valid_from,
                valid_until,
            } => Type::Temporal {
                inner: Box::new(self.resolve(inner, params, fuel)?),
                valid_from: valid_from.as_deref().and_then(parse_date),
                valid_until: valid_until.as_deref().and_then(parse_date),
            },
            TypeKind::Array(inner) => Type::Array(Box::new(self.resolve(inner, params, fuel)?)),
            TypeKind::Positive(inner) => Type::Positive(Box::new(self.resolve(inner, params, fuel)?)),
            TypeKind::NonEmpty(inner) => Type::NonEmpty(Box::new(self.resolve(inner, params, fuel)?)),
            TypeKind::ValidDate { after, before } => Type::ValidDate {
                after: after.as_deref().and_then(parse_date),
                before: before.as_deref().and_then(parse_date),
            },
            TypeKind::Union(a, b) => Type::Union(
                Box::new(self.resolve(a, params, fuel)?),
                Box::new(self.resolve(b, params, fuel)?),
            ),
            TypeKind::MoneyWithCurrency(code) => Type::MoneyWithCurrency(code.clone()),
        })
    }
}

/// `Box<int>` becomes `Box_int`.
fn sort_name(ty: &Type) -> String {
    let mut out = String::new();
    let mut last_sep = false;
    for c in ty.display().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

fn unbound_type(name: &str, span: Span) -> TranslationError {
    TranslationError::new(
        TranslationErrorKind::UnboundQuantifierType(name.to_string()),
        format!("quantified type `{name}` is not declared"),
        span,
    )
}

fn mismatch(expected: &str, got: &Sort, span: Span) -> TranslationError {
    TranslationError::new(
        TranslationErrorKind::SortMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        },
        format!("expected {expected}, found {got}"),
        span,
    )
}

fn expect_sort(expected: &Sort, got: &Sort, span: Span) -> Result<(), TranslationError> {
    if expected == got {
        Ok(())
    } else {
        Err(mismatch(&expected.to_string(), got, span))
    }
}

/// Int widens to Real; everything else must already agree.
fn coerce(t: Term, from: &Sort, to: &Sort) -> Option<Term> {
    match (from, to) {
        (a, b) if a == b => Some(t),
        (Sort::Int, Sort::Real) => Some(match t {
            Term::Int(n) => Term::Real(n as f64),
            other => Term::ToReal(Box::new(other)),
        }),
        _ => None,
    }
}

fn bounds_guard(v: &Term, (lower, upper): Bounds) -> Option<Term> {
    let mut parts = Vec::new();
    if let Some(lo) = lower {
        parts.push(Term::cmp(CmpOp::Le, Term::Int(lo), v.clone()));
    }
    if let Some(hi) = upper {
        parts.push(Term::cmp(CmpOp::Le, v.clone(), Term::Int(hi)));
    }
    (!parts.is_empty()).then(|| Term::and(parts))
}

fn binary(
    (l, ls): (Term, Sort),
    op: BinOp,
    (r, rs): (Term, Sort),
    lspan: Span,
    rspan: Span,
) -> Lowered {
    if op.is_logical() {
        expect_sort(&Sort::Bool, &ls, lspan)?;
        expect_sort(&Sort::Bool, &rs, rspan)?;
        return Ok((
            match op {
                BinOp::And => Term::And(vec![l, r]),
                BinOp::Or => Term::Or(vec![l, r]),
                _ => Term::implies(l, r),
            },
            Sort::Bool,
        ));
    }

    // Numeric operands meet at Real when either side is Real.
    let joined = match (&ls, &rs) {
        (a, b) if a == b => ls.clone(),
        (Sort::Int, Sort::Real) | (Sort::Real, Sort::Int) => Sort::Real,
        _ => return Err(mismatch(&ls.to_string(), &rs, rspan)),
    };
    let l = coerce(l, &ls, &joined).ok_or_else(|| mismatch(&joined.to_string(), &ls, lspan))?;
    let r = coerce(r, &rs, &joined).ok_or_else(|| mismatch(&joined.to_string(), &rs, rspan))?;

    if op.is_comparison() {
        let cmp = match op {
            BinOp::Eq => CmpOp::Eq,
            BinOp::Ne => CmpOp::Distinct,
            BinOp::Lt => CmpOp::Lt,
            BinOp::Gt => CmpOp::Gt,
            BinOp::Le => CmpOp::Le,
            _ => CmpOp::Ge,
        };
        if !matches!(cmp, CmpOp::Eq | CmpOp::Distinct) && !joined.is_numeric() {
            return Err(mismatch("Int or Real", &joined, lspan));
        }
        return Ok((Term::cmp(cmp, l, r), Sort::Bool));
    }

    if !joined.is_numeric() {
        return Err(mismatch("Int or Real", &joined, lspan));
    }
    let arith = match op {
        BinOp::Add => ArithOp::Add,
        BinOp::Sub => ArithOp::Sub,
        BinOp::Mul => ArithOp::Mul,
        BinOp::Div => ArithOp::Div,
        _ => ArithOp::Mod,
    };
    if arith == ArithOp::Mod && joined != Sort::Int {
        return Err(mismatch("Int", &joined, rspan));
    }
    Ok((
        Term::Arith {
            op: arith,
            sort: joined.clone(),
            left: Box::new(l),
            right: Box::new(r),
        },
        joined,
    ))
}
