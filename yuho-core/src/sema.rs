#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use yuho_ast::{
    AssignStmt, BinOp, Block, EnumDef, Expr, ExprKind, FieldDef, FunctionDef, Ident, Item,
    LegalTestDef, LetStmt, Literal, Match, Pattern, Primitive, PrincipleDef, Program, Span, Stmt,
    StructDef, TypeAliasDef, TypeExpr, TypeKind, UnaryOp,
};

use crate::consteval::{self, ConstValue};
use crate::control_flow::check_mutual_exclusivity;
use crate::domain::{citation_problem, is_currency_code, parse_date};
use crate::env::{
    EnumInfo, FieldInfo, FunctionSig, LegalTestInfo, RequirementInfo, StructInfo, TypeDef,
    TypeDefKind, TypeEnv, TypeId,
};
use crate::error::{ErrorKind, SemanticError};
use crate::legal::{check_match_exhaustiveness, evaluate_test_definition, unreachable_arms};
use crate::scope::{Binding, BindingKind, Define, ScopeStack};
use crate::types::{is_assignable, GenericBinding, Type};

#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Run the control-flow analysis on functions returning a mutually exclusive enum.
    pub check_mutual_exclusivity: bool,
    /// Collect `ShadowedBinding` warnings.
    pub report_shadowing: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_mutual_exclusivity: true,
            report_shadowing: true,
        }
    }
}

/// A program that passed checking, with the environment built for it.
#[derive(Clone, Debug)]
pub struct TypedProgram {
    pub name: String,
    pub program: Program,
    pub env: TypeEnv,
    pub warnings: Vec<SemanticError>,
}

impl TypedProgram {
    /// Principles in declaration order, including those inside scopes.
    pub fn principles(&self) -> Vec<&PrincipleDef> {
        fn walk<'a>(items: &'a [Item], out: &mut Vec<&'a PrincipleDef>) {
            for item in items {
                match item {
                    Item::Principle(p) => out.push(p),
                    Item::Scope(s) => walk(&s.items, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.program.items, &mut out);
        out
    }

    pub fn principle(&self, name: &str) -> Option<&PrincipleDef> {
        self.principles().into_iter().find(|p| p.name.node == name)
    }
}

/// Type checker. Holds only options; every [`Checker::check`] call builds a
/// fresh Type Environment and Scope Stack.
#[derive(Clone, Debug, Default)]
pub struct Checker {
    options: CheckOptions,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Checks one program, accumulating every error found.
    #[tracing::instrument(skip_all, fields(program = %program.name))]
    pub fn check(&self, program: &Program) -> Result<TypedProgram, Vec<SemanticError>> {
        let mut cx = Ctx::new(&self.options);

        let structs = cx.collect_types(&program.items);
        tracing::debug!(types = cx.env.len(), "collected type names");

        cx.resolve_structs(&structs);
        cx.check_inheritance(&structs);
        cx.collect_signatures(&program.items);
        tracing::debug!(errors = cx.errors.len(), "declarations checked");

        cx.check_items(&program.items);

        let Ctx {
            env,
            mut errors,
            warnings,
            ..
        } = cx;
        dedup(&mut errors);
        if errors.is_empty() {
            tracing::debug!(warnings = warnings.len(), "program checked");
            Ok(TypedProgram {
                name: program.name.clone(),
                program: program.clone(),
                env,
                warnings,
            })
        } else {
            tracing::debug!(errors = errors.len(), "program rejected");
            Err(errors)
        }
    }
}

/// Drops repeats (the same alias target is resolved at every use) and orders
/// by source position, keeping detection order for ties.
fn dedup(errors: &mut Vec<SemanticError>) {
    let mut seen: Vec<SemanticError> = Vec::with_capacity(errors.len());
    for e in errors.drain(..) {
        if !seen.contains(&e) {
            seen.push(e);
        }
    }
    seen.sort_by_key(|e| e.span.offset);
    *errors = seen;
}

fn is_type_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_digit())
}

fn names(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|i| i.node.clone()).collect()
}

struct Ctx<'o> {
    options: &'o CheckOptions,
    env: TypeEnv,
    scopes: ScopeStack,
    errors: Vec<SemanticError>,
    warnings: Vec<SemanticError>,
    /// Type parameters of the function currently being checked.
    type_params: Vec<String>,
    /// Aliases being expanded, for cycle detection.
    alias_stack: Vec<String>,
    reported_alias_cycles: HashSet<String>,
}

impl<'o> Ctx<'o> {
    fn new(options: &'o CheckOptions) -> Self {
        Self {
            options,
            env: TypeEnv::new(),
            scopes: ScopeStack::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            type_params: Vec::new(),
            alias_stack: Vec::new(),
            reported_alias_cycles: HashSet::new(),
        }
    }

    fn err(&mut self, kind: ErrorKind, message: impl Into<String>, span: Span) {
        self.errors.push(SemanticError::new(kind, message, span));
    }

    // ---- pass 1: type names ----

    fn collect_types<'p>(&mut self, items: &'p [Item]) -> Vec<(TypeId, &'p StructDef)> {
        let mut structs = Vec::new();
        self.collect_types_into(items, &mut structs);
        structs
    }

    fn collect_types_into<'p>(&mut self, items: &'p [Item], structs: &mut Vec<(TypeId, &'p StructDef)>) {
        for item in items {
            match item {
                Item::Struct(s) => {
                    let def = TypeDef {
                        name: s.name.node.clone(),
                        span: s.span,
                        type_params: names(&s.type_params),
                        kind: TypeDefKind::Struct(StructInfo::default()),
                    };
                    if let Some(id) = self.declare_type(def, &s.name) {
                        structs.push((id, s));
                    }
                }
                Item::Enum(e) => self.collect_enum(e),
                Item::TypeAlias(a) => self.collect_alias(a),
                Item::Scope(s) => self.collect_types_into(&s.items, structs),
                _ => {}
            }
        }
    }

    fn declare_type(&mut self, def: TypeDef, name: &Ident) -> Option<TypeId> {
        if Primitive::from_name(&def.name).is_some() {
            self.err(
                ErrorKind::DuplicateDefinition(def.name.clone()),
                format!("`{}` is a built-in type and cannot be redefined", def.name),
                name.span,
            );
            return None;
        }
        match self.env.declare(def) {
            Ok(id) => Some(id),
            Err(_) => {
                self.err(
                    ErrorKind::DuplicateDefinition(name.node.clone()),
                    format!("type `{}` is defined more than once", name.node),
                    name.span,
                );
                None
            }
        }
    }

    fn collect_enum(&mut self, e: &EnumDef) {
        let mut seen = HashSet::new();
        for v in &e.variants {
            if !seen.insert(v.node.as_str()) {
                self.err(
                    ErrorKind::DuplicateDefinition(v.node.clone()),
                    format!("variant `{}` appears twice in enum `{}`", v.node, e.name.node),
                    v.span,
                );
            }
        }
        let def = TypeDef {
            name: e.name.node.clone(),
            span: e.span,
            type_params: Vec::new(),
            kind: TypeDefKind::Enum(EnumInfo {
                name: e.name.node.clone(),
                variants: names(&e.variants),
                mutually_exclusive: e.mutually_exclusive,
            }),
        };
        self.declare_type(def, &e.name);
    }

    fn collect_alias(&mut self, a: &TypeAliasDef) {
        let def = TypeDef {
            name: a.name.node.clone(),
            span: a.span,
            type_params: names(&a.type_params),
            kind: TypeDefKind::Alias(a.target.clone()),
        };
        self.declare_type(def, &a.name);
    }

    // ---- pass 2: struct bodies and parent links ----

    fn resolve_structs(&mut self, structs: &[(TypeId, &StructDef)]) {
        for &(id, s) in structs {
            let params = names(&s.type_params);
            let fields: Vec<FieldInfo> = s
                .fields
                .iter()
                .map(|f| FieldInfo {
                    name: f.name.node.clone(),
                    ty: self.resolve_type_ref(&f.ty, &params),
                    span: f.span,
                    constraint: f.constraint.clone(),
                    owner: s.name.node.clone(),
                })
                .collect();
            if let TypeDefKind::Struct(info) = &mut self.env.get_mut(id).kind {
                info.fields = fields;
            }

            let Some(parent) = &s.parent else { continue };
            let Some(pid) = self.env.id(&parent.node).filter(|p| self.env.struct_info(*p).is_some())
            else {
                self.err(
                    ErrorKind::UndefinedSymbol(parent.node.clone()),
                    format!("struct `{}` extends unknown struct `{}`", s.name.node, parent.node),
                    parent.span,
                );
                continue;
            };
            let expected = self.env.get(pid).type_params.len();
            if expected != 0 {
                self.err(
                    ErrorKind::ArityMismatch { expected, got: 0 },
                    format!(
                        "generic struct `{}` expects {expected} type argument(s) when extended, found 0",
                        parent.node
                    ),
                    parent.span,
                );
            }
            self.env.set_parent(id, pid);
        }
    }

    // ---- pass 3: inheritance, duplicate fields, field constraints ----

    fn check_inheritance(&mut self, structs: &[(TypeId, &StructDef)]) {
        let mut in_cycle: HashSet<TypeId> = HashSet::new();
        let mut touches_cycle: HashSet<TypeId> = HashSet::new();

        for &(id, _) in structs {
            let (chain, repeated) = self.env.parent_chain(id);
            let Some(rep) = repeated else { continue };
            touches_cycle.insert(id);
            let start = chain.iter().position(|c| *c == rep).unwrap_or(0);
            let members = &chain[start..];
            if members.iter().any(|m| in_cycle.contains(m)) {
                continue;
            }
            in_cycle.extend(members.iter().copied());
            let path = members
                .iter()
                .chain(std::iter::once(&rep))
                .map(|m| self.env.get(*m).name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            let rep_def = self.env.get(rep);
            let (name, span) = (rep_def.name.clone(), rep_def.span);
            self.err(
                ErrorKind::CircularInheritance(name),
                format!("circular inheritance: {path}"),
                span,
            );
        }

        for &(id, s) in structs {
            if touches_cycle.contains(&id) {
                continue;
            }
            let Some(pid) = self.env.struct_info(id).and_then(|i| i.parent) else {
                continue;
            };
            if pid >= id {
                let parent = self.env.get(pid).name.clone();
                let span = s.parent.as_ref().map_or(s.span, |p| p.span);
                self.err(
                    ErrorKind::CircularInheritance(parent.clone()),
                    format!(
                        "struct `{}` extends `{parent}`, which must be declared before it",
                        s.name.node
                    ),
                    span,
                );
            }
            self.check_inherited_fields(id, s);
        }

        for &(id, s) in structs {
            if touches_cycle.contains(&id) {
                continue;
            }
            let resolved: Vec<Type> = self
                .env
                .struct_info(id)
                .map(|i| i.fields.iter().map(|f| f.ty.clone()).collect())
                .unwrap_or_default();
            for (field, ty) in s.fields.iter().zip(resolved) {
                self.check_field_constraint(field, &ty);
            }
        }
    }

    /// The child's own fields against everything inherited and against each other.
    fn check_inherited_fields(&mut self, id: TypeId, s: &StructDef) {
        let (chain, _) = self.env.parent_chain(id);
        let mut owners: HashMap<String, String> = HashMap::new();
        for &anc in chain.iter().skip(1).rev() {
            if let Some(info) = self.env.struct_info(anc) {
                for f in &info.fields {
                    owners.entry(f.name.clone()).or_insert_with(|| f.owner.clone());
                }
            }
        }
        for field in &s.fields {
            if let Some(owner) = owners.get(&field.name.node) {
                let message = if *owner == s.name.node {
                    format!("field `{}` is declared twice in `{owner}`", field.name.node)
                } else {
                    format!(
                        "field `{}` of `{}` is already declared in parent `{owner}`",
                        field.name.node, s.name.node
                    )
                };
                self.err(
                    ErrorKind::DuplicateField(field.name.node.clone()),
                    message,
                    field.name.span,
                );
            } else {
                owners.insert(field.name.node.clone(), s.name.node.clone());
            }
        }
    }

    fn check_field_constraint(&mut self, field: &FieldDef, ty: &Type) {
        let Some(constraint) = &field.constraint else {
            return;
        };
        let mut foreign = Vec::new();
        walk_idents(constraint, &mut |id: &Ident| {
            if id.node != field.name.node {
                foreign.push(id.clone());
            }
        });
        if let Some(other) = foreign.first() {
            self.err(
                ErrorKind::InvalidConstraint(field.name.node.clone()),
                format!(
                    "constraint on field `{}` may only reference `{}`, found `{}`",
                    field.name.node, field.name.node, other.node
                ),
                other.span,
            );
            return;
        }
        self.scopes.push();
        self.bind(&field.name, ty.clone(), BindingKind::Variable);
        let got = self.infer(constraint);
        self.scopes.pop();
        if !got.is_bool() {
            self.err(
                ErrorKind::InvalidConstraint(field.name.node.clone()),
                format!(
                    "constraint on field `{}` must be bool, found {}",
                    field.name.node,
                    got.display()
                ),
                constraint.span,
            );
        }
    }

    // ---- pass 4: legal tests, function signatures, aliases ----

    fn collect_signatures(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::LegalTest(t) => self.collect_legal_test(t),
                Item::Function(f) => self.collect_function(f),
                Item::TypeAlias(a) => {
                    // Report problems in the target even when the alias is unused.
                    self.alias_stack.push(a.name.node.clone());
                    let _ = self.resolve_type_ref(&a.target, &names(&a.type_params));
                    self.alias_stack.pop();
                }
                Item::Scope(s) => self.collect_signatures(&s.items),
                _ => {}
            }
        }
    }

    fn collect_legal_test(&mut self, t: &LegalTestDef) {
        let requirements = t
            .requirements
            .iter()
            .map(|r| RequirementInfo {
                name: r.name.node.clone(),
                ty: self.resolve_type_ref(&r.ty, &[]),
                span: r.span,
            })
            .collect();
        let info = LegalTestInfo {
            name: t.name.node.clone(),
            span: t.span,
            requirements,
        };
        if let Err(errs) = evaluate_test_definition(&info) {
            self.errors.extend(errs);
        }
        if self.env.add_legal_test(info).is_err() {
            self.err(
                ErrorKind::DuplicateDefinition(t.name.node.clone()),
                format!("legal test `{}` is defined more than once", t.name.node),
                t.name.span,
            );
        }
    }

    fn collect_function(&mut self, f: &FunctionDef) {
        let type_params = names(&f.type_params);
        let params = f
            .params
            .iter()
            .map(|p| (p.name.node.clone(), self.resolve_type_ref(&p.ty, &type_params)))
            .collect();
        let ret = self.resolve_type_ref(&f.ret, &type_params);
        let sig = FunctionSig {
            name: f.name.node.clone(),
            span: f.span,
            type_params,
            params,
            ret,
        };
        if self.env.add_function(sig).is_err() {
            self.err(
                ErrorKind::DuplicateDefinition(f.name.node.clone()),
                format!("function `{}` is defined more than once", f.name.node),
                f.name.span,
            );
        }
    }

    // ---- type resolution ----

    fn resolve_type_ref(&mut self, te: &TypeExpr, params: &[String]) -> Type {
        match &te.kind {
            TypeKind::Primitive(p) => Type::Primitive(*p),
            TypeKind::Var(v) => {
                if params.contains(&v.node) || self.type_params.contains(&v.node) {
                    Type::Var(v.node.clone())
                } else {
                    self.err(
                        ErrorKind::UnboundTypeVariable(v.node.clone()),
                        format!("unbound type variable `{}`", v.node),
                        v.span,
                    );
                    Type::Unknown
                }
            }
            TypeKind::Named { name, args } => self.resolve_named(te, name, args, params),
            TypeKind::Refinement { base, lower, upper } => {
                let base_ty = self.resolve_type_ref(base, params);
                if !base_ty.is_numeric() {
                    self.err(
                        ErrorKind::TypeMismatch {
                            expected: "numeric type".into(),
                            got: base_ty.display(),
                        },
                        format!("bounded type needs a numeric base, found {}", base_ty.display()),
                        base.span,
                    );
                }
                if let (Some(lo), Some(hi)) = (lower, upper) {
                    if lo > hi {
                        self.err(
                            ErrorKind::OutOfBounds,
                            format!("bounded type has lower bound {lo} above upper bound {hi}"),
                            te.span,
                        );
                    }
                }
                Type::Refinement {
                    base: Box::new(base_ty),
                    lower: *lower,
                    upper: *upper,
                }
            }
            TypeKind::Citation {
                section,
                subsection,
                act,
            } => {
                if let Some(problem) = citation_problem(section, subsection, act) {
                    self.err(
                        ErrorKind::InvalidCitation,
                        format!("invalid citation: {problem}"),
                        te.span,
                    );
                }
                Type::Citation {
                    section: section.clone(),
                    subsection: subsection.clone(),
                    act: act.clone(),
                }
            }
            TypeKind::Temporal {
                inner,
                valid_from,
                valid_until,
            } => {
                let inner_ty = self.resolve_type_ref(inner, params);
                let from = valid_from.as_deref().and_then(|d| self.date(d, te.span));
                let until = valid_until.as_deref().and_then(|d| self.date(d, te.span));
                if let (Some(f), Some(u)) = (from, until) {
                    if f >= u {
                        self.err(
                            ErrorKind::InvalidTemporalWindow,
                            format!("temporal window starts on {f} but ends on {u}; valid_from must precede valid_until"),
                            te.span,
                        );
                    }
                }
                Type::Temporal {
                    inner: Box::new(inner_ty),
                    valid_from: from,
                    valid_until: until,
                }
            }
            TypeKind::Array(inner) => Type::Array(Box::new(self.resolve_type_ref(inner, params))),
            TypeKind::Positive(inner) => {
                let inner_ty = self.resolve_type_ref(inner, params);
                if !inner_ty.is_numeric() {
                    self.err(
                        ErrorKind::InvalidConstraint("Positive".into()),
                        format!("Positive<T> needs a numeric type, found {}", inner_ty.display()),
                        inner.span,
                    );
                }
                Type::Positive(Box::new(inner_ty))
            }
            TypeKind::NonEmpty(inner) => {
                let inner_ty = self.resolve_type_ref(inner, params);
                let sized = matches!(
                    inner_ty.base(),
                    Type::Primitive(Primitive::String) | Type::Array(_) | Type::Unknown | Type::Var(_)
                );
                if !sized {
                    self.err(
                        ErrorKind::InvalidConstraint("NonEmpty".into()),
                        format!(
                            "NonEmpty<T> needs a string or array type, found {}",
                            inner_ty.display()
                        ),
                        inner.span,
                    );
                }
                Type::NonEmpty(Box::new(inner_ty))
            }
            TypeKind::ValidDate { after, before } => {
                let after = after.as_deref().and_then(|d| self.date(d, te.span));
                let before = before.as_deref().and_then(|d| self.date(d, te.span));
                if let (Some(a), Some(b)) = (after, before) {
                    if a >= b {
                        self.err(
                            ErrorKind::InvalidTemporalWindow,
                            format!("ValidDate window starts on {a} but ends on {b}; after must precede before"),
                            te.span,
                        );
                    }
                }
                Type::ValidDate { after, before }
            }
            TypeKind::Union(a, b) => Type::Union(
                Box::new(self.resolve_type_ref(a, params)),
                Box::new(self.resolve_type_ref(b, params)),
            ),
            TypeKind::MoneyWithCurrency(code) => {
                if !is_currency_code(code) {
                    self.err(
                        ErrorKind::InvalidConstraint("currency".into()),
                        format!("`{code}` is not a currency code; expected three capital letters such as USD"),
                        te.span,
                    );
                }
                Type::MoneyWithCurrency(code.clone())
            }
        }
    }

    fn date(&mut self, text: &str, span: Span) -> Option<chrono::NaiveDate> {
        let parsed = parse_date(text);
        if parsed.is_none() {
            self.err(
                ErrorKind::InvalidDate(text.to_string()),
                format!("invalid date `{text}`: expected DD-MM-YYYY, YYYY-MM-DD or MM/DD/YYYY"),
                span,
            );
        }
        parsed
    }

    fn resolve_named(
        &mut self,
        te: &TypeExpr,
        name: &Ident,
        args: &[TypeExpr],
        params: &[String],
    ) -> Type {
        let n = name.node.as_str();
        if args.is_empty() && (params.iter().any(|p| p == n) || self.type_params.iter().any(|p| p == n)) {
            return Type::Var(n.to_string());
        }
        if let Some(p) = Primitive::from_name(n) {
            return Type::Primitive(p);
        }

        let arg_tys: Vec<Type> = args.iter().map(|a| self.resolve_type_ref(a, params)).collect();

        let Some(def) = self.env.lookup(n) else {
            if is_type_var_name(n) {
                self.err(
                    ErrorKind::UnboundTypeVariable(n.to_string()),
                    format!("unbound type variable `{n}`"),
                    name.span,
                );
            } else {
                self.err(
                    ErrorKind::UndefinedSymbol(n.to_string()),
                    format!("unknown type `{n}`"),
                    name.span,
                );
            }
            return Type::Unknown;
        };

        let (kind, type_params) = (def.kind.clone(), def.type_params.clone());
        let binding = match self.env.instantiate(n, &arg_tys) {
            Ok(b) => b,
            Err((expected, got)) => {
                self.err(
                    ErrorKind::ArityMismatch { expected, got },
                    format!("type `{n}` expects {expected} type argument(s), found {got}"),
                    te.span,
                );
                return Type::Unknown;
            }
        };

        match kind {
            TypeDefKind::Struct(_) => Type::Struct {
                name: n.to_string(),
                args: arg_tys,
            },
            TypeDefKind::Enum(_) => Type::Enum(n.to_string()),
            TypeDefKind::Alias(target) => {
                if let Some(start) = self.alias_stack.iter().position(|a| a == n) {
                    if !self.reported_alias_cycles.contains(n) {
                        let mut path = self.alias_stack[start..].to_vec();
                        self.reported_alias_cycles.extend(path.iter().cloned());
                        path.push(n.to_string());
                        self.err(
                            ErrorKind::CircularInheritance(n.to_string()),
                            format!("type alias cycle: {}", path.join(" -> ")),
                            name.span,
                        );
                    }
                    return Type::Unknown;
                }
                self.alias_stack.push(n.to_string());
                let resolved = self.resolve_type_ref(&target, &type_params);
                self.alias_stack.pop();
                binding.substitute(&resolved)
            }
        }
    }

    // ---- pass 5: bodies ----

    fn check_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Declaration(l) => self.check_let(l),
                Item::Function(f) => self.check_function(f),
                Item::Principle(p) => self.check_principle(p),
                Item::Scope(s) => {
                    self.scopes.push();
                    self.check_items(&s.items);
                    self.scopes.pop();
                }
                Item::Struct(_) | Item::Enum(_) | Item::TypeAlias(_) | Item::LegalTest(_) => {}
            }
        }
    }

    fn check_function(&mut self, f: &FunctionDef) {
        let Some(sig) = self.env.function(&f.name.node).cloned() else {
            return;
        };
        if sig.span != f.span {
            // A duplicate definition; only the first one is checked.
            return;
        }
        self.type_params = sig.type_params.clone();
        self.scopes.push();
        for (p, (_, ty)) in f.params.iter().zip(&sig.params) {
            self.bind(&p.name, ty.clone(), BindingKind::Parameter);
        }
        self.check_block(&f.body, &sig.ret);
        self.scopes.pop();
        self.type_params.clear();

        if !self.options.check_mutual_exclusivity {
            return;
        }
        if let Type::Enum(name) = sig.ret.base() {
            if let Some(info) = self.env.enum_info(name).filter(|e| e.mutually_exclusive).cloned() {
                if let Err(e) = check_mutual_exclusivity(f, &info) {
                    self.errors.push(e);
                }
            }
        }
    }

    fn check_principle(&mut self, p: &PrincipleDef) {
        self.scopes.push();
        let got = self.infer(&p.body);
        self.scopes.pop();
        if !got.is_bool() {
            self.err(
                ErrorKind::TypeMismatch {
                    expected: "bool".into(),
                    got: got.display(),
                },
                format!("principle `{}` must be a bool statement, found {}", p.name.node, got.display()),
                p.body.span,
            );
        }
    }

    fn check_block(&mut self, block: &Block, ret: &Type) {
        self.scopes.push();
        for stmt in &block.stmts {
            self.check_stmt(stmt, ret);
        }
        self.scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &Stmt, ret: &Type) {
        match stmt {
            Stmt::Let(l) => self.check_let(l),
            Stmt::Assign(a) => self.check_assign(a),
            Stmt::Return(r) => {
                let got = self.infer_with(&r.value, Some(ret));
                self.expect_assignable(ret, &got, r.value.span);
                self.check_bounds(ret, &r.value);
            }
            Stmt::If(i) => {
                self.expect_bool(&i.cond, "if condition");
                self.check_block(&i.then_block, ret);
                if let Some(b) = &i.else_block {
                    self.check_block(b, ret);
                }
            }
            Stmt::Match(m) => {
                self.check_match(m, |cx, body| {
                    cx.check_block(body, ret);
                    Type::Unknown
                });
            }
            Stmt::Expr(e) => {
                self.infer(e);
            }
            Stmt::Pass(_) => {}
        }
    }

    fn check_let(&mut self, l: &LetStmt) {
        let params = self.type_params.clone();
        let declared = self.resolve_type_ref(&l.ty, &params);
        let got = self.infer_with(&l.value, Some(&declared));
        self.expect_assignable(&declared, &got, l.value.span);
        self.check_bounds(&declared, &l.value);
        self.bind(&l.name, declared, BindingKind::Variable);
    }

    fn check_assign(&mut self, a: &AssignStmt) {
        let Some(ty) = self.scopes.lookup(&a.target.node).map(|b| b.ty.clone()) else {
            self.err(
                ErrorKind::UndefinedSymbol(a.target.node.clone()),
                format!("assignment to undeclared variable `{}`", a.target.node),
                a.target.span,
            );
            self.infer(&a.value);
            return;
        };
        let got = self.infer_with(&a.value, Some(&ty));
        self.expect_assignable(&ty, &got, a.value.span);
        self.check_bounds(&ty, &a.value);
    }

    fn check_match<B>(
        &mut self,
        m: &Match<B>,
        mut body: impl FnMut(&mut Self, &B) -> Type,
    ) -> Vec<Type> {
        let scrutinee = self.infer(&m.scrutinee);
        if let Err(e) = check_match_exhaustiveness(m) {
            self.errors.push(e);
        }
        self.errors.extend(unreachable_arms(m));

        let mut out = Vec::with_capacity(m.arms.len());
        for arm in &m.arms {
            self.scopes.push();
            self.check_pattern(&arm.pattern, &scrutinee);
            if let Some(g) = &arm.guard {
                self.expect_bool(g, "match guard");
            }
            out.push(body(self, &arm.body));
            self.scopes.pop();
        }
        out
    }

    fn check_pattern(&mut self, pattern: &Pattern, scrutinee: &Type) {
        match pattern {
            Pattern::Wildcard { .. } => {}
            Pattern::Literal { span, value } => {
                let lit = self.literal_type(value, *span);
                if !is_assignable(scrutinee, &lit) && !is_assignable(&lit, scrutinee) {
                    self.mismatch(scrutinee, &lit, *span);
                }
            }
            Pattern::Variant { span, ty, variant } => {
                let got = self.variant_type(ty, variant, *span);
                self.expect_assignable(scrutinee, &got, *span);
            }
            Pattern::Binding(id) => self.bind(id, scrutinee.clone(), BindingKind::Variable),
            Pattern::Satisfies { test, .. } => {
                if self.env.legal_test(&test.node).is_none() {
                    self.err(
                        ErrorKind::UndefinedSymbol(test.node.clone()),
                        format!("`satisfies` names unknown legal test `{}`", test.node),
                        test.span,
                    );
                }
            }
        }
    }

    // ---- expressions ----

    fn infer(&mut self, e: &Expr) -> Type {
        self.infer_with(e, None)
    }

    fn infer_with(&mut self, e: &Expr, expected: Option<&Type>) -> Type {
        match &e.kind {
            ExprKind::Literal(lit) => self.literal_type(lit, e.span),
            ExprKind::Ident(id) => match self.scopes.lookup(&id.node) {
                Some(b) => b.ty.clone(),
                None => {
                    self.err(
                        ErrorKind::UndefinedSymbol(id.node.clone()),
                        format!("unknown name `{}`", id.node),
                        id.span,
                    );
                    Type::Unknown
                }
            },
            ExprKind::Variant { ty, variant } => self.variant_type(ty, variant, e.span),
            ExprKind::Unary { op, expr } => {
                let t = self.infer(expr);
                match op {
                    UnaryOp::Not => {
                        if !t.is_bool() {
                            self.mismatch(&Type::BOOL, &t, expr.span);
                        }
                        Type::BOOL
                    }
                    UnaryOp::Neg => {
                        if !t.is_numeric() {
                            self.mismatch_named("numeric type", &t, expr.span);
                            return Type::Unknown;
                        }
                        t.base().clone()
                    }
                }
            }
            ExprKind::Binary { left, op, right } => self.infer_binary(left, *op, right),
            ExprKind::Member { base, member } => {
                let bt = self.infer(base);
                match bt.base() {
                    Type::Unknown => Type::Unknown,
                    Type::Struct { name, args } => {
                        match self.env.field_type(name, args, &member.node) {
                            Some(t) => t,
                            None => {
                                self.err(
                                    ErrorKind::UnknownField {
                                        ty: name.clone(),
                                        field: member.node.clone(),
                                    },
                                    format!("struct `{name}` has no field `{}`", member.node),
                                    member.span,
                                );
                                Type::Unknown
                            }
                        }
                    }
                    other => {
                        let other = other.clone();
                        self.mismatch_named("struct", &other, base.span);
                        Type::Unknown
                    }
                }
            }
            ExprKind::Call { callee, args } => self.infer_call(callee, args),
            ExprKind::StructLit { name, fields } => self.infer_struct_lit(name, fields, expected),
            ExprKind::Match(m) => {
                let arms = self.check_match(&**m, |cx, body| cx.infer_with(body, expected));
                let mut result = Type::Unknown;
                for (arm, t) in m.arms.iter().zip(arms) {
                    if result.is_unknown() {
                        result = t;
                    } else {
                        self.expect_assignable(&result.clone(), &t, arm.body.span);
                    }
                }
                result
            }
            ExprKind::Satisfies { test, subject } => {
                self.infer(subject);
                if self.env.legal_test(&test.node).is_none() {
                    self.err(
                        ErrorKind::UndefinedSymbol(test.node.clone()),
                        format!("`satisfies` names unknown legal test `{}`", test.node),
                        test.span,
                    );
                }
                Type::BOOL
            }
            ExprKind::Quantifier { kind, var, ty, body } => {
                let params = self.type_params.clone();
                let bound = self.resolve_type_ref(ty, &params);
                self.scopes.push();
                self.bind(var, bound, BindingKind::QuantifierBound);
                let got = self.infer(body);
                self.scopes.pop();
                if !got.is_bool() {
                    self.err(
                        ErrorKind::TypeMismatch {
                            expected: "bool".into(),
                            got: got.display(),
                        },
                        format!("body of `{}` must be bool, found {}", kind.keyword(), got.display()),
                        body.span,
                    );
                }
                Type::BOOL
            }
        }
    }

    fn literal_type(&mut self, lit: &Literal, span: Span) -> Type {
        let p = match lit {
            Literal::Int(_) => Primitive::Int,
            Literal::Float(_) => Primitive::Float,
            Literal::Bool(_) => Primitive::Bool,
            Literal::String(_) => Primitive::String,
            Literal::Money(_) => Primitive::Money,
            Literal::Percent(_) => Primitive::Percent,
            Literal::Date(text) => {
                self.date(text, span);
                Primitive::Date
            }
            Literal::Duration(_) => Primitive::Duration,
            Literal::Pass => Primitive::Pass,
        };
        Type::Primitive(p)
    }

    fn variant_type(&mut self, ty: &Ident, variant: &Ident, span: Span) -> Type {
        let Some(info) = self.env.enum_info(&ty.node) else {
            self.err(
                ErrorKind::UndefinedSymbol(ty.node.clone()),
                format!("unknown enum `{}`", ty.node),
                ty.span,
            );
            return Type::Unknown;
        };
        if !info.has_variant(&variant.node) {
            let path = format!("{}::{}", ty.node, variant.node);
            self.err(
                ErrorKind::UndefinedSymbol(path.clone()),
                format!("enum `{}` has no variant `{}`", ty.node, variant.node),
                span,
            );
        }
        Type::Enum(ty.node.clone())
    }

    fn infer_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Type {
        let l = self.infer(left);
        let r = self.infer(right);

        if op.is_logical() {
            for (t, side) in [(&l, left), (&r, right)] {
                if !t.is_bool() {
                    self.mismatch(&Type::BOOL, t, side.span);
                }
            }
            return Type::BOOL;
        }

        if op.is_comparison() {
            let ok = if matches!(op, BinOp::Eq | BinOp::Ne) {
                is_assignable(&l, &r) || is_assignable(&r, &l)
            } else {
                l.is_ordered()
                    && r.is_ordered()
                    && (l.is_numeric() == r.is_numeric())
                    && (l.is_numeric() || is_assignable(&l, &r))
            };
            if !ok {
                self.mismatch(&l, &r, right.span);
            }
            return Type::BOOL;
        }

        use Primitive::{Date, Duration, Float};
        match (l.base(), r.base()) {
            (Type::Primitive(Date), Type::Primitive(Duration))
                if matches!(op, BinOp::Add | BinOp::Sub) =>
            {
                return Type::Primitive(Date);
            }
            (Type::Primitive(Duration), Type::Primitive(Duration))
                if matches!(op, BinOp::Add | BinOp::Sub) =>
            {
                return Type::Primitive(Duration);
            }
            _ => {}
        }
        if !l.is_numeric() {
            self.mismatch_named("numeric type", &l, left.span);
            return Type::Unknown;
        }
        if !r.is_numeric() {
            self.mismatch_named("numeric type", &r, right.span);
            return Type::Unknown;
        }
        match (l.base(), r.base()) {
            (Type::Primitive(Float), _) | (_, Type::Primitive(Float)) => Type::Primitive(Float),
            (Type::Primitive(Primitive::Int), other) => other.clone(),
            (other, _) => other.clone(),
        }
    }

    fn infer_call(&mut self, callee: &Ident, args: &[Expr]) -> Type {
        let arg_tys: Vec<Type> = args.iter().map(|a| self.infer(a)).collect();
        let Some(sig) = self.env.function(&callee.node).cloned() else {
            self.err(
                ErrorKind::UndefinedSymbol(callee.node.clone()),
                format!("unknown function `{}`", callee.node),
                callee.span,
            );
            return Type::Unknown;
        };
        if sig.params.len() != args.len() {
            self.err(
                ErrorKind::ArityMismatch {
                    expected: sig.params.len(),
                    got: args.len(),
                },
                format!(
                    "function `{}` takes {} argument(s), found {}",
                    sig.name,
                    sig.params.len(),
                    args.len()
                ),
                callee.span,
            );
            return Type::Unknown;
        }

        let mut binding = GenericBinding::default();
        for ((_, pty), (arg, aty)) in sig.params.iter().zip(args.iter().zip(&arg_tys)) {
            if let Type::Var(v) = pty {
                if sig.type_params.contains(v) && binding.get(v).is_none() {
                    binding.bind(v, aty.clone());
                    continue;
                }
            }
            let expected = binding.substitute(pty);
            self.expect_assignable(&expected, aty, arg.span);
        }
        let ret = binding.substitute(&sig.ret);
        if ret.contains_var() && !sig.type_params.is_empty() {
            Type::Unknown
        } else {
            ret
        }
    }

    fn infer_struct_lit(
        &mut self,
        name: &Ident,
        fields: &[(Ident, Expr)],
        expected: Option<&Type>,
    ) -> Type {
        let Some(id) = self.env.id(&name.node).filter(|id| self.env.struct_info(*id).is_some())
        else {
            self.err(
                ErrorKind::UndefinedSymbol(name.node.clone()),
                format!("unknown struct `{}`", name.node),
                name.span,
            );
            for (_, v) in fields {
                self.infer(v);
            }
            return Type::Unknown;
        };
        let params = self.env.get(id).type_params.clone();
        let effective: Vec<FieldInfo> = self.env.effective_fields(id).into_iter().cloned().collect();

        let mut binding = match expected.map(Type::base) {
            Some(Type::Struct { name: n, args }) if *n == name.node && args.len() == params.len() => {
                GenericBinding::new(&params, args)
            }
            _ => GenericBinding::default(),
        };

        let mut provided: HashSet<&str> = HashSet::new();
        for (fname, value) in fields {
            if !provided.insert(fname.node.as_str()) {
                self.err(
                    ErrorKind::DuplicateField(fname.node.clone()),
                    format!("field `{}` is given twice in `{}` literal", fname.node, name.node),
                    fname.span,
                );
                continue;
            }
            let Some(info) = effective.iter().rev().find(|f| f.name == fname.node) else {
                self.err(
                    ErrorKind::UnknownField {
                        ty: name.node.clone(),
                        field: fname.node.clone(),
                    },
                    format!("struct `{}` has no field `{}`", name.node, fname.node),
                    fname.span,
                );
                self.infer(value);
                continue;
            };
            let field_ty = binding.substitute(&info.ty);
            let got = self.infer_with(value, Some(&field_ty));
            match &field_ty {
                Type::Var(v) if params.contains(v) => {
                    if !got.is_unknown() {
                        binding.bind(v, got);
                    }
                }
                _ => self.expect_assignable(&field_ty, &got, value.span),
            }
            self.check_bounds(&field_ty, value);
            self.check_field_value(info, value);
        }

        let mut reported: HashSet<&str> = HashSet::new();
        for f in &effective {
            if !provided.contains(f.name.as_str()) && reported.insert(f.name.as_str()) {
                self.err(
                    ErrorKind::MissingField {
                        ty: name.node.clone(),
                        field: f.name.clone(),
                    },
                    format!("`{}` literal is missing field `{}`", name.node, f.name),
                    name.span,
                );
            }
        }

        Type::Struct {
            name: name.node.clone(),
            args: params
                .iter()
                .map(|p| binding.get(p).cloned().unwrap_or(Type::Unknown))
                .collect(),
        }
    }

    /// Refinement bounds against a constant value.
    fn check_bounds(&mut self, ty: &Type, value: &Expr) {
        self.check_constraint_wrappers(ty, value);
        let Some((lower, upper)) = ty.bounds() else {
            return;
        };
        let Some(v) = consteval::eval(value, &|_| None) else {
            return;
        };
        let (below, above, shown) = match v {
            ConstValue::Int(n) => (
                lower.is_some_and(|lo| n < lo),
                upper.is_some_and(|hi| n > hi),
                n.to_string(),
            ),
            ConstValue::Float(x) => (
                lower.is_some_and(|lo| x < lo as f64),
                upper.is_some_and(|hi| x > hi as f64),
                x.to_string(),
            ),
            _ => return,
        };
        if below || above {
            self.err(
                ErrorKind::OutOfBounds,
                format!("value {shown} is out of bounds for {}", ty.display()),
                value.span,
            );
        }
    }

    /// `Positive`, `NonEmpty` and `ValidDate` against a constant value.
    fn check_constraint_wrappers(&mut self, ty: &Type, value: &Expr) {
        let violated = match ty {
            Type::Temporal { inner, .. } => return self.check_constraint_wrappers(inner, value),
            Type::Positive(inner) => {
                self.check_constraint_wrappers(inner, value);
                match consteval::eval(value, &|_| None) {
                    Some(ConstValue::Float(x)) => x <= 0.0,
                    // Integers go through `check_bounds`.
                    _ => false,
                }
            }
            Type::NonEmpty(inner) => {
                self.check_constraint_wrappers(inner, value);
                matches!(consteval::eval(value, &|_| None), Some(ConstValue::Str(s)) if s.is_empty())
            }
            Type::ValidDate { after, before } => {
                let ExprKind::Literal(Literal::Date(text)) = &value.kind else {
                    return;
                };
                let Some(d) = parse_date(text) else {
                    return;
                };
                after.is_some_and(|a| d <= a) || before.is_some_and(|b| d >= b)
            }
            _ => false,
        };
        if violated {
            self.err(
                ErrorKind::ConstraintViolation(ty.display()),
                format!("value does not satisfy {}", ty.display()),
                value.span,
            );
        }
    }

    /// A field's own constraint against a constant value.
    fn check_field_value(&mut self, field: &FieldInfo, value: &Expr) {
        let Some(constraint) = &field.constraint else {
            return;
        };
        let Some(v) = consteval::eval(value, &|_| None) else {
            return;
        };
        let holds = consteval::eval(constraint, &|name| (name == field.name).then(|| v.clone()));
        if holds == Some(ConstValue::Bool(false)) {
            self.err(
                ErrorKind::ConstraintViolation(field.name.clone()),
                format!(
                    "value violates the constraint on field `{}` declared in `{}`",
                    field.name, field.owner
                ),
                value.span,
            );
        }
    }

    // ---- helpers ----

    fn bind(&mut self, name: &Ident, ty: Type, kind: BindingKind) {
        let binding = Binding {
            ty,
            span: name.span,
            kind,
        };
        match self.scopes.define(&name.node, binding) {
            Define::Fresh => {}
            Define::Shadows(_) => {
                if self.options.report_shadowing {
                    self.warnings.push(SemanticError::new(
                        ErrorKind::ShadowedBinding(name.node.clone()),
                        format!("`{}` shadows an outer binding", name.node),
                        name.span,
                    ));
                }
            }
            Define::Duplicate(_) => self.err(
                ErrorKind::DuplicateDefinition(name.node.clone()),
                format!("`{}` is already defined in this scope", name.node),
                name.span,
            ),
        }
    }

    fn expect_bool(&mut self, e: &Expr, what: &str) {
        let t = self.infer(e);
        if !t.is_bool() {
            self.err(
                ErrorKind::TypeMismatch {
                    expected: "bool".into(),
                    got: t.display(),
                },
                format!("{what} must be bool, found {}", t.display()),
                e.span,
            );
        }
    }

    fn expect_assignable(&mut self, expected: &Type, got: &Type, span: Span) {
        if is_assignable(expected, got) {
            return;
        }
        if let (Type::Struct { name: e, .. }, Type::Struct { name: g, .. }) =
            (expected.base(), got.base())
        {
            if self.env.is_subtype(g, e) {
                return;
            }
        }
        self.mismatch(expected, got, span);
    }

    fn mismatch(&mut self, expected: &Type, got: &Type, span: Span) {
        self.mismatch_named(&expected.display(), got, span);
    }

    fn mismatch_named(&mut self, expected: &str, got: &Type, span: Span) {
        self.err(
            ErrorKind::TypeMismatch {
                expected: expected.to_string(),
                got: got.display(),
            },
            format!("type mismatch: expected {expected}, found {}", got.display()),
            span,
        );
    }
}

/// Calls `f` on every name an expression reads (not member names or callees).
fn walk_idents(e: &Expr, f: &mut dyn FnMut(&Ident)) {
    match &e.kind {
        ExprKind::Ident(id) => f(id),
        ExprKind::Literal(_) | ExprKind::Variant { .. } => {}
        ExprKind::Unary { expr, .. } => walk_idents(expr, f),
        ExprKind::Binary { left, right, .. } => {
            walk_idents(left, f);
            walk_idents(right, f);
        }
        ExprKind::Member { base, .. } => walk_idents(base, f),
        ExprKind::Call { args, .. } => {
            for a in args {
                walk_idents(a, f);
            }
        }
        ExprKind::StructLit { fields, .. } => {
            for (_, v) in fields {
                walk_idents(v, f);
            }
        }
        ExprKind::Match(m) => {
            walk_idents(&m.scrutinee, f);
            for arm in &m.arms {
                if let Some(g) = &arm.guard {
                    walk_idents(g, f);
                }
                walk_idents(&arm.body, f);
            }
        }
        ExprKind::Satisfies { subject, .. } => walk_idents(subject, f),
        ExprKind::Quantifier { var, body, .. } => {
            walk_idents(body, &mut |id: &Ident| {
                if id.node != var.node {
                    f(id);
                }
            });
        }
    }
}
