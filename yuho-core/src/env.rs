#![forbid(unsafe_code)]

//! Type Environment: name -> definition, stored in an arena.
//!
//! Parent links are arena indices, so a cyclic `extends` chain is just a loop
//! of integers and never an ownership cycle.

use std::collections::{BTreeMap, HashMap, HashSet};

use yuho_ast::{Expr, Span, TypeExpr};

use crate::types::{GenericBinding, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: String,
    pub span: Span,
    pub type_params: Vec<String>,
    pub kind: TypeDefKind,
}

#[derive(Clone, Debug)]
pub enum TypeDefKind {
    Struct(StructInfo),
    Enum(EnumInfo),
    /// Resolved lazily at each use so generic arguments can be substituted.
    Alias(TypeExpr),
}

#[derive(Clone, Debug, Default)]
pub struct StructInfo {
    pub parent: Option<TypeId>,
    pub fields: Vec<FieldInfo>,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub span: Span,
    pub constraint: Option<Expr>,
    /// Struct that declares the field (differs from the lookup struct when inherited).
    pub owner: String,
}

#[derive(Clone, Debug)]
pub struct EnumInfo {
    pub name: String,
    pub variants: Vec<String>,
    pub mutually_exclusive: bool,
}

impl EnumInfo {
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

#[derive(Clone, Debug)]
pub struct LegalTestInfo {
    pub name: String,
    pub span: Span,
    pub requirements: Vec<RequirementInfo>,
}

#[derive(Clone, Debug)]
pub struct RequirementInfo {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

impl LegalTestInfo {
    /// Requirement names in declaration order; the test holds iff all of them do.
    pub fn conjunction(&self) -> impl Iterator<Item = &str> {
        self.requirements.iter().map(|r| r.name.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct FunctionSig {
    pub name: String,
    pub span: Span,
    pub type_params: Vec<String>,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

#[derive(Clone, Debug, Default)]
pub struct TypeEnv {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
    legal_tests: BTreeMap<String, LegalTestInfo>,
    functions: BTreeMap<String, FunctionSig>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. On a name clash the existing id is returned as `Err`.
    pub fn declare(&mut self, def: TypeDef) -> Result<TypeId, TypeId> {
        if let Some(&existing) = self.by_name.get(&def.name) {
            return Err(existing);
        }
        let id = TypeId(u32::try_from(self.defs.len()).unwrap_or(u32::MAX));
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: TypeId) -> &TypeDef {
        &self.defs[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeDef {
        &mut self.defs[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDef> {
        self.id(name).map(|id| self.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.defs.len()).map(|i| TypeId(i as u32))
    }

    pub fn struct_info(&self, id: TypeId) -> Option<&StructInfo> {
        match &self.get(id).kind {
            TypeDefKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn enum_info(&self, name: &str) -> Option<&EnumInfo> {
        match &self.lookup(name)?.kind {
            TypeDefKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.id(name).and_then(|id| self.struct_info(id)).is_some()
    }

    pub fn set_parent(&mut self, child: TypeId, parent: TypeId) {
        if let TypeDefKind::Struct(s) = &mut self.get_mut(child).kind {
            s.parent = Some(parent);
        }
    }

    /// Ancestors from `id` upwards, stopping before the first repeated id.
    ///
    /// The second value is that repeated id when the chain loops.
    pub fn parent_chain(&self, id: TypeId) -> (Vec<TypeId>, Option<TypeId>) {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if !seen.insert(c) {
                return (chain, Some(c));
            }
            chain.push(c);
            cur = self.struct_info(c).and_then(|s| s.parent);
        }
        (chain, None)
    }

    /// Effective fields root-to-leaf: ancestors' fields before the child's own.
    ///
    /// A looping chain contributes each struct once. Duplicates are kept;
    /// reporting them is the checker's job.
    pub fn effective_fields(&self, id: TypeId) -> Vec<&FieldInfo> {
        let (chain, _) = self.parent_chain(id);
        chain
            .iter()
            .rev()
            .filter_map(|&c| self.struct_info(c))
            .flat_map(|s| s.fields.iter())
            .collect()
    }

    /// Field lookup through inheritance, with generic parameters of `args` applied.
    pub fn field_type(&self, struct_name: &str, args: &[Type], field: &str) -> Option<Type> {
        let id = self.id(struct_name)?;
        let def = self.get(id);
        let binding = GenericBinding::new(&def.type_params, args);
        self.effective_fields(id)
            .into_iter()
            .rev()
            .find(|f| f.name == field)
            .map(|f| binding.substitute(&f.ty))
    }

    /// Nominal subtyping: `child` is `ancestor` or extends it transitively.
    pub fn is_subtype(&self, child: &str, ancestor: &str) -> bool {
        let (Some(c), Some(a)) = (self.id(child), self.id(ancestor)) else {
            return false;
        };
        self.parent_chain(c).0.contains(&a)
    }

    /// Checks arity and builds the parameter substitution for `name<args>`.
    pub fn instantiate(&self, name: &str, args: &[Type]) -> Result<GenericBinding, (usize, usize)> {
        let Some(def) = self.lookup(name) else {
            return Ok(GenericBinding::default());
        };
        if def.type_params.len() != args.len() {
            return Err((def.type_params.len(), args.len()));
        }
        Ok(GenericBinding::new(&def.type_params, args))
    }

    pub fn add_legal_test(&mut self, test: LegalTestInfo) -> Result<(), LegalTestInfo> {
        if self.legal_tests.contains_key(&test.name) {
            return Err(test);
        }
        self.legal_tests.insert(test.name.clone(), test);
        Ok(())
    }

    pub fn legal_test(&self, name: &str) -> Option<&LegalTestInfo> {
        self.legal_tests.get(name)
    }

    pub fn legal_tests(&self) -> impl Iterator<Item = &LegalTestInfo> {
        self.legal_tests.values()
    }

    pub fn add_function(&mut self, sig: FunctionSig) -> Result<(), FunctionSig> {
        if self.functions.contains_key(&sig.name) {
            return Err(sig);
        }
        self.functions.insert(sig.name.clone(), sig);
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yuho_ast::Primitive;

    fn strukt(name: &str, fields: &[&str]) -> TypeDef {
        TypeDef {
            name: name.to_string(),
            span: Span::default(),
            type_params: Vec::new(),
            kind: TypeDefKind::Struct(StructInfo {
                parent: None,
                fields: fields
                    .iter()
                    .map(|f| FieldInfo {
                        name: f.to_string(),
                        ty: Type::Primitive(Primitive::Bool),
                        span: Span::default(),
                        constraint: None,
                        owner: name.to_string(),
                    })
                    .collect(),
            }),
        }
    }

    #[test]
    fn effective_fields_are_root_to_leaf() {
        let mut env = TypeEnv::new();
        let base = env.declare(strukt("Act", &["voluntary"])).unwrap();
        let mid = env.declare(strukt("DishonestAct", &["dishonest"])).unwrap();
        let leaf = env.declare(strukt("Theft", &["moveable"])).unwrap();
        env.set_parent(mid, base);
        env.set_parent(leaf, mid);

        let names: Vec<_> = env
            .effective_fields(leaf)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["voluntary", "dishonest", "moveable"]);
        assert!(env.is_subtype("Theft", "Act"));
        assert!(!env.is_subtype("Act", "Theft"));
    }

    #[test]
    fn parent_chain_stops_at_loop() {
        let mut env = TypeEnv::new();
        let a = env.declare(strukt("A", &[])).unwrap();
        let b = env.declare(strukt("B", &[])).unwrap();
        env.set_parent(a, b);
        env.set_parent(b, a);
        let (chain, repeated) = env.parent_chain(a);
        assert_eq!(chain, vec![a, b]);
        assert_eq!(repeated, Some(a));
        assert_eq!(env.effective_fields(a).len(), 0);
    }

    #[test]
    fn redeclaring_a_name_is_rejected() {
        let mut env = TypeEnv::new();
        let first = env.declare(strukt("A", &[])).unwrap();
        assert_eq!(env.declare(strukt("A", &[])), Err(first));
    }
}
