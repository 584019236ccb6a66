#![forbid(unsafe_code)]

//! Scope Stack: nested symbol tables for variables, parameters and
//! quantifier-bound names.

use std::collections::HashMap;

use yuho_ast::Span;

use crate::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Parameter,
    QuantifierBound,
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub ty: Type,
    pub span: Span,
    pub kind: BindingKind,
}

/// Outcome of [`ScopeStack::define`].
#[derive(Clone, Debug, PartialEq)]
pub enum Define {
    Fresh,
    /// Hides a binding of an enclosing scope; carries that binding's span.
    Shadows(Span),
    /// Same name already bound in the innermost scope; carries its span.
    Duplicate(Span),
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Binding>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Starts with one (global) frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn define(&mut self, name: &str, binding: Binding) -> Define {
        let shadowed = self.frames[..self.frames.len() - 1]
            .iter()
            .rev()
            .find_map(|f| f.get(name).map(|b| b.span));
        let Some(top) = self.frames.last_mut() else {
            return Define::Fresh;
        };
        if let Some(existing) = top.get(name) {
            return Define::Duplicate(existing.span);
        }
        top.insert(name.to_string(), binding);
        match shadowed {
            Some(span) => Define::Shadows(span),
            None => Define::Fresh,
        }
    }

    /// Innermost binding wins.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    pub fn shadows(&self, name: &str) -> bool {
        self.frames.iter().filter(|f| f.contains_key(name)).count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(ty: Type) -> Binding {
        Binding {
            ty,
            span: Span::default(),
            kind: BindingKind::Variable,
        }
    }

    #[test]
    fn innermost_binding_wins_and_pops_restore() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.define("x", bind(Type::INT)), Define::Fresh);
        scopes.push();
        assert!(matches!(
            scopes.define("x", bind(Type::BOOL)),
            Define::Shadows(_)
        ));
        assert!(scopes.shadows("x"));
        assert_eq!(scopes.lookup("x").map(|b| &b.ty), Some(&Type::BOOL));
        scopes.pop();
        assert_eq!(scopes.lookup("x").map(|b| &b.ty), Some(&Type::INT));
        assert!(!scopes.shadows("x"));
    }

    #[test]
    fn same_frame_redefinition_is_duplicate() {
        let mut scopes = ScopeStack::new();
        scopes.define("x", bind(Type::INT));
        assert!(matches!(
            scopes.define("x", bind(Type::INT)),
            Define::Duplicate(_)
        ));
    }

    #[test]
    fn global_frame_survives_extra_pops() {
        let mut scopes = ScopeStack::new();
        scopes.define("g", bind(Type::INT));
        scopes.pop();
        scopes.pop();
        assert_eq!(scopes.depth(), 1);
        assert!(scopes.lookup("g").is_some());
    }
}
