#![forbid(unsafe_code)]

//! Control-flow reachability for functions returning a `mutually_exclusive` enum.
//!
//! Only discriminators whose branches partition the input are exclusive:
//! `if`/`else`, and `match` arms with distinct fixed patterns. An `if` with
//! no `else` that returns, followed by more returns, is not: its condition
//! may overlap what comes after, so the classification depends on statement
//! order. Likewise two or more guarded / `satisfies` / binding arms in one
//! match. Returning different variants across such a non-exclusive split is
//! an `AmbiguousVariantPathError`.
//!
//! Analysis is single-function and single-pass; calls are not followed.

use std::collections::BTreeMap;

use yuho_ast::{Block, Expr, ExprKind, FunctionDef, Match, Pattern, Span, Stmt};

use crate::env::EnumInfo;
use crate::error::{ErrorKind, SemanticError};
use crate::legal::PatternKey;

/// Return summary for a region of code.
#[derive(Clone, Debug, Default)]
struct Flow {
    /// Variants that may be returned, with the span of the first return of each.
    variants: BTreeMap<String, Span>,
    /// Every path through the region ends in a return.
    terminates: bool,
}

impl Flow {
    fn returning(variants: BTreeMap<String, Span>) -> Self {
        Self {
            variants,
            terminates: true,
        }
    }

    /// Union of branches that can never both run.
    fn exclusive(branches: Vec<Flow>, terminates: bool) -> Self {
        let mut variants = BTreeMap::new();
        for b in branches {
            for (v, span) in b.variants {
                variants.entry(v).or_insert(span);
            }
        }
        Self {
            variants,
            terminates,
        }
    }
}

pub fn check_mutual_exclusivity(
    function: &FunctionDef,
    enum_info: &EnumInfo,
) -> Result<(), SemanticError> {
    let analyzer = Analyzer { enum_info };
    let flow = analyzer.block(&function.body)?;
    tracing::debug!(
        function = %function.name.node,
        enum_name = %enum_info.name,
        variants = flow.variants.len(),
        "mutual exclusivity holds"
    );
    Ok(())
}

struct Analyzer<'a> {
    enum_info: &'a EnumInfo,
}

impl Analyzer<'_> {
    fn block(&self, block: &Block) -> Result<Flow, SemanticError> {
        let mut acc = Flow::default();
        for stmt in &block.stmts {
            let next = self.stmt(stmt)?;
            acc = self.sequence(acc, next)?;
            if acc.terminates {
                // Anything after is unreachable.
                break;
            }
        }
        Ok(acc)
    }

    fn stmt(&self, stmt: &Stmt) -> Result<Flow, SemanticError> {
        match stmt {
            Stmt::Return(r) => Ok(Flow::returning(self.expr_variants(&r.value)?)),
            Stmt::If(i) => {
                let then = self.block(&i.then_block)?;
                let other = match &i.else_block {
                    Some(b) => self.block(b)?,
                    None => Flow::default(),
                };
                let terminates = then.terminates && other.terminates;
                Ok(Flow::exclusive(vec![then, other], terminates))
            }
            Stmt::Match(m) => self.arms(m, |b| self.block(b)),
            Stmt::Let(_) | Stmt::Assign(_) | Stmt::Expr(_) | Stmt::Pass(_) => Ok(Flow::default()),
        }
    }

    fn expr_variants(&self, expr: &Expr) -> Result<BTreeMap<String, Span>, SemanticError> {
        match &expr.kind {
            ExprKind::Variant { ty, variant } if ty.node == self.enum_info.name => {
                Ok(BTreeMap::from([(variant.node.clone(), expr.span)]))
            }
            ExprKind::Match(m) => {
                let flow = self.arms(&**m, |e| Ok(Flow::returning(self.expr_variants(e)?)))?;
                Ok(flow.variants)
            }
            _ => Ok(BTreeMap::new()),
        }
    }

    /// `first` did not terminate, so its returns sit beside `then`'s with no
    /// discriminator between them.
    fn sequence(&self, first: Flow, then: Flow) -> Result<Flow, SemanticError> {
        if !first.variants.is_empty() && !then.variants.is_empty() {
            let mut all: Vec<String> = first
                .variants
                .keys()
                .chain(then.variants.keys())
                .cloned()
                .collect();
            all.sort();
            all.dedup();
            let culprit = then
                .variants
                .iter()
                .find(|(v, _)| !first.variants.contains_key(*v))
                .or_else(|| then.variants.iter().next());
            if let (true, Some((variant, span))) = (all.len() > 1, culprit) {
                return Err(self.ambiguous(all, variant, *span));
            }
        }
        let terminates = then.terminates;
        Ok(Flow::exclusive(vec![first, then], terminates))
    }

    fn arms<B>(
        &self,
        m: &Match<B>,
        mut body: impl FnMut(&B) -> Result<Flow, SemanticError>,
    ) -> Result<Flow, SemanticError> {
        let mut seen: Vec<PatternKey> = Vec::new();
        let mut fixed = Vec::new();
        let mut open = Flow::default();
        let mut has_wildcard = false;
        let mut all_terminate = true;

        for arm in &m.arms {
            if has_wildcard {
                break;
            }
            let is_open = arm.guard.is_some()
                || matches!(
                    arm.pattern,
                    Pattern::Satisfies { .. } | Pattern::Binding(_)
                );
            if !is_open {
                if let Some(key) = PatternKey::of(&arm.pattern) {
                    if seen.contains(&key) {
                        continue;
                    }
                    seen.push(key);
                }
            }
            if let Pattern::Wildcard { .. } = arm.pattern {
                has_wildcard = true;
            }

            let flow = body(&arm.body)?;
            all_terminate &= flow.terminates;
            if is_open {
                // Open arms may overlap each other, so they combine like
                // consecutive fall-through branches.
                let mut as_branch = flow;
                as_branch.terminates = false;
                open = self.sequence(open, as_branch)?;
            } else {
                fixed.push(flow);
            }
        }

        fixed.push(open);
        Ok(Flow::exclusive(fixed, has_wildcard && all_terminate))
    }

    fn ambiguous(&self, variants: Vec<String>, at: &str, span: Span) -> SemanticError {
        let listed = variants
            .iter()
            .map(|v| format!("`{}::{v}`", self.enum_info.name))
            .collect::<Vec<_>>()
            .join(", ");
        SemanticError::new(
            ErrorKind::AmbiguousVariantPath { variants },
            format!(
                "ambiguous variant path: {listed} of mutually exclusive enum `{}` are returned \
                 from sibling branches with no exclusive discriminator (at `{at}`)",
                self.enum_info.name
            ),
            span,
        )
    }
}
