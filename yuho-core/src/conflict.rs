#![forbid(unsafe_code)]

//! Cross-program conflicts between same-named structs, enums and legal tests.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use yuho_ast::Span;

use crate::env::TypeDefKind;
use crate::error::{ErrorKind, SemanticError};
use crate::sema::TypedProgram;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConflictKind {
    StructConflict,
    EnumConflict,
    LegalTestConflict,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::StructConflict => "struct",
            ConflictKind::EnumConflict => "enum",
            ConflictKind::LegalTestConflict => "legal test",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub name: String,
    pub location_a: Span,
    pub location_b: Span,
    pub description: String,
}

impl Conflict {
    /// Renders as a diagnostic located in the first program.
    pub fn to_diagnostic(&self) -> SemanticError {
        SemanticError::new(
            ErrorKind::ConflictDetected(self.name.clone()),
            self.description.clone(),
            self.location_a,
        )
    }
}

/// Conflicts between one pair of programs. Holds copies only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub file_a: String,
    pub file_b: String,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    pub fn diagnostics(&self) -> Vec<SemanticError> {
        self.conflicts.iter().map(Conflict::to_diagnostic).collect()
    }
}

/// Declared shape of one definition, in comparable form.
struct Shape {
    location: Span,
    members: Vec<String>,
}

fn shapes(p: &TypedProgram) -> BTreeMap<(ConflictKind, String), Shape> {
    let env = &p.env;
    let mut out = BTreeMap::new();

    for id in env.ids() {
        let def = env.get(id);
        let (kind, members) = match &def.kind {
            TypeDefKind::Enum(e) => (ConflictKind::EnumConflict, e.variants.clone()),
            TypeDefKind::Struct(s) => {
                let mut members = Vec::new();
                if !def.type_params.is_empty() {
                    members.push(format!("<{}>", def.type_params.join(", ")));
                }
                if let Some(parent) = s.parent {
                    members.push(format!("extends {}", env.get(parent).name));
                }
                members.extend(
                    s.fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, f.ty.display())),
                );
                (ConflictKind::StructConflict, members)
            }
            TypeDefKind::Alias(_) => continue,
        };
        out.insert(
            (kind, def.name.clone()),
            Shape {
                location: def.span,
                members,
            },
        );
    }

    for t in env.legal_tests() {
        out.insert(
            (ConflictKind::LegalTestConflict, t.name.clone()),
            Shape {
                location: t.span,
                members: t
                    .requirements
                    .iter()
                    .map(|r| format!("{}: {}", r.name, r.ty.display()))
                    .collect(),
            },
        );
    }
    out
}

fn with_article(kind: ConflictKind) -> String {
    match kind {
        ConflictKind::EnumConflict => format!("an {kind}"),
        _ => format!("a {kind}"),
    }
}

/// Compares every struct, enum and legal test declared in both programs.
///
/// `None` when nothing conflicts. Swapping the arguments yields the same
/// names with the locations swapped.
#[tracing::instrument(skip_all, fields(a = %a.name, b = %b.name))]
pub fn check_conflict(a: &TypedProgram, b: &TypedProgram) -> Option<ConflictReport> {
    compare(&a.name, a, &b.name, b)
}

fn compare(
    label_a: &str,
    a: &TypedProgram,
    label_b: &str,
    b: &TypedProgram,
) -> Option<ConflictReport> {
    let (sa, sb) = (shapes(a), shapes(b));
    let mut conflicts = Vec::new();

    for ((kind, name), shape_a) in &sa {
        let Some(shape_b) = sb.get(&(*kind, name.clone())) else {
            continue;
        };
        if shape_a.members == shape_b.members {
            continue;
        }
        conflicts.push(Conflict {
            kind: *kind,
            name: name.clone(),
            location_a: shape_a.location,
            location_b: shape_b.location,
            description: format!(
                "{kind} `{name}` is declared differently: {label_a} has [{}], {label_b} has [{}]",
                shape_a.members.join(", "),
                shape_b.members.join(", ")
            ),
        });
    }

    // A name declared as a struct on one side and an enum on the other. Always
    // reported as a struct conflict so both argument orders agree.
    for ((kind, name), shape_a) in &sa {
        let other = match kind {
            ConflictKind::StructConflict => ConflictKind::EnumConflict,
            ConflictKind::EnumConflict => ConflictKind::StructConflict,
            ConflictKind::LegalTestConflict => continue,
        };
        let Some(shape_b) = sb.get(&(other, name.clone())) else {
            continue;
        };
        conflicts.push(Conflict {
            kind: ConflictKind::StructConflict,
            name: name.clone(),
            location_a: shape_a.location,
            location_b: shape_b.location,
            description: format!(
                "`{name}` is declared as {} in {label_a} but as {} in {label_b}",
                with_article(*kind),
                with_article(other)
            ),
        });
    }

    tracing::debug!(conflicts = conflicts.len(), "conflict check finished");
    if conflicts.is_empty() {
        None
    } else {
        Some(ConflictReport {
            file_a: label_a.to_string(),
            file_b: label_b.to_string(),
            conflicts,
        })
    }
}

/// Registry of checked programs keyed by file name.
#[derive(Debug, Default)]
pub struct ConflictDetector {
    programs: BTreeMap<String, TypedProgram>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_program(&mut self, file: impl Into<String>, program: TypedProgram) {
        self.programs.insert(file.into(), program);
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// `None` when either file is unknown or nothing conflicts.
    pub fn check_pair(&self, file_a: &str, file_b: &str) -> Option<ConflictReport> {
        let a = self.programs.get(file_a)?;
        let b = self.programs.get(file_b)?;
        compare(file_a, a, file_b, b)
    }

    /// Every unordered pair, checked in parallel; reports come back in file order.
    pub fn check_all(&self) -> Vec<ConflictReport> {
        let files: Vec<(&String, &TypedProgram)> = self.programs.iter().collect();
        let pairs: Vec<(usize, usize)> = (0..files.len())
            .flat_map(|i| (i + 1..files.len()).map(move |j| (i, j)))
            .collect();
        pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let (fa, pa) = files[i];
                let (fb, pb) = files[j];
                compare(fa, pa, fb, pb)
            })
            .collect()
    }
}
