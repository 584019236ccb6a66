#![forbid(unsafe_code)]

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use yuho_ast::Primitive;

/// A resolved type. Aliases never survive resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Type {
    /// Produced after an error so checking can continue without cascades.
    Unknown,
    Primitive(Primitive),
    Struct {
        name: String,
        args: Vec<Type>,
    },
    Enum(String),
    Var(String),
    Refinement {
        base: Box<Type>,
        lower: Option<i64>,
        upper: Option<i64>,
    },
    Citation {
        section: String,
        subsection: String,
        act: String,
    },
    Temporal {
        inner: Box<Type>,
        valid_from: Option<NaiveDate>,
        valid_until: Option<NaiveDate>,
    },
    Array(Box<Type>),
    /// Strictly above zero.
    Positive(Box<Type>),
    NonEmpty(Box<Type>),
    /// A date strictly inside `(after, before)`.
    ValidDate {
        after: Option<NaiveDate>,
        before: Option<NaiveDate>,
    },
    Union(Box<Type>, Box<Type>),
    MoneyWithCurrency(String),
}

static DATE: Type = Type::Primitive(Primitive::Date);
static MONEY: Type = Type::Primitive(Primitive::Money);

impl Type {
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const INT: Type = Type::Primitive(Primitive::Int);

    pub fn display(&self) -> String {
        match self {
            Type::Unknown => "<unknown>".to_string(),
            Type::Primitive(p) => p.as_str().to_string(),
            Type::Struct { name, args } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let args_s = args
                        .iter()
                        .map(|t| t.display())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{name}<{args_s}>")
                }
            }
            Type::Enum(name) | Type::Var(name) => name.clone(),
            Type::Refinement { base, lower, upper } => {
                let lo = lower.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
                let hi = upper.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
                format!("{}[{lo}..{hi}]", base.display())
            }
            Type::Citation {
                section,
                subsection,
                act,
            } => format!("Citation<{section}, {subsection}, {act}>"),
            Type::Temporal {
                inner,
                valid_from,
                valid_until,
            } => {
                let from = valid_from.map(|d| d.to_string()).unwrap_or_else(|| "_".into());
                let until = valid_until
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "_".into());
                format!("Temporal<{}, {from}, {until}>", inner.display())
            }
            Type::Array(inner) => format!("[{}]", inner.display()),
            Type::Positive(inner) => format!("Positive<{}>", inner.display()),
            Type::NonEmpty(inner) => format!("NonEmpty<{}>", inner.display()),
            Type::ValidDate { after, before } => {
                let after = after.map(|d| d.to_string()).unwrap_or_else(|| "_".into());
                let before = before.map(|d| d.to_string()).unwrap_or_else(|| "_".into());
                format!("ValidDate<{after}, {before}>")
            }
            Type::Union(a, b) => format!("{} | {}", a.display(), b.display()),
            Type::MoneyWithCurrency(code) => format!("money<{code}>"),
        }
    }

    /// Strips refinement, temporal and constraint wrappers.
    pub fn base(&self) -> &Type {
        match self {
            Type::Refinement { base, .. } => base.base(),
            Type::Temporal { inner, .. } | Type::Positive(inner) | Type::NonEmpty(inner) => {
                inner.base()
            }
            Type::ValidDate { .. } => &DATE,
            Type::MoneyWithCurrency(_) => &MONEY,
            other => other,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.base(), Type::Primitive(Primitive::Bool) | Type::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        match self.base() {
            Type::Primitive(p) => p.is_numeric(),
            Type::Union(a, b) => a.is_numeric() && b.is_numeric(),
            Type::Unknown => true,
            _ => false,
        }
    }

    /// Ordered for `<`/`>` comparisons.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric()
            || matches!(
                self.base(),
                Type::Primitive(Primitive::Date | Primitive::Duration)
            )
    }

    /// Inclusive integer bounds of a refinement, if any.
    pub fn bounds(&self) -> Option<(Option<i64>, Option<i64>)> {
        match self {
            Type::Refinement { lower, upper, .. } => Some((*lower, *upper)),
            Type::Temporal { inner, .. } | Type::NonEmpty(inner) => inner.bounds(),
            // Only integers get a bound; other positives are checked as `> 0`.
            Type::Positive(inner) if inner.base() == &Type::INT => {
                let (lower, upper) = inner.bounds().unwrap_or((None, None));
                Some((Some(lower.map_or(1, |lo| lo.max(1))), upper))
            }
            Type::Positive(inner) => inner.bounds(),
            _ => None,
        }
    }

    pub fn contains_var(&self) -> bool {
        match self {
            Type::Var(_) => true,
            Type::Struct { args, .. } => args.iter().any(Type::contains_var),
            Type::Refinement { base, .. } => base.contains_var(),
            Type::Temporal { inner, .. }
            | Type::Array(inner)
            | Type::Positive(inner)
            | Type::NonEmpty(inner) => inner.contains_var(),
            Type::Union(a, b) => a.contains_var() || b.contains_var(),
            _ => false,
        }
    }
}

/// Structural assignability, ignoring nominal subtyping (the checker adds that).
///
/// `int` widens into the other numeric primitives; refinements and temporal
/// wrappers are compared on their base types.
pub fn is_assignable(expected: &Type, got: &Type) -> bool {
    let (e, g) = (expected.base(), got.base());
    match (e, g) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Union(a, b), _) => is_assignable(a, got) || is_assignable(b, got),
        (_, Type::Union(a, b)) => is_assignable(expected, a) && is_assignable(expected, b),
        (Type::Var(_), _) | (_, Type::Var(_)) => true,
        (Type::Primitive(a), Type::Primitive(b)) => {
            a == b || (*b == Primitive::Int && a.is_numeric())
        }
        (Type::Struct { name: a, args: aa }, Type::Struct { name: b, args: ba }) => {
            a == b
                && aa.len() == ba.len()
                && aa.iter().zip(ba).all(|(x, y)| is_assignable(x, y))
        }
        (Type::Array(a), Type::Array(b)) => is_assignable(a, b),
        (Type::Citation { .. }, Type::Citation { .. }) => true,
        (a, b) => a == b,
    }
}

/// Substitution of type parameters by concrete types at one instantiation site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericBinding {
    map: HashMap<String, Type>,
}

impl GenericBinding {
    pub fn new(params: &[String], args: &[Type]) -> Self {
        Self {
            map: params.iter().cloned().zip(args.iter().cloned()).collect(),
        }
    }

    pub fn get(&self, param: &str) -> Option<&Type> {
        self.map.get(param)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bind(&mut self, param: &str, ty: Type) {
        self.map.insert(param.to_string(), ty);
    }

    pub fn substitute(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(v) => self.map.get(v).cloned().unwrap_or_else(|| ty.clone()),
            Type::Struct { name, args } => Type::Struct {
                name: name.clone(),
                args: args.iter().map(|a| self.substitute(a)).collect(),
            },
            Type::Refinement { base, lower, upper } => Type::Refinement {
                base: Box::new(self.substitute(base)),
                lower: *lower,
                upper: *upper,
            },
            Type::Temporal {
                inner,
                valid_from,
                valid_until,
            } => Type::Temporal {
                inner: Box::new(self.substitute(inner)),
                valid_from: *valid_from,
                valid_until: *valid_until,
            },
            Type::Array(inner) => Type::Array(Box::new(self.substitute(inner))),
            Type::Positive(inner) => Type::Positive(Box::new(self.substitute(inner))),
            Type::NonEmpty(inner) => Type::NonEmpty(Box::new(self.substitute(inner))),
            Type::Union(a, b) => {
                Type::Union(Box::new(self.substitute(a)), Box::new(self.substitute(b)))
            }
            other => other.clone(),
        }
    }
}
