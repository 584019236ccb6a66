#![forbid(unsafe_code)]

//! Concrete values from solver models, and the counterexample built from them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::logic::Sort;

/// A model value, typed by the sort of the constant it was read for.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Enum { sort: String, variant: String },
    /// Element of an uninterpreted sort, named by index.
    Opaque { sort: String, index: usize },
    /// Anything the reader could not type (kept verbatim).
    Raw(String),
}

impl Value {
    /// The value a constant gets when a model leaves it unconstrained.
    pub fn default_for(sort: &Sort, variants: Option<&[String]>) -> Value {
        match sort {
            Sort::Int => Value::Int(0),
            Sort::Real => Value::Real(0.0),
            Sort::Bool => Value::Bool(false),
            Sort::String => Value::Str(String::new()),
            Sort::Enum(name) => match variants.and_then(|v| v.first()) {
                Some(v) => Value::Enum {
                    sort: name.clone(),
                    variant: v.clone(),
                },
                None => Value::Raw(name.clone()),
            },
            Sort::Uninterpreted(name) => Value::Opaque {
                sort: name.clone(),
                index: 0,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Enum { sort, variant } => write!(f, "{sort}::{variant}"),
            Value::Opaque { sort, index } => write!(f, "{sort}!val!{index}"),
            Value::Raw(s) => f.write_str(s),
        }
    }
}

/// One value per constant of the refuted query, keyed by symbol.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Counterexample {
    pub assignments: BTreeMap<String, Value>,
}

impl Counterexample {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.assignments.get(name)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Flat name to literal-text mapping for renderers.
    pub fn to_flat(&self) -> BTreeMap<String, String> {
        self.assignments
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counterexample found:")?;
        for (name, value) in &self.assignments {
            writeln!(f, "  {name} = {value}")?;
        }
        Ok(())
    }
}

/// Constants of a printed SMT-LIB model, e.g. `(define-fun x () Int 42)`.
///
/// Values are raw text; use [`parse_value`] with the constant's sort.
/// Function definitions (non-empty argument list) are skipped.
pub fn parse_model(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut tokens = tokenize(text).into_iter().peekable();
    let mut forms = Vec::new();
    while tokens.peek().is_some() {
        if let Some(sexp) = read(&mut tokens) {
            forms.push(sexp);
        }
    }

    let mut stack: Vec<&Sexp> = forms.iter().collect();
    while let Some(form) = stack.pop() {
        let Sexp::List(items) = form else { continue };
        match items.as_slice() {
            [Sexp::Atom(head), Sexp::Atom(name), Sexp::List(args), _sort, value]
                if head == "define-fun" && args.is_empty() =>
            {
                out.insert(unquote(name), value.to_string());
            }
            // `(model ...)` wrappers and similar.
            _ => stack.extend(items.iter()),
        }
    }
    out
}

/// Reads model text for a constant of `sort`.
pub fn parse_value(text: &str, sort: &Sort) -> Value {
    let text = text.trim();
    match sort {
        Sort::Int => parse_int(text).map_or_else(|| Value::Raw(text.into()), Value::Int),
        Sort::Real => parse_real(text).map_or_else(|| Value::Raw(text.into()), Value::Real),
        Sort::Bool => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::Raw(other.into()),
        },
        Sort::String => match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            Some(inner) => Value::Str(inner.replace("\"\"", "\"")),
            None => Value::Raw(text.into()),
        },
        Sort::Enum(name) => match text.strip_prefix(&format!("{name}.")) {
            Some(variant) => Value::Enum {
                sort: name.clone(),
                variant: variant.to_string(),
            },
            None => Value::Raw(text.into()),
        },
        Sort::Uninterpreted(name) => {
            let index = text
                .trim_matches('|')
                .rsplit("!val!")
                .next()
                .and_then(|n| n.parse().ok());
            match index {
                Some(index) if text.contains("!val!") => Value::Opaque {
                    sort: name.clone(),
                    index,
                },
                _ => Value::Raw(text.into()),
            }
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    match strip_neg(text) {
        Some(inner) => inner.trim().parse::<i64>().ok().map(|n| -n),
        None => text.parse().ok(),
    }
}

fn parse_real(text: &str) -> Option<f64> {
    if let Some(inner) = strip_neg(text) {
        return parse_real(inner.trim()).map(|x| -x);
    }
    if let Some(inner) = text.strip_prefix("(/").and_then(|t| t.strip_suffix(')')) {
        let mut parts = inner.split_whitespace();
        let (n, d) = (parts.next()?, parts.next()?);
        let (n, d) = (parse_real(n)?, parse_real(d)?);
        return (d != 0.0).then(|| n / d);
    }
    text.parse().ok()
}

/// `(- x)` to `x`.
fn strip_neg(text: &str) -> Option<&str> {
    text.strip_prefix("(-")
        .and_then(|t| t.strip_suffix(')'))
        .filter(|t| t.starts_with(char::is_whitespace))
}

fn unquote(s: &str) -> String {
    s.trim_matches('|').to_string()
}

#[derive(Debug)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(a) => f.write_str(a),
            Sexp::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            ';' => {
                while chars.next().is_some_and(|c| c != '\n') {}
            }
            '"' => {
                let mut s = String::from('"');
                chars.next();
                while let Some(c) = chars.next() {
                    s.push(c);
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            s.push('"');
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(s);
            }
            '|' => {
                let mut s = String::from('|');
                chars.next();
                for c in chars.by_ref() {
                    s.push(c);
                    if c == '|' {
                        break;
                    }
                }
                tokens.push(s);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(s);
            }
        }
    }
    tokens
}

fn read(tokens: &mut std::iter::Peekable<std::vec::IntoIter<String>>) -> Option<Sexp> {
    let tok = tokens.next()?;
    match tok.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.peek().map(String::as_str) {
                    Some(")") => {
                        tokens.next();
                        break;
                    }
                    Some(_) => items.extend(read(tokens)),
                    None => break,
                }
            }
            Some(Sexp::List(items))
        }
        ")" => None,
        _ => Some(Sexp::Atom(tok)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line_model() {
        let model = r#"
(define-fun x () Int 42)
(define-fun y () Bool true)
        "#;
        let m = parse_model(model);
        assert_eq!(m.len(), 2);
        assert_eq!(m["x"], "42");
        assert_eq!(parse_value(&m["y"], &Sort::Bool), Value::Bool(true));
    }

    #[test]
    fn parses_wrapped_multiline_model_with_negatives() {
        let model = "(model\n  (define-fun x () Int\n    (- 3))\n  (define-fun r () Real\n    (/ 1.0 4.0))\n  (define-fun f ((a Int)) Int a)\n)";
        let m = parse_model(model);
        assert_eq!(m.len(), 2, "{m:?}");
        assert_eq!(parse_value(&m["x"], &Sort::Int), Value::Int(-3));
        assert_eq!(parse_value(&m["r"], &Sort::Real), Value::Real(0.25));
    }

    #[test]
    fn enum_and_opaque_values() {
        assert_eq!(
            parse_value("Status.Active", &Sort::Enum("Status".into())),
            Value::Enum {
                sort: "Status".into(),
                variant: "Active".into()
            }
        );
        assert_eq!(
            parse_value("Case!val!1", &Sort::Uninterpreted("Case".into())),
            Value::Opaque {
                sort: "Case".into(),
                index: 1
            }
        );
        assert_eq!(parse_value("junk", &Sort::Int), Value::Raw("junk".into()));
    }

    #[test]
    fn display_lists_every_assignment() {
        let mut ce = Counterexample::default();
        ce.assignments.insert("x".into(), Value::Int(5));
        ce.assignments.insert("y".into(), Value::Bool(false));
        let text = ce.to_string();
        assert!(text.contains("x = 5"));
        assert!(text.contains("y = false"));
        assert_eq!(ce.to_flat()["x"], "5");
    }
}
