#![forbid(unsafe_code)]

//! Bounded model search over small domains.
//!
//! Used when no SMT backend is compiled in. A satisfying assignment found
//! here is a genuine model. Unsat is only claimed when every constant and
//! function slot ranged over a finite, fully enumerated domain and no
//! quantifier was left undecided or ranged over an uninterpreted sort;
//! otherwise the answer is `Unknown`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;
use yuho_ast::QuantKind;

use crate::counterexample::Value;
use crate::logic::{ArithOp, CmpOp, Signature, SolverQuery, Sort, SortDecl, Term};
use crate::options::VerifyOptions;
use crate::solver::{Model, Solver, SolverResponse};

/// Elements given to each uninterpreted sort.
const UNINTERPRETED_SIZE: usize = 2;
/// Functions with more argument tuples than this are searched as constant functions.
const MAX_TABLE: usize = 16;
const DEFAULT_MAX_CANDIDATES: u64 = 200_000;
const STRING_SAMPLES: [&str; 3] = ["", "a", "b"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extent {
    /// Every value of the sort.
    Exhaustive,
    /// Every element of the candidate model, but other models exist.
    InModel,
    /// A window of an infinite sort.
    Sampled,
}

pub struct EnumerativeSolver {
    int_bound: i64,
    max_candidates: u64,
}

impl Default for EnumerativeSolver {
    fn default() -> Self {
        Self::new(VerifyOptions::default().enumeration_bound)
    }
}

impl EnumerativeSolver {
    /// Integers are searched in `[-int_bound, int_bound]` unless bounded tighter.
    pub fn new(int_bound: i64) -> Self {
        Self {
            int_bound: int_bound.max(1),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn from_options(opts: &VerifyOptions) -> Self {
        Self::new(opts.enumeration_bound)
    }

    pub fn with_max_candidates(mut self, n: u64) -> Self {
        self.max_candidates = n.max(1);
        self
    }
}

impl Solver for EnumerativeSolver {
    fn name(&self) -> &str {
        "enumerative"
    }

    fn check(&mut self, query: &SolverQuery, timeout: Duration) -> SolverResponse {
        let deadline = Instant::now() + timeout;
        let space = Space::build(&query.signature, self.int_bound);
        if space.slots.iter().any(Vec::is_empty) {
            return SolverResponse::Unknown("bounded search: a sort has no values to search".into());
        }

        let mut choice = vec![0usize; space.slots.len()];
        let mut undecided = false;
        let mut model_bound = false;
        let mut tried: u64 = 0;
        loop {
            if tried % 256 == 0 && Instant::now() >= deadline {
                debug!(tried, "enumeration deadline reached");
                return SolverResponse::Timeout;
            }
            if tried >= self.max_candidates {
                return SolverResponse::Unknown(format!(
                    "bounded search: gave up after {tried} candidates"
                ));
            }
            tried += 1;

            let mut ev = Eval::new(&space, &choice, deadline);
            let verdict = ev.all(&query.assertions);
            if ev.timed_out {
                return SolverResponse::Timeout;
            }
            model_bound |= ev.in_model;
            match verdict {
                Some(true) => {
                    debug!(tried, "model found");
                    return SolverResponse::Sat(space.model(&choice));
                }
                Some(false) => {}
                None => undecided = true,
            }

            if !advance(&mut choice, &space.slots) {
                break;
            }
        }

        debug!(
            tried,
            exhaustive = space.exhaustive,
            undecided,
            model_bound,
            "search space exhausted"
        );
        if space.exhaustive && !undecided && !model_bound {
            SolverResponse::Unsat
        } else if undecided {
            SolverResponse::Unknown(format!(
                "bounded search (integers within ±{}): a quantifier over an unbounded sort \
                 could not be decided",
                self.int_bound
            ))
        } else if model_bound {
            SolverResponse::Unknown(format!(
                "bounded search: no model with {UNINTERPRETED_SIZE} elements per \
                 uninterpreted sort; larger models were not searched"
            ))
        } else {
            SolverResponse::Unknown(format!(
                "bounded search: no model with integers within ±{}",
                self.int_bound
            ))
        }
    }
}

/// Mixed-radix increment; false once every combination has been visited.
fn advance(choice: &mut [usize], slots: &[Vec<Value>]) -> bool {
    for (c, domain) in choice.iter_mut().zip(slots) {
        *c += 1;
        if *c < domain.len() {
            return true;
        }
        *c = 0;
    }
    false
}

struct FunctionInterp {
    first_slot: usize,
    /// `None` when searched as a constant function.
    arg_domains: Option<Vec<Vec<Value>>>,
}

impl FunctionInterp {
    fn slot_for(&self, args: &[Value]) -> Option<usize> {
        let Some(domains) = &self.arg_domains else {
            return Some(self.first_slot);
        };
        let mut index = 0;
        for (arg, domain) in args.iter().zip(domains) {
            let pos = domain.iter().position(|v| v == arg)?;
            index = index * domain.len() + pos;
        }
        Some(self.first_slot + index)
    }
}

struct Space {
    slots: Vec<Vec<Value>>,
    constants: HashMap<String, usize>,
    functions: HashMap<String, FunctionInterp>,
    universes: HashMap<Sort, (Vec<Value>, Extent)>,
    exhaustive: bool,
}

impl Space {
    fn build(sig: &Signature, int_bound: i64) -> Space {
        let mut universes = HashMap::new();
        universes.insert(
            Sort::Bool,
            (vec![Value::Bool(false), Value::Bool(true)], Extent::Exhaustive),
        );
        universes.insert(Sort::Int, (int_window(int_bound, None, None).0, Extent::Sampled));
        universes.insert(Sort::Real, (real_samples(int_bound), Extent::Sampled));
        universes.insert(
            Sort::String,
            (
                STRING_SAMPLES.iter().map(|s| Value::Str(s.to_string())).collect(),
                Extent::Sampled,
            ),
        );
        for decl in &sig.sorts {
            match decl {
                SortDecl::Enum { name, variants } => {
                    let values = variants
                        .iter()
                        .map(|v| Value::Enum {
                            sort: name.clone(),
                            variant: v.clone(),
                        })
                        .collect();
                    universes.insert(Sort::Enum(name.clone()), (values, Extent::Exhaustive));
                }
                SortDecl::Uninterpreted(name) => {
                    let values = (0..UNINTERPRETED_SIZE)
                        .map(|index| Value::Opaque {
                            sort: name.clone(),
                            index,
                        })
                        .collect();
                    universes.insert(Sort::Uninterpreted(name.clone()), (values, Extent::InModel));
                }
            }
        }

        let mut space = Space {
            slots: Vec::new(),
            constants: HashMap::new(),
            functions: HashMap::new(),
            universes,
            exhaustive: true,
        };

        for c in &sig.constants {
            let (domain, extent) = match c.sort {
                Sort::Int => int_window(int_bound, c.lower, c.upper),
                _ => space.universe(&c.sort).clone(),
            };
            space.exhaustive &= extent == Extent::Exhaustive;
            space.constants.insert(c.symbol.clone(), space.slots.len());
            space.slots.push(domain);
        }

        for f in &sig.functions {
            let (range, range_extent) = space.universe(&f.ret).clone();
            space.exhaustive &= range_extent == Extent::Exhaustive;

            let arg_domains: Vec<(Vec<Value>, Extent)> =
                f.params.iter().map(|p| space.universe(p).clone()).collect();
            let table_size = arg_domains
                .iter()
                .try_fold(1usize, |acc, (d, _)| acc.checked_mul(d.len()));
            let tabulate = arg_domains.iter().all(|(_, e)| *e != Extent::Sampled)
                && table_size.is_some_and(|n| n <= MAX_TABLE);
            space.exhaustive &= tabulate
                && arg_domains.iter().all(|(_, e)| *e == Extent::Exhaustive);

            let first_slot = space.slots.len();
            let (slots, arg_domains) = if tabulate {
                (
                    table_size.unwrap_or(1),
                    Some(arg_domains.into_iter().map(|(d, _)| d).collect()),
                )
            } else {
                (1, None)
            };
            for _ in 0..slots {
                space.slots.push(range.clone());
            }
            space.functions.insert(
                f.name.clone(),
                FunctionInterp {
                    first_slot,
                    arg_domains,
                },
            );
        }

        space
    }

    fn universe(&self, sort: &Sort) -> &(Vec<Value>, Extent) {
        static EMPTY: (Vec<Value>, Extent) = (Vec::new(), Extent::Sampled);
        self.universes.get(sort).unwrap_or(&EMPTY)
    }

    fn value(&self, choice: &[usize], slot: usize) -> Option<&Value> {
        self.slots.get(slot)?.get(*choice.get(slot)?)
    }

    fn model(&self, choice: &[usize]) -> Model {
        self.constants
            .iter()
            .filter_map(|(name, &slot)| Some((name.clone(), self.value(choice, slot)?.clone())))
            .collect()
    }
}

/// Integers ordered outward from the point nearest zero inside the bounds.
/// Exhaustive when both bounds are present and the range fits the window.
fn int_window(bound: i64, lower: Option<i64>, upper: Option<i64>) -> (Vec<Value>, Extent) {
    let lo = lower.unwrap_or(i64::MIN);
    let hi = upper.unwrap_or(i64::MAX);
    if lo > hi {
        return (Vec::new(), Extent::Exhaustive);
    }
    let anchor = 0i64.clamp(lo, hi);
    let span = (hi as i128) - (lo as i128);
    let (reach, extent) = match (lower, upper) {
        (Some(_), Some(_)) if span <= 2 * bound as i128 => (span as i64, Extent::Exhaustive),
        _ => (bound, Extent::Sampled),
    };

    let mut out = vec![Value::Int(anchor)];
    for k in 1..=reach {
        for n in [anchor.checked_add(k), anchor.checked_sub(k)].into_iter().flatten() {
            if (lo..=hi).contains(&n) {
                out.push(Value::Int(n));
            }
        }
    }
    (out, extent)
}

fn real_samples(bound: i64) -> Vec<Value> {
    let mut out = vec![Value::Real(0.0)];
    for k in 1..=bound.saturating_mul(2) {
        let x = k as f64 / 2.0;
        out.push(Value::Real(x));
        out.push(Value::Real(-x));
    }
    out
}

/// Three-valued evaluation: `None` is "undecided".
struct Eval<'s> {
    space: &'s Space,
    choice: &'s [usize],
    bound: Vec<(&'s str, Value)>,
    deadline: Instant,
    steps: u32,
    timed_out: bool,
    /// Set once a quantifier ranged over a universe fixed by this candidate.
    in_model: bool,
}

impl<'s> Eval<'s> {
    fn new(space: &'s Space, choice: &'s [usize], deadline: Instant) -> Self {
        Self {
            space,
            choice,
            bound: Vec::new(),
            deadline,
            steps: 0,
            timed_out: false,
            in_model: false,
        }
    }

    fn all(&mut self, terms: &'s [Term]) -> Option<bool> {
        let mut result = Some(true);
        for t in terms {
            match self.truth(t) {
                Some(false) => return Some(false),
                Some(true) => {}
                None => result = None,
            }
        }
        result
    }

    fn any(&mut self, terms: &'s [Term]) -> Option<bool> {
        let mut result = Some(false);
        for t in terms {
            match self.truth(t) {
                Some(true) => return Some(true),
                Some(false) => {}
                None => result = None,
            }
        }
        result
    }

    fn truth(&mut self, t: &'s Term) -> Option<bool> {
        match self.term(t)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn tick(&mut self) -> bool {
        self.steps = self.steps.wrapping_add(1);
        if self.steps % 4096 == 0 && Instant::now() >= self.deadline {
            self.timed_out = true;
        }
        self.timed_out
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some((_, v)) = self.bound.iter().rev().find(|(n, _)| *n == name) {
            return Some(v.clone());
        }
        let slot = match self.space.constants.get(name) {
            Some(&slot) => slot,
            None => self.space.functions.get(name)?.slot_for(&[])?,
        };
        self.space.value(self.choice, slot).cloned()
    }

    fn term(&mut self, t: &'s Term) -> Option<Value> {
        if self.tick() {
            return None;
        }
        match t {
            Term::Int(n) => Some(Value::Int(*n)),
            Term::Real(x) => Some(Value::Real(*x)),
            Term::Bool(b) => Some(Value::Bool(*b)),
            Term::Str(s) => Some(Value::Str(s.clone())),
            Term::Var(name) => self.lookup(name),
            Term::EnumVariant { sort, variant } => Some(Value::Enum {
                sort: sort.clone(),
                variant: variant.clone(),
            }),
            Term::Not(inner) => self.truth(inner).map(|b| Value::Bool(!b)),
            Term::And(ts) => self.all(ts).map(Value::Bool),
            Term::Or(ts) => self.any(ts).map(Value::Bool),
            Term::Implies(a, b) => {
                let r = match self.truth(a) {
                    Some(false) => Some(true),
                    Some(true) => self.truth(b),
                    None => match self.truth(b) {
                        Some(true) => Some(true),
                        _ => None,
                    },
                };
                r.map(Value::Bool)
            }
            Term::Cmp(op, a, b) => {
                let a = self.term(a)?;
                let b = self.term(b)?;
                compare(*op, &a, &b).map(Value::Bool)
            }
            Term::Arith {
                op, left, right, ..
            } => {
                let l = self.term(left)?;
                let r = self.term(right)?;
                arith(*op, &l, &r)
            }
            Term::Neg(inner) => match self.term(inner)? {
                Value::Int(n) => n.checked_neg().map(Value::Int),
                Value::Real(x) => Some(Value::Real(-x)),
                _ => None,
            },
            Term::ToReal(inner) => match self.term(inner)? {
                Value::Int(n) => Some(Value::Real(n as f64)),
                v @ Value::Real(_) => Some(v),
                _ => None,
            },
            Term::Ite(c, a, b) => match self.truth(c) {
                Some(true) => self.term(a),
                Some(false) => self.term(b),
                None => {
                    let a = self.term(a)?;
                    let b = self.term(b)?;
                    (a == b).then_some(a)
                }
            },
            Term::Apply(name, args) if args.is_empty() => self.lookup(name),
            Term::Apply(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.term(a)?);
                }
                let slot = self.space.functions.get(name)?.slot_for(&values)?;
                self.space.value(self.choice, slot).cloned()
            }
            Term::Quant {
                kind,
                symbol,
                sort,
                body,
            } => {
                let space = self.space;
                let (values, extent) = space.universe(sort);
                let mut undecided = *extent == Extent::Sampled;
                self.in_model |= *extent == Extent::InModel;
                for v in values {
                    self.bound.push((symbol.as_str(), v.clone()));
                    let r = self.truth(body);
                    self.bound.pop();
                    match (kind, r) {
                        (QuantKind::Forall, Some(false)) => return Some(Value::Bool(false)),
                        (QuantKind::Exists, Some(true)) => return Some(Value::Bool(true)),
                        (_, None) => undecided = true,
                        _ => {}
                    }
                }
                if undecided {
                    None
                } else {
                    Some(Value::Bool(*kind == QuantKind::Forall))
                }
            }
        }
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Real(x) => Some(*x),
        _ => None,
    }
}

fn compare(op: CmpOp, a: &Value, b: &Value) -> Option<bool> {
    let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };
    match op {
        CmpOp::Eq => Some(ord.map_or_else(|| a == b, |o| o.is_eq())),
        CmpOp::Distinct => Some(ord.map_or_else(|| a != b, |o| o.is_ne())),
        CmpOp::Lt => ord.map(|o| o.is_lt()),
        CmpOp::Gt => ord.map(|o| o.is_gt()),
        CmpOp::Le => ord.map(|o| o.is_le()),
        CmpOp::Ge => ord.map(|o| o.is_ge()),
    }
}

/// SMT-LIB integer `div`/`mod` are Euclidean; division by zero is left undecided.
fn arith(op: ArithOp, l: &Value, r: &Value) -> Option<Value> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let (a, b) = (*a, *b);
        let n = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div if b != 0 => a.checked_div_euclid(b),
            ArithOp::Mod if b != 0 => a.checked_rem_euclid(b),
            ArithOp::Div | ArithOp::Mod => None,
        };
        return n.map(Value::Int);
    }
    let (a, b) = (as_f64(l)?, as_f64(r)?);
    let x = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div if b != 0.0 => a / b,
        ArithOp::Div | ArithOp::Mod => return None,
    };
    Some(Value::Real(x))
}
