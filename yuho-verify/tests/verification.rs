use std::time::Duration;

use yuho_ast::build::*;
use yuho_ast::{BinOp, Item};
use yuho_core::{Checker, TypedProgram};
use yuho_verify::{
    EnumerativeSolver, QuantifierTranslator, Solver, SolverQuery, SolverResponse, Value, Verdict,
    VerificationDriver, VerificationResult, VerifyOptions,
};

fn typed(items: Vec<Item>) -> TypedProgram {
    Checker::new()
        .check(&program("verification", items))
        .expect("program checks")
}

fn verify_with<S: Solver>(solver: S, p: &TypedProgram, name: &str, timeout_ms: u64) -> VerificationResult {
    let principle = p.principle(name).expect("declared");
    let form = QuantifierTranslator::for_program(p)
        .translate(principle)
        .expect("translates");
    VerificationDriver::new(solver, VerifyOptions::default()).verify(&form, timeout_ms)
}

fn verify(p: &TypedProgram, name: &str) -> VerificationResult {
    verify_with(EnumerativeSolver::default(), p, name, 5_000)
}

/// Answers every query with a fixed response.
struct FixedSolver(SolverResponse);

impl Solver for FixedSolver {
    fn name(&self) -> &str {
        "fixed"
    }

    fn check(&mut self, _query: &SolverQuery, _timeout: Duration) -> SolverResponse {
        self.0.clone()
    }
}

#[test]
fn all_positive_is_refuted_by_a_non_positive_x() {
    let p = typed(vec![Item::Principle(principle(
        "AllPositive",
        forall("x", int_ty(), bin(var("x"), BinOp::Gt, int(0))),
    ))]);
    let result = verify(&p, "AllPositive");

    assert_eq!(result.verdict, Verdict::Invalid);
    let ce = result.counterexample.as_ref().expect("counterexample");
    match ce.get("x") {
        Some(Value::Int(n)) => assert!(*n <= 0, "x = {n} does not refute x > 0"),
        other => panic!("expected an integer for x, got {other:?}"),
    }
    assert!(result.counterexample_flat().expect("flat").contains_key("x"));
    assert!(result.logical_form.contains("(forall ((x Int)) (> x 0))"));
    assert!(result.to_string().contains("Counterexample found:"));
}

#[test]
fn excluded_middle_is_valid() {
    let p = typed(vec![Item::Principle(principle(
        "ExcludedMiddle",
        forall("b", bool_ty(), bin(var("b"), BinOp::Or, not(var("b")))),
    ))]);
    let result = verify(&p, "ExcludedMiddle");
    assert_eq!(result.verdict, Verdict::Valid);
    assert!(result.counterexample.is_none());
}

#[test]
fn bounded_domains_are_decided() {
    let age = || refined(int_ty(), Some(0), Some(20));
    let p = typed(vec![
        Item::Principle(principle(
            "NonNegative",
            forall("age", age(), bin(var("age"), BinOp::Ge, int(0))),
        )),
        Item::Principle(principle(
            "Positive",
            forall("age", age(), bin(var("age"), BinOp::Gt, int(0))),
        )),
    ]);

    assert_eq!(verify(&p, "NonNegative").verdict, Verdict::Valid);

    let refuted = verify(&p, "Positive");
    assert_eq!(refuted.verdict, Verdict::Invalid);
    assert_eq!(
        refuted.counterexample.as_ref().and_then(|ce| ce.get("age")),
        Some(&Value::Int(0))
    );
}

#[test]
fn unbounded_truths_are_unknown_not_invalid() {
    let square = bin(var("x"), BinOp::Mul, var("x"));
    let p = typed(vec![Item::Principle(principle(
        "Squares",
        forall("x", int_ty(), bin(square, BinOp::Ge, int(0))),
    ))]);
    let result = verify(&p, "Squares");
    assert_eq!(result.verdict, Verdict::Unknown);
    assert!(result.counterexample.is_none());
    assert!(result.detail.is_some());
}

#[test]
fn valid_dates_are_strictly_inside_their_window() {
    let window = || valid_date(Some("01-01-2020"), Some("10-01-2020"));
    let p = typed(vec![
        Item::Principle(principle(
            "AfterStart",
            forall("d", window(), bin(var("d"), BinOp::Gt, date("01-01-2020"))),
        )),
        Item::Principle(principle(
            "AfterSecond",
            forall("d", window(), bin(var("d"), BinOp::Gt, date("02-01-2020"))),
        )),
    ]);
    assert_eq!(verify(&p, "AfterStart").verdict, Verdict::Valid);
    assert_eq!(verify(&p, "AfterSecond").verdict, Verdict::Invalid);
}

#[test]
fn enum_counterexample_names_the_variant() {
    let p = typed(vec![
        Item::Enum(enum_def("Status", &["Active", "Inactive"])),
        Item::Principle(principle(
            "AlwaysActive",
            forall(
                "s",
                named("Status", vec![]),
                bin(var("s"), BinOp::Eq, variant("Status", "Active")),
            ),
        )),
    ]);
    let result = verify(&p, "AlwaysActive");
    assert_eq!(result.verdict, Verdict::Invalid);
    let flat = result.counterexample_flat().expect("counterexample");
    assert_eq!(flat["s"], "Status::Inactive");
}

#[test]
fn legal_tests_are_free_predicates() {
    let p = typed(vec![
        Item::Struct(struct_def("Case", vec![field("amount", int_ty())])),
        Item::LegalTest(legal_test(
            "Theft",
            vec![("dishonest", bool_ty()), ("moveable", bool_ty())],
        )),
        Item::Principle(principle(
            "EveryCaseIsTheft",
            forall("c", named("Case", vec![]), satisfies(var("c"), "Theft")),
        )),
        Item::Principle(principle(
            "SomeCaseIsTheft",
            exists("c", named("Case", vec![]), satisfies(var("c"), "Theft")),
        )),
    ]);

    let every = verify(&p, "EveryCaseIsTheft");
    assert_eq!(every.verdict, Verdict::Invalid);
    assert!(matches!(
        every.counterexample.as_ref().and_then(|ce| ce.get("c")),
        Some(Value::Opaque { sort, .. }) if sort == "Case"
    ));

    // Nothing forces any case to satisfy the test.
    assert_eq!(verify(&p, "SomeCaseIsTheft").verdict, Verdict::Invalid);
}

#[test]
fn struct_quantifiers_are_not_settled_by_a_small_model() {
    let p = typed(vec![
        Item::Struct(struct_def("Case", vec![field("id", int_ty())])),
        Item::Principle(principle(
            "TwoCases",
            exists(
                "c",
                named("Case", vec![]),
                exists(
                    "d",
                    named("Case", vec![]),
                    bin(var("c"), BinOp::Ne, var("d")),
                ),
            ),
        )),
    ]);
    let result = verify(&p, "TwoCases");
    assert_eq!(result.verdict, Verdict::Unknown);
    assert!(result.counterexample.is_none());
    assert!(
        result
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("bounded search"))
    );
}

#[test]
fn timeouts_and_unknowns_are_verdicts() {
    let p = typed(vec![Item::Principle(principle(
        "AllPositive",
        forall("x", int_ty(), bin(var("x"), BinOp::Gt, int(0))),
    ))]);

    let timed_out = verify_with(FixedSolver(SolverResponse::Timeout), &p, "AllPositive", 100);
    assert_eq!(timed_out.verdict, Verdict::TimedOut);
    assert!(timed_out.detail.as_deref().is_some_and(|d| d.contains("100 ms")));
    assert!(timed_out.counterexample.is_none());

    let unknown = verify_with(
        FixedSolver(SolverResponse::Unknown("incomplete quantifiers".into())),
        &p,
        "AllPositive",
        100,
    );
    assert_eq!(unknown.verdict, Verdict::Unknown);
    assert_ne!(unknown.verdict, Verdict::Invalid);
    assert_eq!(unknown.detail.as_deref(), Some("incomplete quantifiers"));

    let enumerated = verify_with(EnumerativeSolver::default(), &p, "AllPositive", 0);
    assert_eq!(enumerated.verdict, Verdict::TimedOut);
}

#[test]
fn sparse_models_are_completed() {
    let p = typed(vec![Item::Principle(principle(
        "Pair",
        forall(
            "x",
            int_ty(),
            forall("y", bool_ty(), bin(var("y"), BinOp::Or, bin(var("x"), BinOp::Gt, int(0)))),
        ),
    ))]);
    let result = verify_with(
        FixedSolver(SolverResponse::Sat(Default::default())),
        &p,
        "Pair",
        1_000,
    );
    assert_eq!(result.verdict, Verdict::Invalid);
    let ce = result.counterexample.expect("counterexample");
    assert_eq!(ce.len(), 2);
    assert_eq!(ce.get("x"), Some(&Value::Int(0)));
    assert_eq!(ce.get("y"), Some(&Value::Bool(false)));
}

#[test]
fn program_summary_counts_verdicts() {
    let p = typed(vec![
        Item::Principle(principle(
            "AllPositive",
            forall("x", int_ty(), bin(var("x"), BinOp::Gt, int(0))),
        )),
        Item::Principle(principle(
            "ExcludedMiddle",
            forall("b", bool_ty(), bin(var("b"), BinOp::Or, not(var("b")))),
        )),
    ]);
    let summary = yuho_verify::verify_program(&p, VerifyOptions::default());
    assert_eq!(summary.program, "verification");
    assert_eq!(summary.count(Verdict::Valid), 1);
    assert_eq!(summary.count(Verdict::Invalid), 1);
    assert!(!summary.all_valid());
}
