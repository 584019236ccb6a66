#![cfg(feature = "z3")]

use yuho_ast::build::*;
use yuho_ast::{BinOp, Item};
use yuho_core::{Checker, TypedProgram};
use yuho_verify::{Value, Verdict, VerificationDriver, VerifyOptions, Z3Solver};

fn typed(items: Vec<Item>) -> TypedProgram {
    Checker::new()
        .check(&program("z3", items))
        .expect("program checks")
}

fn driver() -> VerificationDriver<Z3Solver> {
    VerificationDriver::new(Z3Solver::new(), VerifyOptions::default())
}

#[test]
fn z3_refutes_all_positive() {
    let p = typed(vec![Item::Principle(principle(
        "AllPositive",
        forall("x", int_ty(), bin(var("x"), BinOp::Gt, int(0))),
    ))]);
    let result = driver()
        .verify_principle(&p, p.principle("AllPositive").expect("declared"))
        .expect("translates");
    assert_eq!(result.verdict, Verdict::Invalid);
    match result.counterexample.as_ref().and_then(|ce| ce.get("x")) {
        Some(Value::Int(n)) => assert!(*n <= 0),
        other => panic!("expected an integer for x, got {other:?}"),
    }
}

#[test]
fn z3_proves_unbounded_facts() {
    let square = bin(var("x"), BinOp::Mul, var("x"));
    let p = typed(vec![
        Item::Principle(principle(
            "Squares",
            forall("x", int_ty(), bin(square, BinOp::Ge, int(0))),
        )),
        Item::Principle(principle(
            "Adults",
            forall(
                "age",
                refined(int_ty(), Some(18), Some(150)),
                bin(var("age"), BinOp::Ge, int(18)),
            ),
        )),
    ]);
    let summary = driver().verify_program(&p);
    assert!(summary.all_valid(), "{summary}");
}

#[test]
fn z3_reads_enum_models() {
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
    let result = driver()
        .verify_principle(&p, p.principle("AlwaysActive").expect("declared"))
        .expect("translates");
    assert_eq!(result.verdict, Verdict::Invalid);
    assert_eq!(
        result.counterexample_flat().expect("counterexample")["s"],
        "Status::Inactive"
    );
}
