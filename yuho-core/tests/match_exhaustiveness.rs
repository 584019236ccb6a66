use yuho_ast::build::*;
use yuho_ast::{Item, Literal, Program, Stmt};
use yuho_core::{Checker, ErrorKind};

fn in_function(stmts: Vec<Stmt>) -> Program {
    program(
        "m",
        vec![Item::Function(function("f", vec![param("x", int_ty())], int_ty(), stmts))],
    )
}

#[test]
fn match_requires_wildcard_arm() {
    let p = in_function(vec![
        match_stmt(var("x"), vec![stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(0))])]),
        ret(int(1)),
    ]);
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::NonExhaustiveMatch);
    assert!(
        errs[0].message.contains("non-exhaustive match"),
        "unexpected error: {}",
        errs[0].message
    );
}

#[test]
fn match_wildcard_must_be_last() {
    let p = in_function(vec![
        match_stmt(
            var("x"),
            vec![
                stmt_arm(wildcard(), vec![ret(int(0))]),
                stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(1))]),
            ],
        ),
        ret(int(2)),
    ]);
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs.len(), 1);
    assert!(
        errs[0].message.contains("wildcard") && errs[0].message.contains("last"),
        "unexpected error: {}",
        errs[0].message
    );
}

#[test]
fn match_rejects_duplicate_literals() {
    let p = in_function(vec![match_stmt(
        var("x"),
        vec![
            stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(0))]),
            stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(1))]),
            stmt_arm(wildcard(), vec![ret(int(2))]),
        ],
    )]);
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::UnreachableMatchArm);
    assert!(errs[0].message.contains("duplicate"), "unexpected error: {}", errs[0].message);
}

#[test]
fn guarded_repeat_is_allowed() {
    let p = in_function(vec![match_stmt(
        var("x"),
        vec![
            stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(0))])
                .guarded(bin(var("x"), yuho_ast::BinOp::Gt, int(0))),
            stmt_arm(lit_pat(Literal::Int(1)), vec![ret(int(1))]),
            stmt_arm(wildcard(), vec![ret(int(2))]),
        ],
    )]);
    Checker::new().check(&p).expect("sema");
}

#[test]
fn enum_match_needs_wildcard_even_when_every_variant_is_listed() {
    let p = program(
        "m",
        vec![
            Item::Enum(enum_def("Status", &["Active", "Inactive"])),
            Item::Function(function(
                "f",
                vec![param("s", named("Status", vec![]))],
                int_ty(),
                vec![
                    match_stmt(
                        var("s"),
                        vec![
                            stmt_arm(variant_pat("Status", "Active"), vec![ret(int(1))]),
                            stmt_arm(variant_pat("Status", "Inactive"), vec![ret(int(0))]),
                        ],
                    ),
                    ret(int(0)),
                ],
            )),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::NonExhaustiveMatch);
}

#[test]
fn match_expression_arms_must_agree() {
    let value = match_expr(
        int(1),
        vec![
            arm(lit_pat(Literal::Int(1)), int(10)),
            arm(wildcard(), string("ten")),
        ],
    );
    let p = program("m", vec![Item::Declaration(let_stmt("y", int_ty(), value))]);
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert!(errs.iter().any(|e| matches!(e.kind, ErrorKind::TypeMismatch { .. })));
}

#[test]
fn satisfies_pattern_needs_known_test() {
    let p = program(
        "m",
        vec![
            Item::LegalTest(legal_test("Theft", vec![("dishonest", bool_ty())])),
            Item::Function(function(
                "f",
                vec![param("x", int_ty())],
                bool_ty(),
                vec![match_stmt(
                    var("x"),
                    vec![
                        stmt_arm(satisfies_pat("Theft"), vec![ret(boolean(true))]),
                        stmt_arm(satisfies_pat("Robbery"), vec![ret(boolean(true))]),
                        stmt_arm(wildcard(), vec![ret(boolean(false))]),
                    ],
                )],
            )),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].kind, ErrorKind::UndefinedSymbol("Robbery".into()));
}
