use yuho_ast::build::*;
use yuho_ast::{BinOp, Item, Program, Stmt};
use yuho_core::{CheckOptions, Checker, ErrorKind};

fn verdict_program(body: Vec<Stmt>, exclusive: bool) -> Program {
    let verdict = enum_def("Verdict", &["Guilty", "NotGuilty"]);
    let verdict = if exclusive { verdict.exclusive() } else { verdict };
    program(
        "verdict",
        vec![
            Item::Enum(verdict),
            Item::Function(function(
                "decide",
                vec![param("amount", int_ty())],
                named("Verdict", vec![]),
                body,
            )),
        ],
    )
}

fn fall_through() -> Vec<Stmt> {
    vec![
        if_stmt(
            bin(var("amount"), BinOp::Gt, int(500)),
            vec![ret(variant("Verdict", "Guilty"))],
            None,
        ),
        ret(variant("Verdict", "NotGuilty")),
    ]
}

#[test]
fn fall_through_split_is_ambiguous_for_exclusive_enum() {
    let errs = Checker::new()
        .check(&verdict_program(fall_through(), true))
        .expect_err("expected sema error");
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].kind,
        ErrorKind::AmbiguousVariantPath {
            variants: vec!["Guilty".into(), "NotGuilty".into()]
        }
    );
    assert!(errs[0].message.contains("Verdict::NotGuilty"), "{}", errs[0].message);
}

#[test]
fn plain_enum_is_not_analyzed() {
    Checker::new()
        .check(&verdict_program(fall_through(), false))
        .expect("sema");
}

#[test]
fn analysis_can_be_switched_off() {
    let checker = Checker::with_options(CheckOptions {
        check_mutual_exclusivity: false,
        ..CheckOptions::default()
    });
    checker
        .check(&verdict_program(fall_through(), true))
        .expect("sema");
}

#[test]
fn if_else_partition_is_accepted() {
    let body = vec![if_stmt(
        bin(var("amount"), BinOp::Gt, int(500)),
        vec![ret(variant("Verdict", "Guilty"))],
        Some(vec![ret(variant("Verdict", "NotGuilty"))]),
    )];
    Checker::new()
        .check(&verdict_program(body, true))
        .expect("sema");
}

#[test]
fn nested_if_else_inside_else_is_accepted() {
    let body = vec![if_stmt(
        bin(var("amount"), BinOp::Gt, int(500)),
        vec![ret(variant("Verdict", "Guilty"))],
        Some(vec![if_stmt(
            bin(var("amount"), BinOp::Lt, int(0)),
            vec![ret(variant("Verdict", "Guilty"))],
            Some(vec![ret(variant("Verdict", "NotGuilty"))]),
        )]),
    )];
    Checker::new()
        .check(&verdict_program(body, true))
        .expect("sema");
}

#[test]
fn match_expression_return_is_accepted() {
    let body = vec![ret(match_expr(
        var("amount"),
        vec![
            arm(lit_pat(yuho_ast::Literal::Int(0)), variant("Verdict", "NotGuilty")),
            arm(wildcard(), variant("Verdict", "Guilty")),
        ],
    ))];
    Checker::new()
        .check(&verdict_program(body, true))
        .expect("sema");
}
