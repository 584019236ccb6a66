use yuho_ast::build::*;
use yuho_ast::Item;
use yuho_core::{Checker, ErrorKind};

#[test]
fn cheating_amount_is_not_boolean() {
    let p = program(
        "cheating",
        vec![Item::LegalTest(legal_test(
            "Cheating",
            vec![("deception", bool_ty()), ("amount", int_ty())],
        ))],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].kind,
        ErrorKind::NonBooleanRequirement("amount".into())
    );
}

#[test]
fn bool_alias_counts_as_boolean() {
    let p = program(
        "theft",
        vec![
            Item::TypeAlias(alias("Element", &[], bool_ty())),
            Item::LegalTest(legal_test(
                "Theft",
                vec![("dishonest", named("Element", vec![])), ("moveable", bool_ty())],
            )),
        ],
    );
    let typed = Checker::new().check(&p).expect("sema");
    let test = typed.env.legal_test("Theft").expect("registered");
    assert_eq!(test.conjunction().collect::<Vec<_>>(), ["dishonest", "moveable"]);
}

#[test]
fn every_non_boolean_requirement_is_reported() {
    let p = program(
        "many",
        vec![Item::LegalTest(legal_test(
            "T",
            vec![("a", int_ty()), ("b", bool_ty()), ("c", string_ty())],
        ))],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    let names: Vec<_> = errs
        .iter()
        .filter_map(|e| match &e.kind {
            ErrorKind::NonBooleanRequirement(n) => Some(n.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, ["a", "c"]);
}

#[test]
fn satisfies_unknown_test_is_undefined() {
    let p = program(
        "s",
        vec![
            Item::Struct(struct_def("Case", vec![field("x", bool_ty())])),
            Item::Principle(principle(
                "P",
                forall("c", named("Case", vec![]), satisfies(var("c"), "Robbery")),
            )),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::UndefinedSymbol("Robbery".into()));
}
