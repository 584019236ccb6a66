use yuho_ast::build::*;
use yuho_ast::Item;
use yuho_core::{Checker, ErrorKind};

fn box_struct() -> Item {
    Item::Struct(struct_def("Box", vec![field("value", ty_var("T"))]).generic(&["T"]))
}

#[test]
fn box_of_int_checks() {
    let p = program(
        "box",
        vec![
            box_struct(),
            Item::Declaration(let_stmt(
                "b",
                named("Box", vec![int_ty()]),
                struct_lit("Box", vec![("value", int(5))]),
            )),
        ],
    );
    Checker::new().check(&p).expect("sema");
}

#[test]
fn box_with_two_arguments_is_arity_mismatch() {
    let p = program(
        "box",
        vec![
            box_struct(),
            Item::Declaration(let_stmt(
                "b",
                named("Box", vec![int_ty(), string_ty()]),
                struct_lit("Box", vec![("value", int(5))]),
            )),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(
        errs[0].kind,
        ErrorKind::ArityMismatch {
            expected: 1,
            got: 2
        },
        "unexpected error: {}",
        errs[0].message
    );
}

#[test]
fn generic_field_type_follows_the_instantiation() {
    let p = program(
        "box",
        vec![
            box_struct(),
            Item::Declaration(let_stmt(
                "b",
                named("Box", vec![bool_ty()]),
                struct_lit("Box", vec![("value", boolean(true))]),
            )),
            Item::Declaration(let_stmt("v", int_ty(), member(var("b"), "value"))),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("bool field read as int");
    assert!(
        matches!(errs[0].kind, ErrorKind::TypeMismatch { .. }),
        "unexpected error: {}",
        errs[0].message
    );
}

#[test]
fn undeclared_type_variable_in_field() {
    let p = program(
        "pair",
        vec![Item::Struct(
            struct_def("Pair", vec![field("left", ty_var("T")), field("right", ty_var("U"))])
                .generic(&["T"]),
        )],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::UnboundTypeVariable("U".into()));
}

#[test]
fn generic_alias_obeys_arity() {
    let p = program(
        "alias",
        vec![
            box_struct(),
            Item::TypeAlias(alias("Boxed", &["T"], named("Box", vec![ty_var("T")]))),
            Item::Declaration(let_stmt(
                "ok",
                named("Boxed", vec![int_ty()]),
                struct_lit("Box", vec![("value", int(1))]),
            )),
            Item::Declaration(let_stmt(
                "bad",
                named("Boxed", vec![]),
                struct_lit("Box", vec![("value", int(1))]),
            )),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs.len(), 1, "{errs:?}");
    assert_eq!(
        errs[0].kind,
        ErrorKind::ArityMismatch {
            expected: 1,
            got: 0
        }
    );
}

#[test]
fn alias_cycle_names_first_repeated_alias() {
    let p = program(
        "alias",
        vec![
            Item::TypeAlias(alias("A", &[], named("B", vec![]))),
            Item::TypeAlias(alias("B", &[], named("A", vec![]))),
        ],
    );
    let errs = Checker::new().check(&p).expect_err("expected sema error");
    assert_eq!(errs[0].kind, ErrorKind::CircularInheritance("A".into()));
}
