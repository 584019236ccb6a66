use yuho_ast::build::*;
use yuho_ast::Item;
use yuho_core::{check_conflict, Checker, ConflictDetector, ConflictKind, TypedProgram};

fn checked(name: &str, items: Vec<Item>) -> TypedProgram {
    Checker::new()
        .check(&program(name, items))
        .expect("program checks")
}

fn status(variants: &[&str]) -> Vec<Item> {
    vec![Item::Enum(enum_def("Status", variants))]
}

#[test]
fn differing_status_enum_is_one_conflict() {
    let a = checked("a.yh", status(&["Active", "Inactive"]));
    let b = checked("b.yh", status(&["Active", "Suspended"]));
    let report = check_conflict(&a, &b).expect("conflict expected");
    assert_eq!(report.conflict_count(), 1);
    let c = &report.conflicts[0];
    assert_eq!(c.kind, ConflictKind::EnumConflict);
    assert_eq!(c.name, "Status");
    assert!(c.description.contains("Inactive") && c.description.contains("Suspended"));
}

#[test]
fn conflict_check_is_symmetric() {
    let a = checked("a.yh", status(&["Active", "Inactive"]));
    let b = checked("b.yh", status(&["Active"]));
    let ab = check_conflict(&a, &b).expect("conflict expected");
    let ba = check_conflict(&b, &a).expect("conflict expected");
    assert_eq!(ab.conflict_count(), ba.conflict_count());
    assert_eq!(ab.conflicts[0].name, ba.conflicts[0].name);
    assert_eq!(ab.conflicts[0].location_a, ba.conflicts[0].location_b);
    assert_eq!((ab.file_a.as_str(), ba.file_a.as_str()), ("a.yh", "b.yh"));
}

#[test]
fn struct_field_type_differences_conflict() {
    let a = checked(
        "a.yh",
        vec![Item::Struct(struct_def("Person", vec![field("age", int_ty())]))],
    );
    let b = checked(
        "b.yh",
        vec![Item::Struct(struct_def("Person", vec![field("age", string_ty())]))],
    );
    let report = check_conflict(&a, &b).expect("conflict expected");
    assert_eq!(report.conflicts[0].kind, ConflictKind::StructConflict);
    let diag = report.diagnostics();
    assert_eq!(diag.len(), 1);
    assert_eq!(diag[0].kind.name(), "ConflictDetected");
}

#[test]
fn alias_transparent_fields_do_not_conflict() {
    let a = checked(
        "a.yh",
        vec![
            Item::TypeAlias(alias("Years", &[], int_ty())),
            Item::Struct(struct_def("Person", vec![field("age", named("Years", vec![]))])),
        ],
    );
    let b = checked(
        "b.yh",
        vec![Item::Struct(struct_def("Person", vec![field("age", int_ty())]))],
    );
    assert!(check_conflict(&a, &b).is_none());
}

#[test]
fn legal_test_requirements_conflict() {
    let a = checked(
        "a.yh",
        vec![Item::LegalTest(legal_test("Theft", vec![("dishonest", bool_ty())]))],
    );
    let b = checked(
        "b.yh",
        vec![Item::LegalTest(legal_test(
            "Theft",
            vec![("dishonest", bool_ty()), ("moveable", bool_ty())],
        ))],
    );
    let report = check_conflict(&a, &b).expect("conflict expected");
    assert_eq!(report.conflicts[0].kind, ConflictKind::LegalTestConflict);
}

#[test]
fn struct_and_enum_with_same_name_conflict() {
    let a = checked("a.yh", status(&["Active"]));
    let b = checked(
        "b.yh",
        vec![Item::Struct(struct_def("Status", vec![field("active", bool_ty())]))],
    );
    let ab = check_conflict(&a, &b).expect("kinds differ");
    let ba = check_conflict(&b, &a).expect("kinds differ");
    assert_eq!(ab.conflict_count(), 1);
    assert_eq!(ab.conflicts[0].kind, ConflictKind::StructConflict);
    assert_eq!(ab.conflicts[0].name, "Status");
    assert!(ab.conflicts[0].description.contains("enum in a.yh"));
    assert_eq!(ba.conflicts[0].kind, ConflictKind::StructConflict);
    assert_eq!(ab.conflicts[0].location_a, ba.conflicts[0].location_b);
}

#[test]
fn detector_reports_only_conflicting_pairs() {
    let mut det = ConflictDetector::new();
    det.add_program("one.yh", checked("one", status(&["Active", "Inactive"])));
    det.add_program("two.yh", checked("two", status(&["Active", "Inactive"])));
    det.add_program("three.yh", checked("three", status(&["Open"])));
    assert_eq!(det.len(), 3);
    let reports = det.check_all();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.file_a == "three.yh" || r.file_b == "three.yh"));
    assert!(det.check_pair("one.yh", "two.yh").is_none());
}
