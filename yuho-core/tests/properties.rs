use proptest::prelude::*;
use yuho_ast::build::*;
use yuho_ast::Item;
use yuho_core::{check_batch, check_conflict, Checker, ErrorKind};

fn generic_holder(params: usize, args: usize) -> yuho_ast::Program {
    let names: Vec<String> = (0..params).map(|i| format!("T{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    program(
        "arity",
        vec![
            Item::Struct(struct_def("Box", vec![]).generic(&refs)),
            Item::Struct(struct_def(
                "Holder",
                vec![field("b", named("Box", (0..args).map(|_| int_ty()).collect()))],
            )),
        ],
    )
}

fn variant_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["Active", "Inactive", "Suspended", "Closed"]), 1..4)
        .prop_map(|vs| {
            let mut out: Vec<String> = Vec::new();
            for v in vs {
                if !out.iter().any(|o| o == v) {
                    out.push(v.to_string());
                }
            }
            out
        })
}

proptest! {
    #[test]
    fn instantiation_checks_iff_arity_matches(params in 1usize..5, args in 0usize..6) {
        let result = Checker::new().check(&generic_holder(params, args));
        if params == args {
            prop_assert!(result.is_ok());
        } else {
            let errs = result.unwrap_err();
            prop_assert_eq!(&errs[0].kind, &ErrorKind::ArityMismatch { expected: params, got: args });
        }
    }

    #[test]
    fn bounded_type_accepted_iff_lower_not_above_upper(a in -1000i64..1000, b in -1000i64..1000) {
        let p = program(
            "bounds",
            vec![Item::Struct(struct_def("S", vec![field("v", refined(int_ty(), Some(a), Some(b)))]))],
        );
        let result = Checker::new().check(&p);
        if a <= b {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(&result.unwrap_err()[0].kind, &ErrorKind::OutOfBounds);
        }
    }

    #[test]
    fn constants_respect_bounds(lo in -50i64..50, width in 0i64..50, v in -120i64..120) {
        let hi = lo + width;
        let p = program(
            "bounds",
            vec![Item::Declaration(let_stmt("x", refined(int_ty(), Some(lo), Some(hi)), int(v)))],
        );
        let result = Checker::new().check(&p);
        prop_assert_eq!(result.is_ok(), (lo..=hi).contains(&v));
    }

    #[test]
    fn conflicts_are_symmetric(left in variant_names(), right in variant_names()) {
        let l: Vec<&str> = left.iter().map(String::as_str).collect();
        let r: Vec<&str> = right.iter().map(String::as_str).collect();
        let a = Checker::new().check(&program("a", vec![Item::Enum(enum_def("Status", &l))])).unwrap();
        let b = Checker::new().check(&program("b", vec![Item::Enum(enum_def("Status", &r))])).unwrap();
        let ab = check_conflict(&a, &b).map(|rep| rep.conflicts.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
        let ba = check_conflict(&b, &a).map(|rep| rep.conflicts.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
        prop_assert_eq!(&ab, &ba);
        prop_assert_eq!(ab.is_some(), left != right);
    }

    #[test]
    fn inherited_fields_are_the_union_of_the_chain(depth in 1usize..6) {
        let items: Vec<Item> = (0..depth)
            .map(|i| {
                let s = struct_def(&format!("S{i}"), vec![field(&format!("f{i}"), int_ty())]);
                let s = if i == 0 { s } else { s.extends(&format!("S{}", i - 1)) };
                Item::Struct(s)
            })
            .collect();
        let typed = Checker::new().check(&program("chain", items)).unwrap();
        let leaf = typed.env.id(&format!("S{}", depth - 1)).unwrap();
        let names: Vec<String> = typed.env.effective_fields(leaf).iter().map(|f| f.name.clone()).collect();
        let expected: Vec<String> = (0..depth).map(|i| format!("f{i}")).collect();
        prop_assert_eq!(names, expected);
    }
}

#[test]
fn batch_matches_one_by_one_checking() {
    let programs = vec![
        generic_holder(1, 1),
        generic_holder(2, 1),
        program("empty", vec![]),
    ];
    let checker = Checker::new();
    let batch = check_batch(&checker, &programs);
    assert_eq!(batch.len(), programs.len());
    for (p, got) in programs.iter().zip(&batch) {
        let single = checker.check(p);
        assert_eq!(got.is_ok(), single.is_ok(), "program {}", p.name);
        if let (Err(a), Err(b)) = (got, &single) {
            assert_eq!(a, b);
        }
    }
}
