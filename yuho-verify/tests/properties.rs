use std::time::Duration;

use proptest::prelude::*;
use yuho_ast::build::*;
use yuho_ast::{BinOp, Item};
use yuho_core::{Checker, TypeEnv};
use yuho_verify::{
    EnumerativeSolver, QuantifierTranslator, Solver, SolverQuery, SolverResponse,
    TranslationErrorKind, Value, Verdict, VerificationDriver, VerifyOptions, MAX_QUANTIFIER_DEPTH,
};

struct CountingSolver {
    calls: usize,
}

impl Solver for CountingSolver {
    fn name(&self) -> &str {
        "counting"
    }

    fn check(&mut self, _query: &SolverQuery, _timeout: Duration) -> SolverResponse {
        self.calls += 1;
        SolverResponse::Unknown("stub".into())
    }
}

proptest! {
    #[test]
    fn depth_bound_is_exact(depth in 0usize..16) {
        let env = TypeEnv::new();
        let result = QuantifierTranslator::new(&env).translate(&principle("P", nested_foralls(depth)));
        if depth <= MAX_QUANTIFIER_DEPTH {
            let form = result.expect("within the bound");
            prop_assert_eq!(form.formula.quantifier_depth(), depth);
        } else {
            let err = result.expect_err("beyond the bound");
            prop_assert_eq!(
                err.kind,
                TranslationErrorKind::QuantifierDepthExceeded {
                    depth: MAX_QUANTIFIER_DEPTH + 1,
                    limit: MAX_QUANTIFIER_DEPTH,
                }
            );
        }
    }

    #[test]
    fn solver_is_called_iff_translation_succeeds(depth in 0usize..16) {
        let p = Checker::new()
            .check(&program("p", vec![Item::Principle(principle("P", nested_foralls(depth)))]))
            .expect("program checks");
        let mut driver = VerificationDriver::new(CountingSolver { calls: 0 }, VerifyOptions::default());
        let outcome = driver.verify_principle(&p, p.principle("P").expect("declared"));
        prop_assert_eq!(outcome.is_ok(), depth <= MAX_QUANTIFIER_DEPTH);
        prop_assert_eq!(driver.solver().calls, usize::from(depth <= MAX_QUANTIFIER_DEPTH));
    }

    #[test]
    fn lower_bound_is_the_counterexample(lo in -20i64..20, width in 1i64..30) {
        let hi = lo + width;
        let ty = || refined(int_ty(), Some(lo), Some(hi));
        let p = Checker::new()
            .check(&program(
                "bounds",
                vec![
                    Item::Principle(principle("AtLeast", forall("n", ty(), bin(var("n"), BinOp::Ge, int(lo))))),
                    Item::Principle(principle("Above", forall("n", ty(), bin(var("n"), BinOp::Gt, int(lo))))),
                ],
            ))
            .expect("program checks");

        let mut driver = VerificationDriver::new(EnumerativeSolver::default(), VerifyOptions::default());
        let at_least = driver.verify_principle(&p, p.principle("AtLeast").expect("declared")).expect("translates");
        prop_assert_eq!(at_least.verdict, Verdict::Valid);

        let above = driver.verify_principle(&p, p.principle("Above").expect("declared")).expect("translates");
        prop_assert_eq!(above.verdict, Verdict::Invalid);
        let ce = above.counterexample.expect("counterexample");
        prop_assert_eq!(ce.get("n"), Some(&Value::Int(lo)));
    }
}
