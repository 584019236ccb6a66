#![forbid(unsafe_code)]

//! Per-program verification summaries.
//!
//! A summary keeps every principle's outcome, in declaration order:
//! - translated principles carry their [`VerificationResult`]
//! - principles the translator rejected carry the [`TranslationError`]
//!
//! Counts and total solver time are derived from those outcomes.

use std::fmt;

use serde::Serialize;

use crate::driver::{Verdict, VerificationResult};
use crate::translate::TranslationError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PrincipleOutcome {
    Checked(VerificationResult),
    NotTranslated {
        principle: String,
        error: TranslationError,
    },
}

impl PrincipleOutcome {
    pub fn principle(&self) -> &str {
        match self {
            PrincipleOutcome::Checked(r) => &r.principle_name,
            PrincipleOutcome::NotTranslated { principle, .. } => principle,
        }
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            PrincipleOutcome::Checked(r) => Some(r),
            PrincipleOutcome::NotTranslated { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&TranslationError> {
        match self {
            PrincipleOutcome::Checked(_) => None,
            PrincipleOutcome::NotTranslated { error, .. } => Some(error),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub program: String,
    pub outcomes: Vec<PrincipleOutcome>,
}

impl VerificationSummary {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, result: VerificationResult) {
        self.outcomes.push(PrincipleOutcome::Checked(result));
    }

    pub fn record_error(&mut self, principle: &str, error: TranslationError) {
        self.outcomes.push(PrincipleOutcome::NotTranslated {
            principle: principle.to_string(),
            error,
        });
    }

    pub fn get(&self, principle: &str) -> Option<&PrincipleOutcome> {
        self.outcomes.iter().find(|o| o.principle() == principle)
    }

    pub fn results(&self) -> impl Iterator<Item = &VerificationResult> {
        self.outcomes.iter().filter_map(PrincipleOutcome::result)
    }

    pub fn errors(&self) -> impl Iterator<Item = &TranslationError> {
        self.outcomes.iter().filter_map(PrincipleOutcome::error)
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.results().filter(|r| r.verdict == verdict).count()
    }

    pub fn translation_failures(&self) -> usize {
        self.errors().count()
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.results().map(|r| r.elapsed_ms).sum()
    }

    /// Every principle translated and proved.
    pub fn all_valid(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.result().is_some_and(VerificationResult::is_valid))
    }
}

impl fmt::Display for VerificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} valid, {} invalid, {} unknown, {} timed out",
            self.program,
            self.count(Verdict::Valid),
            self.count(Verdict::Invalid),
            self.count(Verdict::Unknown),
            self.count(Verdict::TimedOut),
        )?;
        let failures = self.translation_failures();
        if failures > 0 {
            write!(f, ", {failures} not translated")?;
        }
        write!(f, " ({}ms)", self.total_elapsed_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslationErrorKind;
    use yuho_ast::Span;

    fn result(name: &str, verdict: Verdict, elapsed_ms: u64) -> VerificationResult {
        VerificationResult {
            principle_name: name.into(),
            verdict,
            counterexample: None,
            logical_form: String::new(),
            detail: None,
            elapsed_ms,
        }
    }

    #[test]
    fn counts_and_time() {
        let mut s = VerificationSummary::new("theft.yh");
        s.record(result("A", Verdict::Valid, 10));
        s.record(result("B", Verdict::Invalid, 5));
        s.record(result("C", Verdict::TimedOut, 250));
        s.record_error(
            "D",
            TranslationError::new(
                TranslationErrorKind::UnboundQuantifierType("Offence".into()),
                "unknown type `Offence`",
                Span::default(),
            ),
        );

        assert_eq!(s.count(Verdict::Valid), 1);
        assert_eq!(s.count(Verdict::Unknown), 0);
        assert_eq!(s.translation_failures(), 1);
        assert_eq!(s.total_elapsed_ms(), 265);
        assert!(!s.all_valid());
        assert!(s.get("D").and_then(PrincipleOutcome::error).is_some());
        assert_eq!(
            s.to_string(),
            "theft.yh: 1 valid, 1 invalid, 0 unknown, 1 timed out, 1 not translated (265ms)"
        );
    }

    #[test]
    fn empty_summary_is_trivially_valid() {
        let s = VerificationSummary::new("empty.yh");
        assert!(s.all_valid());
        assert_eq!(s.total_elapsed_ms(), 0);
    }
}
