#![forbid(unsafe_code)]

use std::time::Duration;

use serde::Serialize;

/// Nesting limit for `forall`/`exists`.
pub const MAX_QUANTIFIER_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SmtProfile {
    /// Interactive use; short timeouts.
    Fast,
    /// CI-friendly medium timeouts.
    Ci,
    /// Release audits.
    Thorough,
}

impl SmtProfile {
    pub fn default_timeout_ms(self) -> u64 {
        match self {
            SmtProfile::Fast => 250,
            SmtProfile::Ci => 2_000,
            SmtProfile::Thorough => 5_000,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(SmtProfile::Fast),
            "ci" => Some(SmtProfile::Ci),
            "thorough" => Some(SmtProfile::Thorough),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyOptions {
    pub profile: SmtProfile,
    /// Overrides the profile timeout when set.
    pub timeout_ms: Option<u64>,
    pub max_quantifier_depth: usize,
    /// Half-width of the integer window searched by the enumerative solver.
    pub enumeration_bound: i64,
    /// Passed to Z3 as `random_seed`.
    pub random_seed: Option<u32>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            profile: SmtProfile::Ci,
            timeout_ms: None,
            max_quantifier_depth: MAX_QUANTIFIER_DEPTH,
            enumeration_bound: 32,
            random_seed: None,
        }
    }
}

impl VerifyOptions {
    pub fn with_profile(profile: SmtProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
            .unwrap_or_else(|| self.profile.default_timeout_ms())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms())
    }

    /// Reads `YUHO_SMT_PROFILE` and `YUHO_SMT_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();

        if let Some(raw) = lookup("YUHO_SMT_PROFILE") {
            match SmtProfile::parse(&raw) {
                Some(p) => opts.profile = p,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring YUHO_SMT_PROFILE; expected fast, ci or thorough"
                ),
            }
        }

        if let Some(raw) = lookup("YUHO_SMT_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => opts.timeout_ms = Some(ms),
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring YUHO_SMT_TIMEOUT_MS; expected a positive integer"
                ),
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn profile_timeouts() {
        assert_eq!(VerifyOptions::with_profile(SmtProfile::Fast).timeout_ms(), 250);
        assert_eq!(VerifyOptions::default().timeout_ms(), 2_000);
        assert_eq!(VerifyOptions::with_profile(SmtProfile::Thorough).timeout_ms(), 5_000);
    }

    #[test]
    fn env_overrides_profile_and_timeout() {
        let opts = VerifyOptions::from_lookup(lookup(&[
            ("YUHO_SMT_PROFILE", "Thorough"),
            ("YUHO_SMT_TIMEOUT_MS", "750"),
        ]));
        assert_eq!(opts.profile, SmtProfile::Thorough);
        assert_eq!(opts.timeout_ms(), 750);
    }

    #[test]
    fn invalid_env_values_fall_back() {
        let opts = VerifyOptions::from_lookup(lookup(&[
            ("YUHO_SMT_PROFILE", "turbo"),
            ("YUHO_SMT_TIMEOUT_MS", "-3"),
        ]));
        assert_eq!(opts, VerifyOptions::default());
    }
}
