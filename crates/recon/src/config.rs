use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Business rules that vary between report variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconPolicy {
    #[serde(default)]
    pub not_available: NotAvailablePolicy,
    #[serde(default)]
    pub unmatched: UnmatchedPolicy,
}

/// How a "not available" value on either side is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotAvailablePolicy {
    /// NA against a present value is a mismatch; NA against NA matches.
    #[default]
    Mismatch,
    /// Any NA side skips the field: shown as `NA`, never counted.
    Skip,
}

/// What happens to records without a counterpart in every required source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Excluded from the result entirely (only the count is kept).
    #[default]
    Exclude,
    /// Listed in `ReconResult::unmatched`. Still excluded from the totals.
    Report,
}

impl std::fmt::Display for NotAvailablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "mismatch"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl std::fmt::Display for UnmatchedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exclude => write!(f, "exclude"),
            Self::Report => write!(f, "report"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default)]
        policy: ReconPolicy,
    }

    #[test]
    fn policy_defaults() {
        let w: Wrapper = serde_json::from_str("{}").unwrap();
        assert_eq!(w.policy.not_available, NotAvailablePolicy::Mismatch);
        assert_eq!(w.policy.unmatched, UnmatchedPolicy::Exclude);
    }

    #[test]
    fn policy_parses_snake_case() {
        let w: Wrapper =
            serde_json::from_str(r#"{"policy":{"not_available":"skip","unmatched":"report"}}"#)
                .unwrap();
        assert_eq!(w.policy.not_available, NotAvailablePolicy::Skip);
        assert_eq!(w.policy.unmatched, UnmatchedPolicy::Report);
    }

    #[test]
    fn policy_rejects_typo() {
        let r: Result<Wrapper, _> =
            serde_json::from_str(r#"{"policy":{"not_available":"skipp"}}"#);
        assert!(r.is_err());
    }
}
