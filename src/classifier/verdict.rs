// Verdicts and the dispatch table that turns them into moderation actions.
//
// The table is data, not branching: each verdict maps to at most one label
// and at most one durable-tier cooldown.

use serde::{Deserialize, Serialize};

use crate::moderation::labels;

/// The classifier's categorical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Scam,
    ShillingCrypto,
    FomoInducer,
    Potential,
    BotActivity,
    Benign,
}

impl Verdict {
    pub const ALL: [Verdict; 6] = [
        Verdict::Scam,
        Verdict::ShillingCrypto,
        Verdict::FomoInducer,
        Verdict::Potential,
        Verdict::BotActivity,
        Verdict::Benign,
    ];

    /// Parse a classifier reply. Anything outside the closed set is benign.
    ///
    /// Tolerates case, surrounding whitespace/quotes/punctuation, and `_` or
    /// space in place of `-`.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();

        match normalized.as_str() {
            "scam" => Verdict::Scam,
            "shilling-crypto" => Verdict::ShillingCrypto,
            "fomo-inducer" => Verdict::FomoInducer,
            "potential" => Verdict::Potential,
            "bot-activity" => Verdict::BotActivity,
            _ => Verdict::Benign,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Scam => "scam",
            Verdict::ShillingCrypto => "shilling-crypto",
            Verdict::FomoInducer => "fomo-inducer",
            Verdict::Potential => "potential",
            Verdict::BotActivity => "bot-activity",
            Verdict::Benign => "benign",
        }
    }

    /// The action record for this verdict.
    pub fn policy(&self) -> &'static VerdictPolicy {
        // Every variant has exactly one row; falls back to the benign row
        DISPATCH_TABLE
            .iter()
            .find(|row| row.verdict == *self)
            .unwrap_or(&DISPATCH_TABLE[DISPATCH_TABLE.len() - 1])
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do for one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictPolicy {
    pub verdict: Verdict,
    /// Label to apply to the post (or account when there is no post ref).
    pub label: Option<&'static str>,
    /// Days to add the account to the durable ignore tier.
    pub ignore_days: Option<u32>,
}

/// fomo-inducer and potential deliberately add no cooldown; benign adds a
/// one-day cooldown so low-signal accounts aren't re-classified constantly.
pub static DISPATCH_TABLE: [VerdictPolicy; 6] = [
    VerdictPolicy {
        verdict: Verdict::Scam,
        label: Some(labels::POTENTIAL_SCAM),
        ignore_days: Some(7),
    },
    VerdictPolicy {
        verdict: Verdict::ShillingCrypto,
        label: Some(labels::SHILLING_CRYPTO),
        ignore_days: Some(7),
    },
    VerdictPolicy {
        verdict: Verdict::BotActivity,
        label: Some(labels::BOT_ACTIVITY),
        ignore_days: Some(30),
    },
    VerdictPolicy {
        verdict: Verdict::FomoInducer,
        label: Some(labels::FOMO_INDUCER),
        ignore_days: None,
    },
    VerdictPolicy {
        verdict: Verdict::Potential,
        label: Some(labels::POTENTIAL_SCAM),
        ignore_days: None,
    },
    VerdictPolicy {
        verdict: Verdict::Benign,
        label: None,
        ignore_days: Some(1),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_verdict_has_one_row() {
        for verdict in Verdict::ALL {
            let rows = DISPATCH_TABLE
                .iter()
                .filter(|r| r.verdict == verdict)
                .count();
            assert_eq!(rows, 1, "{verdict} should have exactly one policy row");
            assert_eq!(verdict.policy().verdict, verdict);
        }
    }

    #[test]
    fn test_table_contents() {
        assert_eq!(Verdict::Scam.policy().label, Some("potential-scam"));
        assert_eq!(Verdict::Scam.policy().ignore_days, Some(7));
        assert_eq!(
            Verdict::ShillingCrypto.policy().label,
            Some("shilling-crypto")
        );
        assert_eq!(Verdict::ShillingCrypto.policy().ignore_days, Some(7));
        assert_eq!(Verdict::BotActivity.policy().label, Some("bot-activity"));
        assert_eq!(Verdict::BotActivity.policy().ignore_days, Some(30));
        assert_eq!(Verdict::FomoInducer.policy().label, Some("fomo-inducer"));
        assert_eq!(Verdict::FomoInducer.policy().ignore_days, None);
        assert_eq!(Verdict::Potential.policy().label, Some("potential-scam"));
        assert_eq!(Verdict::Potential.policy().ignore_days, None);
        assert_eq!(Verdict::Benign.policy().label, None);
        assert_eq!(Verdict::Benign.policy().ignore_days, Some(1));
    }

    #[test]
    fn test_parse_canonical_names() {
        for verdict in Verdict::ALL {
            assert_eq!(Verdict::parse(verdict.as_str()), verdict);
        }
    }

    #[test]
    fn test_parse_tolerates_formatting() {
        assert_eq!(Verdict::parse("  Scam.\n"), Verdict::Scam);
        assert_eq!(Verdict::parse("\"bot_activity\""), Verdict::BotActivity);
        assert_eq!(Verdict::parse("Shilling Crypto"), Verdict::ShillingCrypto);
        assert_eq!(Verdict::parse("FOMO-INDUCER"), Verdict::FomoInducer);
    }

    #[test]
    fn test_parse_unrecognized_is_benign() {
        assert_eq!(
            Verdict::parse("definitely a scam, trust me"),
            Verdict::Benign
        );
        assert_eq!(Verdict::parse(""), Verdict::Benign);
        assert_eq!(Verdict::parse("phishing"), Verdict::Benign);
    }
}
