//! Subscription tier ordering and label parsing
//!
//! Access control across the planner reduces to one rule: a user's tier
//! must rank at or above the tier a feature requires. Admin accounts are
//! handled above this layer and never reach ordinal comparison.

use serde::{Deserialize, Serialize};

/// Ordered subscription tiers, lowest first.
///
/// The ordinal is the sole admission rule: `rank(current) >= rank(required)`
/// grants access. Labels are matched case-insensitively at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier, the default for every account
    Seedling,
    /// First paid tier
    Nurturer,
    /// Mid paid tier
    Flourish,
    /// Top paid tier
    Radiant,
}

impl Tier {
    /// Numeric rank used for admission comparison. Higher rank = more access.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Seedling => 0,
            Tier::Nurturer => 1,
            Tier::Flourish => 2,
            Tier::Radiant => 3,
        }
    }

    /// Parse a tier label, case-insensitively. Unknown labels return None.
    pub fn parse(label: &str) -> Option<Tier> {
        match label.trim().to_ascii_lowercase().as_str() {
            "seedling" => Some(Tier::Seedling),
            "nurturer" => Some(Tier::Nurturer),
            "flourish" => Some(Tier::Flourish),
            "radiant" => Some(Tier::Radiant),
            _ => None,
        }
    }

    /// Parse a tier label, mapping unknown input to the lowest tier.
    ///
    /// Unknown labels fail open to Seedling: a garbled plan string can only
    /// deny premium access, never over-grant it.
    pub fn parse_or_default(label: &str) -> Tier {
        Tier::parse(label).unwrap_or(Tier::Seedling)
    }

    /// True iff this tier ranks at or above `required`.
    pub fn meets(self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }

    /// Canonical lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Seedling => "seedling",
            Tier::Nurturer => "nurturer",
            Tier::Flourish => "flourish",
            Tier::Radiant => "radiant",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-level admission comparison: does `current_label` rank at or above
/// `required_label`? Both sides tolerate unknown labels (treated as Seedling).
pub fn compare(current_label: &str, required_label: &str) -> bool {
    Tier::parse_or_default(current_label).meets(Tier::parse_or_default(required_label))
}
