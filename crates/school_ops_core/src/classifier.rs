//! crates/school_ops_core/src/classifier.rs
//!
//! Maps raw class codes onto coarse education-level buckets.

use serde::{Deserialize, Serialize};

use crate::domain::RosterMember;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    EarlyChildhood,
    EarlyElementary,
    LateElementary,
    Secondary,
    /// Matches no membership list. Visible only under the "all" filter.
    Unclassified,
}

const EARLY_CHILDHOOD: &[&str] = &[
    "BERÇARIO",
    "BERCARIO",
    "BERÇÁRIO",
    "MATERNAL",
    "MATERNAL I",
    "MATERNAL II",
    "PRÉ I",
    "PRÉ II",
    "PRE I",
    "PRE II",
];

const EARLY_ELEMENTARY: &[&str] = &[
    "1º ANO", "2º ANO", "3º ANO", "4º ANO", "5º ANO", "1 ANO", "2 ANO", "3 ANO", "4 ANO",
    "5 ANO",
];

const LATE_ELEMENTARY: &[&str] = &[
    "6º ANO", "7º ANO", "8º ANO", "9º ANO", "6 ANO", "7 ANO", "8 ANO", "9 ANO", "6A", "6B",
    "7A", "7B", "8A", "8B", "9A", "9B",
];

const SECONDARY: &[&str] = &["1A", "1B", "1C", "2A", "2B", "2C", "3A", "3B", "3C"];

impl Bucket {
    /// Every bucket a filter can select, in display order.
    pub const LEVELS: [Bucket; 4] = [
        Bucket::EarlyChildhood,
        Bucket::EarlyElementary,
        Bucket::LateElementary,
        Bucket::Secondary,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Bucket::EarlyChildhood => "early-childhood",
            Bucket::EarlyElementary => "early-elementary",
            Bucket::LateElementary => "late-elementary",
            Bucket::Secondary => "secondary",
            Bucket::Unclassified => "unclassified",
        }
    }

    fn members(&self) -> &'static [&'static str] {
        match self {
            Bucket::EarlyChildhood => EARLY_CHILDHOOD,
            Bucket::EarlyElementary => EARLY_ELEMENTARY,
            Bucket::LateElementary => LATE_ELEMENTARY,
            Bucket::Secondary => SECONDARY,
            Bucket::Unclassified => &[],
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Bucket::LEVELS
            .into_iter()
            .chain(std::iter::once(Bucket::Unclassified))
            .find(|b| b.slug() == wanted)
            .ok_or_else(|| format!("unknown education level '{}'", s))
    }
}

/// Classifies a class code. Total: unknown codes come back as `Unclassified`.
pub fn classify(class_code: &str) -> Bucket {
    let normalized = class_code.trim().to_uppercase();
    Bucket::LEVELS
        .into_iter()
        .find(|bucket| bucket.members().contains(&normalized.as_str()))
        .unwrap_or(Bucket::Unclassified)
}

/// Which roster members a view should consider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RosterFilter {
    #[default]
    All,
    /// Exact class-code match.
    Class(String),
    Level(Bucket),
}

impl RosterFilter {
    /// `None` or a blank code selects everyone. Any other code is kept verbatim.
    pub fn from_class(class_code: Option<&str>) -> Self {
        match class_code {
            Some(code) if !code.trim().is_empty() => RosterFilter::Class(code.to_string()),
            _ => RosterFilter::All,
        }
    }

    pub fn matches_code(&self, class_code: &str) -> bool {
        match self {
            RosterFilter::All => true,
            RosterFilter::Class(code) => class_code == code,
            RosterFilter::Level(Bucket::Unclassified) => false,
            RosterFilter::Level(bucket) => classify(class_code) == *bucket,
        }
    }

    pub fn matches(&self, member: &RosterMember) -> bool {
        self.matches_code(&member.class_code)
    }

    pub fn apply<'a>(&self, roster: &'a [RosterMember]) -> Vec<&'a RosterMember> {
        roster.iter().filter(|m| self.matches(m)).collect()
    }
}
