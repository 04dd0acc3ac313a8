use serde::{Deserialize, Serialize};

/// Age bracket of the monitored child. Gates which checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeClass {
    /// 9–12
    PreTeen,
    /// 13–15
    Teen,
    /// 16–17
    EarlyAdult,
}

impl AgeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeClass::PreTeen => "PRE_TEEN",
            AgeClass::Teen => "TEEN",
            AgeClass::EarlyAdult => "EARLY_ADULT",
        }
    }

    /// Plain-language description used when prompting the classifier.
    pub fn audience(&self) -> &'static str {
        match self {
            AgeClass::PreTeen => "a pre-teen child aged 9 to 12",
            AgeClass::Teen => "a young teenager aged 13 to 15",
            AgeClass::EarlyAdult => "an older teenager aged 16 to 17",
        }
    }
}

impl std::fmt::Display for AgeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgePolicy {
    pub class: AgeClass,
    /// Keyword score at or above which a navigation is blocked.
    pub threshold: f64,
}

/// Map an age to its policy. Ages outside 9–17 have no policy, which
/// disables every age-gated check.
pub fn resolve_age_policy(age: u8) -> Option<AgePolicy> {
    let (class, threshold) = match age {
        9..=12 => (AgeClass::PreTeen, 0.4),
        13..=15 => (AgeClass::Teen, 0.5),
        16..=17 => (AgeClass::EarlyAdult, 0.6),
        _ => return None,
    };
    Some(AgePolicy { class, threshold })
}
