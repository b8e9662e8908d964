use serde::{Deserialize, Serialize};

use super::crypto::SPECIAL_CHARACTERS;

/// Pool contributed by the special set. Kept at 21 so estimates stay
/// comparable with vaults created by earlier releases.
const SPECIAL_POOL: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthLabel {
    Weak,
    Fair,
    Strong,
    #[serde(rename = "Very Strong")]
    VeryStrong,
}

impl std::fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "Weak"),
            Self::Fair => write!(f, "Fair"),
            Self::Strong => write!(f, "Strong"),
            Self::VeryStrong => write!(f, "Very Strong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthEstimate {
    pub label: StrengthLabel,
    pub entropy_bits: f64,
}

/// Rough entropy estimate: length times log2 of the character pool implied
/// by the classes present.
pub fn estimate_password_strength(password: &str) -> StrengthEstimate {
    let mut pool_size = 0u32;
    if password.chars().any(char::is_uppercase) {
        pool_size += 26;
    }
    if password.chars().any(char::is_lowercase) {
        pool_size += 26;
    }
    if password.chars().any(char::is_numeric) {
        pool_size += 10;
    }
    if password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        pool_size += SPECIAL_POOL;
    }

    let entropy_bits = if pool_size > 0 {
        password.chars().count() as f64 * f64::from(pool_size).log2()
    } else {
        0.0
    };

    let label = if entropy_bits < 50.0 {
        StrengthLabel::Weak
    } else if entropy_bits < 70.0 {
        StrengthLabel::Fair
    } else if entropy_bits < 90.0 {
        StrengthLabel::Strong
    } else {
        StrengthLabel::VeryStrong
    };

    StrengthEstimate {
        label,
        entropy_bits,
    }
}
