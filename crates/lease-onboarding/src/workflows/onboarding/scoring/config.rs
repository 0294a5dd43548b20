use serde::{Deserialize, Serialize};

/// Reference data the personal-data criterion compares a subscriber against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// City whose residents get the full residence score.
    pub home_city: String,
    /// Nationality code scoring the local tier.
    pub local_nationality: String,
    /// Prefix marking regional-bloc nationality codes (e.g. `EU-PT`).
    pub regional_bloc_prefix: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            home_city: "Paris".to_string(),
            local_nationality: "FR".to_string(),
            regional_bloc_prefix: "EU".to_string(),
        }
    }
}
