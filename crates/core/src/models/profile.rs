//! Profile model

use serde::{Deserialize, Serialize};

/// Display data for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Avatar fallback: first letter of each name, uppercased, at most two
    pub fn initials(&self) -> String {
        self.full_name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect::<String>()
            .to_uppercase()
            .chars()
            .take(2)
            .collect()
    }
}
