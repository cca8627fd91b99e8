//! Role tiers

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Access tiers in ascending order of privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    #[default]
    #[serde(rename = "analista_i")]
    AnalystI = 1,
    #[serde(rename = "analista_ii")]
    AnalystII = 2,
    #[serde(rename = "analista_iii")]
    AnalystIII = 3,
    #[serde(rename = "admin")]
    Admin = 4,
}

/// Visual weight of a role badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Outline,
    Destructive,
}

/// Label and variant shown next to the user's access level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBadge {
    pub label: &'static str,
    pub variant: BadgeVariant,
}

impl Role {
    /// Stored code
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AnalystI => "analista_i",
            Role::AnalystII => "analista_ii",
            Role::AnalystIII => "analista_iii",
            Role::Admin => "admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::AnalystI => "Analista I",
            Role::AnalystII => "Analista II",
            Role::AnalystIII => "Analista III",
            Role::Admin => "Administrador",
        }
    }

    pub fn badge(&self) -> RoleBadge {
        let variant = match self {
            Role::AnalystI => BadgeVariant::Secondary,
            Role::AnalystII => BadgeVariant::Default,
            Role::AnalystIII => BadgeVariant::Outline,
            Role::Admin => BadgeVariant::Destructive,
        };
        RoleBadge {
            label: self.display_name(),
            variant,
        }
    }

    /// Tiers an administrator may hand out through the provisioning form
    pub fn grantable() -> &'static [Role] {
        &[Role::AnalystI, Role::AnalystII, Role::AnalystIII]
    }

    pub fn is_grantable(&self) -> bool {
        Role::grantable().contains(self)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analista_i" => Ok(Role::AnalystI),
            "analista_ii" => Ok(Role::AnalystII),
            "analista_iii" => Ok(Role::AnalystIII),
            "admin" => Ok(Role::Admin),
            other => Err(Error::Validation(format!("unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
