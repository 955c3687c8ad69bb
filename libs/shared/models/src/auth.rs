use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Roles the portal distinguishes between when deciding which flows a user may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalRole {
    Doctor,
    Patient,
    Coordinator,
    Admin,
}

impl fmt::Display for PortalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalRole::Doctor => write!(f, "doctor"),
            PortalRole::Patient => write!(f, "patient"),
            PortalRole::Coordinator => write!(f, "coordinator"),
            PortalRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for PortalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(PortalRole::Doctor),
            "patient" => Ok(PortalRole::Patient),
            "coordinator" => Ok(PortalRole::Coordinator),
            "admin" => Ok(PortalRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn portal_role(&self) -> Option<PortalRole> {
        self.role.as_deref().and_then(|role| role.parse().ok())
    }

    pub fn has_role(&self, role: PortalRole) -> bool {
        self.portal_role() == Some(role)
    }
}
