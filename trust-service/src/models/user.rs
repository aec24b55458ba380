//! User model - tenant-scoped user accounts and the request Principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Legacy single-role field. Closed variant, parsed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyRole {
    Admin,
    Editor,
}

impl LegacyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyRole::Admin => "admin",
            LegacyRole::Editor => "editor",
        }
    }
}

impl std::str::FromStr for LegacyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(LegacyRole::Admin),
            "editor" => Ok(LegacyRole::Editor),
            _ => Err(format!("Invalid legacy role: {}", s)),
        }
    }
}

/// User account state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    PendingVerification,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::PendingVerification => "pending_verification",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "pending_verification" => Ok(UserStatus::PendingVerification),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// User entity (tenant-scoped).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub legacy_role: String,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(
        tenant_id: Uuid,
        email: String,
        password_hash: String,
        legacy_role: LegacyRole,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            tenant_id,
            email,
            password_hash,
            legacy_role: legacy_role.as_str().to_string(),
            status: UserStatus::PendingVerification.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Parse the stored role string into the closed variant.
    pub fn role(&self) -> Result<LegacyRole, String> {
        self.legacy_role.parse()
    }

    /// Parse the stored status string into the closed variant.
    pub fn user_status(&self) -> Result<UserStatus, String> {
        self.status.parse()
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active.as_str()
    }
}

/// Authenticated identity bound to one tenant for a request's duration.
///
/// Threaded explicitly as a parameter through every call; never pulled
/// from ambient context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub legacy_role: LegacyRole,
    pub status: UserStatus,
}

impl Principal {
    pub fn from_user(user: &User) -> Result<Self, String> {
        Ok(Self {
            user_id: user.user_id,
            tenant_id: user.tenant_id,
            legacy_role: user.role()?,
            status: user.user_status()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_role_round_trip() {
        assert_eq!("admin".parse::<LegacyRole>().unwrap(), LegacyRole::Admin);
        assert_eq!("editor".parse::<LegacyRole>().unwrap(), LegacyRole::Editor);
        assert!("owner".parse::<LegacyRole>().is_err());
    }

    #[test]
    fn test_user_status_parse() {
        assert_eq!(
            "pending_verification".parse::<UserStatus>().unwrap(),
            UserStatus::PendingVerification
        );
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_principal_from_user() {
        let user = User::new(
            Uuid::new_v4(),
            "a@example.com".to_string(),
            "hash".to_string(),
            LegacyRole::Editor,
        );
        let principal = Principal::from_user(&user).unwrap();
        assert_eq!(principal.user_id, user.user_id);
        assert_eq!(principal.legacy_role, LegacyRole::Editor);
        assert_eq!(principal.status, UserStatus::PendingVerification);
    }
}
