//! Role and permission models - tenant-scoped roles, global permissions,
//! and the many-to-many join rows between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role entity (tenant-scoped).
///
/// `is_default` roles are granted implicitly to users without explicit
/// assignments; they are immutable and undeletable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_default: bool,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    pub fn new(tenant_id: Uuid, name: String, description: String) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            tenant_id,
            name,
            description,
            is_default: false,
            created_utc: Utc::now(),
        }
    }
}

/// Global permission entity: one resource x action pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub permission_id: Uuid,
    pub resource: String,
    pub action: String,
    pub description: String,
}

impl Permission {
    /// Canonical "resource.action" key used in effective permission sets.
    pub fn key(&self) -> String {
        format!("{}.{}", self.resource, self.action)
    }
}

/// Role -> permission mapping.
#[derive(Debug, Clone, FromRow)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

/// User -> role assignment. Carries tenant_id so isolation can be
/// enforced on every join, not just at assignment time.
#[derive(Debug, Clone, FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub tenant_id: Uuid,
}

/// A role with its permissions resolved, as returned by the role
/// resolver.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRole {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_key() {
        let p = Permission {
            permission_id: Uuid::new_v4(),
            resource: "project".to_string(),
            action: "delete".to_string(),
            description: String::new(),
        };
        assert_eq!(p.key(), "project.delete");
    }
}
