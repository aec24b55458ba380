//! Tenant model - the unit of isolation and the RBAC strategy switch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant entity.
///
/// `rbac_enabled` selects which authorization path applies to the
/// tenant's users: the legacy single-role model when false, the
/// data-driven role/permission model when true.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub plan: String,
    pub rbac_enabled: bool,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    pub fn new(plan: String) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            plan,
            rbac_enabled: false,
            created_utc: Utc::now(),
        }
    }
}
