//! Persistence contracts for the trust layer.
//!
//! All durable state lives behind these traits so the service layer is
//! testable against the in-memory implementation and deployable against
//! Postgres. Store failures surface as `anyhow::Error` and become
//! dependency failures at the service layer.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Permission, RefreshTokenRecord, Role, Tenant, User};
use crate::services::audit::AuditEvent;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Outcome of an atomic refresh token rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// This caller won: the old record is marked used and the successor
    /// record is persisted.
    Rotated,
    /// The old record was already used or revoked; nothing was written.
    Reused,
}

/// Credential repository: email -> stored credentials and identity.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error>;

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), anyhow::Error>;
}

/// Tenant repository.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, anyhow::Error>;
}

/// Persistence contract for refresh token records.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error>;

    async fn get_by_id(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, anyhow::Error>;

    /// Mark a record used. Idempotent: returns true only for the call
    /// that actually transitioned the record, false when it was already
    /// used or revoked.
    async fn mark_used(&self, token_id: Uuid) -> Result<bool, anyhow::Error>;

    /// Set `revoked_at` (logout, admin action).
    async fn revoke(&self, token_id: Uuid) -> Result<(), anyhow::Error>;

    /// Blast-radius control for password changes. Returns the number of
    /// records removed.
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error>;

    /// Atomically mark the old record used and persist its successor in
    /// one transaction. The conditional update guarantees exactly one
    /// winner among concurrent rotations of the same token; losers see
    /// `Reused` and nothing is written for them.
    async fn rotate(
        &self,
        old_token_id: Uuid,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, anyhow::Error>;
}

/// Role/permission repository for the RBAC path. Every query is
/// tenant-scoped; cross-tenant rows must never be returned.
#[async_trait]
pub trait RbacStore: Send + Sync {
    /// Roles explicitly assigned to the user within the tenant.
    async fn assigned_roles(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Role>, anyhow::Error>;

    /// All roles flagged `is_default` for the tenant. More than one is
    /// a data anomaly the resolver handles deterministically.
    async fn default_roles(&self, tenant_id: Uuid) -> Result<Vec<Role>, anyhow::Error>;

    async fn permissions_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, anyhow::Error>;
}

/// Static global permission catalog reader.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    async fn all_permissions(&self) -> Result<Vec<Permission>, anyhow::Error>;
}

/// Fire-and-forget audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, event: AuditEvent) -> Result<(), anyhow::Error>;
}
