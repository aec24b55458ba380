//! In-memory store implementation.
//!
//! Backs the unit tests and mirrors the transactional semantics of the
//! Postgres implementation: `rotate` performs its conditional update
//! and insert under one lock, so concurrent rotations of the same token
//! still have exactly one winner.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{Permission, RefreshTokenRecord, Role, Tenant, User};
use crate::services::audit::AuditEvent;
use crate::store::{
    AuditSink, CredentialStore, PermissionCatalog, RbacStore, RefreshTokenStore, RotationOutcome,
    TenantStore,
};

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    tenants: Mutex<HashMap<Uuid, Tenant>>,
    tokens: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
    roles: Mutex<HashMap<Uuid, Role>>,
    role_permissions: Mutex<HashMap<Uuid, Vec<Permission>>>,
    /// (user_id, role_id, tenant_id) assignment rows
    user_roles: Mutex<Vec<(Uuid, Uuid, Uuid)>>,
    catalog: Mutex<Vec<Permission>>,
    audit_events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Fixture helpers ------------------------------------------------

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.user_id, user);
    }

    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants
            .lock()
            .unwrap()
            .insert(tenant.tenant_id, tenant);
    }

    pub fn insert_role(&self, role: Role, permissions: Vec<Permission>) {
        self.role_permissions
            .lock()
            .unwrap()
            .insert(role.role_id, permissions);
        self.roles.lock().unwrap().insert(role.role_id, role);
    }

    pub fn assign_role(&self, user_id: Uuid, role_id: Uuid, tenant_id: Uuid) {
        self.user_roles
            .lock()
            .unwrap()
            .push((user_id, role_id, tenant_id));
    }

    pub fn insert_catalog_permission(&self, permission: Permission) {
        self.catalog.lock().unwrap().push(permission);
    }

    // Assertion helpers ----------------------------------------------

    pub fn token_count_for_user(&self, user_id: Uuid) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .count()
    }

    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit_events.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), anyhow::Error> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("User {} not found", user_id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, anyhow::Error> {
        Ok(self.tenants.lock().unwrap().get(&tenant_id).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error> {
        self.tokens
            .lock()
            .unwrap()
            .insert(record.token_id, record.clone());
        Ok(())
    }

    async fn get_by_id(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, anyhow::Error> {
        Ok(self.tokens.lock().unwrap().get(&token_id).cloned())
    }

    async fn mark_used(&self, token_id: Uuid) -> Result<bool, anyhow::Error> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(&token_id) {
            Some(rec) if rec.last_used_at.is_none() && rec.revoked_at.is_none() => {
                rec.last_used_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, token_id: Uuid) -> Result<(), anyhow::Error> {
        if let Some(rec) = self.tokens.lock().unwrap().get_mut(&token_id) {
            rec.revoked_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, r| r.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn rotate(
        &self,
        old_token_id: Uuid,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, anyhow::Error> {
        // One lock covers both writes, matching the single transaction
        // of the Postgres implementation.
        let mut tokens = self.tokens.lock().unwrap();

        let won = match tokens.get_mut(&old_token_id) {
            Some(rec) if rec.last_used_at.is_none() && rec.revoked_at.is_none() => {
                rec.last_used_at = Some(Utc::now());
                true
            }
            _ => false,
        };

        if !won {
            return Ok(RotationOutcome::Reused);
        }

        tokens.insert(new_record.token_id, new_record.clone());
        Ok(RotationOutcome::Rotated)
    }
}

#[async_trait]
impl RbacStore for InMemoryStore {
    async fn assigned_roles(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Role>, anyhow::Error> {
        let assignments = self.user_roles.lock().unwrap();
        let roles = self.roles.lock().unwrap();
        Ok(assignments
            .iter()
            .filter(|(u, _, t)| *u == user_id && *t == tenant_id)
            .filter_map(|(_, role_id, _)| roles.get(role_id))
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn default_roles(&self, tenant_id: Uuid) -> Result<Vec<Role>, anyhow::Error> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.is_default)
            .cloned()
            .collect())
    }

    async fn permissions_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, anyhow::Error> {
        Ok(self
            .role_permissions
            .lock()
            .unwrap()
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryStore {
    async fn all_permissions(&self) -> Result<Vec<Permission>, anyhow::Error> {
        Ok(self.catalog.lock().unwrap().clone())
    }
}

#[async_trait]
impl AuditSink for InMemoryStore {
    async fn write(&self, event: AuditEvent) -> Result<(), anyhow::Error> {
        self.audit_events.lock().unwrap().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: Uuid) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            Uuid::new_v4(),
            user_id,
            "token",
            "cli".to_string(),
            "127.0.0.1".to_string(),
            7,
        )
    }

    #[tokio::test]
    async fn test_mark_used_is_idempotent() {
        let store = InMemoryStore::new();
        let rec = record(Uuid::new_v4());
        store.put(&rec).await.unwrap();

        assert!(store.mark_used(rec.token_id).await.unwrap());
        assert!(!store.mark_used(rec.token_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_single_winner() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let old = record(user);
        store.put(&old).await.unwrap();

        let first = store.rotate(old.token_id, &record(user)).await.unwrap();
        let second = store.rotate(old.token_id, &record(user)).await.unwrap();

        assert_eq!(first, RotationOutcome::Rotated);
        assert_eq!(second, RotationOutcome::Reused);
        // The loser inserted nothing: old + one successor.
        assert_eq!(store.token_count_for_user(user), 2);
    }

    #[tokio::test]
    async fn test_rotate_refuses_revoked_record() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let old = record(user);
        store.put(&old).await.unwrap();
        store.revoke(old.token_id).await.unwrap();

        let outcome = store.rotate(old.token_id, &record(user)).await.unwrap();
        assert_eq!(outcome, RotationOutcome::Reused);
        assert_eq!(store.token_count_for_user(user), 1);
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.put(&record(user)).await.unwrap();
        store.put(&record(user)).await.unwrap();
        store.put(&record(other)).await.unwrap();

        let deleted = store.delete_all_for_user(user).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.token_count_for_user(user), 0);
        assert_eq!(store.token_count_for_user(other), 1);
    }
}
