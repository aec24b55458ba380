//! Trust layer for a multi-tenant SaaS backend.
//!
//! Authenticates requests via rotating bearer tokens and resolves the
//! authorization context (effective permission set) for each
//! authenticated principal. The surrounding HTTP layer owns routing and
//! request validation; this crate owns the token lifecycle state
//! machine and the dual-mode permission resolver.

pub mod config;
pub mod cookies;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use trust_core::error::AppError;

use crate::config::TrustConfig;
use crate::services::{
    AuditRecorder, AuthorizationResolver, RateLimits, RoleResolver, SessionManager, TokenCodec,
};
use crate::store::{
    AuditSink, CredentialStore, PermissionCatalog, PostgresStore, RbacStore, RefreshTokenStore,
    TenantStore,
};

/// Shared state handed to the HTTP layer. Everything in here is cheap
/// to clone; durable state lives behind the store traits.
#[derive(Clone)]
pub struct TrustState {
    pub config: TrustConfig,
    pub codec: TokenCodec,
    pub sessions: SessionManager,
    pub authz: AuthorizationResolver,
    pub users: Arc<dyn CredentialStore>,
    pub audit: AuditRecorder,
}

impl TrustState {
    /// Wire the trust layer against explicit store implementations.
    pub fn new(
        config: TrustConfig,
        users: Arc<dyn CredentialStore>,
        tenants: Arc<dyn TenantStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        rbac: Arc<dyn RbacStore>,
        catalog: Arc<dyn PermissionCatalog>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        let codec = TokenCodec::new(&config.jwt);
        let audit = AuditRecorder::new(audit_sink);
        let limits = RateLimits::from_config(&config.rate_limit);

        let sessions = SessionManager::new(
            codec.clone(),
            users.clone(),
            tokens,
            audit.clone(),
            limits,
        );

        let authz = AuthorizationResolver::new(tenants, catalog, RoleResolver::new(rbac));

        Self {
            config,
            codec,
            sessions,
            authz,
            users,
            audit,
        }
    }

    /// Wire against PostgreSQL: the production path.
    pub async fn from_config(config: TrustConfig) -> Result<Self, AppError> {
        let store = PostgresStore::new(&config.database)
            .await
            .map_err(AppError::DatabaseError)?;
        store
            .run_migrations()
            .await
            .map_err(AppError::DatabaseError)?;

        let store = Arc::new(store);
        Ok(Self::new(
            config,
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        ))
    }
}
