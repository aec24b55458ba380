//! PostgreSQL store implementation.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{Permission, RefreshTokenRecord, Role, Tenant, User};
use crate::services::audit::AuditEvent;
use crate::store::{
    AuditSink, CredentialStore, PermissionCatalog, RbacStore, RefreshTokenStore, RotationOutcome,
    TenantStore,
};

/// Database connection pool wrapper implementing the store contracts.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new connection pool. Acquire is bounded so a saturated
    /// pool surfaces as a dependency failure rather than hanging the
    /// auth flow.
    #[instrument(skip(config), fields(service = "trust-service"))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, anyhow::Error> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect: {}", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), anyhow::Error> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tenant_id, email, password_hash, legacy_role, status, created_utc
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tenant_id, email, password_hash, legacy_role, status, created_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, password_hash), fields(user_id = %user_id))]
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), anyhow::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User {} not found", user_id));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for PostgresStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, anyhow::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, plan, rbac_enabled, created_utc
            FROM tenants
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }
}

const REFRESH_TOKEN_COLUMNS: &str = "token_id, user_id, token_hash, device_info, ip_address, \
     issued_at, expires_at, last_used_at, revoked_at";

#[async_trait]
impl RefreshTokenStore for PostgresStore {
    #[instrument(skip(self, record), fields(token_id = %record.token_id))]
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (token_id, user_id, token_hash, device_info, ip_address, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.token_id)
        .bind(record.user_id)
        .bind(&record.token_hash)
        .bind(&record.device_info)
        .bind(&record.ip_address)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(token_id = %token_id))]
    async fn get_by_id(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, anyhow::Error> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_id = $1",
            REFRESH_TOKEN_COLUMNS
        ))
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    #[instrument(skip(self), fields(token_id = %token_id))]
    async fn mark_used(&self, token_id: Uuid) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET last_used_at = NOW()
            WHERE token_id = $1 AND last_used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(token_id = %token_id))]
    async fn revoke(&self, token_id: Uuid) -> Result<(), anyhow::Error> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_id = $1 AND revoked_at IS NULL",
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, new_record), fields(old_token_id = %old_token_id, new_token_id = %new_record.token_id))]
    async fn rotate(
        &self,
        old_token_id: Uuid,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, anyhow::Error> {
        // Single transaction: the conditional update takes the row lock
        // and decides the winner; a dropped transaction (caller
        // cancellation) rolls back both writes.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET last_used_at = NOW()
            WHERE token_id = $1 AND last_used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(old_token_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RotationOutcome::Reused);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (token_id, user_id, token_hash, device_info, ip_address, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(new_record.token_id)
        .bind(new_record.user_id)
        .bind(&new_record.token_hash)
        .bind(&new_record.device_info)
        .bind(&new_record.ip_address)
        .bind(new_record.issued_at)
        .bind(new_record.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RotationOutcome::Rotated)
    }
}

#[async_trait]
impl RbacStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %user_id, tenant_id = %tenant_id))]
    async fn assigned_roles(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Role>, anyhow::Error> {
        // Tenant equality enforced on the join itself, not only on the
        // assignment row.
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.role_id, r.tenant_id, r.name, r.description, r.is_default, r.created_utc
            FROM roles r
            INNER JOIN user_roles ur
                ON ur.role_id = r.role_id AND ur.tenant_id = r.tenant_id
            WHERE ur.user_id = $1 AND ur.tenant_id = $2 AND r.tenant_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn default_roles(&self, tenant_id: Uuid) -> Result<Vec<Role>, anyhow::Error> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT role_id, tenant_id, name, description, is_default, created_utc
            FROM roles
            WHERE tenant_id = $1 AND is_default = TRUE
            ORDER BY role_id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    #[instrument(skip(self), fields(role_id = %role_id))]
    async fn permissions_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, anyhow::Error> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.permission_id, p.resource, p.action, p.description
            FROM permissions p
            INNER JOIN role_permissions rp ON rp.permission_id = p.permission_id
            WHERE rp.role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }
}

#[async_trait]
impl PermissionCatalog for PostgresStore {
    #[instrument(skip(self))]
    async fn all_permissions(&self) -> Result<Vec<Permission>, anyhow::Error> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT permission_id, resource, action, description FROM permissions",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }
}

#[async_trait]
impl AuditSink for PostgresStore {
    #[instrument(skip(self, event), fields(event_type = event.event_type.as_str()))]
    async fn write(&self, event: AuditEvent) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_events
                (event_id, event_type, user_id, ip_address, user_agent, device_info,
                 token_type, token_id, success, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.event_id)
        .bind(event.event_type.as_str())
        .bind(event.user_id)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.device_info)
        .bind(&event.token_type)
        .bind(event.token_id)
        .bind(event.success)
        .bind(&event.error)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
