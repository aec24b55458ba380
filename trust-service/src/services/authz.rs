//! Authorization context resolution.
//!
//! Two strategies selected per tenant by `rbac_enabled`:
//! - legacy: the user's single role field decides everything (admin
//!   maps to the full catalog, editor to the empty set - editors rely
//!   on coarse route-level gating outside this layer);
//! - RBAC: the union of the user's tenant-scoped roles' permissions,
//!   falling back to the tenant default role when nothing is assigned.
//!
//! The two paths never blend. Permission sets are recomputed on every
//! call so assignment changes take effect immediately.

use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{LegacyRole, Principal, ResolvedRole};
use crate::services::error::ServiceError;
use crate::store::{PermissionCatalog, RbacStore, TenantStore};

/// Maps a user to their tenant-scoped roles with resolved permissions.
#[derive(Clone)]
pub struct RoleResolver {
    rbac: Arc<dyn RbacStore>,
}

impl RoleResolver {
    pub fn new(rbac: Arc<dyn RbacStore>) -> Self {
        Self { rbac }
    }

    /// Roles for a user within a tenant, default-role fallback applied.
    pub async fn roles_for_user(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<ResolvedRole>, ServiceError> {
        let mut roles = self
            .rbac
            .assigned_roles(user_id, tenant_id)
            .await
            .map_err(ServiceError::dependency)?;

        if roles.is_empty() {
            let mut defaults = self
                .rbac
                .default_roles(tenant_id)
                .await
                .map_err(ServiceError::dependency)?;

            if defaults.len() > 1 {
                // Data anomaly: more than one default role. Pick
                // deterministically, keep serving.
                defaults.sort_by_key(|r| r.role_id);
                tracing::warn!(
                    tenant_id = %tenant_id,
                    count = defaults.len(),
                    chosen = %defaults[0].role_id,
                    "Multiple default roles for tenant; picking lowest role id"
                );
                defaults.truncate(1);
            }

            roles = defaults;
        }

        let mut resolved = Vec::with_capacity(roles.len());
        for role in roles {
            // Tenant equality enforced on every join, not just at
            // assignment time.
            if role.tenant_id != tenant_id {
                tracing::warn!(
                    role_id = %role.role_id,
                    role_tenant = %role.tenant_id,
                    request_tenant = %tenant_id,
                    "Dropping cross-tenant role from resolution"
                );
                continue;
            }

            let permissions = self
                .rbac
                .permissions_for_role(role.role_id)
                .await
                .map_err(ServiceError::dependency)?;
            resolved.push(ResolvedRole { role, permissions });
        }

        Ok(resolved)
    }
}

/// Computes the effective permission set gating mutating operations.
#[derive(Clone)]
pub struct AuthorizationResolver {
    tenants: Arc<dyn TenantStore>,
    catalog: Arc<dyn PermissionCatalog>,
    roles: RoleResolver,
}

impl AuthorizationResolver {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        catalog: Arc<dyn PermissionCatalog>,
        roles: RoleResolver,
    ) -> Self {
        Self {
            tenants,
            catalog,
            roles,
        }
    }

    /// Resolve the effective "resource.action" set for a principal.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> Result<BTreeSet<String>, ServiceError> {
        let tenant = self
            .tenants
            .find_tenant(principal.tenant_id)
            .await
            .map_err(ServiceError::dependency)?
            .ok_or_else(|| {
                ServiceError::dependency(anyhow::anyhow!(
                    "Tenant {} missing for authenticated principal",
                    principal.tenant_id
                ))
            })?;

        if !tenant.rbac_enabled {
            return match principal.legacy_role {
                LegacyRole::Admin => {
                    let catalog = self
                        .catalog
                        .all_permissions()
                        .await
                        .map_err(ServiceError::dependency)?;
                    Ok(catalog.iter().map(|p| p.key()).collect())
                }
                // Editors carry no fine-grained permissions; coarse
                // route-level gating applies elsewhere.
                LegacyRole::Editor => Ok(BTreeSet::new()),
            };
        }

        let resolved = self
            .roles
            .roles_for_user(principal.user_id, principal.tenant_id)
            .await?;

        let mut union = BTreeSet::new();
        for role in resolved {
            for permission in role.permissions {
                union.insert(permission.key());
            }
        }
        Ok(union)
    }

    /// Derived fresh on every call; no cross-request caching.
    pub async fn has_permission(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> Result<bool, ServiceError> {
        let permissions = self.effective_permissions(principal).await?;
        Ok(permissions.contains(&format!("{}.{}", resource, action)))
    }
}
