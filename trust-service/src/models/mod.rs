//! Data models for the trust layer.

pub mod refresh_token;
pub mod role;
pub mod tenant;
pub mod user;

pub use refresh_token::RefreshTokenRecord;
pub use role::{Permission, ResolvedRole, Role, RolePermission, UserRole};
pub use tenant::Tenant;
pub use user::{LegacyRole, Principal, User, UserStatus};
