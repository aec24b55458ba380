pub mod audit;
pub mod authz;
pub mod error;
pub mod jwt;
pub mod rate_limit;
pub mod session;

pub use audit::{AuditEvent, AuditEventType, AuditRecorder};
pub use authz::{AuthorizationResolver, RoleResolver};
pub use error::{AuthFailureReason, ServiceError};
pub use jwt::{AccessTokenClaims, CodecError, RefreshTokenClaims, TokenCodec};
pub use rate_limit::{RateLimitGuard, RateLimits};
pub use session::{ClientInfo, SessionManager, SessionTokens};
