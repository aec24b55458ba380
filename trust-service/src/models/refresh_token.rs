//! Refresh token record - one row per issued refresh token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted refresh token record.
///
/// Invariant: a record with `last_used_at` or `revoked_at` set must
/// never be exchanged again. Expiry is detected lazily on verification;
/// there is no background reaper.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Unique identifier for the refresh token (jti claim)
    pub token_id: Uuid,

    /// User this token belongs to
    pub user_id: Uuid,

    /// SHA-256 hash of the refresh token string
    pub token_hash: String,

    /// Client device description captured at issuance
    pub device_info: String,

    /// Caller address captured at issuance
    pub ip_address: String,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Set exactly once, by the rotation that consumed this token
    pub last_used_at: Option<DateTime<Utc>>,

    /// Set by logout or an admin revocation
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Create a new record with a specific ID (the ID doubles as the
    /// refresh token's jti claim).
    pub fn new(
        token_id: Uuid,
        user_id: Uuid,
        token: &str,
        device_info: String,
        ip_address: String,
        expires_in_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            token_id,
            user_id,
            token_hash: Self::hash_token(token),
            device_info,
            ip_address,
            issued_at: now,
            expires_at: now + Duration::days(expires_in_days),
            last_used_at: None,
            revoked_at: None,
        }
    }

    /// Hash a token string using SHA-256.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_used(&self) -> bool {
        self.last_used_at.is_some()
    }

    /// Exchangeable: not expired, not revoked, not already rotated.
    pub fn is_exchangeable(&self) -> bool {
        !self.is_expired() && !self.is_revoked() && !self.is_used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "token_abc",
            "cli".to_string(),
            "127.0.0.1".to_string(),
            7,
        )
    }

    #[test]
    fn test_new_record_is_exchangeable() {
        let rec = record();
        assert_ne!(rec.token_hash, "token_abc");
        assert!(rec.is_exchangeable());
    }

    #[test]
    fn test_expired_record_not_exchangeable() {
        let mut rec = record();
        rec.expires_at = Utc::now() - Duration::seconds(1);
        assert!(rec.is_expired());
        assert!(!rec.is_exchangeable());
    }

    #[test]
    fn test_used_record_not_exchangeable() {
        let mut rec = record();
        rec.last_used_at = Some(Utc::now());
        assert!(!rec.is_exchangeable());
    }

    #[test]
    fn test_revoked_record_not_exchangeable() {
        let mut rec = record();
        rec.revoked_at = Some(Utc::now());
        assert!(!rec.is_exchangeable());
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            RefreshTokenRecord::hash_token("abc"),
            RefreshTokenRecord::hash_token("abc")
        );
        assert_ne!(
            RefreshTokenRecord::hash_token("abc"),
            RefreshTokenRecord::hash_token("abd")
        );
    }
}
