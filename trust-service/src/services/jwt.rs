use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{LegacyRole, Principal, UserStatus};

const KIND_ACCESS: &str = "access";
const KIND_REFRESH: &str = "refresh";

/// Why verification failed. Internal only: callers collapse both
/// variants to the same external outcome and log the distinction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("token expired")]
    Expired,
    #[error("token malformed or signature mismatch")]
    Malformed,
}

/// Token codec: signs and verifies the compact bearer tokens carrying
/// identity claims. Pure function of token + secret + clock; verifying
/// never touches the store.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Tenant the principal is bound to
    pub tenant: Uuid,
    /// Legacy role carried for coarse route gating
    pub role: LegacyRole,
    /// Account status at issuance
    pub status: UserStatus,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID, fresh random per issuance
    pub jti: Uuid,
    /// Token kind discriminator
    pub kind: String,
}

/// Claims for refresh tokens (long-lived).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Token ID (matches the persisted RefreshTokenRecord)
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub kind: String,
}

impl AccessTokenClaims {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub,
            tenant_id: self.tenant,
            legacy_role: self.role,
            status: self.status,
        }
    }
}

impl TokenCodec {
    /// Create a new codec from the configured HS256 secrets.
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access_encoding_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(
                config.refresh_token_secret.as_bytes(),
            ),
            refresh_decoding_key: DecodingKey::from_secret(
                config.refresh_token_secret.as_bytes(),
            ),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Sign an access token for an authenticated principal.
    pub fn sign_access(&self, principal: &Principal) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: principal.user_id,
            tenant: principal.tenant_id,
            role: principal.legacy_role,
            status: principal.status,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            kind: KIND_ACCESS.to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.access_encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Sign a refresh token whose jti matches a persisted record.
    pub fn sign_refresh(&self, user_id: Uuid, token_id: Uuid) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: user_id,
            jti: token_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            kind: KIND_REFRESH.to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.refresh_encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))
    }

    /// Verify an access token. Fails closed on signature mismatch,
    /// malformed structure, or past expiry.
    pub fn verify_access(&self, token: &str) -> Result<AccessTokenClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<AccessTokenClaims>(token, &self.access_decoding_key, &validation)
            .map_err(map_decode_error)?;

        if data.claims.kind != KIND_ACCESS {
            return Err(CodecError::Malformed);
        }

        Ok(data.claims)
    }

    /// Verify a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshTokenClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<RefreshTokenClaims>(token, &self.refresh_decoding_key, &validation)
            .map_err(map_decode_error)?;

        if data.claims.kind != KIND_REFRESH {
            return Err(CodecError::Malformed);
        }

        Ok(data.claims)
    }

    /// Access token expiry in seconds (cookie Max-Age).
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    pub fn refresh_token_expiry_days(&self) -> i64 {
        self.refresh_token_expiry_days
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> CodecError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => CodecError::Expired,
        _ => CodecError::Malformed,
    }
}
