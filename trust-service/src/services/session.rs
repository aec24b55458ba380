//! Session manager: login, logout, silent refresh with rotation and
//! reuse detection, password-change blast radius.
//!
//! All durable state lives in the stores; the manager itself holds no
//! per-session state, so any instance can serve any request. Every
//! failure collapses externally to a generic Unauthorized; the real
//! cause is audited. Rate-limit rejections stay externally distinct.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Principal, RefreshTokenRecord, User};
use crate::services::audit::{AuditEvent, AuditEventType, AuditRecorder};
use crate::services::error::{AuthFailureReason, ServiceError};
use crate::services::jwt::{CodecError, TokenCodec};
use crate::services::rate_limit::RateLimits;
use crate::store::{CredentialStore, RefreshTokenStore, RotationOutcome};
use crate::utils::{verify_password, Password, PasswordHashString};

/// Caller context captured per request.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
    pub device_info: String,
}

/// Token pair returned to the HTTP boundary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    users: Arc<dyn CredentialStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    audit: AuditRecorder,
    limits: RateLimits,
}

impl SessionManager {
    pub fn new(
        codec: TokenCodec,
        users: Arc<dyn CredentialStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        audit: AuditRecorder,
        limits: RateLimits,
    ) -> Self {
        Self {
            codec,
            users,
            tokens,
            audit,
            limits,
        }
    }

    /// Authenticate credentials and open a session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<SessionTokens, ServiceError> {
        self.limits.login.allow(&client.ip_address)?;

        let user = self
            .users
            .find_user_by_email(email)
            .await
            .map_err(ServiceError::dependency)?;

        let Some(user) = user else {
            return Err(self
                .login_failure(AuthFailureReason::BadCredentials, None, client)
                .await);
        };

        if verify_password(
            &Password::new(password.to_string()),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .is_err()
        {
            return Err(self
                .login_failure(AuthFailureReason::BadCredentials, Some(user.user_id), client)
                .await);
        }

        let status = user
            .user_status()
            .map_err(|e| ServiceError::dependency(anyhow::anyhow!(e)))?;

        match status {
            crate::models::UserStatus::Active => {}
            crate::models::UserStatus::Suspended => {
                // Indistinguishable from bad credentials externally.
                return Err(self
                    .login_failure(AuthFailureReason::BadCredentials, Some(user.user_id), client)
                    .await);
            }
            crate::models::UserStatus::PendingVerification => {
                return Err(self
                    .login_failure(
                        AuthFailureReason::PendingVerification,
                        Some(user.user_id),
                        client,
                    )
                    .await);
            }
        }

        self.issue_session_for(&user, client).await
    }

    /// Open a session for an already-authenticated user (login,
    /// invite-accept, signup). Persists the refresh record before any
    /// token leaves this function.
    pub async fn issue_session_for(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<SessionTokens, ServiceError> {
        let (tokens, token_id) = self.mint_session(user, client).await?;

        self.audit
            .record_sync(
                AuditEvent::new(AuditEventType::Login, &client.ip_address)
                    .with_user(user.user_id)
                    .with_client(&client.user_agent, &client.device_info)
                    .with_token("refresh", token_id),
            )
            .await;

        tracing::info!(user_id = %user.user_id, "Session opened");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair, rotating the record.
    pub async fn silent_refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<SessionTokens, ServiceError> {
        self.limits.refresh.allow(&client.ip_address)?;

        let claims = match self.codec.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                let reason = match e {
                    CodecError::Expired => AuthFailureReason::ExpiredOrRevoked,
                    CodecError::Malformed => AuthFailureReason::InvalidToken,
                };
                return Err(self.refresh_failure(reason, None, None, client).await);
            }
        };

        let record = self
            .tokens
            .get_by_id(claims.jti)
            .await
            .map_err(ServiceError::dependency)?;

        let Some(record) = record else {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::InvalidToken,
                    Some(claims.sub),
                    Some(claims.jti),
                    client,
                )
                .await);
        };

        if record.token_hash != RefreshTokenRecord::hash_token(refresh_token) {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::InvalidToken,
                    Some(record.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        }

        if record.is_revoked() || record.is_expired() {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::ExpiredOrRevoked,
                    Some(record.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        }

        if record.is_used() {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::Reused,
                    Some(record.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        }

        let user = self
            .users
            .find_user_by_id(record.user_id)
            .await
            .map_err(ServiceError::dependency)?;

        let Some(user) = user else {
            // Account removed since issuance.
            return Err(self
                .refresh_failure(
                    AuthFailureReason::InvalidToken,
                    Some(record.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        };

        if !user.is_active() {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::BadCredentials,
                    Some(user.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        }

        let principal = Principal::from_user(&user)
            .map_err(|e| ServiceError::dependency(anyhow::anyhow!(e)))?;

        let new_token_id = Uuid::new_v4();
        let new_refresh = self
            .codec
            .sign_refresh(user.user_id, new_token_id)
            .map_err(ServiceError::dependency)?;
        let new_record = RefreshTokenRecord::new(
            new_token_id,
            user.user_id,
            &new_refresh,
            client.device_info.clone(),
            client.ip_address.clone(),
            self.codec.refresh_token_expiry_days(),
        );

        // One transaction, one winner: losers see Reused and write
        // nothing.
        let outcome = self
            .tokens
            .rotate(record.token_id, &new_record)
            .await
            .map_err(ServiceError::dependency)?;

        if outcome == RotationOutcome::Reused {
            return Err(self
                .refresh_failure(
                    AuthFailureReason::Reused,
                    Some(user.user_id),
                    Some(record.token_id),
                    client,
                )
                .await);
        }

        let access_token = self
            .codec
            .sign_access(&principal)
            .map_err(ServiceError::dependency)?;

        self.audit
            .record_sync(
                AuditEvent::new(AuditEventType::SilentRefresh, &client.ip_address)
                    .with_user(user.user_id)
                    .with_client(&client.user_agent, &client.device_info)
                    .with_token("refresh", new_token_id),
            )
            .await;

        tracing::debug!(user_id = %user.user_id, "Refresh token rotated");

        Ok(SessionTokens {
            access_token,
            refresh_token: new_refresh,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_token_expiry_seconds(),
        })
    }

    /// End a session. Revokes the presented refresh record best-effort;
    /// cookie clearing happens at the HTTP boundary. A still-valid
    /// access token rides out its natural expiry.
    pub async fn logout(
        &self,
        refresh_token: Option<&str>,
        client: &ClientInfo,
    ) -> Result<(), ServiceError> {
        let mut event =
            AuditEvent::new(AuditEventType::Logout, &client.ip_address)
                .with_client(&client.user_agent, &client.device_info);

        if let Some(token) = refresh_token {
            if let Ok(claims) = self.codec.verify_refresh(token) {
                event = event.with_user(claims.sub).with_token("refresh", claims.jti);
                if let Err(e) = self.tokens.revoke(claims.jti).await {
                    tracing::warn!(error = %e, token_id = %claims.jti, "Logout revocation failed");
                }
            }
        }

        self.audit.record_sync(event).await;
        Ok(())
    }

    /// Change a password and delete every refresh record the user owns.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        new_password: &Password,
        client: &ClientInfo,
    ) -> Result<(), ServiceError> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await
            .map_err(ServiceError::dependency)?
            .ok_or_else(|| ServiceError::Validation(format!("Unknown user {}", user_id)))?;

        let hash = crate::utils::hash_password(new_password).map_err(ServiceError::dependency)?;

        self.users
            .update_password_hash(user.user_id, hash.as_str())
            .await
            .map_err(ServiceError::dependency)?;

        let deleted = self
            .tokens
            .delete_all_for_user(user.user_id)
            .await
            .map_err(ServiceError::dependency)?;

        self.audit
            .record_sync(
                AuditEvent::new(AuditEventType::PasswordChange, &client.ip_address)
                    .with_user(user.user_id)
                    .with_client(&client.user_agent, &client.device_info),
            )
            .await;

        tracing::info!(
            user_id = %user.user_id,
            revoked_sessions = deleted,
            "Password changed, refresh tokens deleted"
        );
        Ok(())
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    async fn mint_session(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<(SessionTokens, Uuid), ServiceError> {
        let principal = Principal::from_user(user)
            .map_err(|e| ServiceError::dependency(anyhow::anyhow!(e)))?;

        let token_id = Uuid::new_v4();
        let refresh_token = self
            .codec
            .sign_refresh(user.user_id, token_id)
            .map_err(ServiceError::dependency)?;

        let record = RefreshTokenRecord::new(
            token_id,
            user.user_id,
            &refresh_token,
            client.device_info.clone(),
            client.ip_address.clone(),
            self.codec.refresh_token_expiry_days(),
        );

        self.tokens
            .put(&record)
            .await
            .map_err(ServiceError::dependency)?;

        let access_token = self
            .codec
            .sign_access(&principal)
            .map_err(ServiceError::dependency)?;

        Ok((
            SessionTokens {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.codec.access_token_expiry_seconds(),
            },
            token_id,
        ))
    }

    async fn login_failure(
        &self,
        reason: AuthFailureReason,
        user_id: Option<Uuid>,
        client: &ClientInfo,
    ) -> ServiceError {
        let mut event = AuditEvent::new(AuditEventType::Login, &client.ip_address)
            .with_client(&client.user_agent, &client.device_info)
            .failed(reason.as_str());
        if let Some(user_id) = user_id {
            event = event.with_user(user_id);
        }
        self.audit.record_sync(event).await;
        ServiceError::Authentication(reason)
    }

    async fn refresh_failure(
        &self,
        reason: AuthFailureReason,
        user_id: Option<Uuid>,
        token_id: Option<Uuid>,
        client: &ClientInfo,
    ) -> ServiceError {
        let event_type = if reason == AuthFailureReason::Reused {
            AuditEventType::TokenReuse
        } else {
            AuditEventType::SilentRefresh
        };

        let mut event = AuditEvent::new(event_type, &client.ip_address)
            .with_client(&client.user_agent, &client.device_info)
            .failed(reason.as_str());
        if let Some(user_id) = user_id {
            event = event.with_user(user_id);
        }
        if let Some(token_id) = token_id {
            event = event.with_token("refresh", token_id);
        }
        self.audit.record_sync(event).await;
        ServiceError::Authentication(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JwtConfig, RateLimitConfig};
    use crate::models::{LegacyRole, UserStatus};
    use crate::store::InMemoryStore;
    use crate::utils::hash_password;
    use chrono::{Duration, Utc};

    const PASSWORD: &str = "correct horse battery staple";

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtConfig {
            access_token_secret: "0123456789abcdef0123456789abcdef".to_string(),
            refresh_token_secret: "fedcba9876543210fedcba9876543210".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        })
    }

    fn limits() -> RateLimits {
        RateLimits::from_config(&RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            refresh_attempts: 1000,
            refresh_window_seconds: 60,
        })
    }

    fn manager(store: &Arc<InMemoryStore>) -> SessionManager {
        SessionManager::new(
            codec(),
            store.clone(),
            store.clone(),
            AuditRecorder::new(store.clone()),
            limits(),
        )
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip_address: "203.0.113.9".to_string(),
            user_agent: "test-agent".to_string(),
            device_info: "test-device".to_string(),
        }
    }

    fn active_user(store: &InMemoryStore) -> User {
        let mut user = User::new(
            Uuid::new_v4(),
            "alice@example.com".to_string(),
            hash_password(&Password::new(PASSWORD.to_string()))
                .unwrap()
                .into_string(),
            LegacyRole::Editor,
        );
        user.status = UserStatus::Active.as_str().to_string();
        store.insert_user(user.clone());
        user
    }

    #[tokio::test]
    async fn test_login_success_issues_pair_and_persists_record() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let tokens = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();

        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 15 * 60);
        assert_eq!(store.token_count_for_user(user.user_id), 1);

        // Both tokens verify against the codec.
        let access = mgr.codec().verify_access(&tokens.access_token).unwrap();
        assert_eq!(access.sub, user.user_id);
        let refresh = mgr.codec().verify_refresh(&tokens.refresh_token).unwrap();
        assert_eq!(refresh.sub, user.user_id);

        let events = store.audit_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].success);
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_generic_failure() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(&store);

        let err = mgr
            .login("nobody@example.com", PASSWORD, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::BadCredentials)
        ));
        assert!(!store.audit_events()[0].success);
    }

    #[tokio::test]
    async fn test_login_wrong_password_issues_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let err = mgr
            .login("alice@example.com", "not the password", &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::BadCredentials)
        ));
        assert_eq!(store.token_count_for_user(user.user_id), 0);
    }

    #[tokio::test]
    async fn test_login_suspended_collapses_to_bad_credentials() {
        let store = Arc::new(InMemoryStore::new());
        let mut user = active_user(&store);
        user.status = UserStatus::Suspended.as_str().to_string();
        store.insert_user(user.clone());
        let mgr = manager(&store);

        let err = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_pending_verification_audits_and_issues_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let mut user = active_user(&store);
        user.status = UserStatus::PendingVerification.as_str().to_string();
        store.insert_user(user.clone());
        let mgr = manager(&store);

        let err = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::PendingVerification)
        ));

        // No token issued; the only durable trace is the audit write.
        assert_eq!(store.token_count_for_user(user.user_id), 0);
        let events = store.audit_events();
        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
        assert_eq!(events[0].error.as_deref(), Some("pending_verification"));
    }

    #[tokio::test]
    async fn test_login_rate_limited_is_distinct_outcome() {
        let store = Arc::new(InMemoryStore::new());
        active_user(&store);
        let mgr = SessionManager::new(
            codec(),
            store.clone(),
            store.clone(),
            AuditRecorder::new(store.clone()),
            RateLimits::from_config(&RateLimitConfig {
                login_attempts: 1,
                login_window_seconds: 3600,
                refresh_attempts: 10,
                refresh_window_seconds: 60,
            }),
        );

        assert!(mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .is_ok());
        let err = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { flow: "login" }));
    }

    #[tokio::test]
    async fn test_silent_refresh_rotates_and_replay_fails() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let first = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();

        let second = mgr
            .silent_refresh(&first.refresh_token, &client())
            .await
            .unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        // Old record marked used, successor inserted.
        assert_eq!(store.token_count_for_user(user.user_id), 2);

        // Replay of the consumed token fails from any caller address.
        let other_client = ClientInfo {
            ip_address: "198.51.100.77".to_string(),
            ..client()
        };
        let err = mgr
            .silent_refresh(&first.refresh_token, &other_client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::Reused)
        ));

        // The reuse attempt wrote nothing and was audited as such.
        assert_eq!(store.token_count_for_user(user.user_id), 2);
        let events = store.audit_events();
        let reuse = events.last().unwrap();
        assert_eq!(reuse.event_type, AuditEventType::TokenReuse);
        assert!(!reuse.success);

        // The successor still works.
        assert!(mgr
            .silent_refresh(&second.refresh_token, &client())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_silent_refresh_garbage_token_fails_closed() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(&store);

        let err = mgr
            .silent_refresh("not-a-jwt", &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_silent_refresh_unknown_record_fails() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        // Well-signed token with no persisted record behind it.
        let orphan = mgr
            .codec()
            .sign_refresh(user.user_id, Uuid::new_v4())
            .unwrap();
        let err = mgr.silent_refresh(&orphan, &client()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_silent_refresh_revoked_record_fails_and_audits() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let tokens = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();
        let claims = mgr.codec().verify_refresh(&tokens.refresh_token).unwrap();
        store.revoke(claims.jti).await.unwrap();

        let err = mgr
            .silent_refresh(&tokens.refresh_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::ExpiredOrRevoked)
        ));

        // No new tokens issued.
        assert_eq!(store.token_count_for_user(user.user_id), 1);
        let events = store.audit_events();
        assert!(!events.last().unwrap().success);
    }

    #[tokio::test]
    async fn test_silent_refresh_expired_record_fails() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let tokens = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();
        let claims = mgr.codec().verify_refresh(&tokens.refresh_token).unwrap();

        // Force lazy expiry on the persisted record.
        let mut record = store.get_by_id(claims.jti).await.unwrap().unwrap();
        record.expires_at = Utc::now() - Duration::seconds(1);
        store.put(&record).await.unwrap();

        let err = mgr
            .silent_refresh(&tokens.refresh_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::ExpiredOrRevoked)
        ));
        assert_eq!(store.token_count_for_user(user.user_id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_refresh_single_winner() {
        let store = Arc::new(InMemoryStore::new());
        active_user(&store);
        let mgr = manager(&store);

        let tokens = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let mgr = mgr.clone();
            let refresh_token = tokens.refresh_token.clone();
            handles.push(tokio::spawn(async move {
                mgr.silent_refresh(&refresh_token, &client()).await
            }));
        }

        let mut successes = 0;
        let mut reuse_failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ServiceError::Authentication(AuthFailureReason::Reused)) => {
                    reuse_failures += 1
                }
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(reuse_failures, 15);
    }

    #[tokio::test]
    async fn test_change_password_kills_all_refresh_tokens() {
        let store = Arc::new(InMemoryStore::new());
        let user = active_user(&store);
        let mgr = manager(&store);

        let session_a = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();
        let session_b = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();
        assert_eq!(store.token_count_for_user(user.user_id), 2);

        mgr.change_password(
            user.user_id,
            &Password::new("a new password entirely".to_string()),
            &client(),
        )
        .await
        .unwrap();

        assert_eq!(store.token_count_for_user(user.user_id), 0);
        for session in [&session_a, &session_b] {
            let err = mgr
                .silent_refresh(&session.refresh_token, &client())
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Authentication(_)));
        }

        // Residual-trust window: the access token still verifies until
        // its own expiry.
        assert!(mgr.codec().verify_access(&session_a.access_token).is_ok());

        // Old password no longer logs in, new one does.
        assert!(mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .is_err());
        assert!(mgr
            .login("alice@example.com", "a new password entirely", &client())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes_presented_record() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(&store);
        active_user(&store);

        let tokens = mgr
            .login("alice@example.com", PASSWORD, &client())
            .await
            .unwrap();

        mgr.logout(Some(&tokens.refresh_token), &client())
            .await
            .unwrap();

        let err = mgr
            .silent_refresh(&tokens.refresh_token, &client())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authentication(AuthFailureReason::ExpiredOrRevoked)
        ));
    }

    #[tokio::test]
    async fn test_logout_without_token_still_audits() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(&store);

        mgr.logout(None, &client()).await.unwrap();
        let events = store.audit_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::Logout);
    }
}
