//! Audit trail for authentication and authorization events.
//!
//! Every session operation emits an event, success or failure. Writes
//! are fire-and-forget: a failed audit write is logged but never fails
//! the request that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::AuditSink;

/// Audit event types emitted by the trust layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Login,
    SilentRefresh,
    Logout,
    PasswordChange,
    /// Refresh token presented after it was already exchanged
    TokenReuse,
    AuthorizationDenied,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::Login => "login",
            AuditEventType::SilentRefresh => "silent_refresh",
            AuditEventType::Logout => "logout",
            AuditEventType::PasswordChange => "password_change",
            AuditEventType::TokenReuse => "token_reuse",
            AuditEventType::AuthorizationDenied => "authorization_denied",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: AuditEventType,
    pub user_id: Option<Uuid>,
    pub ip_address: String,
    pub user_agent: String,
    pub device_info: String,
    pub token_type: Option<String>,
    pub token_id: Option<Uuid>,
    pub success: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, ip_address: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            user_id: None,
            ip_address: ip_address.into(),
            user_agent: String::new(),
            device_info: String::new(),
            token_type: None,
            token_id: None,
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_client(mut self, user_agent: impl Into<String>, device_info: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self.device_info = device_info.into();
        self
    }

    pub fn with_token(mut self, token_type: impl Into<String>, token_id: Uuid) -> Self {
        self.token_type = Some(token_type.into());
        self.token_id = Some(token_id);
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Fire-and-forget recorder in front of an [`AuditSink`].
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record an event without blocking the caller.
    pub fn record(&self, event: AuditEvent) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.write(event.clone()).await {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type.as_str(),
                    "Failed to write audit event"
                );
            } else if !event.success {
                tracing::warn!(
                    event_type = event.event_type.as_str(),
                    user_id = ?event.user_id,
                    ip = %event.ip_address,
                    error = ?event.error,
                    "Security event logged"
                );
            }
        });
    }

    /// Record an event and wait for the write. Used where the audit
    /// entry is the only durable trace of the attempt.
    pub async fn record_sync(&self, event: AuditEvent) {
        if let Err(e) = self.sink.write(event.clone()).await {
            tracing::error!(
                error = %e,
                event_type = event.event_type.as_str(),
                "Failed to write audit event"
            );
        }
    }
}
