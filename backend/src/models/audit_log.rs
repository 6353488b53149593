use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventType {
    Backup,
    ReportCreated,
    ReportUpdated,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::Backup => "backup",
            AuditEventType::ReportCreated => "report_created",
            AuditEventType::ReportUpdated => "report_updated",
        }
    }
}

/// An entry waiting to be appended. The store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub event_type: AuditEventType,
    pub message: String,
    pub meta: Value,
    pub entity_reference: Option<String>,
    /// Entries sharing a key are stored once.
    pub idempotency_key: Option<String>,
}

impl NewAuditEntry {
    pub fn new(event_type: AuditEventType, message: impl Into<String>, meta: Value) -> Self {
        Self {
            event_type,
            message: message.into(),
            meta,
            entity_reference: None,
            idempotency_key: None,
        }
    }

    pub fn with_entity_reference(mut self, reference: impl Into<String>) -> Self {
        self.entity_reference = Some(reference.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// A stored, immutable entry of `transaction_logs`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: String,
    pub meta: Json<Value>,
    pub entity_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
