use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};
use thiserror::Error;
use uuid::Uuid;

pub const AUDIT_EVENT_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity { #[default] Info, Warning, Security }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_version: i32,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub occurred_at: DateTime<Utc>,
    pub source_service: String,
    pub severity: AuditSeverity,
    /// Human-readable one-line summary for log viewers.
    pub summary: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type AuditResult<T> = Result<T, AuditError>;
