use crate::{AuditError, AuditEvent, AuditResult, AuditSeverity, AUDIT_EVENT_VERSION};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Destination for audit events. Implementations must not block for long; callers
/// emit from request paths.
pub trait AuditSink: Send + Sync {
    fn publish(&self, event: &AuditEvent) -> AuditResult<()>;
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn publish(&self, _event: &AuditEvent) -> AuditResult<()> { Ok(()) }
}

/// Writes events as JSON on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        let serialized = serde_json::to_string(event).map_err(|e| AuditError::Serialization(e.to_string()))?;
        info!(
            target: "audit",
            event_id = %event.event_id,
            action = %event.action,
            entity_id = %event.entity_id,
            severity = ?event.severity,
            event = %serialized,
            "{}",
            event.summary
        );
        Ok(())
    }
}

/// Keeps events in memory; used by tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct BufferedAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl BufferedAuditSink {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl AuditSink for BufferedAuditSink {
    fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut guard = self.events.lock().map_err(|_| AuditError::Sink("buffer lock poisoned".into()))?;
        guard.push(event.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct AuditProducer {
    sink: Arc<dyn AuditSink>,
    source_service: String,
}

impl AuditProducer {
    pub fn new(sink: impl AuditSink + 'static, source_service: impl Into<String>) -> Self {
        Self { sink: Arc::new(sink), source_service: source_service.into() }
    }

    pub fn from_arc(sink: Arc<dyn AuditSink>, source_service: impl Into<String>) -> Self {
        Self { sink, source_service: source_service.into() }
    }

    pub fn noop(source_service: &str) -> Self { Self::new(NoopAuditSink, source_service) }

    pub fn source_service(&self) -> &str { &self.source_service }

    pub fn emit(
        &self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        action: impl Into<String>,
        severity: AuditSeverity,
        summary: impl Into<String>,
        payload: serde_json::Value,
    ) -> AuditResult<AuditEvent> {
        let event = AuditEvent {
            event_id: Uuid::new_v4(),
            event_version: AUDIT_EVENT_VERSION,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action: action.into(),
            occurred_at: Utc::now(),
            source_service: self.source_service.clone(),
            severity,
            summary: summary.into(),
            payload,
        };
        self.sink.publish(&event)?;
        Ok(event)
    }
}

impl std::fmt::Debug for AuditProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditProducer").field("source_service", &self.source_service).finish()
    }
}
