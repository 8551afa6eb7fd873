pub mod model;
pub mod producer;

pub use model::{AuditEvent, AuditError, AuditResult, AUDIT_EVENT_VERSION, AuditSeverity};
pub use producer::{AuditProducer, AuditSink, BufferedAuditSink, NoopAuditSink, TracingAuditSink};
