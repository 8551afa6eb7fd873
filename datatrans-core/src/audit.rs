use common_audit::{AuditProducer, AuditSeverity};
use serde_json::json;
use tracing::warn;

use crate::error::RejectionReason;
use crate::profile::SecurityLevel;
use crate::verifier::TerminalStatus;

const ENTITY_TYPE: &str = "payment";

pub(crate) struct CallbackAudit<'a> {
    pub intent_id: &'a str,
    pub endpoint: &'a str,
    pub security_level: Option<SecurityLevel>,
    pub transaction_id: Option<&'a str>,
}

const OUTCOME_UNKNOWN_PAYMENT: &str = "payment_not_found";

impl CallbackAudit<'_> {
    /// Emits one event for the callback. Sink failures are logged and swallowed.
    pub(crate) fn emit(
        &self,
        producer: &AuditProducer,
        outcome: Result<TerminalStatus, &RejectionReason>,
    ) {
        let (severity, outcome_code, summary, reason) = match outcome {
            Ok(status) => (
                AuditSeverity::Info,
                "accepted",
                format!(
                    "datatrans {} callback accepted for payment {}: {}",
                    self.endpoint,
                    self.intent_id,
                    status.intent_status()
                ),
                None,
            ),
            Err(reason) => (
                if reason.is_security_relevant() {
                    AuditSeverity::Security
                } else {
                    AuditSeverity::Warning
                },
                reason.code(),
                format!(
                    "datatrans {} callback rejected for payment {}: {}",
                    self.endpoint, self.intent_id, reason
                ),
                Some(reason.to_string()),
            ),
        };
        self.publish(producer, severity, outcome_code, summary, outcome.ok(), reason);
    }

    /// A callback naming a payment that does not exist. Nothing was verified
    /// and nothing changes, but the attempt is kept on record.
    pub(crate) fn emit_unknown_payment(&self, producer: &AuditProducer) {
        let summary = format!(
            "datatrans {} callback for unknown payment {}",
            self.endpoint, self.intent_id
        );
        self.publish(
            producer,
            AuditSeverity::Security,
            OUTCOME_UNKNOWN_PAYMENT,
            summary,
            None,
            None,
        );
    }

    fn publish(
        &self,
        producer: &AuditProducer,
        severity: AuditSeverity,
        outcome_code: &str,
        summary: String,
        terminal: Option<TerminalStatus>,
        reason: Option<String>,
    ) {
        let payload = json!({
            "intent_id": self.intent_id,
            "endpoint": self.endpoint,
            "outcome": outcome_code,
            "terminal_status": terminal.map(|s| s.intent_status().as_str()),
            "security_level": self.security_level.map(|l| l.as_u8()),
            "transaction_id": self.transaction_id,
            "reason": reason,
        });
        if let Err(err) = producer.emit(
            ENTITY_TYPE,
            self.intent_id,
            format!("datatrans.callback.{}", self.endpoint),
            severity,
            summary,
            payload,
        ) {
            warn!(error = %err, intent_id = %self.intent_id, "failed to emit callback audit event");
        }
    }
}
