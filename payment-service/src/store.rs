use chrono::{DateTime, Utc};
use datatrans_core::{
    CurrencyCode, CustomerDetails, GatewayError, IntentError, IntentStatus, PaymentIntent,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("payment {0} not found")]
    NotFound(String),
    #[error("payment {id} is {current}, expected {expected}")]
    Conflict {
        id: String,
        expected: IntentStatus,
        current: IntentStatus,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: IntentStatus,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(flatten)]
    pub intent: PaymentIntent,
    pub transaction_id: Option<String>,
    pub customer: CustomerDetails,
    pub gateway_error: Option<GatewayError>,
    /// Append-only.
    pub history: Vec<StatusChange>,
}

impl PaymentRecord {
    fn new(intent: PaymentIntent) -> Self {
        let history = vec![StatusChange {
            status: intent.status,
            at: Utc::now(),
            reason: None,
        }];
        Self {
            intent,
            transaction_id: None,
            customer: CustomerDetails::default(),
            gateway_error: None,
            history,
        }
    }

    /// Compare-and-set: moves to `next` only while the status is still `expected`.
    pub fn transition(
        &mut self,
        expected: IntentStatus,
        next: IntentStatus,
        reason: Option<String>,
    ) -> Result<(), StoreError> {
        if self.intent.status != expected {
            return Err(StoreError::Conflict {
                id: self.intent.id.clone(),
                expected,
                current: self.intent.status,
            });
        }
        self.intent.status = next;
        self.history.push(StatusChange {
            status: next,
            at: Utc::now(),
            reason,
        });
        Ok(())
    }
}

pub type RecordHandle = Arc<Mutex<PaymentRecord>>;

/// In-memory payments. Each record sits behind its own async lock, held by
/// callers across read, verify and transition.
#[derive(Debug, Clone, Default)]
pub struct IntentStore {
    records: Arc<RwLock<HashMap<String, RecordHandle>>>,
}

impl IntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, amount_minor: u64, currency: CurrencyCode) -> Result<PaymentRecord, IntentError> {
        let id = Uuid::new_v4().simple().to_string();
        let intent = PaymentIntent::pending(id, amount_minor, currency)?;
        Ok(self.insert(intent))
    }

    pub fn insert(&self, intent: PaymentIntent) -> PaymentRecord {
        let record = PaymentRecord::new(intent);
        let mut guard = self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(record.intent.id.clone(), Arc::new(Mutex::new(record.clone())));
        record
    }

    pub fn handle(&self, id: &str) -> Result<RecordHandle, StoreError> {
        let guard = self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn snapshot(&self, id: &str) -> Result<PaymentRecord, StoreError> {
        let handle = self.handle(id)?;
        let record = handle.lock().await;
        Ok(record.clone())
    }
}
