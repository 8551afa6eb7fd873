use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use common_http_errors::{ApiError, ApiResult};
use datatrans_core::{
    CallbackFields, CurrencyCode, GatewayError, IntentStatus, RejectionReason, ReturnEndpoint,
    SignError, SignedRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::store::{PaymentRecord, RecordHandle, StoreError};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub amount_minor: u64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub redirect_url: String,
    pub start_url: String,
    pub fields: SignedRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub intent_id: String,
    pub status: IntentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_error: Option<GatewayError>,
}

impl CallbackResponse {
    fn from_record(record: &PaymentRecord) -> Self {
        Self {
            intent_id: record.intent.id.clone(),
            status: record.intent.status,
            transaction_id: record.transaction_id.clone(),
            gateway_error: record.gateway_error.clone(),
        }
    }
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentRecord>)> {
    let currency = CurrencyCode::parse(&req.currency).map_err(|err| ApiError::BadRequest {
        code: "invalid_currency",
        trace_id: None,
        message: Some(err.to_string()),
    })?;
    let record = state
        .store
        .create(req.amount_minor, currency)
        .map_err(internal_error)?;
    info!(intent_id = %record.intent.id, amount_minor = req.amount_minor, "payment created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PaymentRecord>> {
    let record = state.store.snapshot(&id).await.map_err(store_error)?;
    Ok(Json(record))
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InitiateResponse>> {
    let handle = state.store.handle(&id).map_err(store_error)?;
    let record = handle.lock().await;
    let urls = state.return_urls(&id).map_err(internal_error)?;
    let request = state
        .signer
        .build(&state.profile, &record.intent, &urls)
        .map_err(|err| match err {
            SignError::IntentNotPending { .. } => ApiError::Conflict {
                code: "payment_not_pending",
                trace_id: None,
                message: Some(err.to_string()),
            },
            other => internal_error(other),
        })?;
    state.metrics.record_signed_request(request.security_level);
    let start_url = state.profile.start_url();
    Ok(Json(InitiateResponse {
        redirect_url: request.redirect_url(start_url).to_string(),
        start_url: start_url.to_string(),
        fields: request,
    }))
}

pub async fn success_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(fields): Query<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_success(state, id, fields).await
}

pub async fn success_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CallbackFields>,
    Form(form): Form<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_success(state, id, merge(query, form)).await
}

pub async fn error_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(fields): Query<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_return(state, id, ReturnEndpoint::Error, fields).await
}

pub async fn error_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CallbackFields>,
    Form(form): Form<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_return(state, id, ReturnEndpoint::Error, merge(query, form)).await
}

pub async fn cancel_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(fields): Query<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_return(state, id, ReturnEndpoint::Cancel, fields).await
}

pub async fn cancel_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CallbackFields>,
    Form(form): Form<CallbackFields>,
) -> ApiResult<Json<CallbackResponse>> {
    handle_return(state, id, ReturnEndpoint::Cancel, merge(query, form)).await
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => internal_error(err).into_response(),
    }
}

// Body fields win over query fields with the same name.
fn merge(mut query: CallbackFields, form: CallbackFields) -> CallbackFields {
    query.extend(form);
    query
}

async fn handle_success(
    state: AppState,
    id: String,
    fields: CallbackFields,
) -> ApiResult<Json<CallbackResponse>> {
    let handle = callback_handle(&state, &id, "success", &fields)?;
    let mut record = handle.lock().await;

    match state.verifier.verify(&state.profile, &record.intent, &fields) {
        Ok(outcome) => {
            record
                .transition(
                    IntentStatus::Pending,
                    outcome.terminal_status.intent_status(),
                    None,
                )
                .map_err(store_error)?;
            record.transaction_id = outcome.transaction_id;
            record.customer = outcome.customer;
            state.metrics.record_callback("success", "accepted");
            info!(intent_id = %id, "payment completed");
            Ok(Json(CallbackResponse::from_record(&record)))
        }
        Err(reason) => {
            state.metrics.record_callback("success", reason.code());
            fail_pending(&mut record, &reason);
            Err(rejection_error(&reason))
        }
    }
}

async fn handle_return(
    state: AppState,
    id: String,
    endpoint: ReturnEndpoint,
    fields: CallbackFields,
) -> ApiResult<Json<CallbackResponse>> {
    let handle = callback_handle(&state, &id, endpoint.as_str(), &fields)?;
    let mut record = handle.lock().await;

    let outcome = match state.verifier.verify_return(&record.intent, endpoint, &fields) {
        Ok(outcome) => outcome,
        Err(reason) => {
            state.metrics.record_callback(endpoint.as_str(), reason.code());
            return Err(rejection_error(&reason));
        }
    };
    let reason = outcome.gateway_error.as_ref().map(|e| e.code.clone());
    if let Err(err) = record.transition(
        IntentStatus::Pending,
        outcome.terminal_status.intent_status(),
        reason,
    ) {
        warn!(intent_id = %id, endpoint = endpoint.as_str(), error = %err, "return endpoint hit after payment settled");
        state.metrics.record_callback(endpoint.as_str(), "stale_callback");
        return Err(store_error(err));
    }
    record.gateway_error = outcome.gateway_error;
    state.metrics.record_callback(endpoint.as_str(), "accepted");
    Ok(Json(CallbackResponse::from_record(&record)))
}

/// Looks up the payment a callback names. Callbacks for ids we never issued
/// are audited before the 404.
fn callback_handle(
    state: &AppState,
    id: &str,
    endpoint: &str,
    fields: &CallbackFields,
) -> ApiResult<RecordHandle> {
    state.store.handle(id).map_err(|err| {
        if let StoreError::NotFound(_) = err {
            state.verifier.record_unknown_intent(id, endpoint, fields);
            state.metrics.record_callback(endpoint, "payment_not_found");
        }
        store_error(err)
    })
}

/// Rejections fail a still-pending payment. Stale callbacks belong to a state
/// the payment has already left and change nothing.
fn fail_pending(record: &mut PaymentRecord, reason: &RejectionReason) {
    if matches!(reason, RejectionReason::StaleOrForgedCallback) {
        return;
    }
    if record
        .transition(
            IntentStatus::Pending,
            IntentStatus::Failed,
            Some(reason.code().to_string()),
        )
        .is_err()
    {
        return;
    }
    if let RejectionReason::GatewayReportedError { code, category } = reason {
        record.gateway_error = Some(GatewayError {
            code: code.clone(),
            category: *category,
            message: category.message(),
        });
    }
}

pub(crate) fn rejection_error(reason: &RejectionReason) -> ApiError {
    let code = reason.code();
    match reason {
        RejectionReason::MalformedCallback(_) | RejectionReason::SecurityLevelMismatch { .. } => {
            ApiError::BadRequest {
                code,
                trace_id: None,
                message: Some(reason.to_string()),
            }
        }
        RejectionReason::StaleOrForgedCallback => ApiError::Conflict {
            code,
            trace_id: None,
            message: None,
        },
        RejectionReason::InvalidSignature => ApiError::Unauthorized {
            code,
            trace_id: None,
        },
        RejectionReason::GatewayReportedError { category, .. } => ApiError::PaymentDeclined {
            code,
            trace_id: None,
            message: Some(category.message().to_string()),
        },
        RejectionReason::CommunicationFailure { .. } => ApiError::BadGateway {
            code,
            trace_id: None,
            message: Some(reason.to_string()),
        },
    }
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(_) => ApiError::not_found("payment_not_found", None),
        StoreError::Conflict { .. } => ApiError::Conflict {
            code: "stale_callback",
            trace_id: None,
            message: Some(err.to_string()),
        },
    }
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    let trace_id = Uuid::new_v4();
    error!(%trace_id, error = %err, "internal error");
    ApiError::internal(err, Some(trace_id))
}
