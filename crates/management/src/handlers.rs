//! Axum REST handlers for the CRM API.

use crate::models::*;
use crate::store::CrmStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use donor_core::types::{Donation, Donor};
use donor_core::CrmError;
use donor_segmentation::{DonorAttribute, FieldKind, Segment};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Shared CRM state.
#[derive(Clone)]
pub struct CrmState {
    pub store: Arc<CrmStore>,
    pub preview_limit: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: CrmError) -> ApiError {
    let (status, code) = match &err {
        CrmError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        CrmError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        CrmError::Config(_) | CrmError::Serialization(_) => {
            error!(error = %err, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

/// Unwrap a JSON body, reporting malformed or mistyped payloads as
/// validation failures.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            metrics::counter!("crm.requests.rejected").increment(1);
            Err(error_response(CrmError::Validation(rejection.body_text())))
        }
    }
}

// ─── Donors ────────────────────────────────────────────────────────────────

pub async fn list_donors(State(state): State<CrmState>) -> Json<Vec<Donor>> {
    Json(state.store.list_donors())
}

pub async fn get_donor(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Donor>, ApiError> {
    state
        .store
        .get_donor(id)
        .map(Json)
        .ok_or_else(|| error_response(CrmError::not_found("donor", id)))
}

pub async fn create_donor(
    State(state): State<CrmState>,
    payload: Result<Json<CreateDonorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Donor>), ApiError> {
    let req = json_body(payload)?;
    let donor = state.store.create_donor(req, "admin").map_err(error_response)?;
    metrics::counter!("crm.donors.created").increment(1);
    Ok((StatusCode::CREATED, Json(donor)))
}

pub async fn update_donor(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateDonorRequest>, JsonRejection>,
) -> Result<Json<Donor>, ApiError> {
    let req = json_body(payload)?;
    state
        .store
        .update_donor(id, req, "admin")
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_donor(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_donor(id, "admin") {
        metrics::counter!("crm.donors.deleted").increment(1);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(CrmError::not_found("donor", id)))
    }
}

pub async fn donor_segments(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Segment>>, ApiError> {
    state
        .store
        .donor_segments(id)
        .map(Json)
        .map_err(error_response)
}

// ─── Donations ─────────────────────────────────────────────────────────────

pub async fn list_donations(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Donation>>, ApiError> {
    state
        .store
        .list_donations(id)
        .map(Json)
        .map_err(error_response)
}

pub async fn record_donation(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<RecordDonationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Donation>), ApiError> {
    let req = json_body(payload)?;
    let donation = state
        .store
        .record_donation(id, req, "admin")
        .map_err(error_response)?;
    metrics::counter!("crm.donations.recorded").increment(1);
    Ok((StatusCode::CREATED, Json(donation)))
}

// ─── Segments ──────────────────────────────────────────────────────────────

pub async fn list_segments(State(state): State<CrmState>) -> Json<Vec<Segment>> {
    Json(state.store.list_segments())
}

pub async fn get_segment(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Segment>, ApiError> {
    state
        .store
        .get_segment(id)
        .map(Json)
        .ok_or_else(|| error_response(CrmError::not_found("segment", id)))
}

pub async fn create_segment(
    State(state): State<CrmState>,
    payload: Result<Json<CreateSegmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Segment>), ApiError> {
    let req = json_body(payload)?;
    match state.store.create_segment(req, "admin") {
        Ok(segment) => {
            metrics::counter!("crm.segments.created").increment(1);
            Ok((StatusCode::CREATED, Json(segment)))
        }
        Err(err) => {
            metrics::counter!("crm.segments.rejected").increment(1);
            Err(error_response(err))
        }
    }
}

pub async fn delete_segment(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_segment(id, "admin") {
        metrics::counter!("crm.segments.deleted").increment(1);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(CrmError::not_found("segment", id)))
    }
}

pub async fn segment_donors(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Donor>>, ApiError> {
    state
        .store
        .segment_donors(id)
        .map(Json)
        .map_err(error_response)
}

pub async fn preview_segment(
    State(state): State<CrmState>,
    payload: Result<Json<SegmentPreviewRequest>, JsonRejection>,
) -> Result<Json<SegmentPreviewResponse>, ApiError> {
    let req = json_body(payload)?;
    let limit = req
        .limit
        .unwrap_or(state.preview_limit)
        .min(state.preview_limit);
    match state.store.preview_segment(&req.rules, limit) {
        Ok(preview) => {
            metrics::counter!("crm.segments.previewed").increment(1);
            Ok(Json(preview))
        }
        Err(err) => {
            warn!(error = %err, "Segment preview rejected");
            Err(error_response(err))
        }
    }
}

pub async fn segment_fields() -> Json<Vec<FieldDescriptor>> {
    let fields = DonorAttribute::ALL
        .iter()
        .map(|field| {
            let kind = field.kind();
            FieldDescriptor {
                field: *field,
                kind: kind.name(),
                case_insensitive: kind == FieldKind::Text,
                operators: kind.operators(),
                values: match kind {
                    FieldKind::Enum(tokens) => Some(tokens),
                    _ => None,
                },
            }
        })
        .collect();
    Json(fields)
}

// ─── Audit Log ─────────────────────────────────────────────────────────────

pub async fn audit_log(State(state): State<CrmState>) -> Json<Vec<AuditLogEntry>> {
    Json(state.store.get_audit_log())
}
