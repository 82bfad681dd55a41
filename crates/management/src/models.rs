//! CRM API types — donor/donation/segment requests and responses, audit log.

use chrono::{DateTime, Utc};
use donor_core::types::{ContactChannel, Donor, DonorStatus, RetentionRisk};
use donor_segmentation::{DonorAttribute, Operator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Donors ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateDonorRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub employer: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub status: DonorStatus,
    #[serde(default)]
    pub retention_risk: RetentionRisk,
    #[serde(default)]
    pub preferred_channel: ContactChannel,
    #[serde(default)]
    pub email_opt_in: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDonorRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub employer: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub status: Option<DonorStatus>,
    pub retention_risk: Option<RetentionRisk>,
    pub preferred_channel: Option<ContactChannel>,
    pub email_opt_in: Option<bool>,
}

// ─── Donations ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordDonationRequest {
    pub amount: f64,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// ─── Segments ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSegmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw rule JSON; parsed and compiled by the store so that shape errors
    /// surface as validation failures.
    pub rules: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SegmentPreviewRequest {
    pub rules: serde_json::Value,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SegmentPreviewResponse {
    /// The compiled store filter.
    pub predicate: serde_json::Value,
    pub matched: usize,
    pub donors: Vec<Donor>,
}

/// Catalogue entry describing a rule-addressable donor field.
#[derive(Debug, Serialize)]
pub struct FieldDescriptor {
    pub field: DonorAttribute,
    pub kind: &'static str,
    pub case_insensitive: bool,
    pub operators: Vec<Operator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<&'static [&'static str]>,
}

// ─── Audit Log ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    RecordDonation,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
