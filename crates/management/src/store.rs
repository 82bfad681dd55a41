//! In-memory CRM store backed by DashMap.
//!
//! Stands in for the relational store: donor queries take a compiled
//! [`Predicate`] and return the matching records, exactly as a
//! "find records matching filter" call on the ORM would.

use crate::models::*;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use donor_core::types::{ContactChannel, Donation, Donor, DonorStatus, GivingSummary, RetentionRisk};
use donor_core::{CrmError, CrmResult};
use donor_segmentation::{compile_json, Predicate, Rule, Segment, SegmentBuilder, SegmentationEngine};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use tracing::{info, warn};
use uuid::Uuid;

/// Audit entries retained when no capacity is configured.
pub const DEFAULT_AUDIT_LOG_CAPACITY: usize = 10_000;

/// Thread-safe in-memory store for donors, donations, segments and the audit log.
pub struct CrmStore {
    donors: DashMap<Uuid, Donor>,
    /// Lower-cased email → owning donor; claimed before a donor is written.
    emails: DashMap<String, Uuid>,
    donations: DashMap<Uuid, Donation>,
    segments: SegmentationEngine,
    /// Oldest entries are evicted once `audit_capacity` is reached.
    audit_log: Mutex<VecDeque<AuditLogEntry>>,
    audit_capacity: usize,
}

impl CrmStore {
    pub fn new() -> Self {
        Self::with_audit_capacity(DEFAULT_AUDIT_LOG_CAPACITY)
    }

    pub fn with_audit_capacity(capacity: usize) -> Self {
        Self {
            donors: DashMap::new(),
            emails: DashMap::new(),
            donations: DashMap::new(),
            segments: SegmentationEngine::new(),
            audit_log: Mutex::new(VecDeque::new()),
            audit_capacity: capacity.max(1),
        }
    }

    pub fn with_demo_data() -> Self {
        Self::new().seeded()
    }

    /// Populate the store with demo donors, donations and segments.
    pub fn seeded(self) -> Self {
        self.seed_demo_data();
        info!(
            donors = self.donors.len(),
            segments = self.segments.len(),
            "CRM store initialized (in-memory, demo data)"
        );
        self
    }

    // ─── Donors ────────────────────────────────────────────────────────────

    /// Newest donors first.
    pub fn list_donors(&self) -> Vec<Donor> {
        let mut donors: Vec<Donor> = self.donors.iter().map(|r| r.value().clone()).collect();
        sort_donors(&mut donors);
        donors
    }

    pub fn get_donor(&self, id: Uuid) -> Option<Donor> {
        self.donors.get(&id).map(|r| r.value().clone())
    }

    pub fn create_donor(&self, req: CreateDonorRequest, user: &str) -> CrmResult<Donor> {
        validate_email(&req.email)?;
        let id = Uuid::new_v4();
        self.claim_email(&req.email, id)?;

        let now = Utc::now();
        let donor = Donor {
            id,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            employer: req.employer,
            city: req.city,
            state: req.state,
            country: req.country,
            status: req.status,
            retention_risk: req.retention_risk,
            preferred_channel: req.preferred_channel,
            email_opt_in: req.email_opt_in,
            giving: GivingSummary::default(),
            created_at: now,
            updated_at: now,
        };
        self.donors.insert(donor.id, donor.clone());
        self.log_audit(user, AuditAction::Create, "donor", &donor.id.to_string(), json!({"email": &donor.email}));
        Ok(donor)
    }

    pub fn update_donor(&self, id: Uuid, req: UpdateDonorRequest, user: &str) -> CrmResult<Donor> {
        if let Some(email) = &req.email {
            validate_email(email)?;
        }

        let updated = {
            let mut entry = self
                .donors
                .get_mut(&id)
                .ok_or_else(|| CrmError::not_found("donor", id))?;
            let d = entry.value_mut();
            if let Some(v) = req.email {
                self.claim_email(&v, id)?;
                let previous = d.email.to_lowercase();
                if previous != v.to_lowercase() {
                    self.emails.remove(&previous);
                }
                d.email = v;
            }
            if let Some(v) = req.first_name { d.first_name = v; }
            if let Some(v) = req.last_name { d.last_name = v; }
            if let Some(v) = req.employer { d.employer = Some(v); }
            if let Some(v) = req.city { d.city = Some(v); }
            if let Some(v) = req.state { d.state = Some(v); }
            if let Some(v) = req.country { d.country = Some(v); }
            if let Some(v) = req.status { d.status = v; }
            if let Some(v) = req.retention_risk { d.retention_risk = v; }
            if let Some(v) = req.preferred_channel { d.preferred_channel = v; }
            if let Some(v) = req.email_opt_in { d.email_opt_in = v; }
            d.updated_at = Utc::now();
            d.clone()
        };
        self.log_audit(user, AuditAction::Update, "donor", &id.to_string(), json!({}));
        Ok(updated)
    }

    /// Removes the donor and their donation history.
    pub fn delete_donor(&self, id: Uuid, user: &str) -> bool {
        let removed = self.donors.remove(&id);
        if let Some((_, donor)) = &removed {
            self.emails.remove(&donor.email.to_lowercase());
            self.donations.retain(|_, d| d.donor_id != id);
            self.log_audit(user, AuditAction::Delete, "donor", &id.to_string(), json!({}));
        }
        removed.is_some()
    }

    /// Donors matching a compiled predicate, newest first.
    pub fn find_donors(&self, predicate: &Predicate) -> Vec<Donor> {
        let mut donors: Vec<Donor> = self
            .donors
            .iter()
            .filter(|r| predicate.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sort_donors(&mut donors);
        donors
    }

    /// Segments the donor currently belongs to.
    pub fn donor_segments(&self, id: Uuid) -> CrmResult<Vec<Segment>> {
        let donor = self.get_donor(id).ok_or_else(|| CrmError::not_found("donor", id))?;
        Ok(self
            .segments
            .evaluate_donor(&donor)
            .iter()
            .filter_map(|segment_id| self.segments.get_segment(segment_id))
            .collect())
    }

    // ─── Donations ─────────────────────────────────────────────────────────

    /// Records a gift and recomputes the donor's giving summary.
    pub fn record_donation(&self, donor_id: Uuid, req: RecordDonationRequest, user: &str) -> CrmResult<Donation> {
        if !req.amount.is_finite() || req.amount <= 0.0 {
            return Err(CrmError::Validation(format!(
                "donation amount must be positive, got {}",
                req.amount
            )));
        }
        // Holding the donor entry keeps a concurrent delete from removing the
        // donor between the existence check and the insert.
        let mut donor = self
            .donors
            .get_mut(&donor_id)
            .ok_or_else(|| CrmError::not_found("donor", donor_id))?;

        let donation = Donation {
            id: Uuid::new_v4(),
            donor_id,
            amount: req.amount,
            received_at: req.received_at.unwrap_or_else(Utc::now),
            campaign: req.campaign,
            note: req.note,
        };
        self.donations.insert(donation.id, donation.clone());
        donor.giving = GivingSummary::from_donations(&self.donations_for(donor_id));
        donor.updated_at = Utc::now();
        drop(donor);
        self.log_audit(
            user,
            AuditAction::RecordDonation,
            "donor",
            &donor_id.to_string(),
            json!({"donation_id": donation.id, "amount": donation.amount}),
        );
        Ok(donation)
    }

    /// Most recent gifts first.
    pub fn list_donations(&self, donor_id: Uuid) -> CrmResult<Vec<Donation>> {
        if !self.donors.contains_key(&donor_id) {
            return Err(CrmError::not_found("donor", donor_id));
        }
        let mut donations = self.donations_for(donor_id);
        donations.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(donations)
    }

    fn donations_for(&self, donor_id: Uuid) -> Vec<Donation> {
        self.donations
            .iter()
            .filter(|r| r.value().donor_id == donor_id)
            .map(|r| r.value().clone())
            .collect()
    }

    fn refresh_giving(&self, donor_id: Uuid) {
        let summary = GivingSummary::from_donations(&self.donations_for(donor_id));
        if let Some(mut entry) = self.donors.get_mut(&donor_id) {
            entry.giving = summary;
            entry.updated_at = Utc::now();
        }
    }

    // ─── Segments ──────────────────────────────────────────────────────────

    pub fn list_segments(&self) -> Vec<Segment> {
        self.segments.list_segments()
    }

    pub fn get_segment(&self, id: Uuid) -> Option<Segment> {
        self.segments.get_segment(&id)
    }

    pub fn create_segment(&self, req: CreateSegmentRequest, user: &str) -> CrmResult<Segment> {
        if req.name.trim().is_empty() {
            return Err(CrmError::Validation("segment name must not be empty".to_string()));
        }
        let rules = Rule::from_json(&req.rules)?;
        let now = Utc::now();
        let segment = Segment {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            rules,
            tags: req.tags,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.segments.register_segment(segment.clone()) {
            warn!(name = %segment.name, error = %err, "Segment rules rejected");
            return Err(err.into());
        }
        self.log_audit(user, AuditAction::Create, "segment", &segment.id.to_string(), json!({"name": &segment.name}));
        Ok(segment)
    }

    pub fn delete_segment(&self, id: Uuid, user: &str) -> bool {
        let removed = self.segments.remove_segment(&id).is_some();
        if removed {
            self.log_audit(user, AuditAction::Delete, "segment", &id.to_string(), json!({}));
        }
        removed
    }

    pub fn segment_donors(&self, id: Uuid) -> CrmResult<Vec<Donor>> {
        let predicate = self
            .segments
            .predicate_for(&id)
            .ok_or_else(|| CrmError::not_found("segment", id))?;
        Ok(self.find_donors(&predicate))
    }

    /// Compile ad-hoc rules and report what they would match, without saving
    /// a segment.
    pub fn preview_segment(&self, rules: &serde_json::Value, limit: usize) -> CrmResult<SegmentPreviewResponse> {
        let predicate = compile_json(rules)?;
        let mut donors = self.find_donors(&predicate);
        let matched = donors.len();
        donors.truncate(limit);
        Ok(SegmentPreviewResponse {
            predicate: serde_json::to_value(&predicate)?,
            matched,
            donors,
        })
    }

    // ─── Audit Log ─────────────────────────────────────────────────────────

    /// Newest entries first.
    pub fn get_audit_log(&self) -> Vec<AuditLogEntry> {
        self.audit_log.lock().iter().rev().cloned().collect()
    }

    fn log_audit(&self, user: &str, action: AuditAction, resource_type: &str, resource_id: &str, details: serde_json::Value) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            user: user.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            details,
            timestamp: Utc::now(),
        };
        let mut log = self.audit_log.lock();
        if log.len() >= self.audit_capacity {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Reserve `email` for `owner`. Fails if another donor already holds it.
    fn claim_email(&self, email: &str, owner: Uuid) -> CrmResult<()> {
        match self.emails.entry(email.to_lowercase()) {
            Entry::Occupied(entry) if *entry.get() != owner => Err(CrmError::Validation(format!(
                "a donor with email {email} already exists"
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(owner);
                Ok(())
            }
        }
    }

    // ─── Demo Data ─────────────────────────────────────────────────────────

    fn seed_demo_data(&self) {
        use chrono::Duration;
        let now = Utc::now();

        let donors = vec![
            ("grace.hopper@example.org", "Grace", "Hopper", Some("Navy"), "Arlington", "VA", DonorStatus::Active, RetentionRisk::Low, ContactChannel::Email, vec![(250.0, 400), (500.0, 200), (1000.0, 30)]),
            ("Alan.Turing@Example.ORG", "Alan", "Turing", None, "Wilmslow", "CH", DonorStatus::Lapsed, RetentionRisk::High, ContactChannel::Mail, vec![(75.0, 900), (75.0, 540)]),
            ("katherine.johnson@example.org", "Katherine", "Johnson", Some("NASA"), "Hampton", "VA", DonorStatus::Active, RetentionRisk::Medium, ContactChannel::Phone, vec![(40.0, 60)]),
            ("edsger@example.net", "Edsger", "Dijkstra", Some("UT Austin"), "Austin", "TX", DonorStatus::Inactive, RetentionRisk::Unknown, ContactChannel::Email, vec![]),
            ("margaret.hamilton@example.com", "Margaret", "Hamilton", Some("Hamilton Technologies"), "Boston", "MA", DonorStatus::Active, RetentionRisk::High, ContactChannel::Sms, vec![(120.0, 700), (180.0, 330), (90.0, 200), (300.0, 10)]),
            ("do.not.call@example.com", "Dana", "Quiet", None, "Denver", "CO", DonorStatus::DoNotContact, RetentionRisk::Low, ContactChannel::Mail, vec![(20.0, 100)]),
        ];

        for (email, first, last, employer, city, state, status, risk, channel, gifts) in donors {
            let id = Uuid::new_v4();
            let created_at = now - Duration::days(1000);
            for (amount, days_ago) in gifts {
                let donation = Donation {
                    id: Uuid::new_v4(),
                    donor_id: id,
                    amount,
                    received_at: now - Duration::days(days_ago),
                    campaign: Some("Annual Fund".to_string()),
                    note: None,
                };
                self.donations.insert(donation.id, donation);
            }
            self.emails.insert(email.to_lowercase(), id);
            self.donors.insert(
                id,
                Donor {
                    id,
                    email: email.to_string(),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    employer: employer.map(str::to_string),
                    city: Some(city.to_string()),
                    state: Some(state.to_string()),
                    country: Some("US".to_string()),
                    status,
                    retention_risk: risk,
                    preferred_channel: channel,
                    email_opt_in: status != DonorStatus::DoNotContact,
                    giving: GivingSummary::default(),
                    created_at,
                    updated_at: created_at,
                },
            );
            self.refresh_giving(id);
        }

        let demo_segments = [
            SegmentBuilder::new("Repeat donors")
                .description("Two or more gifts on record")
                .attribute_gte("totalGifts", json!(2))
                .tag("demo")
                .build(),
            SegmentBuilder::new("High-risk active donors")
                .attribute_equals("retentionRisk", json!("HIGH"))
                .attribute_equals("status", json!("ACTIVE"))
                .tag("demo")
                .build(),
            SegmentBuilder::new("Major gift prospects")
                .with_or()
                .attribute_gte("largestGift", json!(500))
                .attribute_gt("totalAmount", json!(600))
                .tag("demo")
                .build(),
        ];
        for segment in demo_segments {
            if let Err(err) = self.segments.register_segment(segment) {
                warn!(error = %err, "Demo segment rejected");
            }
        }
    }
}

impl Default for CrmStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_donors(donors: &mut [Donor]) {
    donors.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));
}

fn validate_email(email: &str) -> CrmResult<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(CrmError::Validation(format!("invalid email address: {email}")))
    }
}
