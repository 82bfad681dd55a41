//! Segmentation engine — keeps segment definitions alongside their compiled
//! predicates and evaluates donor membership.

use chrono::{DateTime, Utc};
use donor_core::types::Donor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::compiler::compile;
use crate::error::ValidationError;
use crate::predicates::Predicate;
use crate::rules::Rule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rules: Rule,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct CompiledSegment {
    segment: Segment,
    predicate: Predicate,
}

pub struct SegmentationEngine {
    segments: dashmap::DashMap<Uuid, CompiledSegment>,
}

impl SegmentationEngine {
    pub fn new() -> Self {
        Self {
            segments: dashmap::DashMap::new(),
        }
    }

    /// Compile and register a segment, replacing any segment with the same id.
    /// Segments whose rules do not compile are never stored.
    pub fn register_segment(&self, segment: Segment) -> Result<Predicate, ValidationError> {
        let predicate = compile(&segment.rules)?;
        info!(
            segment_id = %segment.id,
            name = %segment.name,
            conditions = segment.rules.condition_count(),
            "Segment registered"
        );
        self.segments.insert(
            segment.id,
            CompiledSegment {
                segment,
                predicate: predicate.clone(),
            },
        );
        Ok(predicate)
    }

    pub fn remove_segment(&self, id: &Uuid) -> Option<Segment> {
        self.segments.remove(id).map(|(_, entry)| {
            info!(segment_id = %id, "Segment removed");
            entry.segment
        })
    }

    pub fn get_segment(&self, id: &Uuid) -> Option<Segment> {
        self.segments.get(id).map(|s| s.segment.clone())
    }

    pub fn predicate_for(&self, id: &Uuid) -> Option<Predicate> {
        self.segments.get(id).map(|s| s.predicate.clone())
    }

    /// Segments ordered by name.
    pub fn list_segments(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> =
            self.segments.iter().map(|s| s.value().segment.clone()).collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        segments
    }

    /// Ids of every registered segment the donor belongs to.
    pub fn evaluate_donor(&self, donor: &Donor) -> Vec<Uuid> {
        let mut memberships: Vec<Uuid> = self
            .segments
            .iter()
            .filter(|entry| entry.value().predicate.matches(donor))
            .map(|entry| *entry.key())
            .collect();
        memberships.sort();
        debug!(donor_id = %donor.id, segments = memberships.len(), "Donor evaluated");
        memberships
    }

    /// Donors from `donors` that belong to the segment, or `None` when the
    /// segment is not registered.
    pub fn members<'a>(
        &self,
        id: &Uuid,
        donors: impl IntoIterator<Item = &'a Donor>,
    ) -> Option<Vec<&'a Donor>> {
        let predicate = self.predicate_for(id)?;
        Some(donors.into_iter().filter(|d| predicate.matches(d)).collect())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SegmentBuilder;
    use donor_core::types::{ContactChannel, DonorStatus, GivingSummary, RetentionRisk};
    use serde_json::json;

    fn donor(email: &str, risk: RetentionRisk, total_gifts: u32) -> Donor {
        let now = Utc::now();
        Donor {
            id: Uuid::new_v4(),
            email: email.into(),
            first_name: "Test".into(),
            last_name: "Donor".into(),
            employer: None,
            city: None,
            state: None,
            country: None,
            status: DonorStatus::Active,
            retention_risk: risk,
            preferred_channel: ContactChannel::Email,
            email_opt_in: true,
            giving: GivingSummary {
                total_gifts,
                ..GivingSummary::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_register_and_evaluate() {
        let engine = SegmentationEngine::new();
        let repeat = SegmentBuilder::new("Repeat donors")
            .attribute_gte("totalGifts", json!(2))
            .build();
        let at_risk = SegmentBuilder::new("At risk")
            .attribute_equals("retentionRisk", json!("HIGH"))
            .build();
        let repeat_id = repeat.id;
        let at_risk_id = at_risk.id;
        engine.register_segment(repeat).unwrap();
        engine.register_segment(at_risk).unwrap();

        let both = donor("a@example.org", RetentionRisk::High, 4);
        let neither = donor("b@example.org", RetentionRisk::Low, 1);

        let mut expected = vec![repeat_id, at_risk_id];
        expected.sort();
        assert_eq!(engine.evaluate_donor(&both), expected);
        assert!(engine.evaluate_donor(&neither).is_empty());
    }

    #[test]
    fn test_invalid_segment_is_not_registered() {
        let engine = SegmentationEngine::new();
        let bad = SegmentBuilder::new("Broken")
            .attribute_equals("shoeSize", json!(42))
            .build();
        let id = bad.id;

        let err = engine.register_segment(bad).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
        assert!(engine.get_segment(&id).is_none());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_members_filters_donors() {
        let engine = SegmentationEngine::new();
        let segment = SegmentBuilder::new("Example.org")
            .condition("email", "endsWith", json!("@EXAMPLE.ORG"))
            .build();
        let id = segment.id;
        engine.register_segment(segment).unwrap();

        let donors = vec![
            donor("a@example.org", RetentionRisk::Low, 0),
            donor("b@other.net", RetentionRisk::Low, 0),
        ];
        let members = engine.members(&id, &donors).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].email, "a@example.org");

        assert!(engine.members(&Uuid::new_v4(), &donors).is_none());
    }

    #[test]
    fn test_remove_and_list() {
        let engine = SegmentationEngine::new();
        let b = SegmentBuilder::new("B").attribute_equals("emailOptIn", json!(true)).build();
        let a = SegmentBuilder::new("A").attribute_equals("emailOptIn", json!(false)).build();
        let b_id = b.id;
        engine.register_segment(b).unwrap();
        engine.register_segment(a).unwrap();

        let names: Vec<String> = engine.list_segments().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);

        assert_eq!(engine.remove_segment(&b_id).map(|s| s.name), Some("B".to_string()));
        assert_eq!(engine.len(), 1);
        assert!(engine.remove_segment(&b_id).is_none());
    }
}
