use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A donor record as held by the CRM store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub employer: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub status: DonorStatus,
    pub retention_risk: RetentionRisk,
    pub preferred_channel: ContactChannel,
    pub email_opt_in: bool,
    /// Giving aggregates, recomputed whenever a donation is recorded.
    #[serde(default)]
    pub giving: GivingSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GivingSummary {
    pub total_gifts: u32,
    pub total_amount: f64,
    pub average_gift: f64,
    pub largest_gift: f64,
    pub first_gift_date: Option<DateTime<Utc>>,
    pub last_gift_date: Option<DateTime<Utc>>,
}

impl GivingSummary {
    pub fn from_donations<'a>(donations: impl IntoIterator<Item = &'a Donation>) -> Self {
        let mut summary = Self::default();
        for donation in donations {
            summary.total_gifts += 1;
            summary.total_amount += donation.amount;
            summary.largest_gift = summary.largest_gift.max(donation.amount);
            summary.first_gift_date = Some(match summary.first_gift_date {
                Some(d) => d.min(donation.received_at),
                None => donation.received_at,
            });
            summary.last_gift_date = Some(match summary.last_gift_date {
                Some(d) => d.max(donation.received_at),
                None => donation.received_at,
            });
        }
        if summary.total_gifts > 0 {
            summary.average_gift = summary.total_amount / summary.total_gifts as f64;
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonorStatus {
    #[default]
    Active,
    Lapsed,
    Inactive,
    DoNotContact,
}

impl DonorStatus {
    pub const TOKENS: &'static [&'static str] = &["ACTIVE", "LAPSED", "INACTIVE", "DO_NOT_CONTACT"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DonorStatus::Active => "ACTIVE",
            DonorStatus::Lapsed => "LAPSED",
            DonorStatus::Inactive => "INACTIVE",
            DonorStatus::DoNotContact => "DO_NOT_CONTACT",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionRisk {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RetentionRisk {
    pub const TOKENS: &'static [&'static str] = &["LOW", "MEDIUM", "HIGH", "UNKNOWN"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionRisk::Low => "LOW",
            RetentionRisk::Medium => "MEDIUM",
            RetentionRisk::High => "HIGH",
            RetentionRisk::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactChannel {
    #[default]
    Email,
    Phone,
    Mail,
    Sms,
}

impl ContactChannel {
    pub const TOKENS: &'static [&'static str] = &["EMAIL", "PHONE", "MAIL", "SMS"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactChannel::Email => "EMAIL",
            ContactChannel::Phone => "PHONE",
            ContactChannel::Mail => "MAIL",
            ContactChannel::Sms => "SMS",
        }
    }
}

/// A single gift received from a donor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub amount: f64,
    pub received_at: DateTime<Utc>,
    pub campaign: Option<String>,
    pub note: Option<String>,
}
