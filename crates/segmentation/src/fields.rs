//! Static table of donor attributes addressable from segment rules, and the
//! comparison operators each attribute kind accepts.

use std::fmt;

use donor_core::types::{ContactChannel, DonorStatus, RetentionRisk};
use serde::Serialize;

/// Donor attribute addressable by a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DonorAttribute {
    Email,
    FirstName,
    LastName,
    Employer,
    City,
    State,
    Country,
    Status,
    RetentionRisk,
    PreferredChannel,
    EmailOptIn,
    TotalGifts,
    TotalAmount,
    AverageGift,
    LargestGift,
    FirstGiftDate,
    LastGiftDate,
    CreatedAt,
}

/// Semantic type of an attribute; decides how conditions on it compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, matched case-insensitively.
    Text,
    /// Closed set of literal tokens, matched exactly.
    Enum(&'static [&'static str]),
    Number,
    Date,
    Boolean,
}

impl DonorAttribute {
    pub const ALL: &'static [DonorAttribute] = &[
        DonorAttribute::Email,
        DonorAttribute::FirstName,
        DonorAttribute::LastName,
        DonorAttribute::Employer,
        DonorAttribute::City,
        DonorAttribute::State,
        DonorAttribute::Country,
        DonorAttribute::Status,
        DonorAttribute::RetentionRisk,
        DonorAttribute::PreferredChannel,
        DonorAttribute::EmailOptIn,
        DonorAttribute::TotalGifts,
        DonorAttribute::TotalAmount,
        DonorAttribute::AverageGift,
        DonorAttribute::LargestGift,
        DonorAttribute::FirstGiftDate,
        DonorAttribute::LastGiftDate,
        DonorAttribute::CreatedAt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DonorAttribute::Email => "email",
            DonorAttribute::FirstName => "firstName",
            DonorAttribute::LastName => "lastName",
            DonorAttribute::Employer => "employer",
            DonorAttribute::City => "city",
            DonorAttribute::State => "state",
            DonorAttribute::Country => "country",
            DonorAttribute::Status => "status",
            DonorAttribute::RetentionRisk => "retentionRisk",
            DonorAttribute::PreferredChannel => "preferredChannel",
            DonorAttribute::EmailOptIn => "emailOptIn",
            DonorAttribute::TotalGifts => "totalGifts",
            DonorAttribute::TotalAmount => "totalAmount",
            DonorAttribute::AverageGift => "averageGift",
            DonorAttribute::LargestGift => "largestGift",
            DonorAttribute::FirstGiftDate => "firstGiftDate",
            DonorAttribute::LastGiftDate => "lastGiftDate",
            DonorAttribute::CreatedAt => "createdAt",
        }
    }

    /// Field names are matched exactly; `Email` or `EMAIL` are unknown fields.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|attr| attr.name() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            DonorAttribute::Email
            | DonorAttribute::FirstName
            | DonorAttribute::LastName
            | DonorAttribute::Employer
            | DonorAttribute::City
            | DonorAttribute::State
            | DonorAttribute::Country => FieldKind::Text,
            DonorAttribute::Status => FieldKind::Enum(DonorStatus::TOKENS),
            DonorAttribute::RetentionRisk => FieldKind::Enum(RetentionRisk::TOKENS),
            DonorAttribute::PreferredChannel => FieldKind::Enum(ContactChannel::TOKENS),
            DonorAttribute::EmailOptIn => FieldKind::Boolean,
            DonorAttribute::TotalGifts
            | DonorAttribute::TotalAmount
            | DonorAttribute::AverageGift
            | DonorAttribute::LargestGift => FieldKind::Number,
            DonorAttribute::FirstGiftDate
            | DonorAttribute::LastGiftDate
            | DonorAttribute::CreatedAt => FieldKind::Date,
        }
    }
}

impl fmt::Display for DonorAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Enum(_) => "enum",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Boolean => "boolean",
        }
    }

    pub fn supports(&self, operator: Operator) -> bool {
        use Operator::*;
        match self {
            FieldKind::Text => matches!(
                operator,
                Equals | NotEquals | Contains | StartsWith | EndsWith | In | NotIn
            ),
            FieldKind::Enum(_) => matches!(operator, Equals | NotEquals | In | NotIn),
            FieldKind::Number => matches!(
                operator,
                Equals
                    | NotEquals
                    | GreaterThan
                    | GreaterThanOrEqual
                    | LessThan
                    | LessThanOrEqual
                    | In
                    | NotIn
            ),
            FieldKind::Date => matches!(
                operator,
                Equals | NotEquals | GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual
            ),
            FieldKind::Boolean => matches!(operator, Equals | NotEquals),
        }
    }

    pub fn operators(&self) -> Vec<Operator> {
        Operator::ALL
            .iter()
            .copied()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison verb of a rule condition, as written in stored segment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
}

impl Operator {
    pub const ALL: &'static [Operator] = &[
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::In,
        Operator::NotIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThan => "lessThan",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::In => "in",
            Operator::NotIn => "notIn",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    /// Operators whose value is a list of candidates.
    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
