//! Query predicates in the persistence layer's filter vocabulary, and their
//! evaluation against in-memory donor records.
//!
//! Predicates serialize to the nested filter objects the store accepts:
//! `{"AND": [...]}`, `{"OR": [...]}` and per-field filters such as
//! `{"email": {"equals": "a@b.org", "mode": "insensitive"}}`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use donor_core::types::Donor;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::fields::DonorAttribute;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every child must hold.
    All(Vec<Predicate>),
    /// At least one child must hold.
    Any(Vec<Predicate>),
    Field(FieldFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: DonorAttribute,
    pub op: FilterOp,
    pub value: FilterValue,
    pub mode: MatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equals,
    Not,
    Contains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Equals => "equals",
            FilterOp::Not => "not",
            FilterOp::Contains => "contains",
            FilterOp::StartsWith => "startsWith",
            FilterOp::EndsWith => "endsWith",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::NotIn => "notIn",
        }
    }
}

/// String comparison mode requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Default,
    Insensitive,
}

/// Normalized comparison operand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Number(serde_json::Number),
    Date(DateTime<Utc>),
    Bool(bool),
    List(Vec<FilterValue>),
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Predicate::All(children) => map.serialize_entry("AND", children)?,
            Predicate::Any(children) => map.serialize_entry("OR", children)?,
            Predicate::Field(filter) => {
                map.serialize_entry(filter.field.name(), &FilterBody(filter))?
            }
        }
        map.end()
    }
}

struct FilterBody<'a>(&'a FieldFilter);

impl Serialize for FilterBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let filter = self.0;
        let insensitive = filter.mode == MatchMode::Insensitive;
        let mut map = serializer.serialize_map(Some(if insensitive { 2 } else { 1 }))?;
        map.serialize_entry(filter.op.as_str(), &filter.value)?;
        if insensitive {
            map.serialize_entry("mode", "insensitive")?;
        }
        map.end()
    }
}

impl Predicate {
    pub fn matches(&self, donor: &Donor) -> bool {
        match self {
            Predicate::All(children) => children.iter().all(|p| p.matches(donor)),
            Predicate::Any(children) => children.iter().any(|p| p.matches(donor)),
            Predicate::Field(filter) => filter.matches(donor),
        }
    }
}

impl FieldFilter {
    /// A missing attribute never satisfies a filter, whatever the verb.
    pub fn matches(&self, donor: &Donor) -> bool {
        match attribute_value(self.field, donor) {
            Some(actual) => compare(&actual, self.op, &self.value, self.mode),
            None => false,
        }
    }
}

enum Actual<'a> {
    Text(&'a str),
    Number(f64),
    Date(DateTime<Utc>),
    Bool(bool),
}

fn attribute_value(field: DonorAttribute, donor: &Donor) -> Option<Actual<'_>> {
    let giving = &donor.giving;
    let value = match field {
        DonorAttribute::Email => Actual::Text(&donor.email),
        DonorAttribute::FirstName => Actual::Text(&donor.first_name),
        DonorAttribute::LastName => Actual::Text(&donor.last_name),
        DonorAttribute::Employer => Actual::Text(donor.employer.as_deref()?),
        DonorAttribute::City => Actual::Text(donor.city.as_deref()?),
        DonorAttribute::State => Actual::Text(donor.state.as_deref()?),
        DonorAttribute::Country => Actual::Text(donor.country.as_deref()?),
        DonorAttribute::Status => Actual::Text(donor.status.as_str()),
        DonorAttribute::RetentionRisk => Actual::Text(donor.retention_risk.as_str()),
        DonorAttribute::PreferredChannel => Actual::Text(donor.preferred_channel.as_str()),
        DonorAttribute::EmailOptIn => Actual::Bool(donor.email_opt_in),
        DonorAttribute::TotalGifts => Actual::Number(giving.total_gifts as f64),
        DonorAttribute::TotalAmount => Actual::Number(giving.total_amount),
        DonorAttribute::AverageGift => Actual::Number(giving.average_gift),
        DonorAttribute::LargestGift => Actual::Number(giving.largest_gift),
        DonorAttribute::FirstGiftDate => Actual::Date(giving.first_gift_date?),
        DonorAttribute::LastGiftDate => Actual::Date(giving.last_gift_date?),
        DonorAttribute::CreatedAt => Actual::Date(donor.created_at),
    };
    Some(value)
}

fn compare(actual: &Actual<'_>, op: FilterOp, expected: &FilterValue, mode: MatchMode) -> bool {
    match op {
        FilterOp::Equals => scalar_eq(actual, expected, mode),
        FilterOp::Not => !scalar_eq(actual, expected, mode),
        FilterOp::Contains => text_test(actual, expected, mode, |a, e| a.contains(e)),
        FilterOp::StartsWith => text_test(actual, expected, mode, |a, e| a.starts_with(e)),
        FilterOp::EndsWith => text_test(actual, expected, mode, |a, e| a.ends_with(e)),
        FilterOp::Gt => matches!(ordering(actual, expected), Some(Ordering::Greater)),
        FilterOp::Gte => matches!(
            ordering(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => matches!(ordering(actual, expected), Some(Ordering::Less)),
        FilterOp::Lte => matches!(
            ordering(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::In => in_list(actual, expected, mode),
        FilterOp::NotIn => !in_list(actual, expected, mode),
    }
}

fn scalar_eq(actual: &Actual<'_>, expected: &FilterValue, mode: MatchMode) -> bool {
    match (actual, expected) {
        (Actual::Text(a), FilterValue::Text(e)) => match mode {
            MatchMode::Insensitive => a.to_lowercase() == e.to_lowercase(),
            MatchMode::Default => *a == e.as_str(),
        },
        (Actual::Number(a), FilterValue::Number(e)) => e.as_f64() == Some(*a),
        (Actual::Date(a), FilterValue::Date(e)) => a == e,
        (Actual::Bool(a), FilterValue::Bool(e)) => a == e,
        _ => false,
    }
}

fn text_test(
    actual: &Actual<'_>,
    expected: &FilterValue,
    mode: MatchMode,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    match (actual, expected) {
        (Actual::Text(a), FilterValue::Text(e)) => match mode {
            MatchMode::Insensitive => test(&a.to_lowercase(), &e.to_lowercase()),
            MatchMode::Default => test(a, e),
        },
        _ => false,
    }
}

fn ordering(actual: &Actual<'_>, expected: &FilterValue) -> Option<Ordering> {
    match (actual, expected) {
        (Actual::Number(a), FilterValue::Number(e)) => a.partial_cmp(&e.as_f64()?),
        (Actual::Date(a), FilterValue::Date(e)) => Some(a.cmp(e)),
        _ => None,
    }
}

fn in_list(actual: &Actual<'_>, expected: &FilterValue, mode: MatchMode) -> bool {
    match expected {
        FilterValue::List(items) => items.iter().any(|item| scalar_eq(actual, item, mode)),
        _ => false,
    }
}
