//! Segment rule compiler: turns a [`Rule`] tree into a [`Predicate`] the
//! donor store can execute.
//!
//! The output mirrors the input shape node for node. Text attributes request
//! case-insensitive matching; enum attributes are matched against their
//! literal tokens; numbers and dates compare by natural ordering. Anything
//! the attribute table does not recognise is rejected rather than dropped.
//! Empty `and`/`or` groups are rejected as well.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::ValidationError;
use crate::fields::{DonorAttribute, FieldKind, Operator};
use crate::predicates::{FieldFilter, FilterOp, FilterValue, MatchMode, Predicate};
use crate::rules::{json_type, Condition, Rule};

pub fn compile(rule: &Rule) -> Result<Predicate, ValidationError> {
    match rule {
        Rule::Condition(condition) => compile_condition(condition).map(Predicate::Field),
        Rule::And { and } => compile_group("and", and).map(Predicate::All),
        Rule::Or { or } => compile_group("or", or).map(Predicate::Any),
    }
}

/// Parse stored rule JSON and compile it in one step.
pub fn compile_json(value: &Value) -> Result<Predicate, ValidationError> {
    compile(&Rule::from_json(value)?)
}

fn compile_group(connective: &'static str, rules: &[Rule]) -> Result<Vec<Predicate>, ValidationError> {
    if rules.is_empty() {
        return Err(ValidationError::EmptyGroup { connective });
    }
    rules.iter().map(compile).collect()
}

fn compile_condition(condition: &Condition) -> Result<FieldFilter, ValidationError> {
    let field = DonorAttribute::from_name(&condition.field).ok_or_else(|| {
        ValidationError::UnknownField {
            field: condition.field.clone(),
        }
    })?;
    let operator =
        Operator::parse(&condition.operator).ok_or_else(|| ValidationError::UnknownOperator {
            field: condition.field.clone(),
            operator: condition.operator.clone(),
        })?;

    let kind = field.kind();
    if !kind.supports(operator) {
        return Err(ValidationError::IncompatibleOperator {
            field: condition.field.clone(),
            operator: condition.operator.clone(),
            kind,
        });
    }

    let invalid = |reason: String| ValidationError::InvalidValue {
        field: condition.field.clone(),
        operator: condition.operator.clone(),
        reason,
    };

    let value = if operator.takes_list() {
        let items = condition.value.as_array().ok_or_else(|| {
            invalid(format!(
                "expected an array, found {}",
                json_type(&condition.value)
            ))
        })?;
        let items = items
            .iter()
            .map(|item| normalize(kind, item))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        FilterValue::List(items)
    } else {
        normalize(kind, &condition.value).map_err(invalid)?
    };

    let mode = match kind {
        FieldKind::Text => MatchMode::Insensitive,
        FieldKind::Enum(_) | FieldKind::Number | FieldKind::Date | FieldKind::Boolean => {
            MatchMode::Default
        }
    };

    Ok(FieldFilter {
        field,
        op: filter_op(operator),
        value,
        mode,
    })
}

fn filter_op(operator: Operator) -> FilterOp {
    match operator {
        Operator::Equals => FilterOp::Equals,
        Operator::NotEquals => FilterOp::Not,
        Operator::Contains => FilterOp::Contains,
        Operator::StartsWith => FilterOp::StartsWith,
        Operator::EndsWith => FilterOp::EndsWith,
        Operator::GreaterThan => FilterOp::Gt,
        Operator::GreaterThanOrEqual => FilterOp::Gte,
        Operator::LessThan => FilterOp::Lt,
        Operator::LessThanOrEqual => FilterOp::Lte,
        Operator::In => FilterOp::In,
        Operator::NotIn => FilterOp::NotIn,
    }
}

fn normalize(kind: FieldKind, value: &Value) -> Result<FilterValue, String> {
    match (kind, value) {
        (FieldKind::Text, Value::String(s)) => Ok(FilterValue::Text(s.clone())),
        (FieldKind::Enum(tokens), Value::String(s)) => {
            if tokens.contains(&s.as_str()) {
                Ok(FilterValue::Text(s.clone()))
            } else {
                Err(format!("`{s}` is not one of {}", tokens.join(", ")))
            }
        }
        (FieldKind::Number, Value::Number(n)) => Ok(FilterValue::Number(n.clone())),
        (FieldKind::Date, Value::String(s)) => parse_date(s)
            .map(FilterValue::Date)
            .ok_or_else(|| format!("`{s}` is not an RFC 3339 timestamp or YYYY-MM-DD date")),
        (FieldKind::Boolean, Value::Bool(b)) => Ok(FilterValue::Bool(*b)),
        (kind, other) => Err(format!(
            "expected a {} value, found {}",
            expected_type(kind),
            json_type(other)
        )),
    }
}

fn expected_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Enum(_) => "string",
        FieldKind::Number => "number",
        FieldKind::Date => "date string",
        FieldKind::Boolean => "boolean",
    }
}

/// Bare dates are taken as midnight UTC.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}
