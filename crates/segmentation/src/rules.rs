//! Segment rule trees as stored in segment definitions.
//!
//! A rule is a condition leaf or an `and`/`or` group of child rules:
//!
//! ```json
//! {"and": [
//!   {"field": "totalGifts", "operator": "greaterThanOrEqual", "value": 2},
//!   {"or": [{"field": "retentionRisk", "operator": "equals", "value": "HIGH"}]}
//! ]}
//! ```
//!
//! Field and operator names are kept verbatim here; resolving them against
//! the attribute table happens in [`crate::compiler`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rule {
    Condition(Condition),
    And { and: Vec<Rule> },
    Or { or: Vec<Rule> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Rule {
    pub fn condition(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Rule::Condition(Condition {
            field: field.into(),
            operator: operator.into(),
            value,
        })
    }

    pub fn and(rules: Vec<Rule>) -> Self {
        Rule::And { and: rules }
    }

    pub fn or(rules: Vec<Rule>) -> Self {
        Rule::Or { or: rules }
    }

    /// Number of condition leaves in the tree.
    pub fn condition_count(&self) -> usize {
        match self {
            Rule::Condition(_) => 1,
            Rule::And { and: rules } | Rule::Or { or: rules } => {
                rules.iter().map(Rule::condition_count).sum()
            }
        }
    }

    /// Parse a rule tree from stored JSON, rejecting any node that is not
    /// exactly a condition, an `and` group or an `or` group.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or_else(|| {
            ValidationError::Malformed(format!("expected a rule object, found {}", json_type(value)))
        })?;

        if let Some(children) = object.get("and") {
            return Ok(Rule::And {
                and: parse_group("and", object, children)?,
            });
        }
        if let Some(children) = object.get("or") {
            return Ok(Rule::Or {
                or: parse_group("or", object, children)?,
            });
        }
        if object.contains_key("field") || object.contains_key("operator") {
            return parse_condition(object).map(Rule::Condition);
        }

        Err(ValidationError::Malformed(
            "rule must be a condition or an `and`/`or` group".to_string(),
        ))
    }
}

impl TryFrom<Value> for Rule {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Rule::from_json(&value)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Rule::from_json(&value).map_err(serde::de::Error::custom)
    }
}

fn parse_group(
    connective: &str,
    object: &Map<String, Value>,
    children: &Value,
) -> Result<Vec<Rule>, ValidationError> {
    if object.len() != 1 {
        return Err(ValidationError::Malformed(format!(
            "`{connective}` group must not carry other keys"
        )));
    }
    let items = children.as_array().ok_or_else(|| {
        ValidationError::Malformed(format!(
            "`{connective}` expects an array of rules, found {}",
            json_type(children)
        ))
    })?;
    items.iter().map(Rule::from_json).collect()
}

fn parse_condition(object: &Map<String, Value>) -> Result<Condition, ValidationError> {
    if let Some(key) = object
        .keys()
        .find(|k| !matches!(k.as_str(), "field" | "operator" | "value"))
    {
        return Err(ValidationError::Malformed(format!(
            "unexpected key `{key}` in condition"
        )));
    }

    let field = required_str(object, "field")?;
    let operator = required_str(object, "operator")?;
    let value = object.get("value").cloned().ok_or_else(|| {
        ValidationError::Malformed(format!("condition on `{field}` is missing `value`"))
    })?;

    Ok(Condition {
        field,
        operator,
        value,
    })
}

fn required_str(object: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ValidationError::Malformed(format!(
            "condition `{key}` must not be empty"
        ))),
        Some(other) => Err(ValidationError::Malformed(format!(
            "condition `{key}` must be a string, found {}",
            json_type(other)
        ))),
        None => Err(ValidationError::Malformed(format!(
            "condition is missing `{key}`"
        ))),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_tree() {
        let rule: Rule = serde_json::from_value(json!({
            "and": [
                {"field": "totalGifts", "operator": "greaterThanOrEqual", "value": 2},
                {"or": [{"field": "retentionRisk", "operator": "equals", "value": "HIGH"}]}
            ]
        }))
        .unwrap();

        assert_eq!(
            rule,
            Rule::and(vec![
                Rule::condition("totalGifts", "greaterThanOrEqual", json!(2)),
                Rule::or(vec![Rule::condition("retentionRisk", "equals", json!("HIGH"))]),
            ])
        );
        assert_eq!(rule.condition_count(), 2);
    }

    #[test]
    fn test_serialize_matches_stored_shape() {
        let rule = Rule::or(vec![Rule::condition("email", "contains", json!("@acme.org"))]);
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"or": [{"field": "email", "operator": "contains", "value": "@acme.org"}]})
        );
    }

    #[test]
    fn test_rejects_unknown_shape() {
        let err = Rule::from_json(&json!({"not": [{"field": "email"}]})).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));

        let err = Rule::from_json(&json!("status = ACTIVE")).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_rejects_mixed_group_and_condition_keys() {
        let err = Rule::from_json(&json!({
            "and": [],
            "field": "email"
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_rejects_non_array_group() {
        let err = Rule::from_json(&json!({"or": {"field": "email"}})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed("`or` expects an array of rules, found object".to_string())
        );
    }

    #[test]
    fn test_rejects_incomplete_condition() {
        assert!(Rule::from_json(&json!({"field": "email", "operator": "equals"})).is_err());
        assert!(Rule::from_json(&json!({"field": "", "operator": "equals", "value": 1})).is_err());
        assert!(Rule::from_json(&json!({"field": "email", "operator": 3, "value": 1})).is_err());
        assert!(Rule::from_json(&json!({
            "field": "email", "operator": "equals", "value": "a", "mode": "insensitive"
        }))
        .is_err());
    }

    #[test]
    fn test_deserialize_surfaces_validation_message() {
        let err = serde_json::from_value::<Rule>(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("expected a rule object"));
    }
}
