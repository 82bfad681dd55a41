//! Segment builder — fluent API for constructing segment rules.

use serde_json::Value;
use uuid::Uuid;

use crate::engine::Segment;
use crate::rules::Rule;

pub struct SegmentBuilder {
    name: String,
    description: Option<String>,
    rules: Vec<Rule>,
    any: bool,
    tags: Vec<String>,
}

impl SegmentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rules: Vec::new(),
            any: false,
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Match donors satisfying any rule instead of all of them.
    pub fn with_or(mut self) -> Self {
        self.any = true;
        self
    }

    pub fn condition(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: Value,
    ) -> Self {
        self.rules.push(Rule::condition(field, operator, value));
        self
    }

    pub fn attribute_equals(self, field: impl Into<String>, value: Value) -> Self {
        self.condition(field, "equals", value)
    }

    pub fn attribute_gt(self, field: impl Into<String>, value: Value) -> Self {
        self.condition(field, "greaterThan", value)
    }

    pub fn attribute_gte(self, field: impl Into<String>, value: Value) -> Self {
        self.condition(field, "greaterThanOrEqual", value)
    }

    pub fn any_of(mut self, rules: Vec<Rule>) -> Self {
        self.rules.push(Rule::or(rules));
        self
    }

    pub fn all_of(mut self, rules: Vec<Rule>) -> Self {
        self.rules.push(Rule::and(rules));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The rule tree this builder describes. An empty builder yields an
    /// empty group, which the compiler rejects.
    pub fn rules(&self) -> Rule {
        if self.any {
            Rule::or(self.rules.clone())
        } else {
            Rule::and(self.rules.clone())
        }
    }

    pub fn build(self) -> Segment {
        let now = chrono::Utc::now();
        Segment {
            id: Uuid::new_v4(),
            rules: self.rules(),
            name: self.name,
            description: self.description,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults_to_and() {
        let segment = SegmentBuilder::new("Major donors")
            .description("Lifetime giving above 1000")
            .attribute_gt("totalAmount", json!(1000))
            .attribute_equals("status", json!("ACTIVE"))
            .tag("major")
            .build();

        assert_eq!(segment.name, "Major donors");
        assert_eq!(segment.tags, vec!["major".to_string()]);
        assert_eq!(
            serde_json::to_value(&segment.rules).unwrap(),
            json!({"and": [
                {"field": "totalAmount", "operator": "greaterThan", "value": 1000},
                {"field": "status", "operator": "equals", "value": "ACTIVE"}
            ]})
        );
    }

    #[test]
    fn test_builder_with_or_and_nested_group() {
        let rules = SegmentBuilder::new("At risk")
            .with_or()
            .attribute_equals("retentionRisk", json!("HIGH"))
            .all_of(vec![
                Rule::condition("totalGifts", "equals", json!(1)),
                Rule::condition("lastGiftDate", "lessThan", json!("2024-01-01")),
            ])
            .rules();

        match rules {
            Rule::Or { or } => {
                assert_eq!(or.len(), 2);
                assert!(matches!(&or[1], Rule::And { and } if and.len() == 2));
            }
            other => panic!("expected or group, got {other:?}"),
        }
    }
}
