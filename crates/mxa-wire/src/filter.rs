//! Filter builder
//!
//! Renders natural keys and search criteria into the backend's textual
//! where-clause dialect:
//!
//! ```text
//! assetnum="13150" and siteid="BEDFORD"
//! spi:assetnum in ["A1","A2"]
//! ```
//!
//! Values are wrapped in double quotes verbatim. Embedded quotes are not
//! escaped; the backend dialect defines no escape sequence.

use crate::normalizer::{FieldNormalizer, WireConvention};
use crate::resource::{KeyValue, ResourceKey};
use crate::value::{logical_name, FieldSet, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Conjunction keyword
pub const AND: &str = " and ";

/// One search condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Condition {
    /// `field="value"`
    Equals(String),
    /// `field like "val%"`; `*` in the caller's pattern becomes `%`
    Like(String),
    /// `field=3`
    Number(Number),
    /// `field=true`
    Bool(bool),
    /// `field in ["a","b"]`
    In(Vec<String>),
    /// `field is null`
    IsNull,
}

/// Ordered search criteria for list queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    conditions: Vec<(String, Condition)>,
    raw: Option<String>,
}

impl SearchCriteria {
    /// Empty criteria (match everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass a where-clause through verbatim to every strategy
    #[must_use]
    pub fn raw(clause: impl Into<String>) -> Self {
        Self {
            conditions: Vec::new(),
            raw: Some(clause.into()),
        }
    }

    /// Add a condition
    #[must_use]
    pub fn with(mut self, field: &str, condition: Condition) -> Self {
        self.conditions.push((logical_name(field), condition));
        self
    }

    /// Add an equality (or wildcard) condition on text
    #[must_use]
    pub fn eq(self, field: &str, value: &str) -> Self {
        let condition = if value.contains('*') {
            Condition::Like(value.to_string())
        } else {
            Condition::Equals(value.to_string())
        };
        self.with(field, condition)
    }

    /// Derive criteria from a field set, one condition per field
    #[must_use]
    pub fn from_fields(fields: &FieldSet) -> Self {
        fields.iter().fold(Self::new(), |criteria, (name, value)| match value {
            FieldValue::Text(text) => criteria.eq(name, text),
            FieldValue::Number(n) => criteria.with(name, Condition::Number(n.clone())),
            FieldValue::Bool(b) => criteria.with(name, Condition::Bool(*b)),
            FieldValue::Null => criteria.with(name, Condition::IsNull),
        })
    }

    /// Conditions in order
    #[inline]
    #[must_use]
    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    /// Check if nothing constrains the search
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.raw.as_deref().map_or(true, |r| r.trim().is_empty())
    }
}

/// Renders filter expressions for a wire convention
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterBuilder {
    normalizer: FieldNormalizer,
}

impl FilterBuilder {
    /// Create builder sharing a normalizer's namespace
    #[must_use]
    pub fn new(normalizer: FieldNormalizer) -> Self {
        Self { normalizer }
    }

    /// Where-clause for a natural key
    #[must_use]
    pub fn build(&self, convention: WireConvention, key: &ResourceKey) -> String {
        key.fields()
            .iter()
            .map(|(name, value)| self.key_term(convention, name, value))
            .collect::<Vec<_>>()
            .join(AND)
    }

    /// Where-clause for search criteria; `None` when nothing constrains it
    #[must_use]
    pub fn build_criteria(
        &self,
        convention: WireConvention,
        criteria: &SearchCriteria,
    ) -> Option<String> {
        if let Some(raw) = criteria.raw.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            return Some(raw.to_string());
        }
        if criteria.conditions.is_empty() {
            return None;
        }
        Some(
            criteria
                .conditions
                .iter()
                .map(|(name, condition)| self.condition_term(convention, name, condition))
                .collect::<Vec<_>>()
                .join(AND),
        )
    }

    /// Field name as it must appear in a filter
    ///
    /// Only the namespaced convention prefixes; every other convention
    /// filters on plain names, including the upper-cased action payloads.
    #[must_use]
    pub fn field_name(&self, convention: WireConvention, logical: &str) -> String {
        match convention {
            WireConvention::Namespaced => self.normalizer.wire_name(convention, logical),
            _ => self.normalizer.wire_name(WireConvention::Plain, logical),
        }
    }

    fn key_term(&self, convention: WireConvention, name: &str, value: &KeyValue) -> String {
        let field = self.field_name(convention, name);
        match value {
            KeyValue::Single(v) => format!("{field}={}", quote(v)),
            KeyValue::Many(vs) => format!("{field} in {}", quote_list(vs)),
        }
    }

    fn condition_term(
        &self,
        convention: WireConvention,
        name: &str,
        condition: &Condition,
    ) -> String {
        let field = self.field_name(convention, name);
        match condition {
            Condition::Equals(v) => format!("{field}={}", quote(v)),
            Condition::Like(v) => format!("{field} like {}", quote(&v.replace('*', "%"))),
            Condition::Number(n) => format!("{field}={n}"),
            Condition::Bool(b) => format!("{field}={b}"),
            Condition::In(vs) => format!("{field} in {}", quote_list(vs)),
            Condition::IsNull => format!("{field} is null"),
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

fn quote_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", quoted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    #[test]
    fn single_key_plain() {
        let key = ResourceKey::parse(ResourceType::Asset, "13150", None).unwrap();
        assert_eq!(builder().build(WireConvention::Plain, &key), r#"assetnum="13150""#);
    }

    #[test]
    fn key_with_site_namespaced() {
        let key = ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD")).unwrap();
        assert_eq!(
            builder().build(WireConvention::Namespaced, &key),
            r#"spi:assetnum="13150" and spi:siteid="BEDFORD""#
        );
    }

    #[test]
    fn multi_value_key_becomes_in_list() {
        let key = ResourceKey::parse(ResourceType::Location, "L1, L2", None).unwrap();
        assert_eq!(
            builder().build(WireConvention::Plain, &key),
            r#"location in ["L1","L2"]"#
        );
    }

    #[test]
    fn upper_case_convention_filters_on_plain_names() {
        let key = ResourceKey::parse(ResourceType::Asset, "7", Some("S")).unwrap();
        assert_eq!(
            builder().build(WireConvention::UpperCase, &key),
            r#"assetnum="7" and siteid="S""#
        );
    }

    #[test]
    fn embedded_quotes_are_not_escaped() {
        let key = ResourceKey::parse(ResourceType::Asset, r#"A"B"#, None).unwrap();
        assert_eq!(builder().build(WireConvention::Plain, &key), r#"assetnum="A"B""#);
    }

    #[test]
    fn criteria_render_every_condition_kind() {
        let criteria = SearchCriteria::new()
            .eq("status", "ACTIVE")
            .eq("description", "Pump*")
            .with("priority", Condition::Number(Number::from(2)))
            .with("isrunning", Condition::Bool(true))
            .with("assettype", Condition::In(vec!["A".into(), "B".into()]))
            .with("location", Condition::IsNull);
        assert_eq!(
            builder().build_criteria(WireConvention::Namespaced, &criteria).unwrap(),
            concat!(
                r#"spi:status="ACTIVE" and spi:description like "Pump%" and spi:priority=2"#,
                r#" and spi:isrunning=true and spi:assettype in ["A","B"] and spi:location is null"#
            )
        );
    }

    #[test]
    fn empty_criteria_build_nothing() {
        assert!(SearchCriteria::new().is_empty());
        assert_eq!(builder().build_criteria(WireConvention::Plain, &SearchCriteria::new()), None);
    }

    #[test]
    fn raw_criteria_pass_through() {
        let criteria = SearchCriteria::raw(r#"status="OPERATING""#);
        assert_eq!(
            builder().build_criteria(WireConvention::Namespaced, &criteria).as_deref(),
            Some(r#"status="OPERATING""#)
        );
    }

    #[test]
    fn criteria_from_fields() {
        let fields = FieldSet::new().with("status", "ACTIVE").with("location", FieldValue::Null);
        let criteria = SearchCriteria::from_fields(&fields);
        assert_eq!(criteria.conditions().len(), 2);
        assert_eq!(criteria.conditions()[1], ("location".to_string(), Condition::IsNull));
    }
}
