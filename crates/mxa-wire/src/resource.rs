//! Resource catalogue and natural keys
//!
//! [`ResourceType`] names a backend object structure (asset, location, work
//! order) together with the wire facts every strategy needs about it.
//! [`ResourceKey`] identifies zero or more records by natural-key fields.

use crate::value::logical_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Site field shared by every site-scoped resource
pub const SITE_FIELD: &str = "siteid";

/// Backend resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Asset (`mxasset`)
    Asset,
    /// Location (`mxlocation`)
    Location,
    /// Work order (`mxwo`)
    WorkOrder,
    /// Any other object structure
    Custom(Box<CustomResource>),
}

/// Wire facts for a resource type outside the built-in catalogue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomResource {
    /// Object structure path segment, e.g. `mxperson`
    pub object_structure: String,
    /// Upper-cased wrapper used by action-style payloads
    pub bulk_name: String,
    /// Primary natural-key field
    pub primary_key: String,
    /// Monotonic id used for newest-first ordering
    pub sequence_field: String,
    /// Fields selected when the caller asks for none
    pub default_selection: Vec<String>,
}

impl ResourceType {
    /// Parse a resource tag (`asset`, `location`, `workorder`/`wo`)
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "asset" | "assets" | "mxasset" => Some(Self::Asset),
            "location" | "locations" | "mxlocation" => Some(Self::Location),
            "workorder" | "work_order" | "wo" | "mxwo" => Some(Self::WorkOrder),
            _ => None,
        }
    }

    /// Short tag for logs and reports
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Asset => "asset",
            Self::Location => "location",
            Self::WorkOrder => "workorder",
            Self::Custom(c) => &c.object_structure,
        }
    }

    /// Object structure path segment
    #[must_use]
    pub fn object_structure(&self) -> &str {
        match self {
            Self::Asset => "mxasset",
            Self::Location => "mxlocation",
            Self::WorkOrder => "mxwo",
            Self::Custom(c) => &c.object_structure,
        }
    }

    /// Wrapper key for action-style bulk payloads
    #[must_use]
    pub fn bulk_name(&self) -> &str {
        match self {
            Self::Asset => "ASSET",
            Self::Location => "LOCATIONS",
            Self::WorkOrder => "WORKORDER",
            Self::Custom(c) => &c.bulk_name,
        }
    }

    /// Primary natural-key field
    #[must_use]
    pub fn primary_key(&self) -> &str {
        match self {
            Self::Asset => "assetnum",
            Self::Location => "location",
            Self::WorkOrder => "wonum",
            Self::Custom(c) => &c.primary_key,
        }
    }

    /// Backend-assigned id that grows with every insert
    #[must_use]
    pub fn sequence_field(&self) -> &str {
        match self {
            Self::Asset => "assetid",
            Self::Location => "locationsid",
            Self::WorkOrder => "workorderid",
            Self::Custom(c) => &c.sequence_field,
        }
    }

    /// Fields returned when the caller does not select any
    #[must_use]
    pub fn default_selection(&self) -> Vec<&str> {
        match self {
            Self::Asset => vec!["assetnum", "description", "status", "assettype", "calnum"],
            Self::Location => vec!["location", "description", "status"],
            Self::WorkOrder => vec!["wonum", "description", "status", "worktype"],
            Self::Custom(c) => c.default_selection.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Value of one natural-key field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Point lookup
    Single(String),
    /// IN-list lookup
    Many(Vec<String>),
}

impl KeyValue {
    /// Parse comma-separated input; more than one value yields an IN-list
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.contains(',') {
            let values: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if values.len() == 1 {
                return Self::Single(values.into_iter().next().unwrap_or_default());
            }
            Self::Many(values)
        } else {
            Self::Single(raw.trim().to_string())
        }
    }

    /// All values, in order
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// The value of a point lookup
    #[inline]
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            Self::Many(_) => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.is_empty())
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(v) => f.write_str(v),
            Self::Many(vs) => write!(f, "[{}]", vs.join(",")),
        }
    }
}

/// Key construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// No usable natural-key value was supplied
    #[error("empty key value for field '{0}'")]
    EmptyValue(String),

    /// The same key field was given twice
    #[error("duplicate key field '{0}'")]
    DuplicateField(String),
}

/// Natural key of one or more backend records
///
/// Immutable once built; the consuming `with_*` methods are the only way
/// to add fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    resource: ResourceType,
    fields: Vec<(String, KeyValue)>,
}

impl ResourceKey {
    /// Key on the resource's primary field
    pub fn new(resource: ResourceType, value: KeyValue) -> Result<Self, KeyError> {
        let primary = resource.primary_key().to_string();
        Self::scoped(resource).with_field(&primary, value)
    }

    /// Key with no fields yet, e.g. a site-only search scope
    #[must_use]
    pub fn scoped(resource: ResourceType) -> Self {
        Self {
            resource,
            fields: Vec::new(),
        }
    }

    /// Parse caller input: comma-separated primary values plus optional site
    ///
    /// ```
    /// use mxa_wire::{KeyValue, ResourceKey, ResourceType};
    ///
    /// let key = ResourceKey::parse(ResourceType::Asset, "1001, 1002", Some("BEDFORD")).unwrap();
    /// assert_eq!(key.primary_value(), Some(&KeyValue::Many(vec!["1001".into(), "1002".into()])));
    /// assert_eq!(key.site(), Some("BEDFORD"));
    /// ```
    pub fn parse(resource: ResourceType, raw: &str, site: Option<&str>) -> Result<Self, KeyError> {
        let key = Self::new(resource, KeyValue::parse(raw))?;
        match site.map(str::trim).filter(|s| !s.is_empty()) {
            Some(site) => key.with_site(site),
            None => Ok(key),
        }
    }

    /// Add a key field
    pub fn with_field(mut self, name: &str, value: KeyValue) -> Result<Self, KeyError> {
        let name = logical_name(name);
        if value.is_empty() {
            return Err(KeyError::EmptyValue(name));
        }
        if self.fields.iter().any(|(n, _)| *n == name) {
            return Err(KeyError::DuplicateField(name));
        }
        self.fields.push((name, value));
        Ok(self)
    }

    /// Add the site scope
    pub fn with_site(self, site: &str) -> Result<Self, KeyError> {
        self.with_field(SITE_FIELD, KeyValue::Single(site.trim().to_string()))
    }

    /// Resource type
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    /// Key fields in order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[(String, KeyValue)] {
        &self.fields
    }

    /// Value of a key field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&KeyValue> {
        let name = logical_name(name);
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Value of the primary natural-key field
    #[must_use]
    pub fn primary_value(&self) -> Option<&KeyValue> {
        self.field(self.resource.primary_key())
    }

    /// Site scope, if any
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        self.field(SITE_FIELD).and_then(KeyValue::as_single)
    }

    /// True when every key field is a single value
    #[must_use]
    pub fn is_point(&self) -> bool {
        !self.fields.is_empty() && self.fields.iter().all(|(_, v)| v.as_single().is_some())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_catalogue() {
        assert_eq!(ResourceType::Asset.object_structure(), "mxasset");
        assert_eq!(ResourceType::Location.bulk_name(), "LOCATIONS");
        assert_eq!(ResourceType::WorkOrder.primary_key(), "wonum");
        assert_eq!(ResourceType::from_tag("WO"), Some(ResourceType::WorkOrder));
        assert_eq!(ResourceType::from_tag("pump"), None);
    }

    #[test]
    fn custom_resource_carries_its_wire_facts() {
        let person = ResourceType::Custom(Box::new(CustomResource {
            object_structure: "mxperson".into(),
            bulk_name: "PERSON".into(),
            primary_key: "personid".into(),
            sequence_field: "personuid".into(),
            default_selection: vec!["personid".into(), "displayname".into()],
        }));
        assert_eq!(person.tag(), "mxperson");
        assert_eq!(person.default_selection(), vec!["personid", "displayname"]);
    }

    #[test]
    fn key_value_parse() {
        assert_eq!(KeyValue::parse(" 13150 "), KeyValue::Single("13150".into()));
        assert_eq!(
            KeyValue::parse("A1, A2 ,A3"),
            KeyValue::Many(vec!["A1".into(), "A2".into(), "A3".into()])
        );
        assert_eq!(KeyValue::parse("A1,"), KeyValue::Single("A1".into()));
    }

    #[test]
    fn key_parse_with_site() {
        let key = ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD")).unwrap();
        assert!(key.is_point());
        assert_eq!(key.site(), Some("BEDFORD"));
        assert_eq!(key.to_string(), "asset assetnum=13150 siteid=BEDFORD");
    }

    #[test]
    fn key_rejects_empty_and_duplicate_fields() {
        assert_eq!(
            ResourceKey::parse(ResourceType::Asset, "  ", None),
            Err(KeyError::EmptyValue("assetnum".into()))
        );
        let key = ResourceKey::parse(ResourceType::Asset, "1", Some("A")).unwrap();
        assert_eq!(
            key.with_site("B"),
            Err(KeyError::DuplicateField("siteid".into()))
        );
    }

    #[test]
    fn scoped_key_is_not_a_point_lookup() {
        let scope = ResourceKey::scoped(ResourceType::Asset);
        assert!(!scope.is_point());
        assert!(scope.primary_value().is_none());
    }
}
