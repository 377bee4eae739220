//! Field normalizer
//!
//! Bidirectional mapping between a logical field name and the wire
//! spellings a backend may use for it. Reading follows a fixed lookup
//! table ([`LOOKUP_ORDER`]); the first rule that matches wins, so when a
//! record carries several ambiguous spellings the surfaced one is always
//! the same.

use crate::value::{logical_name, FieldSet, FieldValue, WireRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace token used by the OSLC wire convention
pub const DEFAULT_NAMESPACE: &str = "spi:";

/// Wire keys that describe the record rather than hold one of its fields
const RECORD_METADATA_KEYS: &[&str] = &["href", "localref", "about"];

/// How a wire convention spells field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireConvention {
    /// `spi:status`
    Namespaced,
    /// `status`
    Plain,
    /// `STATUS`
    UpperCase,
    /// `status`, forced lower-case
    LowerCase,
}

/// One step of the read lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupRule {
    /// Exact logical name
    Exact,
    /// Namespace-prefixed name
    Namespaced,
    /// Case-insensitive logical name
    ExactIgnoreCase,
    /// Case-insensitive namespace-prefixed name
    NamespacedIgnoreCase,
}

/// Fixed read order; must not be reordered
pub const LOOKUP_ORDER: [LookupRule; 4] = [
    LookupRule::Exact,
    LookupRule::Namespaced,
    LookupRule::ExactIgnoreCase,
    LookupRule::NamespacedIgnoreCase,
];

/// Field normalizer bound to one namespace token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNormalizer {
    namespace: String,
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl FieldNormalizer {
    /// Create normalizer for a namespace token such as `spi:`
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Namespace token
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Candidate wire names for a logical field, in priority order
    #[must_use]
    pub fn to_wire(&self, convention: WireConvention, logical: &str) -> Vec<String> {
        let name = self.bare(logical);
        match convention {
            WireConvention::Namespaced => {
                vec![format!("{}{name}", self.namespace), name.to_string()]
            }
            WireConvention::Plain => vec![name.to_string()],
            WireConvention::UpperCase => vec![name.to_ascii_uppercase()],
            WireConvention::LowerCase => vec![name.to_ascii_lowercase()],
        }
    }

    /// Preferred wire name for a logical field
    #[must_use]
    pub fn wire_name(&self, convention: WireConvention, logical: &str) -> String {
        self.to_wire(convention, logical)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Find a logical field in a wire record
    ///
    /// Returns the matching wire key alongside its value; `None` means the
    /// backend omitted the field, which is not an error.
    #[must_use]
    pub fn lookup<'a>(
        &self,
        record: &'a WireRecord,
        logical: &str,
    ) -> Option<(&'a str, &'a Value)> {
        let name = self.bare(logical);
        let prefixed = format!("{}{name}", self.namespace);

        LOOKUP_ORDER.iter().find_map(|rule| match rule {
            LookupRule::Exact => find_exact(record, name),
            LookupRule::Namespaced => find_exact(record, &prefixed),
            LookupRule::ExactIgnoreCase => find_ignore_case(record, name),
            LookupRule::NamespacedIgnoreCase => find_ignore_case(record, &prefixed),
        })
    }

    /// Value of a logical field in a wire record
    #[must_use]
    pub fn from_wire<'a>(&self, record: &'a WireRecord, logical: &str) -> Option<&'a Value> {
        self.lookup(record, logical).map(|(_, v)| v)
    }

    /// Value of a logical field as a [`FieldValue`]
    #[must_use]
    pub fn value_of(&self, record: &WireRecord, logical: &str) -> Option<FieldValue> {
        self.from_wire(record, logical).map(FieldValue::from_json)
    }

    /// Logical view of a wire record
    ///
    /// With a selection, only those fields are extracted (absent fields are
    /// skipped). Without one, every scalar field is kept with its namespace
    /// stripped; foreign-prefixed keys, `_`-prefixed bookkeeping and nested
    /// child collections are dropped.
    #[must_use]
    pub fn normalize_record(&self, record: &WireRecord, selection: Option<&[String]>) -> FieldSet {
        let mut set = FieldSet::new();

        if let Some(fields) = selection {
            for field in fields {
                if let Some(value) = self.value_of(record, field) {
                    set.insert(field, value);
                }
            }
            return set;
        }

        for (key, value) in record {
            if value.is_object() || value.is_array() {
                continue;
            }
            let Some(name) = self.logical_from_wire(key) else {
                continue;
            };
            if set.contains(&name) {
                continue;
            }
            if let Some(value) = self.value_of(record, &name) {
                set.insert(&name, value);
            }
        }
        set
    }

    /// Logical name for a wire key, or `None` for metadata keys
    fn logical_from_wire(&self, key: &str) -> Option<String> {
        let stripped = strip_prefix_ignore_case(key, &self.namespace).unwrap_or(key);
        if stripped.contains(':') || stripped.starts_with('_') {
            return None;
        }
        let name = logical_name(stripped);
        if RECORD_METADATA_KEYS.contains(&name.as_str()) {
            return None;
        }
        Some(name)
    }

    /// Strip this normalizer's namespace from a name, if present
    fn bare<'a>(&self, name: &'a str) -> &'a str {
        let name = name.trim();
        strip_prefix_ignore_case(name, &self.namespace).unwrap_or(name)
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() || name.len() < prefix.len() || !name.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = name.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

fn find_exact<'a>(record: &'a WireRecord, name: &str) -> Option<(&'a str, &'a Value)> {
    record
        .iter()
        .find(|(k, _)| k.as_str() == name)
        .map(|(k, v)| (k.as_str(), v))
}

fn find_ignore_case<'a>(record: &'a WireRecord, name: &str) -> Option<(&'a str, &'a Value)> {
    record
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(k, v)| (k.as_str(), v))
}
