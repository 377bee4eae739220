//! Envelope reader
//!
//! Read responses nest matching records under one of two envelope keys,
//! depending on the API family. Create responses are less regular still;
//! [`extract_generated_key`] digs the backend-assigned identifier out of
//! whichever shape came back.

use crate::normalizer::FieldNormalizer;
use crate::resource::ResourceType;
use crate::value::WireRecord;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde_json::Value;

/// Envelope keys, in the order they are tried
pub const MEMBER_KEYS: [&str; 2] = ["member", "rdfs:member"];

/// Keys carrying a record's canonical resource URI
pub const RESOURCE_URI_KEYS: [&str; 2] = ["href", "rdf:about"];

/// Placeholder the backend uses for a not-yet-assigned key
const UNASSIGNED: &str = "*";

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Envelope errors
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Body is not valid JSON
    #[error("response body is not valid JSON: {0}")]
    ParseFailure(#[from] serde_json::Error),
}

/// Parse a response body; an empty body parses as `Value::Null`
pub fn parse_body(body: &[u8]) -> Result<Value, EnvelopeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Extract the records of a read response
///
/// A body without any envelope key means "no matching records".
pub fn extract_members(body: &[u8]) -> Result<Vec<WireRecord>, EnvelopeError> {
    Ok(members_of(&parse_body(body)?))
}

/// Records under the first envelope key present in a parsed body
///
/// Presence decides: an empty `member` array is not skipped in favour of
/// `rdfs:member`. Non-object entries are ignored.
#[must_use]
pub fn members_of(value: &Value) -> Vec<WireRecord> {
    MEMBER_KEYS
        .iter()
        .find_map(|key| value.get(key))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default()
}

/// Canonical resource URI of a record, if it carries one
#[must_use]
pub fn resource_uri(record: &WireRecord) -> Option<&str> {
    RESOURCE_URI_KEYS
        .iter()
        .find_map(|key| record.get(*key))
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
}

/// Decode the key segments embedded in a resource URI
///
/// The backend encodes `pk/site` as a path segment `_<base64>--`.
#[must_use]
pub fn decode_resource_uri(uri: &str) -> Option<Vec<String>> {
    uri.split(['/', '?'])
        .filter_map(|segment| segment.strip_prefix('_')?.strip_suffix("--"))
        .find_map(decode_segment)
}

fn decode_segment(encoded: &str) -> Option<Vec<String>> {
    let bytes = STANDARD_LENIENT
        .decode(encoded)
        .or_else(|_| URL_SAFE_LENIENT.decode(encoded))
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    Some(text.split('/').map(str::to_string).collect())
}

/// Backend-generated primary key from a create response
///
/// Looks, in order, at the top-level record, the first envelope member,
/// the first entry of the upper-cased bulk wrapper, a top-level array and
/// finally the encoded resource URI.
#[must_use]
pub fn extract_generated_key(
    body: &Value,
    resource: &ResourceType,
    normalizer: &FieldNormalizer,
) -> Option<String> {
    let primary = resource.primary_key();
    let from_record = |record: &WireRecord| {
        normalizer
            .from_wire(record, primary)
            .and_then(scalar_text)
    };

    let candidates = [
        body.as_object().and_then(from_record),
        members_of(body).first().and_then(from_record),
        body.get(resource.bulk_name())
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_object)
            .and_then(from_record),
        body.as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_object)
            .and_then(from_record),
        body.as_object()
            .and_then(resource_uri)
            .and_then(decode_resource_uri)
            .and_then(|parts| parts.into_iter().next()),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|key| !key.is_empty() && key != UNASSIGNED)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(body: &Value) -> Option<String> {
        extract_generated_key(body, &ResourceType::Asset, &FieldNormalizer::default())
    }

    #[test]
    fn members_under_either_envelope() {
        let plain = br#"{"member": [{"assetnum": "1"}, {"assetnum": "2"}]}"#;
        let rdf = br#"{"rdfs:member": [{"spi:assetnum": "3"}]}"#;
        assert_eq!(extract_members(plain).unwrap().len(), 2);
        assert_eq!(extract_members(rdf).unwrap()[0]["spi:assetnum"], json!("3"));
    }

    #[test]
    fn missing_envelope_is_empty_not_error() {
        assert!(extract_members(br#"{"responseInfo": {}}"#).unwrap().is_empty());
        assert!(extract_members(b"").unwrap().is_empty());
        assert!(extract_members(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn present_empty_member_wins() {
        let body = json!({"member": [], "rdfs:member": [{"x": 1}]});
        assert!(members_of(&body).is_empty());
    }

    #[test]
    fn invalid_body_is_parse_failure() {
        assert!(matches!(
            extract_members(b"<html>502</html>"),
            Err(EnvelopeError::ParseFailure(_))
        ));
    }

    #[test]
    fn generated_key_top_level_spellings() {
        assert_eq!(key(&json!({"assetnum": "1001"})).as_deref(), Some("1001"));
        assert_eq!(key(&json!({"ASSETNUM": "1002"})).as_deref(), Some("1002"));
        assert_eq!(key(&json!({"spi:assetnum": "1003"})).as_deref(), Some("1003"));
    }

    #[test]
    fn generated_key_from_wrappers() {
        assert_eq!(key(&json!({"member": [{"assetnum": "2001"}]})).as_deref(), Some("2001"));
        assert_eq!(key(&json!({"ASSET": [{"ASSETNUM": "2002"}]})).as_deref(), Some("2002"));
        assert_eq!(key(&json!([{"assetnum": "2003"}])).as_deref(), Some("2003"));
    }

    #[test]
    fn generated_key_from_resource_uri() {
        // "13150/BEDFORD"
        let body =
            json!({"rdf:about": "https://host/maximo/oslc/os/mxasset/_MTMxNTAvQkVERk9SRA--"});
        assert_eq!(key(&body).as_deref(), Some("13150"));
    }

    #[test]
    fn unassigned_placeholder_is_rejected() {
        // "*/BEDFORD"
        let body = json!({"assetnum": "*", "href": "https://host/mxasset/_Ki9CRURGT1JE--"});
        assert_eq!(key(&body), None);
        assert_eq!(key(&json!({"responseInfo": {}})), None);
    }

    #[test]
    fn resource_uri_prefers_href() {
        let record = json!({"rdf:about": "b", "href": "a"});
        assert_eq!(resource_uri(record.as_object().unwrap()), Some("a"));
    }
}
