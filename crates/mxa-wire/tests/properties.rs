use mxa_wire::{
    FieldNormalizer, FilterBuilder, KeyValue, ResourceKey, ResourceType, WireConvention, WireRecord,
};
use proptest::prelude::*;
use serde_json::Value;

/// Parse `field="value"` back into its parts
fn parse_term(expr: &str) -> Option<(&str, &str)> {
    let (field, quoted) = expr.split_once('=')?;
    let value = quoted.strip_prefix('"')?.strip_suffix('"')?;
    Some((field, value))
}

fn flip_case(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn prop_single_field_filter_round_trips(
        value in "[A-Za-z0-9][A-Za-z0-9 ._-]{0,20}[A-Za-z0-9]",
        namespaced in any::<bool>(),
    ) {
        let convention = if namespaced {
            WireConvention::Namespaced
        } else {
            WireConvention::Plain
        };
        let key = ResourceKey::new(ResourceType::Asset, KeyValue::Single(value.clone())).unwrap();
        let expr = FilterBuilder::new(FieldNormalizer::default()).build(convention, &key);

        let (field, parsed) = parse_term(&expr).unwrap();
        let field = if namespaced { field.strip_prefix("spi:").unwrap() } else { field };
        prop_assert_eq!(field, "assetnum");
        prop_assert_eq!(parsed, value.as_str());
    }

    #[test]
    fn prop_from_wire_finds_either_spelling_in_any_case(
        name in "[a-z][a-z0-9]{0,15}",
        value in "[ -~]{0,20}",
        namespaced in any::<bool>(),
        mask in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        let normalizer = FieldNormalizer::default();
        let wire_key = if namespaced { format!("spi:{name}") } else { name.clone() };

        let mut record = WireRecord::new();
        record.insert(flip_case(&wire_key, &mask), Value::String(value.clone()));

        prop_assert_eq!(normalizer.from_wire(&record, &name), Some(&Value::String(value)));
    }

    #[test]
    fn prop_in_list_keeps_every_value_in_order(
        values in proptest::collection::vec("[A-Z0-9]{1,8}", 2..6),
    ) {
        let raw = values.join(", ");
        let key = ResourceKey::parse(ResourceType::Location, &raw, None).unwrap();
        let expr = FilterBuilder::default().build(WireConvention::Plain, &key);
        let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
        prop_assert_eq!(expr, format!("location in [{}]", quoted.join(",")));
    }
}

#[test]
fn lookup_order_is_fixed() {
    use mxa_wire::{LookupRule, LOOKUP_ORDER};
    assert_eq!(
        LOOKUP_ORDER,
        [
            LookupRule::Exact,
            LookupRule::Namespaced,
            LookupRule::ExactIgnoreCase,
            LookupRule::NamespacedIgnoreCase,
        ]
    );
}
