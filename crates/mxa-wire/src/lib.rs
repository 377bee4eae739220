//! mxa-wire - record data model and wire codecs
//!
//! The leaf layer of mxaccess. Nothing here performs I/O:
//! - [`FieldSet`] / [`FieldValue`]: caller-facing logical records
//! - [`ResourceType`] / [`ResourceKey`]: what to address and by which natural key
//! - [`FieldNormalizer`]: logical name ⇄ wire spellings, fixed lookup order
//! - [`FilterBuilder`]: natural keys and criteria as where-clauses
//! - [`envelope`]: record extraction from response bodies
//!
//! # Example
//!
//! ```
//! use mxa_wire::{FieldNormalizer, FilterBuilder, ResourceKey, ResourceType, WireConvention};
//!
//! let key = ResourceKey::parse(ResourceType::Asset, "13150", Some("BEDFORD")).unwrap();
//! let filter = FilterBuilder::new(FieldNormalizer::default());
//! assert_eq!(
//!     filter.build(WireConvention::Namespaced, &key),
//!     r#"spi:assetnum="13150" and spi:siteid="BEDFORD""#
//! );
//! ```

pub mod envelope;
pub mod filter;
pub mod normalizer;
pub mod resource;
pub mod value;

pub use envelope::{
    decode_resource_uri, extract_generated_key, extract_members, members_of, parse_body,
    resource_uri, EnvelopeError, MEMBER_KEYS,
};
pub use filter::{Condition, FilterBuilder, SearchCriteria};
pub use normalizer::{FieldNormalizer, LookupRule, WireConvention, DEFAULT_NAMESPACE, LOOKUP_ORDER};
pub use resource::{CustomResource, KeyError, KeyValue, ResourceKey, ResourceType, SITE_FIELD};
pub use value::{logical_name, FieldSet, FieldSetError, FieldValue, WireRecord};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with wire types
    pub use crate::{
        FieldNormalizer, FieldSet, FieldValue, FilterBuilder, KeyValue, ResourceKey, ResourceType,
        SearchCriteria, WireConvention, WireRecord,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
