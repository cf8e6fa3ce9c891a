//! # appschema
//!
//! Query support for complex features published through a schema mapping. A complex feature is a nested,
//! schema-defined structure assembled from flat source records; filters are written against the published
//! structure and must be translated before a data source can evaluate them.
//!
//! ## Key pieces
//!
//! - **Filter splitting**: [`ComplexFilterSplitter`] divides a filter into a *pre* part the source evaluates natively
//!   (already rewritten in source terms) and a *post* part evaluated in memory on the assembled features.
//! - **Feature chaining**: [`FeatureChainResolver`] follows nested attribute mappings across feature types to find
//!   which mapping, through which joins, provides a given attribute.
//! - **Unmapping**: [`UnmappingVisitor`] rewrites target property references into their source expressions.
//! - **Indexes**: [`IndexedFilterDetector`] finds the part of a filter an attribute index can answer, and
//!   [`combine_with_id_filter`] substitutes the index results back into the filter.
//! - **Assembly**: [`XPathWriter`] assigns values along location paths when building features.
//!
//! ## Example
//!
//! ```rust
//! # use appschema::{core::feature::{AttributeDescriptor, AttributeType, Binding}, core::name::QName};
//! # use appschema::{FeatureTypeMappingBuilder, FilterCapabilities, InMemoryRegistry};
//! # use std::sync::Arc;
//! # fn main() -> Result<(), appschema::Error> {
//! let string = Arc::new(AttributeType::simple(QName::local("string"), Binding::String));
//! let road_type = AttributeType::complex(QName::new("urn:x", "RoadType"), vec![AttributeDescriptor::new(QName::new("urn:x", "name"), string)]);
//! let road = AttributeDescriptor::new(QName::new("urn:x", "Road").with_prefix("x"), Arc::new(road_type));
//!
//! let registry = InMemoryRegistry::new();
//! let mapping = registry.register(FeatureTypeMappingBuilder::new(road, "ROADS").id("ROAD_ID").attribute("x:name", "NAME").build()?);
//!
//! let split = appschema::split(&mapping, &registry, &FilterCapabilities::simple_comparisons(), "x:name = 'A1'")?;
//! assert_eq!(split.pre.to_string(), "NAME = 'A1'");
//! # Ok(())
//! # }
//! ```

pub use appschema_core as core;
pub use appschema_filter as filter;

pub use appschema_core::{
    combine_with_id_filter, ChainResolution, ComplexFilterSplitter, Error, ErrorKind, FeatureChainResolver, FeatureTypeMapping,
    FeatureTypeMappingBuilder, FilterCapabilities, InMemoryRegistry, IndexedAttributes, IndexedFilterDetection, IndexedFilterDetector,
    MappingRegistry, Result, SplitFilter, SplitterConfig, StepList, UnmappingVisitor, XPathWriter,
};
pub use appschema_filter::{parse_expr, parse_filter, Expr, Filter};

use std::sync::Arc;
use tracing::debug;

/// Parses `cql` and splits it against `mapping` with the process-wide [`SplitterConfig`].
pub fn split(mapping: &Arc<FeatureTypeMapping>, registry: &dyn MappingRegistry, capabilities: &FilterCapabilities, cql: &str) -> Result<SplitFilter> {
    let filter = parse_filter(cql)?;
    debug!("splitting {} against {}", filter, mapping.name());
    ComplexFilterSplitter::new(mapping, registry, capabilities).split(&filter)
}
