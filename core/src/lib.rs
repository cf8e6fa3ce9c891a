pub mod capabilities;
pub mod chain;
pub mod config;
pub mod error;
pub mod feature;
pub mod index;
pub mod mapping;
pub mod name;
pub mod splitter;
pub mod unmapping;
pub mod value;
pub mod xpath;

pub use capabilities::FilterCapabilities;
pub use chain::{ChainResolution, FeatureChainResolver, FeatureChainedAttributeDescriptor};
pub use config::SplitterConfig;
pub use error::{Error, ErrorKind, Result};
pub use index::{combine_with_id_filter, IndexedAttributes, IndexedFilterDetection, IndexedFilterDetector};
pub use mapping::{FeatureTypeMapping, FeatureTypeMappingBuilder, InMemoryRegistry, MappingRegistry};
pub use splitter::{ComplexFilterSplitter, SplitFilter};
pub use unmapping::UnmappingVisitor;
pub use xpath::{Step, StepList, XPathWriter};

pub use appschema_filter as filter;

#[cfg(test)]
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).with_test_writer().try_init(); }
