use tracing::Level;

use appschema::core::feature::{AttributeDescriptor, AttributeType, Binding, GeometryBinding};
use appschema::core::name::{Namespaces, QName, GML_NS};
use appschema::{FeatureTypeMapping, FeatureTypeMappingBuilder, Filter, InMemoryRegistry, StepList};
use std::sync::Arc;

pub const GSML: &str = "urn:cgi:xmlns:CGI:GeoSciML:2.0";

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init(); }

#[allow(unused)]
pub fn namespaces() -> Namespaces { Namespaces::new().with("gml", GML_NS).with("gsml", GSML) }

pub fn string() -> Arc<AttributeType> { Arc::new(AttributeType::simple(QName::local("string"), Binding::String)) }

pub fn gsml(local: &str, attr_type: Arc<AttributeType>) -> AttributeDescriptor { AttributeDescriptor::new(QName::new(GSML, local).with_prefix("gsml"), attr_type) }

pub fn gml(local: &str, attr_type: Arc<AttributeType>) -> AttributeDescriptor { AttributeDescriptor::new(QName::new(GML_NS, local).with_prefix("gml"), attr_type) }

fn complex(local: &str, descriptors: Vec<AttributeDescriptor>) -> Arc<AttributeType> { Arc::new(AttributeType::complex(QName::new(GSML, local), descriptors)) }

fn builder(target: AttributeDescriptor, source: &str) -> FeatureTypeMappingBuilder { FeatureTypeMappingBuilder::new(target, source).namespace("gml", GML_NS) }

/// MappedFeature types and mappings:
///
/// ```text
/// MappedFeature -(gsml:specification, joining)-> GeologicUnit -(gsml:composition, not joining)-> CompositionPart
/// MappedFeature -(gsml:interpretation, conditional on gsml:observationMethod)-> GeologicUnit
/// ```
#[allow(unused)]
pub struct Fixture {
    pub registry: InMemoryRegistry,
    pub mapped_feature: Arc<FeatureTypeMapping>,
    pub geologic_unit: Arc<FeatureTypeMapping>,
}

#[allow(unused)]
impl Fixture {
    pub fn new() -> Self {
        let registry = InMemoryRegistry::new();

        let part_type = complex("CompositionPartType", vec![gsml("proportion", string()), gsml("role", string())]);
        registry.register(builder(gsml("CompositionPart", part_type.clone()), "COMPOSITION_PART").id("ID").attribute("gsml:proportion", "PROPORTION").build().unwrap());

        let unit_type = complex(
            "GeologicUnitType",
            vec![
                gml("name", string()).occurs(0, None),
                gsml("purpose", string()),
                gsml("occurrence", complex("OccurrencePropertyType", vec![])).occurs(0, None),
                gsml("composition", complex("CompositionPartPropertyType", vec![gsml("CompositionPart", part_type)])).occurs(0, None),
            ],
        );
        let geologic_unit = registry.register(
            builder(gsml("GeologicUnit", unit_type.clone()), "GEOLOGIC_UNIT")
                .id("ID")
                .attribute("gml:name", "NAME")
                .attribute("gsml:purpose", "PURPOSE")
                .configure("gsml:occurrence", |m| m.client_property("xlink:href", "OCCURRENCE_URI"))
                .nested("gsml:composition", "ID", "gsml:CompositionPart", "UNIT_ID", false)
                .build()
                .unwrap(),
        );

        let shape = Arc::new(AttributeType::geometry(QName::new(GML_NS, "GeometryPropertyType"), GeometryBinding::Geometry, Some("EPSG:4283".into())));
        let feature_type = complex(
            "MappedFeatureType",
            vec![
                gml("name", string()).occurs(0, None),
                gsml("observationMethod", string()),
                gsml("specification", complex("SpecificationPropertyType", vec![gsml("GeologicUnit", unit_type.clone())])),
                gsml("interpretation", complex("InterpretationPropertyType", vec![gsml("GeologicUnit", unit_type)])),
                gsml("shape", shape),
                gsml("remarks", string()),
            ],
        );
        let mapped_feature = registry.register(
            builder(gsml("MappedFeature", feature_type), "MAPPED_FEATURE")
                .id("MF_ID")
                .attribute("gml:name", "NAME")
                .attribute("gsml:observationMethod", "OBSERVATION_METHOD")
                .attribute("gsml:shape", "SHAPE")
                .default_geometry("gsml:shape")
                .nested("gsml:specification", "UNIT_ID", "gsml:GeologicUnit", "ID", true)
                .conditional_nested(
                    "gsml:interpretation",
                    "UNIT_ID",
                    "if_then_else(equalTo(gsml:observationMethod, 'survey'), 'gsml:GeologicUnit', 'gsml:Unknown')",
                    "ID",
                    true,
                )
                .build()
                .unwrap(),
        );

        Self { registry, mapped_feature, geologic_unit }
    }

    pub fn path(&self, xpath: &str) -> StepList { self.mapped_feature.steps(xpath).unwrap() }
}

#[allow(unused)]
pub fn filter(text: &str) -> Filter { appschema::parse_filter(text).unwrap() }
