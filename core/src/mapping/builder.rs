use crate::error::{Error, Result};
use crate::feature::{AttributeDescriptor, AttributeType};
use crate::mapping::{AttributeMapping, FeatureTypeMapping, MappingKind, NestedAttributeMapping, NestedExpressionFactory, NestedTypeSelector};
use crate::name::{Namespaces, QName};
use appschema_filter::ast::Expr;
use appschema_filter::parse_expr;
use indexmap::IndexMap;
use std::sync::Arc;

/// Text form of one attribute mapping; expressions are CQL and paths are prefixed XPath, both resolved on build.
#[derive(Debug, Clone, Default)]
pub struct AttributeMappingSpec {
    xpath: String,
    source: Option<String>,
    identifier: Option<String>,
    client_properties: Vec<(String, String)>,
    multi_valued: bool,
    multiple_value: Option<String>,
    index_field: Option<String>,
    target_type: Option<Arc<AttributeType>>,
    unbounded_nested_element: bool,
    nested: Option<NestedSpec>,
}

#[derive(Debug, Clone)]
struct NestedSpec {
    selector: NestedSelectorSpec,
    link: String,
    joining: bool,
}

#[derive(Debug, Clone)]
enum NestedSelectorSpec {
    Fixed(String),
    Conditional(String),
}

impl AttributeMappingSpec {
    pub fn identifier(&mut self, cql: &str) -> &mut Self {
        self.identifier = Some(cql.to_string());
        self
    }

    pub fn client_property(&mut self, name: &str, cql: &str) -> &mut Self {
        self.client_properties.push((name.to_string(), cql.to_string()));
        self
    }

    pub fn multi_valued(&mut self) -> &mut Self {
        self.multi_valued = true;
        self
    }

    /// The values come from a separate query on `cql` rather than from a column of the source type.
    pub fn multiple_value(&mut self, cql: &str) -> &mut Self {
        self.multi_valued = true;
        self.multiple_value = Some(cql.to_string());
        self
    }

    pub fn index_field(&mut self, field: &str) -> &mut Self {
        self.index_field = Some(field.to_string());
        self
    }

    pub fn target_type(&mut self, target_type: Arc<AttributeType>) -> &mut Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn unbounded_nested_element(&mut self) -> &mut Self {
        self.unbounded_nested_element = true;
        self
    }

    fn build(&self, root: &QName, namespaces: &Namespaces) -> Result<AttributeMapping> {
        let target_path = crate::xpath::StepList::parse(root, &self.xpath, namespaces)?;
        let source = match &self.source {
            Some(cql) => parse_expr(cql)?,
            None => Expr::Nil,
        };
        let mut mapping = AttributeMapping::new(target_path, source);
        mapping.identifier = self.identifier.as_deref().map(parse_expr).transpose()?;
        mapping.client_properties = self
            .client_properties
            .iter()
            .map(|(name, cql)| Ok((client_property_name(name, namespaces, &self.xpath)?, parse_expr(cql)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        mapping.multi_valued = self.multi_valued;
        mapping.multiple_value = self.multiple_value.as_deref().map(parse_expr).transpose()?;
        mapping.index_field = self.index_field.clone();
        mapping.target_type = self.target_type.clone();
        mapping.unbounded_nested_element = self.unbounded_nested_element;
        if let Some(nested) = &self.nested {
            let selector = match &nested.selector {
                NestedSelectorSpec::Fixed(name) => NestedTypeSelector::Fixed(
                    namespaces.resolve(name).ok_or_else(|| Error::UnknownPrefix { prefix: prefix_of(name), xpath: self.xpath.clone() })?,
                ),
                NestedSelectorSpec::Conditional(cql) => NestedTypeSelector::Conditional(parse_expr(cql)?),
            };
            mapping.kind = MappingKind::Nested(NestedAttributeMapping { selector, link_expression: parse_expr(&nested.link)?, joining: nested.joining });
        }
        Ok(mapping)
    }
}

fn prefix_of(name: &str) -> String { name.split_once(':').map(|(prefix, _)| prefix.to_string()).unwrap_or_default() }

// client properties are XML attributes: unprefixed names are in no namespace
fn client_property_name(name: &str, namespaces: &Namespaces, xpath: &str) -> Result<QName> {
    if !name.contains(':') {
        return Ok(QName::local(name));
    }
    namespaces.resolve(name).ok_or_else(|| Error::UnknownPrefix { prefix: prefix_of(name), xpath: xpath.to_string() })
}

/// Builds a [`FeatureTypeMapping`] from text, the way mapping files describe one.
///
/// ```
/// # use appschema_core::mapping::FeatureTypeMappingBuilder;
/// # use appschema_core::feature::{AttributeDescriptor, AttributeType};
/// # use appschema_core::name::QName;
/// # use std::sync::Arc;
/// let target = AttributeDescriptor::new(QName::new("urn:x", "Road").with_prefix("x"), Arc::new(AttributeType::complex(QName::local("RoadType"), vec![])));
/// let mapping = FeatureTypeMappingBuilder::new(target, "ROADS")
///     .namespace("x", "urn:x")
///     .id("ROAD_ID")
///     .attribute("x:name", "NAME")
///     .build()
///     .unwrap();
/// assert_eq!(mapping.attribute_mappings.len(), 2);
/// ```
pub struct FeatureTypeMappingBuilder {
    target_feature: AttributeDescriptor,
    source_type: String,
    namespaces: Namespaces,
    specs: Vec<AttributeMappingSpec>,
    default_geometry: Option<String>,
    nested_expression_factory: Option<Arc<dyn NestedExpressionFactory>>,
}

impl FeatureTypeMappingBuilder {
    pub fn new(target_feature: AttributeDescriptor, source_type: impl Into<String>) -> Self {
        let mut namespaces = Namespaces::new();
        if let (Some(prefix), Some(uri)) = (&target_feature.name.prefix, &target_feature.name.namespace) {
            namespaces.declare(prefix.clone(), uri.clone());
        }
        Self { target_feature, source_type: source_type.into(), namespaces, specs: Vec::new(), default_geometry: None, nested_expression_factory: None }
    }

    pub fn namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.declare(prefix, uri);
        self
    }

    /// Identifier expression of the feature itself.
    pub fn id(self, cql: &str) -> Self { self.configure(".", |m| m.identifier(cql)) }

    pub fn attribute(mut self, xpath: &str, source: &str) -> Self {
        self.specs.push(AttributeMappingSpec { xpath: xpath.to_string(), source: Some(source.to_string()), ..Default::default() });
        self
    }

    /// Feature chaining onto `nested_type`, joining `source` in this type to `link` in the nested one.
    pub fn nested(mut self, xpath: &str, source: &str, nested_type: &str, link: &str, joining: bool) -> Self {
        self.specs.push(AttributeMappingSpec {
            xpath: xpath.to_string(),
            source: Some(source.to_string()),
            nested: Some(NestedSpec { selector: NestedSelectorSpec::Fixed(nested_type.to_string()), link: link.to_string(), joining }),
            ..Default::default()
        });
        self
    }

    /// Feature chaining where `selector` evaluates, per feature, to the prefixed name of the nested type.
    pub fn conditional_nested(mut self, xpath: &str, source: &str, selector: &str, link: &str, joining: bool) -> Self {
        self.specs.push(AttributeMappingSpec {
            xpath: xpath.to_string(),
            source: Some(source.to_string()),
            nested: Some(NestedSpec { selector: NestedSelectorSpec::Conditional(selector.to_string()), link: link.to_string(), joining }),
            ..Default::default()
        });
        self
    }

    /// Adjusts the most recent mapping for `xpath`, adding a mapping without a source if there is none.
    pub fn configure(mut self, xpath: &str, f: impl FnOnce(&mut AttributeMappingSpec) -> &mut AttributeMappingSpec) -> Self {
        let position = match self.specs.iter().rposition(|s| s.xpath == xpath) {
            Some(position) => position,
            None => {
                self.specs.push(AttributeMappingSpec { xpath: xpath.to_string(), ..Default::default() });
                self.specs.len() - 1
            }
        };
        f(&mut self.specs[position]);
        self
    }

    pub fn default_geometry(mut self, xpath: &str) -> Self {
        self.default_geometry = Some(xpath.to_string());
        self
    }

    pub fn nested_expression_factory(mut self, factory: Arc<dyn NestedExpressionFactory>) -> Self {
        self.nested_expression_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<FeatureTypeMapping> {
        let root = self.target_feature.name.clone();
        let attribute_mappings = self.specs.iter().map(|spec| spec.build(&root, &self.namespaces).map(Arc::new)).collect::<Result<Vec<_>>>()?;
        Ok(FeatureTypeMapping {
            target_feature: self.target_feature,
            source_type: self.source_type,
            namespaces: self.namespaces,
            attribute_mappings,
            default_geometry: self.default_geometry,
            nested_expression_factory: self.nested_expression_factory,
        })
    }
}
