use crate::error::{Error, Result};
use crate::feature::{Attribute, AttributeDescriptor, AttributeType, AttributeValue, Binding};
use crate::name::QName;
use crate::value::Value;
use crate::xpath::{Step, StepList};
use appschema_filter::ast::Expr;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// What is being assigned at a location path.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    #[default]
    Null,
    Value(Value),
    /// Several scalar values read from one source row.
    Values(Vec<Value>),
    /// Nested features produced by feature chaining.
    Attributes(Vec<Attribute>),
}

impl Content {
    fn is_collection(&self) -> bool { matches!(self, Content::Values(_) | Content::Attributes(_)) }

    /// The single scalar this content stands for, if any.
    fn scalar(&self, attribute: &QName) -> Result<Option<Value>> {
        match self {
            Content::Null => Ok(None),
            Content::Value(value) => Ok(Some(value.clone())),
            Content::Values(values) if values.len() <= 1 => Ok(values.first().cloned()),
            _ => Err(Error::InvalidContent { attribute: attribute.to_string(), reason: "expected a single value".into() }),
        }
    }

    /// Comma separated rendering of a collection, i.e. its list form without the brackets.
    fn joined(&self) -> Option<String> {
        let rendered: Vec<String> = match self {
            Content::Values(values) => values.iter().map(Value::to_string).collect(),
            Content::Attributes(attributes) => attributes.iter().filter_map(|a| a.simple_value()).map(Value::to_string).collect(),
            _ => return None,
        };
        Some(rendered.join(", "))
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self { Content::Value(value) }
}

impl From<Vec<Value>> for Content {
    fn from(values: Vec<Value>) -> Self { Content::Values(values) }
}

impl From<Vec<Attribute>> for Content {
    fn from(attributes: Vec<Attribute>) -> Self { Content::Attributes(attributes) }
}

/// One assignment: the value plus everything that shapes the attribute created for it.
#[derive(Debug, Clone, Default)]
pub struct SetRequest {
    pub value: Content,
    pub id: Option<String>,
    /// Concrete type for the leaf, overriding the declared one.
    pub target_type: Option<Arc<AttributeType>>,
    /// The leaf only carries an `xlink:href` to a chained feature and never holds a value.
    pub reference_only: bool,
    /// Descriptor to use below an `xs:anyType` parent, which declares no children.
    pub target_descriptor: Option<AttributeDescriptor>,
    /// Source expression the value was computed from.
    pub source_expression: Option<Expr>,
}

impl SetRequest {
    pub fn new(value: impl Into<Content>) -> Self { Self { value: value.into(), ..Default::default() } }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_target_type(mut self, target_type: Arc<AttributeType>) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_target_descriptor(mut self, descriptor: AttributeDescriptor) -> Self {
        self.target_descriptor = Some(descriptor);
        self
    }

    pub fn with_source_expression(mut self, expression: Expr) -> Self {
        self.source_expression = Some(expression);
        self
    }

    pub fn reference_only(mut self) -> Self {
        self.reference_only = true;
        self
    }
}

/// Materializes values into complex feature instances at location paths, creating intermediate
/// attributes on the way.
#[derive(Debug, Clone, Default)]
pub struct XPathWriter {
    /// CRS stamped on geometry leaves retyped through a target type, instead of the declared one.
    crs: Option<String>,
}

impl XPathWriter {
    pub fn new() -> Self { Self::default() }

    pub fn with_crs(crs: impl Into<String>) -> Self { Self { crs: Some(crs.into()) } }

    /// Assign `request.value` at `steps` below `root` and return the leaf that holds it.
    pub fn set<'a>(&self, root: &'a mut Attribute, steps: &StepList, request: SetRequest) -> Result<&'a mut Attribute> {
        debug!("set {} on {} from {:?}", steps, root.name(), request.source_expression);
        let mut steps: Vec<Step> = steps.steps().to_vec();
        if steps.first().is_some_and(|s| &s.name == root.name()) {
            if steps.len() > 1 {
                steps.remove(0);
            } else {
                return self.set_self(root, request.value);
            }
        }
        if steps.is_empty() {
            return Err(Error::InvalidXPath { xpath: String::new(), reason: "empty path".into() });
        }
        self.set_steps(root, &steps, &request)
    }

    /// The path is the root itself, as happens when chaining simple content or geometry features.
    fn set_self<'a>(&self, root: &'a mut Attribute, value: Content) -> Result<&'a mut Attribute> {
        let root_type = root.descriptor.attr_type.clone();
        if root_type.is_simple_content() || root_type.can_have_text_content() {
            return set_simple_content_value(root, value);
        }
        if root_type.is_geometry() {
            let geometry = value.scalar(root.name())?.map(|v| v.cast_to(&root_type.binding)).transpose()?;
            let leaf = Attribute::new(root.descriptor.clone()).with_value(geometry.map_or(AttributeValue::Empty, AttributeValue::Simple));
            root.value = AttributeValue::Complex(vec![leaf]);
            return first_child(root);
        }
        Err(Error::IllegalState(format!("{} can only be set through one of its properties", root.name())))
    }

    fn set_steps<'a>(&self, parent: &'a mut Attribute, steps: &[Step], request: &SetRequest) -> Result<&'a mut Attribute> {
        let Some((step, rest)) = steps.split_first() else {
            return Err(Error::IllegalState(format!("no step left to set below {}", parent.name())));
        };
        let is_last = rest.is_empty();
        let descriptor = self.step_descriptor(parent, step, is_last, request)?;
        if is_last {
            let target_type = request.target_type.as_deref();
            trace!("setting leaf {} of {} (target type {:?})", step, parent.name(), target_type.map(|t| &t.name));
            return set_value(&descriptor, request.id.clone(), &request.value, step.explicit_index(), parent, request.reference_only);
        }
        let child = set_value(&descriptor, None, &Content::Values(Vec::new()), step.explicit_index(), parent, request.reference_only)?;
        self.set_steps(child, rest, request)
    }

    fn step_descriptor(&self, parent: &Attribute, step: &Step, is_last: bool, request: &SetRequest) -> Result<AttributeDescriptor> {
        let parent_type = parent.descriptor.attr_type.as_ref();
        if parent_type.is_any_type() {
            if let Some(descriptor) = &request.target_descriptor {
                return Ok(descriptor.clone());
            }
        }
        let descriptor = match (&request.target_type, is_last) {
            (Some(target_type), true) => match lookup(parent_type, &step.name) {
                Some(actual) => Some(self.retype(actual, target_type)?),
                None => None,
            },
            // a child of a derived type is not in the declared type, but the instance may already hold it
            _ => lookup(parent_type, &step.name).cloned().or_else(|| parent.property(&step.name).map(|child| child.descriptor.clone())),
        };
        descriptor.ok_or_else(|| Error::InvalidLocationPath {
            step: step.to_string(),
            namespace: step.name.namespace.clone().unwrap_or_default(),
            type_name: parent_type.name.to_string(),
            properties: parent_type.property_names(),
        })
    }

    /// Descriptor for `actual` with its cardinality kept and `target_type` as the type. Geometry leaves keep a
    /// geometry type so the CRS travels with the value.
    fn retype(&self, actual: &AttributeDescriptor, target_type: &Arc<AttributeType>) -> Result<AttributeDescriptor> {
        if !actual.attr_type.is_geometry() {
            return Ok(actual.retyped(target_type.clone()));
        }
        let Binding::Geometry(binding) = target_type.binding else {
            return Err(Error::GeometryBindingMismatch {
                target: target_type.name.to_string(),
                attribute: actual.name.to_string(),
                reason: "it is not a geometry type".into(),
            });
        };
        if target_type.is_geometry() {
            return Ok(actual.retyped(target_type.clone()));
        }
        let crs = self.crs.clone().or_else(|| actual.attr_type.crs().map(str::to_string));
        Ok(actual.retyped(Arc::new(AttributeType::geometry(target_type.name.clone(), binding, crs))))
    }
}

/// Declared child named `name`; unqualified names match on the local part only.
fn lookup<'t>(parent_type: &'t AttributeType, name: &QName) -> Option<&'t AttributeDescriptor> {
    match name.namespace {
        None => parent_type.find_descriptor_by_local(&name.local),
        Some(_) => parent_type.find_descriptor(name),
    }
}

fn first_child(attribute: &mut Attribute) -> Result<&mut Attribute> {
    let name = attribute.name().to_string();
    attribute.children_mut()?.first_mut().ok_or_else(|| Error::IllegalState(format!("{} has no child attribute", name)))
}

fn set_simple_content_value(attribute: &mut Attribute, value: Content) -> Result<&mut Attribute> {
    let attr_type = attribute.descriptor.attr_type.clone();
    let existing = attribute.children().iter().position(|c| c.name() == &QName::simple_content());
    match existing {
        None => {
            let simple_content = build_simple_content(&attr_type, &value, attribute.name())?;
            let nested = Attribute {
                descriptor: attribute.descriptor.clone(),
                id: attribute.id.clone(),
                value: AttributeValue::Complex(vec![simple_content]),
                user_data: Default::default(),
            };
            attribute.value = AttributeValue::Complex(vec![nested]);
            first_child(attribute)
        }
        Some(position) => {
            let binding = attr_type.simple_content_type().binding.clone();
            let converted = value.scalar(attribute.name())?.map(|v| v.cast_to(&binding)).transpose()?;
            attribute.children_mut()?[position].value = converted.map_or(AttributeValue::Empty, AttributeValue::Simple);
            Ok(attribute)
        }
    }
}

/// Synthetic `simpleContent` property holding the scalar value of a simple content or mixed type.
fn build_simple_content(attr_type: &AttributeType, value: &Content, attribute: &QName) -> Result<Attribute> {
    let content_type = if attr_type.is_simple_content() {
        attr_type.simple_content_type().clone()
    } else {
        AttributeType::simple(QName::simple_content(), Binding::String)
    };
    let converted = value.scalar(attribute)?.map(|v| v.cast_to(&content_type.binding)).transpose()?;
    let descriptor = AttributeDescriptor::new(QName::simple_content(), Arc::new(content_type)).occurs(1, Some(1));
    Ok(Attribute::new(descriptor).with_value(converted.map_or(AttributeValue::Empty, AttributeValue::Simple)))
}

/// Value adapted to what `descriptor` holds.
fn convert_value(descriptor: &AttributeDescriptor, value: &Content) -> Result<AttributeValue> {
    let attr_type = descriptor.attr_type.as_ref();
    let wraps_content = attr_type.is_simple_content() || attr_type.can_have_text_content();
    if attr_type.is_complex() && attr_type.binding == Binding::Collection {
        match value {
            Content::Null if wraps_content && !descriptor.nillable => return Ok(AttributeValue::Complex(Vec::new())),
            Content::Null | Content::Value(_) if wraps_content => {
                return Ok(AttributeValue::Complex(vec![build_simple_content(attr_type, value, &descriptor.name)?]));
            }
            Content::Values(values) if wraps_content => {
                let wrapped = values.iter().map(|v| build_simple_content(attr_type, &Content::Value(v.clone()), &descriptor.name));
                return Ok(AttributeValue::Complex(wrapped.collect::<Result<Vec<_>>>()?));
            }
            Content::Values(values) if values.is_empty() => return Ok(AttributeValue::Complex(Vec::new())),
            Content::Values(_) => {
                return Err(Error::InvalidContent { attribute: descriptor.name.to_string(), reason: "a complex type needs attributes, not values".into() });
            }
            Content::Attributes(attributes) => return Ok(AttributeValue::Complex(attributes.clone())),
            _ => {}
        }
    }
    if attr_type.binding == Binding::String && value.is_collection() {
        return Ok(value.joined().map_or(AttributeValue::Empty, |s| AttributeValue::Simple(Value::String(s))));
    }
    if let Content::Attributes(_) = value {
        return Err(Error::InvalidContent { attribute: descriptor.name.to_string(), reason: "a simple type cannot hold attributes".into() });
    }
    let converted = value.scalar(&descriptor.name)?.map(|v| v.cast_to(&attr_type.binding)).transpose()?;
    Ok(converted.map_or(AttributeValue::Empty, AttributeValue::Simple))
}

/// A one-feature list whose feature has a property named after itself: simple content delivered by feature chaining.
fn chained_simple_content(value: &Content) -> Option<&[Attribute]> {
    match value {
        Content::Attributes(features) if features.first().is_some_and(|f| f.property(f.name()).is_some()) => Some(features),
        _ => None,
    }
}

fn set_value<'a>(
    descriptor: &AttributeDescriptor,
    id: Option<String>,
    value: &Content,
    index: Option<usize>,
    parent: &'a mut Attribute,
    reference_only: bool,
) -> Result<&'a mut Attribute> {
    let mut carried_properties: Option<IndexMap<QName, Value>> = None;
    let converted = match chained_simple_content(value) {
        Some([feature]) => {
            let properties: Vec<&Attribute> = feature.children().iter().filter(|p| p.name() != &QName::feature_link()).collect();
            match properties.first() {
                Some(first) => {
                    carried_properties = Some(first.user_data.client_properties.clone());
                    if descriptor.attr_type.is_geometry() || first.name() == &descriptor.name {
                        first.value.clone()
                    } else {
                        AttributeValue::Complex(properties.into_iter().cloned().collect())
                    }
                }
                None => AttributeValue::Empty,
            }
        }
        Some(_) => {
            return Err(Error::InvalidContent { attribute: descriptor.name.to_string(), reason: "expecting exactly one chained feature".into() });
        }
        None => convert_value(descriptor, value)?,
    };

    let mut leaf = None;
    // a reference-only leaf is always new: it holds no value to match on
    if !reference_only && !parent.user_data.unbounded_multi_value {
        leaf = reusable_leaf(parent, &descriptor.name, &converted, index);
    }
    // Heuristic: two xlink:href values cannot be told apart here, so a multi-valued leaf that already carries one
    // gets a sibling. This may duplicate references when the same row is seen twice.
    let has_reference = leaf.is_some_and(|i| parent.children()[i].has_xlink_href());
    if leaf.is_none() || (descriptor.is_multi_valued() && has_reference) {
        let mut created = Attribute::new(descriptor.clone()).with_value(converted.clone());
        created.id = id;
        created.user_data.mapped_index = index;
        let children = parent.children_mut()?;
        children.push(created);
        leaf = Some(children.len() - 1);
    }

    let position = leaf.ok_or_else(|| Error::IllegalState(format!("no leaf for {}", descriptor.name)))?;
    let target = &mut parent.children_mut()?[position];
    if !converted.is_empty() {
        target.value = converted;
    }
    if let Some(properties) = carried_properties {
        for (name, value) in properties {
            target.user_data.client_properties.entry(name).or_insert(value);
        }
    }
    Ok(target)
}

/// Position of an existing child that this assignment should land on instead of creating a new one.
fn reusable_leaf(parent: &Attribute, name: &QName, converted: &AttributeValue, index: Option<usize>) -> Option<usize> {
    let candidates = parent.children().iter().enumerate().filter(|(_, c)| c.name() == name);
    if converted.is_empty() {
        // an intermediate element, possibly created already by a mapping for a sibling leaf
        return match index {
            Some(index) => candidates
                .enumerate()
                .filter(|(nth, (_, child))| child.user_data.mapped_index.unwrap_or(nth + 1) == index)
                .map(|(_, (position, _))| position)
                .last(),
            None => candidates.map(|(position, _)| position).last(),
        };
    }
    // equal values from denormalized rows collapse into one leaf
    candidates
        .filter(|(_, child)| match (index, child.user_data.mapped_index) {
            (Some(index), Some(mapped)) => index == mapped,
            _ => true,
        })
        .filter(|(_, child)| &child.value == converted)
        .map(|(position, _)| position)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::GeometryBinding;
    use crate::name::{Namespaces, GML_NS, XS_NS};
    use geo_types::{point, Geometry};

    const GSML: &str = "urn:cgi:xmlns:CGI:GeoSciML:2.0";

    fn ns() -> Namespaces { Namespaces::new().with("gml", GML_NS).with("gsml", GSML) }

    fn string_type() -> Arc<AttributeType> { Arc::new(AttributeType::simple(QName::new(XS_NS, "string"), Binding::String)) }

    fn code_type() -> Arc<AttributeType> { Arc::new(AttributeType::simple_content(QName::new(GML_NS, "CodeType"), string_type(), vec![QName::local("codeSpace")])) }

    fn gsml(local: &str, attr_type: Arc<AttributeType>) -> AttributeDescriptor { AttributeDescriptor::new(QName::new(GSML, local).with_prefix("gsml"), attr_type) }

    fn root_name() -> QName { QName::new(GSML, "MappedFeature").with_prefix("gsml") }

    fn mapped_feature() -> Attribute {
        let unit = AttributeType::complex(
            QName::new(GSML, "GeologicUnitType"),
            vec![gsml("description", string_type()), gsml("purpose", string_type())],
        );
        let specification = AttributeType::complex(QName::new(GSML, "SpecificationPropertyType"), vec![gsml("GeologicUnit", Arc::new(unit))]);
        let occurrence = AttributeType::complex(QName::new(GSML, "OccurrencePropertyType"), vec![]);
        let shape = AttributeType::geometry(QName::new(GML_NS, "GeometryPropertyType"), GeometryBinding::Geometry, Some("EPSG:4283".into()));
        let feature_type = AttributeType::complex(
            QName::new(GSML, "MappedFeatureType"),
            vec![
                AttributeDescriptor::new(QName::new(GML_NS, "name").with_prefix("gml"), code_type()).occurs(0, None),
                gsml("specification", Arc::new(specification)).occurs(0, None),
                gsml("occurrence", Arc::new(occurrence)).occurs(0, None),
                gsml("shape", Arc::new(shape)),
            ],
        );
        Attribute::new(AttributeDescriptor::new(root_name(), Arc::new(feature_type))).with_id("mf.1")
    }

    fn path(xpath: &str) -> StepList { StepList::parse(&root_name(), xpath, &ns()).unwrap() }

    fn set(feature: &mut Attribute, xpath: &str, value: &str) { XPathWriter::new().set(feature, &path(xpath), SetRequest::new(Value::from(value))).unwrap(); }

    #[test]
    fn test_set_then_read_back() {
        let mut feature = mapped_feature();
        let leaf = XPathWriter::new().set(&mut feature, &path("gml:name"), SetRequest::new(Value::from("granite"))).unwrap();
        assert_eq!(leaf.name(), &QName::new(GML_NS, "name"));
        assert_eq!(feature.values_at(&path("gml:name")), vec![Value::from("granite")]);
    }

    #[test]
    fn test_leaf_reuse() {
        let mut feature = mapped_feature();
        set(&mut feature, "gml:name", "granite");
        set(&mut feature, "gml:name", "granite");
        assert_eq!(feature.properties(&QName::new(GML_NS, "name")).len(), 1);

        set(&mut feature, "gml:name", "basalt");
        assert_eq!(feature.values_at(&path("gml:name")), vec![Value::from("granite"), Value::from("basalt")]);
    }

    #[test]
    fn test_indexed_leaves_are_distinct() {
        let mut feature = mapped_feature();
        set(&mut feature, "gml:name[1]", "granite");
        set(&mut feature, "gml:name[2]", "granite");
        assert_eq!(feature.properties(&QName::new(GML_NS, "name")).len(), 2);
        assert_eq!(feature.values_at(&path("gml:name[2]")), vec![Value::from("granite")]);
    }

    #[test]
    fn test_intermediate_elements_are_shared() {
        let mut feature = mapped_feature();
        set(&mut feature, "gsml:specification[1]/gsml:GeologicUnit/gsml:description", "unit one");
        set(&mut feature, "gsml:specification[1]/gsml:GeologicUnit/gsml:purpose", "typical");
        set(&mut feature, "gsml:specification[2]/gsml:GeologicUnit/gsml:description", "unit two");
        assert_eq!(feature.properties(&QName::new(GSML, "specification")).len(), 2);
        assert_eq!(feature.values_at(&path("gsml:specification[1]/gsml:GeologicUnit/gsml:purpose")), vec![Value::from("typical")]);
        assert_eq!(
            feature.values_at(&path("gsml:specification/gsml:GeologicUnit/gsml:description")),
            vec![Value::from("unit one"), Value::from("unit two")]
        );
    }

    #[test]
    fn test_invalid_location_path() {
        let mut feature = mapped_feature();
        let err = XPathWriter::new().set(&mut feature, &path("gsml:colour"), SetRequest::new(Value::from("red"))).unwrap_err();
        match err {
            Error::InvalidLocationPath { step, properties, .. } => {
                assert_eq!(step, "gsml:colour");
                assert!(properties.contains(&format!("{}#specification", GSML)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_geometry_target_type() {
        let mut feature = mapped_feature();
        let point_type = Arc::new(AttributeType::simple(QName::new(GML_NS, "PointPropertyType"), Binding::Geometry(GeometryBinding::Point)));
        let request = SetRequest::new(Value::from("POINT(1 2)")).with_target_type(point_type);
        let leaf = XPathWriter::with_crs("EPSG:4326").set(&mut feature, &path("gsml:shape"), request).unwrap();
        assert_eq!(leaf.descriptor.attr_type.crs(), Some("EPSG:4326"));
        assert_eq!(leaf.simple_value(), Some(&Value::Geometry(Geometry::Point(point! { x: 1.0, y: 2.0 }))));

        let err = XPathWriter::new().set(&mut feature, &path("gsml:shape"), SetRequest::new(Value::from("x")).with_target_type(string_type()));
        assert!(matches!(err, Err(Error::GeometryBindingMismatch { .. })));
    }

    #[test]
    fn test_multi_valued_reference_gets_sibling() {
        let mut feature = mapped_feature();
        let occurrence = path("gsml:occurrence");
        let writer = XPathWriter::new();
        writer.set(&mut feature, &occurrence, SetRequest::new(Content::Null)).unwrap();
        writer.set(&mut feature, &occurrence, SetRequest::new(Content::Null)).unwrap();
        assert_eq!(feature.properties(&QName::new(GSML, "occurrence")).len(), 1);

        let leaf = writer.set(&mut feature, &occurrence, SetRequest::new(Content::Null)).unwrap();
        leaf.user_data.client_properties.insert(QName::xlink_href(), Value::from("urn:occurrence:1"));
        writer.set(&mut feature, &occurrence, SetRequest::new(Content::Null)).unwrap();
        assert_eq!(feature.properties(&QName::new(GSML, "occurrence")).len(), 2);

        writer.set(&mut feature, &occurrence, SetRequest::new(Content::Null).reference_only()).unwrap();
        assert_eq!(feature.properties(&QName::new(GSML, "occurrence")).len(), 3);
    }

    #[test]
    fn test_chained_simple_content() {
        let name = QName::new(GML_NS, "name").with_prefix("gml");
        let mut chained_name = Attribute::new(AttributeDescriptor::new(name.clone(), code_type()))
            .with_value(AttributeValue::Complex(vec![Attribute::new(AttributeDescriptor::new(QName::simple_content(), string_type()))
                .with_value(AttributeValue::Simple(Value::from("granite")))]));
        chained_name.user_data.client_properties.insert(QName::local("codeSpace"), Value::from("urn:names"));
        let link = Attribute::new(AttributeDescriptor::new(QName::feature_link(), string_type())).with_value(AttributeValue::Simple(Value::from("mf.1")));
        let chained = Attribute::new(AttributeDescriptor::new(name, code_type())).with_value(AttributeValue::Complex(vec![chained_name, link]));

        let mut feature = mapped_feature();
        let leaf = XPathWriter::new().set(&mut feature, &path("gml:name"), SetRequest::new(vec![chained])).unwrap();
        assert_eq!(leaf.client_property(&QName::local("codeSpace")), Some(&Value::from("urn:names")));
        assert_eq!(feature.values_at(&path("gml:name")), vec![Value::from("granite")]);
    }

    #[test]
    fn test_self_step_simple_content() {
        let mut name = Attribute::new(AttributeDescriptor::new(QName::new(GML_NS, "name").with_prefix("gml"), code_type()));
        let steps = StepList::parse(name.name(), ".", &ns()).unwrap();
        let writer = XPathWriter::new();
        writer.set(&mut name, &steps, SetRequest::new(Value::from("granite"))).unwrap();
        let nested = &name.children()[0];
        assert_eq!(nested.property(&QName::simple_content()).and_then(Attribute::simple_value), Some(&Value::from("granite")));
    }

    #[test]
    fn test_string_binding_strips_list_brackets() {
        let mut feature = mapped_feature();
        let values = vec![Value::from("a"), Value::from("b")];
        XPathWriter::new().set(&mut feature, &path("gsml:specification/gsml:GeologicUnit/gsml:description"), SetRequest::new(values)).unwrap();
        assert_eq!(feature.values_at(&path("gsml:specification/gsml:GeologicUnit/gsml:description")), vec![Value::from("a, b")]);
    }
}
