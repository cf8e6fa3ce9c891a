use crate::error::{Error, Result};
use crate::feature::AttributeDescriptor;
use crate::name::{Namespaces, QName};
use crate::value::Value;
use crate::xpath::{Step, StepList};
use appschema_filter::ast::Literal;
use appschema_filter::selection::filter::Filterable;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Empty,
    Simple(Value),
    Complex(Vec<Attribute>),
}

impl AttributeValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Empty => true,
            AttributeValue::Complex(children) => children.is_empty(),
            AttributeValue::Simple(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserData {
    /// XML attributes of the element, e.g. `xlink:href` or `codeSpace`.
    pub client_properties: IndexMap<QName, Value>,
    /// Index of the mapping that created this attribute, for grouping multi-valued properties.
    pub mapped_index: Option<usize>,
    /// The attribute is a placeholder for an unbounded, denormalized multi-valued property.
    pub unbounded_multi_value: bool,
}

/// An attribute instance of a complex feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub descriptor: AttributeDescriptor,
    pub id: Option<String>,
    pub value: AttributeValue,
    pub user_data: UserData,
}

impl Attribute {
    pub fn new(descriptor: AttributeDescriptor) -> Self { Self { descriptor, id: None, value: AttributeValue::Empty, user_data: UserData::default() } }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.value = value;
        self
    }

    pub fn name(&self) -> &QName { &self.descriptor.name }

    pub fn children(&self) -> &[Attribute] {
        match &self.value {
            AttributeValue::Complex(children) => children,
            _ => &[],
        }
    }

    /// Child list, turning an empty value into an empty complex one.
    pub fn children_mut(&mut self) -> Result<&mut Vec<Attribute>> {
        if matches!(self.value, AttributeValue::Empty) {
            self.value = AttributeValue::Complex(Vec::new());
        }
        match &mut self.value {
            AttributeValue::Complex(children) => Ok(children),
            _ => Err(Error::IllegalState(format!("{} holds a simple value and cannot have child attributes", self.descriptor.name))),
        }
    }

    pub fn properties(&self, name: &QName) -> Vec<&Attribute> { self.children().iter().filter(|c| c.name() == name).collect() }

    pub fn property(&self, name: &QName) -> Option<&Attribute> { self.children().iter().find(|c| c.name() == name) }

    pub fn simple_value(&self) -> Option<&Value> {
        match &self.value {
            AttributeValue::Simple(value) => Some(value),
            _ => None,
        }
    }

    pub fn client_property(&self, name: &QName) -> Option<&Value> { self.user_data.client_properties.get(name) }

    pub fn has_xlink_href(&self) -> bool { self.user_data.client_properties.contains_key(&QName::xlink_href()) }

    /// Attributes at `path` below this one. A step with an explicit index selects the child tagged with that
    /// mapped index, or the n-th same-named child when none are tagged.
    pub fn find(&self, path: &StepList) -> Vec<&Attribute> {
        let steps = path.steps();
        // `.` and `@attr` paths start with this attribute's own step
        let steps = match steps {
            [first, rest @ ..] if !first.xml_attribute && first.name == *self.name() && rest.iter().all(|s| s.xml_attribute) => rest,
            _ => steps,
        };
        let mut current: Vec<&Attribute> = vec![self];
        for step in steps.iter().filter(|s| !s.xml_attribute) {
            current = current.into_iter().flat_map(|parent| select_children(parent, step)).collect();
        }
        current
    }

    /// Values at `path`: identifiers for a trailing `@gml:id`, XML attribute values for other `@` steps, otherwise the leaf values
    /// (the `simpleContent` value for simple content attributes).
    pub fn values_at(&self, path: &StepList) -> Vec<Value> {
        let found = self.find(path);
        match path.last() {
            Some(last) if last.is_id() => found.into_iter().filter_map(|a| a.id.clone().map(Value::String)).collect(),
            Some(last) if last.xml_attribute => found.into_iter().filter_map(|a| a.client_property(&last.name).cloned()).collect(),
            _ => found.into_iter().filter_map(Attribute::leaf_value).cloned().collect(),
        }
    }

    fn leaf_value(&self) -> Option<&Value> {
        match &self.value {
            AttributeValue::Simple(value) => Some(value),
            AttributeValue::Complex(_) => self.property(&QName::simple_content()).and_then(Attribute::simple_value),
            AttributeValue::Empty => None,
        }
    }

    /// First geometry value found depth-first below this attribute.
    pub fn default_geometry(&self) -> Option<&Value> {
        self.children().iter().find_map(|child| match &child.value {
            AttributeValue::Simple(value @ Value::Geometry(_)) => Some(value),
            _ => child.default_geometry(),
        })
    }
}

fn select_children<'a>(parent: &'a Attribute, step: &Step) -> Vec<&'a Attribute> {
    let matching = parent.properties(&step.name);
    match step.explicit_index() {
        None => matching,
        Some(index) if matching.iter().any(|a| a.user_data.mapped_index.is_some()) => {
            matching.into_iter().filter(|a| a.user_data.mapped_index == Some(index)).collect()
        }
        Some(index) => matching.into_iter().nth(index - 1).into_iter().collect(),
    }
}

/// A feature seen through its namespace declarations, so filters written as text can be evaluated against it.
pub struct FeatureView<'a> {
    pub feature: &'a Attribute,
    pub namespaces: &'a Namespaces,
}

impl<'a> FeatureView<'a> {
    pub fn new(feature: &'a Attribute, namespaces: &'a Namespaces) -> Self { Self { feature, namespaces } }

    fn steps(&self, xpath: &str) -> Option<StepList> { StepList::parse(self.feature.name(), xpath, self.namespaces).ok() }
}

impl Filterable for FeatureView<'_> {
    fn id(&self) -> Option<&str> { self.feature.id.as_deref() }

    fn values(&self, xpath: &str) -> Vec<Literal> {
        if xpath.is_empty() {
            return self.feature.default_geometry().cloned().map(Literal::from).into_iter().collect();
        }
        match self.steps(xpath) {
            Some(steps) => self.feature.values_at(&steps).into_iter().map(Literal::from).collect(),
            None => Vec::new(),
        }
    }

    fn is_nil(&self, xpath: &str) -> bool {
        let Some(steps) = self.steps(xpath) else { return false };
        let found = self.feature.find(&steps);
        !found.is_empty() && found.iter().all(|a| a.descriptor.nillable && a.value.is_empty())
    }
}
