//! The attribute type model that target (virtual) feature types are described with.

mod attribute;

pub use attribute::{Attribute, AttributeValue, FeatureView, UserData};

use crate::name::{QName, XS_NS};
use crate::xpath::StepList;
use geo_types::Geometry;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    String,
    Integer,
    Float,
    Boolean,
    Geometry(GeometryBinding),
    /// Complex types bind to a collection of properties.
    Collection,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryBinding {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryBinding {
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => GeometryBinding::Point,
            Geometry::Line(_) | Geometry::LineString(_) => GeometryBinding::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => GeometryBinding::Polygon,
            Geometry::MultiPoint(_) => GeometryBinding::MultiPoint,
            Geometry::MultiLineString(_) => GeometryBinding::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryBinding::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryBinding::GeometryCollection,
        }
    }

    /// `Geometry` is the root of the hierarchy; every other binding only accepts itself.
    pub fn is_assignable_from(&self, other: &GeometryBinding) -> bool { *self == GeometryBinding::Geometry || self == other }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Simple,
    Complex {
        descriptors: Vec<AttributeDescriptor>,
        /// Mixed content: text may appear alongside child elements.
        mixed: bool,
    },
    Geometry {
        crs: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeType {
    pub name: QName,
    pub binding: Binding,
    pub kind: TypeKind,
    pub super_type: Option<Arc<AttributeType>>,
    /// XML attributes (client properties) declared on this type.
    pub xml_attributes: Vec<QName>,
}

impl AttributeType {
    pub fn simple(name: QName, binding: Binding) -> Self { Self { name, binding, kind: TypeKind::Simple, super_type: None, xml_attributes: Vec::new() } }

    pub fn complex(name: QName, descriptors: Vec<AttributeDescriptor>) -> Self {
        Self { name, binding: Binding::Collection, kind: TypeKind::Complex { descriptors, mixed: false }, super_type: None, xml_attributes: Vec::new() }
    }

    pub fn geometry(name: QName, binding: GeometryBinding, crs: Option<String>) -> Self {
        Self { name, binding: Binding::Geometry(binding), kind: TypeKind::Geometry { crs }, super_type: None, xml_attributes: Vec::new() }
    }

    /// `xs:anyType`: a complex type that accepts anything and declares nothing.
    pub fn any_type() -> Self {
        Self {
            name: QName::new(XS_NS, "anyType").with_prefix("xs"),
            binding: Binding::Any,
            kind: TypeKind::Complex { descriptors: Vec::new(), mixed: true },
            super_type: None,
            xml_attributes: Vec::new(),
        }
    }

    /// A complex type deriving from a simple type, e.g. `gml:CodeType` extending `xs:string` with `@codeSpace`.
    pub fn simple_content(name: QName, base: Arc<AttributeType>, xml_attributes: Vec<QName>) -> Self {
        Self::complex(name, Vec::new()).with_super(base).with_xml_attributes(xml_attributes)
    }

    pub fn with_super(mut self, super_type: Arc<AttributeType>) -> Self {
        self.super_type = Some(super_type);
        self
    }

    pub fn with_xml_attributes(mut self, xml_attributes: Vec<QName>) -> Self {
        self.xml_attributes = xml_attributes;
        self
    }

    pub fn mixed(mut self) -> Self {
        if let TypeKind::Complex { mixed, .. } = &mut self.kind {
            *mixed = true;
        }
        self
    }

    pub fn is_complex(&self) -> bool { matches!(self.kind, TypeKind::Complex { .. }) }

    pub fn is_geometry(&self) -> bool { matches!(self.kind, TypeKind::Geometry { .. }) }

    pub fn is_any_type(&self) -> bool { self.name.local == "anyType" && self.name.namespace.as_deref() == Some(XS_NS) }

    pub fn crs(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Geometry { crs } => crs.as_deref(),
            _ => None,
        }
    }

    fn supers(&self) -> impl Iterator<Item = &AttributeType> {
        std::iter::successors(self.super_type.as_deref(), |t| t.super_type.as_deref())
    }

    /// Complex type whose value is a single scalar, i.e. it derives from a simple type.
    pub fn is_simple_content(&self) -> bool { self.is_complex() && self.supers().any(|t| matches!(t.kind, TypeKind::Simple)) }

    pub fn can_have_text_content(&self) -> bool { matches!(self.kind, TypeKind::Complex { mixed: true, .. }) }

    /// The first type in the super type chain that does not bind to a collection.
    pub fn simple_content_type(&self) -> &AttributeType {
        let mut current = self;
        while current.binding == Binding::Collection {
            match current.super_type.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Declared child elements, including inherited ones.
    pub fn descriptors(&self) -> Vec<&AttributeDescriptor> {
        let mut all: Vec<&AttributeDescriptor> = Vec::new();
        for t in std::iter::once(self).chain(self.supers()) {
            if let TypeKind::Complex { descriptors, .. } = &t.kind {
                all.extend(descriptors.iter());
            }
        }
        all
    }

    pub fn find_descriptor(&self, name: &QName) -> Option<&AttributeDescriptor> { self.descriptors().into_iter().find(|d| &d.name == name) }

    pub fn find_descriptor_by_local(&self, local: &str) -> Option<&AttributeDescriptor> { self.descriptors().into_iter().find(|d| d.name.local == local) }

    pub fn has_xml_attribute(&self, name: &QName) -> bool { std::iter::once(self).chain(self.supers()).any(|t| t.xml_attributes.contains(name)) }

    /// Descriptor reached by following the element steps of `path` from this type. Indexes and predicates are ignored.
    pub fn descriptor_at(&self, path: &StepList) -> Option<&AttributeDescriptor> {
        let mut current = self;
        let mut found = None;
        for step in path {
            if step.xml_attribute {
                return None;
            }
            let descriptor = current.find_descriptor(&step.name)?;
            current = descriptor.attr_type.as_ref();
            found = Some(descriptor);
        }
        found
    }

    /// `ns#local` names of the declared child elements.
    pub fn property_names(&self) -> String { self.descriptors().iter().map(|d| d.name.uri_form()).collect::<Vec<_>>().join(", ") }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub name: QName,
    pub attr_type: Arc<AttributeType>,
    pub min_occurs: u32,
    /// `None` means unbounded.
    pub max_occurs: Option<u32>,
    pub nillable: bool,
}

impl AttributeDescriptor {
    pub fn new(name: QName, attr_type: Arc<AttributeType>) -> Self { Self { name, attr_type, min_occurs: 0, max_occurs: Some(1), nillable: true } }

    pub fn occurs(mut self, min: u32, max: Option<u32>) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    pub fn required(mut self) -> Self {
        self.nillable = false;
        self
    }

    pub fn is_multi_valued(&self) -> bool { self.max_occurs.map_or(true, |max| max > 1) }

    /// Same cardinality and nillability, different type.
    pub fn retyped(&self, attr_type: Arc<AttributeType>) -> Self { Self { attr_type, ..self.clone() } }
}
