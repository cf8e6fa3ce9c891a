//! Schema mapping: how the attributes of a target (virtual) feature type are computed from a source type.

mod builder;
mod feature_type;
mod registry;

pub use builder::{AttributeMappingSpec, FeatureTypeMappingBuilder};
pub use feature_type::FeatureTypeMapping;
pub use registry::{InMemoryRegistry, MappingRegistry};

use crate::error::Result;
use crate::feature::{Attribute, AttributeType, FeatureView};
use crate::name::{Namespaces, QName};
use crate::xpath::StepList;
use appschema_filter::ast::Expr;
use appschema_filter::selection::filter::{as_text, evaluate_expr};
use indexmap::IndexMap;
use std::fmt::Debug;
use std::sync::Arc;

/// One source-side alternative for a target attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceBinding {
    Direct(Expr),
    /// The attribute is reached through feature chaining and has no column in this source.
    RequiresJoin,
}

impl SourceBinding {
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            SourceBinding::Direct(expr) => Some(expr),
            SourceBinding::RequiresJoin => None,
        }
    }

    pub fn is_requires_join(&self) -> bool { matches!(self, SourceBinding::RequiresJoin) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NestedTypeSelector {
    Fixed(QName),
    /// Evaluated against each feature; yields the prefixed name of the nested type.
    Conditional(Expr),
}

/// Feature chaining: the target attribute is built from features of another mapped type.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAttributeMapping {
    pub selector: NestedTypeSelector,
    /// Expression in the nested type matched against the parent's source expression.
    pub link_expression: Expr,
    /// The nested type can be joined at query time.
    pub joining: bool,
}

impl NestedAttributeMapping {
    pub fn is_conditional(&self) -> bool { matches!(self.selector, NestedTypeSelector::Conditional(_)) }

    /// Name of the nested feature type, evaluating a conditional selector against `feature`.
    pub fn nested_feature_type(&self, feature: Option<&Attribute>, namespaces: &Namespaces) -> Result<Option<QName>> {
        match (&self.selector, feature) {
            (NestedTypeSelector::Fixed(name), _) => Ok(Some(name.clone())),
            (NestedTypeSelector::Conditional(_), None) => Ok(None),
            (NestedTypeSelector::Conditional(expr), Some(feature)) => {
                let values = evaluate_expr(&FeatureView::new(feature, namespaces), expr)?;
                Ok(values.first().map(as_text).filter(|name| !name.is_empty()).and_then(|name| namespaces.resolve(&name)))
            }
        }
    }

    pub fn feature_type_mapping(
        &self, registry: &dyn MappingRegistry, feature: Option<&Attribute>, namespaces: &Namespaces,
    ) -> Result<Option<Arc<FeatureTypeMapping>>> {
        match self.nested_feature_type(feature, namespaces)? {
            Some(name) => registry.mapping(&name),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappingKind {
    Direct,
    Nested(NestedAttributeMapping),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMapping {
    pub target_path: StepList,
    /// Source expression; for nested mappings the parent side of the chaining link.
    pub source: Expr,
    pub identifier: Option<Expr>,
    pub client_properties: IndexMap<QName, Expr>,
    pub multi_valued: bool,
    /// Source of a multi-valued attribute whose values come from a separate query.
    pub multiple_value: Option<Expr>,
    pub index_field: Option<String>,
    pub target_type: Option<Arc<AttributeType>>,
    /// Marks an unbounded nested element whose absence is legitimate.
    pub unbounded_nested_element: bool,
    pub kind: MappingKind,
}

impl AttributeMapping {
    pub fn new(target_path: StepList, source: Expr) -> Self {
        Self {
            target_path,
            source,
            identifier: None,
            client_properties: IndexMap::new(),
            multi_valued: false,
            multiple_value: None,
            index_field: None,
            target_type: None,
            unbounded_nested_element: false,
            kind: MappingKind::Direct,
        }
    }

    pub fn nested(&self) -> Option<&NestedAttributeMapping> {
        match &self.kind {
            MappingKind::Nested(nested) => Some(nested),
            MappingKind::Direct => None,
        }
    }

    pub fn is_nested(&self) -> bool { self.nested().is_some() }

    /// A nested mapping that only encodes an `xlink:href` to the nested feature.
    pub fn is_chaining_by_reference(&self) -> bool { self.is_nested() && self.client_properties.contains_key(&QName::xlink_href()) }

    pub fn is_joining(&self) -> bool { self.nested().is_some_and(|n| n.joining) }
}

/// Hook for mapping-specific nested attribute expressions.
pub trait NestedExpressionFactory: Send + Sync + Debug {
    /// Expression standing for `xpath` when it is reached through `nested`, or `None` to use the default.
    fn nested_attribute_expression(&self, xpath: &StepList, mapping: &FeatureTypeMapping, nested: &AttributeMapping) -> Option<Expr>;
}
