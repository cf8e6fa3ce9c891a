use crate::error::Result;
use crate::feature::{AttributeDescriptor, AttributeType};
use crate::mapping::{AttributeMapping, NestedExpressionFactory, SourceBinding};
use crate::name::{Namespaces, QName};
use crate::xpath::StepList;
use appschema_filter::ast::Expr;
use std::sync::Arc;

/// Mapping of one target (virtual) feature type onto one source type.
#[derive(Debug, Clone)]
pub struct FeatureTypeMapping {
    pub target_feature: AttributeDescriptor,
    pub source_type: String,
    pub namespaces: Namespaces,
    pub attribute_mappings: Vec<Arc<AttributeMapping>>,
    pub default_geometry: Option<String>,
    pub nested_expression_factory: Option<Arc<dyn NestedExpressionFactory>>,
}

impl FeatureTypeMapping {
    pub fn name(&self) -> &QName { &self.target_feature.name }

    pub fn target_feature(&self) -> &AttributeDescriptor { &self.target_feature }

    pub fn target_type(&self) -> &AttributeType { &self.target_feature.attr_type }

    pub fn namespaces(&self) -> &Namespaces { &self.namespaces }

    /// Parses `xpath` relative to the target feature.
    pub fn steps(&self, xpath: &str) -> Result<StepList> { StepList::parse(self.name(), xpath, &self.namespaces) }

    /// Source alternatives for `path`.
    ///
    /// Without indexes or predicates every mapping equal to `path` ignoring indexes contributes; otherwise only the
    /// exact mapping does. When nothing matches, the last step is tried as a client property of its parent:
    /// `gml:id` yields the parent's identifier expression and a nested parent yields [`SourceBinding::RequiresJoin`].
    pub fn find_mappings_for(&self, path: &StepList, include_joins: bool) -> Vec<SourceBinding> {
        let candidates: Vec<&Arc<AttributeMapping>> =
            if path.is_indexed() || path.contains_predicate() { self.attribute_mapping(path).into_iter().collect() } else { self.attribute_mappings_ignore_index(path) };

        let mut bindings = expressions(&candidates, include_joins);
        if bindings.is_empty() && path.len() > 1 {
            if let Some(last) = path.last() {
                let parents = self.attribute_mappings_ignore_index(&path.parent());
                bindings = client_property_expressions(&parents, &last.name, include_joins);
            }
        }
        bindings
    }

    /// The mapping whose target path equals `path` exactly.
    pub fn attribute_mapping(&self, path: &StepList) -> Option<&Arc<AttributeMapping>> { self.attribute_mappings.iter().find(|m| &m.target_path == path) }

    pub fn attribute_mappings_ignore_index(&self, path: &StepList) -> Vec<&Arc<AttributeMapping>> {
        self.attribute_mappings.iter().filter(|m| m.target_path.eq_ignore_index(path)).collect()
    }

    pub fn nested_mappings(&self) -> impl Iterator<Item = &Arc<AttributeMapping>> { self.attribute_mappings.iter().filter(|m| m.is_nested()) }

    /// The identifier expression of the mapping for the feature itself.
    pub fn feature_id_expression(&self) -> Option<&Expr> {
        self.attribute_mappings.iter().find(|m| m.target_path.len() == 1 && m.target_path[0].name == *self.name()).and_then(|m| m.identifier.as_ref())
    }

    pub fn default_geometry_xpath(&self) -> Option<&str> { self.default_geometry.as_deref() }

    /// Separate-query source of a multi-valued attribute at `path`.
    pub fn multiple_value_source(&self, path: &StepList) -> Option<&Expr> {
        self.attribute_mappings_ignore_index(path).into_iter().find_map(|m| m.multiple_value.as_ref())
    }

    /// Name of the index field backing the attribute at `xpath`.
    pub fn index_field(&self, xpath: &str) -> Option<&str> {
        let path = self.steps(xpath).ok()?;
        self.attribute_mappings.iter().filter(|m| m.target_path.eq_ignore_index(&path)).find_map(|m| m.index_field.as_deref())
    }
}

fn expressions(candidates: &[&Arc<AttributeMapping>], include_joins: bool) -> Vec<SourceBinding> {
    candidates
        .iter()
        .filter_map(|mapping| {
            if mapping.is_nested() {
                include_joins.then_some(SourceBinding::RequiresJoin)
            } else if mapping.multiple_value.is_some() {
                None
            } else {
                Some(SourceBinding::Direct(mapping.source.clone()))
            }
        })
        .collect()
}

fn client_property_expressions(candidates: &[&Arc<AttributeMapping>], name: &QName, include_joins: bool) -> Vec<SourceBinding> {
    candidates
        .iter()
        .filter_map(|mapping| {
            if name.is_gml_id() {
                mapping.identifier.clone().map(SourceBinding::Direct)
            } else if let Some(expr) = mapping.client_properties.get(name) {
                Some(SourceBinding::Direct(expr.clone()))
            } else if mapping.is_nested() && include_joins {
                Some(SourceBinding::RequiresJoin)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{AttributeType, Binding};
    use crate::mapping::FeatureTypeMappingBuilder;
    use crate::name::GML_NS;

    const GSML: &str = "urn:cgi:xmlns:CGI:GeoSciML:2.0";

    fn mapping() -> FeatureTypeMapping {
        let string = Arc::new(AttributeType::simple(QName::local("string"), Binding::String));
        let name = AttributeDescriptor::new(QName::new(GML_NS, "name"), string.clone()).occurs(0, None);
        let feature_type = Arc::new(AttributeType::complex(QName::new(GSML, "MappedFeatureType"), vec![name]));
        let target = AttributeDescriptor::new(QName::new(GSML, "MappedFeature").with_prefix("gsml"), feature_type);
        FeatureTypeMappingBuilder::new(target, "MAPPEDFEATURE")
            .namespace("gml", GML_NS)
            .namespace("gsml", GSML)
            .id("ID")
            .attribute("gml:name[1]", "NAME")
            .attribute("gml:name[2]", "DESCRIPTION")
            .configure("gml:name[1]", |m| m.client_property("codeSpace", "'urn:x'"))
            .nested("gsml:specification", "GU_ID", "gsml:GeologicUnit", "ID", true)
            .configure("gsml:specification", |m| m.index_field("SPEC_IDX"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_mappings_ignoring_index() {
        let m = mapping();
        let all = m.find_mappings_for(&m.steps("gml:name").unwrap(), false);
        assert_eq!(all, vec![SourceBinding::Direct(Expr::property("NAME")), SourceBinding::Direct(Expr::property("DESCRIPTION"))]);
        let second = m.find_mappings_for(&m.steps("gml:name[2]").unwrap(), false);
        assert_eq!(second, vec![SourceBinding::Direct(Expr::property("DESCRIPTION"))]);
    }

    #[test]
    fn test_client_property_fallback() {
        let m = mapping();
        let code_space = m.find_mappings_for(&m.steps("gml:name/@codeSpace").unwrap(), false);
        assert_eq!(code_space, vec![SourceBinding::Direct(Expr::literal("urn:x"))]);
        let id = m.find_mappings_for(&m.steps("@gml:id").unwrap(), false);
        assert_eq!(id, vec![SourceBinding::Direct(Expr::property("ID"))]);
        let nested = m.steps("gsml:specification/gsml:GeologicUnit").unwrap();
        assert_eq!(m.find_mappings_for(&nested, true), vec![SourceBinding::RequiresJoin]);
        assert!(m.find_mappings_for(&nested, false).is_empty());
    }

    #[test]
    fn test_lookups() {
        let m = mapping();
        assert_eq!(m.feature_id_expression(), Some(&Expr::property("ID")));
        assert_eq!(m.nested_mappings().count(), 1);
        assert_eq!(m.index_field("gsml:specification"), Some("SPEC_IDX"));
        assert_eq!(m.index_field("gml:name"), None);
    }
}
