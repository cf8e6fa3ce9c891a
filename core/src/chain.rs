//! Resolution of a property path through feature chaining.
//!
//! A path written against a nested (virtual) feature type may cross several feature type mappings, each hop
//! being a nested attribute mapping onto another mapped type. The resolver walks those hops and describes
//! the result as an ordered chain of links plus the path of the final attribute in the last mapping.

use crate::error::Result;
use crate::feature::Attribute;
use crate::mapping::{AttributeMapping, FeatureTypeMapping, MappingRegistry};
use crate::xpath::{Step, StepList};
use appschema_filter::ast::{Expr, JoinCondition, NestedAttribute};
use std::sync::Arc;
use tracing::debug;

pub const ROOT_ALIAS: &str = "chain_root";
pub const LINK_ALIAS_PREFIX: &str = "chain_link_";

/// One hop of a feature chain.
#[derive(Debug, Clone)]
pub struct FeatureChainLink {
    pub mapping: Arc<FeatureTypeMapping>,
    /// Nested attribute mapping of `mapping` leading to the next link.
    pub nested_mapping: Option<Arc<AttributeMapping>>,
    /// The link only stands for an `xlink:href` pointing at features of `mapping`.
    pub chaining_by_reference: bool,
    pub alias: String,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

impl FeatureChainLink {
    pub fn has_nested_feature(&self) -> bool { self.nested_mapping.is_some() }

    pub fn is_joining_nested_mapping(&self) -> bool { self.nested_mapping.as_ref().is_some_and(|m| m.is_joining()) }
}

/// A resolved chain: links in order from the root mapping, and the attribute path relative to the owning link.
#[derive(Debug, Clone)]
pub struct FeatureChainedAttributeDescriptor {
    links: Vec<FeatureChainLink>,
    attribute_path: Option<StepList>,
}

impl FeatureChainedAttributeDescriptor {
    pub fn new(root: Arc<FeatureTypeMapping>) -> Self {
        let root = FeatureChainLink { mapping: root, nested_mapping: None, chaining_by_reference: false, alias: ROOT_ALIAS.to_string(), previous: None, next: None };
        Self { links: vec![root], attribute_path: None }
    }

    /// Appends a link reached from the current last link through `nested`.
    pub fn chain(&mut self, nested: Arc<AttributeMapping>, mapping: Arc<FeatureTypeMapping>) {
        let last = self.links.len() - 1;
        self.links[last].nested_mapping = Some(nested);
        self.append(mapping, false);
    }

    /// Appends a link standing for an `xlink:href` to features of `mapping`; no join is needed to reach it.
    pub fn chain_by_reference(&mut self, mapping: Arc<FeatureTypeMapping>) { self.append(mapping, true); }

    fn append(&mut self, mapping: Arc<FeatureTypeMapping>, chaining_by_reference: bool) {
        let previous = self.links.len() - 1;
        let index = self.links.len();
        self.links[previous].next = Some(index);
        self.links.push(FeatureChainLink {
            mapping,
            nested_mapping: None,
            chaining_by_reference,
            alias: format!("{}{}", LINK_ALIAS_PREFIX, index),
            previous: Some(previous),
            next: None,
        });
    }

    pub fn links(&self) -> &[FeatureChainLink] { &self.links }

    pub fn link(&self, index: usize) -> Option<&FeatureChainLink> { self.links.get(index) }

    pub fn first_link(&self) -> &FeatureChainLink { &self.links[0] }

    pub fn last_link(&self) -> &FeatureChainLink { &self.links[self.links.len() - 1] }

    pub fn chain_size(&self) -> usize { self.links.len() }

    pub fn is_chained(&self) -> bool { self.links.len() > 1 }

    pub fn attribute_path(&self) -> Option<&StepList> { self.attribute_path.as_ref() }

    pub fn set_attribute_path(&mut self, path: StepList) { self.attribute_path = Some(path); }

    /// Every link with a nested feature must be reachable by a query-time join.
    pub fn is_joining_enabled(&self) -> bool { self.links.iter().filter(|l| l.has_nested_feature()).all(FeatureChainLink::is_joining_nested_mapping) }

    /// Index of the link whose mapping the attribute path is relative to. For a chain ending in a
    /// by-reference link that is the link declaring the `xlink:href`.
    pub fn owning_link_index(&self) -> usize {
        let last = self.links.len() - 1;
        match &self.links[last] {
            link if link.chaining_by_reference => link.previous.unwrap_or(last),
            _ => last,
        }
    }

    pub fn owning_link(&self) -> &FeatureChainLink { &self.links[self.owning_link_index()] }

    /// One join condition per nested hop, root side first: the parent's source expression equals the
    /// nested type's link expression.
    pub fn join_conditions(&self) -> Vec<JoinCondition> {
        self.links
            .iter()
            .filter_map(|link| {
                let nested = link.nested_mapping.as_ref()?;
                let next = &self.links[link.next?];
                let nested_link = nested.nested()?;
                Some(JoinCondition { alias: next.alias.clone(), parent: nested.source.clone(), nested: nested_link.link_expression.clone() })
            })
            .collect()
    }

    /// Source expressions of the attribute in the owning mapping.
    pub fn leaf_sources(&self) -> Vec<Expr> {
        let Some(path) = &self.attribute_path else { return Vec::new() };
        self.owning_link().mapping.find_mappings_for(path, false).into_iter().filter_map(|b| b.expr().cloned()).filter(|e| !e.is_nil()).collect()
    }

    /// Join expressions followed by the leaf expressions: everything the source must evaluate.
    pub fn source_expressions(&self) -> Vec<Expr> {
        let mut expressions: Vec<Expr> = self.join_conditions().into_iter().flat_map(|j| [j.parent, j.nested]).collect();
        expressions.extend(self.leaf_sources());
        expressions
    }

    /// The source-side reference for `xpath` that this chain resolves.
    pub fn nested_attribute_expression(&self, xpath: &StepList) -> Expr {
        Expr::NestedAttribute(NestedAttribute {
            xpath: xpath.to_string(),
            nested_type: self.links.get(1).map(|l| l.mapping.name().to_string()),
            joins: self.join_conditions(),
            leaf: self.leaf_sources(),
        })
    }
}

/// Outcome of [`FeatureChainResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ChainResolution {
    pub attributes: Vec<FeatureChainedAttributeDescriptor>,
    /// A conditional nested mapping was crossed without a feature to evaluate it against.
    pub conditional_mapping_found: bool,
    /// An unbounded nested element marker matched the path.
    pub unbounded_nested_element_found: bool,
}

impl ChainResolution {
    pub fn conditional_mapping_was_found(&self) -> bool { self.conditional_mapping_found }
}

/// Whether a mapping for `mapping_path` covers `path`. An unindexed mapping path matches any index.
pub(crate) fn covers(path: &StepList, mapping_path: &StepList) -> bool {
    path.starts_with(mapping_path) || (!mapping_path.is_indexed() && path.starts_with_ignore_index(mapping_path))
}

pub struct FeatureChainResolver<'r> {
    registry: &'r dyn MappingRegistry,
}

impl<'r> FeatureChainResolver<'r> {
    pub fn new(registry: &'r dyn MappingRegistry) -> Self { Self { registry } }

    /// Resolves `path` starting from `root`. A conditional nested mapping can only be crossed when `feature` is given.
    pub fn resolve(&self, root: &Arc<FeatureTypeMapping>, path: &StepList, feature: Option<&Attribute>) -> Result<ChainResolution> {
        let mut resolution = ChainResolution::default();
        self.walk(&mut resolution, FeatureChainedAttributeDescriptor::new(root.clone()), path.clone(), feature)?;
        debug!("resolved {} against {}: {} attribute(s)", path, root.name(), resolution.attributes.len());
        Ok(resolution)
    }

    fn walk(&self, resolution: &mut ChainResolution, descriptor: FeatureChainedAttributeDescriptor, path: StepList, feature: Option<&Attribute>) -> Result<()> {
        let current = descriptor.last_link().mapping.clone();
        if current.attribute_mappings.iter().any(|m| m.unbounded_nested_element && m.target_path.eq_ignore_index(&path)) {
            resolution.unbounded_nested_element_found = true;
        }

        let mut search_over = true;
        for nested in current.nested_mappings() {
            if !covers(&path, &nested.target_path) {
                continue;
            }
            let Some(nested_mapping) = nested.nested() else { continue };
            let rest = path.sub_list(nested.target_path.len(), path.len());
            // a lone XML attribute belongs to the chaining element itself, not to the nested type
            if rest.len() == 1 && rest[0].xml_attribute {
                continue;
            }
            if nested_mapping.is_conditional() && feature.is_none() {
                debug!("conditional mapping at {} needs a feature to resolve {}", nested.target_path, path);
                resolution.conditional_mapping_found = true;
                search_over = false;
                continue;
            }
            let Some(nested_type) = nested_mapping.feature_type_mapping(self.registry, feature, current.namespaces())? else {
                debug!("no nested feature type for {} in {}", nested.target_path, current.name());
                continue;
            };
            let Some(next_path) = nested_path(&rest, &nested_type) else { continue };

            search_over = false;
            let mut next = descriptor.clone();
            next.chain(nested.clone(), nested_type);
            self.walk(resolution, next, next_path, feature)?;
        }

        if search_over && !path.is_empty() {
            self.resolve_direct(resolution, descriptor, path, feature)?;
        }
        Ok(())
    }

    fn resolve_direct(&self, resolution: &mut ChainResolution, mut descriptor: FeatureChainedAttributeDescriptor, path: StepList, feature: Option<&Attribute>) -> Result<()> {
        let current = descriptor.last_link().mapping.clone();
        if path.len() > 1 && path.last().is_some_and(Step::is_xlink_href) {
            let parent = path.parent();
            if let Some(nested) = current.nested_mappings().find(|m| m.target_path.eq_ignore_index(&parent)) {
                let Some(nested_mapping) = nested.nested() else { return Ok(()) };
                if nested_mapping.is_conditional() && feature.is_none() {
                    resolution.conditional_mapping_found = true;
                    return Ok(());
                }
                if let Some(referenced) = nested_mapping.feature_type_mapping(self.registry, feature, current.namespaces())? {
                    descriptor.chain_by_reference(referenced);
                    descriptor.set_attribute_path(path);
                    resolution.attributes.push(descriptor);
                }
                return Ok(());
            }
        }
        if !current.find_mappings_for(&path, true).is_empty() {
            descriptor.set_attribute_path(path);
            resolution.attributes.push(descriptor);
        }
        Ok(())
    }
}

/// Path to continue with inside `nested_type`, consuming the nested type's name when it is the next step.
/// Without the name step only a simple content nested type can be addressed directly.
fn nested_path(rest: &StepList, nested_type: &FeatureTypeMapping) -> Option<StepList> {
    let root = Step::new(nested_type.name().clone());
    match rest.first() {
        Some(step) if !step.xml_attribute && step.name == *nested_type.name() => {
            let mut inner = rest.sub_list(1, rest.len());
            if inner.first().map_or(true, |s| s.xml_attribute) {
                inner.prepend(root);
            }
            Some(inner)
        }
        Some(_) => Some(rest.clone()),
        None if nested_type.target_type().is_simple_content() => Some(StepList::single(root)),
        None => None,
    }
}
