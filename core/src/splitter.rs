//! Splits a filter written against a complex (target) feature type into the part the source can evaluate
//! and the residual part evaluated on materialized features.
//!
//! The split runs over two stacks. Every visited node lands on `pre` when the source can evaluate it and on
//! `post` otherwise; parents inspect how the stacks moved while their operands were visited and fold the
//! operands back into themselves. Filters on attributes reached through feature chaining are only kept in `pre`
//! when the chain can be joined at query time and the attribute passes a sanity check against its owning type.

use crate::capabilities::FilterCapabilities;
use crate::chain::{covers, FeatureChainResolver, FeatureChainedAttributeDescriptor};
use crate::config::SplitterConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::mapping::{FeatureTypeMapping, MappingRegistry, SourceBinding};
use crate::unmapping::UnmappingVisitor;
use crate::xpath::StepList;
use appschema_filter::ast::{Expr, Filter, OperatorKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a split: `pre` goes to the source, `post` is evaluated after retrieval. Either may be `Include`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitFilter {
    pub pre: Filter,
    pub post: Filter,
}

#[derive(Debug, Clone)]
enum Node {
    Filter(Filter),
    Expr(Expr),
}

/// Per-split state.
#[derive(Debug, Default)]
struct SplitContext {
    pre: Vec<Node>,
    post: Vec<Node>,
    /// Chained attributes referenced by the node being checked, with the target path each was resolved from.
    nested_attributes: Vec<(StepList, FeatureChainedAttributeDescriptor)>,
    /// Temporal operators go to `post` whatever the capabilities say, as `pre` is unmapped afterwards.
    temporal_to_post: bool,
}

impl SplitContext {
    fn to_post(&mut self, node: Node) {
        debug!("post: {:?}", node);
        self.post.push(node);
    }

    /// Moves the node just accepted into `pre` over to `post`.
    fn reject_top(&mut self) {
        if let Some(node) = self.pre.pop() {
            self.to_post(node);
        }
    }
}

/// How nested attributes touched by a node are vetted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestedCheck {
    /// One chained attribute is allowed if it passes the sanity check; `spatial` requires a geometry.
    SingleAttribute { spatial: bool },
    /// No chained attribute is allowed at all.
    None,
}

/// Splits filters against one feature type mapping.
///
/// A splitter holds no per-split state and can be shared across threads.
pub struct ComplexFilterSplitter<'a> {
    mapping: &'a Arc<FeatureTypeMapping>,
    registry: &'a dyn MappingRegistry,
    capabilities: &'a FilterCapabilities,
    config: SplitterConfig,
}

impl<'a> ComplexFilterSplitter<'a> {
    pub fn new(mapping: &'a Arc<FeatureTypeMapping>, registry: &'a dyn MappingRegistry, capabilities: &'a FilterCapabilities) -> Self {
        Self { mapping, registry, capabilities, config: SplitterConfig::default() }
    }

    pub fn with_config(mut self, config: SplitterConfig) -> Self {
        self.config = config;
        self
    }

    /// Splits `filter` and rewrites the source half in source terms. Temporal operators are never unmapped and
    /// always end up in `post`.
    pub fn split(&self, filter: &Filter) -> Result<SplitFilter> {
        let SplitFilter { pre, post } = self.split_with(filter, true)?;
        let pre = UnmappingVisitor::new(self.mapping).with_registry(self.registry).unmap_filter(&pre)?;
        Ok(SplitFilter { pre, post })
    }

    /// Splits `filter`, leaving both halves in target terms.
    pub fn split_target(&self, filter: &Filter) -> Result<SplitFilter> { self.split_with(filter, false) }

    fn split_with(&self, filter: &Filter, temporal_to_post: bool) -> Result<SplitFilter> {
        let mut ctx = SplitContext { temporal_to_post, ..SplitContext::default() };
        self.visit_filter(&mut ctx, filter)?;
        let pre = top_filter(ctx.pre, "pre")?;
        let post = top_filter(ctx.post, "post")?;
        debug!("split {:?} on {} into pre {:?} and post {:?}", filter, self.mapping.name(), pre, post);
        Ok(SplitFilter { pre, post })
    }

    fn supports(&self, kind: OperatorKind) -> bool { self.capabilities.supports(kind) }

    fn visit_filter(&self, ctx: &mut SplitContext, filter: &Filter) -> Result<()> {
        let node = || Node::Filter(filter.clone());
        match filter {
            Filter::Include => Ok(()),
            Filter::Exclude if self.supports(OperatorKind::Exclude) => {
                ctx.pre.push(node());
                Ok(())
            }
            Filter::Exclude => {
                ctx.to_post(node());
                Ok(())
            }
            Filter::And(children) => self.visit_and(ctx, filter, children),
            Filter::Or(children) => self.visit_or(ctx, filter, children),
            Filter::Not(inner) => self.visit_not(ctx, filter, inner),
            Filter::Id(_) => self.visit_id(ctx, filter),
            Filter::Comparison { left, right, .. } => {
                self.checked(ctx, NestedCheck::SingleAttribute { spatial: false }, |s, ctx| s.visit_operands(ctx, filter.kind(), node(), &[left, right]))
            }
            Filter::Between { expr, lower, upper } => self.checked(ctx, NestedCheck::SingleAttribute { spatial: false }, |s, ctx| {
                s.visit_operands(ctx, filter.kind(), node(), &[lower, expr, upper])
            }),
            Filter::Like { expr, .. } | Filter::IsNull(expr) | Filter::IsNil(expr) => {
                self.checked(ctx, NestedCheck::SingleAttribute { spatial: false }, |s, ctx| s.visit_operands(ctx, filter.kind(), node(), &[expr]))
            }
            Filter::Spatial { left, right, .. } => {
                self.checked(ctx, NestedCheck::SingleAttribute { spatial: true }, |s, ctx| s.visit_operands(ctx, filter.kind(), node(), &[left, right]))
            }
            // the default geometry is resolved at runtime, there is nothing to check
            Filter::BBox { property, .. } if matches!(&**property, Expr::Property(name) if name.is_empty()) => {
                if self.supports(OperatorKind::BBox) {
                    ctx.pre.push(node());
                } else {
                    ctx.to_post(node());
                }
                Ok(())
            }
            Filter::BBox { property, .. } => {
                self.checked(ctx, NestedCheck::SingleAttribute { spatial: true }, |s, ctx| s.visit_operands(ctx, filter.kind(), node(), &[property]))
            }
            Filter::Temporal { .. } if ctx.temporal_to_post => {
                ctx.to_post(node());
                Ok(())
            }
            Filter::Temporal { left, right, .. } => self.checked(ctx, NestedCheck::None, |s, ctx| s.visit_operands(ctx, filter.kind(), node(), &[left, right])),
        }
    }

    fn visit_expr(&self, ctx: &mut SplitContext, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {
                ctx.pre.push(Node::Expr(expr.clone()));
                Ok(())
            }
            Expr::Property(name) => self.visit_property(ctx, expr, name),
            Expr::Function { name, args } => self.checked(ctx, NestedCheck::None, |s, ctx| {
                if !s.capabilities.supports_function(name) {
                    ctx.to_post(Node::Expr(expr.clone()));
                    return Ok(());
                }
                s.visit_all(ctx, Node::Expr(expr.clone()), args.iter())
            }),
            Expr::Arithmetic { left, operator, right } => {
                self.checked(ctx, NestedCheck::None, |s, ctx| s.visit_operands(ctx, OperatorKind::Arithmetic(*operator), Node::Expr(expr.clone()), &[left, right]))
            }
            Expr::Nil | Expr::NestedAttribute(_) => {
                ctx.to_post(Node::Expr(expr.clone()));
                Ok(())
            }
        }
    }

    fn visit_operands(&self, ctx: &mut SplitContext, kind: OperatorKind, node: Node, operands: &[&Box<Expr>]) -> Result<()> {
        if !self.supports(kind) {
            ctx.to_post(node);
            return Ok(());
        }
        self.visit_all(ctx, node, operands.iter().map(|operand| operand.as_ref()))
    }

    /// Visits operands in order. The first one landing in `post` sends the whole node there; otherwise the operands
    /// are replaced by the node in `pre`.
    fn visit_all<'e>(&self, ctx: &mut SplitContext, node: Node, operands: impl Iterator<Item = &'e Expr>) -> Result<()> {
        let (i, j) = (ctx.post.len(), ctx.pre.len());
        for operand in operands {
            self.visit_expr(ctx, operand)?;
            if ctx.post.len() > i {
                ctx.post.truncate(i);
                ctx.pre.truncate(j);
                ctx.to_post(node);
                return Ok(());
            }
        }
        ctx.pre.truncate(j);
        ctx.pre.push(node);
        Ok(())
    }

    /// Runs `visit` and vets the chained attributes it touched, if it produced exactly one node in `pre`.
    fn checked(&self, ctx: &mut SplitContext, check: NestedCheck, visit: impl FnOnce(&Self, &mut SplitContext) -> Result<()>) -> Result<()> {
        let outer = std::mem::take(&mut ctx.nested_attributes);
        let depth = ctx.pre.len();
        visit(self, ctx)?;
        let touched = std::mem::take(&mut ctx.nested_attributes);

        if ctx.pre.len() == depth + 1 && !touched.is_empty() {
            // indexes count: `a[1]/b` and `a[2]/b` are different instances of the chained type
            let mut distinct: Vec<&(StepList, FeatureChainedAttributeDescriptor)> = Vec::new();
            for touch in &touched {
                if !distinct.iter().any(|(path, _)| *path == touch.0) {
                    distinct.push(touch);
                }
            }
            match (check, distinct.as_slice()) {
                (NestedCheck::SingleAttribute { spatial }, [(_, attribute)]) => self.sanity_check(attribute, spatial)?,
                (NestedCheck::SingleAttribute { .. }, _) => {
                    debug!("{} nested attributes in one operator, evaluating after retrieval", distinct.len());
                    ctx.reject_top();
                }
                (NestedCheck::None, _) => {
                    debug!("nested attribute inside a function, arithmetic or temporal operator, evaluating after retrieval");
                    ctx.reject_top();
                }
            }
        }

        ctx.nested_attributes = outer;
        ctx.nested_attributes.extend(touched);
        Ok(())
    }

    fn visit_and(&self, ctx: &mut SplitContext, filter: &Filter, children: &[Filter]) -> Result<()> {
        if !self.supports(OperatorKind::And) {
            ctx.to_post(Node::Filter(filter.clone()));
            return Ok(());
        }
        let (i, j) = (ctx.post.len(), ctx.pre.len());
        for child in children {
            self.visit_filter(ctx, child)?;
        }
        if ctx.post.len() > i {
            let post = into_filters(ctx.post.split_off(i))?;
            if ctx.pre.len() > j {
                let pre = into_filters(ctx.pre.split_off(j))?;
                ctx.pre.push(Node::Filter(Filter::and(pre)));
            }
            ctx.to_post(Node::Filter(Filter::and(post)));
            return Ok(());
        }
        ctx.pre.truncate(j);
        ctx.pre.push(Node::Filter(filter.clone()));
        Ok(())
    }

    /// A disjunction is evaluated in one place: any part needing `post` takes the whole of it there.
    fn visit_or(&self, ctx: &mut SplitContext, filter: &Filter, children: &[Filter]) -> Result<()> {
        if !self.supports(OperatorKind::Or) {
            ctx.to_post(Node::Filter(filter.clone()));
            return Ok(());
        }
        let (i, j) = (ctx.post.len(), ctx.pre.len());
        for child in children {
            self.visit_filter(ctx, child)?;
            if ctx.post.len() > i {
                ctx.post.truncate(i);
                ctx.pre.truncate(j);
                ctx.to_post(Node::Filter(filter.clone()));
                return Ok(());
            }
        }
        ctx.pre.truncate(j);
        ctx.pre.push(Node::Filter(filter.clone()));
        Ok(())
    }

    fn visit_not(&self, ctx: &mut SplitContext, filter: &Filter, inner: &Filter) -> Result<()> {
        if !self.supports(OperatorKind::Not) {
            ctx.to_post(Node::Filter(filter.clone()));
            return Ok(());
        }
        let (i, j) = (ctx.post.len(), ctx.pre.len());
        self.visit_filter(ctx, inner)?;
        if ctx.post.len() > i {
            ctx.post.truncate(i);
            ctx.pre.truncate(j);
            ctx.to_post(Node::Filter(filter.clone()));
        } else {
            ctx.pre.truncate(j);
            ctx.pre.push(Node::Filter(filter.clone()));
        }
        Ok(())
    }

    /// Identifiers can only be matched by the source when it can evaluate the feature id expression.
    fn visit_id(&self, ctx: &mut SplitContext, filter: &Filter) -> Result<()> {
        let encodable = self.supports(OperatorKind::Id)
            && match self.mapping.feature_id_expression() {
                Some(Expr::Nil) => true,
                Some(Expr::Function { name, .. }) if name.eq_ignore_ascii_case("getID") => true,
                Some(expr) => self.capabilities.supports_expr(expr),
                None => false,
            };
        if encodable {
            ctx.pre.push(Node::Filter(filter.clone()));
        } else {
            ctx.to_post(Node::Filter(filter.clone()));
        }
        Ok(())
    }

    fn visit_property(&self, ctx: &mut SplitContext, expr: &Expr, name: &str) -> Result<()> {
        let xpath = match (name.is_empty(), self.mapping.default_geometry_xpath()) {
            (false, _) => name,
            (true, Some(default_geometry)) => default_geometry,
            (true, None) => {
                ctx.to_post(Node::Expr(expr.clone()));
                return Ok(());
            }
        };
        let steps = self.mapping.steps(xpath)?;
        if steps.contains_predicate() {
            ctx.to_post(Node::Expr(expr.clone()));
            return Ok(());
        }

        let resolution = match FeatureChainResolver::new(self.registry).resolve(self.mapping, &steps, None) {
            Ok(resolution) => resolution,
            Err(e) if e.kind() == ErrorKind::Io => {
                warn!("cannot resolve {} in {}, evaluating after retrieval: {}", xpath, self.mapping.name(), e);
                ctx.to_post(Node::Expr(expr.clone()));
                return Ok(());
            }
            Err(e) => return Err(Error::InvalidNestedAttribute { path: xpath.to_string(), type_name: self.mapping.name().to_string(), reason: e.to_string() }),
        };
        if resolution.attributes.is_empty()
            && !resolution.conditional_mapping_was_found()
            && !resolution.unbounded_nested_element_found
            && !self.attribute_exists(&steps)
        {
            return Err(Error::AttributeNotFound { path: xpath.to_string(), type_name: self.mapping.name().to_string() });
        }

        let mut sources = self.mapping.find_mappings_for(&steps, false);
        if self.config.encode_nested_filters {
            if let [attribute] = resolution.attributes.as_slice() {
                if attribute.is_chained() && attribute.is_joining_enabled() {
                    sources.retain(|s| !s.is_requires_join());
                    sources.extend(attribute.source_expressions().into_iter().map(SourceBinding::Direct));
                    ctx.nested_attributes.push((steps.clone(), attribute.clone()));
                }
            }
        }

        if sources.is_empty() {
            match self.mapping.multiple_value_source(&steps) {
                Some(source) if self.config.encode_nested_filters && self.capabilities.supports_expr(source) => {
                    debug!("{} is multi-valued, filtering on {:?}", xpath, source);
                    ctx.pre.push(Node::Expr(expr.clone()));
                }
                _ => {
                    debug!("no source expression for {}", xpath);
                    ctx.to_post(Node::Expr(expr.clone()));
                }
            }
            return Ok(());
        }
        let encodable = sources.iter().all(|source| match source {
            SourceBinding::Direct(source) => self.capabilities.supports_expr(source),
            SourceBinding::RequiresJoin => false,
        });
        if encodable {
            ctx.pre.push(Node::Expr(expr.clone()));
        } else {
            debug!("{} maps to source expressions the source cannot evaluate", xpath);
            ctx.to_post(Node::Expr(expr.clone()));
        }
        Ok(())
    }

    /// Whether the target type declares `steps`, allowing for attributes behind nested mappings that resolved to nothing.
    fn attribute_exists(&self, steps: &StepList) -> bool {
        if self.mapping.nested_mappings().any(|m| covers(steps, &m.target_path)) {
            return true;
        }
        let path = strip_self_step(steps.without_indexes(), self.mapping);
        declares(self.mapping.target_type(), &path, false)
    }

    /// Checks the single chained attribute an encoded operator refers to against the type that owns it.
    fn sanity_check(&self, attribute: &FeatureChainedAttributeDescriptor, spatial: bool) -> Result<()> {
        let Some(attribute_path) = attribute.attribute_path() else { return Ok(()) };
        let owner_index = attribute.owning_link_index();
        let owner = &attribute.links()[owner_index];
        let mut owning_mapping = owner.mapping.clone();
        let mut path = attribute_path.clone();

        // a simple content type addressed by its own name is checked as the element chaining it
        let owner_type = owning_mapping.target_type();
        if owner_type.is_simple_content() && path.len() == 1 && path[0].name == *owning_mapping.name() {
            if let Some(previous) = owner.previous.and_then(|p| attribute.link(p)) {
                if let Some(nested) = &previous.nested_mapping {
                    path = nested.target_path.clone();
                    owning_mapping = previous.mapping.clone();
                }
            }
        }

        let mut path = path.without_indexes().without_predicates();
        // href and id are synthesized, their element is what must exist
        if path.last().is_some_and(|s| s.is_xlink_href() || s.is_id()) {
            path = path.parent();
        }
        let path = strip_self_step(path, &owning_mapping);
        if declares(owning_mapping.target_type(), &path, spatial) {
            return Ok(());
        }
        let reason = if spatial { "not a geometry attribute of the type" } else { "not declared by the type" };
        Err(Error::InvalidNestedAttribute { path: attribute_path.to_string(), type_name: owning_mapping.name().to_string(), reason: reason.into() })
    }
}

fn strip_self_step(mut path: StepList, mapping: &FeatureTypeMapping) -> StepList {
    if path.first().is_some_and(|s| !s.xml_attribute && s.name == *mapping.name()) {
        path.remove_first();
    }
    path
}

/// Whether `root_type` declares the element or XML attribute at `path`; an empty path is the type itself.
fn declares(root_type: &crate::feature::AttributeType, path: &StepList, geometry: bool) -> bool {
    match path.last() {
        None => !geometry,
        Some(last) if last.xml_attribute => {
            let parent = path.parent();
            let parent_type = if parent.is_empty() { Some(root_type) } else { root_type.descriptor_at(&parent).map(|d| d.attr_type.as_ref()) };
            parent_type.is_some_and(|t| t.has_xml_attribute(&last.name))
        }
        Some(_) => root_type.descriptor_at(path).is_some_and(|d| !geometry || d.attr_type.is_geometry()),
    }
}

fn into_filters(nodes: Vec<Node>) -> Result<Vec<Filter>> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Filter(filter) => Ok(filter),
            Node::Expr(expr) => Err(Error::IllegalState(format!("expression {:?} left where a filter was expected", expr))),
        })
        .collect()
}

fn top_filter(mut stack: Vec<Node>, name: &str) -> Result<Filter> {
    if stack.len() > 1 {
        warn!("{} stack holds {} items after splitting, using the last", name, stack.len());
    }
    match stack.pop() {
        None => Ok(Filter::Include),
        Some(node) => Ok(into_filters(vec![node])?.remove(0)),
    }
}
