//! Rewrites filters from target (complex feature) terms into source terms.
//!
//! A target attribute can be mapped by several source expressions, so every expression unmaps to a list of
//! alternatives. Operators combine the alternatives of their operands as a cross product, ORing the resulting
//! filters together.

use crate::chain::{covers, FeatureChainResolver};
use crate::error::{Error, Result};
use crate::mapping::{AttributeMapping, FeatureTypeMapping, MappingRegistry, NestedTypeSelector};
use crate::xpath::StepList;
use appschema_filter::ast::{Expr, Filter, NestedAttribute};
use std::sync::Arc;
use tracing::debug;

pub struct UnmappingVisitor<'a> {
    mapping: &'a Arc<FeatureTypeMapping>,
    /// Used to describe the join path of nested attribute references.
    registry: Option<&'a dyn MappingRegistry>,
}

impl<'a> UnmappingVisitor<'a> {
    pub fn new(mapping: &'a Arc<FeatureTypeMapping>) -> Self { Self { mapping, registry: None } }

    pub fn with_registry(mut self, registry: &'a dyn MappingRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn unmap_filter(&self, filter: &Filter) -> Result<Filter> {
        let unmapped = match filter {
            Filter::Include | Filter::Exclude => filter.clone(),
            Filter::And(children) => Filter::And(children.iter().map(|c| self.unmap_filter(c)).collect::<Result<_>>()?),
            Filter::Or(children) => Filter::Or(children.iter().map(|c| self.unmap_filter(c)).collect::<Result<_>>()?),
            Filter::Not(inner) => Filter::not(self.unmap_filter(inner)?),
            Filter::Comparison { left, operator, right, match_case } => {
                let (lefts, rights) = (self.unmap_expr(left)?, self.unmap_expr(right)?);
                Filter::or(cross(&lefts, &rights, |l, r| Filter::Comparison {
                    left: Box::new(l.clone()),
                    operator: *operator,
                    right: Box::new(r.clone()),
                    match_case: *match_case,
                }))
            }
            Filter::Between { expr, lower, upper } => {
                let (values, floors, roofs) = (self.unmap_expr(expr)?, self.unmap_expr(lower)?, self.unmap_expr(upper)?);
                let mut combined = Vec::with_capacity(values.len() * floors.len() * roofs.len());
                for floor in &floors {
                    for value in &values {
                        for roof in &roofs {
                            combined.push(Filter::Between { expr: Box::new(value.clone()), lower: Box::new(floor.clone()), upper: Box::new(roof.clone()) });
                        }
                    }
                }
                Filter::or(combined)
            }
            Filter::Like { expr, pattern, wildcard, single_char, escape, match_case } => Filter::or(
                self.unmap_expr(expr)?
                    .into_iter()
                    .map(|e| Filter::Like {
                        expr: Box::new(e),
                        pattern: pattern.clone(),
                        wildcard: *wildcard,
                        single_char: *single_char,
                        escape: *escape,
                        match_case: *match_case,
                    })
                    .collect(),
            ),
            Filter::IsNull(expr) => Filter::or(self.unmap_expr(expr)?.into_iter().map(|e| Filter::IsNull(Box::new(e))).collect()),
            Filter::IsNil(_) => return Err(Error::unsupported("nil checks cannot be expressed in source terms")),
            Filter::Spatial { operator, left, right, distance } => {
                let (lefts, rights) = (self.unmap_expr(left)?, self.unmap_expr(right)?);
                Filter::or(cross(&lefts, &rights, |l, r| Filter::Spatial {
                    operator: *operator,
                    left: Box::new(l.clone()),
                    right: Box::new(r.clone()),
                    distance: distance.clone(),
                }))
            }
            // the default geometry is left for the source to resolve
            Filter::BBox { property, .. } if matches!(&**property, Expr::Property(name) if name.is_empty()) => filter.clone(),
            Filter::BBox { property, envelope, srs } => Filter::or(
                self.unmap_expr(property)?.into_iter().map(|p| Filter::BBox { property: Box::new(p), envelope: *envelope, srs: srs.clone() }).collect(),
            ),
            Filter::Temporal { .. } => return Err(Error::unsupported("Temporal filters not supported")),
            Filter::Id(ids) => self.unmap_id(filter, ids)?,
        };
        Ok(unmapped)
    }

    fn unmap_id(&self, filter: &Filter, ids: &[String]) -> Result<Filter> {
        let fid = self.mapping.feature_id_expression().ok_or_else(|| Error::MissingFeatureId(self.mapping.name().to_string()))?;
        match fid {
            // the source identifiers are the feature identifiers
            Expr::Nil => Ok(filter.clone()),
            Expr::Function { name, .. } if name.eq_ignore_ascii_case("getID") => Ok(filter.clone()),
            _ => Ok(Filter::or(ids.iter().map(|id| Filter::equals(fid.clone(), Expr::literal(id.as_str()))).collect())),
        }
    }

    /// Source alternatives for `expr`; never empty.
    pub fn unmap_expr(&self, expr: &Expr) -> Result<Vec<Expr>> {
        match expr {
            Expr::Literal(_) | Expr::Nil | Expr::NestedAttribute(_) => Ok(vec![expr.clone()]),
            Expr::Property(name) => self.unmap_property(name),
            Expr::Function { name, args } => {
                let mut unmapped = Vec::with_capacity(args.len());
                for arg in args {
                    let mut alternatives = self.unmap_expr(arg)?;
                    if alternatives.len() != 1 {
                        return Err(Error::unsupported(format!("argument {:?} of function {} maps to {} source expressions", arg, name, alternatives.len())));
                    }
                    unmapped.push(alternatives.remove(0));
                }
                Ok(vec![Expr::function(name.clone(), unmapped)])
            }
            Expr::Arithmetic { left, operator, right } => {
                let (lefts, rights) = (self.unmap_expr(left)?, self.unmap_expr(right)?);
                Ok(cross(&lefts, &rights, |l, r| Expr::Arithmetic { left: Box::new(l.clone()), operator: *operator, right: Box::new(r.clone()) }))
            }
        }
    }

    fn unmap_property(&self, name: &str) -> Result<Vec<Expr>> {
        let xpath = match (name.is_empty(), self.mapping.default_geometry_xpath()) {
            (true, Some(default_geometry)) => default_geometry,
            (true, None) => return Ok(vec![Expr::property(name)]),
            (false, _) => name,
        };
        let steps = self.mapping.steps(xpath)?;

        let mut alternatives: Vec<Expr> = self.mapping.find_mappings_for(&steps, false).into_iter().filter_map(|b| b.expr().cloned()).collect();
        if alternatives.is_empty() {
            alternatives.extend(self.mapping.multiple_value_source(&steps).cloned());
        }
        for nested in self.mapping.nested_mappings() {
            if !covers(&steps, &nested.target_path) {
                continue;
            }
            // an XML attribute of the chaining element itself, e.g. its xlink:href
            let rest = steps.sub_list(nested.target_path.len(), steps.len());
            if rest.len() == 1 && rest[0].xml_attribute {
                continue;
            }
            let custom = self.mapping.nested_expression_factory.as_ref().and_then(|f| f.nested_attribute_expression(&steps, self.mapping, nested));
            alternatives.push(match custom {
                Some(expr) => expr,
                None => self.nested_attribute_expression(xpath, &steps, nested),
            });
        }

        alternatives.retain(|e| !e.is_nil());
        if alternatives.is_empty() {
            return Err(Error::UnmappedAttribute(xpath.to_string()));
        }
        Ok(alternatives)
    }

    /// Reference to `steps` through `nested`, with its join path when the chain can be resolved.
    fn nested_attribute_expression(&self, xpath: &str, steps: &StepList, nested: &AttributeMapping) -> Expr {
        let nested_type = nested.nested().and_then(|n| match &n.selector {
            NestedTypeSelector::Fixed(name) => Some(name.to_string()),
            NestedTypeSelector::Conditional(_) => None,
        });
        let plain = Expr::NestedAttribute(NestedAttribute { xpath: xpath.to_string(), nested_type, joins: Vec::new(), leaf: Vec::new() });
        let Some(registry) = self.registry else { return plain };

        match FeatureChainResolver::new(registry).resolve(self.mapping, steps, None) {
            Ok(resolution) => resolution
                .attributes
                .iter()
                .find(|a| a.first_link().nested_mapping.as_ref().is_some_and(|m| m.target_path == nested.target_path))
                .map(|a| match a.nested_attribute_expression(steps) {
                    Expr::NestedAttribute(resolved) => Expr::NestedAttribute(NestedAttribute { xpath: xpath.to_string(), ..resolved }),
                    other => other,
                })
                .unwrap_or(plain),
            Err(e) => {
                debug!("cannot resolve the chain of {}: {}", xpath, e);
                plain
            }
        }
    }
}

fn cross<T>(lefts: &[Expr], rights: &[Expr], combine: impl Fn(&Expr, &Expr) -> T) -> Vec<T> {
    lefts.iter().flat_map(|l| rights.iter().map(|r| combine(l, r)).collect::<Vec<_>>()).collect()
}
