//! Splitting filters between an external attribute index and the main data source.
//!
//! When some attributes are backed by an index, the indexed part of a filter is answered by the index with a list
//! of feature identifiers. The detector finds that part; [`combine_with_id_filter`] then replaces it in the original
//! filter by an identifier filter so the rest can go to the data source.

use crate::mapping::FeatureTypeMapping;
use appschema_filter::ast::Filter;

/// Whether an attribute, by target xpath, is backed by an index.
pub trait IndexedAttributes {
    fn is_indexed(&self, xpath: &str) -> bool;
}

impl IndexedAttributes for FeatureTypeMapping {
    fn is_indexed(&self, xpath: &str) -> bool { self.index_field(xpath).is_some() }
}

impl<F: Fn(&str) -> bool> IndexedAttributes for F {
    fn is_indexed(&self, xpath: &str) -> bool { self(xpath) }
}

/// Outcome of [`IndexedFilterDetector::detect`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedFilterDetection {
    /// The `And`/`Or` whose children were split into indexed and non-indexed ones; `None` when the whole filter
    /// is indexed or nothing is.
    pub parent_logic_filter: Option<Filter>,
    pub indexed_filters: Vec<Filter>,
}

impl IndexedFilterDetection {
    pub fn is_empty(&self) -> bool { self.indexed_filters.is_empty() }

    /// The part of the filter the index answers: the indexed children under the parent's operator.
    pub fn indexed_filter(&self) -> Option<Filter> {
        match (&self.parent_logic_filter, self.indexed_filters.len()) {
            (_, 0) => None,
            (Some(Filter::Or(_)), _) => Some(Filter::or(self.indexed_filters.clone())),
            _ => Some(Filter::and(self.indexed_filters.clone())),
        }
    }
}

pub struct IndexedFilterDetector<'a, I: ?Sized> {
    indexed: &'a I,
}

impl<'a, I: IndexedAttributes + ?Sized> IndexedFilterDetector<'a, I> {
    pub fn new(indexed: &'a I) -> Self { Self { indexed } }

    pub fn detect(&self, filter: &Filter) -> IndexedFilterDetection {
        if self.is_fully_indexed(filter) {
            return IndexedFilterDetection { parent_logic_filter: None, indexed_filters: vec![filter.clone()] };
        }
        match filter {
            Filter::And(children) | Filter::Or(children) => {
                let indexed_filters: Vec<Filter> = children.iter().filter(|c| self.is_fully_indexed(c)).cloned().collect();
                if indexed_filters.is_empty() {
                    IndexedFilterDetection::default()
                } else {
                    IndexedFilterDetection { parent_logic_filter: Some(filter.clone()), indexed_filters }
                }
            }
            _ => IndexedFilterDetection::default(),
        }
    }

    /// Every property the filter reads is indexed, and it reads at least one.
    pub fn is_fully_indexed(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Include | Filter::Exclude | Filter::Id(_) => false,
            Filter::And(children) | Filter::Or(children) => !children.is_empty() && children.iter().all(|c| self.is_fully_indexed(c)),
            Filter::Not(inner) => self.is_fully_indexed(inner),
            _ => {
                let names = filter.property_names();
                !names.is_empty() && names.iter().all(|n| self.indexed.is_indexed(n))
            }
        }
    }
}

/// `filter` with the indexed part replaced by an identifier filter over `ids`.
///
/// Without a parent logic filter the whole filter was indexed, so only the identifiers remain. Otherwise the parent
/// is rebuilt from the identifier filter and its non-indexed children.
pub fn combine_with_id_filter(filter: &Filter, detection: &IndexedFilterDetection, ids: Vec<String>) -> Filter {
    let Some(parent) = &detection.parent_logic_filter else { return Filter::Id(ids) };
    let mut ids = Some(ids);
    replace(filter, parent, &mut |node| {
        let (Filter::And(children) | Filter::Or(children)) = node else { return node.clone() };
        let mut combined = vec![Filter::Id(ids.take().unwrap_or_default())];
        combined.extend(children.iter().filter(|c| !detection.indexed_filters.contains(c)).cloned());
        match node {
            Filter::Or(_) => Filter::or(combined),
            _ => Filter::and(combined),
        }
    })
}

fn replace(filter: &Filter, target: &Filter, with: &mut impl FnMut(&Filter) -> Filter) -> Filter {
    if filter == target {
        return with(filter);
    }
    match filter {
        Filter::And(children) => Filter::And(children.iter().map(|c| replace(c, target, with)).collect()),
        Filter::Or(children) => Filter::Or(children.iter().map(|c| replace(c, target, with)).collect()),
        Filter::Not(inner) => Filter::not(replace(inner, target, with)),
        other => other.clone(),
    }
}
