//! What the underlying data source can evaluate natively.

use appschema_filter::ast::{ArithmeticOperator, ComparisonOperator, Expr, Filter, SpatialOperator, TemporalOperator};
use appschema_filter::OperatorKind;
use std::collections::HashSet;

const COMPARISONS: [ComparisonOperator; 6] = [
    ComparisonOperator::Equal,
    ComparisonOperator::NotEqual,
    ComparisonOperator::GreaterThan,
    ComparisonOperator::GreaterThanOrEqual,
    ComparisonOperator::LessThan,
    ComparisonOperator::LessThanOrEqual,
];

const ARITHMETIC: [ArithmeticOperator; 4] = [ArithmeticOperator::Add, ArithmeticOperator::Subtract, ArithmeticOperator::Multiply, ArithmeticOperator::Divide];

const SPATIAL: [SpatialOperator; 10] = [
    SpatialOperator::Beyond,
    SpatialOperator::Contains,
    SpatialOperator::Crosses,
    SpatialOperator::Disjoint,
    SpatialOperator::DWithin,
    SpatialOperator::Equals,
    SpatialOperator::Intersects,
    SpatialOperator::Overlaps,
    SpatialOperator::Touches,
    SpatialOperator::Within,
];

const TEMPORAL: [TemporalOperator; 14] = [
    TemporalOperator::After,
    TemporalOperator::AnyInteracts,
    TemporalOperator::Before,
    TemporalOperator::Begins,
    TemporalOperator::BegunBy,
    TemporalOperator::During,
    TemporalOperator::EndedBy,
    TemporalOperator::Ends,
    TemporalOperator::Meets,
    TemporalOperator::MetBy,
    TemporalOperator::OverlappedBy,
    TemporalOperator::TContains,
    TemporalOperator::TEquals,
    TemporalOperator::TOverlaps,
];

/// Filter capabilities of a data source: the operators and functions it can evaluate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCapabilities {
    operators: HashSet<OperatorKind>,
    /// Lower-cased function names.
    functions: HashSet<String>,
    all_functions: bool,
}

impl FilterCapabilities {
    /// Nothing can be evaluated by the source; every filter is residual.
    pub fn none() -> Self { Self::default() }

    /// Logic, the six comparisons, `BETWEEN`, `LIKE`, null checks, identifiers, `INCLUDE` and `EXCLUDE`.
    pub fn simple_comparisons() -> Self {
        let mut capabilities = Self::none()
            .with_all([
                OperatorKind::Include,
                OperatorKind::Exclude,
                OperatorKind::And,
                OperatorKind::Or,
                OperatorKind::Not,
                OperatorKind::Between,
                OperatorKind::Like,
                OperatorKind::IsNull,
                OperatorKind::Id,
            ]);
        capabilities.operators.extend(COMPARISONS.into_iter().map(OperatorKind::Comparison));
        capabilities
    }

    /// Everything, including any function.
    pub fn all() -> Self {
        let mut capabilities = Self::simple_comparisons().with_all([OperatorKind::IsNil, OperatorKind::BBox]).with_all_functions();
        capabilities.operators.extend(ARITHMETIC.into_iter().map(OperatorKind::Arithmetic));
        capabilities.operators.extend(SPATIAL.into_iter().map(OperatorKind::Spatial));
        capabilities.operators.extend(TEMPORAL.into_iter().map(OperatorKind::Temporal));
        capabilities
    }

    pub fn with(mut self, kind: OperatorKind) -> Self {
        self.operators.insert(kind);
        self
    }

    pub fn with_all(mut self, kinds: impl IntoIterator<Item = OperatorKind>) -> Self {
        self.operators.extend(kinds);
        self
    }

    pub fn without(mut self, kind: OperatorKind) -> Self {
        self.operators.remove(&kind);
        self
    }

    pub fn with_function(mut self, name: &str) -> Self {
        self.functions.insert(name.to_ascii_lowercase());
        self
    }

    pub fn with_all_functions(mut self) -> Self {
        self.all_functions = true;
        self
    }

    pub fn supports(&self, kind: OperatorKind) -> bool { self.operators.contains(&kind) }

    pub fn supports_function(&self, name: &str) -> bool { self.all_functions || self.functions.contains(&name.to_ascii_lowercase()) }

    /// Whether the whole of `filter`, operands included, can be evaluated by the source.
    pub fn supports_filter(&self, filter: &Filter) -> bool {
        if !self.supports(filter.kind()) {
            return false;
        }
        match filter {
            Filter::Include | Filter::Exclude | Filter::Id(_) => true,
            Filter::And(children) | Filter::Or(children) => children.iter().all(|c| self.supports_filter(c)),
            Filter::Not(inner) => self.supports_filter(inner),
            Filter::Comparison { left, right, .. } | Filter::Spatial { left, right, .. } | Filter::Temporal { left, right, .. } => {
                self.supports_expr(left) && self.supports_expr(right)
            }
            Filter::Between { expr, lower, upper } => self.supports_expr(expr) && self.supports_expr(lower) && self.supports_expr(upper),
            Filter::Like { expr, .. } | Filter::IsNull(expr) | Filter::IsNil(expr) => self.supports_expr(expr),
            Filter::BBox { property, .. } => self.supports_expr(property),
        }
    }

    /// Whether `expr` can be evaluated by the source. Literals and property names always can; a nested
    /// attribute reference never can, since it spans several source types.
    pub fn supports_expr(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(_) | Expr::Property(_) => true,
            Expr::Function { name, args } => self.supports_function(name) && args.iter().all(|a| self.supports_expr(a)),
            Expr::Arithmetic { left, operator, right } => {
                self.supports(OperatorKind::Arithmetic(*operator)) && self.supports_expr(left) && self.supports_expr(right)
            }
            Expr::Nil | Expr::NestedAttribute(_) => false,
        }
    }
}
