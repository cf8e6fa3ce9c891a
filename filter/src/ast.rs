use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize};

/// A filter predicate over feature properties, as in OGC Filter Encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Include,
    Exclude,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Comparison {
        left: Box<Expr>,
        operator: ComparisonOperator,
        right: Box<Expr>,
        match_case: bool,
    },
    Between {
        expr: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: String,
        wildcard: char,
        single_char: char,
        escape: char,
        match_case: bool,
    },
    IsNull(Box<Expr>),
    IsNil(Box<Expr>),
    Spatial {
        operator: SpatialOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        distance: Option<Distance>,
    },
    /// An empty property name addresses the default geometry.
    BBox {
        property: Box<Expr>,
        envelope: Rect<f64>,
        srs: Option<String>,
    },
    Temporal {
        operator: TemporalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Id(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// XPath-like property name, relative to the feature being filtered.
    Property(String),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Arithmetic {
        left: Box<Expr>,
        operator: ArithmeticOperator,
        right: Box<Expr>,
    },
    /// Placeholder meaning "no expression", e.g. an unmapped feature id.
    Nil,
    /// Source-side reference to an attribute reached through feature chaining.
    NestedAttribute(NestedAttribute),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Geometry(Geometry<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedAttribute {
    /// Target path as written in the original filter.
    pub xpath: String,
    /// Name of the first nested feature type, when it is fixed by the mapping.
    pub nested_type: Option<String>,
    /// One condition per feature chaining hop, root side first.
    pub joins: Vec<JoinCondition>,
    /// Source expressions of the addressed attribute in the feature type that owns it.
    pub leaf: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub alias: String,
    pub parent: Expr,
    pub nested: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub units: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,              // =
    NotEqual,           // <> or !=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    LessThan,           // <
    LessThanOrEqual,    // <=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialOperator {
    Beyond,
    Contains,
    Crosses,
    Disjoint,
    DWithin,
    Equals,
    Intersects,
    Overlaps,
    Touches,
    Within,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalOperator {
    After,
    AnyInteracts,
    Before,
    Begins,
    BegunBy,
    During,
    EndedBy,
    Ends,
    Meets,
    MetBy,
    OverlappedBy,
    TContains,
    TEquals,
    TOverlaps,
}

/// Operator classes a data source may or may not be able to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Include,
    Exclude,
    And,
    Or,
    Not,
    Comparison(ComparisonOperator),
    Between,
    Like,
    IsNull,
    IsNil,
    Spatial(SpatialOperator),
    BBox,
    Temporal(TemporalOperator),
    Id,
    Arithmetic(ArithmeticOperator),
}

impl Filter {
    /// Conjunction of `children`; an empty list is `Include` and a single child is returned as is.
    pub fn and(mut children: Vec<Filter>) -> Filter {
        match children.len() {
            0 => Filter::Include,
            1 => children.remove(0),
            _ => Filter::And(children),
        }
    }

    /// Disjunction of `children`; an empty list is `Exclude` and a single child is returned as is.
    pub fn or(mut children: Vec<Filter>) -> Filter {
        match children.len() {
            0 => Filter::Exclude,
            1 => children.remove(0),
            _ => Filter::Or(children),
        }
    }

    pub fn not(filter: Filter) -> Filter { Filter::Not(Box::new(filter)) }

    pub fn compare(left: Expr, operator: ComparisonOperator, right: Expr) -> Filter {
        Filter::Comparison { left: Box::new(left), operator, right: Box::new(right), match_case: true }
    }

    pub fn equals(left: Expr, right: Expr) -> Filter { Filter::compare(left, ComparisonOperator::Equal, right) }

    pub fn kind(&self) -> OperatorKind {
        match self {
            Filter::Include => OperatorKind::Include,
            Filter::Exclude => OperatorKind::Exclude,
            Filter::And(_) => OperatorKind::And,
            Filter::Or(_) => OperatorKind::Or,
            Filter::Not(_) => OperatorKind::Not,
            Filter::Comparison { operator, .. } => OperatorKind::Comparison(*operator),
            Filter::Between { .. } => OperatorKind::Between,
            Filter::Like { .. } => OperatorKind::Like,
            Filter::IsNull(_) => OperatorKind::IsNull,
            Filter::IsNil(_) => OperatorKind::IsNil,
            Filter::Spatial { operator, .. } => OperatorKind::Spatial(*operator),
            Filter::BBox { .. } => OperatorKind::BBox,
            Filter::Temporal { operator, .. } => OperatorKind::Temporal(*operator),
            Filter::Id(_) => OperatorKind::Id,
        }
    }

    /// Property names referenced anywhere in this filter, in visiting order.
    pub fn property_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_property_names(&mut names);
        names
    }

    fn collect_property_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Filter::Include | Filter::Exclude | Filter::Id(_) => {}
            Filter::And(children) | Filter::Or(children) => children.iter().for_each(|c| c.collect_property_names(names)),
            Filter::Not(inner) => inner.collect_property_names(names),
            Filter::Comparison { left, right, .. } | Filter::Spatial { left, right, .. } | Filter::Temporal { left, right, .. } => {
                left.collect_property_names(names);
                right.collect_property_names(names);
            }
            Filter::Between { expr, lower, upper } => {
                expr.collect_property_names(names);
                lower.collect_property_names(names);
                upper.collect_property_names(names);
            }
            Filter::Like { expr, .. } | Filter::IsNull(expr) | Filter::IsNil(expr) => expr.collect_property_names(names),
            Filter::BBox { property, .. } => property.collect_property_names(names),
        }
    }
}

impl Expr {
    pub fn property(name: impl Into<String>) -> Expr { Expr::Property(name.into()) }

    pub fn literal(value: impl Into<Literal>) -> Expr { Expr::Literal(value.into()) }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Expr { Expr::Function { name: name.into(), args } }

    pub fn is_nil(&self) -> bool { matches!(self, Expr::Nil) }

    pub fn as_property(&self) -> Option<&str> {
        match self {
            Expr::Property(name) => Some(name),
            _ => None,
        }
    }

    fn collect_property_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Property(name) => names.push(name),
            Expr::Function { args, .. } => args.iter().for_each(|a| a.collect_property_names(names)),
            Expr::Arithmetic { left, right, .. } => {
                left.collect_property_names(names);
                right.collect_property_names(names);
            }
            Expr::Literal(_) | Expr::Nil | Expr::NestedAttribute(_) => {}
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self { Literal::String(value.to_string()) }
}

impl From<String> for Literal {
    fn from(value: String) -> Self { Literal::String(value) }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self { Literal::Integer(value) }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self { Literal::Float(value) }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self { Literal::Boolean(value) }
}

impl From<Geometry<f64>> for Literal {
    fn from(value: Geometry<f64>) -> Self { Literal::Geometry(value) }
}

impl SpatialOperator {
    pub fn name(&self) -> &'static str {
        match self {
            SpatialOperator::Beyond => "BEYOND",
            SpatialOperator::Contains => "CONTAINS",
            SpatialOperator::Crosses => "CROSSES",
            SpatialOperator::Disjoint => "DISJOINT",
            SpatialOperator::DWithin => "DWITHIN",
            SpatialOperator::Equals => "EQUALS",
            SpatialOperator::Intersects => "INTERSECTS",
            SpatialOperator::Overlaps => "OVERLAPS",
            SpatialOperator::Touches => "TOUCHES",
            SpatialOperator::Within => "WITHIN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "BEYOND" => SpatialOperator::Beyond,
            "CONTAINS" => SpatialOperator::Contains,
            "CROSSES" => SpatialOperator::Crosses,
            "DISJOINT" => SpatialOperator::Disjoint,
            "DWITHIN" => SpatialOperator::DWithin,
            "EQUALS" => SpatialOperator::Equals,
            "INTERSECTS" => SpatialOperator::Intersects,
            "OVERLAPS" => SpatialOperator::Overlaps,
            "TOUCHES" => SpatialOperator::Touches,
            "WITHIN" => SpatialOperator::Within,
            _ => return None,
        })
    }

    /// Whether the operator carries a distance argument.
    pub fn takes_distance(&self) -> bool { matches!(self, SpatialOperator::DWithin | SpatialOperator::Beyond) }
}

impl TemporalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            TemporalOperator::After => "AFTER",
            TemporalOperator::AnyInteracts => "ANYINTERACTS",
            TemporalOperator::Before => "BEFORE",
            TemporalOperator::Begins => "BEGINS",
            TemporalOperator::BegunBy => "BEGUNBY",
            TemporalOperator::During => "DURING",
            TemporalOperator::EndedBy => "ENDEDBY",
            TemporalOperator::Ends => "ENDS",
            TemporalOperator::Meets => "MEETS",
            TemporalOperator::MetBy => "METBY",
            TemporalOperator::OverlappedBy => "OVERLAPPEDBY",
            TemporalOperator::TContains => "TCONTAINS",
            TemporalOperator::TEquals => "TEQUALS",
            TemporalOperator::TOverlaps => "TOVERLAPS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "AFTER" => TemporalOperator::After,
            "ANYINTERACTS" => TemporalOperator::AnyInteracts,
            "BEFORE" => TemporalOperator::Before,
            "BEGINS" => TemporalOperator::Begins,
            "BEGUNBY" => TemporalOperator::BegunBy,
            "DURING" => TemporalOperator::During,
            "ENDEDBY" => TemporalOperator::EndedBy,
            "ENDS" => TemporalOperator::Ends,
            "MEETS" => TemporalOperator::Meets,
            "METBY" => TemporalOperator::MetBy,
            "OVERLAPPEDBY" => TemporalOperator::OverlappedBy,
            "TCONTAINS" => TemporalOperator::TContains,
            "TEQUALS" => TemporalOperator::TEquals,
            "TOVERLAPS" => TemporalOperator::TOverlaps,
            _ => return None,
        })
    }
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
        }
    }
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }
}
