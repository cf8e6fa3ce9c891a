//! Evaluate filters against in-memory records. This is how the residual (post) half of a split filter is applied
//! to features after they have been built from the data source.

use crate::ast::{ArithmeticOperator, ComparisonOperator, Expr, Filter, Literal};
use crate::error::EvaluationError;
use geo_types::{Coord, Geometry, Rect};
use std::cmp::Ordering;

/// A record that filters can be evaluated against.
pub trait Filterable {
    fn id(&self) -> Option<&str>;
    /// All values found at `xpath`; multi-valued properties yield several. The empty xpath addresses the
    /// default geometry.
    fn values(&self, xpath: &str) -> Vec<Literal>;
    /// Whether the element at `xpath` exists but is explicitly nil.
    fn is_nil(&self, _xpath: &str) -> bool { false }
}

pub fn evaluate_expr<R: Filterable + ?Sized>(record: &R, expr: &Expr) -> Result<Vec<Literal>, EvaluationError> {
    match expr {
        Expr::Literal(lit) => Ok(vec![lit.clone()]),
        Expr::Property(name) => Ok(record.values(name)),
        Expr::Nil => Ok(Vec::new()),
        Expr::Function { name, args } => evaluate_function(record, name, args),
        Expr::Arithmetic { left, operator, right } => {
            let (Some(l), Some(r)) = (first(record, left)?, first(record, right)?) else { return Ok(Vec::new()) };
            Ok(arithmetic(&l, *operator, &r).into_iter().collect())
        }
        Expr::NestedAttribute(nested) => Err(EvaluationError::Unsupported(format!("source expression for {}", nested.xpath))),
    }
}

pub fn evaluate_filter<R: Filterable + ?Sized>(record: &R, filter: &Filter) -> Result<bool, EvaluationError> {
    match filter {
        Filter::Include => Ok(true),
        Filter::Exclude => Ok(false),
        Filter::And(children) => {
            for child in children {
                if !evaluate_filter(record, child)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Filter::Or(children) => {
            for child in children {
                if evaluate_filter(record, child)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Filter::Not(inner) => Ok(!evaluate_filter(record, inner)?),
        Filter::Comparison { left, operator, right, match_case } => {
            let left = evaluate_expr(record, left)?;
            let right = evaluate_expr(record, right)?;
            Ok(left.iter().any(|l| right.iter().any(|r| compare(l, *operator, r, *match_case))))
        }
        Filter::Between { expr, lower, upper } => {
            let (Some(lower), Some(upper)) = (first(record, lower)?, first(record, upper)?) else { return Ok(false) };
            Ok(evaluate_expr(record, expr)?.iter().any(|v| {
                compare(v, ComparisonOperator::GreaterThanOrEqual, &lower, true) && compare(v, ComparisonOperator::LessThanOrEqual, &upper, true)
            }))
        }
        Filter::Like { expr, pattern, wildcard, single_char, escape, match_case } => {
            let matcher = LikeMatcher::new(pattern, *wildcard, *single_char, *escape, *match_case);
            Ok(evaluate_expr(record, expr)?.iter().any(|v| matcher.matches(&as_text(v))))
        }
        Filter::IsNull(expr) => Ok(evaluate_expr(record, expr)?.is_empty()),
        Filter::IsNil(expr) => Ok(match expr.as_ref() {
            Expr::Property(name) => record.is_nil(name),
            _ => false,
        }),
        Filter::Id(ids) => Ok(record.id().is_some_and(|id| ids.iter().any(|candidate| candidate == id))),
        Filter::BBox { property, envelope, .. } => Ok(evaluate_expr(record, property)?.iter().any(|value| match value {
            Literal::Geometry(geometry) => geometry_envelope(geometry).is_some_and(|e| intersects(&e, envelope)),
            _ => false,
        })),
        Filter::Spatial { operator, .. } => Err(EvaluationError::Unsupported(operator.name().to_string())),
        Filter::Temporal { operator, .. } => Err(EvaluationError::Unsupported(operator.name().to_string())),
    }
}

fn first<R: Filterable + ?Sized>(record: &R, expr: &Expr) -> Result<Option<Literal>, EvaluationError> {
    Ok(evaluate_expr(record, expr)?.into_iter().next())
}

fn evaluate_function<R: Filterable + ?Sized>(record: &R, name: &str, args: &[Expr]) -> Result<Vec<Literal>, EvaluationError> {
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(EvaluationError::ArgumentCount { name: name.to_string(), expected, got: args.len() })
        }
    };
    let value = match name.to_ascii_lowercase().as_str() {
        "getid" => {
            expect(0)?;
            record.id().map(Literal::from)
        }
        "strconcat" => {
            expect(2)?;
            match (first(record, &args[0])?, first(record, &args[1])?) {
                (Some(a), Some(b)) => Some(Literal::String(as_text(&a) + &as_text(&b))),
                _ => None,
            }
        }
        "strtolowercase" => {
            expect(1)?;
            first(record, &args[0])?.map(|v| Literal::String(as_text(&v).to_lowercase()))
        }
        "strtouppercase" => {
            expect(1)?;
            first(record, &args[0])?.map(|v| Literal::String(as_text(&v).to_uppercase()))
        }
        "if_then_else" => {
            expect(3)?;
            let condition = first(record, &args[0])?.is_some_and(|v| truthy(&v));
            return evaluate_expr(record, if condition { &args[1] } else { &args[2] });
        }
        "equalto" => {
            expect(2)?;
            let (a, b) = (first(record, &args[0])?, first(record, &args[1])?);
            Some(Literal::Boolean(match (a, b) {
                (Some(a), Some(b)) => compare(&a, ComparisonOperator::Equal, &b, true),
                (None, None) => true,
                _ => false,
            }))
        }
        _ => return Err(EvaluationError::UnknownFunction(name.to_string())),
    };
    Ok(value.into_iter().collect())
}

fn truthy(value: &Literal) -> bool {
    match value {
        Literal::Boolean(b) => *b,
        Literal::String(s) => s.eq_ignore_ascii_case("true"),
        Literal::Integer(i) => *i != 0,
        Literal::Float(f) => *f != 0.0,
        Literal::Geometry(_) => true,
    }
}

/// Text form of a literal as used by string functions and LIKE.
pub fn as_text(value: &Literal) -> String {
    match value {
        Literal::String(s) => s.clone(),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Geometry(g) => wkt::ToWkt::wkt_string(g),
    }
}

fn as_number(value: &Literal) -> Option<f64> {
    match value {
        Literal::Integer(i) => Some(*i as f64),
        Literal::Float(f) => Some(*f),
        Literal::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn arithmetic(left: &Literal, operator: ArithmeticOperator, right: &Literal) -> Option<Literal> {
    if let (Literal::Integer(l), Literal::Integer(r)) = (left, right) {
        let result = match operator {
            ArithmeticOperator::Add => l.checked_add(*r),
            ArithmeticOperator::Subtract => l.checked_sub(*r),
            ArithmeticOperator::Multiply => l.checked_mul(*r),
            ArithmeticOperator::Divide if *r != 0 && l % r == 0 => Some(l / r),
            ArithmeticOperator::Divide => None,
        };
        if let Some(result) = result {
            return Some(Literal::Integer(result));
        }
    }
    let (l, r) = (as_number(left)?, as_number(right)?);
    Some(Literal::Float(match operator {
        ArithmeticOperator::Add => l + r,
        ArithmeticOperator::Subtract => l - r,
        ArithmeticOperator::Multiply => l * r,
        ArithmeticOperator::Divide => l / r,
    }))
}

fn order(left: &Literal, right: &Literal, match_case: bool) -> Option<Ordering> {
    let numeric = |v: &Literal| matches!(v, Literal::Integer(_) | Literal::Float(_));
    if numeric(left) || numeric(right) {
        if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
            return l.partial_cmp(&r);
        }
    }
    match (left, right) {
        (Literal::Boolean(l), Literal::Boolean(r)) => Some(l.cmp(r)),
        (Literal::Geometry(l), Literal::Geometry(r)) => (l == r).then_some(Ordering::Equal),
        (Literal::Geometry(_), _) | (_, Literal::Geometry(_)) => None,
        _ if match_case => Some(as_text(left).cmp(&as_text(right))),
        _ => Some(as_text(left).to_lowercase().cmp(&as_text(right).to_lowercase())),
    }
}

fn compare(left: &Literal, operator: ComparisonOperator, right: &Literal, match_case: bool) -> bool {
    let Some(ordering) = order(left, right, match_case) else { return operator == ComparisonOperator::NotEqual };
    match operator {
        ComparisonOperator::Equal => ordering == Ordering::Equal,
        ComparisonOperator::NotEqual => ordering != Ordering::Equal,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LikeToken {
    Any,
    One,
    Char(char),
}

struct LikeMatcher {
    tokens: Vec<LikeToken>,
    match_case: bool,
}

impl LikeMatcher {
    fn new(pattern: &str, wildcard: char, single_char: char, escape: char, match_case: bool) -> Self {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            let token = if c == escape {
                match chars.next() {
                    Some(escaped) => LikeToken::Char(escaped),
                    None => LikeToken::Char(c),
                }
            } else if c == wildcard {
                LikeToken::Any
            } else if c == single_char {
                LikeToken::One
            } else {
                LikeToken::Char(c)
            };
            if token == LikeToken::Any && tokens.last() == Some(&LikeToken::Any) {
                continue;
            }
            tokens.push(token);
        }
        Self { tokens, match_case }
    }

    fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = if self.match_case { text.chars().collect() } else { text.to_lowercase().chars().collect() };
        let fold = |c: char| if self.match_case { c } else { c.to_lowercase().next().unwrap_or(c) };
        // reachable[j]: the tokens consumed so far can match text[..j]
        let mut reachable = vec![false; text.len() + 1];
        reachable[0] = true;
        for token in &self.tokens {
            let mut next = vec![false; text.len() + 1];
            match token {
                LikeToken::Any => {
                    let mut seen = false;
                    for j in 0..=text.len() {
                        seen |= reachable[j];
                        next[j] = seen;
                    }
                }
                LikeToken::One => (0..text.len()).for_each(|j| next[j + 1] = reachable[j]),
                LikeToken::Char(c) => (0..text.len()).for_each(|j| next[j + 1] = reachable[j] && text[j] == fold(*c)),
            }
            reachable = next;
        }
        reachable[text.len()]
    }
}

/// Bounding rectangle of a geometry, or `None` when it has no coordinates.
pub fn geometry_envelope(geometry: &Geometry<f64>) -> Option<Rect<f64>> {
    let mut bounds: Option<(Coord<f64>, Coord<f64>)> = None;
    let mut add = |c: Coord<f64>| {
        bounds = Some(match bounds {
            None => (c, c),
            Some((min, max)) => (Coord { x: min.x.min(c.x), y: min.y.min(c.y) }, Coord { x: max.x.max(c.x), y: max.y.max(c.y) }),
        })
    };
    visit_coords(geometry, &mut add);
    bounds.map(|(min, max)| Rect::new(min, max))
}

fn visit_coords(geometry: &Geometry<f64>, add: &mut impl FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(p) => add(p.0),
        Geometry::Line(l) => {
            add(l.start);
            add(l.end);
        }
        Geometry::LineString(ls) => ls.0.iter().for_each(|c| add(*c)),
        Geometry::Polygon(p) => p.exterior().0.iter().for_each(|c| add(*c)),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| add(p.0)),
        Geometry::MultiLineString(mls) => mls.0.iter().flat_map(|ls| ls.0.iter()).for_each(|c| add(*c)),
        Geometry::MultiPolygon(mp) => mp.0.iter().flat_map(|p| p.exterior().0.iter()).for_each(|c| add(*c)),
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| visit_coords(g, add)),
        Geometry::Rect(r) => {
            add(r.min());
            add(r.max());
        }
        Geometry::Triangle(t) => {
            add(t.v1());
            add(t.v2());
            add(t.v3());
        }
    }
}

fn intersects(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

#[derive(Debug, PartialEq)]
pub enum FilterResult<R> {
    Pass(R),
    Skip(R),
    Error(R, EvaluationError),
}

pub struct FilterIterator<I> {
    iter: I,
    filter: Filter,
}

impl<I, R> FilterIterator<I>
where
    I: Iterator<Item = R>,
    R: Filterable,
{
    pub fn new(iter: I, filter: Filter) -> Self { Self { iter, filter } }
}

impl<I, R> Iterator for FilterIterator<I>
where
    I: Iterator<Item = R>,
    R: Filterable,
{
    type Item = FilterResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|record| match evaluate_filter(&record, &self.filter) {
            Ok(true) => FilterResult::Pass(record),
            Ok(false) => FilterResult::Skip(record),
            Err(e) => FilterResult::Error(record, e),
        })
    }
}
