use crate::ast::{ArithmeticOperator, ComparisonOperator, Distance, Expr, Filter, Literal, SpatialOperator, TemporalOperator};
use crate::error::ParseError;
use crate::grammar::{self, CqlParser, Rule};
use geo_types::{coord, Geometry, Rect};
use pest::iterators::Pair;
use pest::Parser;
use wkt::TryFromWkt;

const LIKE_WILDCARD: char = '%';
const LIKE_SINGLE_CHAR: char = '_';
const LIKE_ESCAPE: char = '\\';

/// Parse a CQL filter such as `gml:name = 'x' AND NOT a/b IS NULL` into a [`Filter`].
pub fn parse_filter(input: &str) -> Result<Filter, ParseError> {
    let mut pairs = CqlParser::parse(Rule::FilterText, input)?;
    let first = pairs.next().ok_or(ParseError::EmptyExpression)?;
    if first.as_rule() != Rule::Disjunction {
        return Err(ParseError::UnexpectedRule { expected: "Disjunction", got: first.as_rule() });
    }
    disjunction(first)
}

/// Parse a standalone expression such as `strConcat(a, 'x')` or `gml:name`.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let mut pairs = CqlParser::parse(Rule::ExpressionText, input)?;
    let first = pairs.next().ok_or(ParseError::EmptyExpression)?;
    expr(first)
}

fn is_keyword(rule: Rule) -> bool {
    matches!(rule, Rule::KwAnd | Rule::KwOr | Rule::KwNot | Rule::KwIn | Rule::KwIs | Rule::KwNull | Rule::KwNil | Rule::KwBetween | Rule::KwBBox)
}

fn disjunction(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    let children = pair.into_inner().filter(|p| p.as_rule() != Rule::KwOr).map(conjunction).collect::<Result<Vec<_>, _>>()?;
    Ok(Filter::or(children))
}

fn conjunction(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    let children = pair.into_inner().filter(|p| p.as_rule() != Rule::KwAnd).map(factor).collect::<Result<Vec<_>, _>>()?;
    Ok(Filter::and(children))
}

fn factor(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    match pair.as_rule() {
        Rule::Disjunction => disjunction(pair),
        Rule::Negation => {
            let inner = pair.into_inner().find(|p| p.as_rule() != Rule::KwNot).ok_or(ParseError::MissingOperand("negated"))?;
            Ok(Filter::not(factor(inner)?))
        }
        Rule::Include => Ok(Filter::Include),
        Rule::Exclude => Ok(Filter::Exclude),
        Rule::IdFilter => {
            let ids = pair.into_inner().filter(|p| p.as_rule() == Rule::StringLiteral).map(string_literal).collect();
            Ok(Filter::Id(ids))
        }
        Rule::BBoxFilter => bbox(pair),
        Rule::SpatialFilter => spatial(pair),
        Rule::Predicate => predicate(pair),
        rule => Err(ParseError::UnexpectedRule { expected: "filter", got: rule }),
    }
}

fn bbox(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    let mut inner = pair.into_inner().filter(|p| !is_keyword(p.as_rule()));
    let property = inner.next().ok_or(ParseError::MissingOperand("bbox property"))?;
    let property = property.into_inner().next().map(property_name).unwrap_or_default();
    let mut bounds = [0.0f64; 4];
    for bound in bounds.iter_mut() {
        *bound = number(inner.next().ok_or(ParseError::MissingOperand("bbox bound"))?)?;
    }
    let srs = inner.next().map(string_literal);
    let envelope = Rect::new(coord! { x: bounds[0], y: bounds[1] }, coord! { x: bounds[2], y: bounds[3] });
    Ok(Filter::BBox { property: Box::new(Expr::Property(property)), envelope, srs })
}

fn spatial(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    let mut inner = pair.into_inner();
    let op = inner.next().ok_or(ParseError::MissingOperand("spatial operator"))?;
    let operator = SpatialOperator::from_name(op.as_str()).ok_or(ParseError::UnexpectedRule { expected: "spatial operator", got: op.as_rule() })?;
    let left = expr(inner.next().ok_or(ParseError::MissingOperand("left"))?)?;
    let right = expr(inner.next().ok_or(ParseError::MissingOperand("right"))?)?;
    let distance = match inner.next() {
        Some(value) => {
            let value = number(value)?;
            let units = inner.next().map(|u| u.as_str().to_string()).unwrap_or_default();
            Some(Distance { value, units })
        }
        None => None,
    };
    Ok(Filter::Spatial { operator, left: Box::new(left), right: Box::new(right), distance })
}

fn predicate(pair: Pair<Rule>) -> Result<Filter, ParseError> {
    let mut inner = pair.into_inner();
    let subject = expr(inner.next().ok_or(ParseError::MissingOperand("left"))?)?;
    let tail = inner.next().ok_or(ParseError::MissingOperand("predicate"))?;
    match tail.as_rule() {
        Rule::Comparison => {
            let mut parts = tail.into_inner();
            let op = parts.next().ok_or(ParseError::MissingOperand("comparison operator"))?;
            let operator = comparison_operator(op.as_str()).ok_or(ParseError::UnexpectedRule { expected: "comparison operator", got: op.as_rule() })?;
            let right = expr(parts.next().ok_or(ParseError::MissingOperand("right"))?)?;
            Ok(Filter::compare(subject, operator, right))
        }
        Rule::Between => {
            let mut bounds = tail.into_inner().filter(|p| !is_keyword(p.as_rule()));
            let lower = expr(bounds.next().ok_or(ParseError::MissingOperand("lower"))?)?;
            let upper = expr(bounds.next().ok_or(ParseError::MissingOperand("upper"))?)?;
            Ok(Filter::Between { expr: Box::new(subject), lower: Box::new(lower), upper: Box::new(upper) })
        }
        Rule::Like => {
            let mut negated = false;
            let mut match_case = true;
            let mut pattern = None;
            for part in tail.into_inner() {
                match part.as_rule() {
                    Rule::KwNot => negated = true,
                    Rule::LikeOp => match_case = !part.as_str().eq_ignore_ascii_case("ilike"),
                    Rule::StringLiteral => pattern = Some(string_literal(part)),
                    rule => return Err(ParseError::UnexpectedRule { expected: "LIKE pattern", got: rule }),
                }
            }
            let like = Filter::Like {
                expr: Box::new(subject),
                pattern: pattern.ok_or(ParseError::MissingOperand("pattern"))?,
                wildcard: LIKE_WILDCARD,
                single_char: LIKE_SINGLE_CHAR,
                escape: LIKE_ESCAPE,
                match_case,
            };
            Ok(if negated { Filter::not(like) } else { like })
        }
        Rule::IsNull | Rule::IsNil => {
            let is_nil = tail.as_rule() == Rule::IsNil;
            let negated = tail.into_inner().any(|p| p.as_rule() == Rule::KwNot);
            let check = if is_nil { Filter::IsNil(Box::new(subject)) } else { Filter::IsNull(Box::new(subject)) };
            Ok(if negated { Filter::not(check) } else { check })
        }
        Rule::Temporal => {
            let mut parts = tail.into_inner();
            let op = parts.next().ok_or(ParseError::MissingOperand("temporal operator"))?;
            let operator = TemporalOperator::from_name(op.as_str()).ok_or(ParseError::UnexpectedRule { expected: "temporal operator", got: op.as_rule() })?;
            let right = expr(parts.next().ok_or(ParseError::MissingOperand("right"))?)?;
            Ok(Filter::Temporal { operator, left: Box::new(subject), right: Box::new(right) })
        }
        rule => Err(ParseError::UnexpectedRule { expected: "predicate", got: rule }),
    }
}

fn comparison_operator(symbol: &str) -> Option<ComparisonOperator> {
    Some(match symbol {
        "=" => ComparisonOperator::Equal,
        "<>" | "!=" => ComparisonOperator::NotEqual,
        ">" => ComparisonOperator::GreaterThan,
        ">=" => ComparisonOperator::GreaterThanOrEqual,
        "<" => ComparisonOperator::LessThan,
        "<=" => ComparisonOperator::LessThanOrEqual,
        _ => return None,
    })
}

fn expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::Expr | Rule::Term => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or(ParseError::MissingOperand("first"))?;
            let mut result = expr(first)?;
            while let Some(op) = inner.next() {
                let operator = match op.as_str() {
                    "+" => ArithmeticOperator::Add,
                    "-" => ArithmeticOperator::Subtract,
                    "*" => ArithmeticOperator::Multiply,
                    "/" => ArithmeticOperator::Divide,
                    _ => return Err(ParseError::UnexpectedRule { expected: "arithmetic operator", got: op.as_rule() }),
                };
                let right = expr(inner.next().ok_or(ParseError::MissingOperand("right"))?)?;
                result = Expr::Arithmetic { left: Box::new(result), operator, right: Box::new(right) };
            }
            Ok(result)
        }
        Rule::Function => {
            let mut inner = pair.into_inner();
            let name = inner.next().ok_or(ParseError::MissingOperand("function name"))?.as_str().to_string();
            let args = inner.map(expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Function { name, args })
        }
        Rule::Geometry => Ok(Expr::Literal(Literal::Geometry(geometry(pair.as_str())?))),
        Rule::StringLiteral => Ok(Expr::Literal(Literal::String(string_literal(pair)))),
        Rule::Integer => pair.as_str().parse().map(|i| Expr::Literal(Literal::Integer(i))).map_err(|_| ParseError::InvalidNumber(pair.as_str().to_string())),
        Rule::Float => Ok(Expr::Literal(Literal::Float(number(pair)?))),
        Rule::Boolean => Ok(Expr::Literal(Literal::Boolean(pair.as_str().eq_ignore_ascii_case("true")))),
        Rule::QuotedProperty | Rule::PropertyPath => Ok(Expr::Property(property_name(pair))),
        rule => Err(ParseError::UnexpectedRule { expected: "expression", got: rule }),
    }
}

fn property_name(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::QuotedProperty => pair.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}

fn string_literal(pair: Pair<Rule>) -> String {
    pair.into_inner().next().map(|p| p.as_str().replace("''", "'")).unwrap_or_default()
}

fn number(pair: Pair<grammar::Rule>) -> Result<f64, ParseError> {
    pair.as_str().parse().map_err(|_| ParseError::InvalidNumber(pair.as_str().to_string()))
}

fn geometry(text: &str) -> Result<Geometry<f64>, ParseError> {
    Geometry::try_from_wkt_str(text).map_err(|e| ParseError::InvalidGeometry { text: text.to_string(), reason: e.to_string() })
}
