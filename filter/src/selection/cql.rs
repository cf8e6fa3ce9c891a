//! Render filters back to CQL text. The output of [`Filter`]'s `Display` impl parses back to an equal filter,
//! except for `match_case = false` comparisons (CQL has no syntax for them) and source-side expressions.

use crate::ast::{Expr, Filter, Literal};
use std::fmt;
use wkt::ToWkt;

const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "null", "nil", "between", "like", "ilike", "bbox", "include", "exclude", "true", "false",
];

pub fn filter_to_cql(filter: &Filter, buffer: &mut String) {
    match filter {
        Filter::Include => buffer.push_str("INCLUDE"),
        Filter::Exclude => buffer.push_str("EXCLUDE"),
        Filter::And(children) if children.is_empty() => buffer.push_str("INCLUDE"),
        Filter::Or(children) if children.is_empty() => buffer.push_str("EXCLUDE"),
        Filter::And(children) => join_children(children, " AND ", buffer),
        Filter::Or(children) => join_children(children, " OR ", buffer),
        Filter::Not(inner) => {
            buffer.push_str("NOT (");
            filter_to_cql(inner, buffer);
            buffer.push(')');
        }
        Filter::Comparison { left, operator, right, .. } => {
            expr_to_cql(left, buffer);
            buffer.push(' ');
            buffer.push_str(operator.symbol());
            buffer.push(' ');
            expr_to_cql(right, buffer);
        }
        Filter::Between { expr, lower, upper } => {
            expr_to_cql(expr, buffer);
            buffer.push_str(" BETWEEN ");
            expr_to_cql(lower, buffer);
            buffer.push_str(" AND ");
            expr_to_cql(upper, buffer);
        }
        Filter::Like { expr, pattern, wildcard, single_char, escape, match_case } => {
            expr_to_cql(expr, buffer);
            buffer.push_str(if *match_case { " LIKE " } else { " ILIKE " });
            push_string(&normalize_like_pattern(pattern, *wildcard, *single_char, *escape), buffer);
        }
        Filter::IsNull(expr) => {
            expr_to_cql(expr, buffer);
            buffer.push_str(" IS NULL");
        }
        Filter::IsNil(expr) => {
            expr_to_cql(expr, buffer);
            buffer.push_str(" IS NIL");
        }
        Filter::Spatial { operator, left, right, distance } => {
            buffer.push_str(operator.name());
            buffer.push('(');
            expr_to_cql(left, buffer);
            buffer.push_str(", ");
            expr_to_cql(right, buffer);
            if let Some(distance) = distance {
                buffer.push_str(&format!(", {:?}, {}", distance.value, distance.units));
            }
            buffer.push(')');
        }
        Filter::BBox { property, envelope, srs } => {
            buffer.push_str("BBOX(");
            expr_to_cql(property, buffer);
            let (min, max) = (envelope.min(), envelope.max());
            buffer.push_str(&format!(", {:?}, {:?}, {:?}, {:?}", min.x, min.y, max.x, max.y));
            if let Some(srs) = srs {
                buffer.push_str(", ");
                push_string(srs, buffer);
            }
            buffer.push(')');
        }
        Filter::Temporal { operator, left, right } => {
            expr_to_cql(left, buffer);
            buffer.push(' ');
            buffer.push_str(operator.name());
            buffer.push(' ');
            expr_to_cql(right, buffer);
        }
        Filter::Id(ids) if ids.is_empty() => buffer.push_str("EXCLUDE"),
        Filter::Id(ids) => {
            buffer.push_str("IN (");
            for (i, id) in ids.iter().enumerate() {
                if i > 0 {
                    buffer.push_str(", ");
                }
                push_string(id, buffer);
            }
            buffer.push(')');
        }
    }
}

fn join_children(children: &[Filter], separator: &str, buffer: &mut String) {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            buffer.push_str(separator);
        }
        let nested = matches!(child, Filter::And(c) | Filter::Or(c) if c.len() > 1);
        if nested {
            buffer.push('(');
        }
        filter_to_cql(child, buffer);
        if nested {
            buffer.push(')');
        }
    }
}

pub fn expr_to_cql(expr: &Expr, buffer: &mut String) {
    match expr {
        Expr::Literal(lit) => match lit {
            Literal::String(s) => push_string(s, buffer),
            Literal::Integer(i) => buffer.push_str(&i.to_string()),
            Literal::Float(f) => buffer.push_str(&format!("{:?}", f)),
            Literal::Boolean(b) => buffer.push_str(if *b { "true" } else { "false" }),
            Literal::Geometry(g) => buffer.push_str(&g.wkt_string()),
        },
        Expr::Property(name) => push_property(name, buffer),
        Expr::Function { name, args } => {
            buffer.push_str(name);
            buffer.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    buffer.push_str(", ");
                }
                expr_to_cql(arg, buffer);
            }
            buffer.push(')');
        }
        Expr::Arithmetic { left, operator, right } => {
            buffer.push('(');
            expr_to_cql(left, buffer);
            buffer.push(' ');
            buffer.push_str(operator.symbol());
            buffer.push(' ');
            expr_to_cql(right, buffer);
            buffer.push(')');
        }
        Expr::Nil => buffer.push_str("NIL"),
        Expr::NestedAttribute(nested) => push_property(&nested.xpath, buffer),
    }
}

fn push_string(s: &str, buffer: &mut String) {
    buffer.push('\'');
    for c in s.chars() {
        match c {
            '\'' => buffer.push_str("''"),
            _ => buffer.push(c),
        }
    }
    buffer.push('\'');
}

fn push_property(name: &str, buffer: &mut String) {
    if is_bare_property(name) {
        buffer.push_str(name);
    } else {
        buffer.push('"');
        buffer.push_str(name);
        buffer.push('"');
    }
}

/// Whether `name` can be written without double quotes and still parse back as the same property path.
fn is_bare_property(name: &str) -> bool {
    if name.is_empty() || RESERVED.iter().any(|k| k.eq_ignore_ascii_case(name)) {
        return false;
    }
    let relative = name.strip_prefix('/').unwrap_or(name);
    relative.split('/').all(|step| {
        if step == "." {
            return true;
        }
        let step = step.strip_prefix('@').unwrap_or(step);
        let mut chars = step.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    })
}

/// Rewrite a LIKE pattern to the CQL wildcards `%`, `_` and escape `\`.
fn normalize_like_pattern(pattern: &str, wildcard: char, single_char: char, escape: char) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            if let Some(escaped) = chars.next() {
                if matches!(escaped, '%' | '_' | '\\') {
                    out.push('\\');
                }
                out.push(escaped);
            }
        } else if c == wildcard {
            out.push('%');
        } else if c == single_char {
            out.push('_');
        } else if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = String::new();
        filter_to_cql(self, &mut buffer);
        f.write_str(&buffer)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = String::new();
        expr_to_cql(self, &mut buffer);
        f.write_str(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComparisonOperator;
    use crate::parser::parse_filter;

    fn assert_reparses(cql: &str) {
        let filter = parse_filter(cql).unwrap();
        let rendered = filter.to_string();
        assert_eq!(parse_filter(&rendered).unwrap(), filter, "rendered as {rendered}");
    }

    #[test]
    fn test_render_basic() {
        let filter = Filter::and(vec![
            Filter::equals(Expr::property("gml:name"), Expr::literal("O'Brien")),
            Filter::or(vec![
                Filter::compare(Expr::property("age"), ComparisonOperator::GreaterThanOrEqual, Expr::literal(30i64)),
                Filter::IsNull(Box::new(Expr::property("age"))),
            ]),
        ]);
        assert_eq!(filter.to_string(), "gml:name = 'O''Brien' AND (age >= 30 OR age IS NULL)");
    }

    #[test]
    fn test_render_quotes_unsafe_properties() {
        assert_eq!(Expr::property("").to_string(), "\"\"");
        assert_eq!(Expr::property("and").to_string(), "\"and\"");
        assert_eq!(Expr::property("gml:name[2]").to_string(), "\"gml:name[2]\"");
        assert_eq!(Expr::property("a/@gml:id").to_string(), "a/@gml:id");
    }

    #[test]
    fn test_render_like_with_custom_wildcards() {
        let filter = Filter::Like {
            expr: Box::new(Expr::property("name")),
            pattern: "gr*n!*_".into(),
            wildcard: '*',
            single_char: '.',
            escape: '!',
            match_case: true,
        };
        assert_eq!(filter.to_string(), "name LIKE 'gr%n*\\_'");
    }

    #[test]
    fn test_reparse() {
        assert_reparses("a = 1 OR b = 2 AND NOT c = 3");
        assert_reparses("(a + 1) * 2 > 4.5 AND (b = 1 OR b = 2)");
        assert_reparses("depth BETWEEN 1 AND 10");
        assert_reparses("name ILIKE 'gran%'");
        assert_reparses("name IS NOT NIL");
        assert_reparses("IN ('mf.1', 'mf.2')");
        assert_reparses("BBOX(\"\", 0, 1, 10, 11, 'EPSG:4326')");
        assert_reparses("DWITHIN(shape, POINT(1 2), 10, meters)");
        assert_reparses("t AFTER '2020-01-01'");
        assert_reparses("strConcat(gml:name, '-x') = 'a-x'");
        assert_reparses("INCLUDE");
    }
}
