mod cast;

pub use cast::CastError;

use appschema_filter::ast::Literal;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use wkt::ToWkt;

/// A scalar attribute value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Geometry(Geometry<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Geometry,
}

impl ValueType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Geometry(_) => ValueType::Geometry,
        }
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Geometry(g) => write!(f, "{}", g.wkt_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self { Value::String(value.to_string()) }
}
impl From<String> for Value {
    fn from(value: String) -> Self { Value::String(value) }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self { Value::Integer(value) }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self { Value::Float(value) }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self { Value::Boolean(value) }
}
impl From<Geometry<f64>> for Value {
    fn from(value: Geometry<f64>) -> Self { Value::Geometry(value) }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::String(s) => Value::String(s),
            Literal::Integer(i) => Value::Integer(i),
            Literal::Float(f) => Value::Float(f),
            Literal::Boolean(b) => Value::Boolean(b),
            Literal::Geometry(g) => Value::Geometry(g),
        }
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Literal::String(s),
            Value::Integer(i) => Literal::Integer(i),
            Value::Float(f) => Literal::Float(f),
            Value::Boolean(b) => Literal::Boolean(b),
            Value::Geometry(g) => Literal::Geometry(g),
        }
    }
}
