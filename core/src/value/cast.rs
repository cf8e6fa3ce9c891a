use crate::feature::{Binding, GeometryBinding};
use crate::value::{Value, ValueType};
use geo_types::Geometry;
use wkt::{ToWkt, TryFromWkt};

#[derive(Debug, Clone, PartialEq)]
pub enum CastError {
    /// Cannot cast from source type to target binding
    IncompatibleTypes { from: ValueType, to: Binding },
    /// Invalid format for the target binding (e.g., unparseable number or WKT)
    InvalidFormat { value: String, target: Binding },
    /// Numeric value does not fit the target binding
    NumericOverflow { value: String, target: Binding },
}

impl std::fmt::Display for CastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CastError::IncompatibleTypes { from, to } => {
                write!(f, "Cannot cast from {:?} to {:?}", from, to)
            }
            CastError::InvalidFormat { value, target } => {
                write!(f, "Invalid format '{}' for binding {:?}", value, target)
            }
            CastError::NumericOverflow { value, target } => {
                write!(f, "Numeric overflow: '{}' cannot fit in {:?}", value, target)
            }
        }
    }
}

impl std::error::Error for CastError {}

impl Value {
    /// Cast this value to the specified binding
    pub fn cast_to(&self, target: &Binding) -> Result<Value, CastError> {
        let incompatible = || CastError::IncompatibleTypes { from: ValueType::of(self), to: target.clone() };
        match (self, target) {
            (_, Binding::Any) | (_, Binding::Collection) => Ok(self.clone()),

            (Value::String(_), Binding::String) | (Value::Integer(_), Binding::Integer) | (Value::Float(_), Binding::Float) | (Value::Boolean(_), Binding::Boolean) => {
                Ok(self.clone())
            }

            (Value::Geometry(g), Binding::Geometry(binding)) => {
                if binding.accepts(g) {
                    Ok(self.clone())
                } else {
                    Err(incompatible())
                }
            }

            // String conversions
            (Value::String(s), Binding::Integer) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(Value::Integer(n)),
                Err(_) => Err(CastError::InvalidFormat { value: s.clone(), target: target.clone() }),
            },
            (Value::String(s), Binding::Float) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Value::Float(n)),
                Err(_) => Err(CastError::InvalidFormat { value: s.clone(), target: target.clone() }),
            },
            (Value::String(s), Binding::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(CastError::InvalidFormat { value: s.clone(), target: target.clone() }),
            },
            (Value::String(s), Binding::Geometry(binding)) => match Geometry::<f64>::try_from_wkt_str(s) {
                Ok(g) if binding.accepts(&g) => Ok(Value::Geometry(g)),
                Ok(_) => Err(incompatible()),
                Err(_) => Err(CastError::InvalidFormat { value: s.clone(), target: target.clone() }),
            },

            // Numeric conversions
            (Value::Integer(n), Binding::Float) => Ok(Value::Float(*n as f64)),
            (Value::Float(n), Binding::Integer) => {
                if n.is_finite() && n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    Ok(Value::Integer(*n as i64))
                } else {
                    Err(CastError::NumericOverflow { value: n.to_string(), target: target.clone() })
                }
            }
            (Value::Integer(n), Binding::Boolean) => match n {
                0 => Ok(Value::Boolean(false)),
                1 => Ok(Value::Boolean(true)),
                _ => Err(CastError::InvalidFormat { value: n.to_string(), target: target.clone() }),
            },

            // Everything renders to a string
            (Value::Integer(n), Binding::String) => Ok(Value::String(n.to_string())),
            (Value::Float(n), Binding::String) => Ok(Value::String(n.to_string())),
            (Value::Boolean(b), Binding::String) => Ok(Value::String(b.to_string())),
            (Value::Geometry(g), Binding::String) => Ok(Value::String(g.wkt_string())),

            _ => Err(incompatible()),
        }
    }
}

impl GeometryBinding {
    /// Whether a geometry of this binding may hold `geometry`.
    pub fn accepts(&self, geometry: &Geometry<f64>) -> bool { self.is_assignable_from(&GeometryBinding::of(geometry)) }
}
