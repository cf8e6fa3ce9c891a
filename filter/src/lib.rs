//! Filter Encoding syntax tree for complex feature mapping, with a CQL text form and in-memory evaluation.

pub mod ast;
pub mod conversion;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod selection;

pub use ast::{Expr, Filter, Literal, OperatorKind};
pub use error::{EvaluationError, ParseError};
pub use parser::{parse_expr, parse_filter};
pub use selection::filter::{evaluate_expr, evaluate_filter, FilterIterator, FilterResult, Filterable};
