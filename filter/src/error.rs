use crate::grammar;
use thiserror::Error;

/// Custom error type for parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    SyntaxError(String),
    #[error("Empty expression")]
    EmptyExpression,
    #[error("Expected {expected}, got {got:?}")]
    UnexpectedRule { expected: &'static str, got: grammar::Rule },
    #[error("Missing {0} operand")]
    MissingOperand(&'static str),
    #[error("Invalid number {0}")]
    InvalidNumber(String),
    #[error("Invalid geometry {text}: {reason}")]
    InvalidGeometry { text: String, reason: String },
}

impl From<pest::error::Error<grammar::Rule>> for ParseError {
    fn from(error: pest::error::Error<grammar::Rule>) -> Self { ParseError::SyntaxError(error.to_string()) }
}

/// Errors raised while evaluating a filter against an in-memory record
#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluation of {0} is not supported in memory")]
    Unsupported(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Function {name} expects {expected} arguments, got {got}")]
    ArgumentCount { name: String, expected: usize, got: usize },
}
