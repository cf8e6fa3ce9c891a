use crate::ast::{Expr, Filter};
use crate::error::ParseError;
use crate::parser;
use std::convert::TryFrom;

impl<'a> TryFrom<&'a str> for Filter {
    type Error = ParseError;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> { parser::parse_filter(value) }
}
impl TryFrom<String> for Filter {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> { parser::parse_filter(&value) }
}
impl<'a> TryFrom<&'a str> for Expr {
    type Error = ParseError;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> { parser::parse_expr(value) }
}

impl std::str::FromStr for Filter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { parser::parse_filter(s) }
}
