use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "cql.pest"]
pub struct CqlParser;
