pub mod cql;
pub mod filter;
