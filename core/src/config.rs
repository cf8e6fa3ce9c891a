use std::sync::OnceLock;

/// Environment variable controlling whether filters on chained (nested) attributes are encoded for the source.
pub const ENCODE_NESTED_FILTERS_ENV: &str = "APP_SCHEMA_ENCODE_NESTED_FILTERS";

static ENCODE_NESTED_FILTERS: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// When false every nested attribute reference is evaluated after retrieval.
    pub encode_nested_filters: bool,
}

impl SplitterConfig {
    pub fn new(encode_nested_filters: bool) -> Self { Self { encode_nested_filters } }

    /// Process-wide setting, read once from [`ENCODE_NESTED_FILTERS_ENV`].
    pub fn from_env() -> Self { Self::new(*ENCODE_NESTED_FILTERS.get_or_init(|| parse_flag(std::env::var(ENCODE_NESTED_FILTERS_ENV).ok().as_deref()))) }

    /// Never encode nested attribute filters
    pub fn no_nested_encoding() -> Self { Self::new(false) }
}

impl Default for SplitterConfig {
    fn default() -> Self { Self::from_env() }
}

fn parse_flag(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => !matches!(v.as_str(), "false" | "0" | "no" | "off"),
        None => true,
    }
}
