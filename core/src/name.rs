//! Qualified names and namespace declarations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const GML_NS: &str = "http://www.opengis.net/gml";
pub const GML32_NS: &str = "http://www.opengis.net/gml/3.2";
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Local name of the synthetic property holding the text value of a simple content type.
pub const SIMPLE_CONTENT: &str = "simpleContent";
/// Local name of the property carrying the feature chaining link value on nested features.
pub const FEATURE_LINK: &str = "FEATURE_LINK";

/// A namespace-qualified name. The prefix is kept for rendering only and does not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
    pub prefix: Option<String>,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self { Self { namespace: Some(namespace.into()), local: local.into(), prefix: None } }

    pub fn local(local: impl Into<String>) -> Self { Self { namespace: None, local: local.into(), prefix: None } }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn xlink_href() -> Self { QName::new(XLINK_NS, "href").with_prefix("xlink") }

    pub fn simple_content() -> Self { QName::local(SIMPLE_CONTENT) }

    pub fn feature_link() -> Self { QName::local(FEATURE_LINK) }

    pub fn is_xlink_href(&self) -> bool { self.namespace.as_deref() == Some(XLINK_NS) && self.local == "href" }

    /// `gml:id` in either GML 3.1 or 3.2.
    pub fn is_gml_id(&self) -> bool { matches!(self.namespace.as_deref(), Some(GML_NS) | Some(GML32_NS)) && self.local == "id" }

    /// `ns#local` form used in diagnostics.
    pub fn uri_form(&self) -> String { format!("{}#{}", self.namespace.as_deref().unwrap_or(""), self.local) }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool { self.namespace == other.namespace && self.local == other.local }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => write!(f, "{}:{}", prefix, self.local),
            _ => f.write_str(&self.local),
        }
    }
}

/// Prefix to namespace URI declarations, in declaration order. The empty prefix is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespaces {
    declarations: IndexMap<String, String>,
}

impl Default for Namespaces {
    fn default() -> Self { Self::new() }
}

impl Namespaces {
    /// Declarations with the `xlink` prefix already bound.
    pub fn new() -> Self {
        let mut declarations = IndexMap::new();
        declarations.insert("xlink".to_string(), XLINK_NS.to_string());
        Self { declarations }
    }

    pub fn declare(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> &mut Self {
        self.declarations.insert(prefix.into(), uri.into());
        self
    }

    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.declare(prefix, uri);
        self
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> { self.declarations.get(prefix).map(String::as_str) }

    pub fn default_namespace(&self) -> Option<&str> { self.uri("") }

    /// First prefix bound to `uri`, skipping the default namespace.
    pub fn prefix(&self, uri: &str) -> Option<&str> { self.declarations.iter().find(|(p, u)| !p.is_empty() && u.as_str() == uri).map(|(p, _)| p.as_str()) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> { self.declarations.iter().map(|(p, u)| (p.as_str(), u.as_str())) }

    /// Resolve `prefix:local` (or a bare local name, in the default namespace) to a [`QName`].
    /// Returns `None` when the prefix is not declared.
    pub fn resolve(&self, name: &str) -> Option<QName> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.uri(prefix)?;
                Some(QName::new(uri, local).with_prefix(prefix))
            }
            None => Some(QName { namespace: self.default_namespace().map(str::to_string), local: name.to_string(), prefix: None }),
        }
    }
}
