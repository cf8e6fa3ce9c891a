use crate::error::{Error, Result};
use crate::name::{Namespaces, QName};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

/// One segment of a location path.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: QName,
    /// Explicit 1-based index, as written.
    index: Option<usize>,
    pub xml_attribute: bool,
    /// Predicate text without the surrounding brackets, e.g. `@codeSpace='urn:x'`.
    pub predicate: Option<String>,
}

impl Step {
    pub fn new(name: QName) -> Self { Self { name, index: None, xml_attribute: false, predicate: None } }

    pub fn attribute(name: QName) -> Self { Self { name, index: None, xml_attribute: true, predicate: None } }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Effective index; a step without an explicit index addresses the first element.
    pub fn index(&self) -> usize { self.index.unwrap_or(1) }

    pub fn is_indexed(&self) -> bool { self.index.is_some() }

    pub fn explicit_index(&self) -> Option<usize> { self.index }

    pub fn is_xlink_href(&self) -> bool { self.xml_attribute && self.name.is_xlink_href() }

    pub fn is_id(&self) -> bool { self.xml_attribute && self.name.is_gml_id() }

    pub fn eq_ignore_index(&self, other: &Step) -> bool { self.xml_attribute == other.xml_attribute && self.name == other.name }

    pub fn without_index(&self) -> Step { Step { index: None, ..self.clone() } }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool { self.eq_ignore_index(other) && self.index() == other.index() && self.predicate == other.predicate }
}

impl Eq for Step {}

impl Hash for Step {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.xml_attribute.hash(state);
        self.index().hash(state);
        self.predicate.hash(state);
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.xml_attribute {
            f.write_str("@")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, "[{}]", predicate)?;
        }
        Ok(())
    }
}

/// A location path: an ordered, non-empty sequence of [`Step`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StepList(Vec<Step>);

impl StepList {
    pub fn new(steps: Vec<Step>) -> Self { Self(steps) }

    pub fn single(step: Step) -> Self { Self(vec![step]) }

    /// Parse an XPath-like property name relative to the element named `root`.
    ///
    /// Steps are separated by `/` outside brackets and quotes, `@` marks an XML attribute, `[n]` is a
    /// 1-based index and any other bracketed text is kept as a predicate. `.` is the root element itself. A path
    /// starting with an XML attribute is prefixed with the root step, and a leading root step followed by an element
    /// is dropped.
    pub fn parse(root: &QName, xpath: &str, namespaces: &Namespaces) -> Result<StepList> {
        let trimmed = xpath.trim();
        let relative = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if relative.is_empty() {
            return Err(Error::InvalidXPath { xpath: xpath.to_string(), reason: "empty path".into() });
        }
        let mut steps = split_steps(relative).into_iter().map(|segment| parse_step(root, xpath, segment, namespaces)).collect::<Result<Vec<_>>>()?;
        // an XML attribute of the feature itself is addressed through the root step
        if steps.first().is_some_and(|s| s.xml_attribute) {
            steps.insert(0, Step::new(root.clone()));
        } else if steps.len() > 1 && steps[0].name == *root && !steps[0].is_indexed() && !steps[1].xml_attribute {
            steps.remove(0);
        }
        Ok(StepList(steps))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> { self.0.iter() }

    pub fn first(&self) -> Option<&Step> { self.0.first() }

    pub fn last(&self) -> Option<&Step> { self.0.last() }

    pub fn steps(&self) -> &[Step] { &self.0 }

    pub fn push(&mut self, step: Step) { self.0.push(step) }

    pub fn prepend(&mut self, step: Step) { self.0.insert(0, step) }

    pub fn remove_first(&mut self) -> Option<Step> { if self.0.is_empty() { None } else { Some(self.0.remove(0)) } }

    /// Steps `from..to`, clamped to the list bounds.
    pub fn sub_list(&self, from: usize, to: usize) -> StepList {
        let to = to.min(self.0.len());
        let from = from.min(to);
        StepList(self.0[from..to].to_vec())
    }

    /// All steps but the last.
    pub fn parent(&self) -> StepList { self.sub_list(0, self.0.len().saturating_sub(1)) }

    pub fn starts_with(&self, prefix: &StepList) -> bool { prefix.len() <= self.len() && self.0.iter().zip(prefix.iter()).all(|(a, b)| a == b) }

    pub fn starts_with_ignore_index(&self, prefix: &StepList) -> bool {
        prefix.len() <= self.len() && self.0.iter().zip(prefix.iter()).all(|(a, b)| a.eq_ignore_index(b))
    }

    pub fn eq_ignore_index(&self, other: &StepList) -> bool { self.len() == other.len() && self.starts_with_ignore_index(other) }

    pub fn contains_predicate(&self) -> bool { self.0.iter().any(|s| s.predicate.is_some()) }

    pub fn is_indexed(&self) -> bool { self.0.iter().any(Step::is_indexed) }

    pub fn without_indexes(&self) -> StepList { StepList(self.0.iter().map(Step::without_index).collect()) }

    pub fn without_predicates(&self) -> StepList { StepList(self.0.iter().map(|s| Step { predicate: None, ..s.clone() }).collect()) }
}

impl Index<usize> for StepList {
    type Output = Step;

    fn index(&self, index: usize) -> &Step { &self.0[index] }
}

impl<'a> IntoIterator for &'a StepList {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl FromIterator<Step> for StepList {
    fn from_iter<T: IntoIterator<Item = Step>>(iter: T) -> Self { StepList(iter.into_iter().collect()) }
}

impl fmt::Display for StepList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

fn split_steps(xpath: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in xpath.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                segments.push(&xpath[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&xpath[start..]);
    segments
}

fn parse_step(root: &QName, xpath: &str, segment: &str, namespaces: &Namespaces) -> Result<Step> {
    let invalid = |reason: &str| Error::InvalidXPath { xpath: xpath.to_string(), reason: reason.to_string() };
    let segment = segment.trim();
    if segment == "." {
        return Ok(Step::new(root.clone()));
    }
    let (xml_attribute, rest) = match segment.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, segment),
    };
    let name_end = rest.find('[').unwrap_or(rest.len());
    let name = rest[..name_end].trim();
    if name.is_empty() {
        return Err(invalid("empty step name"));
    }

    let qname = match name.split_once(':') {
        Some((prefix, local)) => {
            let uri = namespaces.uri(prefix).ok_or_else(|| Error::UnknownPrefix { prefix: prefix.to_string(), xpath: xpath.to_string() })?;
            QName::new(uri, local).with_prefix(prefix)
        }
        // unprefixed attributes are in no namespace
        None if xml_attribute => QName::local(name),
        None => namespaces.resolve(name).unwrap_or_else(|| QName::local(name)),
    };
    let mut step = if xml_attribute { Step::attribute(qname) } else { Step::new(qname) };

    let mut brackets = &rest[name_end..];
    while let Some(open) = brackets.strip_prefix('[') {
        let close = matching_bracket(open).ok_or_else(|| invalid("unbalanced brackets"))?;
        let content = open[..close].trim();
        match content.parse::<usize>() {
            Ok(0) => return Err(invalid("indexes are 1-based")),
            Ok(index) => step.index = Some(index),
            Err(_) => step.predicate = Some(content.to_string()),
        }
        brackets = open[close + 1..].trim_start();
    }
    if !brackets.is_empty() {
        return Err(invalid("unexpected text after step"));
    }
    Ok(step)
}

/// Position of the `]` closing a bracket whose `[` has already been consumed.
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') if depth == 0 => return Some(i),
            (None, ']') => depth -= 1,
            _ => {}
        }
    }
    None
}
