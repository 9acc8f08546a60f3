//! A small ElementTree-style path language for pulling text out of records
//!
//! Paths are relative to the document root, e.g. `./REC/UID`,
//! `.//title[@type='item']` or `./records/*/value`.

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, WosError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicate: Option<Predicate>,
}

#[derive(Debug)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Step {
    fn accepts(&self, node: &Node) -> bool {
        let name_ok = match &self.test {
            NameTest::Any => true,
            NameTest::Name(name) => *name == node.name,
        };
        name_ok
            && match &self.predicate {
                None => true,
                Some(Predicate::HasAttribute(attr)) => {
                    node.attributes.iter().any(|(key, _)| key == attr)
                }
                Some(Predicate::AttributeEquals(attr, value)) => node
                    .attributes
                    .iter()
                    .any(|(key, found)| key == attr && found == value),
            }
    }
}

/// Compiled extraction path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPath {
    steps: Vec<Step>,
}

impl XmlPath {
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(WosError::InvalidPath("empty path".to_string()));
        }
        if path.starts_with('/') {
            return Err(WosError::InvalidPath(format!(
                "cannot use absolute path {path:?}, start with '.'"
            )));
        }

        let segments = split_segments(path)?;
        let mut steps = Vec::new();
        let mut axis = Axis::Child;

        for (index, segment) in segments.iter().enumerate() {
            match segment.as_str() {
                "" if index + 1 == segments.len() => {
                    return Err(WosError::InvalidPath(format!(
                        "path {path:?} ends with a separator"
                    )));
                }
                "" => axis = Axis::Descendant,
                "." => {}
                ".." => {
                    return Err(WosError::InvalidPath(
                        "parent steps are not supported".to_string(),
                    ));
                }
                _ => {
                    steps.push(parse_step(segment, axis)?);
                    axis = Axis::Child;
                }
            }
        }

        Ok(Self { steps })
    }

    /// Leading text of every matching element, in document order
    ///
    /// Values are trimmed of surrounding whitespace, so they are not the exact
    /// text of the document. Matches without text yield an empty string
    /// rather than being skipped.
    pub fn select(&self, xml: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Node> = Vec::new();
        // Per open element: result slot if it matched, and whether a child has started
        let mut capture: Vec<(Option<usize>, bool)> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        loop {
            match reader
                .read_event()
                .map_err(|e| WosError::XmlError(e.to_string()))?
            {
                Event::Start(e) => {
                    if let Some(parent) = capture.last_mut() {
                        parent.1 = true;
                    }
                    stack.push(node_from(&e)?);
                    let slot = self.matches_stack(&stack).then(|| {
                        values.push(String::new());
                        values.len() - 1
                    });
                    capture.push((slot, false));
                }
                Event::Empty(e) => {
                    if let Some(parent) = capture.last_mut() {
                        parent.1 = true;
                    }
                    stack.push(node_from(&e)?);
                    if self.matches_stack(&stack) {
                        values.push(String::new());
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    if let Some((Some(slot), false)) = capture.last() {
                        let text = e
                            .unescape()
                            .map_err(|err| WosError::XmlError(err.to_string()))?;
                        values[*slot].push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some((Some(slot), false)) = capture.last() {
                        values[*slot].push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(_) => {
                    stack.pop();
                    capture.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(values
            .into_iter()
            .map(|value| value.trim().to_string())
            .collect())
    }

    fn matches_stack(&self, stack: &[Node]) -> bool {
        // The root is the context node; steps apply below it
        match stack.split_first() {
            Some((_, below_root)) => matches(&self.steps, below_root),
            None => false,
        }
    }
}

impl FromStr for XmlPath {
    type Err = WosError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn matches(steps: &[Step], chain: &[Node]) -> bool {
    match (steps.split_last(), chain.split_last()) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some((step, earlier_steps)), Some((node, ancestors))) => {
            if !step.accepts(node) {
                return false;
            }
            match step.axis {
                Axis::Child => matches(earlier_steps, ancestors),
                Axis::Descendant => {
                    (0..=ancestors.len()).any(|depth| matches(earlier_steps, &ancestors[..depth]))
                }
            }
        }
    }
}

fn node_from(e: &BytesStart<'_>) -> Result<Node> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| WosError::XmlError(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| WosError::XmlError(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Node { name, attributes })
}

/// Split on `/` outside of predicates and quotes
fn split_segments(path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for c in path.chars() {
        match (c, quote) {
            (q, Some(open)) if q == open => {
                quote = None;
                current.push(c);
            }
            (_, Some(_)) => current.push(c),
            ('\'' | '"', None) if in_brackets => {
                quote = Some(c);
                current.push(c);
            }
            ('[', None) => {
                in_brackets = true;
                current.push(c);
            }
            (']', None) => {
                in_brackets = false;
                current.push(c);
            }
            ('/', None) if !in_brackets => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if quote.is_some() || in_brackets {
        return Err(WosError::InvalidPath(format!("unbalanced predicate in {path:?}")));
    }
    segments.push(current);
    Ok(segments)
}

fn parse_step(segment: &str, axis: Axis) -> Result<Step> {
    let (name, predicate) = match segment.find('[') {
        Some(open) => {
            let inner = segment[open + 1..].strip_suffix(']').ok_or_else(|| {
                WosError::InvalidPath(format!("malformed predicate in {segment:?}"))
            })?;
            (&segment[..open], Some(parse_predicate(inner)?))
        }
        None => (segment, None),
    };

    let test = match name {
        "*" => NameTest::Any,
        "" => {
            return Err(WosError::InvalidPath(format!(
                "missing element name in {segment:?}"
            )));
        }
        name if name.contains(['[', ']', '@', '\'', '"', '(', ')']) => {
            return Err(WosError::InvalidPath(format!("invalid element name {name:?}")));
        }
        name => NameTest::Name(name.to_string()),
    };

    Ok(Step {
        axis,
        test,
        predicate,
    })
}

fn parse_predicate(inner: &str) -> Result<Predicate> {
    let attr = inner.trim().strip_prefix('@').ok_or_else(|| {
        WosError::InvalidPath(format!("only attribute predicates are supported: [{inner}]"))
    })?;

    match attr.split_once('=') {
        None if !attr.is_empty() => Ok(Predicate::HasAttribute(attr.trim().to_string())),
        None => Err(WosError::InvalidPath("empty attribute predicate".to_string())),
        Some((key, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| {
                    WosError::InvalidPath(format!("attribute value must be quoted: [{inner}]"))
                })?;
            Ok(Predicate::AttributeEquals(
                key.trim().to_string(),
                unquoted.to_string(),
            ))
        }
    }
}
