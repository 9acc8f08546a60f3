//! Page document helpers: namespace stripping, pretty printing and reassembly

use std::borrow::Cow;
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use regex::Regex;
use tracing::debug;

use crate::error::{Result, WosError};

/// Declaration heading every document produced by this module
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" ?>"#;

/// Remove the first default namespace declaration (` xmlns="..."`)
///
/// Only the first occurrence is removed: records may carry their own
/// default namespace attributes, which must survive.
pub fn strip_default_namespace(xml: &str) -> Cow<'_, str> {
    static DEFAULT_NS_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = DEFAULT_NS_REGEX.get_or_init(|| {
        Regex::new(r#" xmlns="[^"]+""#).expect("Failed to compile namespace regex")
    });

    re.replacen(xml, 1, "")
}

/// Re-indent a document with four spaces and drop blank lines
///
/// Only whitespace spanning a line break is treated as formatting and
/// dropped. Other text is written as-is, so mixed content such as
/// `<p>Growth of <i>E. coli</i> in media</p>` keeps its spacing.
pub fn prettify(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    loop {
        match reader
            .read_event()
            .map_err(|e| WosError::XmlError(e.to_string()))?
        {
            Event::Eof => break,
            Event::Decl(_) => {}
            Event::Text(e) if is_formatting(&e) => {}
            event => writer
                .write_event(event)
                .map_err(|e| WosError::XmlError(e.to_string()))?,
        }
    }

    let body =
        String::from_utf8(writer.into_inner()).map_err(|e| WosError::XmlError(e.to_string()))?;

    let mut pretty = String::from(XML_DECLARATION);
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        pretty.push('\n');
        pretty.push_str(line);
    }
    Ok(pretty)
}

fn is_formatting(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace) && text.iter().any(|&b| b == b'\n')
}

/// Content of the outer `root_tag` element of a page document
///
/// The declaration and the outer tags are dropped; an empty or missing
/// root yields an empty fragment.
pub fn strip_envelope<'a>(document: &'a str, root_tag: &str) -> &'a str {
    let open = format!("<{root_tag}");
    let close = format!("</{root_tag}>");

    let Some(open_at) = document.match_indices(&open).map(|(at, _)| at).find(|at| {
        document[at + open.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
    }) else {
        return "";
    };

    let Some(open_end) = document[open_at..].find('>').map(|pos| open_at + pos) else {
        return "";
    };
    if document[..open_end].ends_with('/') {
        return "";
    }

    let content_start = open_end + 1;
    let content_end = document
        .rfind(&close)
        .filter(|&end| end >= content_start)
        .unwrap_or(document.len());

    document[content_start..content_end]
        .trim_start_matches(['\r', '\n'])
        .trim_end()
}

/// Wrap page fragments, in order, under a single `root_tag`
pub fn wrap_fragments<S: AsRef<str>>(fragments: &[S], root_tag: &str) -> String {
    let body: Vec<&str> = fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|fragment| !fragment.trim().is_empty())
        .collect();

    debug!(
        pages = fragments.len(),
        non_empty = body.len(),
        "Reassembling page fragments"
    );

    if body.is_empty() {
        return format!("{XML_DECLARATION}\n<{root_tag}></{root_tag}>");
    }
    format!(
        "{XML_DECLARATION}\n<{root_tag}>\n{}\n</{root_tag}>",
        body.join("\n")
    )
}
