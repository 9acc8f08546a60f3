//! Reading SOAP responses: faults, the `<return>` payload and its fields

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, WosError};
use crate::wos::models::{CitedReference, SearchResponse};
use crate::wos::shape::ResponseShape;

fn xml_error(err: impl std::fmt::Display) -> WosError {
    WosError::XmlError(err.to_string())
}

/// Return the fault carried by a response, if any
pub(crate) fn find_fault(raw: &str) -> Result<Option<WosError>> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut in_fault = false;
    let mut current: Option<Vec<u8>> = None;
    let mut code = String::new();
    let mut message = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                if local == b"Fault" {
                    in_fault = true;
                } else if in_fault {
                    current = Some(local);
                }
            }
            Event::Text(e) if in_fault => {
                let text = e.unescape().map_err(xml_error)?;
                match current.as_deref() {
                    Some(b"faultcode") => code.push_str(&text),
                    Some(b"faultstring") => message.push_str(&text),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"Fault" {
                    return Ok(Some(WosError::SoapFault { code, message }));
                }
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(None)
}

/// Raw markup of the first `<return>` element, tags included
pub(crate) fn extract_return(raw: &str) -> Result<Option<&str>> {
    let mut reader = Reader::from_str(raw);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"return" => {
                let span = reader.read_to_end(e.name()).map_err(xml_error)?;
                let content_start = span.start as usize;
                let content_end = span.end as usize;

                let start = raw[..content_start].rfind('<').ok_or_else(|| {
                    WosError::XmlError("unterminated <return> element".to_string())
                })?;
                let end = raw[content_end..]
                    .find('>')
                    .map(|pos| content_end + pos + 1)
                    .ok_or_else(|| {
                        WosError::XmlError("unterminated </return> element".to_string())
                    })?;
                return Ok(Some(&raw[start..end]));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"return" => {
                let end = reader.buffer_position() as usize;
                let start = raw[..end].rfind('<').unwrap_or(0);
                return Ok(Some(&raw[start..end]));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Text content of the `<return>` element, e.g. the session id
pub(crate) fn parse_return_text(raw: &str) -> Result<String> {
    let payload = extract_return(raw)?
        .ok_or_else(|| WosError::XmlError("response has no <return> element".to_string()))?;

    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(e) => text.push_str(&e.unescape().map_err(xml_error)?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReturnPayload {
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    records_found: u64,
    #[serde(default)]
    records_searched: u64,
    #[serde(default)]
    references: Vec<CitedReference>,
}

/// The premium `records` field: record XML escaped as text
#[derive(Debug, Default, Deserialize)]
struct RecordsPayload {
    #[serde(default)]
    records: Option<String>,
}

/// Parse the response of any query operation
pub(crate) fn parse_search_response(raw: String, shape: ResponseShape) -> Result<SearchResponse> {
    let payload = extract_return(&raw)?
        .ok_or_else(|| WosError::XmlError("response has no <return> element".to_string()))?;

    let fields: ReturnPayload = quick_xml::de::from_str(payload)?;
    let records = match shape {
        ResponseShape::Full => quick_xml::de::from_str::<RecordsPayload>(payload)?.records,
        ResponseShape::Wrapped => None,
    };

    debug!(
        query_id = ?fields.query_id,
        records_found = fields.records_found,
        references = fields.references.len(),
        "Parsed search response"
    );

    Ok(SearchResponse {
        query_id: fields.query_id,
        records_found: fields.records_found,
        records_searched: fields.records_searched,
        records,
        references: fields.references,
        raw,
    })
}
