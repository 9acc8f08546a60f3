//! SOAP 1.1 request envelopes for the authentication and search endpoints
//!
//! Only the fixed request shapes of the WoS operations are produced here:
//! one operation element in the endpoint namespace whose children are
//! unqualified parameter elements.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Result, WosError};
use crate::wos::models::{
    DATABASE_ID, Edition, QUERY_LANGUAGE, RetrieveParameters, SearchOptions, TimeSpan,
};

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

pub(crate) const AUTH_NS: &str = "http://auth.cxf.wokmws.thomsonreuters.com";
pub(crate) const SEARCH_NS: &str = "http://woksearch.v3.wokmws.thomsonreuters.com";
pub(crate) const SEARCH_LITE_NS: &str = "http://woksearchlite.v3.wokmws.thomsonreuters.com";

/// Parameter element of an operation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Text { name: &'static str, value: String },
    Group { name: &'static str, children: Vec<Param> },
}

impl Param {
    pub(crate) fn text(name: &'static str, value: impl Into<String>) -> Self {
        Param::Text {
            name,
            value: value.into(),
        }
    }

    pub(crate) fn group(name: &'static str, children: Vec<Param>) -> Self {
        Param::Group { name, children }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        match self {
            Param::Text { name, value } => {
                write_event(writer, Event::Start(BytesStart::new(*name)))?;
                write_event(writer, Event::Text(BytesText::new(value)))?;
                write_event(writer, Event::End(BytesEnd::new(*name)))
            }
            Param::Group { name, children } => {
                write_event(writer, Event::Start(BytesStart::new(*name)))?;
                for child in children {
                    child.write(writer)?;
                }
                write_event(writer, Event::End(BytesEnd::new(*name)))
            }
        }
    }
}

/// A single SOAP operation call
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SoapRequest {
    operation: &'static str,
    namespace: &'static str,
    params: Vec<Param>,
}

impl SoapRequest {
    pub(crate) fn new(operation: &'static str, namespace: &'static str) -> Self {
        Self {
            operation,
            namespace,
            params: Vec::new(),
        }
    }

    pub(crate) fn operation(&self) -> &'static str {
        self.operation
    }

    pub(crate) fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub(crate) fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Serialize the full envelope
    pub(crate) fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        let operation = format!("ns:{}", self.operation);

        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write_event(
            &mut writer,
            Event::Start(BytesStart::new("soapenv:Envelope").with_attributes([
                ("xmlns:soapenv", SOAP_ENV_NS),
                ("xmlns:ns", self.namespace),
            ])),
        )?;
        write_event(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
        write_event(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;
        write_event(&mut writer, Event::Start(BytesStart::new(operation.as_str())))?;
        for param in &self.params {
            param.write(&mut writer)?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new(operation.as_str())))?;
        write_event(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| WosError::XmlError(e.to_string()))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| WosError::XmlError(e.to_string()))
}

pub(crate) fn retrieve_parameters(params: &RetrieveParameters) -> Param {
    Param::group(
        "retrieveParameters",
        vec![
            Param::text("firstRecord", params.first_record.to_string()),
            Param::text("count", params.count.to_string()),
            Param::group(
                "sortField",
                vec![
                    Param::text("name", params.sort_field.name.clone()),
                    Param::text("sort", params.sort_field.order.as_str()),
                ],
            ),
        ],
    )
}

pub(crate) fn editions(editions: &[Edition]) -> impl Iterator<Item = Param> + '_ {
    editions.iter().map(|edition| {
        Param::group(
            "editions",
            vec![
                Param::text("collection", edition.collection.clone()),
                Param::text("edition", edition.edition.clone()),
            ],
        )
    })
}

pub(crate) fn time_span(span: &TimeSpan) -> Param {
    Param::group(
        "timeSpan",
        vec![
            Param::text("begin", span.begin.clone()),
            Param::text("end", span.end.clone()),
        ],
    )
}

pub(crate) fn query_parameters(query: &str, options: &SearchOptions) -> Param {
    let mut children = vec![
        Param::text("databaseId", DATABASE_ID),
        Param::text("userQuery", query),
    ];
    children.extend(editions(&options.editions));
    if let Some(span) = &options.symbolic_time_span {
        children.push(Param::text("symbolicTimeSpan", span.clone()));
    }
    if let Some(span) = &options.time_span {
        children.push(time_span(span));
    }
    children.push(Param::text("queryLanguage", QUERY_LANGUAGE));

    Param::group("queryParameters", children)
}
