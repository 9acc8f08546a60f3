use crate::error::{Result, WosError};
use crate::wos::envelope::{SEARCH_LITE_NS, SEARCH_NS};
use crate::wos::models::SearchResponse;
use crate::wos::parser::extract_return;

/// Response shape of the search endpoint, fixed when the client is built
///
/// The premium endpoint returns structured records whose `records` field
/// holds the record XML as text. The lite endpoint returns a single
/// `<return>` element whose children are the records themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Premium (WWS Expanded) full records
    Full,
    /// Lite records wrapped in `<return>`
    Wrapped,
}

impl ResponseShape {
    pub fn from_lite(lite: bool) -> Self {
        if lite {
            ResponseShape::Wrapped
        } else {
            ResponseShape::Full
        }
    }

    /// Root tag of a page document
    pub fn root_tag(&self) -> &'static str {
        match self {
            ResponseShape::Full => "records",
            ResponseShape::Wrapped => "return",
        }
    }

    pub fn supports_premium(&self) -> bool {
        matches!(self, ResponseShape::Full)
    }

    pub(crate) fn namespace(&self) -> &'static str {
        match self {
            ResponseShape::Full => SEARCH_NS,
            ResponseShape::Wrapped => SEARCH_LITE_NS,
        }
    }

    /// The XML document of one page
    pub fn page_document(&self, response: &SearchResponse) -> Result<String> {
        match self {
            ResponseShape::Full => Ok(response
                .records
                .as_deref()
                .filter(|records| !records.trim().is_empty())
                .map_or_else(|| "<records></records>".to_string(), str::to_string)),
            ResponseShape::Wrapped => extract_return(&response.raw)?
                .map(str::to_string)
                .ok_or_else(|| {
                    WosError::XmlError("lite response has no <return> element".to_string())
                }),
        }
    }
}
