use serde::{Deserialize, Serialize};

use crate::error::{Result, WosError};

/// Largest page the service returns for a single call
pub const MAX_PAGE_SIZE: u32 = 100;

/// Database queried by every operation
pub const DATABASE_ID: &str = "WOS";

/// Query language accepted by the service
pub const QUERY_LANGUAGE: &str = "en";

/// Sort direction for retrieved records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Wire value (`A` or `D`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "A",
            SortOrder::Descending => "D",
        }
    }
}

/// Field the service sorts retrieved records by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Field tag, e.g. `RS` (relevance), `PY` (publication year), `TC` (times cited)
    pub name: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn new(name: impl Into<String>, order: SortOrder) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }
}

impl Default for SortField {
    fn default() -> Self {
        Self::new("RS", SortOrder::Descending)
    }
}

/// Paging and sorting block sent with every query operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveParameters {
    /// 1-based index of the first record
    pub first_record: u32,
    /// Records to return, 0 for summary only
    pub count: u32,
    pub sort_field: SortField,
}

impl RetrieveParameters {
    pub fn new(offset: u32, count: u32) -> Self {
        Self {
            first_record: offset,
            count,
            sort_field: SortField::default(),
        }
    }

    pub fn with_sort(mut self, sort_field: SortField) -> Self {
        self.sort_field = sort_field;
        self
    }

    /// Check the bounds the service enforces on a single call
    pub fn validate(&self) -> Result<()> {
        if self.first_record == 0 {
            return Err(WosError::InvalidQuery(
                "offset is 1-based and must be at least 1".to_string(),
            ));
        }
        if self.count > MAX_PAGE_SIZE {
            return Err(WosError::InvalidQuery(format!(
                "count {} exceeds the maximum page size of {}",
                self.count, MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// Collection/edition pair restricting a query, e.g. `WOS`/`SCI`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub collection: String,
    pub edition: String,
}

impl Edition {
    pub fn new(collection: impl Into<String>, edition: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            edition: edition.into(),
        }
    }
}

/// Inclusive date range in `YYYY-MM-DD` form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: String,
    pub end: String,
}

impl TimeSpan {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }
}

/// Optional filters for [`WosClient::search`](crate::WosClient::search)
///
/// ```
/// use wos_client::wos::{Edition, SearchOptions, SortField, SortOrder};
///
/// let options = SearchOptions::new()
///     .with_edition(Edition::new("WOS", "SCI"))
///     .with_symbolic_time_span("4week")
///     .with_sort(SortField::new("PY", SortOrder::Ascending));
///
/// assert_eq!(options.editions.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub editions: Vec<Edition>,
    /// Relative span such as `1week`, `2week` or `4week`
    pub symbolic_time_span: Option<String>,
    pub time_span: Option<TimeSpan>,
    pub sort_field: Option<SortField>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.editions.push(edition);
        self
    }

    pub fn with_symbolic_time_span(mut self, span: impl Into<String>) -> Self {
        self.symbolic_time_span = Some(span.into());
        self
    }

    pub fn with_time_span(mut self, time_span: TimeSpan) -> Self {
        self.time_span = Some(time_span);
        self
    }

    pub fn with_sort(mut self, sort_field: SortField) -> Self {
        self.sort_field = Some(sort_field);
        self
    }

    pub(crate) fn retrieve_parameters(&self, offset: u32, count: u32) -> RetrieveParameters {
        let params = RetrieveParameters::new(offset, count);
        match &self.sort_field {
            Some(sort_field) => params.with_sort(sort_field.clone()),
            None => params,
        }
    }
}

/// One entry of a `citedReferences` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedReference {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "docid", default)]
    pub doc_id: Option<String>,
    #[serde(rename = "articleID", default)]
    pub article_id: Option<String>,
    #[serde(rename = "citedAuthor", default)]
    pub cited_author: Option<String>,
    #[serde(rename = "timesCited", default)]
    pub times_cited: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(rename = "citedTitle", default)]
    pub cited_title: Option<String>,
    #[serde(rename = "citedWork", default)]
    pub cited_work: Option<String>,
    #[serde(default)]
    pub hot: Option<String>,
}

/// Counters returned by every query operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    /// Id usable with `retrieve` / `cited_references_retrieve`
    pub query_id: Option<String>,
    pub records_found: u64,
    pub records_searched: u64,
}

/// Raw page returned by one query operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub query_id: Option<String>,
    pub records_found: u64,
    pub records_searched: u64,
    /// Record XML as text (premium endpoint only)
    pub records: Option<String>,
    /// Cited references (premium `citedReferences*` operations only)
    pub references: Vec<CitedReference>,
    /// The full SOAP response body
    pub raw: String,
}

impl SearchResponse {
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            query_id: self.query_id.clone(),
            records_found: self.records_found,
            records_searched: self.records_searched,
        }
    }
}
