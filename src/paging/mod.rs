//! Paged queries over the 100-records-per-call limit of the service
//!
//! [`query`] splits a logical request into bounded page requests, then
//! either concatenates the values extracted from every page or stitches the
//! page documents back into one XML document.
//!
//! ```no_run
//! use wos_client::{ClientConfig, WosClient, paging};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = WosClient::with_config(ClientConfig::new().with_credentials("user", "secret"))?;
//!     client.connect().await?;
//!
//!     // 250 records in three calls: (1, 100), (101, 100), (201, 50)
//!     let uids = paging::query(&client, "AU=Knuth", Some("./REC/UID"), 250, 1, 100)
//!         .await?
//!         .into_values();
//!     println!("{} identifiers", uids.len());
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod path;
pub mod xml;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, WosError};
use crate::wos::models::{MAX_PAGE_SIZE, SearchOptions, SearchSummary};
use crate::wos::WosClient;

pub use path::XmlPath;

/// Page size used when none is given
pub const DEFAULT_PAGE_LIMIT: u32 = MAX_PAGE_SIZE;

/// Prefix of Web of Science unique identifiers
const WOS_PREFIX: &str = "WOS:";

/// Outcome of [`single`] and [`query`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResult {
    /// Pretty-printed XML document (no extraction path given)
    Document(String),
    /// Text extracted with a path, in page and document order
    Values(Vec<String>),
    /// Counters only (`count = 0`)
    Summary(SearchSummary),
}

impl QueryResult {
    pub fn as_document(&self) -> Option<&str> {
        match self {
            QueryResult::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_values(&self) -> Option<&[String]> {
        match self {
            QueryResult::Values(values) => Some(values),
            _ => None,
        }
    }

    /// Extracted values, empty for documents and summaries
    pub fn into_values(self) -> Vec<String> {
        match self {
            QueryResult::Values(values) => values,
            _ => Vec::new(),
        }
    }

    pub fn summary(&self) -> Option<&SearchSummary> {
        match self {
            QueryResult::Summary(summary) => Some(summary),
            _ => None,
        }
    }
}

/// One bounded request: 1-based first record and record count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub count: u32,
}

/// Contiguous, non-overlapping pages covering `[offset, offset + count)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pages: Vec<Page>,
}

impl PagePlan {
    /// Split `count` records starting at `offset` into pages of at most `page_limit`
    ///
    /// A `count` of 0 yields one summary-only page.
    ///
    /// ```
    /// use wos_client::paging::{Page, PagePlan};
    ///
    /// let plan = PagePlan::new(1, 250, 100).unwrap();
    /// assert_eq!(
    ///     plan.pages(),
    ///     &[
    ///         Page { offset: 1, count: 100 },
    ///         Page { offset: 101, count: 100 },
    ///         Page { offset: 201, count: 50 },
    ///     ]
    /// );
    /// ```
    pub fn new(offset: u32, count: u32, page_limit: u32) -> Result<Self> {
        if offset == 0 {
            return Err(WosError::InvalidQuery(
                "offset is 1-based and must be at least 1".to_string(),
            ));
        }
        if page_limit == 0 || page_limit > MAX_PAGE_SIZE {
            return Err(WosError::InvalidQuery(format!(
                "page limit must be between 1 and {MAX_PAGE_SIZE}, got {page_limit}"
            )));
        }
        if offset.checked_add(count).is_none() {
            return Err(WosError::InvalidQuery(format!(
                "record range starting at {offset} with {count} records overflows"
            )));
        }

        if count == 0 {
            return Ok(Self {
                pages: vec![Page { offset, count: 0 }],
            });
        }

        let end = offset + count;
        let pages = (offset..end)
            .step_by(page_limit as usize)
            .map(|start| Page {
                offset: start,
                count: page_limit.min(end - start),
            })
            .collect();

        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Run one bounded search and post-process its page
///
/// # Arguments
///
/// * `client` - Connected client
/// * `query` - Search expression, e.g. `DO="10.1145/2180861.2180863"`
/// * `path` - Optional extraction path such as `./REC/UID`
/// * `count` - Records to fetch, 0..=100
/// * `offset` - 1-based index of the first record
pub async fn single(
    client: &WosClient,
    query: &str,
    path: Option<&str>,
    count: u32,
    offset: u32,
) -> Result<QueryResult> {
    let path = path.map(XmlPath::parse).transpose()?;
    fetch_page(client, query, path.as_ref(), count, offset).await
}

/// Run a query of any size as a sequence of bounded searches
///
/// With a `path`, the extracted values of all pages are concatenated in page
/// order. Without one, the page documents are stripped of their outer tag
/// and wrapped under a single root. Any failing page aborts the whole query.
#[instrument(skip(client, path), fields(query = %query))]
pub async fn query(
    client: &WosClient,
    query: &str,
    path: Option<&str>,
    count: u32,
    offset: u32,
    page_limit: u32,
) -> Result<QueryResult> {
    let path = path.map(XmlPath::parse).transpose()?;
    let plan = PagePlan::new(offset, count, page_limit)?;
    debug!(pages = plan.len(), "Planned paged query");

    if count == 0 {
        return fetch_page(client, query, path.as_ref(), 0, offset).await;
    }

    let root_tag = client.shape().root_tag();
    let mut values = Vec::new();
    let mut fragments = Vec::with_capacity(plan.len());

    for page in plan.pages() {
        match fetch_page(client, query, path.as_ref(), page.count, page.offset).await? {
            QueryResult::Values(page_values) => values.extend(page_values),
            QueryResult::Document(document) => {
                fragments.push(xml::strip_envelope(&document, root_tag).to_string())
            }
            QueryResult::Summary(_) => {}
        }
    }

    if path.is_some() {
        info!(values = values.len(), "Paged query complete");
        Ok(QueryResult::Values(values))
    } else {
        info!(pages = fragments.len(), "Paged query complete");
        Ok(QueryResult::Document(xml::wrap_fragments(&fragments, root_tag)))
    }
}

/// Convert a DOI into a Web of Science identifier (without the `WOS:` prefix)
///
/// Returns `Ok(None)` when no record carries the DOI. Lite clients fail
/// with `WosError::NotSupportedInLite`: their records have no `UID` field.
pub async fn doi_to_wos(client: &WosClient, doi: &str) -> Result<Option<String>> {
    if client.is_lite() {
        return Err(WosError::NotSupportedInLite {
            operation: "doi_to_wos",
        });
    }

    let wos_query = format!("DO=\"{doi}\"");
    let uids = query(client, &wos_query, Some("./REC/UID"), 1, 1, DEFAULT_PAGE_LIMIT)
        .await?
        .into_values();

    Ok(uids.into_iter().next().map(|uid| match uid.strip_prefix(WOS_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => uid,
    }))
}

async fn fetch_page(
    client: &WosClient,
    query: &str,
    path: Option<&XmlPath>,
    count: u32,
    offset: u32,
) -> Result<QueryResult> {
    let response = client
        .search(query, count, offset, &SearchOptions::default())
        .await?;

    if count == 0 {
        return Ok(QueryResult::Summary(response.summary()));
    }

    let page = client.shape().page_document(&response)?;
    let page = xml::strip_default_namespace(&page);

    match path {
        Some(path) => Ok(QueryResult::Values(path.select(&page)?)),
        None => Ok(QueryResult::Document(xml::prettify(&page)?)),
    }
}
