use futures_util::future::BoxFuture;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Result, WosError};
use crate::rate_limit::RateLimiter;
use crate::wos::envelope::{self, AUTH_NS, Param, SoapRequest};
use crate::wos::models::{
    DATABASE_ID, Edition, QUERY_LANGUAGE, RetrieveParameters, SearchOptions, SearchResponse,
    TimeSpan,
};
use crate::wos::parser::{find_fault, parse_return_text, parse_search_response};
use crate::wos::shape::ResponseShape;

/// Client for the Web of Science web services
///
/// Holds at most one session id (SID). Query operations require an open
/// session; the premium-only operations additionally require a client that
/// was not configured for WOS Lite.
///
/// # Example
///
/// ```no_run
/// use wos_client::{ClientConfig, WosClient};
/// use wos_client::wos::SearchOptions;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::new().with_credentials("user", "secret");
///     let mut client = WosClient::with_config(config)?;
///
///     client.connect().await?;
///     let page = client
///         .search("AU=Knuth", 5, 1, &SearchOptions::default())
///         .await?;
///     println!("{} records found", page.records_found);
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct WosClient {
    client: Client,
    config: ClientConfig,
    shape: ResponseShape,
    rate_limiter: Option<RateLimiter>,
    sid: Option<String>,
}

impl WosClient {
    /// Create a premium client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::new())
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// * `WosError::RequestError` - If the proxy URL is invalid or the HTTP
    ///   client cannot be built
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.effective_user_agent());

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(Self::with_client(builder.build()?, config))
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        let rate_limiter = config.create_rate_limiter();
        let shape = ResponseShape::from_lite(config.lite);
        let sid = config.sid.clone();

        Self {
            client,
            config,
            shape,
            rate_limiter,
            sid,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    pub fn is_lite(&self) -> bool {
        self.shape == ResponseShape::Wrapped
    }

    /// Current session id, if a session is open
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.sid.is_some()
    }

    /// Authenticate and store the session id
    ///
    /// A client that already holds a session returns it without calling the
    /// service again.
    #[instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<String> {
        if let Some(sid) = &self.sid {
            debug!("Session already open");
            return Ok(sid.clone());
        }

        let request = SoapRequest::new("authenticate", AUTH_NS);
        let raw = self.post(&self.config.auth_url(), &request, true).await?;
        let sid = parse_return_text(&raw)?;
        if sid.is_empty() {
            return Err(WosError::XmlError(
                "authenticate returned an empty session id".to_string(),
            ));
        }

        info!("Authenticated");
        self.sid = Some(sid.clone());
        Ok(sid)
    }

    /// Close the session on the service side and forget the session id
    ///
    /// Does nothing when no session is open. The session id is kept if the
    /// service rejects the teardown call.
    #[instrument(skip(self))]
    pub async fn close(&mut self) -> Result<()> {
        if self.sid.is_none() {
            return Ok(());
        }

        let request = SoapRequest::new("closeSession", AUTH_NS);
        self.post(&self.config.auth_url(), &request, true).await?;

        info!("Session closed");
        self.sid = None;
        Ok(())
    }

    /// Run `body` inside a session
    ///
    /// Connects first and closes afterwards unless the client was configured
    /// with `close_on_exit(false)`. An error from `body` takes precedence
    /// over an error from closing.
    ///
    /// ```no_run
    /// use wos_client::{WosClient, paging};
    ///
    /// # async fn run() -> wos_client::Result<()> {
    /// let mut client = WosClient::new()?;
    /// let uid = client
    ///     .scoped(|wos| Box::pin(paging::doi_to_wos(wos, "10.1145/2180861.2180863")))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(&mut self, body: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c WosClient) -> BoxFuture<'c, Result<T>>,
    {
        self.connect().await?;
        let outcome = body(&*self).await;

        if self.config.close_on_exit {
            let closed = self.close().await;
            if let Err(e) = &closed {
                warn!("Failed to close session: {}", e);
            }
            if outcome.is_ok() {
                closed?;
            }
        }

        outcome
    }

    /// Search the database with a query in the service's query language
    ///
    /// # Arguments
    ///
    /// * `query` - User query, e.g. `TS=(cadmium OR lead)` or `DO="10.1145/2180861.2180863"`
    /// * `count` - Records to return, 0..=100 (0 returns counters only)
    /// * `offset` - 1-based index of the first record
    /// * `options` - Editions, time spans and sorting
    #[instrument(skip(self, options), fields(query = %query))]
    pub async fn search(
        &self,
        query: &str,
        count: u32,
        offset: u32,
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        let retrieve = self.guard(None, options.retrieve_parameters(offset, count))?;

        let request = self
            .search_request("search")
            .param(envelope::query_parameters(query, options))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// Fetch further records of a previous query by its query id
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query_id: &str, count: u32, offset: u32) -> Result<SearchResponse> {
        let retrieve = self.guard(None, RetrieveParameters::new(offset, count))?;

        let request = self
            .search_request("retrieve")
            .param(Param::text("queryId", query_id))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// Fetch records by their unique identifiers (`WOS:...`)
    #[instrument(skip(self, uids), fields(uids = uids.len()))]
    pub async fn retrieve_by_id(
        &self,
        uids: &[&str],
        count: u32,
        offset: u32,
    ) -> Result<SearchResponse> {
        let retrieve = self.guard(None, RetrieveParameters::new(offset, count))?;

        let request = self
            .search_request("retrieveById")
            .param(Param::text("databaseId", DATABASE_ID))
            .params(uids.iter().map(|uid| Param::text("uid", *uid)))
            .param(Param::text("queryLanguage", QUERY_LANGUAGE))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// References cited by the record `uid` (premium)
    #[instrument(skip(self))]
    pub async fn cited_references(&self, uid: &str, count: u32, offset: u32) -> Result<SearchResponse> {
        let retrieve = self.guard(
            Some("citedReferences"),
            RetrieveParameters::new(offset, count),
        )?;

        let request = self
            .search_request("citedReferences")
            .param(Param::text("databaseId", DATABASE_ID))
            .param(Param::text("uid", uid))
            .param(Param::text("queryLanguage", QUERY_LANGUAGE))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// Further cited references of a previous `cited_references` query (premium)
    #[instrument(skip(self))]
    pub async fn cited_references_retrieve(
        &self,
        query_id: &str,
        count: u32,
        offset: u32,
    ) -> Result<SearchResponse> {
        let retrieve = self.guard(
            Some("citedReferencesRetrieve"),
            RetrieveParameters::new(offset, count),
        )?;

        let request = self
            .search_request("citedReferencesRetrieve")
            .param(Param::text("queryId", query_id))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// Records citing the record `uid` (premium)
    #[instrument(skip(self, editions, time_span))]
    pub async fn citing_articles(
        &self,
        uid: &str,
        count: u32,
        offset: u32,
        editions: &[Edition],
        time_span: Option<&TimeSpan>,
    ) -> Result<SearchResponse> {
        self.linked_records("citingArticles", uid, count, offset, editions, time_span)
            .await
    }

    /// Records sharing cited references with the record `uid` (premium)
    #[instrument(skip(self, editions, time_span))]
    pub async fn related_records(
        &self,
        uid: &str,
        count: u32,
        offset: u32,
        editions: &[Edition],
        time_span: Option<&TimeSpan>,
    ) -> Result<SearchResponse> {
        self.linked_records("relatedRecords", uid, count, offset, editions, time_span)
            .await
    }

    async fn linked_records(
        &self,
        operation: &'static str,
        uid: &str,
        count: u32,
        offset: u32,
        editions: &[Edition],
        time_span: Option<&TimeSpan>,
    ) -> Result<SearchResponse> {
        let retrieve = self.guard(Some(operation), RetrieveParameters::new(offset, count))?;

        let mut request = self
            .search_request(operation)
            .param(Param::text("databaseId", DATABASE_ID))
            .param(Param::text("uid", uid))
            .params(envelope::editions(editions));
        if let Some(span) = time_span {
            request = request.param(envelope::time_span(span));
        }
        let request = request
            .param(Param::text("queryLanguage", QUERY_LANGUAGE))
            .param(envelope::retrieve_parameters(&retrieve));

        self.call(request).await
    }

    /// Preconditions shared by every query operation, checked before any I/O
    fn guard(
        &self,
        premium_operation: Option<&'static str>,
        retrieve: RetrieveParameters,
    ) -> Result<RetrieveParameters> {
        if let Some(operation) = premium_operation {
            if !self.shape.supports_premium() {
                warn!(operation, "Premium operation called on a lite client");
                return Err(WosError::PremiumRequired { operation });
            }
        }

        if self.sid.is_none() {
            return Err(WosError::SessionNotOpen);
        }

        retrieve.validate()?;
        Ok(retrieve)
    }

    fn search_request(&self, operation: &'static str) -> SoapRequest {
        SoapRequest::new(operation, self.shape.namespace())
    }

    async fn call(&self, request: SoapRequest) -> Result<SearchResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let raw = self
            .post(&self.config.search_url(), &request, false)
            .await?;
        parse_search_response(raw, self.shape)
    }

    /// POST one envelope and return the response body
    ///
    /// Basic credentials go to the authentication endpoint only; the session
    /// cookie goes everywhere once a session is open.
    async fn post(&self, url: &str, request: &SoapRequest, auth_endpoint: bool) -> Result<String> {
        let body = request.to_xml()?;

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml;charset=UTF-8")
            .header("SOAPAction", "\"\"")
            .body(body);

        if auth_endpoint {
            if let Some(credentials) = &self.config.credentials {
                builder = builder.basic_auth(&credentials.user, Some(&credentials.password));
            }
        }
        if let Some(sid) = &self.sid {
            builder = builder.header(COOKIE, format!("SID=\"{}\"", sid));
        }

        debug!(operation = request.operation(), url, "Making SOAP request");
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if let Some(fault) = find_fault(&text).ok().flatten() {
            warn!(operation = request.operation(), "SOAP fault: {}", fault);
            return Err(fault);
        }

        if !status.is_success() {
            warn!("API request failed with status: {}", status);
            return Err(WosError::ApiError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        Ok(text)
    }
}

impl Drop for WosClient {
    fn drop(&mut self) {
        if self.sid.is_some() && self.config.close_on_exit {
            warn!("WosClient dropped with an open session; call close() to release it");
        }
    }
}
