use std::fmt;
use std::time::Duration;

use crate::rate_limit::RateLimiter;

/// Default Web of Science web services host
pub const DEFAULT_BASE_URL: &str = "http://search.webofknowledge.com";

const AUTH_PATH: &str = "/esti/wokmws/ws/WOKMWSAuthenticate";
const SEARCH_PATH: &str = "/esti/wokmws/ws/WokSearch";

/// Username and password for premium (WWS Expanded) access
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Calls-per-window budget applied before every guarded call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Throttle {
    pub calls: u32,
    pub window: Duration,
}

impl Throttle {
    pub fn new(calls: u32, window: Duration) -> Self {
        Self { calls, window }
    }

    /// Allowed calls per second
    pub fn rate(&self) -> f64 {
        let window = self.window.as_secs_f64();
        if window <= 0.0 {
            return f64::from(self.calls.max(1));
        }
        f64::from(self.calls) / window
    }
}

impl Default for Throttle {
    /// The service allows two calls per second per session
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

/// Configuration for [`WosClient`](crate::WosClient)
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wos_client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_credentials("user", "secret")
///     .with_throttle(2, Duration::from_secs(1))
///     .with_close_on_exit(false);
///
/// assert!(!config.lite);
/// assert!(config.auth_url().ends_with("/WOKMWSAuthenticate"));
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Premium credentials, sent as HTTP Basic to the auth endpoint only
    pub credentials: Option<Credentials>,
    /// Existing session id to reuse instead of authenticating
    pub sid: Option<String>,
    /// Use the reduced WOS Lite endpoint and response shape
    pub lite: bool,
    /// Close the session when a scoped block ends
    pub close_on_exit: bool,
    pub base_url: Option<String>,
    /// Per-call transport timeout
    pub timeout: Duration,
    pub throttle: Option<Throttle>,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            credentials: None,
            sid: None,
            lite: false,
            close_on_exit: true,
            base_url: None,
            timeout: Duration::from_secs(600),
            throttle: Some(Throttle::default()),
            user_agent: None,
            proxy: None,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    /// Reuse a session id obtained elsewhere; `connect()` will not authenticate
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_lite(mut self, lite: bool) -> Self {
        self.lite = lite;
        self
    }

    pub fn with_close_on_exit(mut self, close_on_exit: bool) -> Self {
        self.close_on_exit = close_on_exit;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow at most `calls` guarded calls per `window`
    pub fn with_throttle(mut self, calls: u32, window: Duration) -> Self {
        self.throttle = Some(Throttle::new(calls, window));
        self
    }

    pub fn without_throttle(mut self) -> Self {
        self.throttle = None;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn auth_url(&self) -> String {
        format!("{}{}", self.effective_base_url(), AUTH_PATH)
    }

    pub fn search_url(&self) -> String {
        let suffix = if self.lite { "Lite" } else { "" };
        format!("{}{}{}", self.effective_base_url(), SEARCH_PATH, suffix)
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("wos-client/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn create_rate_limiter(&self) -> Option<RateLimiter> {
        self.throttle
            .map(|throttle| RateLimiter::new(throttle.calls, throttle.window))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
