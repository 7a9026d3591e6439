//! Client configuration

/// Base URL used when `GEOTECH_API_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/geotech";

/// Cookie the server stores its CSRF token in
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Storage key the session record is persisted under
pub const DEFAULT_SESSION_KEY: &str = "user";

/// Configuration for [`HttpClient`](crate::HttpClient)
///
/// ```
/// use geotech_api::ApiConfig;
///
/// let config = ApiConfig::new("https://example.com/geotech")
///     .with_credentials(true)
///     .with_session_key("geotech-user");
///
/// assert_eq!(config.base_url, "https://example.com/geotech");
/// assert_eq!(config.csrf_cookie_name, "csrftoken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Keep a cookie jar so the session and CSRF cookies travel with requests
    pub with_credentials: bool,
    /// Name of the CSRF cookie mirrored into `X-CSRFToken`
    pub csrf_cookie_name: String,
    /// Storage key of the persisted session
    pub session_key: String,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl ApiConfig {
    /// Create a configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            with_credentials: true,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            user_agent: concat!("geotech-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Load configuration from the environment
    ///
    /// - `GEOTECH_API_URL`: base URL (default [`DEFAULT_BASE_URL`])
    /// - `GEOTECH_WITH_CREDENTIALS`: `false`/`0` disables the cookie jar
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GEOTECH_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let with_credentials = std::env::var("GEOTECH_WITH_CREDENTIALS")
            .map(|value| parse_flag(&value))
            .unwrap_or(true);

        Self::new(base_url).with_credentials(with_credentials)
    }

    /// Enable or disable credentialed (cookie-carrying) requests
    #[must_use]
    pub const fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Override the CSRF cookie name
    #[must_use]
    pub fn with_csrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.csrf_cookie_name = name.into();
        self
    }

    /// Override the session storage key
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Override the `User-Agent` header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
