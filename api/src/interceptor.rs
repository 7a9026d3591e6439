//! Credential handling around every request
//!
//! Before a request goes out the interceptor adds the CSRF header on
//! mutating calls and the session token on authenticated calls. After a
//! response comes back it watches for 401: the session is dropped and the
//! application is sent to the login route. There is no silent refresh.

use crate::navigation::{Navigator, Route};
use crate::session::SessionContext;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::sync::Arc;

/// Header carrying the CSRF token
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Paths that never carry the session token
const ANONYMOUS_PATHS: [&str; 2] = ["/login/", "/register/"];

/// Path that hands out the CSRF cookie
const CSRF_BOOTSTRAP_PATH: &str = "/csrf/";

/// Adds credentials to outgoing requests and reacts to rejected ones
#[derive(Clone)]
pub struct Interceptor {
    session: SessionContext,
    navigator: Arc<dyn Navigator>,
    cookies: Option<Arc<Jar>>,
    csrf_cookie_name: String,
}

impl Interceptor {
    /// Create an interceptor
    ///
    /// `cookies` is the jar the HTTP client shares; without one the CSRF
    /// header is sent empty.
    pub fn new(
        session: SessionContext,
        navigator: Arc<dyn Navigator>,
        cookies: Option<Arc<Jar>>,
        csrf_cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            session,
            navigator,
            cookies,
            csrf_cookie_name: csrf_cookie_name.into(),
        }
    }

    /// Session the interceptor reads tokens from
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Headers to add to a request for `method` on `url`
    #[must_use]
    pub fn outbound_headers(&self, method: &Method, url: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let path = url.path();

        if is_mutating(method) && !path.ends_with(CSRF_BOOTSTRAP_PATH) {
            let token = self.csrf_token(url).unwrap_or_default();
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(CSRF_HEADER, value);
                }
                Err(_) => tracing::warn!("CSRF cookie is not a valid header value"),
            }
        }

        let anonymous = ANONYMOUS_PATHS.iter().any(|p| path.ends_with(p));
        if !anonymous {
            if let Some(token) = self.session.token() {
                match HeaderValue::from_str(&format!("Token {token}")) {
                    Ok(mut value) => {
                        value.set_sensitive(true);
                        headers.insert(AUTHORIZATION, value);
                    }
                    Err(_) => tracing::warn!("Session token is not a valid header value"),
                }
            }
        }

        headers
    }

    /// React to a response status
    pub async fn inbound_status(&self, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Request unauthorized, clearing session");
            self.session.invalidate().await;
            self.navigator.navigate(Route::Login);
        }
    }

    fn csrf_token(&self, url: &Url) -> Option<String> {
        let header = self.cookies.as_ref()?.cookies(url)?;
        let cookies = header.to_str().ok()?;
        cookie_value(cookies, &self.csrf_cookie_name)
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("session", &self.session)
            .field("csrf_cookie_name", &self.csrf_cookie_name)
            .finish_non_exhaustive()
    }
}

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`)
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::session::Session;

    const BASE: &str = "http://api.test/geotech";

    fn url(path: &str) -> Url {
        Url::parse(&format!("{BASE}{path}")).unwrap()
    }

    fn interceptor(cookies: Option<Arc<Jar>>) -> (Interceptor, RecordingNavigator) {
        let navigator = RecordingNavigator::new();
        let interceptor = Interceptor::new(
            SessionContext::in_memory(),
            Arc::new(navigator.clone()),
            cookies,
            "csrftoken",
        );
        (interceptor, navigator)
    }

    fn jar_with_csrf(value: &str) -> Arc<Jar> {
        let jar = Jar::default();
        jar.add_cookie_str(&format!("csrftoken={value}; Path=/"), &url("/csrf/"));
        Arc::new(jar)
    }

    #[test]
    fn test_cookie_value() {
        assert_eq!(
            cookie_value("sessionid=x; csrftoken=abc", "csrftoken").as_deref(),
            Some("abc")
        );
        assert_eq!(cookie_value("sessionid=x", "csrftoken"), None);
        assert_eq!(cookie_value("", "csrftoken"), None);
    }

    #[test]
    fn test_csrf_header_only_on_mutating_requests() {
        let (interceptor, _) = interceptor(Some(jar_with_csrf("abc")));

        let post = interceptor.outbound_headers(&Method::POST, &url("/projects/"));
        assert_eq!(post.get(CSRF_HEADER).unwrap(), "abc");

        let get = interceptor.outbound_headers(&Method::GET, &url("/projects/"));
        assert!(get.get(CSRF_HEADER).is_none());

        let delete = interceptor.outbound_headers(&Method::DELETE, &url("/projects/1/"));
        assert_eq!(delete.get(CSRF_HEADER).unwrap(), "abc");
    }

    #[test]
    fn test_csrf_header_empty_without_cookie() {
        let (interceptor, _) = interceptor(None);
        let headers = interceptor.outbound_headers(&Method::PUT, &url("/projects/1/"));
        assert_eq!(headers.get(CSRF_HEADER).unwrap(), "");
    }

    #[tokio::test]
    async fn test_token_attached_except_on_login_and_register() {
        let (interceptor, _) = interceptor(None);
        interceptor.session().establish(Session::new("secret")).await;

        let headers = interceptor.outbound_headers(&Method::GET, &url("/projects/"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Token secret");

        for path in ["/login/", "/register/"] {
            let headers = interceptor.outbound_headers(&Method::POST, &url(path));
            assert!(headers.get(AUTHORIZATION).is_none(), "{path} carried a token");
        }
    }

    #[test]
    fn test_no_token_when_signed_out() {
        let (interceptor, _) = interceptor(None);
        let headers = interceptor.outbound_headers(&Method::GET, &url("/projects/"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects() {
        let (interceptor, navigator) = interceptor(None);
        interceptor.session().establish(Session::new("secret")).await;

        interceptor.inbound_status(StatusCode::OK).await;
        assert!(interceptor.session().is_authenticated());
        assert!(navigator.routes().is_empty());

        interceptor.inbound_status(StatusCode::UNAUTHORIZED).await;
        assert!(!interceptor.session().is_authenticated());
        assert_eq!(navigator.last(), Some(Route::Login));
    }

    #[tokio::test]
    async fn test_unauthorized_redirects_even_when_signed_out() {
        let (interceptor, navigator) = interceptor(None);
        interceptor.inbound_status(StatusCode::UNAUTHORIZED).await;
        assert_eq!(navigator.routes(), vec![Route::Login]);
    }
}
