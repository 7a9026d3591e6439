//! HTTP client adapter for the geotech REST API

use crate::config::ApiConfig;
use crate::error::TransportError;
use crate::interceptor::Interceptor;
use crate::navigation::Navigator;
use crate::session::SessionContext;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use std::sync::Arc;

/// A downloaded file body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Response body
    pub bytes: Vec<u8>,
    /// File name suggested by `Content-Disposition`
    pub file_name: Option<String>,
}

/// Client for the geotech REST API
///
/// Joins request paths onto the configured base URL, runs every request
/// through the [`Interceptor`] and turns non-2xx responses into
/// [`TransportError::Status`]. Clones share the connection pool, cookie jar
/// and session.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    interceptor: Interceptor,
}

impl HttpClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidUrl`]: `config.base_url` is not a URL
    /// - [`TransportError::Setup`]: the HTTP client could not be built
    pub fn new(
        config: &ApiConfig,
        session: SessionContext,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers);

        let cookies = config.with_credentials.then(|| Arc::new(Jar::default()));
        if let Some(jar) = &cookies {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            interceptor: Interceptor::new(
                session,
                navigator,
                cookies,
                config.csrf_cookie_name.clone(),
            ),
        })
    }

    /// Session the client authenticates with
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        self.interceptor.session()
    }

    /// Base URL requests are sent to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `path`, keeping the base URL's own path prefix
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if the result is not a URL.
    pub fn url(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))
    }

    /// `GET` a JSON resource
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures, non-2xx statuses and
    /// undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.send(Method::GET, path, |r| r).await?;
        decode(response).await
    }

    /// `POST` a JSON body and decode the JSON answer
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures, non-2xx statuses and
    /// undecodable bodies.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, |r| r.json(body)).await?;
        decode(response).await
    }

    /// `PUT` a JSON body and decode the JSON answer
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures, non-2xx statuses and
    /// undecodable bodies.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::PUT, path, |r| r.json(body)).await?;
        decode(response).await
    }

    /// `DELETE` a resource, ignoring any response body
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures and non-2xx statuses.
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let response = self.send(Method::DELETE, path, |r| r).await?;
        decode::<IgnoredAny>(response).await.map(|_| ())
    }

    /// `POST` a multipart form and decode the JSON answer
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures, non-2xx statuses and
    /// undecodable bodies.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, TransportError> {
        let response = self
            .send(Method::POST, path, move |r| r.multipart(form))
            .await?;
        decode(response).await
    }

    /// `GET` a binary resource
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for network failures and non-2xx statuses.
    pub async fn get_bytes(&self, path: &str) -> Result<Download, TransportError> {
        let response = self.send(Method::GET, path, |r| r).await?;
        let status = response.status().as_u16();
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Decode {
                status,
                message: e.to_string(),
            })?;

        Ok(Download {
            bytes: bytes.to_vec(),
            file_name,
        })
    }

    async fn send<F>(
        &self,
        method: Method,
        path: &str,
        attach: F,
    ) -> Result<Response, TransportError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let url = self.url(path)?;
        let headers = self.interceptor.outbound_headers(&method, &url);

        tracing::debug!(method = %method, path, "Sending request");
        let request = attach(self.client.request(method.clone(), url).headers(headers));

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "Request failed");
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        self.interceptor.inbound_status(status).await;

        if status.is_success() {
            return Ok(response);
        }

        let body = error_body(response).await;
        tracing::debug!(method = %method, path, status = status.as_u16(), "Request rejected");
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("interceptor", &self.interceptor)
            .finish_non_exhaustive()
    }
}

/// Decode a 2xx body; an empty body decodes as JSON `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| TransportError::Decode {
        status,
        message: e.to_string(),
    })?;

    let decoded = if text.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(&text)
    };

    decoded.map_err(|e| TransportError::Decode {
        status,
        message: e.to_string(),
    })
}

/// JSON error body, or the raw text as a JSON string, or nothing.
async fn error_body(response: Response) -> Option<Value> {
    let text = response.text().await.ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// File name from a `Content-Disposition` value
fn disposition_file_name(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (key, name) = part.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = name.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}
