//! Client request and response value types.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// A request submitted through a [`ClientSession`](crate::ClientSession).
#[derive(Debug, Clone)]
pub struct ClientRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl ClientRequest {
    /// Create a request with the given method and URL.
    pub fn new(method: Method, url: impl AsRef<str>) -> ClientResult<Self> {
        Ok(Self {
            method,
            url: Url::parse(url.as_ref())?,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Create a GET request.
    pub fn get(url: impl AsRef<str>) -> ClientResult<Self> {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl AsRef<str>) -> ClientResult<Self> {
        Self::new(Method::POST, url)
    }

    /// Create a PUT request.
    pub fn put(url: impl AsRef<str>) -> ClientResult<Self> {
        Self::new(Method::PUT, url)
    }

    /// Create a DELETE request.
    pub fn delete(url: impl AsRef<str>) -> ClientResult<Self> {
        Self::new(Method::DELETE, url)
    }

    /// Set a header.
    #[must_use]
    pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body with the matching content type.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> ClientResult<Self> {
        let body =
            serde_json::to_vec(value).map_err(|e| ClientError::body(e.to_string()))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// Derive the follow-up request for a redirect target.
    ///
    /// When the method is rewritten to GET the body is dropped along with
    /// its content headers.
    pub(crate) fn redirected_to(&self, url: Url, method: Method) -> Self {
        let mut headers = self.headers.clone();
        let mut body = self.body.clone();
        if method == Method::GET && self.method != Method::GET {
            body = None;
            headers.remove(http::header::CONTENT_TYPE);
            headers.remove(http::header::CONTENT_LENGTH);
        }
        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

/// A fully collected response from a [`ClientSession`](crate::ClientSession).
#[derive(Debug, Clone)]
pub struct ClientResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The URL that produced this response (after redirects).
    pub url: Url,
    /// Response body.
    pub body: Bytes,
}

impl ClientResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the status is a redirect with a Location target.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.headers.contains_key(http::header::LOCATION)
    }

    /// A header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The response body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.to_vec()).ok()
    }

    /// The response body parsed as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::body(e.to_string()))
    }
}
