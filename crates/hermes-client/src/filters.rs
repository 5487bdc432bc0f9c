//! Client-side request and response filters.
//!
//! Request filters decorate the outgoing request (agent string, default
//! headers, credentials). Response filters inspect the collected response;
//! the redirect filter records a resubmission directive in the
//! [`FilterContext`] and the session acts on it with its own budget.

use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tracing::debug;
use url::Url;

use hermes_filter::{FilterContext, FilterError, FilterResult, RequestFilter, ResponseFilter};

use crate::request::{ClientRequest, ClientResponse};
use crate::settings::{ClientSessionSettings, ProxySettings};

/// Instruction to resubmit a request at a redirect target.
///
/// Placed in the filter context by [`RedirectResponseFilter`]; consumed by
/// the session's submit loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDirective {
    /// Absolute target URL.
    pub url: Url,
    /// Method for the follow-up request.
    pub method: Method,
}

/// Marker recorded when a proxy demands authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyAuthenticationRequired;

/// Adds the User-Agent and any configured default headers.
///
/// Headers the request already carries win over the defaults.
#[derive(Debug)]
pub struct DefaultClientHeaders {
    user_agent: HeaderValue,
    defaults: HeaderMap,
}

impl DefaultClientHeaders {
    /// Build from session settings.
    pub fn from_settings(settings: &ClientSessionSettings) -> FilterResult<Self> {
        let user_agent = HeaderValue::from_str(&settings.user_agent)
            .map_err(|e| FilterError::invalid_header("user-agent", e.to_string()))?;
        Ok(Self {
            user_agent,
            defaults: settings.default_headers.clone(),
        })
    }
}

impl RequestFilter<ClientRequest> for DefaultClientHeaders {
    fn name(&self) -> &'static str {
        "default-headers"
    }

    fn filter(&self, _ctx: &mut FilterContext, request: &mut ClientRequest) -> FilterResult<()> {
        if !request.headers.contains_key(http::header::USER_AGENT) {
            request
                .headers
                .insert(http::header::USER_AGENT, self.user_agent.clone());
        }
        for (name, value) in &self.defaults {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Sets an `Authorization` header with a bearer-style token.
#[derive(Debug)]
pub struct OAuth2RequestFilter {
    scheme: String,
    token: String,
}

impl OAuth2RequestFilter {
    /// Create a filter using the `Bearer` scheme.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scheme: "Bearer".to_string(),
            token: token.into(),
        }
    }

    /// Create a filter with a custom authorization scheme.
    pub fn with_scheme(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: token.into(),
        }
    }
}

impl RequestFilter<ClientRequest> for OAuth2RequestFilter {
    fn name(&self) -> &'static str {
        "oauth2"
    }

    fn filter(&self, _ctx: &mut FilterContext, request: &mut ClientRequest) -> FilterResult<()> {
        let value = HeaderValue::from_str(&format!("{} {}", self.scheme, self.token))
            .map_err(|e| FilterError::invalid_header("authorization", e.to_string()))?;
        request.headers.insert(http::header::AUTHORIZATION, value);
        Ok(())
    }
}

/// Sets `Proxy-Authorization` from the configured proxy credentials.
#[derive(Debug)]
pub struct ProxyRequestFilter {
    basic_auth: Option<HeaderValue>,
}

impl ProxyRequestFilter {
    /// Build from proxy settings.
    pub fn from_settings(proxy: &ProxySettings) -> FilterResult<Self> {
        let basic_auth = match proxy.basic_auth_value() {
            Some(value) => Some(
                HeaderValue::from_str(&value)
                    .map_err(|e| FilterError::invalid_header("proxy-authorization", e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { basic_auth })
    }
}

impl RequestFilter<ClientRequest> for ProxyRequestFilter {
    fn name(&self) -> &'static str {
        "proxy-auth"
    }

    fn filter(&self, _ctx: &mut FilterContext, request: &mut ClientRequest) -> FilterResult<()> {
        if let Some(value) = &self.basic_auth {
            request
                .headers
                .insert(http::header::PROXY_AUTHORIZATION, value.clone());
        }
        Ok(())
    }
}

/// Detects redirect responses and requests resubmission via the context.
///
/// Method rewriting: 303 always becomes GET; 301 and 302 become GET when
/// the original method was POST; 307 and 308 preserve the method and body.
#[derive(Debug, Default)]
pub struct RedirectResponseFilter;

impl RedirectResponseFilter {
    /// Create the filter.
    pub fn new() -> Self {
        Self
    }

    fn follow_method(status: StatusCode, method: &Method) -> Method {
        match status {
            StatusCode::SEE_OTHER => Method::GET,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND if *method == Method::POST => {
                Method::GET
            }
            _ => method.clone(),
        }
    }
}

impl ResponseFilter<ClientRequest, ClientResponse> for RedirectResponseFilter {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn filter(
        &self,
        ctx: &mut FilterContext,
        request: &ClientRequest,
        response: &mut ClientResponse,
    ) -> FilterResult<()> {
        if !response.status.is_redirection() {
            return Ok(());
        }
        let Some(location) = response.header("location") else {
            debug!(status = %response.status, "redirect status without Location header");
            return Ok(());
        };
        let url = request.url.join(location).map_err(|e| {
            FilterError::invalid_header("location", format!("unresolvable target: {e}"))
        })?;

        let method = Self::follow_method(response.status, &request.method);
        debug!(status = %response.status, target = %url, method = %method, "following redirect");
        ctx.set_extension(RedirectDirective { url, method });
        Ok(())
    }
}

/// Flags responses that demand proxy authentication.
///
/// A 407 with no proxy credentials configured aborts the pipeline; with
/// credentials the marker lets callers distinguish rejected credentials.
#[derive(Debug)]
pub struct ProxyResponseFilter {
    has_credentials: bool,
}

impl ProxyResponseFilter {
    /// Build from session settings.
    pub fn from_settings(settings: &ClientSessionSettings) -> Self {
        Self {
            has_credentials: settings
                .proxy
                .as_ref()
                .is_some_and(ProxySettings::has_credentials),
        }
    }
}

impl ResponseFilter<ClientRequest, ClientResponse> for ProxyResponseFilter {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn filter(
        &self,
        ctx: &mut FilterContext,
        _request: &ClientRequest,
        response: &mut ClientResponse,
    ) -> FilterResult<()> {
        if response.status != StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            return Ok(());
        }
        ctx.set_extension(ProxyAuthenticationRequired);
        if self.has_credentials {
            Err(FilterError::aborted(
                "proxy",
                "proxy rejected the configured credentials",
            ))
        } else {
            Err(FilterError::aborted(
                "proxy",
                "proxy requires authentication and no credentials are configured",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(status: StatusCode, location: Option<&'static str>) -> ClientResponse {
        let mut headers = HeaderMap::new();
        if let Some(location) = location {
            headers.insert(http::header::LOCATION, HeaderValue::from_static(location));
        }
        ClientResponse {
            status,
            headers,
            url: Url::parse("http://api.example/start").unwrap(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_default_headers_fill_missing() {
        let settings = ClientSessionSettings::new().default_header(
            http::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        let filter = DefaultClientHeaders::from_settings(&settings).unwrap();

        let mut ctx = FilterContext::new();
        let mut request = ClientRequest::get("http://api.example/").unwrap();
        filter.filter(&mut ctx, &mut request).unwrap();

        assert_eq!(
            request.headers.get(http::header::USER_AGENT).unwrap(),
            crate::settings::DEFAULT_USER_AGENT
        );
        assert_eq!(
            request.headers.get(http::header::ACCEPT).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_default_headers_never_overwrite() {
        let settings = ClientSessionSettings::new();
        let filter = DefaultClientHeaders::from_settings(&settings).unwrap();

        let mut ctx = FilterContext::new();
        let mut request = ClientRequest::get("http://api.example/")
            .unwrap()
            .header(http::header::USER_AGENT, HeaderValue::from_static("mine/2"));
        filter.filter(&mut ctx, &mut request).unwrap();

        assert_eq!(request.headers.get(http::header::USER_AGENT).unwrap(), "mine/2");
    }

    #[test]
    fn test_oauth2_bearer() {
        let filter = OAuth2RequestFilter::bearer("tok-123");
        let mut ctx = FilterContext::new();
        let mut request = ClientRequest::get("http://api.example/").unwrap();
        filter.filter(&mut ctx, &mut request).unwrap();

        assert_eq!(
            request.headers.get(http::header::AUTHORIZATION).unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_oauth2_custom_scheme() {
        let filter = OAuth2RequestFilter::with_scheme("Token", "abc");
        let mut ctx = FilterContext::new();
        let mut request = ClientRequest::get("http://api.example/").unwrap();
        filter.filter(&mut ctx, &mut request).unwrap();

        assert_eq!(
            request.headers.get(http::header::AUTHORIZATION).unwrap(),
            "Token abc"
        );
    }

    #[test]
    fn test_proxy_request_filter_sets_basic_auth() {
        let proxy = ProxySettings::new("proxy.example", 3128).credentials("user", "pass");
        let filter = ProxyRequestFilter::from_settings(&proxy).unwrap();

        let mut ctx = FilterContext::new();
        let mut request = ClientRequest::get("http://api.example/").unwrap();
        filter.filter(&mut ctx, &mut request).unwrap();

        let value = request
            .headers
            .get(http::header::PROXY_AUTHORIZATION)
            .unwrap();
        assert!(value.to_str().unwrap().starts_with("Basic "));
    }

    #[test]
    fn test_redirect_records_directive() {
        let filter = RedirectResponseFilter::new();
        let mut ctx = FilterContext::new();
        let request = ClientRequest::get("http://api.example/start").unwrap();
        let mut response = response(StatusCode::FOUND, Some("/next"));

        filter.filter(&mut ctx, &request, &mut response).unwrap();

        let directive = ctx.get_extension::<RedirectDirective>().unwrap();
        assert_eq!(directive.url.as_str(), "http://api.example/next");
        assert_eq!(directive.method, Method::GET);
    }

    #[test]
    fn test_redirect_303_always_downgrades() {
        let request = ClientRequest::put("http://api.example/job").unwrap();
        let mut ctx = FilterContext::new();
        let mut resp = response(StatusCode::SEE_OTHER, Some("http://api.example/status"));
        RedirectResponseFilter::new()
            .filter(&mut ctx, &request, &mut resp)
            .unwrap();

        assert_eq!(
            ctx.get_extension::<RedirectDirective>().unwrap().method,
            Method::GET
        );
    }

    #[test]
    fn test_redirect_302_downgrades_post_only() {
        let mut ctx = FilterContext::new();
        let post = ClientRequest::post("http://api.example/a").unwrap();
        let mut resp = response(StatusCode::FOUND, Some("/b"));
        RedirectResponseFilter::new()
            .filter(&mut ctx, &post, &mut resp)
            .unwrap();
        assert_eq!(
            ctx.get_extension::<RedirectDirective>().unwrap().method,
            Method::GET
        );

        let mut ctx = FilterContext::new();
        let put = ClientRequest::put("http://api.example/a").unwrap();
        let mut resp = response(StatusCode::FOUND, Some("/b"));
        RedirectResponseFilter::new()
            .filter(&mut ctx, &put, &mut resp)
            .unwrap();
        assert_eq!(
            ctx.get_extension::<RedirectDirective>().unwrap().method,
            Method::PUT
        );
    }

    #[test]
    fn test_redirect_307_preserves_method() {
        let mut ctx = FilterContext::new();
        let post = ClientRequest::post("http://api.example/a").unwrap();
        let mut resp = response(StatusCode::TEMPORARY_REDIRECT, Some("/b"));
        RedirectResponseFilter::new()
            .filter(&mut ctx, &post, &mut resp)
            .unwrap();
        assert_eq!(
            ctx.get_extension::<RedirectDirective>().unwrap().method,
            Method::POST
        );
    }

    #[test]
    fn test_redirect_without_location_passes_through() {
        let mut ctx = FilterContext::new();
        let request = ClientRequest::get("http://api.example/").unwrap();
        let mut resp = response(StatusCode::FOUND, None);
        RedirectResponseFilter::new()
            .filter(&mut ctx, &request, &mut resp)
            .unwrap();
        assert!(!ctx.has_extension::<RedirectDirective>());
    }

    #[test]
    fn test_proxy_response_aborts_on_407() {
        let settings = ClientSessionSettings::new();
        let filter = ProxyResponseFilter::from_settings(&settings);

        let mut ctx = FilterContext::new();
        let request = ClientRequest::get("http://api.example/").unwrap();
        let mut resp = response(StatusCode::PROXY_AUTHENTICATION_REQUIRED, None);
        let result = filter.filter(&mut ctx, &request, &mut resp);

        assert!(matches!(result, Err(FilterError::Aborted { .. })));
        assert!(ctx.has_extension::<ProxyAuthenticationRequired>());
    }
}
