//! The route trait and base implementations.

use crate::settings::RouteSettings;
use hermes_core::{Request, Response, ResponseExt};
use hermes_filter::{FilterChain, FilterContext};
use http::StatusCode;
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

/// A boxed future, the return type of route handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A server route.
///
/// Routes are probed in registration order by the
/// [`Dispatcher`](crate::Dispatcher); the first route whose `can_handle`
/// returns `true` takes the request.
///
/// # Invariants
///
/// - `can_handle` MUST be pure: same request and flag, same answer
/// - `can_handle` MUST NOT consume or mutate the request
/// - `handle` owns the request and always produces a response
pub trait Route: Send + Sync {
    /// Returns the name of this route, used for logging.
    fn name(&self) -> &'static str;

    /// Returns the matching criteria for this route.
    fn settings(&self) -> &RouteSettings;

    /// Whether this route takes the given request.
    ///
    /// The default implementation checks the secure-port requirement first,
    /// then the path pattern.
    fn can_handle(&self, request: &Request, is_secure_port: bool) -> bool {
        if self.settings().requires_secure_port() && !is_secure_port {
            return false;
        }
        self.settings().matches_path(request.uri().path())
    }

    /// Handles the request and produces a response.
    fn handle(&self, request: Request) -> BoxFuture<'_, Response>;

    /// Releases any resources held by the route. Called once at shutdown.
    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

type Handler = Box<dyn for<'a> Fn(&'a Request) -> BoxFuture<'a, Response> + Send + Sync>;

/// The standard route implementation: settings, a filter chain, a handler.
///
/// `handle` runs the request filters, the handler, then the response
/// filters. A filter error aborts the exchange and the route answers with
/// an HTTP 500 carrying the `FILTER_ABORTED` code; the handler never runs
/// after a request-filter error.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, Response};
/// use hermes_router::{BaseRoute, BoxFuture, RouteSettings};
///
/// fn hello(_req: &Request) -> BoxFuture<'_, Response> {
///     Box::pin(async {
///         http::Response::builder()
///             .status(200)
///             .body(http_body_util::Full::new(bytes::Bytes::from("hello")))
///             .expect("valid response")
///     })
/// }
///
/// let settings = RouteSettings::with_path_pattern("/hello").unwrap();
/// let route = BaseRoute::new("hello", settings, hello);
/// ```
pub struct BaseRoute {
    name: &'static str,
    settings: RouteSettings,
    filters: FilterChain<Request, Response>,
    handler: Handler,
}

impl BaseRoute {
    /// Creates a route from settings and a handler.
    pub fn new<F>(name: &'static str, settings: RouteSettings, handler: F) -> Self
    where
        F: for<'a> Fn(&'a Request) -> BoxFuture<'a, Response> + Send + Sync + 'static,
    {
        Self {
            name,
            settings,
            filters: FilterChain::new(),
            handler: Box::new(handler),
        }
    }

    /// Replaces the filter chain.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterChain<Request, Response>) -> Self {
        self.filters = filters;
        self
    }

    /// Mutable access to the filter chain, for incremental registration.
    pub fn filters_mut(&mut self) -> &mut FilterChain<Request, Response> {
        &mut self.filters
    }
}

impl Route for BaseRoute {
    fn name(&self) -> &'static str {
        self.name
    }

    fn settings(&self) -> &RouteSettings {
        &self.settings
    }

    fn handle(&self, mut request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut ctx = FilterContext::new();

            if let Err(err) = self.filters.apply_request_filters(&mut ctx, &mut request) {
                warn!(route = self.name, error = %err, "request filter aborted exchange");
                return Response::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FILTER_ABORTED",
                    &err.to_string(),
                );
            }

            let mut response = (self.handler)(&request).await;

            if let Err(err) = self
                .filters
                .apply_response_filters(&mut ctx, &request, &mut response)
            {
                warn!(route = self.name, error = %err, "response filter aborted exchange");
                return Response::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FILTER_ABORTED",
                    &err.to_string(),
                );
            }

            response
        })
    }
}

impl std::fmt::Debug for BaseRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseRoute")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

/// The stock default handler: answers every request with HTTP 404.
#[derive(Debug)]
pub struct NotFoundRoute {
    settings: RouteSettings,
}

impl NotFoundRoute {
    /// Creates a catch-all 404 route.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: RouteSettings::new(),
        }
    }
}

impl Default for NotFoundRoute {
    fn default() -> Self {
        Self::new()
    }
}

impl Route for NotFoundRoute {
    fn name(&self) -> &'static str {
        "not-found"
    }

    fn settings(&self) -> &RouteSettings {
        &self.settings
    }

    fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        let path = request.uri().path().to_string();
        Box::pin(async move {
            Response::json_error(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("No route matched {path}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hermes_filter::{FilterError, FnRequestFilter, FnResponseFilter};
    use http_body_util::{BodyExt, Full};

    fn request(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler(_req: &Request) -> BoxFuture<'_, Response> {
        Box::pin(async {
            http::Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("handled")))
                .unwrap()
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_base_route_runs_handler() {
        let route = BaseRoute::new("test", RouteSettings::new(), ok_handler);
        let response = route.handle(request("/anything")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "handled");
    }

    #[tokio::test]
    async fn test_can_handle_respects_pattern() {
        let settings = RouteSettings::with_path_pattern("/api/.*").unwrap();
        let route = BaseRoute::new("api", settings, ok_handler);

        assert!(route.can_handle(&request("/api/items"), false));
        assert!(!route.can_handle(&request("/other"), false));
    }

    #[tokio::test]
    async fn test_can_handle_respects_secure_port() {
        let settings = RouteSettings::new().require_secure_port(true);
        let route = BaseRoute::new("secure", settings, ok_handler);

        assert!(!route.can_handle(&request("/"), false));
        assert!(route.can_handle(&request("/"), true));
    }

    #[tokio::test]
    async fn test_request_filter_error_skips_handler() {
        let mut filters: FilterChain<Request, Response> = FilterChain::new();
        filters.add_request_filter(FnRequestFilter::new("deny", |_ctx: &mut FilterContext, _req: &mut Request| {
            Err(FilterError::aborted("deny", "always"))
        }));

        let route =
            BaseRoute::new("filtered", RouteSettings::new(), ok_handler).with_filters(filters);
        let response = route.handle(request("/")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("FILTER_ABORTED"));
        assert!(!body.contains("handled"));
    }

    #[tokio::test]
    async fn test_filters_wrap_handler() {
        let mut filters: FilterChain<Request, Response> = FilterChain::new();
        filters.add_request_filter(FnRequestFilter::new("tag", |_ctx: &mut FilterContext, req: &mut Request| {
            req.headers_mut()
                .insert("x-tag", http::HeaderValue::from_static("yes"));
            Ok(())
        }));
        filters.add_response_filter(FnResponseFilter::new(
            "stamp",
            |_ctx: &mut FilterContext, req: &Request, res: &mut Response| {
                // Response filters see the filtered request.
                assert_eq!(req.headers().get("x-tag").unwrap(), "yes");
                res.headers_mut()
                    .insert("x-stamped", http::HeaderValue::from_static("yes"));
                Ok(())
            },
        ));

        fn echo_tag(req: &Request) -> BoxFuture<'_, Response> {
            let tagged = req.headers().contains_key("x-tag");
            Box::pin(async move {
                http::Response::builder()
                    .status(if tagged { StatusCode::OK } else { StatusCode::BAD_REQUEST })
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })
        }

        let route = BaseRoute::new("wrap", RouteSettings::new(), echo_tag).with_filters(filters);
        let response = route.handle(request("/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-stamped").unwrap(), "yes");
    }

    #[tokio::test]
    async fn test_not_found_route() {
        let route = NotFoundRoute::new();
        assert!(route.can_handle(&request("/whatever"), false));

        let response = route.handle(request("/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("/missing"));
    }
}
