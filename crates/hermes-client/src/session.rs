//! The client session and its submit pipeline.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use hermes_core::EventListeners;
use hermes_filter::{FilterChain, FilterContext, RequestFilter, ResponseFilter};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::filters::{
    DefaultClientHeaders, ProxyRequestFilter, ProxyResponseFilter, RedirectDirective,
    RedirectResponseFilter,
};
use crate::progress::{Progress, ProgressStream, ProgressTicker};
use crate::request::{ClientRequest, ClientResponse};
use crate::settings::ClientSessionSettings;

/// Listener registries for session events.
#[derive(Debug, Default)]
pub struct ClientEvents {
    /// Upload progress for the request body.
    pub request_progress: EventListeners<Progress>,
    /// Download progress for the response body.
    pub response_progress: EventListeners<Progress>,
    /// Terminal pipeline errors. Every error returned by
    /// [`ClientSession::submit`] is announced here first.
    pub errors: EventListeners<ClientError>,
}

/// An HTTP client session with a filter pipeline.
///
/// The transport follows no redirects on its own; the session applies its
/// response filters, and when the redirect filter requests resubmission it
/// loops with its own budget. Exceeding the budget is
/// [`ClientError::RedirectLimitExceeded`].
pub struct ClientSession {
    settings: ClientSessionSettings,
    client: reqwest::Client,
    filters: FilterChain<ClientRequest, ClientResponse>,
    events: Arc<ClientEvents>,
}

impl ClientSession {
    /// Create a session with the standard filter pipeline.
    ///
    /// Request filters: default headers, then proxy credentials when a
    /// proxy is configured. Response filters: redirect, then proxy.
    pub fn new(settings: ClientSessionSettings) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(settings.timeout);

        if settings.keep_alive {
            builder = builder.pool_idle_timeout(settings.keep_alive_timeout);
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| ClientError::session(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::session(e.to_string()))?;

        let mut filters = FilterChain::new();
        filters.add_request_filter(DefaultClientHeaders::from_settings(&settings)?);
        if let Some(proxy) = &settings.proxy {
            if proxy.has_credentials() {
                filters.add_request_filter(ProxyRequestFilter::from_settings(proxy)?);
            }
        }
        filters.add_response_filter(RedirectResponseFilter::new());
        filters.add_response_filter(ProxyResponseFilter::from_settings(&settings));

        Ok(Self {
            settings,
            client,
            filters,
            events: Arc::new(ClientEvents::default()),
        })
    }

    /// The session settings.
    pub fn settings(&self) -> &ClientSessionSettings {
        &self.settings
    }

    /// The session's event registries.
    pub fn events(&self) -> &ClientEvents {
        &self.events
    }

    /// Append a request filter.
    pub fn add_request_filter<F>(&mut self, filter: F)
    where
        F: RequestFilter<ClientRequest> + 'static,
    {
        self.filters.add_request_filter(filter);
    }

    /// Append a response filter.
    pub fn add_response_filter<F>(&mut self, filter: F)
    where
        F: ResponseFilter<ClientRequest, ClientResponse> + 'static,
    {
        self.filters.add_response_filter(filter);
    }

    /// Submit a request through the pipeline and collect the response.
    ///
    /// Any terminal error fires the session's error event before it is
    /// returned.
    pub async fn submit(&self, request: ClientRequest) -> ClientResult<ClientResponse> {
        match self.run_pipeline(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                self.events.errors.notify(&error);
                Err(error)
            }
        }
    }

    async fn run_pipeline(&self, request: ClientRequest) -> ClientResult<ClientResponse> {
        let mut ctx = FilterContext::new();
        let mut current = request;
        let mut redirects = 0u32;

        loop {
            self.filters.apply_request_filters(&mut ctx, &mut current)?;
            let mut response = self.execute(&current).await?;
            self.filters
                .apply_response_filters(&mut ctx, &current, &mut response)?;

            let Some(directive) = ctx.remove_extension::<RedirectDirective>() else {
                return Ok(response);
            };
            if redirects >= self.settings.max_redirects {
                return Err(ClientError::redirect_limit_exceeded(
                    self.settings.max_redirects,
                ));
            }
            redirects += 1;
            debug!(redirects, target = %directive.url, "resubmitting after redirect");
            current = current.redirected_to(directive.url, directive.method);
        }
    }

    /// One transport round trip with progress-wrapped bodies.
    async fn execute(&self, request: &ClientRequest) -> ClientResult<ClientResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            let events = Arc::clone(&self.events);
            let upload = ProgressStream::new(
                futures_util::stream::iter([Ok::<Bytes, std::convert::Infallible>(body.clone())]),
                Some(body.len() as u64),
                self.ticker(),
                move |progress| events.request_progress.notify(&progress),
            );
            builder = builder.body(reqwest::Body::wrap_stream(upload));
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let total = response.content_length();

        let events = Arc::clone(&self.events);
        let mut download = ProgressStream::new(
            response.bytes_stream(),
            total,
            self.ticker(),
            move |progress| events.response_progress.notify(&progress),
        );

        let mut body = Vec::new();
        while let Some(chunk) = download.next().await {
            let chunk = chunk.map_err(|e| ClientError::body(e.to_string()))?;
            body.extend_from_slice(&chunk);
        }

        Ok(ClientResponse {
            status,
            headers,
            url,
            body: Bytes::from(body),
        })
    }

    fn ticker(&self) -> ProgressTicker {
        ProgressTicker::new(
            self.settings.bytes_per_update,
            self.settings.max_update_interval,
        )
    }
}
