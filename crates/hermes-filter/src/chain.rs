//! Ordered filter chains.

use crate::context::FilterContext;
use crate::error::FilterResult;
use crate::filter::{RequestFilter, ResponseFilter};
use std::sync::Arc;
use tracing::debug;

/// An ordered pair of filter lists for one route or session.
///
/// Request filters and response filters are independent lists. Both run in
/// registration order; response filters are NOT run in reverse. The first
/// filter that returns an error aborts the remainder of its list and the
/// error propagates to the caller.
pub struct FilterChain<Req, Res> {
    request_filters: Vec<Arc<dyn RequestFilter<Req>>>,
    response_filters: Vec<Arc<dyn ResponseFilter<Req, Res>>>,
}

impl<Req, Res> FilterChain<Req, Res> {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_filters: Vec::new(),
            response_filters: Vec::new(),
        }
    }

    /// Appends a request filter. Order of addition is order of execution.
    pub fn add_request_filter<F>(&mut self, filter: F)
    where
        F: RequestFilter<Req> + 'static,
    {
        self.request_filters.push(Arc::new(filter));
    }

    /// Appends an already-shared request filter.
    pub fn add_request_filter_arc(&mut self, filter: Arc<dyn RequestFilter<Req>>) {
        self.request_filters.push(filter);
    }

    /// Appends a response filter. Order of addition is order of execution.
    pub fn add_response_filter<F>(&mut self, filter: F)
    where
        F: ResponseFilter<Req, Res> + 'static,
    {
        self.response_filters.push(Arc::new(filter));
    }

    /// Appends an already-shared response filter.
    pub fn add_response_filter_arc(&mut self, filter: Arc<dyn ResponseFilter<Req, Res>>) {
        self.response_filters.push(filter);
    }

    /// Builder-style variant of [`add_request_filter`](Self::add_request_filter).
    #[must_use]
    pub fn with_request_filter<F>(mut self, filter: F) -> Self
    where
        F: RequestFilter<Req> + 'static,
    {
        self.add_request_filter(filter);
        self
    }

    /// Builder-style variant of [`add_response_filter`](Self::add_response_filter).
    #[must_use]
    pub fn with_response_filter<F>(mut self, filter: F) -> Self
    where
        F: ResponseFilter<Req, Res> + 'static,
    {
        self.add_response_filter(filter);
        self
    }

    /// Runs every request filter, in registration order.
    ///
    /// Stops at the first error and returns it; later filters do not run.
    pub fn apply_request_filters(
        &self,
        ctx: &mut FilterContext,
        request: &mut Req,
    ) -> FilterResult<()> {
        for filter in &self.request_filters {
            if let Err(err) = filter.filter(ctx, request) {
                debug!(filter = filter.name(), error = %err, "request filter aborted chain");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Runs every response filter, in registration order.
    ///
    /// Stops at the first error and returns it; later filters do not run.
    pub fn apply_response_filters(
        &self,
        ctx: &mut FilterContext,
        request: &Req,
        response: &mut Res,
    ) -> FilterResult<()> {
        for filter in &self.response_filters {
            if let Err(err) = filter.filter(ctx, request, response) {
                debug!(filter = filter.name(), error = %err, "response filter aborted chain");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Number of registered request filters.
    #[must_use]
    pub fn request_filter_count(&self) -> usize {
        self.request_filters.len()
    }

    /// Number of registered response filters.
    #[must_use]
    pub fn response_filter_count(&self) -> usize {
        self.response_filters.len()
    }
}

impl<Req, Res> Default for FilterChain<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> std::fmt::Debug for FilterChain<Req, Res> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("request_filters", &self.request_filters.len())
            .field("response_filters", &self.response_filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::filter::{FnRequestFilter, FnResponseFilter};

    fn push_filter(tag: &'static str) -> FnRequestFilter<impl Fn(&mut FilterContext, &mut Vec<&'static str>) -> FilterResult<()>>
    {
        FnRequestFilter::new(tag, move |_ctx: &mut FilterContext, log: &mut Vec<&'static str>| {
            log.push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_request_filters_run_in_registration_order() {
        let mut chain: FilterChain<Vec<&'static str>, ()> = FilterChain::new();
        chain.add_request_filter(push_filter("a"));
        chain.add_request_filter(push_filter("b"));
        chain.add_request_filter(push_filter("c"));

        let mut ctx = FilterContext::new();
        let mut log = Vec::new();
        chain.apply_request_filters(&mut ctx, &mut log).unwrap();

        assert_eq!(log, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_response_filters_run_in_registration_order_not_reversed() {
        let mut chain: FilterChain<(), Vec<&'static str>> = FilterChain::new();
        for tag in ["first", "second", "third"] {
            chain.add_response_filter(FnResponseFilter::new(
                tag,
                move |_ctx: &mut FilterContext, (): &(), log: &mut Vec<&'static str>| {
                    log.push(tag);
                    Ok(())
                },
            ));
        }

        let mut ctx = FilterContext::new();
        let mut log = Vec::new();
        chain.apply_response_filters(&mut ctx, &(), &mut log).unwrap();

        assert_eq!(log, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_error_aborts_remaining_filters() {
        let mut chain: FilterChain<Vec<&'static str>, ()> = FilterChain::new();
        chain.add_request_filter(push_filter("ran"));
        chain.add_request_filter(FnRequestFilter::new(
            "boom",
            |_ctx: &mut FilterContext, _log: &mut Vec<&'static str>| Err(FilterError::aborted("boom", "nope")),
        ));
        chain.add_request_filter(push_filter("never"));

        let mut ctx = FilterContext::new();
        let mut log = Vec::new();
        let result = chain.apply_request_filters(&mut ctx, &mut log);

        assert!(matches!(result, Err(FilterError::Aborted { .. })));
        assert_eq!(log, vec!["ran"]);
    }

    #[test]
    fn test_empty_chain_is_a_no_op() {
        let chain: FilterChain<u32, u32> = FilterChain::new();
        let mut ctx = FilterContext::new();
        let mut request = 1;
        let mut response = 2;

        chain.apply_request_filters(&mut ctx, &mut request).unwrap();
        chain
            .apply_response_filters(&mut ctx, &request, &mut response)
            .unwrap();

        assert_eq!((request, response), (1, 2));
        assert_eq!(chain.request_filter_count(), 0);
        assert_eq!(chain.response_filter_count(), 0);
    }

    #[test]
    fn test_filters_share_context_state() {
        #[derive(Clone)]
        struct Seen(u32);

        let mut chain: FilterChain<(), ()> = FilterChain::new();
        chain.add_request_filter(FnRequestFilter::new("write", |ctx: &mut FilterContext, (): &mut ()| {
            ctx.set_extension(Seen(7));
            Ok(())
        }));
        chain.add_response_filter(FnResponseFilter::new(
            "read",
            |ctx: &mut FilterContext, (): &(), (): &mut ()| {
                let seen = ctx
                    .get_extension::<Seen>()
                    .ok_or_else(|| FilterError::missing_state("Seen"))?;
                assert_eq!(seen.0, 7);
                Ok(())
            },
        ));

        let mut ctx = FilterContext::new();
        chain.apply_request_filters(&mut ctx, &mut ()).unwrap();
        chain.apply_response_filters(&mut ctx, &(), &mut ()).unwrap();
    }
}
