//! Filter traits and function adapters.
//!
//! Filters mutate a message in place. They are synchronous: a filter that
//! needs I/O records its intent in the [`FilterContext`] and lets the owner
//! of the chain act on it (the redirect filter works this way).

use crate::context::FilterContext;
use crate::error::FilterResult;

/// A filter applied to outgoing or incoming requests before handling.
///
/// Request filters run in registration order. Returning an error aborts the
/// remainder of the request-filter list.
pub trait RequestFilter<R>: Send + Sync {
    /// Returns the name of this filter, used for logging.
    fn name(&self) -> &'static str;

    /// Mutates the request in place.
    fn filter(&self, ctx: &mut FilterContext, request: &mut R) -> FilterResult<()>;
}

/// A filter applied to responses after handling.
///
/// Response filters also run in registration order. They see the request
/// that produced the response, read-only.
pub trait ResponseFilter<R, S>: Send + Sync {
    /// Returns the name of this filter, used for logging.
    fn name(&self) -> &'static str;

    /// Mutates the response in place.
    fn filter(&self, ctx: &mut FilterContext, request: &R, response: &mut S) -> FilterResult<()>;
}

/// A request filter built from a closure.
///
/// # Example
///
/// ```ignore
/// let filter = FnRequestFilter::new("add-header", |_ctx: &mut FilterContext, req: &mut Request| {
///     req.headers_mut().insert("X-Tag", HeaderValue::from_static("1"));
///     Ok(())
/// });
/// ```
pub struct FnRequestFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnRequestFilter<F> {
    /// Creates a new function-based request filter.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<R, F> RequestFilter<R> for FnRequestFilter<F>
where
    F: Fn(&mut FilterContext, &mut R) -> FilterResult<()> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn filter(&self, ctx: &mut FilterContext, request: &mut R) -> FilterResult<()> {
        (self.func)(ctx, request)
    }
}

/// A response filter built from a closure.
pub struct FnResponseFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnResponseFilter<F> {
    /// Creates a new function-based response filter.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<R, S, F> ResponseFilter<R, S> for FnResponseFilter<F>
where
    F: Fn(&mut FilterContext, &R, &mut S) -> FilterResult<()> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn filter(&self, ctx: &mut FilterContext, request: &R, response: &mut S) -> FilterResult<()> {
        (self.func)(ctx, request, response)
    }
}
