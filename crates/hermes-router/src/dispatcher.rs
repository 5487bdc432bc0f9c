//! First-match-wins request dispatch.

use crate::error::{DispatchError, DispatchResult};
use crate::route::Route;
use hermes_core::{Request, Response};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// An ordered collection of routes with a mandatory default handler.
///
/// Dispatch probes routes strictly in registration order and the first
/// route whose [`Route::can_handle`] accepts the request takes it. Requests
/// no route accepts go to the default handler, which accepts everything.
///
/// The route list may change at runtime; a dispatch in flight keeps the
/// route it already selected.
pub struct Dispatcher {
    routes: RwLock<Vec<Arc<dyn Route>>>,
    default_handler: Arc<dyn Route>,
}

impl Dispatcher {
    /// Starts building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Appends a route at the end of the probe order.
    pub fn add_route(&self, route: Arc<dyn Route>) {
        debug!(route = route.name(), "route added");
        self.routes.write().push(route);
    }

    /// Removes and returns the route at `index`, if it exists.
    ///
    /// Later routes shift up; their relative order is unchanged.
    pub fn remove_route(&self, index: usize) -> Option<Arc<dyn Route>> {
        let mut routes = self.routes.write();
        if index < routes.len() {
            let route = routes.remove(index);
            debug!(route = route.name(), "route removed");
            Some(route)
        } else {
            None
        }
    }

    /// Number of registered routes, excluding the default handler.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Selects the route for a request without handling it.
    ///
    /// Returns the default handler when nothing matches.
    #[must_use]
    pub fn select(&self, request: &Request, is_secure_port: bool) -> Arc<dyn Route> {
        let routes = self.routes.read();
        for route in routes.iter() {
            if route.can_handle(request, is_secure_port) {
                return Arc::clone(route);
            }
        }
        Arc::clone(&self.default_handler)
    }

    /// Dispatches a request to the first matching route.
    pub async fn dispatch(&self, request: Request, is_secure_port: bool) -> Response {
        let route = self.select(&request, is_secure_port);
        debug!(
            route = route.name(),
            path = request.uri().path(),
            "dispatching request"
        );
        route.handle(request).await
    }

    /// Stops every route, then the default handler.
    ///
    /// Routes are stopped in registration order.
    pub async fn stop(&self) {
        let routes: Vec<Arc<dyn Route>> = self.routes.read().iter().map(Arc::clone).collect();
        for route in routes {
            info!(route = route.name(), "stopping route");
            route.stop().await;
        }
        self.default_handler.stop().await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.route_count())
            .field("default_handler", &self.default_handler.name())
            .finish()
    }
}

/// Builder for [`Dispatcher`].
///
/// Building fails with [`DispatchError::MissingDefaultHandler`] when no
/// default handler was supplied. There is deliberately no implicit
/// fallback; pass [`NotFoundRoute`](crate::NotFoundRoute) to get the stock
/// 404 behavior.
#[must_use]
pub struct DispatcherBuilder {
    routes: Vec<Arc<dyn Route>>,
    default_handler: Option<Arc<dyn Route>>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            default_handler: None,
        }
    }

    /// Appends a route. Order of addition is probe order.
    pub fn route<R>(mut self, route: R) -> Self
    where
        R: Route + 'static,
    {
        self.routes.push(Arc::new(route));
        self
    }

    /// Appends an already-shared route.
    pub fn route_arc(mut self, route: Arc<dyn Route>) -> Self {
        self.routes.push(route);
        self
    }

    /// Sets the handler for requests no route accepts.
    pub fn default_handler<R>(mut self, route: R) -> Self
    where
        R: Route + 'static,
    {
        self.default_handler = Some(Arc::new(route));
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> DispatchResult<Dispatcher> {
        let default_handler = self
            .default_handler
            .ok_or(DispatchError::MissingDefaultHandler)?;
        Ok(Dispatcher {
            routes: RwLock::new(self.routes),
            default_handler,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
