//! Filter context.
//!
//! A [`FilterContext`] is created once per HTTP exchange and handed to every
//! filter in the chain. Filters use it to pass typed state forward, for
//! example a redirect filter recording where the session should resubmit.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// State shared between the filters of one exchange.
///
/// The context is mutable while filters run. Type-erased extensions let a
/// request filter leave data for a response filter (or for the session that
/// owns the chain) without the chain knowing the concrete types involved.
///
/// # Example
///
/// ```
/// use hermes_filter::FilterContext;
///
/// #[derive(Clone)]
/// struct AttemptCount(u32);
///
/// let mut ctx = FilterContext::new();
/// ctx.set_extension(AttemptCount(1));
///
/// let attempts = ctx.get_extension::<AttemptCount>().unwrap();
/// assert_eq!(attempts.0, 1);
/// ```
#[derive(Debug)]
pub struct FilterContext {
    /// When the exchange started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl FilterContext {
    /// Creates a new context for one exchange.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns when the exchange started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the exchange started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    ///
    /// Returns `None` if no extension of the given type was stored.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct Marker {
            value: i32,
        }

        let mut ctx = FilterContext::new();

        assert!(!ctx.has_extension::<Marker>());
        assert!(ctx.get_extension::<Marker>().is_none());

        ctx.set_extension(Marker { value: 42 });
        assert!(ctx.has_extension::<Marker>());
        assert_eq!(ctx.get_extension::<Marker>(), Some(&Marker { value: 42 }));

        let removed = ctx.remove_extension::<Marker>();
        assert_eq!(removed, Some(Marker { value: 42 }));
        assert!(!ctx.has_extension::<Marker>());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = FilterContext::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed() >= std::time::Duration::from_millis(10));
    }
}
