//! Values that are either fixed at declaration time or computed on demand.

use std::fmt;
use std::sync::Arc;

/// A declared value or a zero-argument function producing one.
///
/// Record types use this for defaults, URL roots and validation messages,
/// all of which may be given literally or computed every time they are read.
pub enum Provider<T> {
    Value(T),
    Thunk(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Provider<T> {
    /// Wrap a closure.
    pub fn thunk(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Provider::Thunk(Arc::new(f))
    }

    /// Produce the current value.
    pub fn resolve(&self) -> T {
        match self {
            Provider::Value(value) => value.clone(),
            Provider::Thunk(f) => f(),
        }
    }
}

impl<T> Clone for Provider<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Provider::Value(value) => Provider::Value(value.clone()),
            Provider::Thunk(f) => Provider::Thunk(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Provider::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

impl From<&str> for Provider<String> {
    fn from(value: &str) -> Self {
        Provider::Value(value.to_string())
    }
}

impl From<String> for Provider<String> {
    fn from(value: String) -> Self {
        Provider::Value(value)
    }
}

impl From<crate::Fields> for Provider<crate::Fields> {
    fn from(value: crate::Fields) -> Self {
        Provider::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn value_resolves_to_itself() {
        let provider: Provider<String> = "/users".into();
        assert_eq!(provider.resolve(), "/users");
    }

    #[test]
    fn thunk_is_evaluated_on_every_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = Provider::thunk(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        });

        assert_eq!(provider.resolve(), "computed");
        assert_eq!(provider.resolve(), "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_hides_closure() {
        let provider: Provider<String> = Provider::thunk(String::new);
        assert_eq!(format!("{:?}", provider), "Thunk(..)");
    }
}
