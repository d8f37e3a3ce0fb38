use std::fmt;
use std::sync::Arc;

use crate::error::ValueError;
use crate::value::{Value, ValueRef};

type MapFn<S, T> = dyn Fn(S) -> Result<T, ValueError> + Send + Sync;

/// A value computed from another value at `get` time.
///
/// Used to adapt what a dependency produces into what an injector expects.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use servicevisor::{ComposedValue, ImmediateValue, Value, ValueRef};
///
/// let port: ValueRef<u16> = ImmediateValue::arc(8080);
/// let url = ComposedValue::new(port, |p| Ok(format!("http://localhost:{p}")));
/// assert_eq!(url.get().unwrap(), "http://localhost:8080");
/// ```
pub struct ComposedValue<S, T> {
    source: ValueRef<S>,
    map: Box<MapFn<S, T>>,
}

impl<S, T> ComposedValue<S, T>
where
    S: 'static,
    T: 'static,
{
    /// Composes `source` with `map`.
    pub fn new<F>(source: ValueRef<S>, map: F) -> Self
    where
        F: Fn(S) -> Result<T, ValueError> + Send + Sync + 'static,
    {
        Self {
            source,
            map: Box::new(map),
        }
    }

    /// Composes and returns a shared handle.
    pub fn arc<F>(source: ValueRef<S>, map: F) -> Arc<Self>
    where
        F: Fn(S) -> Result<T, ValueError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(source, map))
    }
}

impl<S, T> Value<T> for ComposedValue<S, T>
where
    S: 'static,
    T: 'static,
{
    fn get(&self) -> Result<T, ValueError> {
        (self.map)(self.source.get()?)
    }
}

impl<S, T> fmt::Debug for ComposedValue<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedValue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ImmediateValue, InjectedValue};

    #[test]
    fn source_error_short_circuits() {
        let slot = InjectedValue::<u32>::arc();
        let source: ValueRef<u32> = slot.clone();
        let doubled = ComposedValue::new(source, |v| Ok(v * 2));
        assert_eq!(doubled.get().unwrap_err(), ValueError::Uninjected);

        use crate::value::Injector;
        slot.inject(21).unwrap();
        assert_eq!(doubled.get().unwrap(), 42);
    }

    #[test]
    fn map_error_is_returned() {
        let source: ValueRef<&'static str> = ImmediateValue::arc("not-a-number");
        let parsed = ComposedValue::new(source, |s: &str| {
            s.parse::<u16>().map_err(|e| ValueError::failed(e.to_string()))
        });
        assert!(matches!(parsed.get(), Err(ValueError::Failed(_))));
    }
}
