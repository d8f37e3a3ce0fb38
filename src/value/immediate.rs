use std::sync::Arc;

use crate::error::ValueError;
use crate::value::Value;

/// A value wrapping a constant; `get` returns a clone.
///
/// # Example
/// ```
/// use servicevisor::{ImmediateValue, Value};
///
/// let v = ImmediateValue::new(42u32);
/// assert_eq!(v.get().unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct ImmediateValue<T> {
    value: T,
}

impl<T> ImmediateValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps `value`.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Wraps `value` and returns it as a shared handle.
    pub fn arc(value: T) -> Arc<Self> {
        Arc::new(Self::new(value))
    }
}

impl<T> Value<T> for ImmediateValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> Result<T, ValueError> {
        Ok(self.value.clone())
    }
}
