use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ValueError;
use crate::value::{Injector, Value};

/// An injection slot: filled by the container when the source dependency starts,
/// cleared when this service stops.
///
/// It is both an [`Injector<T>`] (the container writes into it) and a
/// [`Value<T>`] (the service reads from it).
///
/// # Example
/// ```
/// use servicevisor::{InjectedValue, Injector, Value, ValueError};
///
/// let slot = InjectedValue::<String>::new();
/// assert_eq!(slot.get().unwrap_err(), ValueError::Uninjected);
///
/// slot.inject("jdbc:pg".to_string()).unwrap();
/// assert_eq!(slot.get().unwrap(), "jdbc:pg");
///
/// slot.uninject();
/// assert!(slot.get().is_err());
/// ```
#[derive(Debug)]
pub struct InjectedValue<T> {
    slot: RwLock<Option<T>>,
}

impl<T> InjectedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Creates an empty slot as a shared handle.
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the current content without failing.
    pub fn get_optional(&self) -> Option<T> {
        self.slot.read().clone()
    }
}

impl<T> Default for InjectedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Value<T> for InjectedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> Result<T, ValueError> {
        self.slot.read().clone().ok_or(ValueError::Uninjected)
    }
}

impl<T> Injector<T> for InjectedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn inject(&self, value: T) -> Result<(), ValueError> {
        *self.slot.write() = Some(value);
        Ok(())
    }

    fn uninject(&self) {
        self.slot.write().take();
    }
}
