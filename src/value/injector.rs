use std::fmt;
use std::sync::Arc;

use crate::error::{StartError, ValueError};
use crate::value::ValueRef;

/// Receiving end of an injection.
///
/// `inject` runs on the executor right before the owning service's `start`;
/// `uninject` runs right after its `stop`.
pub trait Injector<T>: Send + Sync + 'static {
    /// Stores `value`.
    fn inject(&self, value: T) -> Result<(), ValueError>;

    /// Clears whatever `inject` stored.
    fn uninject(&self);
}

/// Shared handle to an injector.
pub type InjectorRef<T> = Arc<dyn Injector<T>>;

type SetFn<T> = dyn Fn(Option<T>) -> Result<(), ValueError> + Send + Sync;

/// Closure-backed injector.
///
/// The closure receives `Some(value)` on inject and `None` on uninject.
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use servicevisor::{Injector, SetterInjector};
///
/// let target = Arc::new(Mutex::new(None::<u16>));
/// let t = target.clone();
/// let setter = SetterInjector::new(move |v: Option<u16>| {
///     *t.lock().unwrap() = v;
///     Ok(())
/// });
///
/// setter.inject(5432).unwrap();
/// assert_eq!(*target.lock().unwrap(), Some(5432));
/// setter.uninject();
/// assert_eq!(*target.lock().unwrap(), None);
/// ```
pub struct SetterInjector<T> {
    set: Box<SetFn<T>>,
}

impl<T: 'static> SetterInjector<T> {
    /// Wraps a setter closure.
    pub fn new<F>(set: F) -> Self
    where
        F: Fn(Option<T>) -> Result<(), ValueError> + Send + Sync + 'static,
    {
        Self { set: Box::new(set) }
    }

    /// Wraps a setter closure and returns a shared handle.
    pub fn arc<F>(set: F) -> Arc<Self>
    where
        F: Fn(Option<T>) -> Result<(), ValueError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(set))
    }
}

impl<T: 'static> Injector<T> for SetterInjector<T> {
    fn inject(&self, value: T) -> Result<(), ValueError> {
        (self.set)(Some(value))
    }

    fn uninject(&self) {
        if let Err(e) = (self.set)(None) {
            tracing::warn!(error = %e, "setter injector failed to uninject");
        }
    }
}

impl<T> fmt::Debug for SetterInjector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterInjector").finish_non_exhaustive()
    }
}

/// Type-erased (source, target) pair stored on a controller.
pub(crate) trait Injection: Send + Sync {
    fn inject(&self) -> Result<(), StartError>;
    fn uninject(&self);
}

pub(crate) struct ValueInjection<T> {
    source: ValueRef<T>,
    target: InjectorRef<T>,
}

impl<T: 'static> ValueInjection<T> {
    pub(crate) fn boxed(source: ValueRef<T>, target: InjectorRef<T>) -> Box<dyn Injection> {
        Box::new(Self { source, target })
    }
}

impl<T: 'static> Injection for ValueInjection<T> {
    fn inject(&self) -> Result<(), StartError> {
        let value = self.source.get()?;
        self.target.inject(value)?;
        Ok(())
    }

    fn uninject(&self) {
        self.target.uninject();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ImmediateValue, InjectedValue, Value};

    #[test]
    fn value_injection_moves_source_into_target() {
        let slot = InjectedValue::<String>::arc();
        let injection = ValueInjection::<String>::boxed(
            ImmediateValue::arc("db".to_string()),
            slot.clone() as InjectorRef<String>,
        );

        injection.inject().unwrap();
        assert_eq!(slot.get().unwrap(), "db");

        injection.uninject();
        assert!(slot.get_optional().is_none());
    }

    #[test]
    fn failing_source_becomes_start_error() {
        let empty = InjectedValue::<u8>::arc();
        let target = InjectedValue::<u8>::arc();
        let injection =
            ValueInjection::<u8>::boxed(empty as ValueRef<u8>, target as InjectorRef<u8>);

        let err = injection.inject().unwrap_err();
        assert!(matches!(err, StartError::Value(ValueError::Uninjected)));
    }
}
