//! Scoped resource handling.
//!
//! A [`ScopeGuard`] pairs a value with an exit action that runs exactly once
//! when the guard goes out of scope, whichever way the scope is left: normal
//! return, early return, `?` propagation or unwinding.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Owns a value and runs an exit action on it when dropped.
pub struct ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    /// The guarded value.
    value: T,
    /// Exit action, `None` once disarmed.
    on_exit: Option<F>,
}

impl<T, F> ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    /// Create a guard around `value`.
    ///
    /// # Arguments
    /// * `value` - The value the scope works with
    /// * `on_exit` - Action run with the value when the guard is dropped
    pub fn new(value: T, on_exit: F) -> Self {
        Self { value, on_exit: Some(on_exit) }
    }

    /// Cancel the exit action. The value is still dropped normally.
    pub fn disarm(&mut self) {
        self.on_exit = None;
    }

    /// Whether the exit action is still pending.
    pub fn is_armed(&self) -> bool {
        self.on_exit.is_some()
    }
}

impl<T, F> Deref for ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, F> DerefMut for ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T, F> Drop for ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(&mut self.value);
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("value", &self.value)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Guard `value`, running `on_exit` with it when the guard is dropped.
pub fn guard<T, F>(value: T, on_exit: F) -> ScopeGuard<T, F>
where
    F: FnOnce(&mut T),
{
    ScopeGuard::new(value, on_exit)
}

/// Run `on_exit` when the returned guard is dropped.
///
/// ```
/// use memopool_core::scope::defer;
///
/// let mut log = Vec::new();
/// {
///     let _exit = defer(|| log.push("exit"));
/// }
/// assert_eq!(log, vec!["exit"]);
/// ```
pub fn defer<F>(on_exit: F) -> ScopeGuard<(), impl FnOnce(&mut ())>
where
    F: FnOnce(),
{
    ScopeGuard::new((), move |_: &mut ()| on_exit())
}

/// Run `body` with `value`, then `on_exit`, even if `body` panics.
///
/// This is the block form of [`guard`]: acquisition happens before the call,
/// release is tied to the end of `body`.
pub fn scoped<T, R, E, B>(value: T, on_exit: E, body: B) -> R
where
    E: FnOnce(&mut T),
    B: FnOnce(&mut T) -> R,
{
    let mut guarded = ScopeGuard::new(value, on_exit);
    body(&mut *guarded)
}
