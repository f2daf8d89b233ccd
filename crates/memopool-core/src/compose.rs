//! Higher-order composition helpers.
//!
//! Cross-cutting "before/after" behaviour is expressed as ordinary function
//! composition: a [`Hook`] is wrapped [`around`] a function, and hooks stack
//! into a middleware chain by nesting them in tuples.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, info_span};

use crate::scope::defer;

/// Behaviour run before and after a wrapped call.
pub trait Hook {
    /// Called before the wrapped function runs.
    fn before(&self) {}

    /// Called after the wrapped function returns or unwinds.
    fn after(&self) {}
}

impl<H: Hook + ?Sized> Hook for &H {
    fn before(&self) {
        (**self).before();
    }

    fn after(&self) {
        (**self).after();
    }
}

/// Two hooks chained: `A` is the outer layer.
impl<A: Hook, B: Hook> Hook for (A, B) {
    fn before(&self) {
        self.0.before();
        self.1.before();
    }

    fn after(&self) {
        self.1.after();
        self.0.after();
    }
}

/// Hook built from a pair of closures.
#[derive(Debug, Clone, Copy)]
pub struct FnHook<B, A> {
    before: B,
    after: A,
}

impl<B: Fn(), A: Fn()> Hook for FnHook<B, A> {
    fn before(&self) {
        (self.before)();
    }

    fn after(&self) {
        (self.after)();
    }
}

/// Build a [`Hook`] from `before` and `after` closures.
pub fn hook_fn<B: Fn(), A: Fn()>(before: B, after: A) -> FnHook<B, A> {
    FnHook { before, after }
}

/// Wrap `f` so that `hook` runs around every call.
///
/// `after` runs on every exit path, including when `f` panics.
///
/// ```
/// use memopool_core::compose::{around, hook_fn};
/// use std::cell::RefCell;
///
/// let log = RefCell::new(Vec::new());
/// let hook = hook_fn(|| log.borrow_mut().push("in"), || log.borrow_mut().push("out"));
/// let double = around(&hook, |x: i32| x * 2);
/// assert_eq!(double(4), 8);
/// assert_eq!(*log.borrow(), vec!["in", "out"]);
/// ```
pub fn around<A, R, H, F>(hook: H, f: F) -> impl Fn(A) -> R
where
    H: Hook,
    F: Fn(A) -> R,
{
    move |arg: A| {
        hook.before();
        let _after = defer(|| hook.after());
        f(arg)
    }
}

/// Hook that emits tracing events around a call.
#[derive(Debug, Clone, Copy)]
pub struct TraceHook {
    label: &'static str,
}

impl TraceHook {
    /// Create a trace hook with the given label.
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Hook for TraceHook {
    fn before(&self) {
        debug!(label = self.label, "enter");
    }

    fn after(&self) {
        debug!(label = self.label, "exit");
    }
}

/// Wrap `f` in a tracing span named after `label`.
pub fn traced<A, R, F>(label: &'static str, f: F) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    let inner = around(TraceHook::new(label), f);
    move |arg: A| {
        let span = info_span!("call", label);
        let _enter = span.enter();
        inner(arg)
    }
}

/// Run `f` once and measure how long it took.
pub fn timed<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

/// Await `future` and measure how long it took.
pub async fn timed_async<Fut: Future>(future: Fut) -> (Fut::Output, Duration) {
    let start = Instant::now();
    let out = future.await;
    (out, start.elapsed())
}
