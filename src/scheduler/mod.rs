//! Scheduler primitives: injectable wrappers over idle callbacks, timeouts,
//! and DOM-event listener registration, each returning a disposer.
//!
//! Production code is expected to supply a [`Clock`] and [`EventSource`]
//! backed by real platform globals; tests use [`fake::FakeClock`] and
//! [`fake::FakeEventSource`] instead, so trigger logic never depends on
//! wall-clock time or a real DOM.

pub mod dom_event;
pub mod fake;
pub mod idle;
pub mod timer;

use crate::diagnostics::DeferError;

pub use dom_event::{AnchorId, DomEvent, EventSource};

/// Releases whatever resource it was returned for. Idempotent in spirit —
/// callers (the cleanup registry) are responsible for only invoking it
/// once, but a disposer that's accidentally run twice should be harmless
/// where possible.
pub type Disposer = Box<dyn FnOnce() -> Result<(), DeferError>>;

/// A disposer that does nothing. Used where a trigger or resource has
/// nothing to release (e.g. an `immediate` trigger, which fires and is done).
pub fn noop_disposer() -> Disposer {
    Box::new(|| Ok(()))
}

/// Injectable source of idle callbacks and timeouts.
///
/// Every callback delivered through a `Clock` is expected to run on the
/// single UI task loop — there is no cross-thread delivery here.
pub trait Clock {
    /// Arms a one-shot idle callback, returning a disposer that cancels it
    /// if called before it fires.
    fn request_idle(&self, callback: Box<dyn FnOnce()>) -> Disposer;

    /// Arms a one-shot timeout, returning a disposer that cancels it if
    /// called before it fires.
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Disposer;
}
