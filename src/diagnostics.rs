//! Error kinds and the sink they're reported through.
//!
//! Per the instance API contract, a `DeferError` never escapes as a
//! `Result` from the public surface — it is handed to whatever
//! [`Diagnostics`] sink is current, and the instance recovers locally.

use std::{cell::RefCell, rc::Rc};

use floem_reactive::{provide_context, use_context};
use thiserror::Error;

use crate::environment::Environment;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeferError {
    #[error("dependency loader rejected: {reason}")]
    LoaderRejected { reason: String },

    #[error("trigger anchor could not be resolved")]
    UnresolvedTrigger,

    #[error("cleanup disposer failed: {reason}")]
    DisposerFailed { reason: String },

    #[error("illegal transition attempted from a terminal state")]
    IllegalTransition,
}

/// Receives diagnostics emitted by a defer instance.
///
/// Installed through [`floem_reactive`]'s context mechanism so a host
/// application can swap in its own sink (or a recording double in tests)
/// without threading a parameter through every constructor.
pub trait Diagnostics {
    fn record(&self, error: DeferError);
}

/// The default sink: routes every diagnostic through `tracing`, logging at
/// a severity appropriate to the error kind and the current [`Environment`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, error: DeferError) {
        match &error {
            DeferError::LoaderRejected { .. } => {
                tracing::error!(error = %error, "dependency load failed");
            }
            DeferError::UnresolvedTrigger => {
                tracing::warn!(error = %error, "trigger anchor unresolved, trigger is inert");
            }
            DeferError::DisposerFailed { .. } => {
                tracing::warn!(error = %error, "disposer failed during cleanup");
            }
            DeferError::IllegalTransition => {
                if Environment::current() == Environment::Development {
                    tracing::warn!(error = %error, "illegal state transition ignored");
                } else {
                    tracing::trace!(error = %error, "illegal state transition ignored");
                }
            }
        }
    }
}

/// A test double that collects every diagnostic it receives, so assertions
/// can inspect what an instance reported instead of scraping logs.
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    events: Rc<RefCell<Vec<DeferError>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeferError> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, error: DeferError) {
        self.events.borrow_mut().push(error);
    }
}

/// Installs `sink` as the diagnostics handler for the current scope and its
/// descendants.
pub fn provide_diagnostics(sink: impl Diagnostics + Clone + 'static) {
    provide_context(Rc::new(sink) as Rc<dyn Diagnostics>);
}

/// Reports `error` to whatever diagnostics sink is current, falling back to
/// [`TracingDiagnostics`] if none was installed.
pub fn report(error: DeferError) {
    match use_context::<Rc<dyn Diagnostics>>() {
        Some(sink) => sink.record(error),
        None => TracingDiagnostics.record(error),
    }
}
