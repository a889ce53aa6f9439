//! The per-instance cleanup registry (§4.H): an append-only list of
//! disposers run in reverse (LIFO) order when an instance is destroyed, so
//! resources are torn down in the opposite order they were acquired.
//!
//! A disposer that fails is logged and skipped; it never stops the rest of
//! the sequence from running, since a leaked listener is better than a
//! second resource never getting torn down because an earlier one panicked.

use std::{cell::RefCell, rc::Rc};

use crate::{diagnostics::report, scheduler::Disposer};

#[derive(Default)]
pub struct CleanupRegistry {
    disposers: RefCell<Vec<Disposer>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a disposer to run on [`CleanupRegistry::run`]. Order of
    /// registration determines the reverse order of execution.
    pub fn register(&self, disposer: Disposer) {
        self.disposers.borrow_mut().push(disposer);
    }

    pub fn len(&self) -> usize {
        self.disposers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.disposers.borrow().is_empty()
    }

    /// Runs every registered disposer in LIFO order, clearing the registry.
    /// Idempotent: calling this again afterward runs nothing.
    pub fn run(&self) {
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        let count = disposers.len();
        tracing::trace!(count, "running cleanup registry");
        for disposer in disposers.into_iter().rev() {
            if let Err(error) = disposer() {
                report(error);
            }
        }
    }
}

/// A disposer that can be released either eagerly, on its own, or as part
/// of an instance's full teardown — whichever happens first — without ever
/// running twice (§4.B: a DOM listener is removed "when the block loads,
/// when the trigger is destroyed, or when the enclosing view ... is
/// destroyed, whichever happens first").
///
/// `new` splits a raw disposer into this handle and a second disposer meant
/// for registration with a [`CleanupRegistry`]; both share one slot, so
/// whichever runs first empties it and the other becomes a no-op.
pub(crate) struct TriggerDisposer {
    slot: Rc<RefCell<Option<Disposer>>>,
}

impl TriggerDisposer {
    pub fn new(disposer: Disposer) -> (Self, Disposer) {
        let slot = Rc::new(RefCell::new(Some(disposer)));
        let registry_slot = slot.clone();
        let registry_disposer: Disposer = Box::new(move || match registry_slot.borrow_mut().take() {
            Some(disposer) => disposer(),
            None => Ok(()),
        });
        (Self { slot }, registry_disposer)
    }

    /// Runs the wrapped disposer right now, if it hasn't already run.
    pub fn dispose_now(&self) {
        if let Some(disposer) = self.slot.borrow_mut().take() {
            tracing::trace!("trigger disarmed");
            if let Err(error) = disposer() {
                report(error);
            }
        }
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        self.run();
    }
}
