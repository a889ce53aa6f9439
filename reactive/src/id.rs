use std::sync::atomic::AtomicU64;

use crate::{effect::observer_clean_up, runtime::RUNTIME, signal::Signal};

/// An internal id which can reference a Signal, Effect, or Scope.
///
/// The whole reactive runtime is thread-local and single-threaded by
/// design (the defer runtime it backs runs cooperatively on one task
/// loop), so unlike the id scheme this is adapted from, there is no
/// secondary cross-thread runtime to fall back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u64);

impl Id {
    /// Create a new Id that's next in order.
    pub(crate) fn next() -> Id {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Id(COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }

    /// Try to get the Signal that's linked with this Id.
    pub(crate) fn signal(&self) -> Option<Signal> {
        RUNTIME.with(|runtime| runtime.signals.borrow().get(self).cloned())
    }

    /// Link a Signal to this Id.
    pub(crate) fn add_signal(&self, signal: Signal) {
        RUNTIME.with(|runtime| runtime.signals.borrow_mut().insert(*self, signal));
    }

    /// Make this Id a child of the current Scope.
    pub(crate) fn set_scope(&self) {
        RUNTIME.with(|runtime| {
            let scope = *runtime.current_scope.borrow();
            runtime
                .children
                .borrow_mut()
                .entry(scope)
                .or_default()
                .insert(*self);
            runtime.parents.borrow_mut().insert(*self, scope);
        });
    }

    /// Dispose only the children of this Id, leaving any signal/effect
    /// registered under the Id itself intact.
    ///
    /// Used when an effect re-runs: anything it created as a child scope on
    /// its previous run (e.g. nested signals from a `when` evaluation) is
    /// torn down before the new run starts, without unregistering the
    /// effect itself.
    pub(crate) fn dispose_children_only(&self) {
        let children = RUNTIME.with(|runtime| runtime.children.borrow_mut().remove(self));
        if let Some(children) = children {
            for child in children {
                child.dispose();
            }
        }
    }

    /// Dispose the resources linked to this Id, and all of its children and
    /// grandchildren.
    pub(crate) fn dispose(&self) {
        let (children, signal, effect) = RUNTIME.with(|runtime| {
            (
                runtime.children.borrow_mut().remove(self),
                runtime.signals.borrow_mut().remove(self),
                runtime.effects.borrow_mut().remove(self),
            )
        });

        if let Some(children) = children {
            for child in children {
                child.dispose();
            }
        }

        if let Some(effect) = effect {
            observer_clean_up(&effect);
        }

        if let Some(signal) = signal {
            for effect_id in signal.subscriber_ids() {
                effect_id.dispose();
            }
        }

        RUNTIME.with(|runtime| {
            runtime.scope_contexts.borrow_mut().remove(self);
            runtime.parents.borrow_mut().remove(self);
        });
    }
}
