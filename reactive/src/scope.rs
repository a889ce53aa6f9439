use std::{any::Any, fmt, marker::PhantomData};

use crate::{
    context::Context,
    effect::create_effect,
    id::Id,
    runtime::RUNTIME,
    signal::{ReadSignal, RwSignal, WriteSignal},
};

/// Controls the lifetime of the signals and effects created within it.
///
/// Every signal has a scope, created explicitly or implicitly from whatever
/// scope is current at the time. Disposing a scope tears down every signal
/// and effect created under it, and every child scope.
#[derive(Clone, Copy)]
pub struct Scope(pub(crate) Id, pub(crate) PhantomData<()>);

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("id", &self.0).finish()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Scope {}

impl Scope {
    /// Creates a new scope with no parent.
    pub fn new() -> Self {
        Self(Id::next(), PhantomData)
    }

    /// The scope that's current in the runtime right now. Anything created
    /// without an explicit scope lands here.
    pub fn current() -> Scope {
        RUNTIME.with(|runtime| Scope(*runtime.current_scope.borrow(), PhantomData))
    }

    /// Creates a child scope of this scope.
    pub fn create_child(&self) -> Scope {
        let child = Id::next();
        RUNTIME.with(|runtime| {
            runtime
                .children
                .borrow_mut()
                .entry(self.0)
                .or_default()
                .insert(child);
            runtime.parents.borrow_mut().insert(child, self.0);
        });
        Scope(child, PhantomData)
    }

    /// Creates a new signal under this scope, returning it split into read
    /// and write halves.
    pub fn create_signal<T>(self, value: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: Any + 'static,
    {
        self.enter(|| RwSignal::new_split(value))
    }

    /// Creates a read-write signal under this scope.
    pub fn create_rw_signal<T>(self, value: T) -> RwSignal<T>
    where
        T: Any + 'static,
    {
        self.enter(|| RwSignal::new(value))
    }

    /// Creates an effect under this scope.
    pub fn create_effect<T>(self, f: impl Fn(Option<T>) -> T + 'static)
    where
        T: Any + 'static,
    {
        self.enter(|| create_effect(f))
    }

    /// Provides a context value visible to this scope and its descendants.
    pub fn provide_context<T>(self, value: T)
    where
        T: Clone + 'static,
    {
        self.enter(|| Context::provide(value))
    }

    /// Looks up a context value from this scope or its ancestors.
    pub fn get_context<T>(self) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.enter(Context::get::<T>)
    }

    /// Runs `f` with this scope made current for its duration.
    pub fn enter<T>(&self, f: impl FnOnce() -> T) -> T {
        let prev_scope = RUNTIME.with(|runtime| {
            let mut current_scope = runtime.current_scope.borrow_mut();
            std::mem::replace(&mut *current_scope, self.0)
        });

        let result = f();

        RUNTIME.with(|runtime| {
            *runtime.current_scope.borrow_mut() = prev_scope;
        });

        result
    }

    /// Wraps a closure so every call runs under a fresh child scope of this scope.
    pub fn enter_child<T, U>(&self, f: impl Fn(T) -> U + 'static) -> impl Fn(T) -> (U, Scope)
    where
        T: 'static,
    {
        let parent = *self;
        move |t| {
            let scope = parent.create_child();
            let result = scope.enter(|| f(t));
            (result, scope)
        }
    }

    /// Subscribes the currently running effect to this scope directly,
    /// independent of any signal read within it. Used by consumers that
    /// want to rerun when a scope's structure changes rather than when a
    /// specific signal's value changes.
    pub fn track(&self) {
        let signal = match self.0.signal() {
            Some(signal) => signal,
            None => {
                let signal = crate::signal::blank_signal(self.0);
                self.0.add_signal(signal.clone());
                signal
            }
        };
        signal.subscribe();
    }

    /// Disposes this scope: every signal, effect, and child scope created
    /// under it is torn down.
    pub fn dispose(&self) {
        self.0.dispose();
    }
}
