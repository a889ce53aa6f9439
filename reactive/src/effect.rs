use std::{any::Any, cell::RefCell, collections::HashMap, rc::Rc};

use crate::{id::Id, runtime::RUNTIME, scope::Scope, signal::Signal};

pub(crate) trait EffectTrait {
    fn id(&self) -> Id;
    fn run(&self);
    fn add_observer(&self, signal: Signal);
    fn current_observers(&self) -> HashMap<Id, Signal>;
    fn clear_observers(&self);
}

struct Effect<T, F>
where
    T: 'static,
    F: Fn(Option<T>) -> T,
{
    id: Id,
    f: F,
    value: RefCell<Option<T>>,
    observers: RefCell<HashMap<Id, Signal>>,
}

/// Creates an effect that re-runs whenever a Signal it read on its previous
/// run changes.
///
/// The closure runs once immediately and is re-run synchronously whenever
/// one of the signals it tracked is written to — there is no batching
/// queue, because the defer runtime this crate backs is single-threaded
/// cooperative and wants transitions to happen in program order within a
/// task, not on a deferred tick (spec §5: "transitions happen in program
/// order within a task"). Each run re-tracks its dependencies from
/// scratch, so an effect only reruns for signals it actually read last
/// time.
pub fn create_effect<T>(f: impl Fn(Option<T>) -> T + 'static)
where
    T: Any + 'static,
{
    let id = Id::next();
    let effect: Rc<Effect<T, _>> = Rc::new(Effect {
        id,
        f,
        value: RefCell::new(None),
        observers: RefCell::new(HashMap::new()),
    });
    id.set_scope();
    RUNTIME.with(|runtime| {
        runtime
            .effects
            .borrow_mut()
            .insert(id, effect.clone() as Rc<dyn EffectTrait>);
    });

    run_effect(effect);
}

/// Runs `f` without subscribing the currently-running effect to any signal
/// read inside it.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev_effect = RUNTIME.with(|runtime| runtime.current_effect.borrow_mut().take());
    let result = f();
    RUNTIME.with(|runtime| {
        *runtime.current_effect.borrow_mut() = prev_effect;
    });
    result
}

pub(crate) fn run_effect(effect: Rc<dyn EffectTrait>) {
    // Disposes anything the previous run created as a child of the effect
    // (e.g. nested signals), so re-running starts from a clean slate.
    effect.id().dispose_children_only();

    observer_clean_up(&effect);

    RUNTIME.with(|runtime| {
        *runtime.current_effect.borrow_mut() = Some(effect.clone());
    });

    Scope(effect.id(), std::marker::PhantomData).enter(|| {
        effect.run();
    });

    RUNTIME.with(|runtime| {
        *runtime.current_effect.borrow_mut() = None;
    });
}

/// Clears the effect from all the signals it subscribed to on its last run,
/// and clears its own observer list so the next run can re-track from
/// scratch.
pub(crate) fn observer_clean_up(effect: &Rc<dyn EffectTrait>) {
    for observer in effect.current_observers().values() {
        observer.subscribers.borrow_mut().remove(&effect.id());
    }
    effect.clear_observers();
}

impl<T, F> EffectTrait for Effect<T, F>
where
    T: 'static,
    F: Fn(Option<T>) -> T,
{
    fn id(&self) -> Id {
        self.id
    }

    fn run(&self) {
        let curr_value = self.value.borrow_mut().take();
        let new_value = (self.f)(curr_value);
        *self.value.borrow_mut() = Some(new_value);
    }

    fn add_observer(&self, signal: Signal) {
        self.observers.borrow_mut().insert(signal.id, signal);
    }

    fn current_observers(&self) -> HashMap<Id, Signal> {
        self.observers.borrow().clone()
    }

    fn clear_observers(&self) {
        self.observers.borrow_mut().clear();
    }
}
