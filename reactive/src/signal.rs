use std::{
    any::Any,
    cell::{Ref, RefCell, RefMut},
    collections::HashSet,
    fmt,
    marker::PhantomData,
    rc::Rc,
};

#[cfg(debug_assertions)]
use std::{cell::Cell, panic::Location};

use crate::{
    effect::run_effect,
    id::Id,
    read::{ReadSignalValue, SignalRead, SignalTrack, SignalWith},
    runtime::RUNTIME,
    write::{SignalWrite, WriteSignalValue},
    SignalGet, SignalUpdate,
};

/// A `RefCell` that panics with the location of the conflicting borrow
/// instead of the generic "already borrowed" message, in debug builds only.
///
/// Signal borrow conflicts in a reactive runtime are almost always "a
/// `.read()` guard from three calls up the stack is still alive" — knowing
/// where that guard was taken turns a confusing panic into an obvious one.
pub(crate) struct TrackedRefCell<T: ?Sized> {
    #[cfg(debug_assertions)]
    holder: Cell<Option<&'static Location<'static>>>,
    inner: RefCell<T>,
}

impl<T> TrackedRefCell<T> {
    fn new(value: T) -> Self {
        Self {
            #[cfg(debug_assertions)]
            holder: Cell::new(None),
            inner: RefCell::new(value),
        }
    }
}

impl<T: ?Sized> TrackedRefCell<T> {
    #[cfg_attr(debug_assertions, track_caller)]
    pub(crate) fn borrow(&self) -> Ref<'_, T> {
        #[cfg(debug_assertions)]
        {
            let caller = Location::caller();
            match self.inner.try_borrow() {
                Ok(r) => {
                    self.holder.set(Some(caller));
                    r
                }
                Err(_) => self.panic_conflict(caller),
            }
        }
        #[cfg(not(debug_assertions))]
        {
            self.inner.borrow()
        }
    }

    #[cfg_attr(debug_assertions, track_caller)]
    pub(crate) fn borrow_mut(&self) -> RefMut<'_, T> {
        #[cfg(debug_assertions)]
        {
            let caller = Location::caller();
            match self.inner.try_borrow_mut() {
                Ok(r) => {
                    self.holder.set(Some(caller));
                    r
                }
                Err(_) => self.panic_conflict(caller),
            }
        }
        #[cfg(not(debug_assertions))]
        {
            self.inner.borrow_mut()
        }
    }

    #[cfg(debug_assertions)]
    fn panic_conflict(&self, caller: &'static Location<'static>) -> ! {
        match self.holder.get() {
            Some(loc) => panic!(
                "signal value already borrowed at {}:{} (attempted at {}:{})",
                loc.file(),
                loc.line(),
                caller.file(),
                caller.line()
            ),
            None => panic!(
                "signal value already borrowed (attempted at {}:{})",
                caller.file(),
                caller.line()
            ),
        }
    }
}

/// The untyped half of a signal, stored once per `Id` in the runtime.
#[derive(Clone)]
pub(crate) struct Signal {
    pub(crate) id: Id,
    pub(crate) subscribers: Rc<RefCell<HashSet<Id>>>,
    pub(crate) value: Rc<TrackedRefCell<dyn Any>>,
}

/// A signal with a unit payload, used to let a plain `Id` (such as a scope)
/// act as a trackable dependency on its own.
pub(crate) fn blank_signal(id: Id) -> Signal {
    Signal {
        id,
        subscribers: Rc::new(RefCell::new(HashSet::new())),
        value: Rc::new(TrackedRefCell::new(())),
    }
}

impl Signal {
    pub(crate) fn subscribe(&self) {
        RUNTIME.with(|runtime| {
            if let Some(effect) = runtime.current_effect.borrow().clone() {
                self.subscribers.borrow_mut().insert(effect.id());
                effect.add_observer(self.clone());
            }
        });
    }

    pub(crate) fn subscriber_ids(&self) -> Vec<Id> {
        self.subscribers.borrow().iter().copied().collect()
    }

    /// Notifies every subscribed effect, in the order it subscribed, running
    /// each one to completion before moving to the next.
    ///
    /// The defer runtime built on top of this relies on this being
    /// synchronous: a trigger fire and its resulting state transition must
    /// land before the call that caused it returns. There is no batching
    /// queue here.
    pub(crate) fn run_effects(&self) {
        let subscribers = self.subscriber_ids();
        for effect_id in subscribers {
            let effect = RUNTIME.with(|runtime| runtime.effects.borrow().get(&effect_id).cloned());
            if let Some(effect) = effect {
                run_effect(effect);
            }
        }
    }

    fn with<T: 'static, O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.subscribe();
        let value = self.value.borrow();
        f(value.downcast_ref::<T>().expect("signal type mismatch"))
    }

    fn with_untracked<T: 'static, O>(&self, f: impl FnOnce(&T) -> O) -> O {
        let value = self.value.borrow();
        f(value.downcast_ref::<T>().expect("signal type mismatch"))
    }
}

/// A read-write signal: both a getter and a setter for a piece of state.
pub struct RwSignal<T> {
    pub(crate) id: Id,
    ty: PhantomData<T>,
}

impl<T> RwSignal<T> {
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn read_only(self) -> ReadSignal<T> {
        ReadSignal {
            id: self.id,
            ty: PhantomData,
        }
    }

    pub fn write_only(self) -> WriteSignal<T> {
        WriteSignal {
            id: self.id,
            ty: PhantomData,
        }
    }
}

impl<T: Any + 'static> RwSignal<T> {
    pub fn new(value: T) -> Self {
        let id = Id::next();
        let signal = Signal {
            id,
            subscribers: Rc::new(RefCell::new(HashSet::new())),
            value: Rc::new(TrackedRefCell::new(value)),
        };
        id.add_signal(signal);
        id.set_scope();
        RwSignal {
            id,
            ty: PhantomData,
        }
    }

    pub(crate) fn new_split(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
        let rw = Self::new(value);
        (rw.read_only(), rw.write_only())
    }
}

impl<T> Copy for RwSignal<T> {}
impl<T> Clone for RwSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for RwSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T> Eq for RwSignal<T> {}
impl<T> fmt::Debug for RwSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwSignal").field("id", &self.id).finish()
    }
}

/// A read-only handle to a signal.
pub struct ReadSignal<T> {
    pub(crate) id: Id,
    ty: PhantomData<T>,
}
impl<T> Copy for ReadSignal<T> {}
impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for ReadSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T> Eq for ReadSignal<T> {}
impl<T> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal").field("id", &self.id).finish()
    }
}

/// A write-only handle to a signal.
pub struct WriteSignal<T> {
    pub(crate) id: Id,
    ty: PhantomData<T>,
}
impl<T> Copy for WriteSignal<T> {}
impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for WriteSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T> Eq for WriteSignal<T> {}
impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal").field("id", &self.id).finish()
    }
}

pub fn create_rw_signal<T: Any + 'static>(value: T) -> RwSignal<T> {
    RwSignal::new(value)
}

pub fn create_signal<T: Any + 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    RwSignal::new_split(value)
}

macro_rules! impl_signal_traits {
    ($ty:ident) => {
        impl<T: Clone> SignalGet<T> for $ty<T> {
            fn id(&self) -> Id {
                self.id
            }
        }
        impl<T> SignalWith<T> for $ty<T> {
            fn id(&self) -> Id {
                self.id
            }
        }
        impl<T> SignalTrack<T> for $ty<T> {
            fn id(&self) -> Id {
                self.id
            }
        }
        impl<T> SignalRead<T> for $ty<T> {
            fn id(&self) -> Id {
                self.id
            }
        }
    };
}

impl_signal_traits!(RwSignal);
impl_signal_traits!(ReadSignal);

impl<T> SignalUpdate<T> for RwSignal<T> {
    fn id(&self) -> Id {
        self.id
    }
}
impl<T> SignalUpdate<T> for WriteSignal<T> {
    fn id(&self) -> Id {
        self.id
    }
}
impl<T> SignalWrite<T> for RwSignal<T> {
    fn id(&self) -> Id {
        self.id
    }
}
impl<T> SignalWrite<T> for WriteSignal<T> {
    fn id(&self) -> Id {
        self.id
    }
}

pub(crate) fn signal_with<T: 'static, O>(id: Id, f: impl FnOnce(&T) -> O) -> Option<O> {
    id.signal().map(|signal| signal.with(f))
}

pub(crate) fn signal_with_untracked<T: 'static, O>(id: Id, f: impl FnOnce(&T) -> O) -> Option<O> {
    id.signal().map(|signal| signal.with_untracked(f))
}

pub(crate) fn signal_read<T: 'static>(id: Id) -> Option<ReadSignalValue<T>> {
    id.signal().map(|signal| {
        signal.subscribe();
        ReadSignalValue {
            value: signal.value,
            ty: PhantomData,
        }
    })
}

pub(crate) fn signal_read_untracked<T: 'static>(id: Id) -> Option<ReadSignalValue<T>> {
    id.signal().map(|signal| ReadSignalValue {
        value: signal.value,
        ty: PhantomData,
    })
}

pub(crate) fn signal_write<T: 'static>(id: Id) -> Option<WriteSignalValue<T>> {
    id.signal().map(|signal| WriteSignalValue {
        id,
        value: signal.value,
        ty: PhantomData,
    })
}

pub(crate) fn signal_update<T: 'static, O>(id: Id, f: impl FnOnce(&mut T) -> O) -> Option<O> {
    let signal = id.signal()?;
    let result = {
        let mut value = signal.value.borrow_mut();
        let value = value
            .downcast_mut::<T>()
            .expect("signal type mismatch on update");
        f(value)
    };
    signal.run_effects();
    Some(result)
}
