use std::{any::Any, cell::Ref, marker::PhantomData, ops::Deref, rc::Rc};

use crate::{
    id::Id,
    signal::{signal_read, signal_read_untracked, signal_with, signal_with_untracked, TrackedRefCell},
};

/// A borrowed handle onto a signal's current value, obtained from
/// [`SignalRead::read`]. Subscribes the currently running effect the moment
/// it's created, not when it's dereferenced.
pub struct ReadSignalValue<T> {
    pub(crate) value: Rc<TrackedRefCell<dyn Any>>,
    pub(crate) ty: PhantomData<T>,
}

impl<T: 'static> ReadSignalValue<T> {
    /// Borrows the current value stored in the signal.
    pub fn borrow(&self) -> ReadBorrow<'_, T> {
        ReadBorrow {
            inner: self.value.borrow(),
            ty: PhantomData,
        }
    }
}

pub struct ReadBorrow<'a, T> {
    inner: Ref<'a, dyn Any>,
    ty: PhantomData<T>,
}

impl<'a, T: 'static> Deref for ReadBorrow<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.inner.downcast_ref::<T>().expect("signal type mismatch")
    }
}

pub trait SignalGet<T: Clone> {
    fn id(&self) -> Id;

    fn get_untracked(&self) -> T
    where
        T: 'static,
    {
        self.try_get_untracked().unwrap()
    }

    fn get(&self) -> T
    where
        T: 'static,
    {
        self.try_get().unwrap()
    }

    fn try_get(&self) -> Option<T>
    where
        T: 'static,
    {
        signal_with(self.id(), |v: &T| v.clone())
    }

    fn try_get_untracked(&self) -> Option<T>
    where
        T: 'static,
    {
        signal_with_untracked(self.id(), |v: &T| v.clone())
    }
}

pub trait SignalTrack<T> {
    fn id(&self) -> Id;

    /// Subscribes the currently running effect to this signal, if there is one.
    fn track(&self) {
        if let Some(signal) = self.id().signal() {
            signal.subscribe();
        }
    }

    /// If the signal isn't disposed, subscribes the currently running effect.
    fn try_track(&self) {
        self.track();
    }
}

pub trait SignalWith<T> {
    fn id(&self) -> Id;

    fn with<O>(&self, f: impl FnOnce(&T) -> O) -> O
    where
        T: 'static,
    {
        self.try_with(|v| f(v.expect("signal was disposed")))
    }

    fn with_untracked<O>(&self, f: impl FnOnce(&T) -> O) -> O
    where
        T: 'static,
    {
        self.try_with_untracked(|v| f(v.expect("signal was disposed")))
    }

    fn try_with<O>(&self, f: impl FnOnce(Option<&T>) -> O) -> O
    where
        T: 'static,
    {
        let mut f = Some(f);
        match signal_with(self.id(), |v: &T| (f.take().unwrap())(Some(v))) {
            Some(o) => o,
            None => (f.take().unwrap())(None),
        }
    }

    fn try_with_untracked<O>(&self, f: impl FnOnce(Option<&T>) -> O) -> O
    where
        T: 'static,
    {
        let mut f = Some(f);
        match signal_with_untracked(self.id(), |v: &T| (f.take().unwrap())(Some(v))) {
            Some(o) => o,
            None => (f.take().unwrap())(None),
        }
    }
}

pub trait SignalRead<T> {
    fn id(&self) -> Id;

    /// Borrows the signal's value without cloning it, subscribing the
    /// currently running effect.
    fn read(&self) -> ReadSignalValue<T>
    where
        T: 'static,
    {
        self.try_read().expect("signal was disposed")
    }

    /// Borrows the signal's value without cloning it or subscribing.
    fn read_untracked(&self) -> ReadSignalValue<T>
    where
        T: 'static,
    {
        self.try_read_untracked().expect("signal was disposed")
    }

    fn try_read(&self) -> Option<ReadSignalValue<T>>
    where
        T: 'static,
    {
        signal_read(self.id())
    }

    fn try_read_untracked(&self) -> Option<ReadSignalValue<T>>
    where
        T: 'static,
    {
        signal_read_untracked(self.id())
    }
}
