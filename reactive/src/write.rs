use std::{any::Any, cell::RefMut, marker::PhantomData, ops::{Deref, DerefMut}, rc::Rc};

use crate::{
    id::Id,
    signal::{signal_update, signal_write, TrackedRefCell},
};

/// A mutable handle onto a signal's value, obtained from [`SignalWrite::write`].
///
/// Dropping it runs every effect subscribed to the signal, so a batch of
/// in-place edits made through [`WriteSignalValue::borrow_mut`] only
/// triggers one rerun, at the end of the borrow rather than per edit.
pub struct WriteSignalValue<T> {
    pub(crate) id: Id,
    pub(crate) value: Rc<TrackedRefCell<dyn Any>>,
    pub(crate) ty: PhantomData<T>,
}

impl<T> Drop for WriteSignalValue<T> {
    fn drop(&mut self) {
        if let Some(signal) = self.id.signal() {
            signal.run_effects();
        }
    }
}

impl<T: 'static> WriteSignalValue<T> {
    /// Mutably borrows the current value stored in the signal.
    pub fn borrow_mut(&self) -> WriteBorrow<'_, T> {
        WriteBorrow {
            inner: self.value.borrow_mut(),
            ty: PhantomData,
        }
    }
}

pub struct WriteBorrow<'a, T> {
    inner: RefMut<'a, dyn Any>,
    ty: PhantomData<T>,
}

impl<'a, T: 'static> Deref for WriteBorrow<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.inner.downcast_ref::<T>().expect("signal type mismatch")
    }
}

impl<'a, T: 'static> DerefMut for WriteBorrow<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.downcast_mut::<T>().expect("signal type mismatch")
    }
}

pub trait SignalUpdate<T> {
    fn id(&self) -> Id;

    /// Sets the new value and triggers an effect run.
    fn set(&self, new_value: T)
    where
        T: 'static,
    {
        let _ = self.try_update(|v| *v = new_value);
    }

    /// Updates the stored value with the given function and triggers an effect run.
    fn update(&self, f: impl FnOnce(&mut T))
    where
        T: 'static,
    {
        let _ = self.try_update(f);
    }

    /// Updates the stored value, triggers an effect run, and returns whatever `f` returns.
    fn try_update<O>(&self, f: impl FnOnce(&mut T) -> O) -> Option<O>
    where
        T: 'static,
    {
        signal_update(self.id(), f)
    }
}

pub trait SignalWrite<T> {
    fn id(&self) -> Id;

    /// Converts the signal into a `WriteSignalValue` holding a reference to
    /// its stored value. Dropping the returned handle triggers an effect run.
    fn write(&self) -> WriteSignalValue<T>
    where
        T: 'static,
    {
        self.try_write().expect("signal was disposed")
    }

    fn try_write(&self) -> Option<WriteSignalValue<T>>
    where
        T: 'static,
    {
        signal_write(self.id())
    }
}
