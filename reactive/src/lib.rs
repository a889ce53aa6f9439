//! A minimal single-threaded signal/effect/scope runtime.
//!
//! [`RwSignal::new_split`](RwSignal::new_split) returns a separated
//! [`ReadSignal`] and [`WriteSignal`] for a variable. An existing `RwSignal`
//! may be converted using [`RwSignal::read_only`](RwSignal::read_only) and
//! [`RwSignal::write_only`](RwSignal::write_only) where necessary, but the
//! reverse is not possible.
//!
//! Everything here lives on one thread: there is no locking and no
//! cross-thread signal variant, because the runtime this crate backs is a
//! single-threaded cooperative task loop.

mod context;
mod effect;
mod id;
mod read;
mod runtime;
mod scope;
mod signal;
mod write;

pub use context::{provide_context, use_context, Context};
pub use effect::{create_effect, untrack};
pub use id::Id as ReactiveId;
pub use read::{ReadSignalValue, SignalGet, SignalRead, SignalTrack, SignalWith};
pub use scope::Scope;
pub use signal::{create_rw_signal, create_signal, ReadSignal, RwSignal, WriteSignal};
pub use write::{SignalUpdate, SignalWrite, WriteSignalValue};
