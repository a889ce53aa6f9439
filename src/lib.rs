//! Runtime support for deferred (lazily-loaded) template regions: trigger
//! scheduling, at-most-once dependency loading, the placeholder/loading/
//! complete/error state machine, and the independent prefetch channel.
//!
//! The compiler emits a [`descriptor::DeferDescriptor`] per template site
//! and an [`instance::DeferInstance`] per rendered occurrence of it; this
//! crate owns everything in between.

pub mod cleanup;
pub mod descriptor;
pub mod diagnostics;
pub mod environment;
pub mod instance;
pub mod loader;
pub mod resolver;
pub mod scheduler;
pub mod state_machine;
pub mod trigger;
pub mod view_swapper;

pub use descriptor::{
    Channel, DependencyBundle, DeferDescriptor, DirectiveDef, LoadCallback, LoaderFn, TriggerKind,
    TriggerSpec, WhenExpr,
};
pub use diagnostics::{
    provide_diagnostics, report, DeferError, Diagnostics, RecordingDiagnostics, TracingDiagnostics,
};
pub use environment::{provide_environment, Environment};
pub use instance::DeferInstance;
pub use loader::Interceptor;
pub use resolver::{AnchorRef, ViewHost};
pub use scheduler::{AnchorId, Clock, Disposer, DomEvent, EventSource};
pub use state_machine::{MainState, PrefetchState};
pub use view_swapper::{Queryable, SubView, SubViewFactory};
