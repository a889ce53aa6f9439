//! The dependency loader (§4.D): invokes the compiler-emitted loader
//! function at most once per descriptor, memoizes the outcome, and lets
//! every interested trigger subscribe to that single outcome regardless of
//! how many already fired before it resolved.
//!
//! Grounded in the memoized-resource pattern (fetch once, cache the result,
//! notify every waiter on settle) without pulling in an async runtime: the
//! loader itself is handed a plain completion callback, since this crate
//! makes no assumption about what (if anything) is driving it.

use std::{cell::RefCell, rc::Rc};

use crate::descriptor::{DeferDescriptor, DependencyBundle, LoadCallback, LoaderFn};

enum LoadState {
    NotStarted,
    Pending,
    Resolved(Rc<DependencyBundle>),
    Rejected(String),
}

/// The memoized load outcome shared by every instance of a descriptor.
///
/// Once a load is `Rejected` it stays that way forever: §4.D specifies no
/// automatic retry, so a failed block requires a fresh instance (e.g. a
/// remount) to try again.
pub(crate) struct LoadCell {
    state: RefCell<LoadState>,
    waiters: RefCell<Vec<LoadCallback>>,
}

impl LoadCell {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(LoadState::NotStarted),
            waiters: RefCell::new(Vec::new()),
        }
    }
}

/// An optional hook the compiler can install to wrap or replace the raw
/// loader (e.g. for testing or augmenting dependency resolution). Per §4.D
/// it must not alter the at-most-once contract, so it wraps the raw loader
/// once at descriptor-construction time rather than being consulted per call.
pub type Interceptor = Rc<dyn Fn(LoaderFn) -> LoaderFn>;

pub fn intercept(loader: LoaderFn, interceptor: &Interceptor) -> LoaderFn {
    interceptor(loader)
}

/// Ensures `descriptor`'s loader has been invoked at most once, then calls
/// `on_settled` with the outcome (directly, if already settled; once the
/// loader calls back, otherwise).
///
/// `descriptor` must be held by `Rc` for as long as any load is in flight,
/// since the completion closure handed to the raw loader keeps its own
/// strong reference so it can settle the shared cell whenever the loader
/// decides to call back.
pub fn load(descriptor: &Rc<DeferDescriptor>, on_settled: LoadCallback) {
    let cell = &descriptor.load_cell;

    let started_load = {
        let mut state = cell.state.borrow_mut();
        match &*state {
            LoadState::NotStarted => {
                *state = LoadState::Pending;
                cell.waiters.borrow_mut().push(on_settled);
                true
            }
            LoadState::Pending => {
                cell.waiters.borrow_mut().push(on_settled);
                return;
            }
            LoadState::Resolved(bundle) => {
                let bundle = bundle.clone();
                drop(state);
                on_settled(Ok(bundle));
                return;
            }
            LoadState::Rejected(reason) => {
                let reason = reason.clone();
                drop(state);
                on_settled(Err(reason));
                return;
            }
        }
    };
    debug_assert!(started_load);

    let descriptor = descriptor.clone();
    tracing::debug!("invoking dependency loader (at-most-once)");
    (descriptor.loader.clone())(Box::new(move |result| {
        settle(&descriptor, result);
    }));
}

fn settle(descriptor: &Rc<DeferDescriptor>, result: Result<Rc<DependencyBundle>, String>) {
    let cell = &descriptor.load_cell;
    let waiters = {
        let mut state = cell.state.borrow_mut();
        *state = match &result {
            Ok(bundle) => LoadState::Resolved(bundle.clone()),
            Err(reason) => LoadState::Rejected(reason.clone()),
        };
        std::mem::take(&mut *cell.waiters.borrow_mut())
    };
    tracing::debug!(ok = result.is_ok(), waiters = waiters.len(), "dependency load settled");
    for waiter in waiters {
        waiter(result.clone());
    }
}
