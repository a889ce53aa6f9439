use std::{
    any::TypeId,
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{effect::EffectTrait, id::Id, signal::Signal};

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::new();
}

/// The reactive runtime state, confined to a single thread.
///
/// The defer runtime this crate backs is explicitly single-threaded
/// cooperative (transitions, trigger arms, and view mutations all execute
/// on one task loop), so unlike a general-purpose signals library there is
/// no cross-thread signal storage to reconcile here.
pub(crate) struct Runtime {
    pub(crate) current_effect: RefCell<Option<Rc<dyn EffectTrait>>>,
    pub(crate) current_scope: RefCell<Id>,
    pub(crate) children: RefCell<HashMap<Id, HashSet<Id>>>,
    /// Reverse of `children`, so context lookup can walk up from a scope to
    /// its ancestors without scanning every entry in `children`.
    pub(crate) parents: RefCell<HashMap<Id, Id>>,
    pub(crate) signals: RefCell<HashMap<Id, Signal>>,
    pub(crate) effects: RefCell<HashMap<Id, Rc<dyn EffectTrait>>>,
    /// Context values provided per-scope via `Context::provide`/`provide_context`.
    pub(crate) scope_contexts: RefCell<HashMap<Id, HashMap<TypeId, Box<dyn std::any::Any>>>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            current_effect: RefCell::new(None),
            current_scope: RefCell::new(Id::next()),
            children: RefCell::new(HashMap::new()),
            parents: RefCell::new(HashMap::new()),
            signals: RefCell::new(HashMap::new()),
            effects: RefCell::new(HashMap::new()),
            scope_contexts: RefCell::new(HashMap::new()),
        }
    }
}
