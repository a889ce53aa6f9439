//! The compiler-emitted, immutable per-template-site data (§3, §6).

use std::rc::Rc;

use crate::{
    loader::{Interceptor, LoadCell},
    resolver::AnchorRef,
    view_swapper::SubViewFactory,
};

/// One of the two independent subscriptions a defer instance carries.
/// They share a dependency promise but drive separate state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Main,
    Prefetch,
}

/// The tagged variant called for by §9's redesign note, replacing
/// polymorphism over trigger kinds with a plain enum dispatched through a
/// small `{arm, disarm}` interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    When(WhenExpr),
    Immediate,
    Idle,
    Timer { delay_ms: u32 },
    Interaction,
    Hover,
    Viewport,
}

/// A boolean expression handed to us by the compiler. We don't evaluate
/// expression syntax ourselves — the compiler lowers `when <expr>` to a
/// closure over the host's reactive state.
#[derive(Clone)]
pub struct WhenExpr(pub Rc<dyn Fn() -> bool>);

impl std::fmt::Debug for WhenExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WhenExpr(..)")
    }
}

impl PartialEq for WhenExpr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for WhenExpr {}

/// One entry of the trigger-spec grammar (§6): a kind, the channel it
/// drives, and an optional anchor for DOM-binding kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
    pub channel: Channel,
    pub anchor_ref: Option<AnchorRef>,
}

impl TriggerSpec {
    pub fn new(kind: TriggerKind, channel: Channel) -> Self {
        Self {
            kind,
            channel,
            anchor_ref: None,
        }
    }

    pub fn with_anchor(mut self, anchor_ref: AnchorRef) -> Self {
        self.anchor_ref = Some(anchor_ref);
        self
    }

    pub fn is_dom_binding(&self) -> bool {
        matches!(
            self.kind,
            TriggerKind::Interaction | TriggerKind::Hover | TriggerKind::Viewport
        )
    }
}

/// A single resolved directive/component/pipe definition in a [`DependencyBundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDef {
    pub name: String,
}

/// The ordered set of definitions a loader resolves to, cached on the
/// descriptor once resolved (§3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyBundle {
    pub directives: Vec<DirectiveDef>,
}

/// Invoked with the eventual load outcome. CPS rather than `Future` because
/// the loader is explicitly an opaque external producer (§1 non-goals) and
/// this runtime makes no assumption about which (if any) async executor is
/// driving it — only that the completion callback runs on the UI task loop.
pub type LoadCallback = Box<dyn FnOnce(Result<Rc<DependencyBundle>, String>)>;

/// The compiler-emitted async producer of a block's dependency bundle.
pub type LoaderFn = Rc<dyn Fn(LoadCallback)>;

/// The static, per-template-site specification the compiler emits (§3).
///
/// Everything here is immutable after construction except the memoized
/// load state held in `load_cell`, which is deliberately interior-mutable
/// so every instance sharing this descriptor observes the same promise.
pub struct DeferDescriptor {
    pub main: Rc<dyn SubViewFactory>,
    pub placeholder: Option<Rc<dyn SubViewFactory>>,
    pub loading: Option<Rc<dyn SubViewFactory>>,
    pub error: Option<Rc<dyn SubViewFactory>>,
    pub loader: LoaderFn,
    pub triggers: Vec<TriggerSpec>,
    pub(crate) load_cell: LoadCell,
}

impl DeferDescriptor {
    pub fn new(
        main: Rc<dyn SubViewFactory>,
        loader: LoaderFn,
        triggers: Vec<TriggerSpec>,
    ) -> Self {
        Self {
            main,
            placeholder: None,
            loading: None,
            error: None,
            loader,
            triggers,
            load_cell: LoadCell::new(),
        }
    }

    pub fn with_placeholder(mut self, factory: Rc<dyn SubViewFactory>) -> Self {
        self.placeholder = Some(factory);
        self
    }

    pub fn with_loading(mut self, factory: Rc<dyn SubViewFactory>) -> Self {
        self.loading = Some(factory);
        self
    }

    pub fn with_error(mut self, factory: Rc<dyn SubViewFactory>) -> Self {
        self.error = Some(factory);
        self
    }

    /// Wraps the raw loader with an environment-provided interceptor (§6).
    /// Applied once, here, so the at-most-once contract in `load_cell`
    /// still governs the wrapped function exactly as it would the raw one.
    pub fn with_interceptor(mut self, interceptor: &Interceptor) -> Self {
        self.loader = crate::loader::intercept(self.loader, interceptor);
        self
    }

    pub fn main_triggers(&self) -> impl Iterator<Item = &TriggerSpec> {
        self.triggers
            .iter()
            .filter(|spec| spec.channel == Channel::Main)
    }

    pub fn prefetch_triggers(&self) -> impl Iterator<Item = &TriggerSpec> {
        self.triggers
            .iter()
            .filter(|spec| spec.channel == Channel::Prefetch)
    }

    /// Validates an implicit anchor is never used without a placeholder
    /// (§6: "Using an implicit anchor without a placeholder is a
    /// compile-time error" in the authoring grammar; downgraded to a
    /// constructor-time error here since we're downstream of the compiler).
    pub fn validate(&self) -> Result<(), crate::diagnostics::DeferError> {
        let has_implicit_dom_binding = self.triggers.iter().any(|spec| {
            spec.is_dom_binding() && matches!(spec.anchor_ref, None | Some(AnchorRef::Implicit))
        });
        if has_implicit_dom_binding && self.placeholder.is_none() {
            return Err(crate::diagnostics::DeferError::UnresolvedTrigger);
        }
        Ok(())
    }
}
