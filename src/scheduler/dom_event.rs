//! DOM-facing identifiers and the listener/observer seam.

use std::rc::Rc;

use slotmap::new_key_type;

use super::Disposer;

new_key_type! {
    /// Identifies a DOM element a trigger can be bound to: an explicit
    /// `ref`, or the first node of a placeholder sub-view resolved
    /// implicitly. Opaque outside this crate — the real element lives in
    /// the host view-instantiation engine.
    pub struct AnchorId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEvent {
    Click,
    KeyDown,
    MouseEnter,
}

/// Injectable source of DOM listeners and intersection observation.
///
/// On non-DOM platforms, implementations are expected to be no-ops: `arm`
/// returns a disposer immediately without ever invoking the callback,
/// which is how `interaction`/`hover`/`viewport` become inert per §4.A.
pub trait EventSource {
    /// Registers `callback` for `event` on `anchor`. The callback may be
    /// invoked more than once by the underlying platform (e.g. repeated
    /// clicks); it is the trigger's job to disarm after the first fire.
    fn listen(&self, anchor: AnchorId, event: DomEvent, callback: Rc<dyn Fn()>) -> Disposer;

    /// Observes `anchor` for viewport intersection, invoking `callback`
    /// with the current `isIntersecting` value on every change.
    fn observe_intersection(&self, anchor: AnchorId, callback: Rc<dyn Fn(bool)>) -> Disposer;
}
