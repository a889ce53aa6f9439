//! Locates the DOM anchor a trigger binds to (§4.C).
//!
//! The actual view tree lives in the host view-instantiation engine, which
//! is out of scope here; this module only defines the seam it must expose
//! ([`ViewHost`]) and the search policy over it.

use std::rc::Rc;

use crate::{diagnostics::DeferError, scheduler::AnchorId};

/// What a trigger spec's `anchor_ref` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorRef {
    /// An explicit `ref` naming an element or component in the template.
    Named(String),
    /// No `ref` given: resolves to the first node of the placeholder.
    Implicit,
}

/// The view-instantiation engine's side of anchor resolution.
///
/// A real implementation backs this onto the actual rendered tree; tests
/// back it onto a small in-memory map.
pub trait ViewHost {
    /// Looks up a named ref within this host's own scope (not ancestors).
    fn resolve_named(&self, name: &str) -> Option<AnchorId>;

    /// The first DOM node of this host's placeholder sub-view, if one is
    /// currently rendered.
    fn placeholder_first_node(&self) -> Option<AnchorId>;

    /// The lexically enclosing view scope, if any. Root scopes return `None`.
    fn parent(&self) -> Option<Rc<dyn ViewHost>>;
}

/// Resolves `anchor_ref` against `host`, per §4.C's search order: the defer
/// block's own placeholder sub-view first, then outward through each
/// lexically enclosing scope up to the template root.
///
/// Resolution should only be attempted once the placeholder has rendered —
/// callers are responsible for deferring the call until then.
pub fn resolve(host: &dyn ViewHost, anchor_ref: &AnchorRef) -> Result<AnchorId, DeferError> {
    match anchor_ref {
        AnchorRef::Implicit => host
            .placeholder_first_node()
            .ok_or(DeferError::UnresolvedTrigger),
        AnchorRef::Named(name) => {
            if let Some(found) = host.resolve_named(name) {
                return Ok(found);
            }
            let mut current = host.parent();
            while let Some(scope) = current {
                if let Some(found) = scope.resolve_named(name) {
                    return Ok(found);
                }
                current = scope.parent();
            }
            Err(DeferError::UnresolvedTrigger)
        }
    }
}
