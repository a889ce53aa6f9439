//! Trigger arming (§4.B): each [`crate::descriptor::TriggerKind`] is armed
//! against a shared set of context (clock, event source, view host) and
//! produces a disposer that disarms it.
//!
//! A fired trigger calls back into the instance once, through `on_fire`; the
//! instance (not the trigger) is responsible for deciding whether a second
//! fire on an already-settled channel is a no-op.

pub mod hover;
pub mod idle;
pub mod immediate;
pub mod interaction;
pub mod timer;
pub mod viewport;
pub mod when;

use std::rc::Rc;

use crate::{
    descriptor::{TriggerKind, TriggerSpec},
    diagnostics::report,
    resolver::{self, AnchorRef},
    scheduler::{Clock, Disposer, EventSource},
};

/// The shared context every trigger kind arms against. Bundled so arming a
/// trigger is a single call regardless of which primitives that kind needs.
pub struct TriggerContext<'a> {
    pub clock: &'a dyn Clock,
    pub events: &'a dyn EventSource,
    pub host: &'a dyn resolver::ViewHost,
}

/// Arms `spec` so that `on_fire` runs the first (and, for most kinds, only)
/// time its condition is met. Returns a disposer that disarms it early.
///
/// Anchor resolution happens here, once, at arm time: a trigger whose anchor
/// can't be resolved reports [`DeferError::UnresolvedTrigger`] and arms as
/// permanently inert rather than failing the whole instance (§4.C).
pub fn arm(spec: &TriggerSpec, ctx: &TriggerContext<'_>, on_fire: Rc<dyn Fn()>) -> Disposer {
    tracing::trace!(kind = ?spec.kind, channel = ?spec.channel, "arming trigger");
    match &spec.kind {
        TriggerKind::Immediate => immediate::arm(on_fire),
        TriggerKind::Idle => idle::arm(ctx.clock, on_fire),
        TriggerKind::Timer { delay_ms } => timer::arm(ctx.clock, *delay_ms, on_fire),
        TriggerKind::When(expr) => when::arm(expr, on_fire),
        TriggerKind::Interaction => match resolve_anchor(spec, ctx) {
            Some(anchor) => interaction::arm(ctx.events, anchor, on_fire),
            None => crate::scheduler::noop_disposer(),
        },
        TriggerKind::Hover => match resolve_anchor(spec, ctx) {
            Some(anchor) => hover::arm(ctx.events, anchor, on_fire),
            None => crate::scheduler::noop_disposer(),
        },
        TriggerKind::Viewport => match resolve_anchor(spec, ctx) {
            Some(anchor) => viewport::arm(ctx.events, anchor, on_fire),
            None => crate::scheduler::noop_disposer(),
        },
    }
}

fn resolve_anchor(
    spec: &TriggerSpec,
    ctx: &TriggerContext<'_>,
) -> Option<crate::scheduler::AnchorId> {
    let anchor_ref = spec.anchor_ref.clone().unwrap_or(AnchorRef::Implicit);
    match resolver::resolve(ctx.host, &anchor_ref) {
        Ok(anchor) => Some(anchor),
        Err(error) => {
            report(error);
            None
        }
    }
}
