//! `on viewport`: fires once the anchor intersects the viewport, backed by
//! a single shared intersection observer per anchor at the [`EventSource`]
//! implementation's discretion (§4.B, §5).

use std::rc::Rc;

use crate::scheduler::{AnchorId, Disposer, EventSource};

pub fn arm(events: &dyn EventSource, anchor: AnchorId, on_fire: Rc<dyn Fn()>) -> Disposer {
    let fired = Rc::new(std::cell::Cell::new(false));
    events.observe_intersection(
        anchor,
        Rc::new(move |is_intersecting: bool| {
            if is_intersecting && !fired.replace(true) {
                on_fire();
            }
        }),
    )
}
