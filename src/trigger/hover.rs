//! `on hover`: fires once when the pointer enters the anchor.

use std::rc::Rc;

use crate::scheduler::{AnchorId, Disposer, DomEvent, EventSource};

pub fn arm(events: &dyn EventSource, anchor: AnchorId, on_fire: Rc<dyn Fn()>) -> Disposer {
    let fired = Rc::new(std::cell::Cell::new(false));
    events.listen(
        anchor,
        DomEvent::MouseEnter,
        Rc::new(move || {
            if !fired.replace(true) {
                on_fire();
            }
        }),
    )
}
