//! `on interaction`: fires once on the anchor's first click or keydown, then
//! disarms itself (§4.B: most triggers are one-shot on the main channel).

use std::rc::Rc;

use crate::scheduler::{AnchorId, Disposer, DomEvent, EventSource};

pub fn arm(events: &dyn EventSource, anchor: AnchorId, on_fire: Rc<dyn Fn()>) -> Disposer {
    let fired = Rc::new(std::cell::Cell::new(false));

    let click_fire = on_fire.clone();
    let click_fired = fired.clone();
    let dispose_click = events.listen(
        anchor,
        DomEvent::Click,
        Rc::new(move || {
            if !click_fired.replace(true) {
                click_fire();
            }
        }),
    );

    let key_fired = fired.clone();
    let dispose_key = events.listen(
        anchor,
        DomEvent::KeyDown,
        Rc::new(move || {
            if !key_fired.replace(true) {
                on_fire();
            }
        }),
    );

    Box::new(move || {
        dispose_click()?;
        dispose_key()?;
        Ok(())
    })
}
