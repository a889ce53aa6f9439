//! `on timer(ms)`: arms an independent, uncoalesced timeout. Kept distinct
//! from `on immediate` even at `timer(0)`: immediate fires inline during
//! construction, while a zero-delay timer still goes through the clock and
//! so observes anything else already queued ahead of it.

use std::rc::Rc;

use crate::scheduler::{self, Clock, Disposer};

pub fn arm(clock: &dyn Clock, delay_ms: u32, on_fire: Rc<dyn Fn()>) -> Disposer {
    scheduler::timer::set_timeout(clock, delay_ms, Box::new(move || on_fire()))
}
