//! `on immediate`: fires synchronously at arm time, no scheduling involved.

use std::rc::Rc;

use crate::scheduler::{noop_disposer, Disposer};

pub fn arm(on_fire: Rc<dyn Fn()>) -> Disposer {
    on_fire();
    noop_disposer()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn fires_exactly_once_at_arm_time() {
        let fired = Rc::new(Cell::new(0));
        let fired_handle = fired.clone();
        let _disposer = arm(Rc::new(move || fired_handle.set(fired_handle.get() + 1)));
        assert_eq!(fired.get(), 1);
    }
}
