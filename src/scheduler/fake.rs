//! Deterministic fakes standing in for real platform globals in tests
//! (§4.A: "Tests replace these wrappers with deterministic fakes").

use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use super::{dom_event::AnchorId, Clock, DomEvent, Disposer, EventSource};

#[derive(Default)]
struct FakeClockState {
    now: u32,
    next_id: u64,
    idle: Vec<(u64, Box<dyn FnOnce()>)>,
    timers: Vec<(u64, u32, Box<dyn FnOnce()>)>,
}

/// A manually-driven clock: idle callbacks run only when [`FakeClock::run_idle`]
/// is called, and timers only fire once [`FakeClock::advance`] passes their
/// deadline.
#[derive(Clone, Default)]
pub struct FakeClock {
    state: Rc<RefCell<FakeClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every currently-armed idle callback, in arming order.
    pub fn run_idle(&self) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            std::mem::take(&mut state.idle)
        };
        for (_, callback) in callbacks {
            callback();
        }
    }

    pub fn has_pending_idle(&self) -> bool {
        !self.state.borrow().idle.is_empty()
    }

    /// Advances the virtual clock by `ms`, firing every timer whose
    /// deadline has passed, earliest-armed first.
    pub fn advance(&self, ms: u32) {
        let due = {
            let mut state = self.state.borrow_mut();
            state.now += ms;
            let now = state.now;
            let (due, pending): (Vec<_>, Vec<_>) =
                std::mem::take(&mut state.timers)
                    .into_iter()
                    .partition(|(_, deadline, _)| *deadline <= now);
            state.timers = pending;
            due
        };
        for (_, _, callback) in due {
            callback();
        }
    }
}

impl Clock for FakeClock {
    fn request_idle(&self, callback: Box<dyn FnOnce()>) -> Disposer {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.idle.push((id, callback));
            id
        };
        let state = self.state.clone();
        Box::new(move || {
            state.borrow_mut().idle.retain(|(i, _)| *i != id);
            Ok(())
        })
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Disposer {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            let deadline = state.now + delay_ms;
            state.timers.push((id, deadline, callback));
            id
        };
        let state = self.state.clone();
        Box::new(move || {
            state.borrow_mut().timers.retain(|(i, _, _)| *i != id);
            Ok(())
        })
    }
}

type ListenerKey = (AnchorId, DomEvent);

#[derive(Default)]
struct FakeEventSourceState {
    listeners: FxHashMap<ListenerKey, Vec<(u64, Rc<dyn Fn()>)>>,
    intersections: FxHashMap<AnchorId, Vec<(u64, Rc<dyn Fn(bool)>)>>,
    next_id: u64,
}

/// A DOM stand-in that records listeners instead of attaching them to real
/// elements, and lets tests dispatch synthetic events and intersection
/// changes.
#[derive(Clone, Default)]
pub struct FakeEventSource {
    state: Rc<RefCell<FakeEventSourceState>>,
}

impl FakeEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches `event` on `anchor` to every currently-registered listener.
    pub fn dispatch(&self, anchor: AnchorId, event: DomEvent) {
        let callbacks = self
            .state
            .borrow()
            .listeners
            .get(&(anchor, event))
            .cloned()
            .unwrap_or_default();
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Reports a new intersection state for `anchor` to every observer.
    pub fn report_intersection(&self, anchor: AnchorId, is_intersecting: bool) {
        let callbacks = self
            .state
            .borrow()
            .intersections
            .get(&anchor)
            .cloned()
            .unwrap_or_default();
        for (_, callback) in callbacks {
            callback(is_intersecting);
        }
    }

    pub fn listener_count(&self, anchor: AnchorId, event: DomEvent) -> usize {
        self.state
            .borrow()
            .listeners
            .get(&(anchor, event))
            .map_or(0, Vec::len)
    }

    pub fn observer_count(&self, anchor: AnchorId) -> usize {
        self.state
            .borrow()
            .intersections
            .get(&anchor)
            .map_or(0, Vec::len)
    }
}

impl EventSource for FakeEventSource {
    fn listen(&self, anchor: AnchorId, event: DomEvent, callback: Rc<dyn Fn()>) -> Disposer {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state
                .listeners
                .entry((anchor, event))
                .or_default()
                .push((id, callback));
            id
        };
        let state = self.state.clone();
        Box::new(move || {
            if let Some(list) = state.borrow_mut().listeners.get_mut(&(anchor, event)) {
                list.retain(|(i, _)| *i != id);
            }
            Ok(())
        })
    }

    fn observe_intersection(&self, anchor: AnchorId, callback: Rc<dyn Fn(bool)>) -> Disposer {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state
                .intersections
                .entry(anchor)
                .or_default()
                .push((id, callback));
            id
        };
        let state = self.state.clone();
        Box::new(move || {
            if let Some(list) = state.borrow_mut().intersections.get_mut(&anchor) {
                list.retain(|(i, _)| *i != id);
            }
            Ok(())
        })
    }
}

/// An event source for non-DOM platforms: every registration is accepted
/// but never fires, so `interaction`/`hover`/`viewport` triggers become
/// inert (§4.A, §8 property 8) without special-casing at the call site.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSource;

impl EventSource for NullEventSource {
    fn listen(&self, _anchor: AnchorId, _event: DomEvent, _callback: Rc<dyn Fn()>) -> Disposer {
        super::noop_disposer()
    }

    fn observe_intersection(&self, _anchor: AnchorId, _callback: Rc<dyn Fn(bool)>) -> Disposer {
        super::noop_disposer()
    }
}
