//! Process-wide idle-callback coalescing (§5): at most one raw idle
//! callback is outstanding at any time, no matter how many `idle` triggers
//! are armed.

use std::cell::RefCell;

use super::{Clock, Disposer};

thread_local! {
    static QUEUE: RefCell<IdleQueue> = RefCell::new(IdleQueue::default());
}

#[derive(Default)]
struct IdleQueue {
    waiters: Vec<(u64, Box<dyn FnOnce()>)>,
    next_id: u64,
    /// `Some` while a raw idle callback is outstanding with the clock.
    outstanding: Option<Disposer>,
}

/// Arms `callback` on the shared idle queue, piggy-backing on any already
/// outstanding raw idle request rather than arming a new one.
///
/// Returns a disposer that removes just this waiter; if it was the last
/// one queued, the outstanding raw request is cancelled too.
pub fn request_idle(clock: &dyn Clock, callback: Box<dyn FnOnce()>) -> Disposer {
    let id = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.waiters.push((id, callback));

        if queue.outstanding.is_none() {
            queue.outstanding = Some(clock.request_idle(Box::new(fire)));
        }
        id
    });

    Box::new(move || {
        QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            queue.waiters.retain(|(waiter_id, _)| *waiter_id != id);
            if queue.waiters.is_empty() {
                if let Some(cancel) = queue.outstanding.take() {
                    drop(cancel);
                }
            }
        });
        Ok(())
    })
}

/// Invoked by the clock when the single outstanding idle callback fires.
/// Drains every queued waiter, in the order they armed, then clears the
/// outstanding flag so the next `request_idle` call arms a fresh one.
fn fire() {
    let waiters = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.outstanding = None;
        std::mem::take(&mut queue.waiters)
    });
    for (_, callback) in waiters {
        callback();
    }
}

/// The number of raw idle requests currently outstanding with the clock:
/// 0 or 1, never more. Exposed for tests asserting §8 property 4.
pub fn outstanding_count() -> usize {
    QUEUE.with(|queue| usize::from(queue.borrow().outstanding.is_some()))
}

/// Clears all queued waiters and the outstanding flag. Only meant for test
/// isolation between cases that share the thread-local queue.
pub fn reset_for_test() {
    QUEUE.with(|queue| {
        *queue.borrow_mut() = IdleQueue::default();
    });
}
