//! `on when(expr)`: the compiler lowers `expr` to a closure over the host's
//! reactive state; we poll it inside a reactive effect so the trigger fires
//! the first time the expression turns true without the instance needing to
//! know what signals it reads.

use std::rc::Rc;

use floem_reactive::create_effect;

use crate::{
    descriptor::WhenExpr,
    scheduler::{noop_disposer, Disposer},
};

pub fn arm(expr: &WhenExpr, on_fire: Rc<dyn Fn()>) -> Disposer {
    let predicate = expr.0.clone();
    create_effect(move |fired: Option<bool>| {
        if fired == Some(true) {
            return true;
        }
        if predicate() {
            on_fire();
            true
        } else {
            false
        }
    });
    // The underlying effect is torn down along with its enclosing scope; a
    // `when` trigger has nothing else to release once armed.
    noop_disposer()
}
