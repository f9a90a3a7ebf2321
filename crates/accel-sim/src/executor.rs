//! A no-op waker for the harness's busy-repolled executor.
//!
//! Readiness in this simulator is entirely a function of simulator/pin
//! state that [`super::Harness::run`] re-checks every tick regardless of
//! whether anything calls `wake()`. A real waker would have nothing
//! useful to do, so this one does nothing at all.

use std::task::{RawWaker, RawWakerVTable, Waker};

fn no_op(_: *const ()) {}

fn clone(_: *const ()) -> RawWaker {
    RawWaker::new(std::ptr::null(), &VTABLE)
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);

pub fn noop_waker() -> Waker {
    let raw = RawWaker::new(std::ptr::null(), &VTABLE);
    unsafe { Waker::from_raw(raw) }
}
