//! A minimal, busy-polled, single-threaded executor for running the
//! client's `async fn`s from ordinary synchronous code - matching
//! `accel-sim`'s own no-op-waker executor rather than pulling in
//! `tokio` for what is, at this layer, always a single in-flight
//! future with no real parallelism to schedule.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

fn no_op(_: *const ()) {}

fn clone(_: *const ()) -> RawWaker {
    RawWaker::new(std::ptr::null(), &VTABLE)
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);

fn noop_waker() -> Waker {
    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}

/// Drives `future` to completion on the current thread.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);
    loop {
        if let Poll::Ready(output) = Pin::new(&mut future).poll(&mut cx) {
            return output;
        }
    }
}
