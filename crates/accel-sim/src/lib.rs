//! Cooperative, single-threaded event loop that drives a device model in
//! lockstep with host coroutines, plus an in-process test double
//! (`AcceleratorCore` and its two wire-level wrappers) that stands in
//! for synthesised RTL when no real simulator binary or FPGA is
//! attached.
//!
//! The loop toggles a simulated clock pin, evaluates the device model,
//! then gives every registered task exactly one poll. That single
//! invariant - one poll per tick, no more - is what lets [`NextEvent`]
//! and the edge-detection futures stay simple: a future only needs to
//! remember what it saw last tick, never how many ticks have elapsed.

mod core;
mod executor;

pub use core::AcceleratorCore;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Named wires shared between the host coroutines and the device model.
///
/// Only the pins actually used by the UART and SPI framings are
/// modeled; there is no attempt at a general-purpose pin-bus
/// abstraction beyond what this crate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub clk: bool,
    pub rst_n: bool,
    pub ena: bool,
    pub uart_rxd: bool,
    pub uart_txd: bool,
    pub spi_sck: bool,
    pub spi_mosi: bool,
    pub spi_miso: bool,
    pub spi_ss: bool,
}

impl Pins {
    /// Idle line levels: UART lines high, SPI chip-select deasserted.
    #[must_use]
    pub fn idle() -> Self {
        Pins {
            clk: false,
            rst_n: false,
            ena: true,
            uart_rxd: true,
            uart_txd: true,
            spi_sck: false,
            spi_mosi: false,
            spi_miso: false,
            spi_ss: true,
        }
    }
}

/// A device model evaluated once per simulated tick (i.e. once per `clk`
/// toggle, same as `Vtop::eval()` in a Verilator harness).
pub trait DeviceModel {
    fn eval(&mut self, pins: &mut Pins);
}

struct HarnessCore<D> {
    pins: Pins,
    device: D,
    running: bool,
    ticks: u64,
}

/// Cloneable handle to the shared simulator state. Cheap to clone (an
/// `Rc` bump); cloning is how the main routine and a watchdog coroutine
/// both get to observe and drive the same simulation.
pub struct Harness<D> {
    core: Rc<RefCell<HarnessCore<D>>>,
}

impl<D> Clone for Harness<D> {
    fn clone(&self) -> Self {
        Harness {
            core: Rc::clone(&self.core),
        }
    }
}

impl<D: DeviceModel> Harness<D> {
    pub fn new(device: D) -> Self {
        Harness {
            core: Rc::new(RefCell::new(HarnessCore {
                pins: Pins::idle(),
                device,
                running: false,
                ticks: 0,
            })),
        }
    }

    #[must_use]
    pub fn pins(&self) -> Pins {
        self.core.borrow().pins
    }

    pub fn set_pins(&self, f: impl FnOnce(&mut Pins)) {
        f(&mut self.core.borrow_mut().pins);
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.core.borrow().ticks
    }

    /// Requests the event loop stop after the tasks currently scheduled
    /// for this tick finish being polled. Callable from any coroutine,
    /// including a watchdog.
    pub fn stop(&self) {
        self.core.borrow_mut().running = false;
    }

    /// Suspends until exactly one simulated tick has elapsed.
    pub fn next_event(&self) -> NextEvent<D> {
        NextEvent {
            _harness: self.clone(),
            polled: false,
        }
    }

    /// Suspends until `accessor` observes a false-to-true transition.
    pub fn rising_edge<F: Fn(&Pins) -> bool>(&self, accessor: F) -> EdgeFuture<D, F> {
        EdgeFuture::new(self.clone(), accessor, EdgeKind::Rising)
    }

    /// Suspends until `accessor` observes a true-to-false transition.
    pub fn falling_edge<F: Fn(&Pins) -> bool>(&self, accessor: F) -> EdgeFuture<D, F> {
        EdgeFuture::new(self.clone(), accessor, EdgeKind::Falling)
    }

    /// Suspends until `accessor` observes any change.
    pub fn edge<F: Fn(&Pins) -> bool>(&self, accessor: F) -> EdgeFuture<D, F> {
        EdgeFuture::new(self.clone(), accessor, EdgeKind::Either)
    }

    /// Suspends until `n` rising edges of `clk` have elapsed.
    pub async fn clocks(&self, n: u32) {
        for _ in 0..n {
            self.rising_edge(|p: &Pins| p.clk).await;
        }
    }

    /// Runs the event loop until every task in `tasks` completes or one
    /// of them calls [`Harness::stop`]. Each tick: flip `clk`, evaluate
    /// the device, poll every still-pending task exactly once.
    pub fn run(&self, mut tasks: Vec<Pin<Box<dyn Future<Output = ()>>>>) {
        self.core.borrow_mut().running = true;
        let waker = executor::noop_waker();
        let mut cx = Context::from_waker(&waker);

        loop {
            if !self.core.borrow().running || tasks.is_empty() {
                break;
            }
            {
                let mut core = self.core.borrow_mut();
                core.ticks += 1;
                core.pins.clk = !core.pins.clk;
                core.device.eval(&mut core.pins);
            }
            tasks.retain_mut(|task| task.as_mut().poll(&mut cx) == Poll::Pending);
        }
    }
}

/// A device model that does nothing to the pins; used when a harness is
/// only needed for its clock/tick pacing (e.g. a simulated transport
/// modeling transmission latency) and not for any pin-level protocol.
#[derive(Debug, Default)]
pub struct NullDevice;

impl DeviceModel for NullDevice {
    fn eval(&mut self, _pins: &mut Pins) {}
}

/// A bounded-lifetime companion coroutine that stops the loop if the
/// main routine never reaches an expected edge - otherwise a hung
/// awaitable would spin [`Harness::run`] forever.
pub async fn watchdog<D: DeviceModel>(harness: Harness<D>, max_clocks: u32) {
    harness.clocks(max_clocks).await;
    harness.stop();
}

/// Future returned by [`Harness::next_event`].
pub struct NextEvent<D> {
    _harness: Harness<D>,
    polled: bool,
}

impl<D> Future for NextEvent<D> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.polled {
            Poll::Ready(())
        } else {
            this.polled = true;
            Poll::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Rising,
    Falling,
    Either,
}

/// Future returned by [`Harness::rising_edge`]/`falling_edge`/`edge`.
pub struct EdgeFuture<D, F> {
    harness: Harness<D>,
    accessor: F,
    kind: EdgeKind,
    prev: bool,
}

impl<D: DeviceModel, F: Fn(&Pins) -> bool> EdgeFuture<D, F> {
    fn new(harness: Harness<D>, accessor: F, kind: EdgeKind) -> Self {
        let prev = accessor(&harness.pins());
        Self {
            harness,
            accessor,
            kind,
            prev,
        }
    }
}

impl<D: DeviceModel, F: Fn(&Pins) -> bool + Unpin> Future for EdgeFuture<D, F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let current = (this.accessor)(&this.harness.pins());
        let matched = match this.kind {
            EdgeKind::Rising => !this.prev && current,
            EdgeKind::Falling => this.prev && !current,
            EdgeKind::Either => this.prev != current,
        };
        this.prev = current;
        if matched {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;
    impl DeviceModel for Idle {
        fn eval(&mut self, _pins: &mut Pins) {}
    }

    #[test]
    fn clocks_counts_rising_edges_not_raw_ticks() {
        let harness = Harness::new(Idle);
        let observed = Rc::new(RefCell::new(0u32));
        let observed_task = Rc::clone(&observed);
        let h = harness.clone();
        let task: Pin<Box<dyn Future<Output = ()>>> = Box::pin(async move {
            h.clocks(5).await;
            *observed_task.borrow_mut() = 5;
        });
        harness.run(vec![task]);
        assert_eq!(*observed.borrow(), 5);
        // 5 rising edges of a pin toggled every tick takes 10 ticks.
        assert_eq!(harness.ticks(), 10);
    }

    #[test]
    fn watchdog_stops_a_hanging_task() {
        let harness = Harness::new(Idle);
        let hung: Pin<Box<dyn Future<Output = ()>>> = Box::pin(async move {
            loop {
                std::future::pending::<()>().await;
            }
        });
        let watchdog_task: Pin<Box<dyn Future<Output = ()>>> =
            Box::pin(watchdog(harness.clone(), 20));
        harness.run(vec![hung, watchdog_task]);
        assert!(harness.ticks() >= 40);
    }
}
