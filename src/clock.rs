//! Sleep source for the sampling loop
//!
//! [`SystemClock`] sleeps the calling thread. [`SteppedClock`] parks the
//! sampling thread at the end of every iteration until a [`ClockDriver`]
//! releases it, which makes the loop advance one iteration at a time.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Source of the per-iteration pause
pub trait Clock: Send + Sync + 'static {
    fn sleep(&self, interval: Duration);
}

/// Real wall-clock sleeping
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Clock whose sleeps end only when the driver ticks
#[derive(Debug)]
pub struct SteppedClock {
    slept_tx: Sender<()>,
    tick_rx: Receiver<()>,
}

/// Controls a [`SteppedClock`] from another thread
#[derive(Debug)]
pub struct ClockDriver {
    slept_rx: Receiver<()>,
    tick_tx: Sender<()>,
}

impl SteppedClock {
    pub fn new() -> (Self, ClockDriver) {
        let (slept_tx, slept_rx) = unbounded();
        let (tick_tx, tick_rx) = unbounded();
        (
            Self { slept_tx, tick_rx },
            ClockDriver { slept_rx, tick_tx },
        )
    }
}

impl Clock for SteppedClock {
    fn sleep(&self, interval: Duration) {
        let _ = self.slept_tx.send(());
        if self.tick_rx.recv().is_err() {
            // Driver gone: fall back to real time so the loop cannot spin
            std::thread::sleep(interval);
        }
    }
}

impl ClockDriver {
    /// Wait until the sampling thread finishes an iteration and starts
    /// sleeping. Returns false on timeout.
    pub fn wait_for_sleep(&self, timeout: Duration) -> bool {
        match self.slept_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// End the current sleep
    pub fn tick(&self) {
        let _ = self.tick_tx.send(());
    }

    /// End the current sleep and wait for the next iteration to finish
    pub fn step(&self, timeout: Duration) -> bool {
        self.tick();
        self.wait_for_sleep(timeout)
    }
}
