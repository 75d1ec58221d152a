use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use super::pacing_state::PacingState;

/// How long before a sleep deadline the timer loop stops waiting on the
/// condition variable and hands over to `spin_sleep` for the rest.
const SPIN_THRESHOLD: Duration = Duration::from_millis(2);

/// Why a call to [`TickSignal::wait`] returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Wake {
    /// A tick was produced and this waiter consumed it.
    Tick,

    /// The pacer was stopped while this waiter was blocked.
    Released,

    /// The timeout elapsed first.
    TimedOut,
}

/// Everything guarded by the signal's mutex.
#[derive(Debug, Default)]
pub(super) struct SignalSlot {
    /// Set by a tick, cleared by whichever waiter consumes it.
    ready: bool,

    /// Bumped on every tick so that a broadcast releases every waiter which
    /// was blocked when the tick happened, not just the one that clears
    /// `ready`.
    ticks: u64,

    /// Bumped on every stop.
    releases: u64,

    /// Lives here so the timer loop's adjustments and `configure` share the
    /// same lock as the readiness flag.
    pub pacing: PacingState,
}

/// A single-slot rendezvous between the timer loop and any number of
/// consumers.
///
/// Ticks are coalesced: at most one unconsumed tick is ever buffered.
#[derive(Debug, Default)]
pub(super) struct TickSignal {
    slot: Mutex<SignalSlot>,
    condvar: Condvar,
}

impl TickSignal {
    pub fn new(pacing: PacingState) -> Self {
        Self {
            slot: Mutex::new(SignalSlot {
                pacing,
                ..SignalSlot::default()
            }),
            condvar: Condvar::new(),
        }
    }

    /// Lock the slot.
    ///
    /// The slot only holds plain values which are never left half-updated,
    /// so a poisoned lock is still usable.
    pub fn lock(&self) -> MutexGuard<'_, SignalSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a tick as ready and wake every waiter.
    pub fn raise(&self) {
        {
            let mut slot = self.lock();
            slot.ready = true;
            slot.ticks = slot.ticks.wrapping_add(1);
        }
        self.condvar.notify_all();
    }

    /// Release every blocked waiter without producing a tick.
    ///
    /// This also interrupts a timer loop blocked in [`Self::sleep_while`].
    pub fn release_all(&self) {
        {
            let mut slot = self.lock();
            slot.releases = slot.releases.wrapping_add(1);
        }
        self.condvar.notify_all();
    }

    /// Drop any tick which was never consumed.
    pub fn clear(&self) {
        self.lock().ready = false;
    }

    /// Block until a tick is available, the signal is released, or the
    /// optional timeout elapses.
    pub fn wait(&self, timeout: Option<Duration>) -> Wake {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut slot = self.lock();
        let ticks = slot.ticks;
        let releases = slot.releases;

        loop {
            if slot.ready || slot.ticks != ticks {
                slot.ready = false;
                return Wake::Tick;
            }
            if slot.releases != releases {
                return Wake::Released;
            }

            slot = match deadline {
                None => self
                    .condvar
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Wake::TimedOut;
                    }
                    self.condvar
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Sleep for `duration` as long as `keep_sleeping` holds.
    ///
    /// `keep_sleeping` is checked under the slot lock, so a caller which
    /// flips the condition and then calls [`Self::release_all`] always
    /// interrupts the sleep. The last [`SPIN_THRESHOLD`] of the sleep is
    /// done with `spin_sleep` for accuracy and is not interruptible.
    ///
    /// Returns false if the sleep was cut short.
    pub fn sleep_while<F>(&self, duration: Duration, keep_sleeping: F) -> bool
    where
        F: Fn() -> bool,
    {
        let deadline = Instant::now() + duration;
        let coarse = duration.saturating_sub(SPIN_THRESHOLD);

        if !coarse.is_zero() {
            let slot = self.lock();
            let (_slot, _result) = self
                .condvar
                .wait_timeout_while(slot, coarse, |_| keep_sleeping())
                .unwrap_or_else(PoisonError::into_inner);
        }

        if !keep_sleeping() {
            return false;
        }

        let now = Instant::now();
        if now < deadline {
            spin_sleep::sleep(deadline - now);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{sync::Arc, thread},
    };

    #[test]
    fn pending_tick_is_consumed_once() {
        let signal = TickSignal::default();
        signal.raise();

        assert_eq!(signal.wait(Some(Duration::from_millis(10))), Wake::Tick);
        assert_eq!(
            signal.wait(Some(Duration::from_millis(10))),
            Wake::TimedOut
        );
    }

    #[test]
    fn ticks_are_coalesced() {
        let signal = TickSignal::default();
        signal.raise();
        signal.raise();
        signal.raise();

        assert_eq!(signal.wait(Some(Duration::from_millis(10))), Wake::Tick);
        assert_eq!(
            signal.wait(Some(Duration::from_millis(10))),
            Wake::TimedOut
        );
    }

    #[test]
    fn clear_drops_a_stale_tick() {
        let signal = TickSignal::default();
        signal.raise();
        signal.clear();

        assert_eq!(
            signal.wait(Some(Duration::from_millis(10))),
            Wake::TimedOut
        );
    }

    #[test]
    fn release_does_not_leak_into_later_waits() {
        let signal = TickSignal::default();
        signal.release_all();

        assert_eq!(
            signal.wait(Some(Duration::from_millis(10))),
            Wake::TimedOut
        );
    }

    #[test]
    fn a_tick_wakes_every_blocked_waiter() {
        let signal = Arc::new(TickSignal::default());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.wait(Some(Duration::from_secs(5))))
            })
            .collect();

        // give every waiter a chance to block
        thread::sleep(Duration::from_millis(100));
        signal.raise();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Wake::Tick);
        }
    }

    #[test]
    fn release_wakes_every_blocked_waiter() {
        let signal = Arc::new(TickSignal::default());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.wait(Some(Duration::from_secs(5))))
            })
            .collect();

        thread::sleep(Duration::from_millis(100));
        let released_at = Instant::now();
        signal.release_all();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Wake::Released);
        }
        assert!(released_at.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_runs_to_completion() {
        let signal = TickSignal::default();
        let start = Instant::now();

        assert!(signal.sleep_while(Duration::from_millis(20), || true));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sleep_is_interrupted_by_release() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let signal = Arc::new(TickSignal::default());
        let awake = Arc::new(AtomicBool::new(true));

        let sleeper = {
            let signal = signal.clone();
            let awake = awake.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let completed = signal.sleep_while(Duration::from_secs(10), || {
                    awake.load(Ordering::SeqCst)
                });
                (completed, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(50));
        awake.store(false, Ordering::SeqCst);
        signal.release_all();

        let (completed, elapsed) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(2));
    }
}
