use std::{
    sync::{atomic::Ordering, Arc, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use ::indoc::indoc;

use super::{
    pacing_state::PacingState,
    tick_signal::Wake,
    timer_loop::{self, TimerShared},
    FramePacer, PacerError, TimerThread, DEFAULT_FREQUENCY,
};

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePacer {
    /// Create a stopped pacer targeting [`DEFAULT_FREQUENCY`].
    pub fn new() -> Self {
        Self::with_frequency(DEFAULT_FREQUENCY)
    }

    /// Create a stopped pacer targeting `frequency` ticks per second. A zero
    /// frequency falls back to [`DEFAULT_FREQUENCY`].
    pub fn with_frequency(frequency: u32) -> Self {
        Self {
            shared: Arc::new(TimerShared::new(PacingState::new(frequency))),
            worker: Default::default(),
        }
    }

    /// Change the target frequency.
    ///
    /// Non-positive frequencies, and the frequency already in use, are
    /// ignored. Otherwise the nominal interval is reset to
    /// `1000 / frequency` milliseconds. A running timer picks the change up
    /// on its next iteration.
    pub fn configure(&self, frequency: i32) {
        let mut slot = self.shared.signal.lock();
        if slot.pacing.configure(frequency) {
            log::debug!(
                "frame pacer set to {}Hz, interval {}ms",
                slot.pacing.frequency(),
                slot.pacing.interval_ms()
            );
        } else {
            log::trace!("ignoring frame pacer frequency {}", frequency);
        }
    }

    /// Start the timer thread. Does nothing if it is already running.
    ///
    /// Any tick left over from a previous run is discarded, so the first
    /// tick a consumer sees comes from this run.
    pub fn start(&self) -> Result<(), PacerError> {
        let mut worker = self.lock_worker();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.signal.clear();

        let shared = self.shared.clone();
        let started_at = Instant::now();
        let handle = thread::Builder::new()
            .name("frame-pacer".into())
            .spawn(move || timer_loop::run(&shared))
            .map_err(|err| {
                self.shared.running.store(false, Ordering::SeqCst);
                PacerError::ThreadSpawnFailed(err)
            })?;

        log::info!(
            "frame pacer started at {}Hz",
            self.shared.signal.lock().pacing.frequency()
        );

        *worker = Some(TimerThread { handle, started_at });
        Ok(())
    }

    /// Stop the timer thread and wait for it to exit. Does nothing if it is
    /// not running.
    ///
    /// Every consumer blocked in [`Self::wait_for_tick`] is released. Once
    /// this returns no further ticks are produced.
    pub fn stop(&self) {
        let mut worker = self.lock_worker();
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.shared.signal.release_all();

        if let Some(TimerThread { handle, started_at }) = worker.take() {
            if handle.join().is_err() {
                log::error!("the frame pacer's timer thread panicked");
            }
            log::info!(
                indoc!(
                    "
                    frame pacer stopped
                      - ran for {:?}
                      - final interval {}ms"
                ),
                started_at.elapsed(),
                self.get_interval(),
            );
        }
    }

    /// Block until a tick arrives which no other call has consumed yet.
    ///
    /// Each tick releases every consumer blocked at the time it fires. A
    /// call to [`Self::stop`] from another thread releases every blocked
    /// consumer too. Always returns true.
    ///
    /// Calling this on a pacer which is not running blocks until it is
    /// started, or forever.
    pub fn wait_for_tick(&self) -> bool {
        self.shared.signal.wait(None);
        true
    }

    /// Like [`Self::wait_for_tick`], but gives up after `timeout`.
    ///
    /// Returns false if neither a tick nor a stop arrived in time.
    pub fn wait_for_tick_timeout(&self, timeout: Duration) -> bool {
        match self.shared.signal.wait(Some(timeout)) {
            Wake::Tick | Wake::Released => true,
            Wake::TimedOut => false,
        }
    }

    /// The nominal interval between ticks, in whole milliseconds.
    ///
    /// This reflects adjustments made by the timer to compensate for
    /// overruns, not only the configured frequency.
    pub fn get_interval(&self) -> u64 {
        self.shared.signal.lock().pacing.interval_ms()
    }

    /// The target frequency in ticks per second.
    pub fn frequency(&self) -> u32 {
        self.shared.signal.lock().pacing.frequency()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<TimerThread>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FramePacer {
    fn drop(&mut self) {
        self.stop();
    }
}
