use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use super::{pacing_state::PacingState, tick_signal::TickSignal};

/// State shared between a [`super::FramePacer`] and its timer thread.
#[derive(Debug)]
pub(super) struct TimerShared {
    pub running: AtomicBool,
    pub signal: TickSignal,
}

impl TimerShared {
    pub fn new(pacing: PacingState) -> Self {
        Self {
            running: AtomicBool::new(false),
            signal: TickSignal::new(pacing),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The body of the timer thread. Produces one tick per iteration until the
/// running flag is cleared.
pub(super) fn run(shared: &TimerShared) {
    let mut ticks: u64 = 0;

    while shared.is_running() {
        let frame_start = Instant::now();
        shared.signal.raise();
        ticks += 1;
        let work = frame_start.elapsed();

        let remaining = {
            let mut slot = shared.signal.lock();
            if let Some(overrun) = slot.pacing.apply_overrun(work) {
                log::debug!(
                    "tick {} overran by {}ms, interval is now {}ms",
                    ticks,
                    overrun,
                    slot.pacing.interval_ms()
                );
            }
            slot.pacing.remaining_after(work)
        };

        log::trace!("tick {} took {:?}", ticks, work);

        if let Some(remaining) = remaining {
            shared
                .signal
                .sleep_while(remaining, || shared.is_running());
        }
    }

    log::debug!("timer loop exiting after {} ticks", ticks);
}
