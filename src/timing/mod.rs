mod frame_pacer;
mod pacer_error;
mod pacing_state;
mod tick_signal;
mod timer_loop;

use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::Instant,
};

pub use self::pacer_error::PacerError;

use self::timer_loop::TimerShared;

/// The frequency every new pacer starts with, in ticks per second.
pub const DEFAULT_FREQUENCY: u32 = 60;

/// The smallest nominal interval, in milliseconds, a pacer will ever use.
///
/// Overrun correction shrinks the interval and frequencies above 1kHz
/// truncate it to zero, both are clamped here.
pub const MIN_INTERVAL_MS: u64 = 1;

/// A render loop will generally run as fast as it possibly can. A frame pacer
/// runs a timer on a background thread which marks a frame as due at a target
/// frequency, and render threads block in [`FramePacer::wait_for_tick`] until
/// one is.
///
/// Ticks are coalesced rather than queued: a renderer which falls behind
/// sees at most one frame due, never a backlog. When the timer's own
/// bookkeeping overruns the interval, the interval is shortened to keep the
/// long-run tick rate near the target.
///
/// All methods take `&self` so a pacer can be shared between threads with an
/// `Arc`.
pub struct FramePacer {
    shared: Arc<TimerShared>,

    /// Start and stop serialize on this lock so there is never more than one
    /// timer thread and every started thread gets joined.
    worker: Mutex<Option<TimerThread>>,
}

/// The running timer thread and when it was started.
struct TimerThread {
    handle: JoinHandle<()>,
    started_at: Instant,
}
