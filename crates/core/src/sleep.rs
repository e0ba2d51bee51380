use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(50);

/// Blocking delay used by the monitor loop.
pub trait Sleeper {
    /// Block for `d`, returning early once `stop` is raised.
    fn sleep(&mut self, d: Duration, stop: &AtomicBool);
}

/// Real sleeper: sleeps in short slices so an interrupt ends the wait promptly.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, d: Duration, stop: &AtomicBool) {
        let deadline = Instant::now() + d;
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(SLICE));
        }
    }
}

/// `base` with +/-`ratio` random jitter; `ratio <= 0` returns `base` unchanged.
pub fn jittered(base: Duration, ratio: f64) -> Duration {
    if ratio <= 0.0 || base.is_zero() {
        return base;
    }
    let secs = base.as_secs_f64();
    let jitter = secs * ratio;
    let actual = secs + rand::thread_rng().gen_range(-jitter..jitter);
    Duration::from_secs_f64(actual.max(0.01))
}
