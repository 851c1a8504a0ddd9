//! Sliding-window rate limiter in transactions-per-second units.
//!
//! A ring of the last `max_tps` event times. A caller may proceed when the
//! oldest ring entry is at least one second old; otherwise it sleeps the
//! deficit. Because consecutive events `k` and `k + max_tps` are spaced at
//! least one second apart by construction, any one-second window holds at
//! most `max_tps` events regardless of scheduling jitter.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

struct Ring {
    events: Vec<Option<Instant>>,
    next: usize,
}

/// Token-bucket style pacer for outbound fetches.
pub struct TpsRegulator {
    max_tps: i32,
    ring: Mutex<Ring>,
}

impl TpsRegulator {
    /// A non-positive `max_tps` disables regulation entirely.
    pub fn new(max_tps: i32) -> Self {
        let slots = if max_tps > 0 { max_tps as usize } else { 0 };
        Self {
            max_tps,
            ring: Mutex::new(Ring {
                events: vec![None; slots],
                next: 0,
            }),
        }
    }

    /// Blocks until the caller may proceed without exceeding the limit.
    pub fn wait(&self) {
        if self.max_tps <= 0 {
            return;
        }

        let proceed_at = {
            let mut ring = self.ring.lock().unwrap();
            let now = Instant::now();
            let slot = ring.next;
            let proceed_at = match ring.events[slot] {
                Some(oldest) if now < oldest + WINDOW => oldest + WINDOW,
                _ => now,
            };
            ring.events[slot] = Some(proceed_at);
            ring.next = (slot + 1) % ring.events.len();
            proceed_at
        };

        let now = Instant::now();
        if proceed_at > now {
            thread::sleep(proceed_at - now);
        }
    }

    /// Observed events in the trailing one-second window.
    pub fn get_tps(&self) -> f32 {
        if self.max_tps <= 0 {
            return 0.0;
        }
        let ring = self.ring.lock().unwrap();
        let now = Instant::now();
        ring.events
            .iter()
            .flatten()
            .filter(|&&event| now.saturating_duration_since(event) <= WINDOW)
            .count() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_regulator_never_blocks() {
        let regulator = TpsRegulator::new(0);
        let started = Instant::now();
        for _ in 0..1_000 {
            regulator.wait();
        }
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(regulator.get_tps(), 0.0);
    }

    #[test]
    fn burst_within_limit_is_immediate() {
        let regulator = TpsRegulator::new(50);
        let started = Instant::now();
        for _ in 0..50 {
            regulator.wait();
        }
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn exceeding_limit_sleeps_the_deficit() {
        let regulator = TpsRegulator::new(50);
        let started = Instant::now();
        for _ in 0..51 {
            regulator.wait();
        }
        // The 51st event must land a full window after the first.
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[test]
    fn get_tps_reflects_recent_events() {
        let regulator = TpsRegulator::new(100);
        for _ in 0..10 {
            regulator.wait();
        }
        let tps = regulator.get_tps();
        assert!((1.0..=10.0).contains(&tps), "tps={tps}");
    }
}
