use std::time;

/// Decides when the next poll cycle is due.
///
/// The first tick always fires; after that a tick fires once `interval` has
/// passed since the previous one fired.
#[derive(Debug)]
pub struct Scheduler {
    interval: time::Duration,
    last_run: Option<time::Instant>,
}

impl Scheduler {
    pub fn new(interval: time::Duration) -> Self {
        Scheduler {
            interval,
            last_run: None,
        }
    }

    pub fn interval(&self) -> time::Duration {
        self.interval
    }

    pub fn tick(&mut self, now: time::Instant) -> bool {
        let due = match self.last_run {
            None => true,
            Some(last_run) => now.saturating_duration_since(last_run) >= self.interval,
        };
        if due {
            self.last_run = Some(now);
        }
        due
    }

    /// How long the caller can idle before the next tick is due.
    pub fn remaining(&self, now: time::Instant) -> time::Duration {
        match self.last_run {
            None => time::Duration::from_secs(0),
            Some(last_run) => {
                let elapsed = now.saturating_duration_since(last_run);
                self.interval
                    .checked_sub(elapsed)
                    .unwrap_or_else(|| time::Duration::from_secs(0))
            }
        }
    }
}
