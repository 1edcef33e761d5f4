use std::time::{Duration, Instant};

/// Heartbeat bookkeeping. The shard owns the sends; this tracks the schedule
/// and acknowledgement state.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Option<Duration>,
    next_beat: Option<Instant>,
    last_sent: Option<Instant>,
    last_received: Option<Instant>,
    acked: bool,
}

impl Heartbeat {
    pub fn new() -> Self {
        Heartbeat {
            interval: None,
            next_beat: None,
            last_sent: None,
            last_received: None,
            acked: true,
        }
    }

    /// Arm the periodic schedule. Any previous schedule is replaced.
    pub fn arm(&mut self, interval: Duration, now: Instant) {
        self.interval = Some(interval);
        self.next_beat = Some(now + interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
        self.next_beat = None;
    }

    pub fn armed(&self) -> bool {
        self.next_beat.is_some()
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next_beat.is_some_and(|at| now >= at)
    }

    /// Advance one tick, keeping the phase anchored to the schedule rather
    /// than to when the tick was observed.
    pub fn tick(&mut self) {
        if let (Some(at), Some(interval)) = (self.next_beat, self.interval) {
            self.next_beat = Some(at + interval);
        }
    }

    pub fn next_beat(&self) -> Option<Instant> {
        self.next_beat
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
        self.acked = false;
    }

    pub fn mark_acked(&mut self, now: Instant) {
        self.last_received = Some(now);
        self.acked = true;
    }

    pub fn acked(&self) -> bool {
        self.acked
    }

    /// Connection came up; a fresh socket owes us nothing yet.
    pub fn reset(&mut self) {
        *self = Heartbeat::new();
    }

    /// Round-trip of the last acknowledged beat. `None` while a beat is in
    /// flight or before the first exchange.
    pub fn latency(&self) -> Option<Duration> {
        let sent = self.last_sent?;
        self.last_received?.checked_duration_since(sent)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Heartbeat::new()
    }
}
