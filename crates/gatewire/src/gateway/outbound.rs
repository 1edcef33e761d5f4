use std::time::{Duration, Instant};

use serde_json::Value;

use crate::gateway::bucket::Bucket;
use crate::gateway::wire::Opcode;

const GLOBAL_LIMIT: u32 = 120;
const PRESENCE_LIMIT: u32 = 5;
const WINDOW: Duration = Duration::from_secs(60);

/// An outbound control frame waiting on rate-limit admission. Encoding
/// happens at transmit time, once every bucket has let it through.
#[derive(Debug, PartialEq)]
pub struct PendingFrame {
    pub op: Opcode,
    pub d: Value,
}

/// Serializes outbound frames through the global bucket; STATUS_UPDATE
/// additionally passes the presence bucket first, so it is limited by the
/// stricter of the two.
#[derive(Debug)]
pub struct SendQueue {
    global: Bucket<PendingFrame>,
    presence: Bucket<PendingFrame>,
}

impl SendQueue {
    pub fn new(now: Instant) -> Self {
        SendQueue {
            global: Bucket::new(GLOBAL_LIMIT, WINDOW, now),
            presence: Bucket::new(PRESENCE_LIMIT, WINDOW, now),
        }
    }

    /// Queue a frame and return whatever the buckets admit right now, in
    /// transmit order. `priority` front-inserts in the global bucket only.
    pub fn submit(&mut self, frame: PendingFrame, priority: bool, now: Instant) -> Vec<PendingFrame> {
        if frame.op == Opcode::StatusUpdate {
            self.presence.queue(frame, false);
        } else {
            self.global.queue(frame, priority);
        }
        self.poll(now)
    }

    /// Move window progress: presence admissions feed the global bucket, the
    /// global bucket feeds the wire.
    pub fn poll(&mut self, now: Instant) -> Vec<PendingFrame> {
        for frame in self.presence.drain(now) {
            self.global.queue(frame, false);
        }
        self.global.drain(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.global.next_reset(), self.presence.next_reset()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Drop all queued work. Bucket windows keep running; a reconnect does
    /// not grant fresh quota.
    pub fn clear(&mut self) {
        self.global.clear();
        self.presence.clear();
    }

    pub fn backlog(&self) -> usize {
        self.global.queued() + self.presence.queued()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(op: Opcode, tag: u64) -> PendingFrame {
        PendingFrame { op, d: json!(tag) }
    }

    #[test]
    fn status_updates_pass_both_buckets() {
        let t0 = Instant::now();
        let mut q = SendQueue::new(t0);

        // five status updates go straight through, the sixth waits a window
        for i in 0..5 {
            let out = q.submit(frame(Opcode::StatusUpdate, i), false, t0);
            assert_eq!(out.len(), 1, "status {i}");
        }
        assert!(q.submit(frame(Opcode::StatusUpdate, 5), false, t0).is_empty());

        // other traffic is not held back by the presence bucket
        let out = q.submit(frame(Opcode::Heartbeat, 99), false, t0);
        assert_eq!(out, vec![frame(Opcode::Heartbeat, 99)]);

        let out = q.poll(t0 + WINDOW);
        assert_eq!(out, vec![frame(Opcode::StatusUpdate, 5)]);
    }

    #[test]
    fn global_window_orders_submissions() {
        let t0 = Instant::now();
        let mut q = SendQueue::new(t0);

        let mut sent = Vec::new();
        for i in 0..130u64 {
            sent.extend(q.submit(frame(Opcode::SyncGuild, i), false, t0));
        }
        assert_eq!(sent.len(), 120);
        assert_eq!(q.backlog(), 10);

        let rest = q.poll(t0 + WINDOW);
        sent.extend(rest);
        let tags: Vec<u64> = sent.iter().map(|f| f.d.as_u64().unwrap()).collect();
        assert_eq!(tags, (0..130).collect::<Vec<_>>());
    }

    #[test]
    fn priority_frames_jump_the_global_backlog() {
        let t0 = Instant::now();
        let mut q = SendQueue::new(t0);

        for i in 0..121u64 {
            q.submit(frame(Opcode::SyncGuild, i), false, t0);
        }
        assert_eq!(q.backlog(), 1);

        q.submit(frame(Opcode::Heartbeat, 999), true, t0);
        let out = q.poll(t0 + WINDOW);
        assert_eq!(out[0], frame(Opcode::Heartbeat, 999));
        assert_eq!(out[1], frame(Opcode::SyncGuild, 120));
    }

    #[test]
    fn clear_drops_backlog_but_not_quota() {
        let t0 = Instant::now();
        let mut q = SendQueue::new(t0);
        for i in 0..125u64 {
            q.submit(frame(Opcode::SyncGuild, i), false, t0);
        }
        q.clear();
        assert_eq!(q.backlog(), 0);

        // same window: still exhausted
        assert!(q.submit(frame(Opcode::SyncGuild, 1), false, t0).is_empty());
    }
}
