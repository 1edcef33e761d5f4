use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-window rate limiter with a FIFO of deferred work. Deferred work is
/// stored as data, never closures; the owner decides what a drained item
/// means. Dropping the bucket drops queued items silently.
#[derive(Debug)]
pub struct Bucket<T> {
    capacity: u32,
    window: Duration,
    remaining: u32,
    reset_at: Instant,
    queue: VecDeque<T>,
}

impl<T> Bucket<T> {
    pub fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        Bucket {
            capacity,
            window,
            remaining: capacity,
            reset_at: now + window,
            queue: VecDeque::new(),
        }
    }

    /// Append an item; `priority` front-inserts. Call [`Bucket::drain`]
    /// afterwards to collect whatever the current window admits.
    pub fn queue(&mut self, item: T, priority: bool) {
        if priority {
            self.queue.push_front(item);
        } else {
            self.queue.push_back(item);
        }
    }

    /// Refill if the window has rolled over, then release queued items in
    /// order until the window is exhausted.
    pub fn drain(&mut self, now: Instant) -> Vec<T> {
        self.refresh(now);

        let mut released = Vec::new();
        while self.remaining > 0 {
            let Some(item) = self.queue.pop_front() else {
                break;
            };
            self.remaining -= 1;
            released.push(item);
        }
        released
    }

    fn refresh(&mut self, now: Instant) {
        if now < self.reset_at {
            return;
        }
        // advance in whole window steps so the schedule stays fixed
        while self.reset_at <= now {
            self.reset_at += self.window;
        }
        self.remaining = self.capacity;
    }

    /// Next instant at which queued work can make progress.
    pub fn next_reset(&self) -> Option<Instant> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.reset_at)
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(capacity: u32, now: Instant) -> Bucket<u32> {
        Bucket::new(capacity, Duration::from_secs(60), now)
    }

    #[test]
    fn admits_up_to_capacity_in_order() {
        let t0 = Instant::now();
        let mut b = bucket(3, t0);
        for i in 0..5 {
            b.queue(i, false);
        }

        assert_eq!(b.drain(t0), vec![0, 1, 2]);
        assert_eq!(b.drain(t0), Vec::<u32>::new());
        assert_eq!(b.queued(), 2);
    }

    #[test]
    fn window_rollover_releases_backlog_in_order() {
        let t0 = Instant::now();
        let mut b = bucket(2, t0);
        for i in 0..5 {
            b.queue(i, false);
        }

        assert_eq!(b.drain(t0), vec![0, 1]);
        assert_eq!(b.next_reset(), Some(t0 + Duration::from_secs(60)));
        assert_eq!(b.drain(t0 + Duration::from_secs(60)), vec![2, 3]);
        assert_eq!(b.drain(t0 + Duration::from_secs(120)), vec![4]);
        assert_eq!(b.next_reset(), None);
    }

    #[test]
    fn priority_jumps_the_queue() {
        let t0 = Instant::now();
        let mut b = bucket(1, t0);
        b.queue(1, false);
        b.queue(2, false);
        assert_eq!(b.drain(t0), vec![1]);

        b.queue(99, true);
        assert_eq!(b.drain(t0 + Duration::from_secs(60)), vec![99]);
        assert_eq!(b.drain(t0 + Duration::from_secs(120)), vec![2]);
    }

    #[test]
    fn missed_windows_only_refill_once() {
        let t0 = Instant::now();
        let mut b = bucket(1, t0);
        for i in 0..4 {
            b.queue(i, false);
        }
        assert_eq!(b.drain(t0), vec![0]);

        // three windows pass unobserved; only one capacity's worth comes out
        let late = t0 + Duration::from_secs(190);
        assert_eq!(b.drain(late), vec![1]);
        assert_eq!(b.queued(), 2);
    }

    #[test]
    fn clear_drops_backlog_silently() {
        let t0 = Instant::now();
        let mut b = bucket(1, t0);
        b.queue(1, false);
        b.queue(2, false);
        assert_eq!(b.drain(t0), vec![1]);

        b.clear();
        assert_eq!(b.drain(t0 + Duration::from_secs(60)), Vec::<u32>::new());
    }
}
