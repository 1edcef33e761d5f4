/// Byte budget for a guild-sync flush; envelope overhead leaves this much of
/// the 4 KiB frame limit for the id list.
pub const GUILD_SYNC_BUDGET: usize = 4081;

/// Byte budget for a member-fetch flush; its envelope carries more framing.
pub const MEMBER_FETCH_BUDGET: usize = 4048;

/// What the caller should do with an enqueued id.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchAction {
    /// Send the accumulated batch now; the new id starts the next one.
    Flush(Vec<String>),
    /// Session is live; send the id on its own.
    SendNow(String),
    /// Accumulated for a later flush.
    Queued,
}

/// Accumulates opaque ids until a flush would no longer fit in a single
/// 4 KiB frame. Each id costs its length plus 3 bytes of quote/separator
/// framing; the running length starts at 1 for the envelope bracket.
#[derive(Debug)]
pub struct SyncBatcher {
    queue: Vec<String>,
    length: usize,
    budget: usize,
}

impl SyncBatcher {
    pub fn new(budget: usize) -> Self {
        SyncBatcher {
            queue: Vec::new(),
            length: 1,
            budget,
        }
    }

    pub fn enqueue(&mut self, id: String, live: bool) -> BatchAction {
        let cost = id.len() + 3;

        if self.length + cost > self.budget {
            let batch = std::mem::take(&mut self.queue);
            self.length = 1 + cost;
            self.queue.push(id);
            return BatchAction::Flush(batch);
        }

        if live {
            return BatchAction::SendNow(id);
        }

        self.queue.push(id);
        self.length += cost;
        BatchAction::Queued
    }

    /// Take the whole backlog for flushing, if any.
    pub fn take(&mut self) -> Option<Vec<String>> {
        if self.queue.is_empty() {
            return None;
        }
        self.length = 1;
        Some(std::mem::take(&mut self.queue))
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.length = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_while_not_live() {
        let mut b = SyncBatcher::new(GUILD_SYNC_BUDGET);
        assert_eq!(b.enqueue("123".into(), false), BatchAction::Queued);
        assert_eq!(b.enqueue("456".into(), false), BatchAction::Queued);
        assert_eq!(b.take(), Some(vec!["123".to_owned(), "456".to_owned()]));
        assert_eq!(b.take(), None);
    }

    #[test]
    fn live_sessions_send_single_ids() {
        let mut b = SyncBatcher::new(GUILD_SYNC_BUDGET);
        assert_eq!(
            b.enqueue("789".into(), true),
            BatchAction::SendNow("789".to_owned())
        );
        assert!(b.is_empty());
    }

    #[test]
    fn flushes_at_the_byte_boundary_and_keeps_the_overflow_id() {
        let mut b = SyncBatcher::new(GUILD_SYNC_BUDGET);

        // 18-byte ids cost 21 each; 1 + 194*21 = 4075 <= 4081 < 4075 + 21
        let id = |i: usize| format!("{:018}", i);
        for i in 0..194 {
            assert_eq!(b.enqueue(id(i), false), BatchAction::Queued, "id {i}");
        }

        let action = b.enqueue(id(194), false);
        let BatchAction::Flush(batch) = action else {
            panic!("expected a flush, got {action:?}");
        };
        assert_eq!(batch.len(), 194);
        assert_eq!(batch[0], id(0));
        assert_eq!(batch[193], id(193));

        // the overflow id starts the next batch
        assert_eq!(b.take(), Some(vec![id(194)]));
    }

    #[test]
    fn flushed_ids_preserve_enqueue_order_across_batches() {
        let mut b = SyncBatcher::new(64);
        let mut flushed = Vec::new();
        let ids: Vec<String> = (0..40).map(|i| format!("{:010}", i)).collect();

        for id in &ids {
            match b.enqueue(id.clone(), false) {
                BatchAction::Flush(batch) => flushed.extend(batch),
                BatchAction::Queued => {}
                BatchAction::SendNow(_) => unreachable!("not live"),
            }
        }
        if let Some(rest) = b.take() {
            flushed.extend(rest);
        }

        assert_eq!(flushed, ids);
    }

    #[test]
    fn no_flush_exceeds_the_frame_limit() {
        let mut b = SyncBatcher::new(GUILD_SYNC_BUDGET);
        for i in 0..500 {
            let id = format!("{:018}", i);
            if let BatchAction::Flush(batch) = b.enqueue(id, false) {
                let encoded: usize = 1 + batch.iter().map(|id| id.len() + 3).sum::<usize>();
                assert!(encoded <= 4096, "flush of {} ids spans {encoded} bytes", batch.len());
            }
        }
    }
}
