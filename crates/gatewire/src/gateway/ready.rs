use std::time::Instant;

use hashbrown::{HashMap, HashSet};

/// Tracks what still stands between a fresh session and the `ready` signal:
/// unavailable guilds from the READY payload, guild syncs awaiting GUILD_SYNC,
/// and outstanding member-chunk requests.
#[derive(Debug, Default)]
pub struct ReadyGate {
    ready: bool,
    bot: bool,
    unavailable: HashSet<String>,
    unsynced_guilds: u32,
    pending_chunks: HashMap<String, u32>,
    guild_create_deadline: Option<Instant>,
    /// Set when the guild-create timer expired; remaining unavailable guilds
    /// no longer gate readiness.
    timed_out: bool,
}

impl ReadyGate {
    pub fn new() -> Self {
        ReadyGate {
            bot: true,
            ..Default::default()
        }
    }

    /// Start gating a fresh session from its READY payload.
    pub fn begin(&mut self, bot: bool, unavailable: impl IntoIterator<Item = String>) {
        *self = ReadyGate::new();
        self.bot = bot;
        self.unavailable = unavailable.into_iter().collect();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Called exactly once per session, by the shard, when every gate drains.
    pub fn mark_ready(&mut self) {
        self.ready = true;
        self.guild_create_deadline = None;
    }

    pub fn bot(&self) -> bool {
        self.bot
    }

    pub fn note_sync_requested(&mut self) {
        self.unsynced_guilds += 1;
    }

    pub fn note_guild_synced(&mut self) {
        self.unsynced_guilds = self.unsynced_guilds.saturating_sub(1);
    }

    pub fn unsynced_guilds(&self) -> u32 {
        self.unsynced_guilds
    }

    /// A GUILD_CREATE arrived; returns true when the guild was one of the
    /// unavailable set.
    pub fn note_guild_create(&mut self, guild_id: &str) -> bool {
        self.unavailable.remove(guild_id)
    }

    pub fn note_chunk_requested(&mut self, guild_id: &str) {
        *self.pending_chunks.entry(guild_id.to_owned()).or_insert(0) += 1;
    }

    /// A GUILD_MEMBERS_CHUNK arrived; decrement-then-remove at one.
    pub fn note_chunk(&mut self, guild_id: &str) {
        let Some(count) = self.pending_chunks.get_mut(guild_id) else {
            return;
        };
        if *count > 1 {
            *count -= 1;
        } else {
            self.pending_chunks.remove(guild_id);
        }
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending_chunks.len()
    }

    pub fn arm_guild_create_timer(&mut self, deadline: Instant) {
        self.guild_create_deadline = Some(deadline);
    }

    pub fn guild_create_deadline(&self) -> Option<Instant> {
        self.guild_create_deadline
    }

    pub fn guild_create_timer_due(&self, now: Instant) -> bool {
        self.guild_create_deadline.is_some_and(|at| now >= at)
    }

    /// The guild-create timer expired: stop waiting on whatever never came.
    /// Returns how many unavailable guilds were abandoned.
    pub fn expire_guild_create_timer(&mut self) -> usize {
        self.guild_create_deadline = None;
        self.timed_out = true;
        let abandoned = self.unavailable.len();
        self.unavailable.clear();
        abandoned
    }

    /// Counters this gate owns are drained (the shard checks the backlog
    /// queues separately).
    pub fn counters_drained(&self) -> bool {
        (self.unavailable.is_empty() || self.timed_out)
            && self.unsynced_guilds == 0
            && self.pending_chunks.is_empty()
    }

    pub fn reset(&mut self) {
        *self = ReadyGate::new();
    }
}
