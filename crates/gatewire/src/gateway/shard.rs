use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::error::Error;
use crate::event::{DomainSink, Event, ReadyData};
use crate::gateway::batch::{BatchAction, SyncBatcher, GUILD_SYNC_BUDGET, MEMBER_FETCH_BUDGET};
use crate::gateway::close::{self, Retry, SessionImpact};
use crate::gateway::codec::FrameCodec;
use crate::gateway::heartbeat::Heartbeat;
use crate::gateway::outbound::{PendingFrame, SendQueue};
use crate::gateway::ready::ReadyGate;
use crate::gateway::transport::{Connector, ReadyState, Transport, TransportEvent, WireMessage};
use crate::gateway::wire::{self, Envelope, Hello, Opcode, GATEWAY_VERSION};
use crate::gateway::{ConnectionStatus, ShardSignal};
use crate::presence::{Activity, Presence, Status};

const INITIAL_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);
const MAX_RECONNECT_INTERVAL: Duration = Duration::from_millis(30_000);

/// One gateway session: socket, handshake, heartbeats, dispatch, reconnect.
///
/// The shard is poll-driven. The host calls [`Shard::drive`] whenever the
/// transport wakes it or [`Shard::next_deadline`] passes, then drains
/// [`Shard::try_recv`].
pub struct Shard {
    config: Config,
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    codec: Option<FrameCodec>,

    status: ConnectionStatus,
    session_id: Option<String>,
    seq: u64,
    trace: Vec<String>,
    /// Set from the READY packet until the ready gate drains.
    pre_ready: bool,

    connect_attempts: u32,
    reconnect_interval: Duration,
    reconnect_at: Option<Instant>,
    connect_deadline: Option<Instant>,

    heartbeat: Heartbeat,
    sendq: SendQueue,
    gate: ReadyGate,
    guild_sync: SyncBatcher,
    member_fetch: SyncBatcher,

    presence: Option<Presence>,
    signals: VecDeque<ShardSignal>,
}

impl Shard {
    pub fn new(config: Config, connector: Box<dyn Connector>, now: Instant) -> Shard {
        let presence = config.presence.clone();
        Shard {
            config,
            connector,
            transport: None,
            codec: None,
            status: ConnectionStatus::Disconnected,
            session_id: None,
            seq: 0,
            trace: Vec::new(),
            pre_ready: false,
            connect_attempts: 0,
            reconnect_interval: INITIAL_RECONNECT_INTERVAL,
            reconnect_at: None,
            connect_deadline: None,
            heartbeat: Heartbeat::new(),
            sendq: SendQueue::new(now),
            gate: ReadyGate::new(),
            guild_sync: SyncBatcher::new(GUILD_SYNC_BUDGET),
            member_fetch: SyncBatcher::new(MEMBER_FETCH_BUDGET),
            presence,
            signals: VecDeque::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn server_trace(&self) -> &[String] {
        &self.trace
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.latency()
    }

    pub fn presence(&self) -> Option<&Presence> {
        self.presence.as_ref()
    }

    pub fn try_recv(&mut self) -> Option<ShardSignal> {
        self.signals.pop_front()
    }

    /// Earliest instant at which `drive` has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.connect_deadline,
            self.heartbeat.next_beat(),
            self.gate.guild_create_deadline(),
            self.reconnect_at,
            self.sendq.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Open the gateway socket. A shard with a live socket reports an error
    /// and changes nothing.
    pub fn connect(&mut self, now: Instant) {
        if let Some(t) = &self.transport {
            if t.ready_state() != ReadyState::Closed {
                error!("connect() called while a socket exists");
                self.signals
                    .push_back(ShardSignal::Error(Error::AlreadyConnected));
                return;
            }
        }
        if self.config.token.is_empty() {
            self.signals
                .push_back(ShardSignal::Error(Error::MissingToken));
            return;
        }

        self.connect_attempts += 1;
        self.reconnect_at = None;
        self.status = ConnectionStatus::Connecting;
        self.connect_deadline = Some(now + self.config.connection_timeout);
        self.codec = Some(FrameCodec::new(
            self.config.encoding,
            self.config.compress,
            self.config.inflate,
        ));
        self.heartbeat.reset();

        let url = self.build_url();
        debug!(attempt = self.connect_attempts, url = %url, "opening gateway connection");
        match self.connector.open(&url, &self.config.transport) {
            Ok(t) => self.transport = Some(t),
            Err(err) => {
                error!("failed to open gateway socket: {err}");
                self.signals.push_back(ShardSignal::Error(err));
                self.status = ConnectionStatus::Disconnected;
                self.connect_deadline = None;
                self.codec = None;
                if self.config.autoreconnect {
                    self.arm_reconnect(now);
                }
            }
        }
    }

    /// Stop the session for good: timers cleared, socket closed, queued work
    /// dropped, session identity forgotten.
    pub fn disconnect(&mut self, now: Instant) {
        self.teardown(false, None, now);
        self.hard_reset(now);
    }

    /// Process transport events and due timers. All state transitions happen
    /// inside this call; everything observable lands in the signal queue.
    #[profiling::function]
    pub fn drive(&mut self, now: Instant, sink: &mut dyn DomainSink) {
        self.poll_transport(now, sink);
        self.run_timers(now);
        self.pump_sends(now);
    }

    // ------------------------------------------------------------------
    // Public outbound operations
    // ------------------------------------------------------------------

    /// Mutate the presence snapshot and announce it. Limited by the presence
    /// bucket and the global bucket, in that order.
    pub fn update_status(&mut self, status: Status, game: Option<Activity>, now: Instant) {
        let mut presence = self.presence.clone().unwrap_or_default();
        presence.status = status;
        presence.game = game;
        self.presence = Some(presence.clone());

        match serde_json::to_value(&presence) {
            Ok(d) => self.send_frame(Opcode::StatusUpdate, d, false, now),
            Err(err) => error!("failed to encode presence: {err}"),
        }
    }

    /// Outbound voice state only; voice media is out of scope here.
    pub fn update_voice_state(
        &mut self,
        guild_id: &str,
        channel_id: Option<&str>,
        self_mute: bool,
        self_deaf: bool,
        now: Instant,
    ) {
        let update = wire::VoiceStateUpdate {
            guild_id,
            channel_id,
            self_mute,
            self_deaf,
        };
        match serde_json::to_value(&update) {
            Ok(d) => self.send_frame(Opcode::VoiceStateUpdate, d, false, now),
            Err(err) => error!("failed to encode voice state: {err}"),
        }
    }

    /// Ask the gateway to stream a guild's state. Batched under the 4 KiB
    /// frame budget until the session is live.
    pub fn sync_guild(&mut self, guild_id: impl Into<String>, now: Instant) {
        self.sync_guild_inner(guild_id.into(), now);
    }

    /// Request the full member list of a guild, batched like `sync_guild`.
    pub fn request_guild_members(&mut self, guild_id: impl Into<String>, now: Instant) {
        self.request_guild_members_inner(guild_id.into(), now);
    }

    /// Escape hatch for ops the shard has no dedicated method for. Still
    /// observes the global bucket.
    pub fn send_raw(&mut self, op: Opcode, d: Value, now: Instant) {
        self.send_frame(op, d, false, now);
    }

    // ------------------------------------------------------------------
    // Transport plumbing
    // ------------------------------------------------------------------

    fn poll_transport(&mut self, now: Instant, sink: &mut dyn DomainSink) {
        loop {
            let event = match self.transport.as_mut() {
                Some(t) => t.try_recv(),
                None => return,
            };
            let Some(event) = event else { return };

            match event {
                TransportEvent::Opened => self.on_open(),
                TransportEvent::Message(msg) => self.on_message(msg, now, sink),
                TransportEvent::Error(e) => {
                    error!("gateway socket error: {e}");
                    self.teardown(true, Some(Error::Transport(e)), now);
                }
                TransportEvent::Closed {
                    code,
                    reason,
                    clean,
                } => self.on_close(code, &reason, clean, now),
            }
        }
    }

    fn on_open(&mut self) {
        debug!("gateway socket open");
        self.status = ConnectionStatus::Handshaking;
        self.connect_deadline = None;
        self.signals.push_back(ShardSignal::Connect);
    }

    fn on_message(&mut self, msg: WireMessage, now: Instant, sink: &mut dyn DomainSink) {
        let fed = match self.codec.as_mut() {
            Some(c) => c.feed(msg),
            None => return,
        };
        if let Err(err) = fed {
            self.teardown(true, Some(err), now);
            return;
        }

        loop {
            // a control op may have torn the session down mid-loop
            let polled = match self.codec.as_mut() {
                Some(c) => c.poll_envelope(),
                None => break,
            };
            match polled {
                Ok(Some(env)) => self.handle_envelope(env, now, sink),
                Ok(None) => break,
                Err(err @ Error::Inflate(_)) => {
                    self.teardown(true, Some(err), now);
                    break;
                }
                Err(err) => warn!("dropping undecodable frame: {err}"),
            }
        }
    }

    fn on_close(&mut self, code: Option<u16>, reason: &str, clean: bool, now: Instant) {
        warn!(?code, reason, clean, "gateway connection closed");
        let disposition = close::classify(code, reason, clean);

        match disposition.impact {
            SessionImpact::Preserve => {}
            SessionImpact::DropSeq => self.seq = 0,
            SessionImpact::DropSession => {
                self.seq = 0;
                self.session_id = None;
            }
        }

        let reconnect = match disposition.retry {
            Retry::Auto | Retry::PerConfig => true,
            Retry::Fatal => false,
        };
        self.teardown(reconnect, disposition.error, now);
    }

    /// The single cancellation path. Clears timers, detaches the socket,
    /// drops queued work, and emits `Disconnect` exactly once per session.
    /// `reconnect` re-arms the backoff timer when the client allows it.
    fn teardown(&mut self, reconnect: bool, error: Option<Error>, now: Instant) {
        if self.transport.is_none() && self.status == ConnectionStatus::Disconnected {
            return;
        }

        self.heartbeat.disarm();
        self.connect_deadline = None;

        if let Some(mut transport) = self.transport.take() {
            // terminate when a resume is intended so the server keeps the
            // session alive; otherwise part cleanly
            if reconnect && self.session_id.is_some() {
                transport.terminate();
            } else {
                transport.close(1000);
            }
        }
        self.codec = None;
        self.sendq.clear();
        self.guild_sync.clear();
        self.member_fetch.clear();
        self.gate.reset();
        self.pre_ready = false;
        self.status = ConnectionStatus::Disconnected;

        if let Some(err) = &error {
            error!("gateway disconnected: {err}");
        }
        self.signals.push_back(ShardSignal::Disconnect(error));

        if reconnect && self.config.autoreconnect {
            self.arm_reconnect(now);
        }
    }

    /// Forget the session entirely; the next connect identifies from scratch.
    fn hard_reset(&mut self, now: Instant) {
        self.seq = 0;
        self.session_id = None;
        self.trace.clear();
        self.reconnect_interval = INITIAL_RECONNECT_INTERVAL;
        self.reconnect_at = None;
        self.connect_attempts = 0;
        self.presence = self.config.presence.clone();
        self.heartbeat.reset();
        self.sendq = SendQueue::new(now);
    }

    fn arm_reconnect(&mut self, now: Instant) {
        debug!("reconnecting in {:?}", self.reconnect_interval);
        self.reconnect_at = Some(now + self.reconnect_interval);

        let factor: f64 = rand::rng().random_range(1.0..3.0);
        let next = (self.reconnect_interval.as_millis() as f64 * factor).round() as u64;
        self.reconnect_interval = Duration::from_millis(next).min(MAX_RECONNECT_INTERVAL);
    }

    fn run_timers(&mut self, now: Instant) {
        if self.connect_deadline.is_some_and(|at| now >= at) {
            self.connect_deadline = None;
            if self.status == ConnectionStatus::Connecting {
                warn!("connection timed out");
                self.teardown(true, Some(Error::ConnectionTimeout), now);
            }
        }

        if self.heartbeat.due(now) {
            if !self.heartbeat.acked() {
                self.teardown(true, Some(Error::HeartbeatLost), now);
            } else {
                self.heartbeat.tick();
                self.send_heartbeat(now);
            }
        }

        if self.gate.guild_create_timer_due(now) {
            let abandoned = self.gate.expire_guild_create_timer();
            if abandoned > 0 {
                let msg = format!("{abandoned} unavailable guilds never arrived");
                warn!("{msg}");
                self.signals.push_back(ShardSignal::Warn(msg));
            }
            self.check_ready(now);
        }

        if self.reconnect_at.is_some_and(|at| now >= at) {
            self.reconnect_at = None;
            debug!("reconnect timer fired");
            self.connect(now);
        }
    }

    // ------------------------------------------------------------------
    // Inbound dispatch
    // ------------------------------------------------------------------

    fn handle_envelope(&mut self, env: Envelope, now: Instant, sink: &mut dyn DomainSink) {
        if self.config.raw_frames {
            self.signals.push_back(ShardSignal::Raw(env.clone()));
        }

        // seq moves before anything else can observe the frame
        if let Some(s) = env.s {
            if s > self.seq + 1
                && self.transport.is_some()
                && self.status != ConnectionStatus::Resuming
            {
                let msg = format!("Non-consecutive sequence number, {} -> {}", self.seq, s);
                warn!("{msg}");
                self.signals.push_back(ShardSignal::Warn(msg));
            }
            self.seq = s;
        }

        let Some(op) = Opcode::from_u8(env.op) else {
            debug!(op = env.op, "unknown opcode");
            self.signals.push_back(ShardSignal::Unknown(env));
            return;
        };

        match op {
            Opcode::Dispatch => self.handle_dispatch(env, now, sink),
            Opcode::Heartbeat => self.send_heartbeat(now),
            Opcode::InvalidSession => {
                warn!("invalid session, re-identifying");
                self.seq = 0;
                self.session_id = None;
                self.identify(now);
            }
            Opcode::Reconnect => {
                debug!("server requested reconnect");
                self.teardown(true, None, now);
            }
            Opcode::Hello => self.handle_hello(env.d, now),
            Opcode::HeartbeatAck => self.heartbeat.mark_acked(now),
            other => {
                debug!(?other, "unexpected inbound opcode");
                self.signals.push_back(ShardSignal::Unknown(env));
            }
        }
    }

    fn handle_hello(&mut self, d: Value, now: Instant) {
        let hello: Hello = match serde_json::from_value(d) {
            Ok(h) => h,
            Err(err) => {
                warn!("malformed HELLO payload: {err}");
                Hello {
                    heartbeat_interval: 0,
                    trace: Vec::new(),
                }
            }
        };

        self.trace = hello.trace.clone();
        self.signals.push_back(ShardSignal::Hello { trace: hello.trace });

        // a session-less shard must identify; anything else gets resumed
        if self.session_id.is_some() {
            self.status = ConnectionStatus::Resuming;
            self.resume(now);
        } else {
            self.identify(now);
        }

        if hello.heartbeat_interval > 0 {
            self.heartbeat
                .arm(Duration::from_millis(hello.heartbeat_interval), now);
            self.send_heartbeat(now);
        }
    }

    fn handle_dispatch(&mut self, env: Envelope, now: Instant, sink: &mut dyn DomainSink) {
        let Some(name) = env.t else {
            debug!("dispatch frame without an event name");
            return;
        };
        let seq = env.s;

        let mut event = match Event::from_wire(&name, env.d) {
            Event::Unknown(name, d) => {
                debug!(name = %name, "unknown dispatch event");
                self.signals.push_back(ShardSignal::Unknown(Envelope {
                    op: Opcode::Dispatch.as_u8(),
                    d,
                    s: seq,
                    t: Some(name),
                }));
                return;
            }
            event => event,
        };

        match &mut event {
            Event::Ready(d) => self.handle_ready_packet(d.clone(), now),
            Event::Resumed(_) => self.handle_resumed(),
            Event::GuildCreate(d) => {
                if !self.gate.is_ready() {
                    if let Some(id) = d["id"].as_str() {
                        if self.gate.note_guild_create(id) {
                            self.gate
                                .arm_guild_create_timer(now + self.config.guild_create_timeout);
                            self.check_ready(now);
                        }
                    }
                }
            }
            Event::GuildMembersChunk(d) => {
                if let Some(id) = d["guild_id"].as_str() {
                    self.gate.note_chunk(id);
                }
                self.check_ready(now);
            }
            Event::GuildSync(_) => {
                self.gate.note_guild_synced();
                self.check_ready(now);
            }
            Event::PresencesReplace(d) => {
                if let Value::Array(entries) = d {
                    let before = entries.len();
                    entries.retain(|p| p.get("user").is_some_and(Value::is_object));
                    let dropped = before - entries.len();
                    if dropped > 0 {
                        let msg =
                            format!("dropped {dropped} malformed entries in PRESENCES_REPLACE");
                        warn!("{msg}");
                        self.signals.push_back(ShardSignal::Warn(msg));
                    }
                }
            }
            _ => {}
        }

        if self.config.disable_events.contains(event.name()) {
            return;
        }
        sink.apply(&event);
        if self.status == ConnectionStatus::Ready && !self.pre_ready {
            self.signals.push_back(ShardSignal::Event(event));
        }
    }

    fn handle_ready_packet(&mut self, d: Value, now: Instant) {
        self.connect_attempts = 0;
        self.reconnect_interval = INITIAL_RECONNECT_INTERVAL;
        self.status = ConnectionStatus::Ready;
        self.pre_ready = true;
        self.signals.push_back(ShardSignal::PreReady);

        let data: ReadyData = match serde_json::from_value(d) {
            Ok(data) => data,
            Err(err) => {
                warn!("malformed READY payload: {err}");
                self.gate.begin(true, Vec::new());
                self.check_ready(now);
                return;
            }
        };

        self.session_id = Some(data.session_id);
        if !data.trace.is_empty() {
            self.trace = data.trace;
        }

        let unavailable: Vec<String> = data
            .guilds
            .iter()
            .filter(|g| g.unavailable)
            .map(|g| g.id.clone())
            .collect();
        let has_unavailable = !unavailable.is_empty();
        self.gate.begin(data.user.bot, unavailable);

        if !self.gate.bot() {
            for g in &data.guilds {
                self.sync_guild_inner(g.id.clone(), now);
            }
        }
        if self.config.get_all_users {
            for g in &data.guilds {
                let big = g.large || g.member_count.unwrap_or(0) > self.config.large_threshold;
                if !g.unavailable && big {
                    self.request_guild_members_inner(g.id.clone(), now);
                }
            }
        }

        if has_unavailable {
            self.gate
                .arm_guild_create_timer(now + self.config.guild_create_timeout);
        }
        self.check_ready(now);
    }

    fn handle_resumed(&mut self) {
        debug!("session resumed");
        self.connect_attempts = 0;
        self.reconnect_interval = INITIAL_RECONNECT_INTERVAL;
        self.status = ConnectionStatus::Ready;
        self.pre_ready = false;
        self.gate.mark_ready();
        self.signals.push_back(ShardSignal::Resume);
    }

    // ------------------------------------------------------------------
    // Ready gating
    // ------------------------------------------------------------------

    /// Emit `ready` once everything is drained. Non-empty backlogs are
    /// flushed before the transition is permitted.
    fn check_ready(&mut self, now: Instant) {
        if self.gate.is_ready() {
            return;
        }

        if let Some(batch) = self.guild_sync.take() {
            self.send_guild_sync(batch, now);
            return;
        }
        if self.gate.unsynced_guilds() > 0 {
            return;
        }
        if let Some(batch) = self.member_fetch.take() {
            self.send_member_request(batch, now);
            return;
        }
        if !self.gate.counters_drained() {
            return;
        }

        debug!("shard ready");
        self.gate.mark_ready();
        self.pre_ready = false;
        self.signals.push_back(ShardSignal::Ready);
    }

    fn sync_guild_inner(&mut self, guild_id: String, now: Instant) {
        self.gate.note_sync_requested();
        match self.guild_sync.enqueue(guild_id, self.gate.is_ready()) {
            BatchAction::Flush(batch) => self.send_guild_sync(batch, now),
            BatchAction::SendNow(id) => self.send_guild_sync(vec![id], now),
            BatchAction::Queued => {}
        }
    }

    fn request_guild_members_inner(&mut self, guild_id: String, now: Instant) {
        match self.member_fetch.enqueue(guild_id, self.gate.is_ready()) {
            BatchAction::Flush(batch) => self.send_member_request(batch, now),
            BatchAction::SendNow(id) => self.send_member_request(vec![id], now),
            BatchAction::Queued => {}
        }
    }

    fn send_guild_sync(&mut self, ids: Vec<String>, now: Instant) {
        if ids.is_empty() {
            return;
        }
        self.send_frame(Opcode::SyncGuild, Value::from(ids), false, now);
    }

    fn send_member_request(&mut self, ids: Vec<String>, now: Instant) {
        if ids.is_empty() {
            return;
        }
        for id in &ids {
            self.gate.note_chunk_requested(id);
        }
        let request = wire::RequestMembers {
            guild_id: &ids,
            query: "",
            limit: 0,
        };
        match serde_json::to_value(&request) {
            Ok(d) => self.send_frame(Opcode::GetGuildMembers, d, false, now),
            Err(err) => error!("failed to encode member request: {err}"),
        }
    }

    // ------------------------------------------------------------------
    // Outbound path
    // ------------------------------------------------------------------

    fn identify(&mut self, now: Instant) {
        let shard =
            (self.config.max_shards > 1).then(|| [self.config.shard_id, self.config.max_shards]);
        let identify = wire::Identify {
            token: &self.config.token,
            v: GATEWAY_VERSION,
            compress: self.config.compress,
            large_threshold: self.config.large_threshold,
            properties: wire::IdentifyProperties::default(),
            shard,
            presence: self.presence.as_ref(),
        };
        match serde_json::to_value(&identify) {
            Ok(d) => self.send_frame(Opcode::Identify, d, true, now),
            Err(err) => error!("failed to encode identify: {err}"),
        }
    }

    fn resume(&mut self, now: Instant) {
        let Some(session_id) = self.session_id.clone() else {
            return;
        };
        let resume = wire::Resume {
            token: &self.config.token,
            session_id: &session_id,
            seq: self.seq,
        };
        match serde_json::to_value(&resume) {
            Ok(d) => self.send_frame(Opcode::Resume, d, true, now),
            Err(err) => error!("failed to encode resume: {err}"),
        }
    }

    fn send_heartbeat(&mut self, now: Instant) {
        self.heartbeat.mark_sent(now);
        let seq = self.seq;
        self.send_frame(Opcode::Heartbeat, json!(seq), true, now);
    }

    fn send_frame(&mut self, op: Opcode, d: Value, priority: bool, now: Instant) {
        let open = self
            .transport
            .as_ref()
            .is_some_and(|t| t.ready_state() == ReadyState::Open);
        if !open {
            debug!(?op, "dropping outbound frame, socket not open");
            return;
        }

        let admitted = self.sendq.submit(PendingFrame { op, d }, priority, now);
        self.transmit(admitted);
    }

    fn pump_sends(&mut self, now: Instant) {
        if self.transport.is_none() {
            return;
        }
        let admitted = self.sendq.poll(now);
        self.transmit(admitted);
    }

    fn transmit(&mut self, frames: Vec<PendingFrame>) {
        for frame in frames {
            let Some(codec) = self.codec.as_ref() else {
                return;
            };
            let Some(transport) = self.transport.as_mut() else {
                return;
            };

            let env = Envelope::outbound(frame.op, frame.d);
            match codec.encode(&env) {
                Ok(msg) => {
                    debug!(op = ?frame.op, "sending frame");
                    transport.send(msg);
                }
                Err(err) => error!("failed to encode outbound frame: {err}"),
            }
        }
    }

    fn build_url(&self) -> String {
        let mut url = match Url::parse(&self.config.gateway_url) {
            Ok(u) => u,
            Err(_) => return self.config.gateway_url.clone(),
        };
        url.query_pairs_mut()
            .append_pair("v", &GATEWAY_VERSION.to_string())
            .append_pair("encoding", self.config.encoding.query_value());
        if self.config.compress {
            url.query_pairs_mut().append_pair("compress", "zlib-stream");
        }
        url.to_string()
    }
}
