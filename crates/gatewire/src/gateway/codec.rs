use std::collections::VecDeque;

use flate2::{Decompress, FlushDecompress};
use serde_json::Value;

use crate::config::Encoding;
use crate::error::Error;
use crate::gateway::transport::WireMessage;
use crate::gateway::wire::Envelope;
use crate::Result;

/// Suffix the server appends to delimit one logical compressed payload.
pub const FLUSH_SENTINEL: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

const INFLATE_CHUNK: usize = 16 * 1024;

/// Which inflate pipeline services compressed frames. Chosen at session init
/// and sticky for the session.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum InflateStrategy {
    /// Incremental inflate; fragments accumulate between flush sentinels and
    /// chunks that arrive mid-flush are held and replayed in order.
    Streaming,
    /// Whole-message inflate with a sync flush whenever the sentinel is seen.
    #[default]
    Sync,
}

fn ends_with_sentinel(chunk: &[u8]) -> bool {
    chunk.len() >= 4 && chunk[chunk.len() - 4..] == FLUSH_SENTINEL
}

/// Run `input` through the shared zlib context, appending everything it
/// produces to `out`.
fn inflate_into(
    ctx: &mut Decompress,
    input: &[u8],
    out: &mut Vec<u8>,
    flush: FlushDecompress,
) -> Result<()> {
    let mut offset = 0usize;
    loop {
        let consumed_before = ctx.total_in();
        out.reserve(INFLATE_CHUNK);
        ctx.decompress_vec(&input[offset..], out, flush)
            .map_err(|e| Error::Inflate(e.to_string()))?;
        offset += (ctx.total_in() - consumed_before) as usize;

        // spare output capacity after consuming all input means the context
        // has nothing more to give us right now
        if offset >= input.len() && out.len() < out.capacity() {
            return Ok(());
        }
    }
}

struct StreamInflater {
    ctx: Decompress,
    /// Chunks that arrived while a flush was outstanding.
    incoming: VecDeque<Vec<u8>>,
    /// Decompressed fragments of the payload being assembled.
    pending: Vec<Vec<u8>>,
    flushing: bool,
}

impl StreamInflater {
    fn new() -> Self {
        StreamInflater {
            ctx: Decompress::new(true),
            incoming: VecDeque::new(),
            pending: Vec::new(),
            flushing: false,
        }
    }

    fn feed(&mut self, chunk: Vec<u8>) -> Result<()> {
        if self.flushing {
            self.incoming.push_back(chunk);
            return Ok(());
        }
        self.inflate_chunk(chunk)
    }

    fn inflate_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        let flush_requested = ends_with_sentinel(&chunk);
        let flush = if flush_requested {
            FlushDecompress::Sync
        } else {
            FlushDecompress::None
        };

        let mut fragment = Vec::new();
        inflate_into(&mut self.ctx, &chunk, &mut fragment, flush)?;
        if !fragment.is_empty() {
            self.pending.push(fragment);
        }
        if flush_requested {
            self.flushing = true;
        }
        Ok(())
    }

    /// Complete an outstanding flush: concatenate the assembled fragments,
    /// then replay held chunks until the next flush request or the backlog
    /// runs dry.
    fn poll(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.flushing {
            return Ok(None);
        }

        let payload = self.pending.concat();
        self.pending.clear();
        self.flushing = false;

        while let Some(held) = self.incoming.pop_front() {
            self.inflate_chunk(held)?;
            if self.flushing {
                break;
            }
        }

        Ok(Some(payload))
    }
}

struct SyncInflater {
    ctx: Decompress,
    out: Vec<u8>,
    ready: VecDeque<Vec<u8>>,
}

impl SyncInflater {
    fn new() -> Self {
        SyncInflater {
            ctx: Decompress::new(true),
            out: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    fn feed(&mut self, chunk: Vec<u8>) -> Result<()> {
        let flush_requested = ends_with_sentinel(&chunk);
        let flush = if flush_requested {
            FlushDecompress::Sync
        } else {
            FlushDecompress::None
        };

        inflate_into(&mut self.ctx, &chunk, &mut self.out, flush)?;
        if flush_requested {
            self.ready.push_back(std::mem::take(&mut self.out));
        }
        Ok(())
    }

    fn poll(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }
}

enum Inflater {
    Stream(StreamInflater),
    Sync(SyncInflater),
}

impl Inflater {
    fn feed(&mut self, chunk: Vec<u8>) -> Result<()> {
        match self {
            Inflater::Stream(inf) => inf.feed(chunk),
            Inflater::Sync(inf) => inf.feed(chunk),
        }
    }

    fn poll(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            Inflater::Stream(inf) => inf.poll(),
            Inflater::Sync(inf) => Ok(inf.poll()),
        }
    }
}

/// Inbound/outbound frame codec for one session: reassembles and inflates
/// binary frames, then decodes the negotiated payload encoding.
pub struct FrameCodec {
    encoding: Encoding,
    inflater: Option<Inflater>,
    /// Payloads that skipped the inflater (text frames, uncompressed binary).
    ready: VecDeque<Vec<u8>>,
}

impl FrameCodec {
    pub fn new(encoding: Encoding, compress: bool, strategy: InflateStrategy) -> Self {
        let inflater = compress.then(|| match strategy {
            InflateStrategy::Streaming => Inflater::Stream(StreamInflater::new()),
            InflateStrategy::Sync => Inflater::Sync(SyncInflater::new()),
        });

        FrameCodec {
            encoding,
            inflater,
            ready: VecDeque::new(),
        }
    }

    #[profiling::function]
    pub fn feed(&mut self, msg: WireMessage) -> Result<()> {
        match msg {
            WireMessage::Text(s) => {
                self.ready.push_back(s.into_bytes());
                Ok(())
            }
            WireMessage::Binary(b) => match &mut self.inflater {
                Some(inf) => inf.feed(b),
                None => {
                    self.ready.push_back(b);
                    Ok(())
                }
            },
        }
    }

    /// Next fully assembled envelope, if any. Decode failures surface as
    /// `Json`/`Pack` errors (drop the frame); inflate failures as `Inflate`
    /// (session error).
    pub fn poll_envelope(&mut self) -> Result<Option<Envelope>> {
        let payload = match self.ready.pop_front() {
            Some(p) => p,
            None => match &mut self.inflater {
                Some(inf) => match inf.poll()? {
                    Some(p) => p,
                    None => return Ok(None),
                },
                None => return Ok(None),
            },
        };

        self.decode(&payload).map(Some)
    }

    fn decode(&self, payload: &[u8]) -> Result<Envelope> {
        match self.encoding {
            Encoding::Json => Ok(serde_json::from_slice(payload)?),
            Encoding::Pack => {
                let packed = rmpv::decode::read_value(&mut &payload[..])
                    .map_err(|e| Error::Pack(e.to_string()))?;
                let value = pack_to_value(packed)?;
                serde_json::from_value(value).map_err(|e| Error::Pack(e.to_string()))
            }
        }
    }

    pub fn encode(&self, env: &Envelope) -> Result<WireMessage> {
        match self.encoding {
            Encoding::Json => Ok(WireMessage::Text(serde_json::to_string(env)?)),
            Encoding::Pack => {
                let mut fields = vec![
                    (rmpv::Value::from("op"), rmpv::Value::from(env.op)),
                    (rmpv::Value::from("d"), value_to_pack(&env.d)),
                ];
                if let Some(s) = env.s {
                    fields.push((rmpv::Value::from("s"), rmpv::Value::from(s)));
                }
                if let Some(t) = &env.t {
                    fields.push((rmpv::Value::from("t"), rmpv::Value::from(t.as_str())));
                }

                let mut buf = Vec::new();
                rmpv::encode::write_value(&mut buf, &rmpv::Value::Map(fields))
                    .map_err(|e| Error::Pack(e.to_string()))?;
                Ok(WireMessage::Binary(buf))
            }
        }
    }
}

fn value_to_pack(v: &Value) -> rmpv::Value {
    match v {
        Value::Null => rmpv::Value::Nil,
        Value::Bool(b) => rmpv::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                rmpv::Value::from(u)
            } else if let Some(i) = n.as_i64() {
                rmpv::Value::from(i)
            } else {
                rmpv::Value::F64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => rmpv::Value::from(s.as_str()),
        Value::Array(a) => rmpv::Value::Array(a.iter().map(value_to_pack).collect()),
        Value::Object(m) => rmpv::Value::Map(
            m.iter()
                .map(|(k, v)| (rmpv::Value::from(k.as_str()), value_to_pack(v)))
                .collect(),
        ),
    }
}

fn pack_to_value(v: rmpv::Value) -> Result<Value> {
    Ok(match v {
        rmpv::Value::Nil => Value::Null,
        rmpv::Value::Boolean(b) => Value::Bool(b),
        rmpv::Value::Integer(i) => {
            if let Some(u) = i.as_u64() {
                Value::from(u)
            } else if let Some(n) = i.as_i64() {
                Value::from(n)
            } else {
                return Err(Error::Pack("integer out of range".into()));
            }
        }
        rmpv::Value::F32(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        rmpv::Value::F64(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        rmpv::Value::String(s) => match s.into_str() {
            Some(s) => Value::String(s),
            None => return Err(Error::Pack("string is not valid utf-8".into())),
        },
        rmpv::Value::Array(a) => {
            Value::Array(a.into_iter().map(pack_to_value).collect::<Result<_>>()?)
        }
        rmpv::Value::Map(m) => {
            let mut obj = serde_json::Map::with_capacity(m.len());
            for (k, v) in m {
                let Some(key) = k.as_str() else {
                    return Err(Error::Pack("map key is not a string".into()));
                };
                let key = key.to_owned();
                obj.insert(key, pack_to_value(v)?);
            }
            Value::Object(obj)
        }
        rmpv::Value::Binary(_) | rmpv::Value::Ext(..) => {
            return Err(Error::Pack("unsupported pack value".into()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};
    use serde_json::json;

    /// One compressed gateway message: shared deflate context, sync flush,
    /// so the output ends with the sentinel.
    fn deflate_msg(ctx: &mut Compress, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        loop {
            let consumed_before = ctx.total_in();
            out.reserve(1024);
            ctx.compress_vec(&payload[offset..], &mut out, FlushCompress::Sync)
                .expect("deflate");
            offset += (ctx.total_in() - consumed_before) as usize;
            if offset >= payload.len() && out.ends_with(&FLUSH_SENTINEL) {
                return out;
            }
        }
    }

    fn envelope_json(op: u8, seq: u64) -> Vec<u8> {
        serde_json::to_vec(&json!({"op": op, "d": null, "s": seq, "t": "MESSAGE_CREATE"}))
            .expect("payload json")
    }

    fn drain(codec: &mut FrameCodec) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Some(env) = codec.poll_envelope().expect("poll") {
            out.push(env);
        }
        out
    }

    #[test]
    fn text_frames_bypass_the_inflater() {
        let mut codec = FrameCodec::new(Encoding::Json, false, InflateStrategy::Sync);
        codec
            .feed(WireMessage::Text(r#"{"op":11}"#.into()))
            .expect("feed");

        let envs = drain(&mut codec);
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].op, 11);
    }

    #[test]
    fn sync_strategy_decodes_whole_messages() {
        let mut deflate = Compress::new(Compression::default(), true);
        let m1 = deflate_msg(&mut deflate, &envelope_json(0, 1));
        let m2 = deflate_msg(&mut deflate, &envelope_json(0, 2));

        let mut codec = FrameCodec::new(Encoding::Json, true, InflateStrategy::Sync);
        codec.feed(WireMessage::Binary(m1)).expect("feed");
        codec.feed(WireMessage::Binary(m2)).expect("feed");

        let envs = drain(&mut codec);
        assert_eq!(envs.iter().map(|e| e.s).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn streaming_reassembles_fragmented_payloads() {
        let mut deflate = Compress::new(Compression::default(), true);
        let msg = deflate_msg(&mut deflate, &envelope_json(0, 7));

        // split mid-body; only the tail carries the sentinel
        let cut = msg.len() / 2;
        let (head, tail) = msg.split_at(cut.min(msg.len() - 4));

        let mut codec = FrameCodec::new(Encoding::Json, true, InflateStrategy::Streaming);
        codec.feed(WireMessage::Binary(head.to_vec())).expect("feed");
        assert!(drain(&mut codec).is_empty(), "no envelope before the sentinel");

        codec.feed(WireMessage::Binary(tail.to_vec())).expect("feed");
        let envs = drain(&mut codec);
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].s, Some(7));
    }

    #[test]
    fn chunks_fed_mid_flush_are_replayed_in_order() {
        let mut deflate = Compress::new(Compression::default(), true);
        let m1 = deflate_msg(&mut deflate, &envelope_json(0, 1));
        let m2 = deflate_msg(&mut deflate, &envelope_json(0, 2));
        let m3 = deflate_msg(&mut deflate, &envelope_json(0, 3));

        let mut codec = FrameCodec::new(Encoding::Json, true, InflateStrategy::Streaming);
        // everything lands before the first flush is collected
        codec.feed(WireMessage::Binary(m1)).expect("feed");
        codec.feed(WireMessage::Binary(m2)).expect("feed");
        codec.feed(WireMessage::Binary(m3)).expect("feed");

        let envs = drain(&mut codec);
        assert_eq!(
            envs.iter().map(|e| e.s).collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn strategies_agree_on_the_same_byte_stream() {
        let payloads = [envelope_json(0, 10), envelope_json(0, 11), envelope_json(0, 12)];

        let mut messages = Vec::new();
        let mut deflate = Compress::new(Compression::default(), true);
        for p in &payloads {
            messages.push(deflate_msg(&mut deflate, p));
        }

        let mut streaming = FrameCodec::new(Encoding::Json, true, InflateStrategy::Streaming);
        let mut sync = FrameCodec::new(Encoding::Json, true, InflateStrategy::Sync);

        let mut got_streaming = Vec::new();
        let mut got_sync = Vec::new();
        for msg in &messages {
            streaming
                .feed(WireMessage::Binary(msg.clone()))
                .expect("feed");
            sync.feed(WireMessage::Binary(msg.clone())).expect("feed");
            got_streaming.extend(drain(&mut streaming));
            got_sync.extend(drain(&mut sync));
        }

        assert_eq!(got_streaming, got_sync);
        assert_eq!(got_streaming.len(), payloads.len());
    }

    #[test]
    fn garbage_bytes_surface_an_inflate_error() {
        let mut codec = FrameCodec::new(Encoding::Json, true, InflateStrategy::Sync);
        let err = codec
            .feed(WireMessage::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0xFF, 0xFF]))
            .expect_err("corrupt stream");
        assert!(matches!(err, Error::Inflate(_)));
    }

    #[test]
    fn pack_envelopes_roundtrip() {
        let codec = FrameCodec::new(Encoding::Pack, false, InflateStrategy::Sync);
        let env = Envelope {
            op: 0,
            d: json!({"id": "123", "content": "hi", "bits": [1, 2, 3]}),
            s: Some(99),
            t: Some("MESSAGE_CREATE".into()),
        };

        let msg = codec.encode(&env).expect("encode");
        let WireMessage::Binary(bytes) = msg else {
            panic!("pack encoding must produce binary frames");
        };

        let mut codec = FrameCodec::new(Encoding::Pack, false, InflateStrategy::Sync);
        codec.feed(WireMessage::Binary(bytes)).expect("feed");
        let got = codec.poll_envelope().expect("poll").expect("envelope");
        assert_eq!(got, env);
    }

    #[test]
    fn decode_error_is_not_an_inflate_error() {
        let mut codec = FrameCodec::new(Encoding::Json, false, InflateStrategy::Sync);
        codec
            .feed(WireMessage::Text("not json".into()))
            .expect("feed");
        let err = codec.poll_envelope().expect_err("bad payload");
        assert!(matches!(err, Error::Json(_)));
    }
}
