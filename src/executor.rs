//! The command executor: a single task that owns the `Store` exclusively.
//!
//! Every connection holds an `ExecutorHandle`, a cheap `Clone`-able sender
//! into a bounded channel. The executor task is the only place the `Store`
//! is ever touched, so no per-key or per-structure locking is needed — the
//! entire data-race surface is the channel itself.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration};
use tracing::{debug, info};

use crate::frame::Frame;
use crate::shutdown::Shutdown;
use crate::store::Store;

const CHANNEL_CAPACITY: usize = 1024;

/// One envelope per submitted command: the already-validated operation plus
/// a one-shot channel the executor uses to deliver the reply.
#[derive(Debug)]
enum Op {
    Get { key: Bytes },
    Mget { keys: Vec<Bytes> },
    Set { key: Bytes, value: Bytes, nx: bool, ex: Option<i64> },
    Mset { pairs: Vec<Bytes> },
    Push { key: Bytes, values: Vec<Bytes>, left: bool },
    Pop { key: Bytes, count: Option<i64>, left: bool },
    Lrange { key: Bytes, start: i64, stop: i64 },
    Sadd { key: Bytes, members: Vec<Bytes> },
    Sismember { key: Bytes, member: Bytes },
    Srem { key: Bytes, members: Vec<Bytes> },
    Hset { key: Bytes, pairs: Vec<Bytes> },
    Hget { key: Bytes, field: Bytes },
    Hdel { key: Bytes, fields: Vec<Bytes> },
    Zadd { key: Bytes, pairs: Vec<(f64, Bytes)> },
    Zrangebyscore { key: Bytes, min: f64, max: f64 },
    Zrem { key: Bytes, members: Vec<Bytes> },
    Expire { key: Bytes, at: i64 },
}

impl Op {
    fn primary_key(&self) -> &Bytes {
        match self {
            Op::Get { key }
            | Op::Set { key, .. }
            | Op::Push { key, .. }
            | Op::Pop { key, .. }
            | Op::Lrange { key, .. }
            | Op::Sadd { key, .. }
            | Op::Sismember { key, .. }
            | Op::Srem { key, .. }
            | Op::Hset { key, .. }
            | Op::Hget { key, .. }
            | Op::Hdel { key, .. }
            | Op::Zadd { key, .. }
            | Op::Zrangebyscore { key, .. }
            | Op::Zrem { key, .. }
            | Op::Expire { key, .. } => key,
            Op::Mget { keys } => &keys[0],
            Op::Mset { pairs } => &pairs[0],
        }
    }

    fn dispatch(self, store: &mut Store) -> Frame {
        let reply = match self {
            Op::Get { key } => store.cmd_get(&[key]),
            Op::Mget { keys } => store.cmd_mget(&keys),
            Op::Set { key, value, nx, ex } => store.cmd_set(key, value, nx, ex),
            Op::Mset { pairs } => store.cmd_mset(&pairs),
            Op::Push { key, values, left } => store.cmd_push(key, &values, left),
            Op::Pop { key, count, left } => store.cmd_pop(&key, count, left),
            Op::Lrange { key, start, stop } => store.cmd_lrange(&key, start, stop),
            Op::Sadd { key, members } => store.cmd_sadd(key, &members),
            Op::Sismember { key, member } => store.cmd_sismember(&key, &member),
            Op::Srem { key, members } => store.cmd_srem(&key, &members),
            Op::Hset { key, pairs } => store.cmd_hset(key, &pairs),
            Op::Hget { key, field } => store.cmd_hget(&key, &field),
            Op::Hdel { key, fields } => store.cmd_hdel(&key, &fields),
            Op::Zadd { key, pairs } => store.cmd_zadd(key, &pairs),
            Op::Zrangebyscore { key, min, max } => store.cmd_zrangebyscore(&key, min, max),
            Op::Zrem { key, members } => store.cmd_zrem(&key, &members),
            Op::Expire { key, at } => store.cmd_expire(&key, at),
        };
        reply.unwrap_or_else(Into::into)
    }
}

struct Envelope {
    op: Op,
    reply: oneshot::Sender<Frame>,
}

/// Handle used by connections (and by AOF replay) to submit commands to the
/// executor task and await their reply.
#[derive(Clone, Debug)]
pub(crate) struct ExecutorHandle {
    tx: mpsc::Sender<Envelope>,
}

macro_rules! submit {
    ($self:ident, $op:expr) => {{
        let (reply_tx, reply_rx) = oneshot::channel();
        $self
            .tx
            .send(Envelope { op: $op, reply: reply_tx })
            .await
            .map_err(|_| "executor task has shut down")?;
        reply_rx.await.map_err(|_| "executor task dropped the reply channel".into())
    }};
}

impl ExecutorHandle {
    pub(crate) async fn get(&self, key: Bytes) -> crate::Result<Frame> {
        submit!(self, Op::Get { key })
    }

    pub(crate) async fn mget(&self, keys: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Mget { keys })
    }

    pub(crate) async fn set(
        &self,
        key: Bytes,
        value: Bytes,
        nx: bool,
        ex: Option<i64>,
    ) -> crate::Result<Frame> {
        submit!(self, Op::Set { key, value, nx, ex })
    }

    pub(crate) async fn mset(&self, pairs: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Mset { pairs })
    }

    pub(crate) async fn push(&self, key: Bytes, values: Vec<Bytes>, left: bool) -> crate::Result<Frame> {
        submit!(self, Op::Push { key, values, left })
    }

    pub(crate) async fn pop(&self, key: Bytes, count: Option<i64>, left: bool) -> crate::Result<Frame> {
        submit!(self, Op::Pop { key, count, left })
    }

    pub(crate) async fn lrange(&self, key: Bytes, start: i64, stop: i64) -> crate::Result<Frame> {
        submit!(self, Op::Lrange { key, start, stop })
    }

    pub(crate) async fn sadd(&self, key: Bytes, members: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Sadd { key, members })
    }

    pub(crate) async fn sismember(&self, key: Bytes, member: Bytes) -> crate::Result<Frame> {
        submit!(self, Op::Sismember { key, member })
    }

    pub(crate) async fn srem(&self, key: Bytes, members: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Srem { key, members })
    }

    pub(crate) async fn hset(&self, key: Bytes, pairs: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Hset { key, pairs })
    }

    pub(crate) async fn hget(&self, key: Bytes, field: Bytes) -> crate::Result<Frame> {
        submit!(self, Op::Hget { key, field })
    }

    pub(crate) async fn hdel(&self, key: Bytes, fields: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Hdel { key, fields })
    }

    pub(crate) async fn zadd(&self, key: Bytes, pairs: Vec<(f64, Bytes)>) -> crate::Result<Frame> {
        submit!(self, Op::Zadd { key, pairs })
    }

    pub(crate) async fn zrangebyscore(&self, key: Bytes, min: f64, max: f64) -> crate::Result<Frame> {
        submit!(self, Op::Zrangebyscore { key, min, max })
    }

    pub(crate) async fn zrem(&self, key: Bytes, members: Vec<Bytes>) -> crate::Result<Frame> {
        submit!(self, Op::Zrem { key, members })
    }

    pub(crate) async fn expire(&self, key: Bytes, at: i64) -> crate::Result<Frame> {
        submit!(self, Op::Expire { key, at })
    }
}

/// Spawns the executor task and returns a handle to it. `gc_interval` drives
/// the periodic expiry sweep; `shutdown` is the broadcast listener that
/// causes the task to drain and exit during graceful shutdown.
pub(crate) fn spawn(mut store: Store, gc_interval: Duration, mut shutdown: Shutdown) -> ExecutorHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut ticker = time::interval(gc_interval);
        // The first tick fires immediately; that's wasted work on a store
        // with nothing in it yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("executor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    store.gc();
                }
                envelope = rx.recv() => {
                    let Some(Envelope { op, reply }) = envelope else {
                        break;
                    };
                    store.expire_preprocess(op.primary_key());
                    let frame = op.dispatch(&mut store);
                    debug!(?frame, "command result");
                    let _ = reply.send(frame);
                }
            }
        }
    });

    ExecutorHandle { tx }
}

/// Command names the executor surface actually implements. Used by the AOF
/// persister to decide whether a logged entry is replayable.
pub(crate) fn valid_command(name: &str) -> bool {
    matches!(
        name,
        "get" | "mget" | "set" | "mset" | "lpush" | "rpush" | "lpop" | "rpop" | "lrange"
            | "sadd" | "sismember" | "srem" | "hset" | "hget" | "hdel" | "zadd"
            | "zrangebyscore" | "zrem" | "expire" | "expireat"
    )
}
