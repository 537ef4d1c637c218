//! One module per supported command, mirroring the RESP surface in
//! `crate::frame`. Each command struct knows how to parse its own arguments
//! and how to turn itself into a reply, either by going through the executor
//! (the live connection path) or by driving a `Store` directly (the AOF
//! rewrite path).

mod get;
pub(crate) use get::Get;

mod mget;
pub(crate) use mget::Mget;

mod mset;
pub(crate) use mset::Mset;

mod set;
pub(crate) use set::Set;

mod push;
pub(crate) use push::Push;

mod pop;
pub(crate) use pop::Pop;

mod lrange;
pub(crate) use lrange::Lrange;

mod sadd;
pub(crate) use sadd::Sadd;

mod sismember;
pub(crate) use sismember::Sismember;

mod srem;
pub(crate) use srem::Srem;

mod hset;
pub(crate) use hset::Hset;

mod hget;
pub(crate) use hget::Hget;

mod hdel;
pub(crate) use hdel::Hdel;

mod zadd;
pub(crate) use zadd::Zadd;

mod zrangebyscore;
pub(crate) use zrangebyscore::Zrangebyscore;

mod zrem;
pub(crate) use zrem::Zrem;

mod expire;
pub(crate) use expire::Expire;

mod unknown;
pub(crate) use unknown::Unknown;

use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::{Frame, Parse};

/// Enumeration of supported commands. Parsing decides the variant; the
/// variant then knows how to drive either the executor or a directly-owned
/// `Store`.
#[derive(Debug)]
pub(crate) enum Command {
    Get(Get),
    Mget(Mget),
    Set(Set),
    Mset(Mset),
    Lpush(Push),
    Rpush(Push),
    Lpop(Pop),
    Rpop(Pop),
    Lrange(Lrange),
    Sadd(Sadd),
    Sismember(Sismember),
    Srem(Srem),
    Hset(Hset),
    Hget(Hget),
    Hdel(Hdel),
    Zadd(Zadd),
    Zrangebyscore(Zrangebyscore),
    Zrem(Zrem),
    Expire(Expire),
    ExpireAt(Expire),
    Unknown(Unknown),
}

impl Command {
    /// Parse a command out of a received frame. The frame must be the array
    /// variant, per the RESP request convention.
    pub(crate) fn from_frame(frame: Frame) -> crate::Result<Command> {
        let mut parse = Parse::new(frame)?;
        let command_name = parse.next_string()?.to_lowercase();

        let command = match &command_name[..] {
            "get" => Command::Get(transform_parse(Get::parse_frames(&mut parse), &mut parse)),
            "mget" => Command::Mget(transform_parse(Mget::parse_frames(&mut parse), &mut parse)),
            "set" => Command::Set(transform_parse(Set::parse_frames(&mut parse), &mut parse)),
            "mset" => Command::Mset(transform_parse(Mset::parse_frames(&mut parse), &mut parse)),
            "lpush" => {
                Command::Lpush(transform_parse(Push::parse_frames(&mut parse, true), &mut parse))
            }
            "rpush" => {
                Command::Rpush(transform_parse(Push::parse_frames(&mut parse, false), &mut parse))
            }
            "lpop" => Command::Lpop(transform_parse(Pop::parse_frames(&mut parse, true), &mut parse)),
            "rpop" => {
                Command::Rpop(transform_parse(Pop::parse_frames(&mut parse, false), &mut parse))
            }
            "lrange" => {
                Command::Lrange(transform_parse(Lrange::parse_frames(&mut parse), &mut parse))
            }
            "sadd" => Command::Sadd(transform_parse(Sadd::parse_frames(&mut parse), &mut parse)),
            "sismember" => Command::Sismember(transform_parse(
                Sismember::parse_frames(&mut parse),
                &mut parse,
            )),
            "srem" => Command::Srem(transform_parse(Srem::parse_frames(&mut parse), &mut parse)),
            "hset" => Command::Hset(transform_parse(Hset::parse_frames(&mut parse), &mut parse)),
            "hget" => Command::Hget(transform_parse(Hget::parse_frames(&mut parse), &mut parse)),
            "hdel" => Command::Hdel(transform_parse(Hdel::parse_frames(&mut parse), &mut parse)),
            "zadd" => Command::Zadd(transform_parse(Zadd::parse_frames(&mut parse), &mut parse)),
            "zrangebyscore" => Command::Zrangebyscore(transform_parse(
                Zrangebyscore::parse_frames(&mut parse),
                &mut parse,
            )),
            "zrem" => Command::Zrem(transform_parse(Zrem::parse_frames(&mut parse), &mut parse)),
            "expire" => {
                Command::Expire(transform_parse(Expire::parse_frames(&mut parse), &mut parse))
            }
            "expireat" => Command::ExpireAt(transform_parse(
                Expire::parse_frames_at(&mut parse),
                &mut parse,
            )),

            _ => return Ok(Command::Unknown(Unknown::new(command_name))),
        };

        parse.finish()?;

        Ok(command)
    }

    /// Live connection path: submit to the executor and await the reply.
    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        use Command::*;

        match self {
            Get(cmd) => cmd.apply(exec).await,
            Mget(cmd) => cmd.apply(exec).await,
            Set(cmd) => cmd.apply(exec).await,
            Mset(cmd) => cmd.apply(exec).await,
            Lpush(cmd) => cmd.apply(exec).await,
            Rpush(cmd) => cmd.apply(exec).await,
            Lpop(cmd) => cmd.apply(exec).await,
            Rpop(cmd) => cmd.apply(exec).await,
            Lrange(cmd) => cmd.apply(exec).await,
            Sadd(cmd) => cmd.apply(exec).await,
            Sismember(cmd) => cmd.apply(exec).await,
            Srem(cmd) => cmd.apply(exec).await,
            Hset(cmd) => cmd.apply(exec).await,
            Hget(cmd) => cmd.apply(exec).await,
            Hdel(cmd) => cmd.apply(exec).await,
            Zadd(cmd) => cmd.apply(exec).await,
            Zrangebyscore(cmd) => cmd.apply(exec).await,
            Zrem(cmd) => cmd.apply(exec).await,
            Expire(cmd) => cmd.apply(exec).await,
            ExpireAt(cmd) => cmd.apply(exec).await,
            Unknown(cmd) => Ok(cmd.apply()),
        }
    }

    /// AOF rewrite path: drive a privately-owned `Store` directly, bypassing
    /// the executor channel entirely.
    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        use Command::*;

        match self {
            Get(cmd) => cmd.apply_direct(store),
            Mget(cmd) => cmd.apply_direct(store),
            Set(cmd) => cmd.apply_direct(store),
            Mset(cmd) => cmd.apply_direct(store),
            Lpush(cmd) => cmd.apply_direct(store),
            Rpush(cmd) => cmd.apply_direct(store),
            Lpop(cmd) => cmd.apply_direct(store),
            Rpop(cmd) => cmd.apply_direct(store),
            Lrange(cmd) => cmd.apply_direct(store),
            Sadd(cmd) => cmd.apply_direct(store),
            Sismember(cmd) => cmd.apply_direct(store),
            Srem(cmd) => cmd.apply_direct(store),
            Hset(cmd) => cmd.apply_direct(store),
            Hget(cmd) => cmd.apply_direct(store),
            Hdel(cmd) => cmd.apply_direct(store),
            Zadd(cmd) => cmd.apply_direct(store),
            Zrangebyscore(cmd) => cmd.apply_direct(store),
            Zrem(cmd) => cmd.apply_direct(store),
            Expire(cmd) => cmd.apply_direct(store),
            ExpireAt(cmd) => cmd.apply_direct(store),
            Unknown(cmd) => cmd.apply(),
        }
    }

    /// Whether this command mutates the key space and therefore needs to be
    /// forwarded to the AOF persister after a successful apply.
    pub(crate) fn is_write(&self) -> bool {
        use Command::*;

        !matches!(self, Get(_) | Mget(_) | Sismember(_) | Hget(_) | Lrange(_) | Zrangebyscore(_) | Unknown(_))
    }

    /// Builds the AOF log template for this command, to be finalized once
    /// the reply is known (see `AofTemplate`). Most commands replay
    /// deterministically from their own wire bytes and just pass `original`
    /// through; `SET`/`EXPIRE`/`EXPIREAT` carry a relative-to-now clause
    /// that must be translated to an absolute instant before it is
    /// persisted, since replaying the original bytes later would resolve
    /// that clause against the replay-time clock instead of the instant it
    /// actually meant.
    pub(crate) fn aof_template(&self, original: Frame) -> AofTemplate {
        match self {
            Command::Set(cmd) => cmd.aof_template(),
            Command::Expire(cmd) | Command::ExpireAt(cmd) => AofTemplate::Frames(vec![cmd.aof_frame()]),
            _ => AofTemplate::Frames(vec![original]),
        }
    }

    /// Returns the command name, used for logging and metrics labels.
    pub(crate) fn get_name(&self) -> &str {
        match self {
            Command::Get(_) => "get",
            Command::Mget(_) => "mget",
            Command::Set(_) => "set",
            Command::Mset(_) => "mset",
            Command::Lpush(_) => "lpush",
            Command::Rpush(_) => "rpush",
            Command::Lpop(_) => "lpop",
            Command::Rpop(_) => "rpop",
            Command::Lrange(_) => "lrange",
            Command::Sadd(_) => "sadd",
            Command::Sismember(_) => "sismember",
            Command::Srem(_) => "srem",
            Command::Hset(_) => "hset",
            Command::Hget(_) => "hget",
            Command::Hdel(_) => "hdel",
            Command::Zadd(_) => "zadd",
            Command::Zrangebyscore(_) => "zrangebyscore",
            Command::Zrem(_) => "zrem",
            Command::Expire(_) => "expire",
            Command::ExpireAt(_) => "expireat",
            Command::Unknown(cmd) => cmd.get_name(),
        }
    }
}

/// All commands implement `new_invalid()` so an arity mismatch can reply
/// with a graceful error instead of severing the connection.
pub(crate) trait Invalid {
    fn new_invalid() -> Self;
}

/// What to append to the AOF for one applied write command, deferred until
/// the reply is known. `SET key value EX seconds` only installs its TTL
/// when the set actually took effect (e.g. not on an `NX` conflict), so its
/// `EXPIREAT` companion entry is conditional on the reply rather than
/// always emitted alongside the `SET`.
pub(crate) enum AofTemplate {
    Frames(Vec<Frame>),
    SetWithExpire { set_frame: Frame, expireat_frame: Option<Frame> },
}

impl AofTemplate {
    /// Resolves the template into the concrete frames to append, given the
    /// reply the command actually produced.
    pub(crate) fn resolve(self, reply: &Frame) -> Vec<Frame> {
        match self {
            AofTemplate::Frames(frames) => frames,
            AofTemplate::SetWithExpire { set_frame, expireat_frame } => {
                let mut frames = vec![set_frame];
                if matches!(reply, Frame::Integer(1)) {
                    if let Some(expireat) = expireat_frame {
                        frames.push(expireat);
                    }
                }
                frames
            }
        }
    }
}

fn transform_parse<T: Invalid>(parse_res: crate::Result<T>, parse: &mut Parse) -> T {
    match parse_res {
        Ok(cmd) => {
            if parse.check_finish() {
                cmd
            } else {
                T::new_invalid()
            }
        }
        Err(_) => T::new_invalid(),
    }
}
