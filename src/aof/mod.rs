//! Append-only file persistence: a write-behind journal of every successful
//! write-class command, replayed on startup and periodically compacted by
//! [`rewrite`].
//!
//! The writer runs as a single background task, the same actor shape as
//! `crate::executor`: a bounded channel carries append and rewrite-control
//! messages, and the task is the sole owner of the live file handle, so no
//! locking is needed around the file itself.

pub(crate) mod rewrite;

use std::io::{Cursor, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::config::FsyncPolicy;
use crate::executor::{valid_command, ExecutorHandle};
use crate::frame::{self, Frame};
use crate::shutdown::Shutdown;
use crate::Command;

const CHANNEL_CAPACITY: usize = 1024;

enum AofMsg {
    Append(Frame),
    /// Fsync the live file and report its current length: the snapshot
    /// offset `S0` the rewrite's dump phase replays up to.
    BeginRewrite(oneshot::Sender<crate::Result<u64>>),
    /// Copy the live file's tail from `offset` onward into `tmp_path`, then
    /// rename `tmp_path` over the live path and reopen it for append.
    EndRewrite {
        tmp_path: PathBuf,
        offset: u64,
        reply: oneshot::Sender<crate::Result<()>>,
    },
}

/// Handle used by connection handlers (to append) and the rewrite task (to
/// drive the Start/End critical sections). Cheap to clone.
#[derive(Clone, Debug)]
pub(crate) struct AofHandle {
    tx: mpsc::Sender<AofMsg>,
    path: PathBuf,
}

impl AofHandle {
    /// Forward a write-class command's original request frame for logging.
    /// Fire-and-forget: the caller has already replied to its client, so a
    /// slow persister should not add latency to the command path.
    pub(crate) async fn append(&self, frame: Frame) -> crate::Result<()> {
        self.tx
            .send(AofMsg::Append(frame))
            .await
            .map_err(|_| "AOF writer task has shut down".into())
    }

    pub(crate) async fn begin_rewrite(&self) -> crate::Result<u64> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AofMsg::BeginRewrite(reply))
            .await
            .map_err(|_| "AOF writer task has shut down")?;
        rx.await.map_err(|_| "AOF writer task dropped the reply channel")?
    }

    pub(crate) async fn end_rewrite(&self, tmp_path: PathBuf, offset: u64) -> crate::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AofMsg::EndRewrite { tmp_path, offset, reply })
            .await
            .map_err(|_| "AOF writer task has shut down")?;
        rx.await.map_err(|_| "AOF writer task dropped the reply channel")?
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens (creating if absent) the log at `path` in append mode and spawns
/// the writer task. Does not replay; call [`replay`] first if the file may
/// already hold entries.
///
/// `shutdown` is the broadcast listener the writer drains on to flush and
/// fsync before exiting (§5's "flush and fsync the AOF" shutdown step);
/// `shutdown_complete` is held for the task's lifetime so the caller's
/// drain on the matching receiver doesn't resolve until the writer has
/// actually finished, rather than racing the channel-close path.
pub(crate) async fn spawn(
    path: PathBuf,
    policy: FsyncPolicy,
    shutdown: Shutdown,
    shutdown_complete: mpsc::Sender<()>,
) -> crate::Result<AofHandle> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = AofHandle { tx, path: path.clone() };

    tokio::spawn(run_writer(file, path, policy, rx, shutdown, shutdown_complete));

    Ok(handle)
}

async fn run_writer(
    mut file: File,
    path: PathBuf,
    policy: FsyncPolicy,
    mut rx: mpsc::Receiver<AofMsg>,
    mut shutdown: Shutdown,
    _shutdown_complete: mpsc::Sender<()>,
) {
    let mut ticker = time::interval(Duration::from_secs(1));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                // Drain anything already enqueued, then flush and fsync
                // before exiting, rather than relying on every `AofHandle`
                // clone being dropped to close the channel.
                while let Ok(msg) = rx.try_recv() {
                    if let AofMsg::Append(frame) = msg {
                        let bytes = frame.encode();
                        if let Err(err) = file.write_all(&bytes).await {
                            error!(%err, "AOF append failed during shutdown drain, aborting");
                            std::process::abort();
                        }
                    }
                    // A rewrite in flight at shutdown is abandoned; the
                    // live log being flushed here remains authoritative.
                }
                if let Err(err) = file.flush().await {
                    error!(%err, "AOF flush failed during shutdown");
                }
                if let Err(err) = file.sync_data().await {
                    error!(%err, "AOF fsync failed during shutdown");
                }
                info!("AOF writer flushed and shutting down");
                break;
            }
            _ = ticker.tick() => {
                if policy == FsyncPolicy::Everysec {
                    if let Err(err) = file.sync_data().await {
                        error!(%err, "AOF fsync failed");
                    }
                }
            }
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    AofMsg::Append(frame) => {
                        let bytes = frame.encode();
                        if let Err(err) = file.write_all(&bytes).await {
                            error!(%err, "AOF append failed, aborting process to avoid silent data loss");
                            std::process::abort();
                        }
                        if policy == FsyncPolicy::Always {
                            if let Err(err) = file.sync_data().await {
                                error!(%err, "AOF fsync failed, aborting process to avoid silent data loss");
                                std::process::abort();
                            }
                        }
                    }
                    AofMsg::BeginRewrite(reply) => {
                        let result = begin_rewrite(&mut file).await;
                        let _ = reply.send(result);
                    }
                    AofMsg::EndRewrite { tmp_path, offset, reply } => {
                        let result = end_rewrite(&mut file, &path, &tmp_path, offset).await;
                        let _ = reply.send(result);
                    }
                }
            }
        }
    }

    info!("AOF writer shutting down");
}

async fn begin_rewrite(file: &mut File) -> crate::Result<u64> {
    file.flush().await?;
    file.sync_data().await?;
    let len = file.metadata().await?.len();
    Ok(len)
}

async fn end_rewrite(
    file: &mut File,
    live_path: &Path,
    tmp_path: &Path,
    offset: u64,
) -> crate::Result<()> {
    // Copy everything appended since the dump snapshot (the "tail") onto
    // the end of the rewritten log.
    let mut tail_reader = File::open(live_path).await?;
    tail_reader.seek(SeekFrom::Start(offset)).await?;
    let mut tail = Vec::new();
    tail_reader.read_to_end(&mut tail).await?;

    let mut tmp_file = OpenOptions::new().append(true).open(tmp_path).await?;
    tmp_file.write_all(&tail).await?;
    tmp_file.flush().await?;
    tmp_file.sync_data().await?;
    drop(tmp_file);

    tokio::fs::rename(tmp_path, live_path).await?;

    *file = OpenOptions::new().create(true).append(true).open(live_path).await?;

    Ok(())
}

/// Replays every entry in the log at `path` by parsing it back into
/// commands and driving them through `exec`, the same executor path a live
/// connection uses. Must run before the first client connection is
/// accepted.
pub(crate) async fn replay(path: &Path, exec: &ExecutorHandle) -> crate::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let mut file = File::open(path).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;

    let frames = parse_all_frames(&buf);
    info!(entries = frames.len(), "replaying AOF");

    for frame in frames {
        let cmd = Command::from_frame(frame)?;
        let name = cmd.get_name();
        if !valid_command(name) {
            error!(name, "skipping unreplayable AOF entry");
            continue;
        }
        debug!(name, "replaying command");
        cmd.apply(exec).await?;
    }

    Ok(())
}

/// Parses every complete RESP frame out of `buf`. A trailing partial frame
/// (the log was being appended to when the process crashed mid-write) is
/// silently dropped rather than treated as corruption.
pub(crate) fn parse_all_frames(buf: &[u8]) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut cursor = Cursor::new(buf);

    loop {
        let start = cursor.position();
        match Frame::check(&mut cursor) {
            Ok(()) => {
                let end = cursor.position();
                cursor.set_position(start);
                match Frame::parse(&mut cursor) {
                    Ok(frame) => frames.push(frame),
                    Err(_) => break,
                }
                cursor.set_position(end);
            }
            Err(frame::Error::Incomplete) => break,
            Err(_) => break,
        }
    }

    frames
}
