//! The background log-compaction procedure (§4.6 of the design): Start,
//! Dump, End. Start and End run as short critical sections serialized
//! through the writer task in `super`; Dump runs concurrently with live
//! writes against a private forked store built by replaying the log up to
//! the snapshot offset taken in Start.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use super::{parse_all_frames, AofHandle};
use crate::store::{now_unix, Store};
use crate::Command;

/// Runs one full rewrite cycle against the log `aof` is writing to.
/// Returns the number of reconstruction frames written to the compacted
/// log (a key with an expiry contributes two: its rebuild command and an
/// `EXPIREAT`).
pub(crate) async fn rewrite_once(aof: &AofHandle) -> crate::Result<usize> {
    let live_path = aof.path().to_path_buf();
    let tmp_path = temp_path(&live_path);

    // Start: fsync the live log and snapshot its length. Everything up to
    // this offset is eligible for compaction; anything appended after is
    // the "tail" End will copy verbatim.
    let offset = aof.begin_rewrite().await?;
    info!(offset, "AOF rewrite: start");

    // Dump: replay the snapshot prefix into a private store, then write
    // that store's compact reconstruction to the temp file. No lock is
    // held here; the live log keeps accepting writes.
    let forked = fork_store(&live_path, offset).await?;
    let written = dump_store(&forked, &tmp_path).await?;
    info!(written, "AOF rewrite: dump complete");

    // End: copy the tail that accrued during Dump, then atomically swap.
    aof.end_rewrite(tmp_path, offset).await?;
    info!("AOF rewrite: end, log swapped");

    Ok(written)
}

fn temp_path(live_path: &Path) -> PathBuf {
    let mut name = live_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "aof".into());
    name.push(format!(".rewrite.{}.tmp", std::process::id()));
    live_path.with_file_name(name)
}

async fn fork_store(live_path: &Path, offset: u64) -> crate::Result<Store> {
    let mut file = File::open(live_path).await?;
    let mut buf = vec![0u8; offset as usize];
    file.read_exact(&mut buf).await?;

    let mut store = Store::new();
    for frame in parse_all_frames(&buf) {
        let cmd = Command::from_frame(frame)?;
        cmd.apply_direct(&mut store);
    }
    Ok(store)
}

async fn dump_store(store: &Store, tmp_path: &Path) -> crate::Result<usize> {
    // `for_each_cmd` takes a synchronous `FnMut`; collect the encoded bytes
    // here and do the actual (async) file I/O below, rather than threading
    // an async write through the closure.
    let now = now_unix();
    let mut buf = Vec::new();
    let mut count = 0;
    store.for_each_cmd(now, |frame| {
        buf.extend_from_slice(&frame.encode());
        count += 1;
    });

    let mut file = File::create(tmp_path).await?;
    file.write_all(&buf).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(count)
}
