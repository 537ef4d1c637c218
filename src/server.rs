//! Server wiring: binds the listener, spawns the executor and the AOF
//! persister, replays the log, then accepts connections until shutdown.
//!
//! Structurally this mirrors the teacher's `Listener`/`Handler` split: a
//! `Listener` owns the socket and a connection-limiting `Semaphore`, each
//! accepted connection gets its own `Handler` task, and a broadcast channel
//! carries the shutdown signal to every live task.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::aof::{self, rewrite, AofHandle};
use crate::cmd::Command;
use crate::config::Config;
use crate::executor::{self, ExecutorHandle};
use crate::metrics::{
    AOF_REWRITE_COUNTER, AOF_REWRITE_DURATION, CURRENT_CONNECTION_COUNTER, REQUEST_CMD_COUNTER,
    REQUEST_CMD_ERROR_COUNTER, REQUEST_CMD_HANDLE_TIME, REQUEST_COUNTER,
    TOTAL_CONNECTION_PROCESSED,
};
use crate::shutdown::Shutdown;
use crate::store::Store;
use crate::{Connection, Frame};

/// How often the rewrite-trigger task checks the live log's size against
/// the size recorded after the last rewrite.
const REWRITE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

struct Listener {
    listener: TcpListener,
    exec: ExecutorHandle,
    aof: AofHandle,
    limit_connections: Arc<Semaphore>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_rx: mpsc::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

struct Handler {
    connection: Connection,
    exec: ExecutorHandle,
    aof: AofHandle,
    shutdown: Shutdown,
    _shutdown_complete: mpsc::Sender<()>,
}

/// Binds `config.listen:config.port`, wires store → executor → AOF replay,
/// then accepts connections until `shutdown` completes, at which point the
/// server drains in-flight connections and returns.
pub async fn run(config: Config, shutdown: impl Future<Output = ()>) -> crate::Result<()> {
    let addr = format!("{}:{}", config.listen, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

    let store = Store::new();
    let gc_interval = Duration::from_secs(config.gc_interval_secs.max(1));
    let exec = executor::spawn(store, gc_interval, Shutdown::new(notify_shutdown.subscribe()));

    let aof_path = PathBuf::from(&config.aof_path);
    let aof = aof::spawn(
        aof_path,
        config.aof_fsync,
        Shutdown::new(notify_shutdown.subscribe()),
        shutdown_complete_tx.clone(),
    )
    .await?;

    aof::replay(aof.path(), &exec).await?;
    info!("AOF replay complete, accepting connections");

    let mut server = Listener {
        listener,
        exec,
        aof: aof.clone(),
        limit_connections: Arc::new(Semaphore::new(config.max_connections)),
        notify_shutdown,
        shutdown_complete_tx,
        shutdown_complete_rx,
    };

    let rewrite_shutdown = Shutdown::new(server.notify_shutdown.subscribe());
    tokio::spawn(run_rewrite_trigger(aof, config.rewrite_growth_ratio, rewrite_shutdown));

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!(%err, "failed to accept, server shutting down");
            }
        }
        _ = shutdown => {
            info!("shutdown signal received");
        }
    }

    let Listener {
        mut shutdown_complete_rx,
        shutdown_complete_tx,
        notify_shutdown,
        ..
    } = server;

    drop(notify_shutdown);
    drop(shutdown_complete_tx);

    let _ = shutdown_complete_rx.recv().await;

    Ok(())
}

impl Listener {
    async fn run(&mut self) -> crate::Result<()> {
        info!("accepting inbound connections");

        loop {
            let permit = self.limit_connections.clone().acquire_owned().await.unwrap();
            let socket = self.accept().await?;

            let mut handler = Handler {
                connection: Connection::new(socket),
                exec: self.exec.clone(),
                aof: self.aof.clone(),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                CURRENT_CONNECTION_COUNTER.inc();
                TOTAL_CONNECTION_PROCESSED.inc();
                if let Err(err) = handler.run().await {
                    error!(%err, "connection error");
                }
                CURRENT_CONNECTION_COUNTER.dec();
                drop(permit);
            });
        }
    }

    /// Errors are handled by backing off and retrying with an exponential
    /// strategy: 1s after the first failure, doubling each subsequent one,
    /// giving up once the wait would exceed 64s.
    async fn accept(&mut self) -> crate::Result<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    error!(%err, "accept error");
                    if backoff > 64 {
                        return Err(err.into());
                    }
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

impl Handler {
    /// Reads RESP frames until the peer disconnects or shutdown is
    /// signalled, applying each to the executor and forwarding successful
    /// write-class commands to the AOF.
    async fn run(&mut self) -> crate::Result<()> {
        while !self.shutdown.is_shutdown() {
            let maybe_frame = tokio::select! {
                res = self.connection.read_frame() => res?,
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            };

            let request_frame = match maybe_frame {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let reply_frame = request_frame.clone();
            let cmd = Command::from_frame(reply_frame)?;
            let cmd_name = cmd.get_name().to_owned();
            let is_write = cmd.is_write();
            let aof_template = is_write.then(|| cmd.aof_template(request_frame));

            debug!(cmd = %cmd_name, "dispatching command");
            REQUEST_COUNTER.inc();
            REQUEST_CMD_COUNTER.with_label_values(&[&cmd_name]).inc();

            let start = Instant::now();
            let result = cmd.apply(&self.exec).await;
            let duration = start.elapsed();
            REQUEST_CMD_HANDLE_TIME
                .with_label_values(&[&cmd_name])
                .observe(duration_to_sec(duration));

            let reply = match result {
                Ok(reply) => reply,
                Err(err) => {
                    REQUEST_CMD_ERROR_COUNTER.with_label_values(&[&cmd_name]).inc();
                    return Err(err);
                }
            };

            if let Some(template) = aof_template.filter(|_| !matches!(reply, Frame::Error(_))) {
                for frame in template.resolve(&reply) {
                    if let Err(err) = self.aof.append(frame).await {
                        error!(%err, "failed to forward command to AOF, aborting process to avoid silent data loss");
                        std::process::abort();
                    }
                }
            }

            self.connection.write_frame(&reply).await?;
        }

        Ok(())
    }
}

async fn run_rewrite_trigger(aof: AofHandle, growth_ratio: f64, mut shutdown: Shutdown) {
    let mut baseline = file_len(aof.path()).await.max(1);
    let mut ticker = time::interval(REWRITE_CHECK_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let current = file_len(aof.path()).await;
                if (current as f64) < (baseline as f64) * growth_ratio {
                    continue;
                }

                let start = Instant::now();
                match rewrite::rewrite_once(&aof).await {
                    Ok(keys) => {
                        AOF_REWRITE_COUNTER.inc();
                        AOF_REWRITE_DURATION.observe(duration_to_sec(start.elapsed()));
                        info!(keys, "AOF rewrite finished");
                        baseline = file_len(aof.path()).await.max(1);
                    }
                    Err(err) => {
                        error!(%err, "AOF rewrite failed, will retry on next trigger");
                    }
                }
            }
        }
    }
}

async fn file_len(path: &std::path::Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

#[inline]
fn duration_to_sec(d: Duration) -> f64 {
    let nanos = f64::from(d.subsec_nanos());
    d.as_secs() as f64 + (nanos / 1_000_000_000.0)
}
