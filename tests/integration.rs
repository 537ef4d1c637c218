//! End-to-end tests driven over a real TCP connection against a fully wired
//! `server::run`, covering the concrete scenarios from the design's
//! testable-properties section.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::sleep;

use rukv::config::Config;
use rukv::{Connection, Frame};

static NEXT_PORT: AtomicU16 = AtomicU16::new(17_000);

fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

struct Harness {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<rukv::Result<()>>,
}

impl Harness {
    async fn start(config: Config) -> Harness {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            rukv::server::run(config, async {
                let _ = shutdown_rx.await;
            })
            .await
        });
        // Give the listener time to bind before the first connection attempt.
        sleep(Duration::from_millis(100)).await;
        Harness { shutdown_tx: Some(shutdown_tx), handle }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

fn test_config(port: u16, aof_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.listen = "127.0.0.1".to_string();
    config.port = port;
    config.aof_path = aof_path.to_string_lossy().into_owned();
    config.gc_interval_secs = 1;
    config
}

async fn connect(port: u16) -> Connection {
    let stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    Connection::new(stream)
}

fn bulk(s: &str) -> Frame {
    Frame::Bulk(Bytes::from(s.to_string()))
}

fn cmd(parts: &[&str]) -> Frame {
    Frame::Array(parts.iter().map(|p| bulk(p)).collect())
}

async fn roundtrip(conn: &mut Connection, parts: &[&str]) -> Frame {
    conn.write_frame(&cmd(parts)).await.expect("write");
    conn.read_frame().await.expect("read").expect("reply")
}

#[tokio::test]
async fn set_get_and_expire() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    assert_eq!(roundtrip(&mut conn, &["SET", "a", "1"]).await, Frame::Integer(1));
    assert_eq!(roundtrip(&mut conn, &["GET", "a"]).await, bulk("1"));
    assert_eq!(roundtrip(&mut conn, &["EXPIRE", "a", "1"]).await, Frame::Integer(1));

    sleep(Duration::from_millis(1200)).await;

    assert_eq!(roundtrip(&mut conn, &["GET", "a"]).await, Frame::Null);

    harness.stop().await;
}

#[tokio::test]
async fn list_push_and_pop() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    assert_eq!(roundtrip(&mut conn, &["RPUSH", "l", "x", "y", "z"]).await, Frame::Integer(3));
    assert_eq!(
        roundtrip(&mut conn, &["LPOP", "l", "2"]).await,
        Frame::Array(vec![bulk("x"), bulk("y")])
    );
    assert_eq!(roundtrip(&mut conn, &["LPOP", "l"]).await, bulk("z"));
    assert_eq!(roundtrip(&mut conn, &["LPOP", "l"]).await, Frame::Null);

    harness.stop().await;
}

#[tokio::test]
async fn set_membership() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    assert_eq!(roundtrip(&mut conn, &["SADD", "s", "a", "b", "a"]).await, Frame::Integer(2));
    assert_eq!(roundtrip(&mut conn, &["SISMEMBER", "s", "a"]).await, Frame::Integer(1));
    assert_eq!(roundtrip(&mut conn, &["SREM", "s", "a"]).await, Frame::Integer(1));
    assert_eq!(roundtrip(&mut conn, &["SISMEMBER", "s", "a"]).await, Frame::Integer(0));

    harness.stop().await;
}

#[tokio::test]
async fn zset_range_by_score() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    assert_eq!(
        roundtrip(&mut conn, &["ZADD", "z", "1", "a", "3", "c", "2", "b"]).await,
        Frame::Integer(3)
    );
    assert_eq!(
        roundtrip(&mut conn, &["ZRANGEBYSCORE", "z", "1", "2"]).await,
        Frame::Array(vec![bulk("a"), bulk("b")])
    );

    harness.stop().await;
}

#[tokio::test]
async fn wrongtype_on_cross_variant_access() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    assert_eq!(roundtrip(&mut conn, &["SET", "a", "1"]).await, Frame::Integer(1));
    match roundtrip(&mut conn, &["HSET", "a", "f", "v"]).await {
        Frame::Error(msg) => assert!(msg.starts_with("WRONGTYPE")),
        other => panic!("expected WRONGTYPE error, got {other:?}"),
    }

    harness.stop().await;
}

#[tokio::test]
async fn unknown_command_replies_with_error_and_keeps_connection_open() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    match roundtrip(&mut conn, &["FROBNICATE", "a"]).await {
        Frame::Error(msg) => assert!(msg.contains("unknown command")),
        other => panic!("expected unknown-command error, got {other:?}"),
    }
    // The connection must still be usable after an unknown command.
    assert_eq!(roundtrip(&mut conn, &["SET", "a", "1"]).await, Frame::Integer(1));

    harness.stop().await;
}

/// Writes survive a clean shutdown and restart from the same AOF file —
/// the durability invariant in the design's testable-properties section.
#[tokio::test]
async fn state_survives_restart_via_aof_replay() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("a.aof");

    let port1 = next_port();
    let harness = Harness::start(test_config(port1, &aof_path)).await;
    {
        let mut conn = connect(port1).await;
        assert_eq!(roundtrip(&mut conn, &["SET", "a", "1"]).await, Frame::Integer(1));
        assert_eq!(roundtrip(&mut conn, &["RPUSH", "l", "x", "y"]).await, Frame::Integer(2));
        assert_eq!(roundtrip(&mut conn, &["HSET", "h", "f", "v"]).await, Frame::Integer(1));
    }
    harness.stop().await;

    // Give the writer task a moment to flush before the file is reopened.
    sleep(Duration::from_millis(100)).await;

    let port2 = next_port();
    let harness2 = Harness::start(test_config(port2, &aof_path)).await;
    let mut conn = connect(port2).await;

    assert_eq!(roundtrip(&mut conn, &["GET", "a"]).await, bulk("1"));
    assert_eq!(
        roundtrip(&mut conn, &["LRANGE", "l", "0", "-1"]).await,
        Frame::Array(vec![bulk("x"), bulk("y")])
    );
    assert_eq!(roundtrip(&mut conn, &["HGET", "h", "f"]).await, bulk("v"));

    harness2.stop().await;
}

/// Per-connection commands are replied to in submission order even when
/// interleaved with another connection's traffic.
#[tokio::test]
async fn per_connection_ordering_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let port = next_port();
    let harness = Harness::start(test_config(port, &dir.path().join("a.aof"))).await;
    let mut conn = connect(port).await;

    for i in 0..50 {
        let key = format!("k{i}");
        conn.write_frame(&cmd(&["SET", &key, &i.to_string()])).await.unwrap();
    }
    for i in 0..50 {
        let reply = conn.read_frame().await.unwrap().unwrap();
        assert_eq!(reply, Frame::Integer(1), "out-of-order reply at index {i}");
    }

    harness.stop().await;
}

/// `EXPIRE`/`SET ... EX` carry a duration relative to "now"; the AOF must
/// persist the absolute instant they resolved to (`EXPIREAT`), not the
/// relative clause, or replaying the log after downtime would recompute the
/// wrong expiry against the replay-time clock instead of the original one.
#[tokio::test]
async fn relative_expiry_is_persisted_as_absolute() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("a.aof");
    let port = next_port();
    let harness = Harness::start(test_config(port, &aof_path)).await;
    {
        let mut conn = connect(port).await;
        assert_eq!(roundtrip(&mut conn, &["SET", "a", "1", "EX", "1000"]).await, Frame::Integer(1));
        assert_eq!(roundtrip(&mut conn, &["SET", "b", "1"]).await, Frame::Integer(1));
        assert_eq!(roundtrip(&mut conn, &["EXPIRE", "b", "1000"]).await, Frame::Integer(1));
        // An NX conflict must not persist an EXPIREAT: nothing was set.
        assert_eq!(roundtrip(&mut conn, &["SET", "a", "2", "NX", "EX", "5"]).await, Frame::Null);
    }
    harness.stop().await;
    sleep(Duration::from_millis(100)).await;

    let logged = std::fs::read_to_string(&aof_path).expect("read aof");
    assert!(!logged.contains("EX\r\n"), "relative EX clause leaked into the AOF:\n{logged}");
    assert!(!logged.contains("$6\r\nEXPIRE\r\n"), "relative EXPIRE leaked into the AOF:\n{logged}");
    assert_eq!(logged.matches("EXPIREAT").count(), 2, "expected exactly one EXPIREAT per successful expiry:\n{logged}");

    let port2 = next_port();
    let harness2 = Harness::start(test_config(port2, &aof_path)).await;
    let mut conn = connect(port2).await;
    assert_eq!(roundtrip(&mut conn, &["GET", "a"]).await, bulk("1"));
    assert_eq!(roundtrip(&mut conn, &["GET", "b"]).await, bulk("1"));
    harness2.stop().await;
}
