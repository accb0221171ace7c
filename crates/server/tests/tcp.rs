//! End-to-end TCP line protocol against a real socket and a real WAL
//! directory: spec scenarios S1 (group commit across three clients), S3
//! (crash + recovering restart), and S5 (the `GET` error path).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ramdb_server::tcp;
use ramdb_store::{KvStore, StoreEngine, WalBackedStore, WalOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

fn wal_opts(dir: &std::path::Path, recover: bool) -> WalOptions {
    WalOptions {
        dir: dir.to_path_buf(),
        seg_max_bytes: 1024,
        batch_max: 3,
        batch_timeout: Duration::from_millis(100),
        recover,
    }
}

/// Bind an ephemeral port and run the real TCP accept loop against it,
/// returning the address clients should connect to.
async fn spawn_server(store: Arc<StoreEngine>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(tcp::run(listener, store, 64, Duration::from_secs(5)));
    addr
}

/// Connect, write `lines`, read back as many response lines as `lines`
/// contains, and return them concatenated.
async fn send_and_collect(addr: SocketAddr, lines: &str) -> String {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(lines.as_bytes()).await.unwrap();

    let mut reader = BufReader::new(read_half);
    let mut out = String::new();
    for _ in 0..lines.matches('\n').count() {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        if n == 0 {
            break;
        }
        out.push_str(&line);
    }
    out
}

/// S1: three clients each submit one command concurrently on distinct keys
/// (avoiding a same-key SET/DEL race, which is inherently unordered across
/// separate connections); all three get `OK` and the values are readable
/// afterward.
#[tokio::test]
async fn three_clients_group_commit_over_real_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StoreEngine::Wal(WalBackedStore::open(wal_opts(dir.path(), false)).unwrap()));
    let addr = spawn_server(store.clone()).await;

    let (r1, r2, r3) = tokio::join!(
        send_and_collect(addr, "SET a 1\n"),
        send_and_collect(addr, "SET b 2\n"),
        send_and_collect(addr, "SET c 3\n"),
    );
    assert_eq!(r1, "OK\n");
    assert_eq!(r2, "OK\n");
    assert_eq!(r3, "OK\n");

    assert_eq!(send_and_collect(addr, "GET a\n").await, "1\n");
    assert_eq!(send_and_collect(addr, "GET b\n").await, "2\n");
    assert_eq!(send_and_collect(addr, "GET c\n").await, "3\n");
    store.close().await.unwrap();
}

/// S5: `GET` on an absent key renders the documented error text over the
/// wire; the process exit path is unaffected (no panic, connection closes
/// normally).
#[tokio::test]
async fn get_on_missing_key_renders_documented_error_text() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StoreEngine::Wal(WalBackedStore::open(wal_opts(dir.path(), false)).unwrap()));
    let addr = spawn_server(store.clone()).await;

    let resp = send_and_collect(addr, "GET z\n").await;
    assert_eq!(resp, "key z not found\n");

    store.close().await.unwrap();
}

/// S3: mutations acknowledged over the wire survive a crash (drop without
/// `close`) and a subsequent recovering restart sees the same state.
#[tokio::test]
async fn acknowledged_writes_survive_restart_with_recovery() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(StoreEngine::Wal(WalBackedStore::open(wal_opts(dir.path(), false)).unwrap()));
        let addr = spawn_server(store.clone()).await;
        let resp = send_and_collect(addr, "SET a 1\nSET b 2\nDEL a\n").await;
        assert_eq!(resp, "OK\nOK\nOK\n");
        // Dropped without `close()`: simulates a crash before shutdown.
    }

    let restarted = Arc::new(StoreEngine::Wal(WalBackedStore::open(wal_opts(dir.path(), true)).unwrap()));
    let addr = spawn_server(restarted.clone()).await;

    assert_eq!(send_and_collect(addr, "GET a\n").await, "key a not found\n");
    assert_eq!(send_and_collect(addr, "GET b\n").await, "2\n");
    restarted.close().await.unwrap();
}
