//! TCP line-protocol ingress: one command per line, one response per
//! command, a per-connection idle deadline, and a `Semaphore`-bounded
//! connection limiter following the acquire-a-permit-before-doing-work
//! shape used for connection pooling elsewhere in this kind of server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ramdb_store::{execute, StoreEngine};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::protocol::{parse_line, render_ok, render_protocol_error, render_store_error};

/// Bind `addr` and serve it until the listener itself fails. Each
/// connection is handled on its own task, admitted only while a semaphore
/// permit (capacity `max_conn`) is available.
pub async fn serve(addr: SocketAddr, store: Arc<StoreEngine>, max_conn: usize, idle_timeout: Duration) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, max_conn, "tcp listener bound");
    run(listener, store, max_conn, idle_timeout).await
}

/// Accept loop over an already-bound `listener`. Split out from [`serve`] so
/// callers that need the OS-assigned port (tests binding `:0`) can bind
/// first, read `local_addr()`, and only then hand the listener off here.
pub async fn run(listener: TcpListener, store: Arc<StoreEngine>, max_conn: usize, idle_timeout: Duration) -> std::io::Result<()> {
    let admission = Arc::new(Semaphore::new(max_conn));

    loop {
        let (socket, peer) = listener.accept().await?;
        let permit = admission.clone().acquire_owned().await.expect("semaphore never closed");
        let store = store.clone();
        tokio::spawn(async move {
            let _permit = permit;
            debug!(%peer, "connection accepted");
            if let Err(err) = handle_connection(socket, store, idle_timeout).await {
                warn!(%peer, %err, "connection ended with an io error");
            } else {
                debug!(%peer, "connection closed");
            }
        });
    }
}

async fn handle_connection(socket: TcpStream, store: Arc<StoreEngine>, idle_timeout: Duration) -> std::io::Result<()> {
    let (read_half, write_half) = socket.into_split();
    handle_stream(read_half, write_half, store, idle_timeout).await
}

async fn handle_stream<R, W>(read_half: R, mut write_half: W, store: Arc<StoreEngine>, idle_timeout: Duration) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match tokio::time::timeout(idle_timeout, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Ok(()), // client closed the connection
            Ok(Err(err)) => return Err(err),
            Err(_elapsed) => return Ok(()), // idle deadline: close quietly
        };

        // The submission, once enqueued with the durability barrier, is
        // never abandoned on account of the client going away; nothing
        // here cancels `execute` once it has started.
        let response = match parse_line(&line) {
            Ok(cmd) => match execute(&cmd, store.as_ref()).await {
                Ok(body) => render_ok(&body),
                Err(err) => render_store_error(&err),
            },
            Err(err) => render_protocol_error(&err),
        };
        write_half.write_all(response.as_bytes()).await?;
    }
}
