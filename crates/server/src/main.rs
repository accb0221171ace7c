//! `ramdb-server` entrypoint: CLI → config → logging → build the storage
//! engine (recovering before accepting traffic) → run the TCP and HTTP
//! ingress adapters side by side → graceful shutdown on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use ramdb_server::cli::Cli;
use ramdb_server::config::{self, EngineType, RamdbConfig};
use ramdb_server::{http, logging, tcp};
use ramdb_store::{KvStore, MapOnlyStore, StoreEngine, WalBackedStore, WalOptions};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&cfg.log.level);
    logging::init(log_level, cfg.log.format);

    if let Err(err) = run(cfg).await {
        error!(%err, "ramdb-server exited with an error");
        std::process::exit(1);
    }
}

async fn run(cfg: RamdbConfig) -> anyhow::Result<()> {
    let store = build_store(&cfg)?;
    let store = Arc::new(store);

    let addr = SocketAddr::new(cfg.network.host.parse()?, cfg.network.port);
    let http_addr = SocketAddr::new(cfg.network.host.parse()?, cfg.network.http_port);

    info!(%addr, %http_addr, "ramdb-server starting");

    let tcp_store = store.clone();
    let tcp_task = tokio::spawn(async move {
        tcp::serve(addr, tcp_store, cfg.network.max_conn, cfg.network.timeout).await
    });

    let http_store = store.clone();
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_task = tokio::spawn(async move { axum::serve(http_listener, http::router(http_store)).await });

    tokio::select! {
        res = tcp_task => {
            res??;
        }
        res = http_task => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
        }
    }

    store.close().await?;
    Ok(())
}

fn build_store(cfg: &RamdbConfig) -> anyhow::Result<StoreEngine> {
    match cfg.engine {
        EngineType::Map => Ok(StoreEngine::Map(MapOnlyStore::new())),
        EngineType::Wal => {
            let opts = WalOptions {
                dir: cfg.wal.seg_path.clone(),
                seg_max_bytes: cfg.wal.seg_size_bytes,
                batch_max: cfg.wal.batch_max,
                batch_timeout: cfg.wal.batch_timeout,
                recover: cfg.wal.recover,
            };
            Ok(StoreEngine::Wal(WalBackedStore::open(opts)?))
        }
    }
}
