//! Durable store facade. Composes the group-commit barrier
//! (`ramdb-durability`), the segment writer and recovery reader
//! (`ramdb-wal`), and the in-memory map ([`crate::map::Map`]) behind one
//! `get`/`set`/`del`/`close` surface.
//!
//! Engine polymorphism is a [`StoreEngine`] enum whose own `KvStore` impl is
//! the single place that matches on the variant, so the hot path never
//! switches on the engine type; callers (the command executor, the ingress
//! adapters) hold a `StoreEngine` and only ever call trait methods.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ramdb_durability::{Barrier, Handle as BarrierHandle, Options as BarrierOptions};
use ramdb_wal::repo::Fs;
use ramdb_wal::{encode, replay, Entry, SegmentWriter, WalError};
use tracing::info;

use crate::error::StoreError;
use crate::map::Map;

/// The read/write surface the command executor (F) drives.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Stop accepting mutations and drain/flush anything in flight. Reads
    /// remain valid afterward; writes fail fast.
    async fn close(&self) -> Result<(), StoreError>;

    /// Whether the store is still accepting mutations. `false` once
    /// [`KvStore::close`] has run.
    fn is_healthy(&self) -> bool;
}

/// `engine.type = map`: the facade with the barrier and segment writer
/// replaced by no-op collaborators. Pure in-memory, no WAL, no recovery.
pub struct MapOnlyStore {
    map: Map,
    closed: AtomicBool,
}

impl MapOnlyStore {
    pub fn new() -> Self {
        Self {
            map: Map::new(),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for MapOnlyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MapOnlyStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.map.get(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.map.set(key, value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.map.del(key)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// Configuration for [`WalBackedStore::open`], sourced from `wal.*` config.
#[derive(Clone, Debug)]
pub struct WalOptions {
    pub dir: PathBuf,
    pub seg_max_bytes: u64,
    pub batch_max: usize,
    pub batch_timeout: Duration,
    /// Whether to replay existing segments before accepting traffic.
    /// Recovery runs exactly once, before the engine starts serving.
    pub recover: bool,
}

/// `engine.type = wal`: the full durability engine (writer, recovery,
/// barrier, and map together).
pub struct WalBackedStore {
    map: Map,
    barrier: BarrierHandle,
    closed: AtomicBool,
}

impl WalBackedStore {
    /// Open the WAL directory, optionally replay it into a fresh map, then
    /// start the group-commit barrier. Traffic must not be accepted until
    /// this returns.
    pub fn open(opts: WalOptions) -> Result<Self, WalError> {
        let repo = Fs::open(&opts.dir).map_err(|e| WalError::DirUnreadable(opts.dir.clone(), e))?;
        let writer = SegmentWriter::open(repo, opts.seg_max_bytes)?;
        let map = Map::new();

        if opts.recover {
            let segments = writer.segment_paths()?;
            let segment_count = segments.len();
            replay(
                &segments,
                |k, v| map.set(k, v),
                |k| {
                    // Deleting a key that was never set during replay is
                    // not a failure.
                    let _ = map.del(k);
                },
            )?;
            info!(segment_count, "wal recovered");
        }

        let barrier = Barrier::spawn(
            writer,
            BarrierOptions {
                batch_max: opts.batch_max,
                batch_timeout: opts.batch_timeout,
            },
        );

        Ok(Self {
            map,
            barrier,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl KvStore for WalBackedStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        // Reads bypass the WAL entirely.
        self.map.get(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let bytes = encode(&Entry::Set(key.to_string(), value.to_string()));
        self.barrier.submit(bytes).await?;
        self.map.set(key, value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        // The delete is journaled unconditionally — the WAL has no
        // visibility into whether `key` is currently present, and replay
        // must reproduce the same sequence regardless. Whether the *live*
        // call reports success is decided by the map.
        let bytes = encode(&Entry::Del(key.to_string()));
        self.barrier.submit(bytes).await?;
        self.map.del(key)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        self.barrier.close().await.map_err(StoreError::from)
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// `engine.type` dispatch. The only place in this crate that matches on the
/// storage variant.
pub enum StoreEngine {
    Map(MapOnlyStore),
    Wal(WalBackedStore),
}

#[async_trait]
impl KvStore for StoreEngine {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        match self {
            StoreEngine::Map(s) => s.get(key).await,
            StoreEngine::Wal(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            StoreEngine::Map(s) => s.set(key, value).await,
            StoreEngine::Wal(s) => s.set(key, value).await,
        }
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        match self {
            StoreEngine::Map(s) => s.del(key).await,
            StoreEngine::Wal(s) => s.del(key).await,
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        match self {
            StoreEngine::Map(s) => s.close().await,
            StoreEngine::Wal(s) => s.close().await,
        }
    }

    fn is_healthy(&self) -> bool {
        match self {
            StoreEngine::Map(s) => s.is_healthy(),
            StoreEngine::Wal(s) => s.is_healthy(),
        }
    }
}
