//! Group-commit barrier: §4.C of the durability engine.
//!
//! The barrier is the single point every mutating request passes through on
//! its way to the WAL. Concurrent `submit` calls fan in from many request
//! handlers into one shared batch; a dedicated task ([`Barrier::spawn`])
//! drains that batch and hands it to a [`ramdb_wal::SegmentWriter`] whenever
//! either the batch fills to `batch_max` requests or `batch_timeout` elapses,
//! whichever comes first. Every submitter in the flushed batch is woken with
//! the same outcome.

mod barrier;
pub mod error;

pub use barrier::{Barrier, Handle, Options};
pub use error::DurabilityError;
