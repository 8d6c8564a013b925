//! 🔌 Backends: where the real I/O happens.
//!
//! 🪣 Stores hand out listings and object bytes. 🚰 Sinks slurp up projected rows.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 This module is the casting agency. Need objects from S3? From a HashMap pretending
//! to be S3? Need rows in a CSV file, or in a Vec a test can poke at? We've got a backend for that.
//!
//! 🧠 Knowledge graph:
//! - `LogStore`: the object-store capability: "list a page under a prefix" and "fetch by key".
//!   Takes `&self` so a region's fetches can fan out while sharing one client.
//! - `Sink`: header once, batches many, close once. `&mut self`, single owner, single writer.
//! - `StoreBackend` / `SinkBackend`: enum dispatch, so the pipeline never holds a `dyn`.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use anyhow::Result;
use async_trait::async_trait;

use crate::common::TupleBatch;
use crate::error::{TrailError, TrailResult};

pub mod file;
pub mod in_mem;
pub mod s3;

pub use file::{FileSink, FileSinkConfig};
pub use in_mem::{InMemorySink, InMemoryStore};
pub use s3::{S3SourceConfig, S3Store};

// ===== Listing Page =====

/// 📄 One page of a paginated listing.
///
/// ⚠️ Invariant: the page is truncated exactly when it carries a continuation cursor.
/// The only way to build a truncated page is to hand over the cursor, so the invariant
/// cannot be broken from the outside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    next_cursor: Option<String>,
}

impl ListingPage {
    /// 🏁 The final page. No cursor. Nothing after it.
    pub fn last(keys: Vec<String>) -> Self {
        Self {
            keys,
            next_cursor: None,
        }
    }

    /// ➡️ A page with more behind it.
    pub fn truncated(keys: Vec<String>, cursor: impl Into<String>) -> Self {
        Self {
            keys,
            next_cursor: Some(cursor.into()),
        }
    }

    /// 🔬 Normalize a raw store reply into a page, enforcing the cursor invariant.
    ///
    /// 💀 A reply that claims to be truncated but hands back no cursor would make the walker
    /// either stop early or loop forever. Both are worse than failing loudly.
    pub fn from_store_reply(
        key_prefix: &str,
        keys: Vec<String>,
        is_truncated: bool,
        cursor: Option<String>,
    ) -> TrailResult<Self> {
        match (is_truncated, cursor.filter(|c| !c.is_empty())) {
            (true, Some(cursor)) => Ok(Self::truncated(keys, cursor)),
            (true, None) => Err(TrailError::List {
                key_prefix: key_prefix.to_string(),
                detail: "store reported a truncated page without a continuation cursor"
                    .to_string(),
            }),
            (false, _) => Ok(Self::last(keys)),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }
}

// ===== Store Trait and Backend Enum =====

/// 🪣 The object-store capability the pipeline consumes.
///
/// # Contract
/// - `list_page` lists at most `max_keys` keys under `key_prefix`, resuming at `cursor`
///   verbatim when one is given. Keys come back in store order.
/// - `fetch` returns the whole object body.
/// - Neither retries. Transport trouble is the caller's problem, and the caller's answer is "abort".
#[async_trait]
pub trait LogStore: std::fmt::Debug + Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        key_prefix: &str,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> TrailResult<ListingPage>;

    async fn fetch(&self, bucket: &str, key: &str) -> TrailResult<Vec<u8>>;
}

/// 🎭 The many faces of a store. Universal remote, but it only controls buckets.
#[derive(Debug)]
pub enum StoreBackend {
    S3(S3Store),
    InMemory(InMemoryStore),
}

#[async_trait]
impl LogStore for StoreBackend {
    async fn list_page(
        &self,
        bucket: &str,
        key_prefix: &str,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> TrailResult<ListingPage> {
        match self {
            StoreBackend::S3(s3) => s3.list_page(bucket, key_prefix, cursor, max_keys).await,
            StoreBackend::InMemory(mem) => mem.list_page(bucket, key_prefix, cursor, max_keys).await,
        }
    }

    async fn fetch(&self, bucket: &str, key: &str) -> TrailResult<Vec<u8>> {
        match self {
            StoreBackend::S3(s3) => s3.fetch(bucket, key).await,
            StoreBackend::InMemory(mem) => mem.fetch(bucket, key).await,
        }
    }
}

// ===== Sink Trait and Backend Enum =====

/// 🕳️ A sink that consumes projected rows.
///
/// # Contract
/// - `write_header` is called exactly once, before any batch.
/// - `receive` appends every tuple of the batch, in order, as whole lines.
/// - `close` flushes and releases. MUST be called. Skipping `close` is a bug. It is also rude.
#[async_trait]
pub trait Sink: std::fmt::Debug + Send {
    async fn write_header(&mut self) -> Result<()>;
    async fn receive(&mut self, batch: TupleBatch) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a sink. Mirrors `StoreBackend` on the other end of the pipeline.
#[derive(Debug)]
pub enum SinkBackend {
    File(FileSink),
    InMemory(InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn write_header(&mut self) -> Result<()> {
        match self {
            SinkBackend::File(sink) => sink.write_header().await,
            SinkBackend::InMemory(sink) => sink.write_header().await,
        }
    }

    async fn receive(&mut self, batch: TupleBatch) -> Result<()> {
        match self {
            SinkBackend::File(sink) => sink.receive(batch).await,
            SinkBackend::InMemory(sink) => sink.receive(batch).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::File(sink) => sink.close().await,
            SinkBackend::InMemory(sink) => sink.close().await,
        }
    }
}
