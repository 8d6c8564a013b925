use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::Sink;
use crate::common::{HEADER, OutputTuple, TupleBatch};

#[derive(Debug, Default)]
struct SinkState {
    header: Option<Vec<String>>,
    rows: Vec<OutputTuple>,
    batches: Vec<String>,
    closed: bool,
    fail_after_rows: Option<usize>,
}

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// `InMemorySink` records the header, every row, and the key of every batch it received,
/// in arrival order. The `Arc<Mutex<..>>` is an existential nesting doll: shared ownership
/// of a thing that must be touched by one task at a time.
///
/// Clone-able because tests need to peek inside after handing `self` off to the
/// sink worker. Every clone shares the same state.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💣 A sink that accepts `rows` rows and then fails like a full disk.
    pub fn failing_after(rows: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                fail_after_rows: Some(rows),
                ..SinkState::default()
            })),
        }
    }

    pub async fn header(&self) -> Option<Vec<String>> {
        self.state.lock().await.header.clone()
    }

    pub async fn rows(&self) -> Vec<OutputTuple> {
        self.state.lock().await.rows.clone()
    }

    /// 🗝️ Object keys of the batches received, in arrival order.
    pub async fn batch_keys(&self) -> Vec<String> {
        self.state.lock().await.batches.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn write_header(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.header.is_some() {
            anyhow::bail!("💀 header written twice. the in-memory sink remembers. it always remembers.");
        }
        state.header = Some(HEADER.iter().map(|h| h.to_string()).collect());
        Ok(())
    }

    async fn receive(&mut self, batch: TupleBatch) -> Result<()> {
        // 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        let mut state = self.state.lock().await;
        state.batches.push(batch.object_key);
        for tuple in batch.tuples {
            if state.fail_after_rows.is_some_and(|limit| state.rows.len() >= limit) {
                anyhow::bail!("💀 in-memory sink is full (injected). no space left on imaginary device.");
            }
            state.rows.push(tuple);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // -- 🗑️ nothing to flush. we live in RAM. we just note that the door was shut.
        self.state.lock().await.closed = true;
        Ok(())
    }
}
