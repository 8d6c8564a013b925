//! 🎬 *[a channel fills with batches. somewhere, a sink waits.]*
//! *[the clock on the wall reads 2:47am.]*
//! *[nobody asked for this audit. and yet, here we are.]*
//!
//! 🗑️ The SinkWorker module: patient, tireless, and deeply unbothered by the chaos
//! happening upstream. It receives batches. It writes rows. It asks no questions.
//! It is the one and only writer of the output, and it takes that job personally.
//!
//! 🦆 (the duck has no comment at this time)
//!
//! ⚠️ When the channel closes, the SinkWorker drains what is left, closes the sink, and goes home.
//! When the sink fails, the SinkWorker drops the receiver on its way out, so the driver's
//! next send bounces instead of queueing into the void.

use anyhow::{Context, Result};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::Worker;
use crate::backends::{Sink, SinkBackend};
use crate::common::TupleBatch;

/// 🗑️ The SinkWorker: takes batches from a channel, hands their rows to the sink.
#[derive(Debug)]
pub(crate) struct SinkWorker {
    rx: Receiver<TupleBatch>,
    sink: SinkBackend,
}

impl SinkWorker {
    /// 🏗️ A receiver (the firehose) and a sink (the drain). Zero drama.
    pub(crate) fn new(rx: Receiver<TupleBatch>, sink: SinkBackend) -> Self {
        Self { rx, sink }
    }
}

impl Worker for SinkWorker {
    type Output = u64;

    /// 🚀 Drain until the channel is closed and empty. Returns how many rows went out.
    fn start(mut self) -> JoinHandle<Result<u64>> {
        tokio::spawn(async move {
            debug!("📥 SinkWorker started draining channel...");
            let mut rows_sunk = 0u64;
            loop {
                match self.rx.recv().await {
                    Ok(batch) => {
                        trace!(
                            "🪣 SinkWorker received '{}' with {} rows",
                            batch.object_key,
                            batch.len()
                        );
                        let rows = batch.len() as u64;
                        let object_key = batch.object_key.clone();
                        self.sink.receive(batch).await.with_context(|| {
                            format!("💀 SinkWorker failed to write the rows of '{object_key}'")
                        })?;
                        rows_sunk += rows;
                    }
                    Err(_) => {
                        // -- 🏁 closed and empty. the last batch has been written.
                        debug!("🏁 SinkWorker: channel closed after {} rows. Shutting down.", rows_sunk);
                        self.sink
                            .close()
                            .await
                            .context("💀 SinkWorker failed to close sink")?;
                        return Ok(rows_sunk);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemorySink;
    use crate::common::OutputTuple;

    fn a_batch(key: &str, rows: usize) -> TupleBatch {
        TupleBatch::new(key, vec![OutputTuple::default(); rows])
    }

    #[tokio::test]
    async fn the_one_where_the_worker_drains_then_closes() -> Result<()> {
        let the_sink = InMemorySink::new();
        let (tx, rx) = async_channel::bounded(2);
        let the_handle = SinkWorker::new(rx, SinkBackend::InMemory(the_sink.clone())).start();

        tx.send(a_batch("a", 2)).await?;
        tx.send(a_batch("b", 3)).await?;
        drop(tx);

        let the_rows = the_handle.await??;
        assert_eq!(the_rows, 5);
        assert_eq!(the_sink.batch_keys().await, vec!["a", "b"]);
        assert!(the_sink.is_closed().await);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_broken_sink_hangs_up_the_channel() -> Result<()> {
        let the_sink = InMemorySink::failing_after(1);
        let (tx, rx) = async_channel::bounded(4);
        let the_handle = SinkWorker::new(rx, SinkBackend::InMemory(the_sink.clone())).start();

        tx.send(a_batch("a", 3)).await?;
        let the_verdict = the_handle.await?;
        assert!(the_verdict.is_err());
        assert!(!the_sink.is_closed().await);
        // -- 🚪 the receiver went down with the worker, so nobody is listening anymore
        assert!(tx.send(a_batch("b", 1)).await.is_err());
        Ok(())
    }
}
