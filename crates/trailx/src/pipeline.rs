// ai
//! 🚂 Pipeline: regions in, batches out, in exactly the order the store listed them.
//!
//! 🎬 *[a freight yard at night. thirty-three empty cars, one per region.]*
//! *[the driver checks the manifest: bucket, prefix, month. the whistle blows.]*
//! *[car one fills up. car two. on car three a signal goes red. the train stops. all of it.]*
//!
//! 🧠 Knowledge graph:
//! - [`RunPlan`]: everything the driver needs to know, resolved up front (regions already listed,
//!   `YYYYMM` already split). Built from an `AppConfig`.
//! - `PipelineDriver`: per region, `ListingWalker::into_key_stream → map_ok(extract) →
//!   try_buffered(fetch_concurrency)`, then each batch goes down the channel to the sink worker.
//!   `try_buffered` keeps key order, so the output is the same for any fan-out.
//! - First error wins and ends the run. Regions after it are never listed.
//! - Cancellation is checked before every region and raced against every pull and every send.
//!
//! 🦆 The duck rides in the caboose. It has never once been asked for its ticket.

use std::sync::Arc;

use async_channel::Sender;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app_config::AppConfig;
use crate::backends::StoreBackend;
use crate::common::{RegionSummary, RunSummary, TupleBatch};
use crate::error::{TrailError, TrailResult};
use crate::extract::RecordExtractor;
use crate::listing::{ListingWalker, YearMonth, key_prefix};
use crate::progress::ProgressMetrics;

/// 🗺️ The resolved plan for one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub bucket: String,
    pub prefix: String,
    pub year_month: YearMonth,
    pub page_size: usize,
    pub fetch_concurrency: usize,
    /// 🌍 In processing order.
    pub regions: Vec<String>,
}

impl RunPlan {
    /// 🔧 Pull the driver's share out of the config. `regions` comes from the catalog.
    pub fn new(config: &AppConfig, regions: Vec<String>) -> TrailResult<Self> {
        Ok(Self {
            bucket: config.source.bucket.clone(),
            prefix: config.source.prefix.clone(),
            year_month: YearMonth::parse(&config.source.year_month)?,
            page_size: config.source.page_size,
            fetch_concurrency: config.runtime.fetch_concurrency.max(1),
            regions,
        })
    }
}

/// 🚂 Walks every region of the plan and feeds the sink worker.
///
/// Owns its half of the channel: when the driver is done (or dead), the sender drops,
/// the channel closes, and the sink worker knows to wrap up.
#[derive(Debug)]
pub(crate) struct PipelineDriver {
    store: Arc<StoreBackend>,
    plan: RunPlan,
    extractor: RecordExtractor,
    tx: Sender<TupleBatch>,
    cancel: CancellationToken,
    progress: ProgressMetrics,
}

impl PipelineDriver {
    pub(crate) fn new(
        store: Arc<StoreBackend>,
        plan: RunPlan,
        extractor: RecordExtractor,
        tx: Sender<TupleBatch>,
        cancel: CancellationToken,
        progress: ProgressMetrics,
    ) -> Self {
        Self {
            store,
            plan,
            extractor,
            tx,
            cancel,
            progress,
        }
    }

    /// 🏁 Drive every region to completion, or stop at the first failure.
    pub(crate) async fn drive(mut self) -> TrailResult<RunSummary> {
        let mut summary = RunSummary::default();
        let regions = std::mem::take(&mut self.plan.regions);

        let outcome = async {
            for region in &regions {
                if self.cancel.is_cancelled() {
                    return Err(TrailError::Cancelled);
                }
                let region_summary = self.drive_region(region).await?;
                summary.regions.push(region_summary);
            }
            Ok(())
        }
        .await;

        self.progress.finish();
        self.tx.close();
        outcome.map(|()| summary)
    }

    async fn drive_region(&mut self, region: &str) -> TrailResult<RegionSummary> {
        let key_prefix = key_prefix(&self.plan.prefix, region, &self.plan.year_month);
        info!(
            "🌍 region {} → s3://{}/{}",
            region, self.plan.bucket, key_prefix
        );
        self.progress.region_started(region);

        let store: &StoreBackend = &self.store;
        let extractor = &self.extractor;
        let bucket = self.plan.bucket.as_str();

        let batches = ListingWalker::new(bucket, key_prefix, self.plan.page_size)
            .into_key_stream(store)
            .map_ok(move |key| async move { extractor.extract(store, bucket, &key).await })
            .try_buffered(self.plan.fetch_concurrency);
        let mut batches = std::pin::pin!(batches);

        let mut tally = RegionSummary {
            region: region.to_string(),
            ..RegionSummary::default()
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(TrailError::Cancelled),
                next = batches.try_next() => next?,
            };
            let Some(batch) = next else { break };

            let records = batch.len() as u64;
            tally.objects += 1;
            tally.records += records;
            if batch.skipped {
                tally.skipped_objects += 1;
            }
            self.progress.object_done(records, batch.skipped);
            debug!("📦 '{}' → sink ({} records)", batch.object_key, records);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(TrailError::Cancelled),
                sent = self.tx.send(batch) => sent.map_err(|_| TrailError::SinkClosed)?,
            }
        }

        info!(
            "✅ region {} done: {} objects, {} records, {} skipped",
            region, tally.objects, tally.records, tally.skipped_objects
        );
        Ok(tally)
    }
}
