//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 *[dramatic orchestral music swells]*
//! 🎬 "In a world where audit logs pile up in thirty-three regions..."
//! 🎬 "One supervisor dared to read them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module: part middle manager, part helicopter parent,
//! part that one project manager who schedules a meeting to plan the next meeting.
//!
//! 🧠 Knowledge graph:
//! - Lists the regions, writes the header, opens the bounded channel.
//! - Starts the sink worker (only writer) and the pipeline driver (only reader of the store).
//! - Joins both. A dead sink outranks whatever the driver said about it afterwards:
//!   when the sink dies first, the driver only ever sees `SinkClosed`, which is a symptom.
//!
//! ⚠️ DO NOT MAKE THE WORKERS PUB EVER
//! 💀 WORKERS ARE SUPERVISORS PRIVATE LITTLE MINIONS WHOM THE WORLD FORGOT ABOUT
//! 🔒 Like Fight Club, but for async tasks. First rule: you don't pub the workers.

mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::{Sink, SinkBackend, StoreBackend};
use crate::catalog::RegionCatalog;
use crate::common::RunSummary;
use crate::extract::RecordExtractor;
use crate::pipeline::{PipelineDriver, RunPlan};
use crate::progress::ProgressMetrics;
use workers::{SinkWorker, Worker};

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?" every 5 milliseconds.
pub(crate) struct Supervisor {
    /// 🔧 The sacred scrolls of configuration, passed down from `run()`
    app_config: AppConfig,
}

impl Supervisor {
    /// 🚀 Birth of a Supervisor. It's like a baby, but less crying.
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🧵 Unleash the workers and wait for both of them to come home.
    pub(crate) async fn start_workers(
        &self,
        catalog: &RegionCatalog,
        store: StoreBackend,
        mut sink: SinkBackend,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let partition = &self.app_config.catalog.partition;
        let regions = catalog
            .list_regions(partition)
            .context("💀 Could not enumerate regions. The atlas has no page for that partition.")?;
        let plan = RunPlan::new(&self.app_config, regions)
            .context("💀 Could not build a run plan out of this configuration.")?;
        info!(
            "🚀 {} regions, bucket '{}', prefix '{}', month {}",
            plan.regions.len(),
            plan.bucket,
            plan.prefix,
            plan.year_month
        );

        sink.write_header()
            .await
            .context("💀 Could not write the header. The file exists. The header does not.")?;

        let runtime = &self.app_config.runtime;
        let (tx, rx) = async_channel::bounded(runtime.queue_capacity.max(1));
        let progress = if runtime.show_progress {
            ProgressMetrics::new(plan.regions.len())
        } else {
            ProgressMetrics::hidden(plan.regions.len())
        };

        let sink_handle = SinkWorker::new(rx, sink).start();
        let driver_handle = PipelineDriver::new(
            Arc::new(store),
            plan,
            RecordExtractor::new(&self.app_config.extract),
            tx,
            cancel,
            progress,
        )
        .start();

        // -- ⏳ driver first: its end closes the channel, which is what lets the sink worker end
        let driven = driver_handle
            .await
            .context("💀 The pipeline driver task panicked or was aborted.")?;
        let sunk = sink_handle
            .await
            .context("💀 The sink worker task panicked or was aborted.")?;

        match (driven, sunk) {
            (_, Err(sink_error)) => Err(sink_error.context("💀 The sink worker gave up mid-run.")),
            (Err(driver_error), Ok(_)) => {
                Err(driver_error.context("💀 The pipeline stopped before every region was read."))
            }
            (Ok(summary), Ok(rows)) => {
                info!(
                    "🏁 done: {} objects, {} records, {} rows written, {} objects skipped",
                    summary.total_objects(),
                    summary.total_records(),
                    rows,
                    summary.total_skipped()
                );
                Ok(summary)
            }
        }
    }
}
