// ai
//! 🪵 trailx: every audit log in every region for one month, flattened into one CSV.
//!
//! 🎬 COLD OPEN. INT. COMPLIANCE OFFICE, FRIDAY, 4:58 PM
//!
//! "I need to know who called `DeleteBucket` in March. All regions. By Monday."
//! The engineer looked at the bucket. Thirty-three regions. Thousands of gzipped objects.
//! Nested JSON with forty fields per record. They needed seven.
//! They typed `trailx --bucket logs --ym 202003` and went home for the weekend.
//!
//! 🧠 Knowledge graph:
//! - [`run`]: the whole thing. Validate config → catalog → S3 session → fresh output file → supervisor.
//! - [`run_with`]: same, with the catalog, store and sink handed in (in-memory ones included).
//! - Data flow: catalog → regions → listing walker → keys → extractor → batches → channel →
//!   sink worker → sink. One writer. Listing order in, listing order out.
//!
//! 🦆 The duck has filed its own audit report. It found nothing. It is suspicious of that.

pub mod app_config;
pub mod backends;
pub mod catalog;
pub mod common;
pub mod error;
pub mod extract;
pub mod listing;
pub mod pipeline;
pub mod progress;
mod supervisors;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::app_config::AppConfig;
use crate::backends::{FileSink, S3Store, SinkBackend, StoreBackend};
use crate::catalog::RegionCatalog;
use crate::supervisors::Supervisor;

pub use crate::common::{OutputTuple, RegionSummary, RunSummary};
pub use crate::error::{TrailError, TrailResult};

/// 🚀 Run the extraction against the real bucket, writing the configured CSV file.
///
/// Nothing touches the network or the disk until the config has passed validation.
pub async fn run(app_config: AppConfig, cancel: CancellationToken) -> Result<RunSummary> {
    app_config
        .validate()
        .context("💀 The configuration parsed, but it does not make sense.")?;

    let catalog = RegionCatalog::from_config(&app_config.catalog)
        .await
        .context("💀 Could not load the region catalog.")?;

    let store = S3Store::connect(&app_config.source)
        .await
        .context("💀 Could not set up the S3 session. Check the keys, the proxy, the endpoint.")?;

    let sink = FileSink::new(app_config.sink.clone())
        .await
        .context("💀 Could not prepare the output file.")?;

    run_with(
        app_config,
        &catalog,
        StoreBackend::S3(store),
        SinkBackend::File(sink),
        cancel,
    )
    .await
}

/// 🔌 Run the extraction with caller-supplied parts. The sink must be fresh: the header goes first.
pub async fn run_with(
    app_config: AppConfig,
    catalog: &RegionCatalog,
    store: StoreBackend,
    sink: SinkBackend,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    app_config
        .validate()
        .context("💀 The configuration parsed, but it does not make sense.")?;

    Supervisor::new(app_config)
        .start_workers(catalog, store, sink, cancel)
        .await
}
