//! 🧵 Workers: the backbone of trailx, the unsung heroes, the ones who actually
//! do the work while the Supervisor takes all the credit in the sprint retro.
//!
//! 🚀 Two of them. The driver walks the bucket and fills the channel. The sink worker
//! empties the channel into the output. Neither knows the other exists. Very healthy.
//!
//! ⚠️ "If you're reading this, the code review went poorly." 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

mod sink_worker;
pub(crate) use sink_worker::SinkWorker;

use crate::common::RunSummary;
use crate::pipeline::PipelineDriver;

/// 🏗️ A background worker, that does work. duh.
///
/// 🎯 Start it, get a `JoinHandle`, await it later. The output type is whatever the
/// worker has to report once it is done.
///
/// "What's the DEAL with lifetime annotations? You borrow something,
///  you give it back. It's not that hard, Jerry!" (Seinfeld, on Rust)
pub(crate) trait Worker {
    type Output: Send + 'static;

    /// 🚀 Start the worker. Returns a JoinHandle because we trust
    /// but verify. Mostly verify. Okay, we don't trust at all.
    fn start(self) -> JoinHandle<Result<Self::Output>>;
}

impl Worker for PipelineDriver {
    type Output = RunSummary;

    fn start(self) -> JoinHandle<Result<RunSummary>> {
        tokio::spawn(async move { Ok(self.drive().await?) })
    }
}
