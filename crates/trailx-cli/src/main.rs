//! 🚀 trailx-cli: the front door, the bouncer, the maitre d' of trailx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that parses flags, loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆
//!
//! Flags keep their classic single-dash spelling too: `-bucket logs -ym 202003` works,
//! and so does `--bucket logs --ym 202003`.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trailx::RunSummary;
use trailx::app_config::{AppConfig, ConfigOverrides, load_config_with};
use trailx::extract::ObjectErrorPolicy;

/// 🪵 Extract one month of audit logs from every region into a CSV file.
#[derive(Debug, Parser)]
#[command(name = "trailx", version)]
struct Cli {
    /// Bucket holding the audit logs
    #[arg(long)]
    bucket: Option<String>,
    /// Static access key (used only together with -sKey)
    #[arg(long = "aKey")]
    access_key: Option<String>,
    /// Static secret key (used only together with -aKey)
    #[arg(long = "sKey")]
    secret_key: Option<String>,
    /// HTTP(S) proxy URL for every store request
    #[arg(long)]
    proxy: Option<String>,
    /// Month to extract, as YYYYMM [default: 201801]
    #[arg(long)]
    ym: Option<String>,
    /// Output file, recreated on every run [default: ./result.csv]
    #[arg(long)]
    path: Option<String>,
    /// Fixed key segment in front of `<region>/<yyyy>/<mm>/`
    #[arg(long)]
    prefix: Option<String>,
    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Region catalog partition [default: aws]
    #[arg(long)]
    partition: Option<String>,
    /// Walk only this region (repeatable), bypassing the catalog
    #[arg(long = "region")]
    regions: Vec<String>,
    /// What a broken object does to the run: abort or skip [default: abort]
    #[arg(long = "on-object-error")]
    on_object_error: Option<ObjectErrorPolicy>,
    /// Objects fetched at once inside one region [default: 1]
    #[arg(long = "fetch-concurrency")]
    fetch_concurrency: Option<usize>,
    /// Custom S3 endpoint (MinIO, LocalStack)
    #[arg(long)]
    endpoint: Option<String>,
    /// Do not draw the progress spinner
    #[arg(long = "no-progress")]
    no_progress: bool,
}

// -- 🏷️ every long flag, so `-bucket` can be read as `--bucket` the way the classic tool accepted it
const LONG_FLAGS: [&str; 14] = [
    "bucket",
    "aKey",
    "sKey",
    "proxy",
    "ym",
    "path",
    "prefix",
    "config",
    "partition",
    "region",
    "on-object-error",
    "fetch-concurrency",
    "endpoint",
    "no-progress",
];

/// 🔁 `-bucket` → `--bucket`, `-ym=202003` → `--ym=202003`. Everything else passes through untouched.
fn normalize_single_dash_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            if LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bucket: self.bucket.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            proxy: self.proxy.clone(),
            year_month: self.ym.clone(),
            path: self.path.clone(),
            prefix: self.prefix.clone(),
            endpoint: self.endpoint.clone(),
            partition: self.partition.clone(),
            regions: (!self.regions.is_empty()).then(|| self.regions.clone()),
            on_object_error: self.on_object_error,
            fetch_concurrency: self.fetch_concurrency,
            show_progress: self.no_progress.then_some(false),
        }
    }
}

/// 🔧 Flags + optional file + env → one validated-later `AppConfig`.
fn load(cli: &Cli) -> Result<AppConfig> {
    // 🔒 Validate the config file exists before we get too emotionally attached
    if let Some(config_file) = &cli.config {
        let exists = config_file.try_exists().with_context(|| {
            format!(
                "💀 Could not check whether the configuration file exists. Was checking here: '{}'",
                config_file.display()
            )
        })?;
        if !exists {
            anyhow::bail!(
                "💀 Configuration file '{}' does not exist. Maybe it's pwd/cwd and relative paths; \
                 use an absolute path to be absolutely certain.",
                config_file.display()
            );
        }
    }

    load_config_with(cli.config.as_deref(), &cli.overrides())
        .context("💀 In trailx-cli, main, we couldn't load the configuration. Check the flags, the file and the TRAILX_* variables.")
}

/// 🛑 Ctrl-C flips the cancellation token. The pipeline notices, drains, and closes the file.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received. Finishing the rows already in flight, then stopping.");
            cancel.cancel();
        }
    });
}

async fn run(app_config: AppConfig) -> Result<RunSummary> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    trailx::run(app_config, cancel).await
}

/// 🧅 Peel the onion of sadness, one layer at a time, then leave a hint if it smells like the network.
fn report(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    let mut the_vibes_are_giving_credential_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        let cause_str = cause.to_string();
        if cause_str.contains("dispatch failure")
            || cause_str.contains("Connection refused")
            || cause_str.contains("connection refused")
            || cause_str.contains("dns error")
            || cause_str.contains("timed out")
        {
            the_vibes_are_giving_connection_issues = true;
        }
        if cause_str.contains("AccessDenied")
            || cause_str.contains("InvalidAccessKeyId")
            || cause_str.contains("SignatureDoesNotMatch")
            || cause_str.contains("no credentials")
        {
            the_vibes_are_giving_credential_issues = true;
        }
    }

    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: the object store isn't reachable. Check -proxy, -endpoint, and whether \
             this machine can reach S3 at all. Even clouds need a nudge sometimes. ☕"
        );
    }
    if the_vibes_are_giving_credential_issues {
        error!(
            "🔑 hint: the store said no. Check -aKey/-sKey (both or neither), or the ambient \
             AWS profile, and that it may list and read the bucket."
        );
    }

    // -- 📟 and one line on stderr for whoever is reading the terminal instead of the logs
    eprintln!("trailx: {err:#}");
}

/// 🚀 main(): where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (stderr, `RUST_LOG`, default `info`)
/// 2. Parse flags, load config
/// 3. Build the runtime and run the thing (send it and pray 🙏)
/// 4. Print the receipt, or cry and exit 1
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_from(normalize_single_dash_flags(std::env::args_os()));

    let result = load(&cli).and_then(|app_config| {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("💀 Could not build the tokio runtime. The async overlord refused to wake up.")?;
        runtime.block_on(run(app_config))
    });

    match result {
        Ok(summary) => {
            info!("✅ extract complete");
            println!("{}", trailx::progress::summary_table(&summary));
        }
        Err(err) => {
            report(&err);
            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}
