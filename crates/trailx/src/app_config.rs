//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer, 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph: who wins, lowest to highest:
//! 1. serde defaults (`year_month = 201801`, `file_name = ./result.csv`, `partition = aws`, ...)
//! 2. `TRAILX_*` env vars, `__` for nesting: `TRAILX_SOURCE__BUCKET=logs`
//! 3. the TOML file, if one was given
//! 4. CLI flags, via [`ConfigOverrides`]

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
// 🚀 tracing::info: because println! in production is a cry for help.
use tracing::info;

use crate::backends::{FileSinkConfig, S3SourceConfig};
use crate::catalog::CatalogConfig;
use crate::error::{TrailError, TrailResult};
use crate::extract::{ExtractConfig, ObjectErrorPolicy};
use crate::listing::YearMonth;

// -- 📄 S3 refuses to hand out more than this many keys per ListObjectsV2 page anyway
const MAX_PAGE_SIZE: usize = 1000;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// 🪣 Where the logs live and how to get at them.
    pub source: S3SourceConfig,
    /// 📄 Where the CSV lands.
    #[serde(default)]
    pub sink: FileSinkConfig,
    /// 🗺️ Which regions to walk.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// 🧩 What a broken object does to the run.
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// ⚙️ The knobs for how hard the pipeline works, not what it works on.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuntimeConfig {
    /// 📬 Batches allowed to wait between the driver and the sink worker.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    /// 🔀 Objects fetched at once inside one region. Output order does not change.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// 📊 Draw the spinner on stderr.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            fetch_concurrency: default_fetch_concurrency(),
            show_progress: default_show_progress(),
        }
    }
}

fn default_queue_capacity() -> usize {
    10
}

fn default_fetch_concurrency() -> usize {
    // -- 🐢 one at a time, exactly like the good old nested loops
    1
}

fn default_show_progress() -> bool {
    true
}

/// 🔢 What a text field may arrive as once figment has had its way with an env var.
///
/// `TRAILX_SOURCE__YEAR_MONTH=202003` is an unsigned int by the time serde sees it, and so is a
/// bucket called `123456`. Numbers and flags go back to being text. Quote the value
/// (`TRAILX_SOURCE__BUCKET='"007"'`) to keep leading zeros.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

/// 🔤 `deserialize_with` for text fields that env vars may have turned into numbers.
pub(crate) fn text_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(String::from)
}

/// 🔤 Same, for the optional ones.
pub(crate) fn optional_text_from_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|scalar| scalar.map(String::from))
}

impl AppConfig {
    /// 🧪 A config with every default and just a bucket. Handy for tests and embedders.
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Self {
            source: S3SourceConfig {
                bucket: bucket.into(),
                prefix: String::new(),
                year_month: "201801".to_string(),
                page_size: 100,
                access_key: None,
                secret_key: None,
                proxy: None,
                endpoint: None,
                force_path_style: false,
                session_region: "ap-northeast-1".to_string(),
            },
            sink: FileSinkConfig::default(),
            catalog: CatalogConfig::default(),
            extract: ExtractConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// 🔍 The cross-field sanity check. Runs before anything touches the disk or the network.
    pub fn validate(&self) -> TrailResult<()> {
        if self.source.bucket.trim().is_empty() {
            return Err(TrailError::Config(
                "source.bucket is required (--bucket)".to_string(),
            ));
        }
        YearMonth::parse(&self.source.year_month)?;
        if !(1..=MAX_PAGE_SIZE).contains(&self.source.page_size) {
            return Err(TrailError::Config(format!(
                "source.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.source.page_size
            )));
        }
        if self.runtime.queue_capacity == 0 {
            return Err(TrailError::Config(
                "runtime.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.runtime.fetch_concurrency == 0 {
            return Err(TrailError::Config(
                "runtime.fetch_concurrency must be at least 1".to_string(),
            ));
        }
        self.sink.validate()
    }
}

/// 🎛️ Values from the command line. `None` means "the flag was not given, let the layers below decide".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bucket: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub proxy: Option<String>,
    pub year_month: Option<String>,
    pub path: Option<String>,
    pub prefix: Option<String>,
    pub endpoint: Option<String>,
    pub partition: Option<String>,
    pub regions: Option<Vec<String>>,
    pub on_object_error: Option<ObjectErrorPolicy>,
    pub fetch_concurrency: Option<usize>,
    pub show_progress: Option<bool>,
}

impl ConfigOverrides {
    /// 🏗️ Stack every given flag on top of the figment, each at its dotted key.
    fn layer_onto(&self, figment: Figment) -> Figment {
        fn put<T: Serialize>(figment: Figment, key: &str, value: &Option<T>) -> Figment {
            match value {
                Some(value) => figment.merge(Serialized::default(key, value)),
                None => figment,
            }
        }

        let figment = put(figment, "source.bucket", &self.bucket);
        let figment = put(figment, "source.access_key", &self.access_key);
        let figment = put(figment, "source.secret_key", &self.secret_key);
        let figment = put(figment, "source.proxy", &self.proxy);
        let figment = put(figment, "source.year_month", &self.year_month);
        let figment = put(figment, "source.prefix", &self.prefix);
        let figment = put(figment, "source.endpoint", &self.endpoint);
        let figment = put(figment, "sink.file_name", &self.path);
        let figment = put(figment, "catalog.partition", &self.partition);
        let figment = put(figment, "catalog.regions", &self.regions);
        let figment = put(figment, "extract.on_object_error", &self.on_object_error);
        let figment = put(figment, "runtime.fetch_concurrency", &self.fetch_concurrency);
        put(figment, "runtime.show_progress", &self.show_progress)
    }
}

/// 🚀 Load the config: from env vars and an optional file, nothing else.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    load_config_with(config_file_name, &ConfigOverrides::default())
}

/// 🚀 Load the config: from a file, from env vars, from the command line, or from the sheer power of hoping.
///
/// 📐 DESIGN NOTE (no cap, this is tribal knowledge):
///   - If `config_file_name` is None  → env vars + flags. No file. No assumptions.
///   - If `config_file_name` is Some  → env vars + TOML file + flags. TOML beats env, flags beat everything.
///
/// 💀 Returns an error if config is unparseable. Check the error message though,
/// it's contextual, informative, and written with love. Or despair. Hard to tell at 3am.
pub fn load_config_with(
    config_file_name: Option<&Path>,
    overrides: &ConfigOverrides,
) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ Env vars are the base layer: like a good sourdough starter.
    let config = Figment::new().merge(Env::prefixed("TRAILX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let config = overrides.layer_onto(config);

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}', environment variables (TRAILX_*) and flags. \
             The file exists in our hearts, but apparently not in a shape serde likes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (TRAILX_*) and flags. \
                 No file was provided: this one's all on the environment. Classic."
            .to_string(),
    };

    // ✅ or 💀, there is no try. actually there is, it's called `?`
    config.extract().context(context_msg)
}
