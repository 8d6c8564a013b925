// ai
//! 🪣📡 S3 Store: listing pages and fetching objects from a real bucket.
//!
//! COLD OPEN. EXT. DATA CENTER, 3:47 AM
//!
//! "We need every audit event from March," the auditor whispered. "All regions."
//! The cursor blinked. The S3Store blinked back. "Page size one hundred," it said,
//! "continuation tokens verbatim. I got you, fam."

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::config::SharedHttpClient;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_smithy_http_client::proxy::ProxyConfig;
use aws_smithy_http_client::{Builder as HttpClientBuilder, Connector, tls};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::app_config::{optional_text_from_scalar, text_from_scalar};
use crate::backends::{ListingPage, LogStore};
use crate::error::{TrailError, TrailResult};

// ============================================================
//  🔧 S3SourceConfig: where the logs live and how to get in
// ============================================================

/// 🔧 Configuration for the S3 source: what to walk, and how to authenticate while walking it.
///
/// KNOWLEDGE GRAPH: config lives co-located with the backend that uses it.
/// `bucket` is required. Everything else has a default that matches the classic flags:
/// `year_month = 201801`, empty prefix, 100 keys per page, session region `ap-northeast-1`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct S3SourceConfig {
    /// 🪣 The bucket holding the trail
    #[serde(deserialize_with = "text_from_scalar")]
    pub bucket: String,
    /// 🧭 Fixed key segment before `<region>/<yyyy>/<mm>/`
    #[serde(default, deserialize_with = "text_from_scalar")]
    pub prefix: String,
    /// 📅 `YYYYMM`: the month to extract
    #[serde(default = "default_year_month", deserialize_with = "text_from_scalar")]
    pub year_month: String,
    /// 📄 Keys per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// 🔑 Static access key. Ignored unless the secret key is there too.
    #[serde(default, deserialize_with = "optional_text_from_scalar")]
    pub access_key: Option<String>,
    /// 🔒 Static secret key. If this is in plaintext in your config file, I've already
    /// filed a complaint with the Department of Security Choices.
    #[serde(default, deserialize_with = "optional_text_from_scalar")]
    pub secret_key: Option<String>,
    /// 🌐 HTTP(S) proxy for every store request
    #[serde(default)]
    pub proxy: Option<String>,
    /// 🧪 Custom endpoint (MinIO, LocalStack, the S3 clone in the basement)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 🛣️ Path-style addressing, which most S3 clones insist on
    #[serde(default)]
    pub force_path_style: bool,
    /// 🌏 Region the client signs requests for
    #[serde(default = "default_session_region")]
    pub session_region: String,
}

fn default_year_month() -> String {
    "201801".to_string()
}

fn default_page_size() -> usize {
    // -- 📄 one hundred keys. enough to make progress, small enough to not wait forever for a page.
    100
}

fn default_session_region() -> String {
    "ap-northeast-1".to_string()
}

impl S3SourceConfig {
    /// 🔑 Static credentials, but only when both halves showed up and neither is blank.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let access = self.access_key.as_deref().filter(|k| !k.is_empty())?;
        let secret = self.secret_key.as_deref().filter(|k| !k.is_empty())?;
        Some((access, secret))
    }

    /// 🌐 The proxy URL, if a non-blank one was configured.
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy.as_deref().filter(|p| !p.is_empty())
    }
}

// ============================================================
//  🪣 S3Store: the client wrapper
// ============================================================

/// 🪣 The real object store. One client, shared by every listing and fetch of the run.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// 🚀 Build the client: session region, optional static credentials, optional proxy,
    /// optional endpoint.
    ///
    /// 💀 Fails with `Session` when credentials are half-configured or the proxy is nonsense.
    pub async fn connect(config: &S3SourceConfig) -> TrailResult<Self> {
        let half_configured = config.static_credentials().is_none()
            && (config.access_key.as_deref().is_some_and(|k| !k.is_empty())
                || config.secret_key.as_deref().is_some_and(|k| !k.is_empty()));
        if half_configured {
            return Err(TrailError::Session(
                "static credentials need both an access key and a secret key".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.session_region.clone()));

        if let Some(proxy) = config.proxy_url() {
            debug!("🌐 store requests are routed through {}", proxy);
            loader = loader.http_client(proxied_http_client(proxy)?);
        }

        if let Some((access_key, secret_key)) = config.static_credentials() {
            debug!("🔑 using static credentials from configuration");
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "trailx-static",
            ));
        } else {
            debug!("🔑 using the ambient AWS credential chain");
        }

        let sdk_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }
        if config.force_path_style {
            s3_config = s3_config.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
        })
    }
}

/// 🌐 An HTTPS-capable client that sends every request, plain or TLS, through `proxy`.
fn proxied_http_client(proxy: &str) -> TrailResult<SharedHttpClient> {
    if !(proxy.starts_with("http://") || proxy.starts_with("https://")) {
        return Err(TrailError::Session(format!(
            "proxy '{proxy}' is not an http:// or https:// URL"
        )));
    }
    let proxy_config = ProxyConfig::all(proxy)
        .map_err(|e| TrailError::Session(format!("proxy '{proxy}' is unusable: {e}")))?;

    Ok(HttpClientBuilder::new().build_with_connector_fn(
        move |settings, runtime_components| {
            let mut connector = Connector::builder()
                .proxy_config(proxy_config.clone())
                .tls_provider(tls::Provider::Rustls(
                    tls::rustls_provider::CryptoMode::AwsLc,
                ));
            connector.set_connector_settings(settings.cloned());
            if let Some(components) = runtime_components {
                connector.set_sleep_impl(components.sleep_impl());
            }
            connector.build()
        },
    ))
}

#[async_trait]
impl LogStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        key_prefix: &str,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> TrailResult<ListingPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(key_prefix)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX));

        if let Some(token) = cursor {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| TrailError::List {
            key_prefix: key_prefix.to_string(),
            detail: DisplayErrorContext(&e).to_string(),
        })?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        trace!(
            "🪣 s3://{}/{} page: {} keys, truncated={:?}",
            bucket,
            key_prefix,
            keys.len(),
            response.is_truncated()
        );

        ListingPage::from_store_reply(
            key_prefix,
            keys,
            response.is_truncated().unwrap_or(false),
            response.next_continuation_token().map(str::to_string),
        )
    }

    async fn fetch(&self, bucket: &str, key: &str) -> TrailResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TrailError::Fetch {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        let body = response.body.collect().await.map_err(|e| TrailError::Fetch {
            key: key.to_string(),
            detail: format!("body stream broke mid-read: {e}"),
        })?;

        Ok(body.into_bytes().to_vec())
    }
}

// ============================================================
//  🧪 Tests: "trust but verify" is for diplomats.
//  Engineers say "trust nothing, test everything, blame DNS."
// ============================================================
