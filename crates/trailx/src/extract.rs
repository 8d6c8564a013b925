// ai
//! 🧩 Extract: bytes in, seven-column tuples out.
//!
//! 🎬 *[an object arrives. it is gzipped. it is always gzipped.]*
//! *[inside: a JSON document, one key, `Records`, and an array as long as a Monday.]*
//! *[each record has forty fields. we want seven. the other thirty-three are not invited.]*
//!
//! 🧠 Knowledge graph:
//! - [`RecordExtractor::extract`]: fetch → maybe gunzip (magic `1f 8b`) → parse `Records` → project.
//! - [`project_record`]: JSON-pointer lookups. Missing or non-string means `""`. Never fails.
//! - [`ObjectErrorPolicy`]: what a `Fetch`/`Parse` failure does to the run. `abort` ends it,
//!   `skip` logs a warning and hands back an empty batch marked skipped.
//!   Listing errors are not the extractor's business and never get skipped.
//!
//! 🦆 The duck has read every CloudTrail record ever written. It remains unimpressed.

use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backends::LogStore;
use crate::common::{OutputTuple, TupleBatch};
use crate::error::{TrailError, TrailResult};

// -- 🧙 first two bytes of every gzip member. RFC 1952 says so. we believe RFC 1952.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const EVENT_TIME: &str = "/eventTime";
const PRINCIPAL_ID: &str = "/userIdentity/principalId";
const EVENT_SOURCE: &str = "/eventSource";
const EVENT_NAME: &str = "/eventName";
const AWS_REGION: &str = "/awsRegion";
const SOURCE_IP_ADDRESS: &str = "/sourceIPAddress";
const USER_AGENT: &str = "/userAgent";

// ============================================================
//  🔧 Config
// ============================================================

/// 🎯 What an unreadable object does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectErrorPolicy {
    /// 💀 First bad object ends the run.
    #[default]
    Abort,
    /// 🙈 Log it, count it, move on.
    Skip,
}

impl fmt::Display for ObjectErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectErrorPolicy::Abort => f.write_str("abort"),
            ObjectErrorPolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for ObjectErrorPolicy {
    type Err = TrailError;

    fn from_str(raw: &str) -> TrailResult<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "abort" => Ok(ObjectErrorPolicy::Abort),
            "skip" => Ok(ObjectErrorPolicy::Skip),
            other => Err(TrailError::Config(format!(
                "on_object_error must be 'abort' or 'skip', got '{other}'"
            ))),
        }
    }
}

/// 🔧 Extractor settings. One knob, for now.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub on_object_error: ObjectErrorPolicy,
}

// ============================================================
//  🧩 RecordExtractor
// ============================================================

#[derive(Debug, Deserialize)]
struct LogDocument {
    #[serde(rename = "Records")]
    records: Vec<Value>,
}

/// 🧩 Turns one stored object into one [`TupleBatch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordExtractor {
    policy: ObjectErrorPolicy,
}

impl RecordExtractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            policy: config.on_object_error,
        }
    }

    /// 📥 Fetch, decode and project one object, applying the object error policy.
    pub async fn extract<S>(&self, store: &S, bucket: &str, key: &str) -> TrailResult<TupleBatch>
    where
        S: LogStore + ?Sized,
    {
        let outcome = match store.fetch(bucket, key).await {
            Ok(bytes) => decode_records(key, &bytes),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(tuples) => {
                debug!("🧩 '{}' gave up {} records", key, tuples.len());
                Ok(TupleBatch::new(key, tuples))
            }
            Err(e) if e.is_object_level() && self.policy == ObjectErrorPolicy::Skip => {
                warn!("🙈 skipping object: {}", e);
                Ok(TupleBatch::skipped(key))
            }
            Err(e) => Err(e),
        }
    }
}

/// 🔬 Decode an object body (gzip or plain) into projected tuples, in record order.
///
/// 💀 `Parse` when the bytes are broken gzip, broken JSON, or JSON without a `Records` array.
pub fn decode_records(key: &str, bytes: &[u8]) -> TrailResult<Vec<OutputTuple>> {
    let body = gunzip_if_needed(key, bytes)?;
    let document: LogDocument = serde_json::from_slice(&body).map_err(|e| TrailError::Parse {
        key: key.to_string(),
        detail: e.to_string(),
    })?;
    Ok(document.records.iter().map(project_record).collect())
}

fn gunzip_if_needed<'a>(key: &str, bytes: &'a [u8]) -> TrailResult<Cow<'a, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut inflated = Vec::with_capacity(bytes.len());
    MultiGzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(|e| TrailError::Parse {
            key: key.to_string(),
            detail: format!("gzip stream is corrupt: {e}"),
        })?;
    Ok(Cow::Owned(inflated))
}

/// 🎯 Project one record onto the seven output columns.
pub fn project_record(record: &Value) -> OutputTuple {
    OutputTuple {
        event_time: string_at(record, EVENT_TIME),
        operation_user: string_at(record, PRINCIPAL_ID),
        event_source: string_at(record, EVENT_SOURCE),
        event_name: string_at(record, EVENT_NAME),
        aws_region: string_at(record, AWS_REGION),
        source_ip_address: string_at(record, SOURCE_IP_ADDRESS),
        user_agent: string_at(record, USER_AGENT),
    }
}

fn string_at(record: &Value, pointer: &str) -> String {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde_json::json;

    use super::*;
    use crate::backends::InMemoryStore;

    fn a_full_record() -> Value {
        json!({
            "eventTime": "2020-03-01T00:00:00Z",
            "userIdentity": { "type": "IAMUser", "principalId": "AIDAEXAMPLE" },
            "eventSource": "s3.amazonaws.com",
            "eventName": "GetObject",
            "awsRegion": "us-east-1",
            "sourceIPAddress": "203.0.113.7",
            "userAgent": "aws-cli/2.0"
        })
    }

    fn gzipped(raw: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).expect("💀 gzip into a Vec cannot fail");
        encoder.finish().expect("💀 gzip into a Vec cannot fail")
    }

    #[test]
    fn the_one_where_every_column_finds_its_field() {
        let the_tuple = project_record(&a_full_record());
        assert_eq!(
            the_tuple.fields(),
            [
                "2020-03-01T00:00:00Z",
                "AIDAEXAMPLE",
                "s3.amazonaws.com",
                "GetObject",
                "us-east-1",
                "203.0.113.7",
                "aws-cli/2.0"
            ]
        );
    }

    #[test]
    fn the_one_where_the_principal_went_missing() {
        let mut the_record = a_full_record();
        the_record["userIdentity"] = json!({ "type": "AWSService" });
        let the_tuple = project_record(&the_record);
        assert_eq!(the_tuple.operation_user, "");
        assert_eq!(the_tuple.event_name, "GetObject");
        assert_eq!(the_tuple.user_agent, "aws-cli/2.0");
    }

    #[test]
    fn the_one_where_non_strings_become_empty_strings() {
        let the_tuple = project_record(&json!({
            "eventTime": 1583020800,
            "userIdentity": "not-an-object",
            "eventSource": null,
            "eventName": ["GetObject"],
            "awsRegion": "us-east-1"
        }));
        assert_eq!(the_tuple.event_time, "");
        assert_eq!(the_tuple.operation_user, "");
        assert_eq!(the_tuple.event_source, "");
        assert_eq!(the_tuple.event_name, "");
        assert_eq!(the_tuple.aws_region, "us-east-1");
        assert_eq!(project_record(&json!(42)), OutputTuple::default());
    }

    #[test]
    fn the_one_where_gzip_and_plain_decode_the_same() -> TrailResult<()> {
        let the_document = json!({ "Records": [a_full_record(), a_full_record()] }).to_string();
        let the_plain = decode_records("k.json", the_document.as_bytes())?;
        let the_zipped = decode_records("k.json.gz", &gzipped(the_document.as_bytes()))?;
        assert_eq!(the_plain.len(), 2);
        assert_eq!(the_plain, the_zipped);
        Ok(())
    }

    #[test]
    fn the_one_where_a_tiny_archive_inflates_way_past_its_size() -> TrailResult<()> {
        let the_records: Vec<Value> = (0..2000).map(|_| a_full_record()).collect();
        let the_document = json!({ "Records": the_records }).to_string();
        let the_zipped = gzipped(the_document.as_bytes());
        assert!(the_zipped.len() * 8 < the_document.len());

        let the_tuples = decode_records("k.json.gz", &the_zipped)?;
        assert_eq!(the_tuples.len(), 2000);
        assert_eq!(the_tuples[1999], project_record(&a_full_record()));
        Ok(())
    }

    #[test]
    fn the_one_where_documents_without_records_are_parse_errors() {
        for the_body in [
            &b"not json at all"[..],
            &br#"{"records": []}"#[..],
            &br#"{"Records": {"eventName": "nope"}}"#[..],
            &[0x1f_u8, 0x8b, 0x00, 0x01][..],
        ] {
            assert!(
                matches!(
                    decode_records("bad.json.gz", the_body),
                    Err(TrailError::Parse { .. })
                ),
                "💀 expected a Parse error for {:?}",
                String::from_utf8_lossy(the_body)
            );
        }
    }

    #[test]
    fn the_one_where_the_policy_parses_from_words() {
        assert_eq!("skip".parse::<ObjectErrorPolicy>().ok(), Some(ObjectErrorPolicy::Skip));
        assert_eq!("ABORT".parse::<ObjectErrorPolicy>().ok(), Some(ObjectErrorPolicy::Abort));
        assert!("shrug".parse::<ObjectErrorPolicy>().is_err());
    }

    #[tokio::test]
    async fn the_one_where_abort_lets_the_parse_error_through() {
        let the_store = InMemoryStore::new();
        the_store.put_object("logs", "ct/bad.json", b"{oops".to_vec()).await;
        let the_extractor = RecordExtractor::default();

        assert!(matches!(
            the_extractor.extract(&the_store, "logs", "ct/bad.json").await,
            Err(TrailError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn the_one_where_skip_swallows_fetch_and_parse_errors() -> TrailResult<()> {
        let the_store = InMemoryStore::new();
        the_store.put_object("logs", "ct/bad.json", b"{oops".to_vec()).await;
        the_store.put_object("logs", "ct/gone.json", b"{}".to_vec()).await;
        the_store.fail_fetch_of("ct/gone.json").await;
        let the_extractor = RecordExtractor::new(&ExtractConfig {
            on_object_error: ObjectErrorPolicy::Skip,
        });

        let the_bad = the_extractor.extract(&the_store, "logs", "ct/bad.json").await?;
        let the_gone = the_extractor.extract(&the_store, "logs", "ct/gone.json").await?;
        assert!(the_bad.skipped && the_bad.is_empty());
        assert!(the_gone.skipped && the_gone.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_good_object_becomes_a_batch() -> TrailResult<()> {
        let the_store = InMemoryStore::new();
        let the_body = gzipped(json!({ "Records": [a_full_record()] }).to_string().as_bytes());
        the_store.put_object("logs", "ct/good.json.gz", the_body).await;

        let the_batch = RecordExtractor::default()
            .extract(&the_store, "logs", "ct/good.json.gz")
            .await?;
        assert_eq!(the_batch.object_key, "ct/good.json.gz");
        assert!(!the_batch.skipped);
        assert_eq!(the_batch.len(), 1);
        Ok(())
    }
}
