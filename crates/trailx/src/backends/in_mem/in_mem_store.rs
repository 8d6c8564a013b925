use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::backends::{ListingPage, LogStore};
use crate::error::{TrailError, TrailResult};

// -- 🔖 cursors look like "after:<key>". opaque to callers, legible to whoever is debugging at 3am.
const CURSOR_PREFIX: &str = "after:";

/// 📒 One entry in the listing call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub bucket: String,
    pub key_prefix: String,
    pub cursor: Option<String>,
    pub max_keys: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    // -- 🗂️ BTreeMap so listing order is lexicographic, same as the real thing
    objects: BTreeMap<(String, String), Vec<u8>>,
    failing_prefixes: HashSet<String>,
    failing_keys: HashSet<String>,
    cancel_on_fetch: HashMap<String, CancellationToken>,
    list_calls: Vec<ListCall>,
    fetch_calls: Vec<String>,
}

/// 🪣 An object store that lives and dies with the process.
///
/// Clone-able: every clone shares the same state, so a test can keep one handle for
/// assertions and give the other to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📥 Drop an object into the pretend bucket.
    pub async fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .await
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// 💣 Every listing whose key prefix starts with `prefix` fails from now on.
    pub async fn fail_listing_under(&self, prefix: &str) {
        self.state
            .lock()
            .await
            .failing_prefixes
            .insert(prefix.to_string());
    }

    /// 💣 Fetching this key fails from now on.
    pub async fn fail_fetch_of(&self, key: &str) {
        self.state.lock().await.failing_keys.insert(key.to_string());
    }

    /// 🛑 Fetching this key pulls the plug on `cancel`. The fetch itself still answers.
    pub async fn cancel_when_fetching(&self, key: &str, cancel: CancellationToken) {
        self.state
            .lock()
            .await
            .cancel_on_fetch
            .insert(key.to_string(), cancel);
    }

    pub async fn list_calls(&self) -> Vec<ListCall> {
        self.state.lock().await.list_calls.clone()
    }

    pub async fn fetch_calls(&self) -> Vec<String> {
        self.state.lock().await.fetch_calls.clone()
    }
}

#[async_trait]
impl LogStore for InMemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        key_prefix: &str,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> TrailResult<ListingPage> {
        let mut state = self.state.lock().await;
        state.list_calls.push(ListCall {
            bucket: bucket.to_string(),
            key_prefix: key_prefix.to_string(),
            cursor: cursor.map(str::to_string),
            max_keys,
        });

        if state
            .failing_prefixes
            .iter()
            .any(|p| key_prefix.starts_with(p.as_str()))
        {
            return Err(TrailError::List {
                key_prefix: key_prefix.to_string(),
                detail: "AccessDenied (injected)".to_string(),
            });
        }

        let start_after = match cursor {
            None => None,
            Some(token) => Some(token.strip_prefix(CURSOR_PREFIX).ok_or_else(|| {
                TrailError::List {
                    key_prefix: key_prefix.to_string(),
                    detail: format!("unrecognized continuation cursor '{token}'"),
                }
            })?),
        };

        let page_cap = max_keys.max(1);
        let mut matching = state
            .objects
            .keys()
            .filter(|(b, key)| b == bucket && key.starts_with(key_prefix))
            .map(|(_, key)| key)
            .filter(|key| start_after.is_none_or(|after| key.as_str() > after));

        let keys: Vec<String> = matching.by_ref().take(page_cap).cloned().collect();
        let has_more = matching.next().is_some();

        trace!(
            "🧠 in-memory listing under '{}' handed out {} keys (more: {})",
            key_prefix,
            keys.len(),
            has_more
        );

        match (has_more, keys.last()) {
            (true, Some(last)) => {
                let next = format!("{CURSOR_PREFIX}{last}");
                Ok(ListingPage::truncated(keys, next))
            }
            _ => Ok(ListingPage::last(keys)),
        }
    }

    async fn fetch(&self, bucket: &str, key: &str) -> TrailResult<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.fetch_calls.push(key.to_string());
        if let Some(cancel) = state.cancel_on_fetch.get(key) {
            cancel.cancel();
        }

        if state.failing_keys.contains(key) {
            return Err(TrailError::Fetch {
                key: key.to_string(),
                detail: "InternalError (injected)".to_string(),
            });
        }

        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| TrailError::Fetch {
                key: key.to_string(),
                detail: "NoSuchKey".to_string(),
            })
    }
}
