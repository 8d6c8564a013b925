// ai
//! 📜 Listing: walking a region's month of logs, one page at a time.
//!
//! 🎬 COLD OPEN. INT. OBJECT STORE, SOMEWHERE BETWEEN PAGE 1 AND PAGE ∞
//!
//! "How many objects are there?" asked the driver.
//! "A hundred," said the store. "And a cursor."
//! "And after that?"
//! "Another hundred. And another cursor."
//! "...And after THAT?"
//! "Thirty-seven. No cursor. Go home."
//!
//! 🧠 Knowledge graph:
//! - [`YearMonth`]: a six-character `YYYYMM`, split by position. Numbers not checked. Length is.
//! - [`key_prefix`]: `prefix + region + "/" + YYYY + "/" + MM + "/"`. String glue. Nothing clever.
//! - [`ListingWalker`]: `Start → Continue(cursor) → Done`. The cursor is passed back verbatim.
//!   Once done, the walker never calls the store again.
//! - [`ListingWalker::into_key_stream`]: the same walk as a lazy `Stream` of keys, in listing order.
//!   The next page is requested only when the previous page's keys have been pulled.
//!
//! 🦆 The duck once tried to paginate by hand. It still talks about page 3.

use std::fmt;

use futures::{Stream, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backends::{ListingPage, LogStore};
use crate::error::{TrailError, TrailResult};

// ============================================================
//  📅 YearMonth
// ============================================================

/// 📅 A `YYYYMM` value, already split into its year and month halves.
///
/// Exactly six characters or it doesn't get built. `"2020ab"` is welcome: it just produces a
/// prefix that matches nothing, which is the store's problem to report, not ours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: String,
    month: String,
}

impl YearMonth {
    /// 🔬 Split `raw` at character 4. Anything other than six characters is a config error.
    pub fn parse(raw: &str) -> TrailResult<Self> {
        if raw.chars().count() != 6 {
            return Err(TrailError::Config(format!(
                "year-month '{raw}' must be exactly 6 characters (YYYYMM)"
            )));
        }
        // -- ✂️ char boundary, not byte offset. nobody should send emoji dates. somebody will.
        let split_at = raw
            .char_indices()
            .nth(4)
            .map(|(i, _)| i)
            .unwrap_or(raw.len());
        let (year, month) = raw.split_at(split_at);
        Ok(Self {
            year: year.to_string(),
            month: month.to_string(),
        })
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = TrailError;

    fn try_from(raw: String) -> TrailResult<Self> {
        Self::parse(&raw)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// 🧭 The key prefix under which one region's month of logs lives.
pub fn key_prefix(prefix: &str, region: &str, year_month: &YearMonth) -> String {
    format!(
        "{prefix}{region}/{}/{}/",
        year_month.year(),
        year_month.month()
    )
}

// ============================================================
//  🚶 ListingWalker
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkState {
    Start,
    Continue(String),
    Done,
}

/// 🚶 Walks one key prefix to exhaustion, one page per call.
#[derive(Debug, Clone)]
pub struct ListingWalker {
    bucket: String,
    key_prefix: String,
    page_size: usize,
    state: WalkState,
}

impl ListingWalker {
    pub fn new(bucket: impl Into<String>, key_prefix: impl Into<String>, page_size: usize) -> Self {
        Self {
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
            page_size,
            state: WalkState::Start,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == WalkState::Done
    }

    /// 📄 Fetch the next page, or `None` once the listing is exhausted.
    ///
    /// The first call sends no cursor. Each later call sends the cursor from the page before.
    /// After a failed request the walker is done too: a listing error ends the walk for good.
    pub async fn next_page<S>(&mut self, store: &S) -> TrailResult<Option<ListingPage>>
    where
        S: LogStore + ?Sized,
    {
        let cursor = match &self.state {
            WalkState::Done => return Ok(None),
            WalkState::Start => None,
            WalkState::Continue(cursor) => Some(cursor.as_str()),
        };

        let reply = store
            .list_page(&self.bucket, &self.key_prefix, cursor, self.page_size)
            .await;

        let page = match reply {
            Ok(page) => page,
            Err(e) => {
                self.state = WalkState::Done;
                return Err(e);
            }
        };

        debug!(
            "📄 listed {} keys under '{}' (more: {})",
            page.keys.len(),
            self.key_prefix,
            page.is_truncated()
        );

        self.state = match page.next_cursor() {
            Some(cursor) => WalkState::Continue(cursor.to_string()),
            None => WalkState::Done,
        };
        Ok(Some(page))
    }

    /// 🌊 The whole walk as a lazy stream of keys, in listing order.
    pub fn into_key_stream<'a, S>(
        self,
        store: &'a S,
    ) -> impl Stream<Item = TrailResult<String>> + Send + 'a
    where
        S: LogStore + ?Sized,
    {
        stream::try_unfold(self, move |mut walker| async move {
            let page = walker.next_page(store).await?;
            Ok(page.map(|page| {
                let keys = stream::iter(page.keys.into_iter().map(Ok::<String, TrailError>));
                (keys, walker)
            }))
        })
        .try_flatten()
    }
}
