// ai
//! 💀 Errors: the taxonomy of everything that can go sideways between a bucket and a CSV.
//!
//! 🧠 Knowledge graph:
//! - `TrailError` is what the stores, the walker and the extractor return. Typed, because the
//!   extractor has to tell a `Fetch`/`Parse` failure (policy decides) from a `List` failure (always fatal).
//! - Orchestration (`supervisors`, `lib::run`) and the CLI speak `anyhow` and stack `.context(..)`
//!   on top. `TrailError` converts into `anyhow::Error` for free via `std::error::Error`.
//!
//! 🦆 The duck is not an error. The duck is a feature.

use thiserror::Error;

/// 🏷️ Shorthand for results that carry a [`TrailError`].
pub type TrailResult<T> = Result<T, TrailError>;

/// 💀 Every way a run can fail, by family.
#[derive(Debug, Error)]
pub enum TrailError {
    /// 🗺️ The region catalog has no partition by that name (or could not be read at all).
    #[error("region catalog has no partition '{partition}': {detail}")]
    Catalog { partition: String, detail: String },

    /// 🔑 Client/credential setup failed before we ever listed a thing.
    #[error("failed to set up object store session: {0}")]
    Session(String),

    /// 📜 A listing request under a key prefix failed.
    #[error("failed to list objects under '{key_prefix}': {detail}")]
    List { key_prefix: String, detail: String },

    /// 📥 An object could not be fetched.
    #[error("failed to fetch object '{key}': {detail}")]
    Fetch { key: String, detail: String },

    /// 🧩 An object was fetched but is not a document with a `Records` array.
    #[error("failed to parse object '{key}': {detail}")]
    Parse { key: String, detail: String },

    /// 💾 Output file trouble: remove, create, write or flush.
    #[error("output file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 🔧 Configuration that parsed but makes no sense.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 🛑 Somebody pressed the big red button.
    #[error("run cancelled before completion")]
    Cancelled,

    /// 🚪 The sink worker hung up on us, usually because it already failed.
    #[error("sink worker stopped receiving batches")]
    SinkClosed,
}

impl TrailError {
    /// 🎯 True for the per-object failures that `on_object_error = "skip"` is allowed to absorb.
    pub fn is_object_level(&self) -> bool {
        matches!(self, TrailError::Fetch { .. } | TrailError::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_only_fetch_and_parse_are_skippable() {
        let fetch = TrailError::Fetch {
            key: "k".into(),
            detail: "gone".into(),
        };
        let parse = TrailError::Parse {
            key: "k".into(),
            detail: "not json".into(),
        };
        let list = TrailError::List {
            key_prefix: "ct/us-east-1/2020/03/".into(),
            detail: "AccessDenied".into(),
        };

        assert!(fetch.is_object_level());
        assert!(parse.is_object_level());
        assert!(!list.is_object_level());
        assert!(!TrailError::Cancelled.is_object_level());
    }

    #[test]
    fn the_one_where_the_message_names_the_prefix() {
        let the_error = TrailError::List {
            key_prefix: "ct/eu-west-1/2020/03/".into(),
            detail: "timeout".into(),
        };
        assert_eq!(
            the_error.to_string(),
            "failed to list objects under 'ct/eu-west-1/2020/03/': timeout"
        );
    }
}
