// ai
//! 📦 Common data structures: the building blocks of trailx
//!
//! ---
//!
//! 🎬 COLD OPEN. INT. S3 BUCKET, ap-northeast-1, 3:47 AM
//!
//! 🌩️  Somebody, somewhere, called `DeleteBucketPolicy`. The audit log noticed.
//! The audit log always notices. It wrote it down in a gzip file, tucked it under
//! `AWSLogs/.../2018/01/`, and went back to sleep.
//!
//! ✅ Months later, an `OutputTuple` arrives. Seven fields. No more, no less.
//! It knows when it happened, who did it, which service, which call, which region,
//! from where, and with what user agent. It does not know why. Nobody ever knows why.
//!
//! 🦆
//!
//! This module defines the humble structs that ferry projected audit records from
//! the extractor to the sink worker. They don't ask questions. They carry the data.

/// 📋 The header row, in the one true column order. Changing this order is a breaking change
/// for every spreadsheet that ever opened `result.csv`.
pub const HEADER: [&str; 7] = [
    "EventTime",
    "OperationUser",
    "eventSource",
    "eventName",
    "awsRegion",
    "sourceIPAddress",
    "userAgent",
];

/// 🎯 A single projected audit record: seven strings, zero guarantees beyond "they exist".
///
/// Every field is a plain `String` because absence is spelled `""` in the output. A record
/// that had nothing useful in it still becomes a row. An empty row. A row of commas.
/// Like a guest book signed by ghosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTuple {
    pub event_time: String,
    pub operation_user: String,
    pub event_source: String,
    pub event_name: String,
    pub aws_region: String,
    pub source_ip_address: String,
    pub user_agent: String,
}

impl OutputTuple {
    /// 🔢 The fields in [`HEADER`] order, borrowed. The sink encodes straight from this.
    pub fn fields(&self) -> [&str; 7] {
        [
            &self.event_time,
            &self.operation_user,
            &self.event_source,
            &self.event_name,
            &self.aws_region,
            &self.source_ip_address,
            &self.user_agent,
        ]
    }
}

/// 📦 Everything one object produced. One fetch, one parse, one batch.
///
/// Batches travel through the channel as a unit so the sink worker writes an object's
/// records contiguously. No interleaving. No partial lines. No drama.
#[derive(Debug, Clone, Default)]
pub struct TupleBatch {
    /// 🗝️ Where these came from. For logs, and for the 3am "which file was that?" question.
    pub object_key: String,
    pub tuples: Vec<OutputTuple>,
    /// 🙈 Set when the object failed and the skip policy swallowed it.
    pub skipped: bool,
}

impl TupleBatch {
    pub fn new(object_key: impl Into<String>, tuples: Vec<OutputTuple>) -> Self {
        Self {
            object_key: object_key.into(),
            tuples,
            skipped: false,
        }
    }

    /// 🙈 An empty batch standing in for an object we decided to look away from.
    pub fn skipped(object_key: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            tuples: Vec::new(),
            skipped: true,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// 📊 What one region contributed to the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSummary {
    pub region: String,
    pub objects: u64,
    pub records: u64,
    pub skipped_objects: u64,
}

/// 🏁 The receipt handed back by a successful run. Regions appear in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub regions: Vec<RegionSummary>,
}

impl RunSummary {
    pub fn total_objects(&self) -> u64 {
        self.regions.iter().map(|r| r.objects).sum()
    }

    pub fn total_records(&self) -> u64 {
        self.regions.iter().map(|r| r.records).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.regions.iter().map(|r| r.skipped_objects).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_fields_line_up_with_the_header() {
        let the_tuple = OutputTuple {
            event_time: "t".into(),
            operation_user: "u".into(),
            event_source: "s".into(),
            event_name: "n".into(),
            aws_region: "r".into(),
            source_ip_address: "ip".into(),
            user_agent: "ua".into(),
        };
        assert_eq!(the_tuple.fields(), ["t", "u", "s", "n", "r", "ip", "ua"]);
        assert_eq!(HEADER.len(), the_tuple.fields().len());
    }

    #[test]
    fn the_one_where_the_summary_adds_up() {
        let the_receipt = RunSummary {
            regions: vec![
                RegionSummary {
                    region: "us-east-1".into(),
                    objects: 3,
                    records: 10,
                    skipped_objects: 1,
                },
                RegionSummary {
                    region: "eu-west-1".into(),
                    objects: 2,
                    records: 5,
                    skipped_objects: 0,
                },
            ],
        };
        assert_eq!(the_receipt.total_objects(), 5);
        assert_eq!(the_receipt.total_records(), 15);
        assert_eq!(the_receipt.total_skipped(), 1);
    }
}
