// ai
//! 🪣🚀🌐 S3 Backend: the cloud-to-ground audit-log paratrooper.
//!
//! INT. AWS CONSOLE, NIGHT. A lone bucket sits in ap-northeast-1, bloated with
//! a trail of every API call anyone ever made. Gzipped. Partitioned by region,
//! year, month. Someone turned the trail on years ago and walked away.
//! The logs have been waiting. Patient. Ready to be listed one hundred keys at a time.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `S3SourceConfig` lives in `s3_store.rs`
//! - Trait impl: `impl LogStore for S3Store`
//! - Enum variant: `StoreBackend::S3(S3Store)`
//! - Transport: `ListObjectsV2` (continuation tokens) and `GetObject` → `ByteStream::collect()`
//! - Credentials: static keys when both are given, the ambient AWS chain otherwise
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

mod s3_store;

pub use s3_store::{S3SourceConfig, S3Store};
