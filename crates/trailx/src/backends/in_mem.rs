// ai
//! 🧠 In-memory backends: a bucket with no bill and a file with no disk.
//!
//! `InMemoryStore` pretends to be an object store: lexicographic listing, opaque continuation
//! cursors, page caps, and injectable failures. It also keeps a call log, so a test can ask
//! "how many pages did you hand out?" and get an honest answer.
//!
//! `InMemorySink` hoards whatever the sink worker gives it behind an `Arc<Mutex<..>>`,
//! so the test that handed it off can still peek inside afterwards.
//!
//! 🦆 The duck lives in RAM too. It is very fast and entirely volatile.

mod in_mem_sink;
mod in_mem_store;

pub use in_mem_sink::InMemorySink;
pub use in_mem_store::{InMemoryStore, ListCall};
