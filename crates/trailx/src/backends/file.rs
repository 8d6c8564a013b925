// ai
//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! The disk was quiet. Too quiet. A stale `result.csv` from last Tuesday sat in the
//! working directory, smug, half-written, ending mid-line because someone hit Ctrl-C.
//! It had to go. A fresh file had to take its place. A header had to be written.
//!
//! This module handles the file end of the pipeline: one CSV file, recreated at the
//! start of every run, one line per audit record, flushed after every line so a crash
//! loses at most the line it was in the middle of.
//!
//! 🚰 SinkWorker → FileSink → csv encoder → BufWriter → disk
//! 💀 Disk full → your problem now
//! 🦆 (mandatory, no notes)

mod file_sink;

pub use file_sink::{FileSink, FileSinkConfig};
