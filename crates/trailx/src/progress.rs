// AI
//! 📊 progress.rs: "Are we there yet?" asks every pipeline, every time, forever.
//!
//! 🚀 This module answers the age-old question: "how many logs have we chewed through?"
//! With cold hard numbers, a spinner, and a table so comfy it has lumbar support.
//!
//! We don't know the total up front. Listings are lazy; the store tells us how many objects
//! there are only by running out of them. So: a spinner, not a bar. Honesty over aesthetics.
//!
//! ⚠️  Warning: Watching this spinner will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::presets::{NOTHING, UTF8_FULL};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

use crate::common::RunSummary;

/// 🔢 Formats a number with commas for the 3 people in the audience who like readability.
/// "1000000 records" → "1,000,000 records": you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    // -- 🧵 pre-allocate like we know what we're doing (we do, we read the book)
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📡 A snapshot of throughput at any given moment. A speedometer for audit logs.
struct Rates {
    objects_per_sec: f64,
    records_per_sec: f64,
}

/// 📊 The brains behind the progress display. Tracks regions, objects, records, and your sanity.
///
/// Uses a sliding 5-second window for rate calculations so one fat object doesn't make the
/// records/s column look like a seismograph.
///
/// # Ancient Proverb
/// "He who extracts a year of audit logs without a progress display, extracts alone and in darkness."
pub(crate) struct ProgressMetrics {
    /// 🌍 region currently being walked
    current_region: String,
    /// 🔢 how many regions have been started, out of how many
    regions_started: usize,
    regions_total: usize,
    total_objects: u64,
    total_records: u64,
    total_skipped: u64,
    /// 🎨 the spinner (or a hidden stand-in when nobody is watching)
    progress_bar: ProgressBar,
    /// 🔄 sliding window of (timestamp, objects, records)
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("current_region", &self.current_region)
            .field("regions_started", &self.regions_started)
            .field("regions_total", &self.regions_total)
            .field("total_objects", &self.total_objects)
            .field("total_records", &self.total_records)
            .field("total_skipped", &self.total_skipped)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 A visible spinner drawn on stderr.
    pub(crate) fn new(regions_total: usize) -> Self {
        let progress_bar = ProgressBar::new_spinner();
        // -- 🐛 the template is a literal; if it ever fails to parse we fall back to the default style
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            progress_bar.set_style(style);
        }
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(progress_bar, regions_total)
    }

    /// 🙈 Same bookkeeping, nothing drawn. For tests, pipes, and people who hate joy.
    pub(crate) fn hidden(regions_total: usize) -> Self {
        Self::with_bar(ProgressBar::hidden(), regions_total)
    }

    fn with_bar(progress_bar: ProgressBar, regions_total: usize) -> Self {
        let start_time = Instant::now();
        // -- 🔄 seed the rate window with t=0 so we don't divide by zero like animals
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64, 0u64));

        Self {
            current_region: String::new(),
            regions_started: 0,
            regions_total,
            total_objects: 0,
            total_records: 0,
            total_skipped: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🌍 A new region is being walked.
    pub(crate) fn region_started(&mut self, region: &str) {
        self.current_region = region.to_string();
        self.regions_started += 1;
        let rates = self.calculate_rates();
        self.render(rates);
    }

    /// 📦 One object went through the extractor.
    pub(crate) fn object_done(&mut self, records: u64, skipped: bool) {
        self.total_objects += 1;
        self.total_records += records;
        if skipped {
            self.total_skipped += 1;
        }
        let rates = self.calculate_rates();
        self.render(rates);
    }

    /// ✅ Stop spinning. Leave the last frame on screen.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    /// 📈 Current throughput over a 5-second sliding window.
    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }

        self.rate_samples
            .push_back((now, self.total_objects, self.total_records));

        if let Some(&(oldest_time, oldest_objects, oldest_records)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                return Rates {
                    objects_per_sec: self.total_objects.saturating_sub(oldest_objects) as f64
                        / elapsed,
                    records_per_sec: self.total_records.saturating_sub(oldest_records) as f64
                        / elapsed,
                };
            }
        }

        // -- 💤 not enough elapsed time yet: return zeros and maintain composure
        Rates {
            objects_per_sec: 0.0,
            records_per_sec: 0.0,
        }
    }

    /// 🎨 Render the display as a comfy-table message under the spinner.
    ///
    /// ```text
    /// ⠋ region: eu-west-1 (2/33)
    ///     12 Objects/s        1,204 Objects
    ///    940 Records/s       93,112 Records
    ///      0 Skipped     00:42 elapsed
    /// ```
    fn render(&self, rates: Rates) {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new(format!("{} Objects/s", format_number(rates.objects_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Objects", format_number(self.total_objects)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} Records/s", format_number(rates.records_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Records", format_number(self.total_records)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} Skipped", format_number(self.total_skipped)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} elapsed", format_duration(self.start_time.elapsed())))
                .set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar.set_message(format!(
            "region: {} ({}/{})\n{}",
            self.current_region, self.regions_started, self.regions_total, table
        ));
    }
}

/// 🧾 The end-of-run receipt: one row per region, then a totals row.
pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Region", "Objects", "Records", "Skipped"]);

    let right = |n: u64| Cell::new(format_number(n)).set_alignment(CellAlignment::Right);
    for region in &summary.regions {
        table.add_row(vec![
            Cell::new(&region.region),
            right(region.objects),
            right(region.records),
            right(region.skipped_objects),
        ]);
    }
    table.add_row(vec![
        Cell::new("total"),
        right(summary.total_objects()),
        right(summary.total_records()),
        right(summary.total_skipped()),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RegionSummary;

    #[test]
    fn the_one_where_big_numbers_grow_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn the_one_where_hours_only_show_up_when_earned() {
        assert_eq!(format_duration(Duration::from_secs(42)), "00:42");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn the_one_where_the_hidden_display_still_counts() {
        let mut the_metrics = ProgressMetrics::hidden(2);
        the_metrics.region_started("us-east-1");
        the_metrics.object_done(10, false);
        the_metrics.object_done(0, true);
        the_metrics.region_started("eu-west-1");
        the_metrics.finish();

        assert_eq!(the_metrics.regions_started, 2);
        assert_eq!(the_metrics.total_objects, 2);
        assert_eq!(the_metrics.total_records, 10);
        assert_eq!(the_metrics.total_skipped, 1);
    }

    #[test]
    fn the_one_where_the_receipt_lists_every_region_and_a_total() {
        let the_receipt = RunSummary {
            regions: vec![
                RegionSummary {
                    region: "us-east-1".into(),
                    objects: 1200,
                    records: 15000,
                    skipped_objects: 0,
                },
                RegionSummary {
                    region: "eu-west-1".into(),
                    objects: 3,
                    records: 4,
                    skipped_objects: 1,
                },
            ],
        };
        let the_rendering = summary_table(&the_receipt).to_string();
        assert!(the_rendering.contains("us-east-1"));
        assert!(the_rendering.contains("eu-west-1"));
        assert!(the_rendering.contains("15,000"));
        assert!(the_rendering.contains("total"));
        assert!(the_rendering.contains("1,203"));
    }
}
