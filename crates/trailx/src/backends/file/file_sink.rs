use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};
use tracing::{debug, trace};

use crate::backends::Sink;
use crate::common::{HEADER, TupleBatch};
use crate::error::TrailError;

// -- 🚰 FileSinkConfig: lives here, cozy next to its FileSink bestie. No long-distance config relationships.
// KNOWLEDGE GRAPH: one backend = one config = one file. Clean.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileSinkConfig {
    /// 📄 Where the extract lands. Recreated every run.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// ✂️ Field delimiter. Single ASCII character, and not a quote or a newline, thank you.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            delimiter: default_delimiter(),
        }
    }
}

impl FileSinkConfig {
    /// 🔍 Catch a bad path or delimiter before anything gets deleted.
    pub fn validate(&self) -> Result<(), TrailError> {
        if self.file_name.trim().is_empty() {
            return Err(TrailError::Config("sink.file_name is empty".to_string()));
        }
        RowEncoder::new(self.delimiter).map(|_| ())
    }
}

fn default_file_name() -> String {
    "./result.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

/// 📑 Turns one row of fields into one properly escaped, `\n`-terminated line.
///
/// Fields holding the delimiter, a quote or a line break get quoted and their quotes doubled.
/// Everything else goes out bare. The `csv` crate does the hard part. We just hold the delimiter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowEncoder {
    delimiter: u8,
}

impl RowEncoder {
    pub(crate) fn new(delimiter: char) -> Result<Self, TrailError> {
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(TrailError::Config(format!(
                "sink delimiter must be a single ASCII character other than a quote or line break, got {delimiter:?}"
            )));
        }
        Ok(Self {
            delimiter: delimiter as u8,
        })
    }

    pub(crate) fn encode<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::with_capacity(256));
        writer
            .write_record(fields)
            .context("💀 csv encoder refused a perfectly innocent row")?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("💀 csv encoder would not let go of its buffer")
    }
}

/// 🚰 FileSink: writes the header once, then one CSV line per tuple, flushing after each.
///
/// It's a BufWriter around a tokio `File`. Simple. Honest. Does not retry.
///
/// ⚠️ `new` deletes whatever was at the path. No warning. No backup. Just gone.
/// He who points `--path` at his thesis, rewrites his thesis.
#[derive(Debug)]
pub struct FileSink {
    file_buf: io::BufWriter<File>,
    encoder: RowEncoder,
    sink_config: FileSinkConfig,
    rows_written: u64,
}

impl FileSink {
    /// 🚀 Removes any previous file at the path, creates a fresh one, and returns a sink
    /// ready for its header.
    pub async fn new(sink_config: FileSinkConfig) -> Result<Self> {
        let encoder = RowEncoder::new(sink_config.delimiter)?;
        let path = sink_config.file_name.clone();

        // -- 🧹 stale output from a previous run goes first. a missing file is the happy case.
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("🧹 removed previous output at '{}'", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(TrailError::Io { path, source }.into()),
        }

        let file_handle = File::create(&path)
            .await
            .map_err(|source| TrailError::Io {
                path: path.clone(),
                source,
            })
            .context(
                "💀 The output file could not be conjured into existence. \
                 We stared at the path. The path stared back. \
                 One of us was wrong about whether the parent directory existed.",
            )?;

        Ok(Self {
            file_buf: io::BufWriter::new(file_handle),
            encoder,
            sink_config,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// ✍️ One line in, one flush out. The flush is the point.
    async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let path = &self.sink_config.file_name;
        self.file_buf
            .write_all(line)
            .await
            .map_err(|source| TrailError::Io {
                path: path.clone(),
                source,
            })?;
        self.file_buf.flush().await.map_err(|source| TrailError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write_header(&mut self) -> Result<()> {
        let the_header = self.encoder.encode(HEADER)?;
        self.write_line(&the_header)
            .await
            .context("💀 Could not even write the header. The file was born and immediately gave up.")
    }

    async fn receive(&mut self, batch: TupleBatch) -> Result<()> {
        trace!(
            "📬 {} rows from '{}' walked into the file sink",
            batch.len(),
            batch.object_key
        );
        for tuple in &batch.tuples {
            let the_line = self.encoder.encode(tuple.fields())?;
            self.write_line(&the_line).await.with_context(|| {
                format!(
                    "💀 Failed writing a row from '{}' to '{}'",
                    batch.object_key, self.sink_config.file_name
                )
            })?;
            self.rows_written += 1;
        }
        Ok(())
    }

    /// 🗑️ Final flush. Explicit, because async Drop is not a thing in Rust yet.
    async fn close(&mut self) -> Result<()> {
        trace!(
            "🎬 final flush. {} rows made it into '{}'",
            self.rows_written,
            self.sink_config.file_name
        );
        self.file_buf.shutdown().await.context(
            "💀 Error closing the output file: the bytes could SEE the disk. So close.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::OutputTuple;

    fn a_config_in(dir: &tempfile::TempDir) -> FileSinkConfig {
        FileSinkConfig {
            file_name: dir.path().join("result.csv").display().to_string(),
            delimiter: ',',
        }
    }

    fn a_full_tuple() -> OutputTuple {
        OutputTuple {
            event_time: "2020-03-01T00:00:00Z".into(),
            operation_user: "AIDAEXAMPLE".into(),
            event_source: "s3.amazonaws.com".into(),
            event_name: "GetObject".into(),
            aws_region: "us-east-1".into(),
            source_ip_address: "203.0.113.7".into(),
            user_agent: "aws-cli/2.0".into(),
        }
    }

    #[tokio::test]
    async fn the_one_where_initializing_twice_leaves_no_residue() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_config = a_config_in(&the_dir);
        std::fs::write(&the_config.file_name, "stale,garbage\nfrom,last,tuesday\n")?;

        let mut the_first = FileSink::new(the_config.clone()).await?;
        the_first.write_header().await?;
        the_first
            .receive(TupleBatch::new("k1", vec![a_full_tuple()]))
            .await?;
        the_first.close().await?;

        let mut the_second = FileSink::new(the_config.clone()).await?;
        the_second.write_header().await?;
        the_second.close().await?;

        let the_contents = std::fs::read_to_string(&the_config.file_name)?;
        assert_eq!(
            the_contents,
            "EventTime,OperationUser,eventSource,eventName,awsRegion,sourceIPAddress,userAgent\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_every_row_hits_the_disk_before_close() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_config = a_config_in(&the_dir);

        let mut the_sink = FileSink::new(the_config.clone()).await?;
        the_sink.write_header().await?;
        the_sink
            .receive(TupleBatch::new("k1", vec![a_full_tuple()]))
            .await?;

        // -- 👀 no close() yet. the flush-per-line promise is on trial.
        let the_contents = std::fs::read_to_string(&the_config.file_name)?;
        let the_lines: Vec<&str> = the_contents.lines().collect();
        assert_eq!(the_lines.len(), 2);
        assert_eq!(
            the_lines[1],
            "2020-03-01T00:00:00Z,AIDAEXAMPLE,s3.amazonaws.com,GetObject,us-east-1,203.0.113.7,aws-cli/2.0"
        );
        assert_eq!(the_sink.rows_written(), 1);
        the_sink.close().await
    }

    #[tokio::test]
    async fn the_one_where_commas_and_quotes_get_escaped_properly() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_config = a_config_in(&the_dir);

        let mut the_troublemaker = a_full_tuple();
        the_troublemaker.user_agent = "Mozilla/5.0 (X11, Linux) \"quoted\"".into();
        the_troublemaker.event_name = "multi\nline".into();

        let mut the_sink = FileSink::new(the_config.clone()).await?;
        the_sink.write_header().await?;
        the_sink
            .receive(TupleBatch::new("k1", vec![the_troublemaker]))
            .await?;
        the_sink.close().await?;

        let the_contents = std::fs::read_to_string(&the_config.file_name)?;
        assert!(the_contents.contains("\"multi\nline\""));
        assert!(the_contents.ends_with("\"Mozilla/5.0 (X11, Linux) \"\"quoted\"\"\"\n"));

        // -- 🔁 and a real csv reader agrees it is still 7 columns
        let mut the_reader = csv::Reader::from_path(&the_config.file_name)?;
        let the_rows: Vec<csv::StringRecord> = the_reader.records().collect::<Result<_, _>>()?;
        assert_eq!(the_rows.len(), 1);
        assert_eq!(the_rows[0].len(), 7);
        assert_eq!(&the_rows[0][6], "Mozilla/5.0 (X11, Linux) \"quoted\"");
        Ok(())
    }

    #[test]
    fn the_one_where_empty_fields_stay_empty() -> Result<()> {
        let the_encoder = RowEncoder::new(',')?;
        let the_line = the_encoder.encode(OutputTuple::default().fields())?;
        assert_eq!(the_line, b",,,,,,\n");
        Ok(())
    }

    #[test]
    fn the_one_where_tabs_are_a_legal_delimiter_but_quotes_are_not() {
        assert!(RowEncoder::new('\t').is_ok());
        assert!(RowEncoder::new('"').is_err());
        assert!(RowEncoder::new('¦').is_err());
    }

    #[tokio::test]
    async fn the_one_where_a_missing_parent_directory_is_an_io_error() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir");
        let the_config = FileSinkConfig {
            file_name: the_dir
                .path()
                .join("no/such/dir/result.csv")
                .display()
                .to_string(),
            delimiter: ',',
        };
        let the_verdict = FileSink::new(the_config).await;
        let the_error = the_verdict.expect_err("💀 creating under a missing dir must fail");
        assert!(
            the_error
                .chain()
                .any(|cause| cause.downcast_ref::<TrailError>().is_some()),
            "the IO failure should keep its TrailError::Io identity"
        );
    }
}
