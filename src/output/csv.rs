use super::RowSink;
use crate::config::OutputConfig;
use crate::error::Result;
use crate::review::ReviewRecord;
use async_trait::async_trait;
use csv::{Terminator, WriterBuilder};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Delimited-text sink. The header is written on open and every row is flushed.
pub struct CsvOutput<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvOutput<Box<dyn Write + Send>> {
    /// Opens the configured path, truncating it. `-` means stdout.
    pub fn open(config: &OutputConfig) -> Result<Self> {
        let delimiter = config.delimiter_byte()?;
        let target: Box<dyn Write + Send> = if config.path == "-" {
            Box::new(io::stdout())
        } else {
            Box::new(File::create(Path::new(&config.path))?)
        };
        Self::from_writer(target, delimiter)
    }
}

impl<W: Write> CsvOutput<W> {
    pub fn from_writer(target: W, delimiter: u8) -> Result<Self> {
        let terminator = if cfg!(windows) {
            Terminator::CRLF
        } else {
            Terminator::Any(b'\n')
        };
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .terminator(terminator)
            .from_writer(target);

        writer.write_record(ReviewRecord::HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

#[async_trait]
impl<W: Write + Send> RowSink for CsvOutput<W> {
    async fn write(&mut self, record: &ReviewRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
