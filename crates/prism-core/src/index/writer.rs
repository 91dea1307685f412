//! Index serialization in CSV, JSON or JSON Lines.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, BufRead, Read, Write};

/// On-disk format of the metadata index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl IndexFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Writes rows of one serializable type in the chosen format.
pub struct IndexWriter<W: Write> {
    writer: W,
    format: IndexFormat,
    rows_written: usize,
}

impl<W: Write> IndexWriter<W> {
    pub fn new(writer: W, format: IndexFormat) -> Self {
        Self {
            writer,
            format,
            rows_written: 0,
        }
    }

    /// Write every row. CSV gets a header derived from the row's field names.
    pub fn write_all<T: Serialize>(&mut self, rows: &[T]) -> io::Result<()> {
        match self.format {
            IndexFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut self.writer);
                for row in rows {
                    csv.serialize(row).map_err(io::Error::other)?;
                }
                csv.flush()?;
            }
            IndexFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, rows).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
            IndexFormat::JsonLines => {
                for row in rows {
                    serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                }
            }
        }
        self.rows_written += rows.len();
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Read back rows written by [`IndexWriter`].
pub fn read_rows<T, R>(reader: R, format: IndexFormat) -> io::Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    match format {
        IndexFormat::Csv => csv::Reader::from_reader(reader)
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(io::Error::other),
        IndexFormat::Json => serde_json::from_reader(reader).map_err(io::Error::other),
        IndexFormat::JsonLines => {
            let mut rows = Vec::new();
            for line in io::BufReader::new(reader).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                rows.push(serde_json::from_str(&line).map_err(io::Error::other)?);
            }
            Ok(rows)
        }
    }
}
