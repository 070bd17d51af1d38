use std::io::Write;

use thiserror::Error;

use crate::models::FeedRow;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("flush failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination of the finished feed: one header row, then one row per
/// surviving variation.
pub trait RecordSink {
    fn write_header(&mut self) -> Result<(), SinkError>;
    fn write_row(&mut self, row: &FeedRow) -> Result<(), SinkError>;
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Tab-delimited writer; quoting stays with the csv crate.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().delimiter(b'\t').from_writer(out),
        }
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_header(&mut self) -> Result<(), SinkError> {
        self.writer.write_record(FeedRow::COLUMNS)?;
        Ok(())
    }

    fn write_row(&mut self, row: &FeedRow) -> Result<(), SinkError> {
        self.writer.write_record(row.values())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows_are_tab_delimited() {
        let mut buffer = Vec::new();
        {
            let mut sink = CsvSink::new(&mut buffer);
            sink.write_header().expect("header");
            let row = FeedRow {
                sku: "ART-1".into(),
                name: "Lederkombi, Farbe: Rot".into(),
                price: "99.90".into(),
                ..FeedRow::default()
            };
            sink.write_row(&row).expect("row");
            sink.finish().expect("flush");
        }
        let output = String::from_utf8(buffer).expect("utf8");
        let mut lines = output.lines();
        let header = lines.next().expect("header line");
        assert!(header.starts_with("sku\tmaster_sku\tgtin"));
        assert_eq!(header.split('\t').count(), FeedRow::COLUMNS.len());
        let row = lines.next().expect("row line");
        assert!(row.starts_with("ART-1\t"));
        assert_eq!(row.split('\t').count(), FeedRow::COLUMNS.len());
    }
}
