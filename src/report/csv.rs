use std::fs::File;
use std::path::Path;

use crate::pipeline::Outcome;
use crate::report::{OutcomeSink, ReportError};

pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Create the file and write the header row.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(["file_stem", "status", "reason"])?;
        Ok(Self { writer })
    }
}

impl OutcomeSink for CsvSink {
    fn record(&mut self, outcome: &Outcome) -> Result<(), ReportError> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}
