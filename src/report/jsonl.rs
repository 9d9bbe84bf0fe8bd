use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pipeline::Outcome;
use crate::report::{OutcomeSink, ReportError};

pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl OutcomeSink for JsonlSink {
    fn record(&mut self, outcome: &Outcome) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, outcome)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SkipReason;

    #[test]
    fn one_object_per_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.jsonl");
        let mut sink = JsonlSink::create(&path).expect("sink");
        sink.record(&Outcome::ok("1_a")).expect("record");
        sink.record(&Outcome::skip("2_a", &SkipReason::UploadFailed))
            .expect("record");
        sink.flush().expect("flush");

        let content = std::fs::read_to_string(&path).expect("read");
        let rows: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["file_stem"], "1_a");
        assert_eq!(rows[0]["status"], "OK");
        assert_eq!(rows[0]["reason"], "");
        assert_eq!(rows[1]["reason"], "upload_failed");
    }
}
