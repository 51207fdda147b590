use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::metrics::{ExperimentSummary, RoundOutcome};

/// Flat experiment artifact handed to external reporting tools: the whole
/// round log plus the derived summary, field names preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment_name: String,
    pub summary: ExperimentSummary,
    pub rounds: Vec<RoundOutcome>,
}

impl ExperimentReport {
    pub fn write_json<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush()
    }
}
