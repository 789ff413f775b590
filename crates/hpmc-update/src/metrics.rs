use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Accepted and rejected shape-move counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStatistics {
    /// Accepted moves, including moves skipped by the move-probability gate.
    pub accepted: u64,
    /// Rejected moves.
    pub rejected: u64,
}

impl MoveStatistics {
    /// Records one move outcome.
    pub fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    /// Counters as `[accepted, rejected]`.
    pub fn as_array(&self) -> [u64; 2] {
        [self.accepted, self.rejected]
    }

    /// Total number of recorded outcomes.
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Fraction of accepted outcomes, or `None` before the first outcome.
    pub fn acceptance_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.accepted as f64 / total as f64)
    }

    /// Zeroes both counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot taken after one scheduled updater invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMoveSample {
    /// Timestep of the invocation.
    pub timestep: u64,
    /// Cumulative accepted moves.
    pub accepted: u64,
    /// Cumulative rejected moves.
    pub rejected: u64,
    /// Total particle volume after the invocation.
    pub total_volume: f64,
}

/// Ordered record of updater invocations, exportable as CSV.
#[derive(Debug, Clone, Default)]
pub struct ShapeMoveLog {
    samples: Vec<ShapeMoveSample>,
}

impl ShapeMoveLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample.
    pub fn push_sample(&mut self, sample: ShapeMoveSample) {
        self.samples.push(sample);
    }

    /// Returns the recorded samples.
    pub fn samples(&self) -> &[ShapeMoveSample] {
        &self.samples
    }

    /// Drops every recorded sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Writes the samples as CSV to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "timestep,accepted,rejected,total_volume")?;
        for sample in &self.samples {
            writeln!(
                writer,
                "{},{},{},{:.9}",
                sample.timestep, sample.accepted, sample.rejected, sample.total_volume
            )?;
        }
        Ok(())
    }

    /// Writes the samples to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}
