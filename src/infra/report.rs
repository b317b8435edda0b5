// ============================================================
// Layer 6 — Reconstruction Report Logger
// ============================================================
// Records per-block reconstruction errors of a probe run to a
// CSV file, and the full report as JSON next to it.
//
// Output files:
//   reports/reconstruction.csv   — one row per block, appended
//   reports/probe_seed_<S>.json  — the whole ProbeReport
//
// Example CSV output:
//   seed,block,in_channels,out_channels,stride,injective,max_abs_error
//   42,0,3,16,1,true,0.000000e0
//   42,1,32,16,1,false,4.768372e-7
//   ...
//
// How to read it:
//   - Errors near f32 epsilon mean the block inverts cleanly
//   - A jump at one block usually means F disagreed with itself
//     between forward and inverse (training-mode dropout or
//     batch statistics)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::ml::probe::ProbeReport;

const CSV_HEADER: &str = "seed,block,in_channels,out_channels,stride,injective,max_abs_error";

pub struct ReportLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl ReportLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create report dir '{}'", dir.display()))?;

        let csv_path = dir.join("reconstruction.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created report CSV: '{}'", csv_path.display());
        }

        Ok(Self { dir, csv_path })
    }

    /// Appends one row per block and writes the JSON summary.
    pub fn log(&self, report: &ProbeReport) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        for block in &report.blocks {
            writeln!(
                f,
                "{},{},{},{},{},{},{:e}",
                report.seed,
                block.spec.index,
                block.spec.in_channels,
                block.spec.out_channels,
                block.spec.stride,
                block.spec.is_injective(),
                block.max_abs_error,
            )?;
        }

        let json_path = self.dir.join(format!("probe_seed_{}.json", report.seed));
        fs::write(&json_path, serde_json::to_string_pretty(report)?)
            .with_context(|| format!("Cannot write '{}'", json_path.display()))?;

        tracing::debug!(
            "Logged {} block rows for seed {} to '{}'",
            report.blocks.len(),
            report.seed,
            self.csv_path.display(),
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
