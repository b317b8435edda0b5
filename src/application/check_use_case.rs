// ============================================================
// Layer 2 — CheckUseCase
// ============================================================
// Verifies that a network actually inverts:
//
//   Step 1: Resolve the network       (preset / file / checkpoint)
//   Step 2: Run the probe             (Layer 5 - ml)
//   Step 3: Log per-block errors      (Layer 6 - infra)
//
// A checkpoint source loads trained weights; the other sources
// check a freshly initialised network.

use anyhow::Result;
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::ArchitectureSource;
use crate::infra::{checkpoint::CheckpointManager, report::ReportLogger};
use crate::ml::network::IRevNet;
use crate::ml::probe::{run_probe, ProbeReport};

#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub source:     ArchitectureSource,
    pub batch_size: usize,
    pub seed:       u64,
    pub tolerance:  f32,
    /// Where to write the CSV/JSON report, if anywhere
    pub report_dir: Option<PathBuf>,
}

pub struct CheckUseCase {
    config: CheckConfig,
}

impl CheckUseCase {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    fn load<B: Backend>(&self, device: &B::Device) -> Result<IRevNet<B>> {
        match &self.config.source {
            ArchitectureSource::Checkpoint(dir) => CheckpointManager::open(dir)?.load_model(device),
            source => Ok(source.resolve()?.init(device)?),
        }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<ProbeReport> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }

        let net = self.load::<B>(device)?;
        let report = run_probe(&net, cfg.batch_size, cfg.seed, cfg.tolerance, device)?;

        if let Some(dir) = &cfg.report_dir {
            ReportLogger::new(dir)?.log(&report)?;
        }

        if !report.passed() {
            tracing::warn!(
                "Reconstruction error {:.3e} exceeds tolerance {:.1e}",
                report.end_to_end,
                report.tolerance
            );
        }
        Ok(report)
    }
}
