// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores networks using Burn's NamedMpkGzFileRecorder
// at full precision, so a reloaded network inverts exactly like
// the one that was saved.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. irevnet_config.json          — the architecture config
//
// The config is needed to rebuild a network with exactly the
// same topology before the weights can be loaded into it; the
// recorder refuses records that don't match.
//
// File layout:
//   checkpoints/
//     model.mpk.gz
//     irevnet_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::ml::network::{IRevNet, IRevNetConfig};

const MODEL_FILE:  &str = "model";
const CONFIG_FILE: &str = "irevnet_config.json";

type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Opens an existing checkpoint for reading; never touches the
    /// filesystem beyond checking that the directory exists.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint dir '{}' does not exist. Have you run 'init' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    /// Writes the config first so a half-written checkpoint is
    /// never mistaken for a complete one by `load_model`.
    pub fn save<B: Backend>(&self, model: &IRevNet<B>, config: &IRevNetConfig) -> Result<()> {
        self.save_config(config)?;

        // The recorder appends the .mpk.gz extension itself
        let path = self.dir.join(MODEL_FILE);
        ModelRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::info!("Saved checkpoint to '{}'", self.dir.display());
        Ok(())
    }

    pub fn save_config(&self, config: &IRevNetConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved architecture config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<IRevNetConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Have you run 'init' first?",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Rebuilds the network from the saved config, then restores
    /// its weights.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<IRevNet<B>> {
        let config = self.load_config()?;
        let model: IRevNet<B> = config.init(device)?;

        let path = self.dir.join(MODEL_FILE);
        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        tracing::info!("Loaded checkpoint from '{}'", self.dir.display());
        Ok(model.load_record(record))
    }
}
