// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// user-facing goal each:
//
//   summary — describe an architecture without running it
//   init    — build a network and write a checkpoint
//   check   — run the reconstruction probe and report
//
// Rules for this layer:
//   - No tensor math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::domain::presets;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::network::IRevNetConfig;

pub mod summary_use_case;
pub mod init_use_case;
pub mod check_use_case;

// ─── Architecture Source ──────────────────────────────────────────────────────
/// Where an architecture description comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchitectureSource {
    /// A named preset, e.g. "irevnet18"
    Preset(String),
    /// A JSON file holding an IRevNetConfig
    ConfigFile(PathBuf),
    /// A checkpoint directory written by `init`
    Checkpoint(PathBuf),
}

impl ArchitectureSource {
    pub fn resolve(&self) -> Result<IRevNetConfig> {
        match self {
            Self::Preset(name) => Ok(presets::lookup(name)?.into()),
            Self::ConfigFile(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read config '{}'", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("Malformed config in '{}'", path.display()))
            }
            Self::Checkpoint(dir) => CheckpointManager::open(dir)?.load_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_source_resolves() {
        let cfg = ArchitectureSource::Preset("irevnet2".into()).resolve().unwrap();
        assert_eq!(cfg.blocks, vec![2, 2, 2]);
        assert_eq!(cfg.init_ds, 0);
    }

    #[test]
    fn test_config_file_source_resolves() {
        let path = std::env::temp_dir().join(format!("irevnet-source-{}.json", std::process::id()));
        let cfg = IRevNetConfig::new(vec![1], vec![1], 2, [4, 4, 4]).with_init_ds(0);
        std::fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();

        let loaded = ArchitectureSource::ConfigFile(path.clone()).resolve().unwrap();
        assert_eq!(loaded.in_shape, [4, 4, 4]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        assert!(ArchitectureSource::Preset("nope".into()).resolve().is_err());
    }

    #[test]
    fn test_missing_checkpoint_source_leaves_no_directory() {
        let dir = std::env::temp_dir().join(format!("irevnet-no-such-ckpt-{}", std::process::id()));
        assert!(ArchitectureSource::Checkpoint(dir.clone()).resolve().is_err());
        assert!(!dir.exists());
    }
}
