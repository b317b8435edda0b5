// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Builds a freshly initialised network and writes it out as a
// checkpoint, so later `check` runs (or an external training
// driver) start from the same weights:
//
//   Step 1: Resolve the config        (preset / file)
//   Step 2: Build the network         (Layer 5 - ml)
//   Step 3: Save config + weights     (Layer 6 - infra)

use anyhow::Result;
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::ArchitectureSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::network::IRevNet;

#[derive(Debug, Clone)]
pub struct InitConfig {
    pub source:         ArchitectureSource,
    pub checkpoint_dir: PathBuf,
}

pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<usize> {
        let cfg = &self.config;
        if matches!(cfg.source, ArchitectureSource::Checkpoint(_)) {
            anyhow::bail!("init needs a preset or a config file, not an existing checkpoint");
        }

        let net_config = cfg.source.resolve()?;
        let net: IRevNet<B> = net_config.init(device)?;
        tracing::info!("Initialised {} blocks", net.blocks.len());

        let manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        manager.save(&net, &net_config)?;
        Ok(net.num_params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_init_writes_loadable_checkpoint() {
        let dir = std::env::temp_dir().join(format!("irevnet-init-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let use_case = InitUseCase::new(InitConfig {
            source:         ArchitectureSource::Preset("irevnet1".into()),
            checkpoint_dir: dir.clone(),
        });
        let params = use_case.execute::<NdArray>(&Default::default()).unwrap();
        assert!(params > 0);

        let loaded: IRevNet<NdArray> = CheckpointManager::open(&dir)
            .unwrap()
            .load_model(&Default::default())
            .unwrap();
        assert_eq!(loaded.blocks.len(), 3);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_init_refuses_checkpoint_source() {
        let use_case = InitUseCase::new(InitConfig {
            source:         ArchitectureSource::Checkpoint("somewhere".into()),
            checkpoint_dir: "elsewhere".into(),
        });
        assert!(use_case.execute::<NdArray>(&Default::default()).is_err());
    }
}
