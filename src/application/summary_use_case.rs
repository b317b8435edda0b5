// ============================================================
// Layer 2 — SummaryUseCase
// ============================================================
// Resolves an architecture and describes it:
//
//   Step 1: Resolve the config           (preset / file / checkpoint)
//   Step 2: Expand + validate schedule   (Layer 3 - domain)
//   Step 3: Build the network            (Layer 5 - ml)
//   Step 4: Count learnable parameters
//
// The network is built on the CPU backend only to count its
// parameters; nothing is evaluated.

use anyhow::Result;
use burn::{backend::NdArray, module::Module};

use crate::application::ArchitectureSource;
use crate::domain::schedule::BlockSpec;
use crate::ml::network::{IRevNet, IRevNetConfig};

#[derive(Debug, Clone)]
pub struct Summary {
    pub config:         IRevNetConfig,
    pub blocks:         Vec<BlockSpec>,
    pub bijective_dims: [usize; 3],
    pub num_params:     usize,
}

impl Summary {
    /// Conventional i-RevNet depth: three convolutions per block
    /// plus the final linear layer.
    pub fn depth(&self) -> usize {
        self.blocks.len() * 3 + 1
    }

    pub fn injective_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_injective()).count()
    }
}

pub struct SummaryUseCase {
    source: ArchitectureSource,
}

impl SummaryUseCase {
    pub fn new(source: ArchitectureSource) -> Self {
        Self { source }
    }

    pub fn execute(&self) -> Result<Summary> {
        let config = self.source.resolve()?;
        let blocks = config.schedule()?;
        let geometry = config.geometry()?;

        let device = Default::default();
        let net: IRevNet<NdArray> = config.init(&device)?;
        let num_params = net.num_params();

        let [h, w] = geometry.pooled_size();
        let channels = blocks.last().map(|b| 2 * b.out_channels).unwrap_or_default();

        tracing::info!(
            "i-RevNet-{}: {} blocks, {} parameters",
            blocks.len() * 3 + 1,
            blocks.len(),
            num_params
        );

        Ok(Summary {
            config,
            blocks,
            bijective_dims: [channels, h, w],
            num_params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_smallest_preset() {
        let summary = SummaryUseCase::new(ArchitectureSource::Preset("irevnet1".into()))
            .execute()
            .unwrap();
        assert_eq!(summary.blocks.len(), 3);
        assert_eq!(summary.depth(), 10);
        assert_eq!(summary.injective_blocks(), 1);
        assert_eq!(summary.bijective_dims, [512, 8, 8]);
        assert!(summary.num_params > 0);
    }
}
