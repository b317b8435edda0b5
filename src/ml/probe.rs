// ============================================================
// Layer 5 — Reconstruction Probe
// ============================================================
// Pushes a seeded random batch through the bijective branch and
// back again, and measures how far every block's reconstructed
// input drifts from what the forward pass actually fed it.
//
// Block errors grow towards the input end of the stack: each
// inverse step feeds its rounding error into F of the block
// before it. The end-to-end figure is the one that must stay
// under the tolerance.

use burn::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::domain::schedule::BlockSpec;
use crate::ml::network::IRevNet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockError {
    pub spec:          BlockSpec,
    /// max |forward input − reconstructed input| of this block
    pub max_abs_error: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub batch_size: usize,
    pub seed:       u64,
    pub tolerance:  f32,
    pub blocks:     Vec<BlockError>,
    /// max |inverse(forward(x)) − x|
    pub end_to_end: f32,
}

impl ProbeReport {
    pub fn passed(&self) -> bool {
        self.end_to_end.is_finite() && self.end_to_end < self.tolerance
    }

    /// The block whose reconstructed input is furthest off.
    pub fn worst_block(&self) -> Option<&BlockError> {
        self.blocks
            .iter()
            .max_by(|a, b| a.max_abs_error.total_cmp(&b.max_abs_error))
    }
}

/// Uniform [-1, 1) batch, reproducible from `seed`.
pub fn random_input<B: Backend>(shape: [usize; 4], seed: u64, device: &B::Device) -> Tensor<B, 4> {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = shape.iter().product::<usize>();
    let values: Vec<f32> = (0..count).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape(shape)
}

pub fn max_abs_error<B: Backend>(a: Tensor<B, 4>, b: Tensor<B, 4>) -> f32 {
    (a - b).abs().max().into_scalar().elem::<f32>()
}

pub fn run_probe<B: Backend>(
    net:        &IRevNet<B>,
    batch_size: usize,
    seed:       u64,
    tolerance:  f32,
    device:     &B::Device,
) -> Result<ProbeReport> {
    let x = random_input::<B>([batch_size, net.in_depth, net.in_height, net.in_width], seed, device);

    let forward = net.forward_trace(x.clone())?;
    let bijective = forward[forward.len() - 1].clone();
    let backward = net.inverse_trace(bijective.clone())?;

    let blocks = net
        .specs()
        .into_iter()
        .zip(forward.into_iter().zip(backward))
        .map(|(spec, (f, b))| {
            let max_abs_error = max_abs_error(f, b);
            tracing::debug!("Block #{:<3} stride={} error={:.3e}", spec.index, spec.stride, max_abs_error);
            BlockError { spec, max_abs_error }
        })
        .collect();

    let end_to_end = max_abs_error(net.inverse(bijective)?, x);
    tracing::info!("Reconstruction error over {} samples: {:.3e}", batch_size, end_to_end);

    Ok(ProbeReport { batch_size, seed, tolerance, blocks, end_to_end })
}
