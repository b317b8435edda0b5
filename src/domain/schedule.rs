// ============================================================
// Layer 3 — Block Schedule
// ============================================================
// Turns the three per-stage lists of a configuration
//
//   channels = [16, 64, 256]
//   blocks   = [ 2,  2,   2]
//   strides  = [ 1,  2,   2]
//
// into one BlockSpec per block:
//
//   #0 in=  3 out= 16 stride=1 first   (injective: pads 3 → 32)
//   #1 in= 32 out= 16 stride=1
//   #2 in= 32 out= 64 stride=2
//   #3 in=128 out= 64 stride=1
//   ...
//
// Only the first block of a stage carries the stage stride.
// The input width of block k+1 is 2 × out_channels(k) because
// the running value is always a pair of halves.
//
// Also validates the channel arithmetic of every block, and the
// spatial geometry of the whole network, so that IRevNetConfig::init
// fails before a single tensor is allocated.

use serde::{Deserialize, Serialize};

use crate::domain::error::{IRevNetError, Result};

/// One entry of the flattened, immutable per-block schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Position of the block in the stack
    pub index: usize,
    /// Channel count of the merged input pair
    pub in_channels: usize,
    /// Channel count of EACH output half
    pub out_channels: usize,
    /// 1, or 2 for a psi downsampling block
    pub stride: usize,
    /// Only the very first block skips the bottleneck prologue
    pub is_first: bool,
}

impl BlockSpec {
    /// Zero channels appended by injective padding. Only stride-1
    /// blocks pad; a stride-2 block grows channels through psi.
    pub fn pad(&self) -> usize {
        if self.stride == 1 {
            self.out_channels.saturating_mul(2).saturating_sub(self.in_channels)
        } else {
            0
        }
    }

    pub fn is_injective(&self) -> bool {
        self.pad() > 0
    }

    /// Channel count of the half that feeds the bottleneck.
    pub fn half_channels(&self) -> usize {
        (self.in_channels + self.pad()) / 2
    }

    pub fn bottleneck_width(&self, mult: usize) -> usize {
        if mult == 0 { 0 } else { self.out_channels / mult }
    }

    /// Checks that forward and inverse are well defined for this block.
    pub fn validate(&self, mult: usize) -> Result<()> {
        let at = |msg: String| IRevNetError::config(format!("block #{}: {msg}", self.index));

        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(at("channel counts must be non-zero".into()));
        }
        if self.in_channels < 2 {
            return Err(at(format!(
                "in_channels={} cannot form a pair of halves",
                self.in_channels
            )));
        }
        if mult == 0 {
            return Err(at("channel multiplier must be non-zero".into()));
        }
        if self.bottleneck_width(mult) == 0 {
            return Err(at(format!(
                "out_channels={} is smaller than the multiplier {mult}",
                self.out_channels
            )));
        }

        match self.stride {
            1 => {
                if self.out_channels.saturating_mul(2) < self.in_channels {
                    return Err(at(format!(
                        "channels may only grow: 2 x out_channels={} < in_channels={}",
                        2 * self.out_channels,
                        self.in_channels
                    )));
                }
                // Without padding the halves must already be equal.
                if !self.is_injective() && self.in_channels % 2 != 0 {
                    return Err(at(format!(
                        "in_channels={} cannot be split into two halves",
                        self.in_channels
                    )));
                }
            }
            2 => {
                if self.in_channels % 2 != 0 {
                    return Err(at(format!(
                        "stride 2 needs an even in_channels, got {}",
                        self.in_channels
                    )));
                }
                // psi(2) turns each half of in/2 channels into 2 x in channels
                if self.in_channels.checked_mul(2) != Some(self.out_channels) {
                    return Err(at(format!(
                        "stride 2 needs out_channels = 2 x in_channels = {}, got {}",
                        self.in_channels.saturating_mul(2),
                        self.out_channels
                    )));
                }
            }
            s => return Err(at(format!("stride must be 1 or 2, got {s}"))),
        }
        Ok(())
    }
}

/// Flattens per-stage strides: only the first block of a stage
/// carries the stage stride.
pub fn flattened_strides(blocks: &[usize], strides: &[usize]) -> Vec<usize> {
    blocks
        .iter()
        .zip(strides)
        .flat_map(|(&depth, &stride)| {
            (0..depth).map(move |i| if i == 0 { stride } else { 1 })
        })
        .collect()
}

/// Expands the stage lists into the per-block schedule.
///
/// Fails fast on mismatched list lengths instead of truncating to
/// the shortest one.
pub fn expand_schedule(
    in_channels: usize,
    channels:    &[usize],
    blocks:      &[usize],
    strides:     &[usize],
) -> Result<Vec<BlockSpec>> {
    if channels.len() != blocks.len() || blocks.len() != strides.len() {
        return Err(IRevNetError::config(format!(
            "stage lists differ in length: channels={}, blocks={}, strides={}",
            channels.len(),
            blocks.len(),
            strides.len()
        )));
    }
    if blocks.is_empty() {
        return Err(IRevNetError::config("at least one stage is required"));
    }
    if let Some(stage) = blocks.iter().position(|&b| b == 0) {
        return Err(IRevNetError::config(format!("stage {stage} has zero blocks")));
    }
    if let Some(stage) = channels.iter().position(|&c| c == 0) {
        return Err(IRevNetError::config(format!("stage {stage} has zero channels")));
    }
    // Each stage's merged width is 2 x channels, and psi doubles it again.
    if let Some(stage) = channels.iter().position(|&c| c.checked_mul(4).is_none()) {
        return Err(IRevNetError::config(format!(
            "stage {stage} channel count {} is too large",
            channels[stage]
        )));
    }
    if let Some(stage) = strides.iter().position(|&s| s != 1 && s != 2) {
        return Err(IRevNetError::config(format!(
            "stage {stage} has stride {}, only 1 and 2 are supported",
            strides[stage]
        )));
    }

    let per_block_channels = channels
        .iter()
        .zip(blocks)
        .flat_map(|(&c, &depth)| std::iter::repeat(c).take(depth));
    let per_block_strides = flattened_strides(blocks, strides);

    let mut running_in = in_channels;
    let specs = per_block_channels
        .zip(per_block_strides)
        .enumerate()
        .map(|(index, (out_channels, stride))| {
            let spec = BlockSpec {
                index,
                in_channels: running_in,
                out_channels,
                stride,
                is_first: index == 0,
            };
            running_in = 2 * out_channels;
            spec
        })
        .collect();

    Ok(specs)
}

/// Default per-stage channel counts: half the network input width,
/// growing 4x per stage.
pub fn default_channels(in_channels: usize, stages: usize) -> Result<Vec<usize>> {
    (0..stages)
        .map(|i| {
            u32::try_from(i)
                .ok()
                .and_then(|exp| 4usize.checked_pow(exp))
                .and_then(|growth| (in_channels / 2).checked_mul(growth))
                .ok_or_else(|| {
                    IRevNetError::config(format!(
                        "default channel count of stage {i} overflows; list the channels explicitly"
                    ))
                })
        })
        .collect()
}

// ─── Network Geometry ─────────────────────────────────────────────────────────
/// Spatial bookkeeping for a whole network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// [channels, height, width] of the raw input
    pub in_shape: [usize; 3],
    /// Block size of the initial psi (1 = none)
    pub init_block: usize,
    /// Product of the initial psi block and every stride-2 block
    pub cumulative_stride: usize,
}

impl Geometry {
    /// `init_ds` of 0 or 1 disables the initial psi.
    pub fn new(in_shape: [usize; 3], init_ds: usize, strides: &[usize]) -> Result<Self> {
        let init_block = init_ds.max(1);
        let downsamples = strides.iter().filter(|&&s| s == 2).count();
        let cumulative_stride = u32::try_from(downsamples)
            .ok()
            .and_then(|exp| 2usize.checked_pow(exp))
            .and_then(|factor| factor.checked_mul(init_block))
            .ok_or_else(|| {
                IRevNetError::config(format!(
                    "{downsamples} stride-2 stages with initial block {init_block} overflow the cumulative stride"
                ))
            })?;
        let geometry = Self { in_shape, init_block, cumulative_stride };
        geometry.validate()?;
        Ok(geometry)
    }

    fn validate(&self) -> Result<()> {
        let [c, h, w] = self.in_shape;
        if c == 0 || h == 0 || w == 0 {
            return Err(IRevNetError::config(format!(
                "input shape {:?} has an empty dimension",
                self.in_shape
            )));
        }
        if h % self.init_block != 0 || w % self.init_block != 0 {
            return Err(IRevNetError::config(format!(
                "input {h}x{w} is not divisible by the initial downsampling block {}",
                self.init_block
            )));
        }
        if h % self.cumulative_stride != 0 || w % self.cumulative_stride != 0 {
            return Err(IRevNetError::config(format!(
                "input {h}x{w} is not divisible by the cumulative stride {}",
                self.cumulative_stride
            )));
        }
        if self.init_block.checked_mul(self.init_block).and_then(|area| area.checked_mul(c)).is_none() {
            return Err(IRevNetError::config(format!(
                "{c} channels with initial block {} overflow the channel count",
                self.init_block
            )));
        }
        Ok(())
    }

    /// Channel count entering the first block.
    pub fn in_channels(&self) -> usize {
        self.in_shape[0] * self.init_block * self.init_block
    }

    /// Spatial size of the bijective feature map, which is also
    /// the average-pooling kernel of the classification head.
    pub fn pooled_size(&self) -> [usize; 2] {
        [
            self.in_shape[1] / self.cumulative_stride,
            self.in_shape[2] / self.cumulative_stride,
        ]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_first_block_of_stage_carries_stride() {
        assert_eq!(flattened_strides(&[2, 3], &[1, 2]), vec![1, 1, 2, 1, 1]);
    }

    #[test]
    fn test_expand_doubles_running_channels() {
        let specs = expand_schedule(3, &[16, 64], &[2, 1], &[1, 2]).unwrap();
        let ins: Vec<usize> = specs.iter().map(|s| s.in_channels).collect();
        assert_eq!(ins, vec![3, 32, 32]);
        assert_eq!(specs[2].out_channels, 64);
        assert_eq!(specs[2].stride, 2);
    }

    #[test]
    fn test_only_first_block_is_first() {
        let specs = expand_schedule(4, &[2, 8], &[3, 2], &[1, 2]).unwrap();
        assert!(specs[0].is_first);
        assert!(specs[1..].iter().all(|s| !s.is_first));
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let err = expand_schedule(4, &[2, 8], &[3], &[1, 2]).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("differ in length"));
    }

    #[test]
    fn test_empty_and_zero_depth_stages_fail() {
        assert!(expand_schedule(4, &[], &[], &[]).is_err());
        assert!(expand_schedule(4, &[2], &[0], &[1]).is_err());
        assert!(expand_schedule(4, &[2], &[1], &[3]).is_err());
        assert!(expand_schedule(4, &[0], &[1], &[1]).is_err());
    }

    #[test]
    fn test_injective_pad_amount() {
        let spec = BlockSpec { index: 0, in_channels: 3, out_channels: 16, stride: 1, is_first: true };
        assert_eq!(spec.pad(), 29);
        assert_eq!(spec.half_channels(), 16);
        assert!(spec.validate(4).is_ok());
    }

    #[test]
    fn test_stride_two_channel_rule() {
        let ok = BlockSpec { index: 1, in_channels: 32, out_channels: 64, stride: 2, is_first: false };
        assert!(ok.validate(4).is_ok());
        assert_eq!(ok.pad(), 0);

        let bad = BlockSpec { out_channels: 48, ..ok };
        assert!(bad.validate(4).unwrap_err().is_config());
    }

    #[test]
    fn test_shrinking_channels_fail() {
        let spec = BlockSpec { index: 0, in_channels: 64, out_channels: 16, stride: 1, is_first: true };
        assert!(spec.validate(4).is_err());
    }

    #[test]
    fn test_bottleneck_must_be_non_empty() {
        let spec = BlockSpec { index: 0, in_channels: 4, out_channels: 2, stride: 1, is_first: true };
        assert!(spec.validate(4).is_err());
        assert!(spec.validate(2).is_ok());
    }

    #[test]
    fn test_default_channels() {
        assert_eq!(default_channels(12, 4).unwrap(), vec![6, 24, 96, 384]);
    }

    #[test]
    fn test_default_channels_overflow_is_a_config_error() {
        let err = default_channels(4, 40).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_many_stride_two_stages_are_a_config_error() {
        let err = Geometry::new([3, 32, 32], 0, &[2; 70]).unwrap_err();
        assert!(err.is_config());

        let err = Geometry::new([3, 32, 32], usize::MAX, &[1]).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_huge_channel_counts_are_a_config_error() {
        let err = expand_schedule(4, &[usize::MAX / 2], &[1], &[1]).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_geometry_pooled_size() {
        let g = Geometry::new([3, 32, 32], 0, &[1, 2, 2]).unwrap();
        assert_eq!(g.in_channels(), 3);
        assert_eq!(g.cumulative_stride, 4);
        assert_eq!(g.pooled_size(), [8, 8]);

        let g = Geometry::new([3, 224, 224], 2, &[2, 2, 2, 2]).unwrap();
        assert_eq!(g.in_channels(), 12);
        assert_eq!(g.pooled_size(), [7, 7]);
    }

    #[test]
    fn test_geometry_rejects_non_divisible_input() {
        let err = Geometry::new([3, 30, 30], 0, &[1, 2, 2]).unwrap_err();
        assert!(err.is_config());
    }
}
