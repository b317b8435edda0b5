// ============================================================
// Layer 5 — Invertible Coupling Block
// ============================================================
// One i-RevNet block maps a pair (x1, x2) to (x2', y1):
//
//   forward:   Fx2 = F(x2)
//              x1', x2' = psi(x1), psi(x2)     (stride 2 only)
//              y1 = Fx2 + x1'
//              return (x2', y1)
//
//   inverse:   x2 = psi⁻¹(x2')                 (stride 2 only)
//              x1' = y1 - F(x2)
//              x1 = psi⁻¹(x1')                 (stride 2 only)
//              return (x1, x2)
//
// F is never inverted. The inverse evaluates it a second time and
// subtracts, so the block stays invertible whatever F's weights are,
// and nothing from the forward pass has to be kept around.
// Reconstruction is exact only when both evaluations of F agree,
// i.e. outside training mode (no dropout, running batch statistics).
//
// Injective blocks (stride 1, 2·out > in) first merge the pair,
// append zero channels and re-split; the inverse truncates them.
//
// Reference: Jacobsen et al. (2018) i-RevNet: Deep Invertible Networks

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::domain::error::IRevNetError;
use crate::domain::schedule::BlockSpec;
use crate::domain::traits::Invertible;
use crate::ml::ops::{merge, split, split_at, InjectivePad, Pair, Psi};

// ─── Layer ────────────────────────────────────────────────────────────────────
/// A single step of the bottleneck sequence.
pub trait Layer<B: Backend> {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4>;
}

impl<B: Backend> Layer<B> for Conv2d<B> {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}

impl<B: Backend> Layer<B> for BatchNorm<B> {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}

impl<B: Backend> Layer<B> for Relu {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}

impl<B: Backend> Layer<B> for Dropout {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}

fn conv3x3<B: Backend>(in_ch: usize, out_ch: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_ch, out_ch], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

// ─── Bottleneck (F) ───────────────────────────────────────────────────────────
/// [BN → ReLU →] Conv → BN → ReLU → Conv → Dropout → BN → ReLU → Conv
///
/// The prologue is absent on the first block of the network, whose
/// input has not been through any activation yet.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    pub prologue: Option<BatchNorm<B>>,
    pub conv1:    Conv2d<B>,
    pub norm1:    BatchNorm<B>,
    pub conv2:    Conv2d<B>,
    pub dropout:  Dropout,
    pub norm2:    BatchNorm<B>,
    pub conv3:    Conv2d<B>,
    pub relu:     Relu,
}

impl<B: Backend> Bottleneck<B> {
    pub fn new(spec: &BlockSpec, dropout_rate: f64, mult: usize, device: &B::Device) -> Self {
        let in_ch = spec.half_channels();
        let width = spec.bottleneck_width(mult);
        let prologue = (!spec.is_first).then(|| BatchNormConfig::new(in_ch).init(device));

        Self {
            prologue,
            conv1:   conv3x3(in_ch, width, spec.stride, device),
            norm1:   BatchNormConfig::new(width).init(device),
            conv2:   conv3x3(width, width, 1, device),
            dropout: DropoutConfig::new(dropout_rate).init(),
            norm2:   BatchNormConfig::new(width).init(device),
            conv3:   conv3x3(width, spec.out_channels, 1, device),
            relu:    Relu::new(),
        }
    }

    fn sequence(&self) -> [&dyn Layer<B>; 8] {
        [
            &self.conv1, &self.norm1, &self.relu,
            &self.conv2, &self.dropout, &self.norm2, &self.relu,
            &self.conv3,
        ]
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match &self.prologue {
            Some(norm) => self.relu.apply(norm.apply(x)),
            None => x,
        };
        self.sequence().into_iter().fold(x, |x, layer| layer.apply(x))
    }
}

// ─── Block Config ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct IRevNetBlockConfig {
    /// Channels of the merged input pair
    pub in_channels:  usize,
    /// Channels of each output half
    pub out_channels: usize,
    #[config(default = 1)]
    pub stride:       usize,
    #[config(default = false)]
    pub is_first:     bool,
    #[config(default = 0.0)]
    pub dropout_rate: f64,
    #[config(default = 4)]
    pub mult:         usize,
}

impl IRevNetBlockConfig {
    pub fn spec(&self) -> BlockSpec {
        BlockSpec {
            index:        0,
            in_channels:  self.in_channels,
            out_channels: self.out_channels,
            stride:       self.stride,
            is_first:     self.is_first,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> crate::Result<IRevNetBlock<B>> {
        IRevNetBlock::from_spec(&self.spec(), self.dropout_rate, self.mult, device)
    }
}

// ─── Block ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct IRevNetBlock<B: Backend> {
    pub bottleneck:   Bottleneck<B>,
    pub in_channels:  usize,
    pub out_channels: usize,
    pub stride:       usize,
    pub pad:          usize,
    pub is_first:     bool,
}

impl<B: Backend> IRevNetBlock<B> {
    /// Validates the channel arithmetic before allocating any weight.
    pub fn from_spec(
        spec:         &BlockSpec,
        dropout_rate: f64,
        mult:         usize,
        device:       &B::Device,
    ) -> crate::Result<Self> {
        spec.validate(mult)?;
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(IRevNetError::config(format!(
                "block #{}: dropout rate {dropout_rate} is outside [0, 1)",
                spec.index
            )));
        }
        if spec.is_injective() {
            tracing::debug!(
                "Block #{} is injective: pads {} → {} channels",
                spec.index, spec.in_channels, 2 * spec.out_channels
            );
        }

        Ok(Self {
            bottleneck:   Bottleneck::new(spec, dropout_rate, mult, device),
            in_channels:  spec.in_channels,
            out_channels: spec.out_channels,
            stride:       spec.stride,
            pad:          spec.pad(),
            is_first:     spec.is_first,
        })
    }

    pub fn spec(&self, index: usize) -> BlockSpec {
        BlockSpec {
            index,
            in_channels:  self.in_channels,
            out_channels: self.out_channels,
            stride:       self.stride,
            is_first:     self.is_first,
        }
    }

    fn psi(&self) -> Psi {
        Psi::new(self.stride)
    }

    fn injective_pad(&self) -> InjectivePad {
        InjectivePad::new(self.pad)
    }

    fn half_channels(&self) -> usize {
        (self.in_channels + self.pad) / 2
    }

    fn check_input(&self, x1: &Tensor<B, 4>, x2: &Tensor<B, 4>) -> crate::Result<()> {
        let total = x1.dims()[1] + x2.dims()[1];
        if total != self.in_channels {
            return Err(IRevNetError::dimension(
                "block forward",
                format!("{} channels across the pair", self.in_channels),
                format!("{} + {} channels", x1.dims()[1], x2.dims()[1]),
            ));
        }
        Ok(())
    }

    /// (x1, x2) → (x2', y1)
    pub fn forward(&self, (x1, x2): Pair<B>) -> crate::Result<Pair<B>> {
        self.check_input(&x1, &x2)?;

        let (x1, x2) = if self.pad > 0 {
            split(self.injective_pad().forward(merge(x1, x2)?))?
        } else {
            (x1, x2)
        };
        if x2.dims()[1] != self.half_channels() {
            return Err(IRevNetError::dimension(
                "block forward",
                format!("x2 with {} channels", self.half_channels()),
                format!("{:?}", x2.dims()),
            ));
        }

        let psi = self.psi();
        let x1_after = psi.forward(x1)?;
        let x2_after = psi.forward(x2.clone())?;
        let fx2 = self.bottleneck.forward(x2);

        if fx2.dims() != x1_after.dims() {
            return Err(IRevNetError::dimension(
                "coupling",
                format!("{:?}", x1_after.dims()),
                format!("{:?}", fx2.dims()),
            ));
        }
        Ok((x2_after, fx2 + x1_after))
    }

    /// (x2', y1) → (x1, x2). Re-evaluates F rather than reading any
    /// cached activation.
    pub fn inverse(&self, (x2, y1): Pair<B>) -> crate::Result<Pair<B>> {
        let psi = self.psi();
        let x2 = psi.inverse(x2)?;
        if x2.dims()[1] != self.half_channels() {
            return Err(IRevNetError::dimension(
                "block inverse",
                format!("x2 with {} channels", self.half_channels()),
                format!("{:?}", x2.dims()),
            ));
        }

        let fx2 = self.bottleneck.forward(x2.clone()).neg();
        if fx2.dims() != y1.dims() {
            return Err(IRevNetError::dimension(
                "block inverse",
                format!("y1 of shape {:?}", fx2.dims()),
                format!("{:?}", y1.dims()),
            ));
        }
        let x1 = psi.inverse(fx2 + y1)?;

        if self.pad > 0 {
            let x = self.injective_pad().inverse(merge(x1, x2)?)?;
            split_at(x, self.in_channels / 2)
        } else {
            Ok((x1, x2))
        }
    }
}

impl<B: Backend> Invertible for IRevNetBlock<B> {
    type Input = Pair<B>;
    type Output = Pair<B>;

    fn forward(&self, input: Pair<B>) -> crate::Result<Pair<B>> {
        IRevNetBlock::forward(self, input)
    }

    fn inverse(&self, output: Pair<B>) -> crate::Result<Pair<B>> {
        IRevNetBlock::inverse(self, output)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn random(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn max_abs_diff(a: Tensor<TestBackend, 4>, b: Tensor<TestBackend, 4>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    fn block(in_ch: usize, out_ch: usize, stride: usize, is_first: bool) -> IRevNetBlock<TestBackend> {
        IRevNetBlockConfig::new(in_ch, out_ch)
            .with_stride(stride)
            .with_is_first(is_first)
            .init(&Default::default())
            .unwrap()
    }

    #[test]
    fn test_bijective_block_round_trip() {
        let block = block(16, 8, 1, false);
        let (x1, x2) = (random([2, 8, 6, 6]), random([2, 8, 6, 6]));

        let (a, b) = block.forward((x1.clone(), x2.clone())).unwrap();
        assert_eq!(a.dims(), [2, 8, 6, 6]);
        assert_eq!(b.dims(), [2, 8, 6, 6]);

        let (r1, r2) = block.inverse((a, b)).unwrap();
        assert!(max_abs_diff(r1, x1) < 1e-5);
        assert!(max_abs_diff(r2, x2) < 1e-5);
    }

    #[test]
    fn test_forward_passes_x2_through() {
        let block = block(8, 4, 1, true);
        let (x1, x2) = (random([1, 4, 4, 4]), random([1, 4, 4, 4]));
        let (a, _) = block.forward((x1, x2.clone())).unwrap();
        assert_eq!(max_abs_diff(a, x2), 0.0);
    }

    #[test]
    fn test_downsampling_block_round_trip() {
        let block = block(4, 8, 2, false);
        let (x1, x2) = (random([2, 2, 8, 8]), random([2, 2, 8, 8]));

        let (a, b) = block.forward((x1.clone(), x2.clone())).unwrap();
        assert_eq!(a.dims(), [2, 8, 4, 4]);
        assert_eq!(b.dims(), [2, 8, 4, 4]);

        let (r1, r2) = block.inverse((a, b)).unwrap();
        assert!(max_abs_diff(r1, x1) < 1e-5);
        assert!(max_abs_diff(r2, x2) < 1e-5);
    }

    #[test]
    fn test_injective_block_grows_and_restores_channels() {
        let block = block(3, 4, 1, true);
        assert_eq!(block.pad, 5);

        let input = random([2, 3, 5, 5]);
        let (x1, x2) = split_at(input.clone(), 1).unwrap();

        let (a, b) = block.forward((x1, x2)).unwrap();
        assert_eq!(a.dims()[1], 4);
        assert_eq!(b.dims()[1], 4);

        let (r1, r2) = block.inverse((a, b)).unwrap();
        assert_eq!(r1.dims()[1] + r2.dims()[1], 3);
        let restored = merge(r1, r2).unwrap();
        assert!(max_abs_diff(restored, input) < 1e-5);
    }

    #[test]
    fn test_first_block_has_no_prologue() {
        assert!(block(8, 4, 1, true).bottleneck.prologue.is_none());
        assert!(block(8, 4, 1, false).bottleneck.prologue.is_some());
    }

    #[test]
    fn test_invalid_channels_fail_before_allocation() {
        let err = IRevNetBlockConfig::new(16, 4)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(err.is_config());

        let err = IRevNetBlockConfig::new(4, 6)
            .with_stride(2)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_wrong_input_channels_fail() {
        let block = block(16, 8, 1, false);
        let err = block.forward((random([1, 4, 4, 4]), random([1, 4, 4, 4]))).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_inverse_through_trait() {
        fn round_trip<I: Invertible<Input = Pair<TestBackend>, Output = Pair<TestBackend>>>(
            f: &I,
            x: Pair<TestBackend>,
        ) -> Pair<TestBackend> {
            f.inverse(f.forward(x).unwrap()).unwrap()
        }

        let block = block(8, 4, 1, false);
        let x2 = random([1, 4, 4, 4]);
        let (_, r2) = round_trip(&block, (random([1, 4, 4, 4]), x2.clone()));
        assert!(max_abs_diff(r2, x2) < 1e-5);
    }

    #[test]
    fn test_bottleneck_is_deterministic_on_inference_backend() {
        let block = IRevNetBlockConfig::new(16, 8)
            .with_dropout_rate(0.1)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        let x2 = random([2, 8, 6, 6]);

        let first = block.bottleneck.forward(x2.clone());
        let second = block.bottleneck.forward(x2);
        assert_eq!(max_abs_diff(first, second), 0.0);
    }

    #[test]
    fn test_round_trip_with_dropout_on_inference_backend() {
        let block = IRevNetBlockConfig::new(16, 8)
            .with_dropout_rate(0.1)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        let (x1, x2) = (random([2, 8, 6, 6]), random([2, 8, 6, 6]));

        let (r1, r2) = block.inverse(block.forward((x1.clone(), x2.clone())).unwrap()).unwrap();
        assert!(max_abs_diff(r1, x1) < 1e-5);
        assert!(max_abs_diff(r2, x2) < 1e-5);
    }
}
