// ============================================================
// Layer 5 — i-RevNet Network
// ============================================================
// input ──psi(init_ds)──▶ split ──▶ block₀ ──▶ … ──▶ blockₙ ──▶ merge ─┬─▶ bijective
//                                                                      │
//                          BN → ReLU → AvgPool → flatten → Linear ◀────┘
//                                                                      │
//                                                                      ▼
//                                                                   logits
//
// Only the bijective branch is invertible. `inverse` walks the
// blocks in reverse and undoes the initial psi, returning the
// tensor the forward pass started from; the classification head
// is not part of it.

use burn::{
    nn::{
        pool::{AvgPool2d, AvgPool2dConfig},
        BatchNorm, BatchNormConfig,
        Linear, LinearConfig,
        Relu,
    },
    prelude::*,
};

use crate::domain::error::IRevNetError;
use crate::domain::presets::Preset;
use crate::domain::schedule::{default_channels, expand_schedule, BlockSpec, Geometry};
use crate::domain::traits::Invertible;
use crate::ml::block::IRevNetBlock;
use crate::ml::ops::{merge, split, split_at, Psi};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct IRevNetConfig {
    /// Blocks per stage
    pub blocks:       Vec<usize>,
    /// Stride of the first block of each stage (1 or 2)
    pub strides:      Vec<usize>,
    pub num_classes:  usize,
    /// [channels, height, width] of one input sample
    pub in_shape:     [usize; 3],
    /// Output channels per stage; defaults to c/2 · 4^stage
    pub channels:     Option<Vec<usize>>,
    /// Block size of the initial psi, 0 for none
    #[config(default = 2)]
    pub init_ds:      usize,
    #[config(default = 0.0)]
    pub dropout_rate: f64,
    /// Bottleneck width divisor
    #[config(default = 4)]
    pub mult:         usize,
}

impl From<Preset> for IRevNetConfig {
    fn from(p: Preset) -> Self {
        IRevNetConfig::new(p.blocks, p.strides, p.num_classes, p.in_shape)
            .with_channels(Some(p.channels))
            .with_init_ds(p.init_ds)
            .with_dropout_rate(p.dropout_rate)
            .with_mult(p.mult)
    }
}

impl IRevNetConfig {
    pub fn geometry(&self) -> crate::Result<Geometry> {
        Geometry::new(self.in_shape, self.init_ds, &self.strides)
    }

    pub fn stage_channels(&self) -> crate::Result<Vec<usize>> {
        let geometry = self.geometry()?;
        match &self.channels {
            Some(channels) => Ok(channels.clone()),
            None => default_channels(geometry.in_channels(), self.blocks.len()),
        }
    }

    /// The validated per-block schedule.
    pub fn schedule(&self) -> crate::Result<Vec<BlockSpec>> {
        let geometry = self.geometry()?;
        let channels = self.stage_channels()?;
        let specs = expand_schedule(geometry.in_channels(), &channels, &self.blocks, &self.strides)?;
        for spec in &specs {
            spec.validate(self.mult)?;
        }
        Ok(specs)
    }

    /// Builds the network. Every configuration error surfaces here,
    /// before any tensor is allocated.
    pub fn init<B: Backend>(&self, device: &B::Device) -> crate::Result<IRevNet<B>> {
        if self.num_classes == 0 {
            return Err(IRevNetError::config("num_classes must be non-zero"));
        }
        let geometry = self.geometry()?;
        let specs = self.schedule()?;
        let final_channels = specs
            .last()
            .map(|s| 2 * s.out_channels)
            .ok_or_else(|| IRevNetError::config("empty block schedule"))?;
        let [pool_h, pool_w] = geometry.pooled_size();

        tracing::info!(
            "Building i-RevNet: {} blocks ({} layers), {} → {} channels, pooled {}x{}",
            specs.len(),
            specs.len() * 3 + 1,
            geometry.in_channels(),
            final_channels,
            pool_h,
            pool_w,
        );

        let blocks = specs
            .iter()
            .map(|spec| IRevNetBlock::from_spec(spec, self.dropout_rate, self.mult, device))
            .collect::<crate::Result<Vec<_>>>()?;

        let [in_depth, in_height, in_width] = self.in_shape;
        Ok(IRevNet {
            blocks,
            norm:        BatchNormConfig::new(final_channels).with_momentum(0.9).init(device),
            relu:        Relu::new(),
            pool:        AvgPool2dConfig::new([pool_h, pool_w]).with_strides([pool_h, pool_w]).init(),
            linear:      LinearConfig::new(final_channels, self.num_classes).init(device),
            init_ds:     geometry.init_block,
            in_channels: geometry.in_channels(),
            in_depth,
            in_height,
            in_width,
            pool_h,
            pool_w,
        })
    }
}

#[derive(Module, Debug)]
pub struct IRevNet<B: Backend> {
    pub blocks:      Vec<IRevNetBlock<B>>,
    pub norm:        BatchNorm<B>,
    pub relu:        Relu,
    pub pool:        AvgPool2d,
    pub linear:      Linear<B>,
    /// Initial psi block size (1 = none)
    pub init_ds:     usize,
    /// Channels entering the first block
    pub in_channels: usize,
    pub in_depth:    usize,
    pub in_height:   usize,
    pub in_width:    usize,
    pub pool_h:      usize,
    pub pool_w:      usize,
}

pub struct IRevNetOutput<B: Backend> {
    /// [batch, num_classes]
    pub logits:    Tensor<B, 2>,
    /// [batch, channels, h, w] output of the bijective branch
    pub bijective: Tensor<B, 4>,
}

impl<B: Backend> IRevNet<B> {
    pub fn specs(&self) -> Vec<BlockSpec> {
        self.blocks.iter().enumerate().map(|(i, b)| b.spec(i)).collect()
    }

    fn init_psi(&self) -> Psi {
        Psi::new(self.init_ds)
    }

    fn check_input(&self, x: &Tensor<B, 4>) -> crate::Result<()> {
        let [_, c, h, w] = x.dims();
        if [c, h, w] != [self.in_depth, self.in_height, self.in_width] {
            return Err(IRevNetError::dimension(
                "network input",
                format!("[batch, {}, {}, {}]", self.in_depth, self.in_height, self.in_width),
                format!("{:?}", x.dims()),
            ));
        }
        Ok(())
    }

    /// Initial psi followed by the split into the two-way representation.
    fn enter(&self, x: Tensor<B, 4>) -> crate::Result<Tensor<B, 4>> {
        self.check_input(&x)?;
        self.init_psi().forward(x)
    }

    /// input → (logits, bijective features)
    pub fn forward(&self, x: Tensor<B, 4>) -> crate::Result<IRevNetOutput<B>> {
        let bijective = self.forward_bijective(x)?;
        let logits = self.head(bijective.clone())?;
        Ok(IRevNetOutput { logits, bijective })
    }

    pub fn forward_bijective(&self, x: Tensor<B, 4>) -> crate::Result<Tensor<B, 4>> {
        let x = self.enter(x)?;
        let mut pair = split_at(x, self.in_channels / 2)?;
        for block in &self.blocks {
            pair = block.forward(pair)?;
        }
        merge(pair.0, pair.1)
    }

    fn head(&self, bijective: Tensor<B, 4>) -> crate::Result<Tensor<B, 2>> {
        let [_, _, h, w] = bijective.dims();
        if [h, w] != [self.pool_h, self.pool_w] {
            return Err(IRevNetError::dimension(
                "pool",
                format!("{}x{} feature map", self.pool_h, self.pool_w),
                format!("{h}x{w}"),
            ));
        }
        let out = self.relu.forward(self.norm.forward(bijective));
        let out = self.pool.forward(out).flatten::<2>(1, 3);
        Ok(self.linear.forward(out))
    }

    /// bijective features → input of the bijective branch
    pub fn inverse(&self, bijective: Tensor<B, 4>) -> crate::Result<Tensor<B, 4>> {
        let mut pair = split(bijective)?;
        for block in self.blocks.iter().rev() {
            pair = block.inverse(pair)?;
        }
        self.init_psi().inverse(merge(pair.0, pair.1)?)
    }

    /// Merged input of every block, then the bijective output.
    /// Entry `i` is what block `i` received.
    pub fn forward_trace(&self, x: Tensor<B, 4>) -> crate::Result<Vec<Tensor<B, 4>>> {
        let x = self.enter(x)?;
        let mut states = vec![x.clone()];
        let mut pair = split_at(x, self.in_channels / 2)?;
        for block in &self.blocks {
            pair = block.forward(pair)?;
            states.push(merge(pair.0.clone(), pair.1.clone())?);
        }
        Ok(states)
    }

    /// Inverse counterpart of `forward_trace`, indexed the same way.
    pub fn inverse_trace(&self, bijective: Tensor<B, 4>) -> crate::Result<Vec<Tensor<B, 4>>> {
        let mut states = vec![bijective.clone()];
        let mut pair = split(bijective)?;
        for block in self.blocks.iter().rev() {
            pair = block.inverse(pair)?;
            states.push(merge(pair.0.clone(), pair.1.clone())?);
        }
        states.reverse();
        Ok(states)
    }
}

impl<B: Backend> Invertible for IRevNet<B> {
    type Input = Tensor<B, 4>;
    type Output = Tensor<B, 4>;

    fn forward(&self, input: Tensor<B, 4>) -> crate::Result<Tensor<B, 4>> {
        self.forward_bijective(input)
    }

    fn inverse(&self, output: Tensor<B, 4>) -> crate::Result<Tensor<B, 4>> {
        IRevNet::inverse(self, output)
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

    /// Injective first block, then a downsampling stage.
    fn small_config() -> IRevNetConfig {
        IRevNetConfig::new(vec![2, 1], vec![1, 2], 5, [2, 8, 8])
            .with_channels(Some(vec![4, 16]))
            .with_init_ds(0)
    }

    #[test]
    fn test_forward_shapes() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let out = net.forward(random([3, 2, 8, 8])).unwrap();
        assert_eq!(out.logits.dims(), [3, 5]);
        assert_eq!(out.bijective.dims(), [3, 32, 4, 4]);
    }

    #[test]
    fn test_network_round_trip() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let x = random([2, 2, 8, 8]);
        let out = net.forward(x.clone()).unwrap();
        let restored = net.inverse(out.bijective).unwrap();
        assert_eq!(restored.dims(), x.dims());
        assert!(max_abs_diff(restored, x) < 1e-4);
    }

    #[test]
    fn test_round_trip_with_initial_downsampling() {
        let cfg = IRevNetConfig::new(vec![1, 1], vec![1, 2], 4, [3, 8, 8]);
        let net = cfg.init::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(net.in_channels, 12);

        let x = random([2, 3, 8, 8]);
        let states = net.forward_trace(x.clone()).unwrap();
        let bijective = states.last().unwrap().clone();

        // The inverse trace recovers the psi-downsampled input...
        let reconstructed = net.inverse_trace(bijective.clone()).unwrap();
        let expected = Psi::new(2).forward(x.clone()).unwrap();
        assert!(max_abs_diff(reconstructed[0].clone(), expected) < 1e-4);

        // ...and the full inverse undoes the psi as well.
        assert!(max_abs_diff(net.inverse(bijective).unwrap(), x) < 1e-4);
    }

    #[test]
    fn test_traces_line_up() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let states = net.forward_trace(random([1, 2, 8, 8])).unwrap();
        assert_eq!(states.len(), net.blocks.len() + 1);

        let back = net.inverse_trace(states.last().unwrap().clone()).unwrap();
        assert_eq!(back.len(), states.len());
        for (f, b) in states.into_iter().zip(back) {
            assert_eq!(f.dims(), b.dims());
            assert!(max_abs_diff(f, b) < 1e-4);
        }
    }

    #[test]
    fn test_trait_round_trip_matches_inherent() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let x = random([1, 2, 8, 8]);
        let bij = Invertible::forward(&net, x.clone()).unwrap();
        let back = Invertible::inverse(&net, bij).unwrap();
        assert!(max_abs_diff(back, x) < 1e-4);
    }

    #[test]
    fn test_mismatched_schedule_fails_at_construction() {
        let cfg = IRevNetConfig::new(vec![2, 2], vec![1], 10, [2, 8, 8]).with_init_ds(0);
        let err = cfg.init::<TestBackend>(&Default::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_non_divisible_input_fails_at_construction() {
        let cfg = IRevNetConfig::new(vec![2, 1], vec![1, 2], 5, [2, 7, 7])
            .with_channels(Some(vec![4, 16]))
            .with_init_ds(0);
        let err = cfg.init::<TestBackend>(&Default::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_wrong_input_shape_fails_at_forward() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let err = net.forward(random([1, 2, 16, 16])).err().unwrap();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_inverse_rejects_odd_channels() {
        let net = small_config().init::<TestBackend>(&Default::default()).unwrap();
        let err = net.inverse(random([1, 31, 4, 4])).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_default_channels_are_used() {
        let cfg = IRevNetConfig::new(vec![1, 1], vec![1, 2], 4, [3, 8, 8]);
        assert_eq!(cfg.stage_channels().unwrap(), vec![6, 24]);
        let specs = cfg.schedule().unwrap();
        assert_eq!(specs[1].in_channels, 12);
    }

    #[test]
    fn test_preset_conversion() {
        let cfg: IRevNetConfig = crate::domain::presets::lookup("irevnet1").unwrap().into();
        let specs = cfg.schedule().unwrap();
        let strides: Vec<usize> = specs.iter().map(|s| s.stride).collect();
        assert_eq!(strides, vec![1, 2, 2]);
        assert!(specs[0].is_injective());
    }
}
