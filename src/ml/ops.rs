// ============================================================
// Layer 5 — Channel-Split Tensor Operations
// ============================================================
// The bijective primitives every coupling block is built from.
// All tensors are [batch, channels, height, width].
//
//   split / merge   — the two-way channel representation
//   InjectivePad    — append zero channels / truncate them
//   Psi             — space-to-depth with block size s
//
// Psi ordering, for block size s and input channel count C:
//
//   out[b, (dh*s + dw)*C + c, i, j] = in[b, c, i*s + dh, j*s + dw]
//
// None of these hold learned parameters, so they are plain Copy
// values rebuilt from the block's stride and pad amount.

use burn::prelude::*;

use crate::domain::error::{IRevNetError, Result};

/// The running value between blocks: (x1, x2).
pub type Pair<B> = (Tensor<B, 4>, Tensor<B, 4>);

fn shape_str(dims: [usize; 4]) -> String {
    format!("{dims:?}")
}

/// Partitions the channel axis at its midpoint.
pub fn split<B: Backend>(t: Tensor<B, 4>) -> Result<Pair<B>> {
    let channels = t.dims()[1];
    if channels == 0 || channels % 2 != 0 {
        return Err(IRevNetError::dimension(
            "split",
            "an even, non-zero channel count",
            format!("{channels} channels"),
        ));
    }
    split_at(t, channels / 2)
}

/// Partitions the channel axis into [0, n) and [n, C).
pub fn split_at<B: Backend>(t: Tensor<B, 4>, n: usize) -> Result<Pair<B>> {
    let channels = t.dims()[1];
    if n == 0 || n >= channels {
        return Err(IRevNetError::dimension(
            "split",
            format!("a split point strictly inside 0..{channels}"),
            format!("split point {n}"),
        ));
    }
    let x1 = t.clone().narrow(1, 0, n);
    let x2 = t.narrow(1, n, channels - n);
    Ok((x1, x2))
}

/// Concatenates the halves along the channel axis.
pub fn merge<B: Backend>(x1: Tensor<B, 4>, x2: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
    let [b1, _, h1, w1] = x1.dims();
    let [b2, _, h2, w2] = x2.dims();
    if (b1, h1, w1) != (b2, h2, w2) {
        return Err(IRevNetError::dimension(
            "merge",
            format!("matching batch and spatial dims, x1 is {}", shape_str(x1.dims())),
            format!("x2 is {}", shape_str(x2.dims())),
        ));
    }
    Ok(Tensor::cat(vec![x1, x2], 1))
}

// ─── Injective Padding ────────────────────────────────────────────────────────
/// Appends `pad` zero channels; the inverse truncates them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectivePad {
    pub pad: usize,
}

impl InjectivePad {
    pub fn new(pad: usize) -> Self {
        Self { pad }
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.pad == 0 {
            return x;
        }
        let [b, _, h, w] = x.dims();
        let zeros = Tensor::<B, 4>::zeros([b, self.pad, h, w], &x.device());
        Tensor::cat(vec![x, zeros], 1)
    }

    pub fn inverse<B: Backend>(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        if self.pad == 0 {
            return Ok(x);
        }
        let channels = x.dims()[1];
        if channels <= self.pad {
            return Err(IRevNetError::dimension(
                "injective pad inverse",
                format!("more than {} channels", self.pad),
                format!("{channels} channels"),
            ));
        }
        Ok(x.narrow(1, 0, channels - self.pad))
    }
}

// ─── Psi ──────────────────────────────────────────────────────────────────────
/// Space-to-depth permutation. Block size 0 or 1 is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Psi {
    pub block: usize,
}

impl Psi {
    pub fn new(block: usize) -> Self {
        Self { block }
    }

    pub fn is_identity(&self) -> bool {
        self.block <= 1
    }

    /// [b, c, h, w] → [b, c·s², h/s, w/s]
    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        if self.is_identity() {
            return Ok(x);
        }
        let s = self.block;
        let [b, c, h, w] = x.dims();
        if h % s != 0 || w % s != 0 {
            return Err(IRevNetError::dimension(
                "psi",
                format!("height and width divisible by {s}"),
                shape_str(x.dims()),
            ));
        }
        let (ho, wo) = (h / s, w / s);

        // [b, c, i, dh, j, dw] → [b, dh, dw, c, i, j]
        let t: Tensor<B, 6> = x.reshape([b, c, ho, s, wo, s]);
        let t = t.permute([0, 3, 5, 1, 2, 4]);
        Ok(t.reshape([b, s * s * c, ho, wo]))
    }

    /// [b, c·s², h, w] → [b, c, h·s, w·s]
    pub fn inverse<B: Backend>(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        if self.is_identity() {
            return Ok(x);
        }
        let s = self.block;
        let [b, d, h, w] = x.dims();
        if d % (s * s) != 0 {
            return Err(IRevNetError::dimension(
                "psi inverse",
                format!("channel count divisible by {}", s * s),
                shape_str(x.dims()),
            ));
        }
        let c = d / (s * s);

        // [b, dh, dw, c, i, j] → [b, c, i, dh, j, dw]
        let t: Tensor<B, 6> = x.reshape([b, s, s, c, h, w]);
        let t = t.permute([0, 3, 4, 1, 5, 2]);
        Ok(t.reshape([b, c, h * s, w * s]))
    }
}
