// ============================================================
// Layer 3 — Named Architectures
// ============================================================
// The standard i-RevNet variants, keyed by name so that the CLI
// can build them with `--preset irevnet18`.
//
// Naming:
//   irevnetN       — N blocks per stage, CIFAR-sized input
//   irevnetN-C     — N blocks per stage, C base channels
//   irevnetCxS     — C input channels at SxS resolution
//   imagenet       — the 4-stage ImageNet configuration

use serde::Serialize;

use crate::domain::error::{IRevNetError, Result};

/// Framework-free description of an architecture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    pub name:         &'static str,
    pub blocks:       Vec<usize>,
    pub strides:      Vec<usize>,
    pub channels:     Vec<usize>,
    pub in_shape:     [usize; 3],
    pub init_ds:      usize,
    pub num_classes:  usize,
    pub dropout_rate: f64,
    pub mult:         usize,
}

/// Three stages of `depth` blocks at strides [1, 2, 2], which is
/// the shape of every preset except `imagenet`.
fn three_stage(
    name:        &'static str,
    depth:       usize,
    base:        usize,
    in_shape:    [usize; 3],
    num_classes: usize,
) -> Preset {
    Preset {
        name,
        blocks:       vec![depth; 3],
        strides:      vec![1, 2, 2],
        channels:     vec![base, base * 4, base * 16],
        in_shape,
        init_ds:      0,
        num_classes,
        dropout_rate: 0.1,
        mult:         4,
    }
}

pub fn all() -> Vec<Preset> {
    vec![
        three_stage("irevnet1",  1,  16, [3, 32, 32], 10),
        three_stage("irevnet2",  2,  16, [3, 32, 32], 10),
        three_stage("irevnet4",  4,  16, [3, 32, 32], 10),
        three_stage("irevnet9",  9,  16, [3, 32, 32], 10),
        three_stage("irevnet18", 18, 16, [3, 32, 32], 10),

        three_stage("irevnet4-32",  4,  32, [32, 64, 64], 10),
        three_stage("irevnet18-32", 18, 32, [32, 64, 64], 10),
        three_stage("irevnet24-32", 24, 32, [32, 64, 64], 10),

        three_stage("irevnet16x64", 4, 16, [16, 64, 64], 100),
        three_stage("irevnet48x64", 2, 48, [48, 64, 64], 100),
        three_stage("irevnet64x64", 6, 64, [64, 64, 64], 100),

        three_stage("irevnet18-32-8", 18, 8, [8, 128, 128], 10),
        three_stage("irevnet24-32-8", 24, 8, [8, 128, 128], 10),
        three_stage("irevnet8x112",   18, 8, [8, 112, 112], 10),
        three_stage("irevnet8x384",   18, 8, [8, 384, 384], 10),

        three_stage("irevnet32x56", 2, 32, [32, 56, 56], 10),
        three_stage("irevnet16x56", 2, 16, [16, 56, 56], 10),
        three_stage("irevnet48x56", 2, 48, [48, 56, 56], 10),
        three_stage("irevnet64x56", 2, 64, [64, 56, 56], 10),

        three_stage("irevnet32x192", 4, 32, [32, 192, 192], 10),
        three_stage("irevnet20x320", 4, 20, [20, 320, 320], 35),
        three_stage("irevnet40x320", 4, 40, [40, 320, 320], 35),

        Preset {
            name:         "imagenet",
            blocks:       vec![6, 16, 72, 6],
            strides:      vec![2, 2, 2, 2],
            channels:     vec![24, 96, 384, 1536],
            in_shape:     [3, 224, 224],
            init_ds:      2,
            num_classes:  1000,
            dropout_rate: 0.0,
            mult:         4,
        },
    ]
}

pub fn names() -> Vec<&'static str> {
    all().into_iter().map(|p| p.name).collect()
}

pub fn lookup(name: &str) -> Result<Preset> {
    all()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            IRevNetError::config(format!(
                "unknown preset '{name}', known presets: {}",
                names().join(", ")
            ))
        })
}
