// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code that
// touches the architecture. The domain layer stays framework
// free; this layer turns its schedules into modules.
//
// What's in this layer:
//
//   ops.rs      — split / merge, injective padding, psi
//                 (space-to-depth) and their inverses
//
//   block.rs    — the bottleneck F and the invertible
//                 coupling block built around it
//
//   network.rs  — IRevNetConfig and the full network:
//                 initial psi, block stack, classification
//                 head, and the inverse of the bijective branch
//
//   probe.rs    — seeded forward/inverse reconstruction check
//
// Reference: Burn Book §3 (Building Blocks)
//            Jacobsen et al. (2018) i-RevNet

/// Bijective tensor primitives
pub mod ops;

/// Bottleneck and coupling block
pub mod block;

/// Network assembly, forward and inverse
pub mod network;

/// Per-block reconstruction error measurement
pub mod probe;
