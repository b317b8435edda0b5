// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles everything that touches the filesystem:
//
//   checkpoint.rs — Saving and loading networks
//                   Uses Burn's full-precision MessagePack
//                   recorder for weights, plus the architecture config as
//                   JSON so the network can be rebuilt first.
//
//   report.rs     — Reconstruction report logging
//                   Writes per-block probe errors to CSV and
//                   the full report to JSON.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Network checkpoint saving and loading
pub mod checkpoint;

/// Reconstruction probe CSV/JSON logger
pub mod report;
