// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing the network
// topology before any tensor exists.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything that can go wrong with a configuration is caught
// here, so a bad schedule never reaches the ML layer.

// Error type shared by the domain and ML layers
pub mod error;

// Stage schedule → per-block schedule expansion
pub mod schedule;

// Named architectures
pub mod presets;

// The forward/inverse contract
pub mod traits;
