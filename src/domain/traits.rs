// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Every bijective piece of the network (psi, the injective pad,
// a coupling block, the whole bijective branch) exposes the same
// two-method contract. Generic code such as the reconstruction
// probe and the round-trip tests only sees this trait.

use crate::domain::error::Result;

// ─── Invertible ───────────────────────────────────────────────────────────────
/// A mapping with an exact (up to floating point) left inverse:
/// `inverse(forward(x)) == x` for every valid `x`.
///
/// Implementations:
///   - IRevNetBlock  → additive coupling on a (x1, x2) pair
///   - IRevNet       → the whole bijective branch
pub trait Invertible {
    /// What flows in on the forward pass and out of the inverse.
    type Input;
    /// What flows out of the forward pass and into the inverse.
    type Output;

    fn forward(&self, input: Self::Input) -> Result<Self::Output>;

    /// Recomputes whatever it needs from `output`; implementations
    /// must not cache forward activations.
    fn inverse(&self, output: Self::Output) -> Result<Self::Input>;
}
