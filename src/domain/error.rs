// ============================================================
// Layer 3 — Error Type
// ============================================================
// Two kinds of failure exist in this crate, and both are
// deterministic functions of configuration or input shape:
//
//   Config            — raised while building blocks/networks,
//                       before any tensor is allocated
//   DimensionMismatch — raised by the tensor operation that
//                       received a tensor of the wrong shape
//
// The application layer wraps these in anyhow::Error with
// extra context; the library itself never panics on them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IRevNetError {
    /// The architecture cannot be built as configured
    #[error("configuration error: {0}")]
    Config(String),

    /// A tensor did not have the shape an operation requires
    #[error("dimension mismatch in {op}: expected {expected}, got {actual}")]
    DimensionMismatch {
        op:       &'static str,
        expected: String,
        actual:   String,
    },
}

impl IRevNetError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dimension(
        op:       &'static str,
        expected: impl Into<String>,
        actual:   impl Into<String>,
    ) -> Self {
        Self::DimensionMismatch {
            op,
            expected: expected.into(),
            actual:   actual.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, IRevNetError>;
