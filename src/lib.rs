#![recursion_limit = "256"]

//! Invertible residual networks (i-RevNet) on Burn.
//!
//! The crate is organised in layers:
//!
//! - [`cli`]: argument parsing and printing
//! - [`application`]: one use case per command
//! - [`domain`]: framework-free schedules, presets and errors
//! - [`ml`]: the Burn modules (psi, coupling blocks, network)
//! - [`infra`]: checkpoints and reconstruction reports

pub mod cli;
pub mod application;
pub mod domain;
pub mod ml;
pub mod infra;

pub use domain::error::{IRevNetError, Result};
pub use domain::traits::Invertible;
pub use ml::block::{IRevNetBlock, IRevNetBlockConfig};
pub use ml::network::{IRevNet, IRevNetConfig, IRevNetOutput};
