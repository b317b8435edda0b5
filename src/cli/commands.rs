// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and all their configurable flags:
//
//   presets — list the named architectures
//   summary — print the block schedule and parameter count
//   init    — build a network and save a checkpoint
//   check   — verify that a network inverts its own output
//
// clap's derive macros generate --help text, error messages for
// missing or conflicting args, and type conversion.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    check_use_case::CheckConfig,
    init_use_case::InitConfig,
    ArchitectureSource,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the named architectures
    Presets,

    /// Describe an architecture without running it
    Summary(SummaryArgs),

    /// Build a network and save it as a checkpoint
    Init(InitArgs),

    /// Run the forward/inverse reconstruction check
    Check(CheckArgs),
}

/// Compute backend for commands that evaluate tensors
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU via ndarray
    Ndarray,
    /// GPU via wgpu
    Wgpu,
}

/// Exactly one way of naming an architecture.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Named architecture, see `presets`
    #[arg(long)]
    pub preset: Option<String>,

    /// JSON file holding an IRevNetConfig
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Checkpoint directory written by `init`
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,
}

impl From<SourceArgs> for ArchitectureSource {
    fn from(a: SourceArgs) -> Self {
        match (a.preset, a.config, a.checkpoint_dir) {
            (Some(name), _, _) => ArchitectureSource::Preset(name),
            (_, Some(path), _) => ArchitectureSource::ConfigFile(path),
            (_, _, Some(dir))  => ArchitectureSource::Checkpoint(dir),
            // clap's group guarantees one of them is set
            (None, None, None) => ArchitectureSource::Preset(String::new()),
        }
    }
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Named architecture, see `presets`
    #[arg(long, conflicts_with = "config", required_unless_present = "config")]
    pub preset: Option<String>,

    /// JSON file holding an IRevNetConfig
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory to write the checkpoint into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        let source = match (a.preset, a.config) {
            (Some(name), _) => ArchitectureSource::Preset(name),
            (None, Some(path)) => ArchitectureSource::ConfigFile(path),
            (None, None) => ArchitectureSource::Preset(String::new()),
        };
        InitConfig { source, checkpoint_dir: a.checkpoint_dir }
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of random samples pushed through the network
    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Seed of the random input batch
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Largest acceptable max-abs reconstruction error
    #[arg(long, default_value_t = 1e-4)]
    pub tolerance: f32,

    /// Write reconstruction.csv and the JSON report here
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,
}

impl From<CheckArgs> for CheckConfig {
    fn from(a: CheckArgs) -> Self {
        CheckConfig {
            source:     a.source.into(),
            batch_size: a.batch_size,
            seed:       a.seed,
            tolerance:  a.tolerance,
            report_dir: a.report_dir,
        }
    }
}
