// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction. Parses arguments
// with clap, picks the compute backend, and prints results.
// All real work is delegated to Layer 2 (application).

pub mod commands;

use anyhow::Result;
use burn::backend::{wgpu::WgpuDevice, NdArray, Wgpu};
use clap::Parser;
use commands::{BackendKind, CheckArgs, Commands, InitArgs, SummaryArgs};

use crate::application::{
    check_use_case::CheckUseCase,
    init_use_case::InitUseCase,
    summary_use_case::SummaryUseCase,
};
use crate::domain::presets;

#[derive(Parser, Debug)]
#[command(
    name = "irevnet",
    version,
    about = "Build, inspect and verify invertible residual networks (i-RevNet)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Presets       => Self::run_presets(),
            Commands::Summary(args) => Self::run_summary(args),
            Commands::Init(args)    => Self::run_init(args),
            Commands::Check(args)   => Self::run_check(args),
        }
    }

    fn run_presets() -> Result<()> {
        for p in presets::all() {
            println!(
                "{:<16} blocks={:?} channels={:?} input={:?} classes={}",
                p.name, p.blocks, p.channels, p.in_shape, p.num_classes
            );
        }
        Ok(())
    }

    fn run_summary(args: SummaryArgs) -> Result<()> {
        let summary = SummaryUseCase::new(args.source.into()).execute()?;

        println!("i-RevNet-{}  ({} blocks)", summary.depth(), summary.blocks.len());
        println!("{:>5} {:>6} {:>6} {:>6} {:>9} {:>6}", "block", "in", "out", "stride", "injective", "first");
        for b in &summary.blocks {
            println!(
                "{:>5} {:>6} {:>6} {:>6} {:>9} {:>6}",
                b.index, b.in_channels, b.out_channels, b.stride, b.is_injective(), b.is_first
            );
        }
        println!("bijective features: {:?}", summary.bijective_dims);
        println!("classes:            {}", summary.config.num_classes);
        println!("parameters:         {}", summary.num_params);
        Ok(())
    }

    fn run_init(args: InitArgs) -> Result<()> {
        let backend = args.backend;
        let dir = args.checkpoint_dir.clone();
        let use_case = InitUseCase::new(args.into());

        let params = match backend {
            BackendKind::Ndarray => use_case.execute::<NdArray>(&Default::default())?,
            BackendKind::Wgpu    => use_case.execute::<Wgpu>(&WgpuDevice::default())?,
        };
        println!("Saved network with {params} parameters to '{}'.", dir.display());
        Ok(())
    }

    fn run_check(args: CheckArgs) -> Result<()> {
        let backend = args.backend;
        let use_case = CheckUseCase::new(args.into());

        tracing::info!("Running reconstruction check on {:?}", backend);
        let report = match backend {
            BackendKind::Ndarray => use_case.execute::<NdArray>(&Default::default())?,
            BackendKind::Wgpu    => use_case.execute::<Wgpu>(&WgpuDevice::default())?,
        };

        if let Some(worst) = report.worst_block() {
            println!(
                "worst block: #{} (stride {}) error {:.3e}",
                worst.spec.index, worst.spec.stride, worst.max_abs_error
            );
        }
        println!(
            "end-to-end reconstruction error: {:.3e} (tolerance {:.1e})",
            report.end_to_end, report.tolerance
        );

        if !report.passed() {
            anyhow::bail!("network does not invert within tolerance");
        }
        println!("OK");
        Ok(())
    }
}
