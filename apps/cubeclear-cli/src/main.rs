use anyhow::Result;
use clap::{Parser, ValueEnum};
use cubeclear_probe::{
    ClearDevice, Probe, ProbeConfig, Quirk, Reporter, RunResult, SimulatedDevice, StorageKind,
    TextReporter, TracingReporter, write_json,
};
use cubeclear_wgpu::{GpuContext, WgpuClearDevice};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cubeclear",
    about = "Check that a layered framebuffer clear reaches every cube-map face"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Number of passes over the variant matrix
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    passes: u32,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Graphics backend to probe
    #[arg(long, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,

    /// Edge length of each cube face in texels
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u32).range(1..=16384))]
    face_size: u32,

    /// Run against a simulated driver instead of a GPU
    #[arg(long, value_enum)]
    simulate: Option<SimQuirk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl From<Backend> for wgpu::Backends {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Auto => wgpu::Backends::all(),
            Backend::Vulkan => wgpu::Backends::VULKAN,
            Backend::Metal => wgpu::Backends::METAL,
            Backend::Dx12 => wgpu::Backends::DX12,
            Backend::Gl => wgpu::Backends::GL,
        }
    }
}

/// Simulated driver behaviors. Quirks apply to immutable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SimQuirk {
    Compliant,
    SkipFirstLayer,
    FirstLayerOnly,
}

impl From<SimQuirk> for Quirk {
    fn from(quirk: SimQuirk) -> Self {
        match quirk {
            SimQuirk::Compliant => Quirk::Compliant,
            SimQuirk::SkipFirstLayer => Quirk::skips_first_layer(StorageKind::Immutable),
            SimQuirk::FirstLayerOnly => Quirk::clears_first_layer_only(StorageKind::Immutable),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = ProbeConfig {
        face_size: cli.face_size,
        ..Default::default()
    };

    let passes = match cli.simulate {
        Some(quirk) => {
            tracing::info!(?quirk, "using simulated driver");
            run_passes(SimulatedDevice::new(quirk.into()), config, &cli)?
        }
        None => {
            let ctx = GpuContext::acquire(cli.backend.into(), cli.face_size)?;
            run_passes(WgpuClearDevice::new(ctx.device, ctx.queue), config, &cli)?
        }
    };

    if cli.format == Format::Json {
        write_json(std::io::stdout().lock(), &passes)?;
        println!();
    }

    Ok(())
}

fn run_passes<D: ClearDevice>(device: D, config: ProbeConfig, cli: &Cli) -> Result<Vec<RunResult>> {
    let mut probe = Probe::new(device, config);
    let mut text = TextReporter::new(std::io::stdout().lock());
    let mut log = TracingReporter;

    let mut results: Vec<RunResult> = Vec::new();
    for pass in 0..cli.passes {
        let reporter: &mut dyn Reporter = match cli.format {
            Format::Text => &mut text,
            Format::Json => &mut log,
        };
        let result = probe.run(reporter)?;
        if let Some(first) = results.first()
            && !first.same_verdicts(&result)
        {
            tracing::warn!(pass, "verdicts differ from the first pass");
        }
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_unconditional_run() {
        let cli = Cli::try_parse_from(["cubeclear"]).unwrap();
        assert_eq!(cli.passes, 1);
        assert_eq!(cli.face_size, 256);
        assert_eq!(cli.format, Format::Text);
        assert_eq!(cli.backend, Backend::Auto);
        assert!(cli.simulate.is_none());
    }

    #[test]
    fn zero_passes_rejected() {
        assert!(Cli::try_parse_from(["cubeclear", "--passes", "0"]).is_err());
    }

    #[test]
    fn simulate_flag_maps_to_quirk() {
        let cli = Cli::try_parse_from(["cubeclear", "--simulate", "skip-first-layer"]).unwrap();
        assert_eq!(
            Quirk::from(cli.simulate.unwrap()),
            Quirk::skips_first_layer(StorageKind::Immutable)
        );
    }
}
