use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use vlasov_core::driver::run;
use vlasov_types::config::SimulationConfig;
use vlasov_types::error::VlasovResult;

#[derive(Parser)]
#[command(
    name = "bump-on-tail",
    version,
    about = "Bump-on-tail Vlasov-Poisson run in a Hermite velocity basis"
)]
struct Cli {
    /// JSON run configuration.
    #[arg(short, long)]
    config: PathBuf,
    /// Override `output.directory`.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Override `time.t_final`.
    #[arg(long)]
    t_final: Option<f64>,
}

fn run_cli(cli: Cli) -> VlasovResult<()> {
    let mut config = SimulationConfig::from_file(&cli.config.to_string_lossy())?;
    if let Some(dir) = cli.output_dir {
        config.output.directory = dir.to_string_lossy().to_string();
    }
    if let Some(t_final) = cli.t_final {
        config.time.t_final = t_final;
    }
    let (out, paths) = run(&config)?;
    info!(
        "{} steps, {} nonlinear iterations; solution in {}",
        out.steps(),
        out.nonlinear_iterations,
        paths.solution.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run_cli(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
