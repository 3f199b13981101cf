use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ec2_driver_updater::config::UpdaterConfig;
use ec2_driver_updater::fetch::HttpFetcher;
use ec2_driver_updater::host;
use ec2_driver_updater::shell::ProcessRunner;
use ec2_driver_updater::update::Orchestrator;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "ec2-driver-updater")]
#[command(version, about = "Checks for and installs newer AWS EC2 Windows drivers")]
struct Cli {
    /// Install all available driver updates (by default only checks)
    #[arg(short, long)]
    install: bool,

    /// JSON file replacing the built-in driver table and settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for downloads and extracted bundles (default: current directory)
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN, leaving stdout to the comparison table
fn init_tracing(debug: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = if debug {
        EnvFilter::new("ec2_driver_updater=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ec2_driver_updater=warn"))
    };

    let (file_layer, guard) = match log_file.and_then(|p| Some((p.parent()?, p.file_name()?))) {
        Some((dir, name)) => {
            let dir = if dir.as_os_str().is_empty() {
                Path::new(".")
            } else {
                dir
            };
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.debug, cli.log_file.as_deref());

    tracing::debug!("Starting with args: {:?}", cli);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if !host::is_supported_os() {
        println!("This program only works with Windows. Exiting.");
        return Ok(ExitCode::from(1));
    }
    if !host::is_elevated() {
        println!("You must run this program as administrator. Exiting.");
        return Ok(ExitCode::from(1));
    }

    let config = UpdaterConfig::discover(cli.config.as_deref())?;
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(update_drivers(&config, work_dir, cli.install))
}

async fn update_drivers(
    config: &UpdaterConfig,
    work_dir: PathBuf,
    install: bool,
) -> anyhow::Result<ExitCode> {
    let fetcher = Arc::new(HttpFetcher::new());

    let host = match host::detect_instance_type(&*fetcher, &config.metadata_url).await {
        Ok(host) => host,
        Err(e) => {
            tracing::debug!("Host detection failed: {}", e);
            println!("This program only works on AWS EC2 instances. Exiting.");
            return Ok(ExitCode::from(1));
        }
    };
    println!("{} EC2 instance type detected.", host);

    let orchestrator = Orchestrator::from_config(config, fetcher, Arc::new(ProcessRunner), work_dir);
    let report = orchestrator
        .run(&config.drivers, &host, install, &mut std::io::stdout())
        .await?;

    for warning in &report.cleanup_warnings {
        eprintln!("Warning: cleanup of {} incomplete: {}", warning.id, warning.message);
    }
    if !report.is_success() {
        eprintln!("The following drivers could not be checked or updated:");
        for failure in &report.failures {
            eprintln!("  {}: {}", failure.id, failure.message);
        }
    }
    if !report.installed.is_empty() {
        println!("Please reboot to complete driver installation.");
    }

    Ok(ExitCode::from(report.exit_code()))
}
