//! ppsgui CLI entry point.
//!
//! Reads aggregated tactile and peripersonal-space events and republishes
//! them every 30 ms as contact lists for the force visualizer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use ppsgui::adapter::EventAdapter;
use ppsgui::config::{self, Overrides, Switch};
use ppsgui::logging;
use ppsgui::net::udp::UdpNetwork;
use ppsgui::net::Network;

/// Exit status when the network is unreachable at startup.
const EXIT_NO_NETWORK: i32 = -1;

/// ppsgui: aggregated contact events to GUI contact lists.
#[derive(Parser)]
#[command(name = "ppsgui", version, about)]
struct Cli {
    /// Where to find the called resource (default periPersonalSpace).
    #[arg(long)]
    context: Option<String>,

    /// Name of the resource file (default ppsAggregEventsForiCubGui.ini).
    #[arg(long)]
    from: Option<String>,

    /// Name of the module; prefixes all port names (default ppsAggregEventsForiCubGui).
    #[arg(long)]
    name: Option<String>,

    /// Verbosity level (default 0).
    #[arg(long, allow_negative_numbers = true)]
    verbosity: Option<i32>,

    /// Connect to the well-known producers and visualizer (default off).
    #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "on")]
    autoconnect: Option<Switch>,

    /// Forward tactile aggregated events (default on).
    #[arg(long, value_enum)]
    tactile: Option<Switch>,

    /// Forward peripersonal-space aggregated events (default on).
    #[arg(long, value_enum)]
    pps: Option<Switch>,

    /// Multiplier applied to the normalized event magnitude (default 50.0).
    #[arg(long)]
    gain: Option<f64>,

    /// Directory for rotated JSON log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn into_overrides(self) -> Overrides {
        Overrides {
            context: self.context,
            from: self.from,
            name: self.name,
            verbosity: self.verbosity,
            autoconnect: self.autoconnect,
            tactile: self.tactile,
            pps: self.pps,
            gain: self.gain,
            log_dir: self.log_dir,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = config::load(&cli.into_overrides())?;

    let logging_guard = logging::init(settings.adapter.verbosity, settings.logging.dir.as_deref())?;

    match &settings.source {
        Some(path) => info!(path = %path.display(), "loaded resource file"),
        None => info!("no resource file found, using defaults"),
    }

    let net = UdpNetwork::new(settings.network.host.clone(), settings.network.ports.clone());
    if let Err(e) = net.check() {
        error!(error = %e, "no network");
        drop(logging_guard);
        std::process::exit(EXIT_NO_NETWORK);
    }

    let mut adapter = EventAdapter::configure(settings.adapter, &net)?;
    adapter.run(shutdown_signal()).await;

    info!("ppsgui stopped");
    Ok(())
}

/// Resolves on ctrl-c. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
