//! The event adapter: configure once, tick every [`PERIOD`], close once.
//!
//! Each tick clears the batch, drains the tactile port then the pps port,
//! and publishes the result with a fresh [`Stamp`]. An empty batch is still
//! published. Nothing inside a tick waits for input.

pub mod decode;

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::contact::{SkinContactList, Stamp};
use crate::net::{InputPort, Network, OutputPort};

/// Tick period.
pub const PERIOD: Duration = Duration::from_millis(30);

/// Well-known producer of aggregated tactile events.
pub const SKIN_EVENTS_SOURCE: &str = "/skinEventsAggregator/skin_events_aggreg:o";
/// Well-known producer of aggregated peripersonal-space events.
pub const PPS_EVENTS_SOURCE: &str = "/visuoTactileRF/pps_events_aggreg:o";
/// Well-known force visualizer input.
pub const GUI_FORCES_SINK: &str = "/iCubGui/forces";

/// Lifecycle state of a configured adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ports are open and ticks publish.
    Running,
    /// Ports are released; ticks are no-ops.
    Closed,
}

/// Converts aggregated events into contact lists, one batch per tick.
pub struct EventAdapter {
    config: AdapterConfig,
    tactile_port: Option<Box<dyn InputPort>>,
    pps_port: Option<Box<dyn InputPort>>,
    output_port: Box<dyn OutputPort>,
    batch: SkinContactList,
    stamp: Stamp,
    state: State,
}

impl EventAdapter {
    /// Open the enabled ports on `net` and, if requested, wire them up.
    ///
    /// Auto-wiring failures are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a port cannot be opened.
    pub fn configure(config: AdapterConfig, net: &dyn Network) -> anyhow::Result<Self> {
        info!(
            context = %config.context,
            from = %config.from,
            name = %config.name,
            verbosity = config.verbosity,
            "initial parameters"
        );
        info!(
            autoconnect = config.autoconnect,
            tactile = config.tactile,
            pps = config.pps,
            gain = config.gain,
            "event sources"
        );

        let open_input = |name: String| {
            net.open_input(&name)
                .with_context(|| format!("failed to open {name}"))
        };
        let tactile_port = if config.tactile {
            Some(open_input(config.skin_events_port())?)
        } else {
            None
        };
        let pps_port = if config.pps {
            Some(open_input(config.pps_events_port())?)
        } else {
            None
        };
        let contacts = config.contacts_port();
        let output_port = net
            .open_output(&contacts)
            .with_context(|| format!("failed to open {contacts}"))?;

        if config.autoconnect {
            let mut links = Vec::new();
            if let Some(port) = &tactile_port {
                links.push((SKIN_EVENTS_SOURCE.to_owned(), port.name().to_owned()));
            }
            if let Some(port) = &pps_port {
                links.push((PPS_EVENTS_SOURCE.to_owned(), port.name().to_owned()));
            }
            links.push((contacts, GUI_FORCES_SINK.to_owned()));
            for (src, dst) in links {
                match net.connect(&src, &dst) {
                    Ok(()) => info!(%src, %dst, "connected"),
                    Err(e) => warn!(%src, %dst, error = %e, "connection failed"),
                }
            }
        }

        Ok(Self {
            config,
            tactile_port,
            pps_port,
            output_port,
            batch: SkinContactList::new(),
            stamp: Stamp::default(),
            state: State::Running,
        })
    }

    /// Options this adapter was configured with.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Envelope of the most recent publication.
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Run one tick and return the batch that was published.
    ///
    /// A failed publish is logged; the tick still completes.
    pub fn update(&mut self) -> &SkinContactList {
        self.batch.clear();
        if self.state == State::Closed {
            return &self.batch;
        }

        let gain = self.config.gain;
        if let Some(port) = self.tactile_port.as_deref_mut() {
            decode::fill_from_port(port, gain, &mut self.batch);
        }
        if let Some(port) = self.pps_port.as_deref_mut() {
            decode::fill_from_port(port, gain, &mut self.batch);
        }

        self.stamp.update();
        if let Err(e) = self.output_port.write(&self.stamp, &self.batch) {
            warn!(port = self.output_port.name(), error = %e, "failed to publish contacts");
        }
        debug!(contacts = self.batch.len(), count = self.stamp.count, "tick");
        &self.batch
    }

    /// Tick every [`PERIOD`] until `shutdown` resolves, then close.
    ///
    /// Shutdown is only observed between ticks.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let period_ms = u64::try_from(PERIOD.as_millis()).unwrap_or(u64::MAX);
        info!(period_ms, "adapter running");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.update();
                }
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
        self.close();
    }

    /// Release every open port. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        info!("stopping adapter");
        self.batch.clear();

        for port in [self.tactile_port.as_deref_mut(), self.pps_port.as_deref_mut()]
            .into_iter()
            .flatten()
        {
            port.close();
            info!(port = port.name(), "successfully closed");
        }
        self.output_port.close();
        info!(port = self.output_port.name(), "successfully closed");

        self.state = State::Closed;
    }
}

impl Drop for EventAdapter {
    fn drop(&mut self) {
        self.close();
    }
}
