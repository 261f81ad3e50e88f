//! Configuration loading and validation.
//!
//! Options come from three layers, highest precedence first:
//! - command line ([`Overrides`])
//! - the resource file named by `from`, looked up under `context`
//! - built-in defaults
//!
//! The resource file uses `key = value` lines (TOML). Every key is optional,
//! so an empty or missing file is valid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Default resource lookup context.
pub const DEFAULT_CONTEXT: &str = "periPersonalSpace";
/// Default resource file name.
pub const DEFAULT_FROM: &str = "ppsAggregEventsForiCubGui.ini";
/// Default module instance name.
pub const DEFAULT_NAME: &str = "ppsAggregEventsForiCubGui";
/// Default activation-to-force gain.
pub const DEFAULT_GAIN: f64 = 50.0;

/// An `on` / `off` option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    /// Enabled.
    On,
    /// Disabled.
    Off,
}

impl Switch {
    /// Whether the switch is on.
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

/// Immutable options for one adapter instance, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Resource lookup context.
    pub context: String,
    /// Resource file name.
    pub from: String,
    /// Instance name; prefixes every port name.
    pub name: String,
    /// Verbosity level, higher is chattier.
    pub verbosity: i32,
    /// Wire the well-known producers and visualizer on startup.
    pub autoconnect: bool,
    /// Forward tactile events.
    pub tactile: bool,
    /// Forward peripersonal-space events.
    pub pps: bool,
    /// Multiplier turning normalized activation into pressure and force.
    pub gain: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_owned(),
            from: DEFAULT_FROM.to_owned(),
            name: DEFAULT_NAME.to_owned(),
            verbosity: 0,
            autoconnect: false,
            tactile: true,
            pps: true,
            gain: DEFAULT_GAIN,
        }
    }
}

impl AdapterConfig {
    /// Tactile events input port name.
    pub fn skin_events_port(&self) -> String {
        format!("/{}/skin_events_aggreg:i", self.name)
    }

    /// Peripersonal-space events input port name.
    pub fn pps_events_port(&self) -> String {
        format!("/{}/pps_events_aggreg:i", self.name)
    }

    /// Contact list output port name.
    pub fn contacts_port(&self) -> String {
        format!("/{}/contacts:o", self.name)
    }
}

/// UDP substrate settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkConfig {
    /// Host own ports bind on when they have no table entry.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port name to `host:port` table.
    #[serde(default)]
    pub ports: HashMap<String, String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ports: HashMap::new(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rotated JSON log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Contents of the resource file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Instance name.
    #[serde(default)]
    pub name: Option<String>,
    /// Verbosity level.
    #[serde(default)]
    pub verbosity: Option<i32>,
    /// Auto-wiring switch.
    #[serde(default)]
    pub autoconnect: Option<Switch>,
    /// Tactile switch.
    #[serde(default)]
    pub tactile: Option<Switch>,
    /// Peripersonal-space switch.
    #[serde(default)]
    pub pps: Option<Switch>,
    /// Activation gain.
    #[serde(default)]
    pub gain: Option<f64>,
    /// UDP substrate settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command-line values. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Resource lookup context.
    pub context: Option<String>,
    /// Resource file name.
    pub from: Option<String>,
    /// Instance name.
    pub name: Option<String>,
    /// Verbosity level.
    pub verbosity: Option<i32>,
    /// Auto-wiring switch.
    pub autoconnect: Option<Switch>,
    /// Tactile switch.
    pub tactile: Option<Switch>,
    /// Peripersonal-space switch.
    pub pps: Option<Switch>,
    /// Activation gain.
    pub gain: Option<f64>,
    /// Log directory.
    pub log_dir: Option<PathBuf>,
}

/// Everything resolved at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Adapter options.
    pub adapter: AdapterConfig,
    /// UDP substrate settings.
    pub network: NetworkConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
    /// Resource file that was read, if any.
    pub source: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

/// Resolve settings from the command line and the resource file.
///
/// # Errors
///
/// Returns an error if a resource file is found but cannot be read or parsed.
pub fn load(overrides: &Overrides) -> anyhow::Result<Settings> {
    let context = overrides
        .context
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTEXT.to_owned());
    let from = overrides
        .from
        .clone()
        .unwrap_or_else(|| DEFAULT_FROM.to_owned());

    let source = find_resource(&context, &from, user_config_dir().as_deref());
    let file = match &source {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };

    Ok(merge(context, from, file, overrides, source))
}

/// Parse a resource file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Locate `from` for `context`.
///
/// Tries `from` as given, then `./<context>/<from>` relative to the working
/// directory, then `<config_root>/<context>/<from>`. Returns the first
/// existing file.
pub fn find_resource(context: &str, from: &str, config_root: Option<&Path>) -> Option<PathBuf> {
    let direct = PathBuf::from(from);
    let mut candidates = vec![direct, Path::new(context).join(from)];
    if let Some(root) = config_root {
        candidates.push(root.join(context).join(from));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Apply command line over file over defaults.
pub fn merge(
    context: String,
    from: String,
    file: FileConfig,
    overrides: &Overrides,
    source: Option<PathBuf>,
) -> Settings {
    let defaults = AdapterConfig::default();
    let switch = |cli: Option<Switch>, in_file: Option<Switch>, default: bool| {
        cli.or(in_file).map_or(default, Switch::is_on)
    };

    let adapter = AdapterConfig {
        context,
        from,
        name: overrides.name.clone().or(file.name).unwrap_or(defaults.name),
        verbosity: overrides
            .verbosity
            .or(file.verbosity)
            .unwrap_or(defaults.verbosity),
        autoconnect: switch(overrides.autoconnect, file.autoconnect, defaults.autoconnect),
        tactile: switch(overrides.tactile, file.tactile, defaults.tactile),
        pps: switch(overrides.pps, file.pps, defaults.pps),
        gain: overrides.gain.or(file.gain).unwrap_or(defaults.gain),
    };

    let logging = LoggingConfig {
        dir: overrides.log_dir.clone().or(file.logging.dir),
    };

    Settings {
        adapter,
        network: file.network,
        logging,
        source,
    }
}

/// Per-user configuration root (e.g. `~/.config` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}
