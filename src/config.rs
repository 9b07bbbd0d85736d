use std::sync::OnceLock;

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
// Overlay keys look like `DOTGRID_WINDOW__WIDTH`.
const ENV_PREFIX: &str = "DOTGRID";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub high_dpi: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings { title: "dotgrid".to_string(), width: 1024, height: 640, high_dpi: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings { filter: "info".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub glow: bool,
    pub hud: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings { glow: true, hud: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PulseSettings {
    /// 0 = seed from OS entropy.
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub log: LogSettings,
    pub render: RenderSettings,
    pub pulse: PulseSettings,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__").try_parsing(true)
}

fn build<S>(file: S, env: Environment) -> Result<Settings, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    Config::builder().add_source(file).add_source(env).build()?.try_deserialize()
}

/// Load `config/default.toml` (optional) with the process environment on top.
///
/// Runs before the subscriber is installed, so it does not log; `main`
/// reports the [`LoadOutcome`].
pub fn load_config() -> Result<Settings, ConfigError> {
    build(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false), environment())
}

pub fn parse_toml(source: &str) -> Result<Settings, ConfigError> {
    Config::builder()
        .add_source(File::from_str(source, FileFormat::Toml))
        .build()?
        .try_deserialize()
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    /// The load error that forced a fallback to defaults.
    Defaulted(String),
}

#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub outcome: LoadOutcome,
}

fn resolve(result: Result<Settings, ConfigError>) -> LoadedSettings {
    match result {
        Ok(settings) => LoadedSettings { settings, outcome: LoadOutcome::Loaded },
        Err(e) => LoadedSettings { settings: Settings::default(), outcome: LoadOutcome::Defaulted(e.to_string()) },
    }
}

static SETTINGS: OnceLock<LoadedSettings> = OnceLock::new();

fn loaded() -> &'static LoadedSettings {
    SETTINGS.get_or_init(|| resolve(load_config()))
}

/// Process-wide settings, loaded on first use. Falls back to defaults when the
/// file is malformed.
pub fn settings() -> &'static Settings {
    &loaded().settings
}

/// How the process-wide settings were obtained.
///
/// Settings are needed for the window before logging is up, so the outcome is
/// kept for `main` to report.
pub fn load_outcome() -> &'static LoadOutcome {
    &loaded().outcome
}
