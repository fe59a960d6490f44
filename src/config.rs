use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str =
    "https://novatorem-spotify-git-main-jhoel-villcas-projects.vercel.app/api/spotify";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Explicit font file. When unset the compositor probes system fonts.
    pub font_path: Option<PathBuf>,
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            font_path: None,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(url) = get("NOW_PLAYING_URL") {
            log::info!("Using now-playing endpoint: {}", url);
            config.endpoint = url;
        }
        if let Some(value) = get("NOW_PLAYING_INTERVAL_MS") {
            config.poll_interval = parse_millis("NOW_PLAYING_INTERVAL_MS", &value)?;
        }
        if let Some(value) = get("NOW_PLAYING_TIMEOUT_MS") {
            config.request_timeout = parse_millis("NOW_PLAYING_TIMEOUT_MS", &value)?;
        }
        if let Some(path) = get("NOW_PLAYING_FONT") {
            config.font_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = get("NOW_PLAYING_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidMillis {
            var,
            value: value.to_string(),
        }),
    }
}
