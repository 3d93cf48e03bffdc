use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Runtime wiring for the `photo-frame` binary.
///
/// This is operator configuration (YAML, read once at startup). User-facing
/// preferences live in [`crate::settings::Settings`] instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// JSON file holding the persisted settings blob.
    pub settings_path: PathBuf,
    /// Where the image list comes from.
    pub image_source: ImageSourceConfig,
    /// How often the image list is fetched again.
    #[serde(with = "humantime_serde")]
    pub image_refresh_interval: Duration,
    /// Period of the engine tick. One second outside of tests.
    #[serde(with = "humantime_serde")]
    pub tick_period: Duration,
    /// Delay between requesting an advance and showing the new image.
    #[serde(with = "humantime_serde")]
    pub transition_delay: Duration,
    /// Timeout applied to every outbound HTTP request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub weather: WeatherConfig,
    /// Optional deterministic seed for random slideshow order.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImageSourceConfig {
    /// Listing endpoint of the companion upload service.
    Remote {
        url: String,
        #[serde(default, rename = "api-key")]
        api_key: Option<String>,
    },
    /// Local directory scanned recursively.
    Directory { path: PathBuf },
    /// Built-in sample images only.
    Fallback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WeatherConfig {
    pub endpoint: String,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            settings_path: Self::default_settings_path(),
            image_source: ImageSourceConfig::default(),
            image_refresh_interval: Duration::from_secs(5 * 60),
            tick_period: Duration::from_secs(1),
            transition_delay: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
            weather: WeatherConfig::default(),
            rng_seed: None,
        }
    }
}

impl Default for ImageSourceConfig {
    fn default() -> Self {
        Self::Remote {
            url: "http://localhost:3001".to_string(),
            api_key: None,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            refresh_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl Configuration {
    fn default_settings_path() -> PathBuf {
        PathBuf::from("photo-frame-settings.json")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.tick_period.is_zero(), "tick-period must be greater than zero");
        ensure!(
            self.transition_delay < self.tick_period,
            "transition-delay must be shorter than tick-period"
        );
        ensure!(
            !self.image_refresh_interval.is_zero(),
            "image-refresh-interval must be greater than zero"
        );
        ensure!(
            !self.weather.refresh_interval.is_zero(),
            "weather.refresh-interval must be greater than zero"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be greater than zero"
        );
        ensure!(
            !self.settings_path.as_os_str().is_empty(),
            "settings-path must not be empty"
        );
        match &self.image_source {
            ImageSourceConfig::Remote { url, .. } => ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "image-source.url must be an http(s) URL"
            ),
            ImageSourceConfig::Directory { path } => ensure!(
                !path.as_os_str().is_empty(),
                "image-source.path must not be empty"
            ),
            ImageSourceConfig::Fallback => {}
        }
        ensure!(
            self.weather.endpoint.starts_with("http://")
                || self.weather.endpoint.starts_with("https://"),
            "weather.endpoint must be an http(s) URL"
        );
        Ok(self)
    }
}
