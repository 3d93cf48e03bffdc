//! Current-conditions model and the HTTP call that fills it.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::settings::{TemperatureUnit, WeatherSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: f64,
    pub units: TemperatureUnit,
    pub wind_speed: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherState {
    Disabled,
    Loading,
    Ready(WeatherReport),
    /// Sample data stands in for the real report; `error` is shown inline.
    Fallback { report: WeatherReport, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Clear,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Showers,
    Thunderstorm,
    Unknown,
}

impl Condition {
    /// Map a WMO weather interpretation code.
    pub fn from_wmo(code: u16) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::PartlyCloudy,
            45 | 48 => Self::Fog,
            51..=57 => Self::Drizzle,
            61..=67 => Self::Rain,
            71..=77 | 85 | 86 => Self::Snow,
            80..=82 => Self::Showers,
            95..=99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "partly cloudy",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Showers => "showers",
            Self::Thunderstorm => "thunderstorm",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: u16,
}

/// Sample conditions shown when the weather service cannot be reached.
pub fn sample_report(settings: &WeatherSettings) -> WeatherReport {
    let temperature = match settings.units {
        TemperatureUnit::Celsius => 21.0,
        TemperatureUnit::Fahrenheit => 70.0,
    };
    WeatherReport {
        location: settings.location.clone(),
        temperature,
        units: settings.units,
        wind_speed: 8.0,
        condition: Condition::PartlyCloudy,
    }
}

pub fn parse_report(body: &str, settings: &WeatherSettings) -> Result<WeatherReport> {
    let parsed: ForecastResponse =
        serde_json::from_str(body).context("unexpected weather response shape")?;
    Ok(WeatherReport {
        location: settings.location.clone(),
        temperature: parsed.current_weather.temperature,
        units: settings.units,
        wind_speed: parsed.current_weather.windspeed,
        condition: Condition::from_wmo(parsed.current_weather.weathercode),
    })
}

pub async fn fetch_report(
    client: &Client,
    endpoint: &str,
    settings: &WeatherSettings,
) -> Result<WeatherReport> {
    let body = client
        .get(endpoint)
        .query(&[
            ("latitude", settings.latitude.to_string()),
            ("longitude", settings.longitude.to_string()),
            ("current_weather", "true".to_string()),
            ("temperature_unit", settings.units.as_query().to_string()),
        ])
        .send()
        .await
        .context("weather request failed")?
        .error_for_status()
        .context("weather service returned an error status")?
        .text()
        .await
        .context("failed to read weather response")?;
    parse_report(&body, settings)
}

/// Never fails: errors degrade to [`WeatherState::Fallback`].
pub async fn fetch_state(
    client: &Client,
    endpoint: &str,
    settings: &WeatherSettings,
) -> WeatherState {
    if !settings.enabled {
        return WeatherState::Disabled;
    }
    match fetch_report(client, endpoint, settings).await {
        Ok(report) => WeatherState::Ready(report),
        Err(err) => WeatherState::Fallback {
            report: sample_report(settings),
            error: format!("Weather unavailable: {err:#}"),
        },
    }
}
