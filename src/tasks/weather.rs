use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::settings::{Settings, WeatherSettings};
use crate::weather::{self, WeatherState};

/// Fetch current conditions on start, on every weather-settings change and
/// every `refresh`. No retries between refreshes.
#[instrument(skip_all, fields(endpoint = %endpoint))]
pub async fn run(
    mut settings_rx: watch::Receiver<Settings>,
    client: Client,
    endpoint: String,
    refresh: Duration,
    state_tx: watch::Sender<WeatherState>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut current: WeatherSettings = settings_rx.borrow_and_update().weather.clone();
    let mut settings_open = true;
    // Periodic refreshes keep showing the previous report until the new one lands.
    let mut announce = true;

    'fetch: loop {
        if current.enabled && announce {
            state_tx.send_replace(WeatherState::Loading);
        }
        announce = false;
        let state = tokio::select! {
            _ = cancel.cancelled() => break 'fetch,
            state = weather::fetch_state(&client, &endpoint, &current) => state,
        };
        match &state {
            WeatherState::Ready(report) => info!(
                location = %report.location,
                temperature = report.temperature,
                condition = report.condition.label(),
                "weather updated"
            ),
            WeatherState::Fallback { error, .. } => {
                warn!(%error, "weather fetch failed; showing sample data")
            }
            WeatherState::Disabled | WeatherState::Loading => debug!("weather disabled"),
        }
        state_tx.send_if_modified(|published| {
            if *published == state {
                return false;
            }
            *published = state;
            true
        });

        let next_fetch = Instant::now() + refresh;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'fetch,
                _ = sleep_until(next_fetch) => continue 'fetch,
                changed = settings_rx.changed(), if settings_open => {
                    if changed.is_err() {
                        settings_open = false;
                        continue;
                    }
                    let weather = settings_rx.borrow_and_update().weather.clone();
                    if weather != current {
                        current = weather;
                        announce = true;
                        continue 'fetch;
                    }
                }
            }
        }
    }

    debug!("cancel received; exiting weather task");
    Ok(())
}
