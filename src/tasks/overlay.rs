use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::overlay::{self, OverlayFrame, OverlayInputs};
use crate::settings::Settings;
use crate::slideshow::SlideshowSnapshot;
use crate::timer::TimerSnapshot;
use crate::weather::WeatherState;

/// Pure observer: re-renders whenever any published state changes and logs
/// the frame when it differs from the previous one.
pub async fn run(
    mut settings_rx: watch::Receiver<Settings>,
    mut timer_rx: watch::Receiver<TimerSnapshot>,
    mut slideshow_rx: watch::Receiver<SlideshowSnapshot>,
    mut weather_rx: watch::Receiver<WeatherState>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut last: Option<OverlayFrame> = None;
    let (mut s_open, mut t_open, mut sl_open, mut w_open) = (true, true, true, true);

    loop {
        let frame = {
            let settings = settings_rx.borrow_and_update();
            let timer = timer_rx.borrow_and_update();
            let slideshow = slideshow_rx.borrow_and_update();
            let weather = weather_rx.borrow_and_update();
            overlay::render(&OverlayInputs {
                settings: &settings,
                timer: &timer,
                slideshow: &slideshow,
                weather: &weather,
                now: Utc::now(),
            })
        };
        if last.as_ref() != Some(&frame) {
            info!(target: "overlay", "{frame}");
            last = Some(frame);
        }

        if !(s_open || t_open || sl_open || w_open) {
            debug!("all publishers closed; overlay idle");
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            r = settings_rx.changed(), if s_open => s_open = r.is_ok(),
            r = timer_rx.changed(), if t_open => t_open = r.is_ok(),
            r = slideshow_rx.changed(), if sl_open => sl_open = r.is_ok(),
            r = weather_rx.changed(), if w_open => w_open = r.is_ok(),
        }
    }
    Ok(())
}
