use std::fmt::{self, Write as _};

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

use crate::hms::Hms;
use crate::settings::{DEFAULT_DATE_FORMAT, Settings};
use crate::slideshow::SlideshowSnapshot;
use crate::timer::{TimerPhase, TimerSnapshot};
use crate::weather::{WeatherReport, WeatherState};

/// Text rendition of everything a frame would draw over the current photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayFrame {
    pub clock: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub countdown: Option<String>,
    pub timer: Option<String>,
    pub weather: Option<String>,
    pub events: Vec<String>,
}

pub struct OverlayInputs<'a> {
    pub settings: &'a Settings,
    pub timer: &'a TimerSnapshot,
    pub slideshow: &'a SlideshowSnapshot,
    pub weather: &'a WeatherState,
    pub now: DateTime<Utc>,
}

pub fn render(inputs: &OverlayInputs<'_>) -> OverlayFrame {
    let settings = inputs.settings;
    let (clock, date, day) = match settings.timezone {
        Some(tz) => {
            let local = inputs.now.with_timezone(&tz);
            (
                format_clock(local.hour(), local.minute(), local.second(), settings),
                format_date(&local, &settings.date.format),
                local.date_naive(),
            )
        }
        None => {
            let local = inputs.now.with_timezone(&Local);
            (
                format_clock(local.hour(), local.minute(), local.second(), settings),
                format_date(&local, &settings.date.format),
                local.date_naive(),
            )
        }
    };

    let image = inputs.slideshow.current.as_ref().map(|img| {
        format!(
            "{} ({}/{})",
            img.display_name,
            inputs.slideshow.current_index + 1,
            inputs.slideshow.image_count
        )
    });
    let countdown = (settings.slideshow.show_countdown && inputs.slideshow.image_count > 1)
        .then(|| format!("next in {}s", inputs.slideshow.countdown_remaining));

    let events = settings
        .events_on(day)
        .map(|ev| format!("{} {}", ev.date.day(), ev.title))
        .collect();

    OverlayFrame {
        clock: settings.clock.show.then_some(clock),
        date: settings.date.show.then_some(date.trim().to_string()),
        image,
        countdown,
        timer: render_timer(settings.timer.enabled, inputs.timer),
        weather: render_weather(inputs.weather),
        events,
    }
}

/// Falls back to the default format when `format` cannot be rendered.
fn format_date<Z>(local: &DateTime<Z>, format: &str) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_ok() {
        return out;
    }
    local.format(DEFAULT_DATE_FORMAT).to_string()
}

fn format_clock(hour: u32, minute: u32, second: u32, settings: &Settings) -> String {
    let (hour, suffix) = if settings.clock.use_24_hour {
        (hour, "")
    } else {
        let h12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        (h12, if hour < 12 { " AM" } else { " PM" })
    };
    if settings.clock.show_seconds {
        format!("{hour:02}:{minute:02}:{second:02}{suffix}")
    } else {
        format!("{hour:02}:{minute:02}{suffix}")
    }
}

fn render_timer(enabled: bool, timer: &TimerSnapshot) -> Option<String> {
    if !enabled || !timer.visible {
        return None;
    }
    let marker = match timer.phase {
        TimerPhase::Idle => "",
        TimerPhase::Running => " ▶",
        TimerPhase::Paused => " ⏸",
        TimerPhase::Complete => " ✱",
    };
    Some(format!("{}{}", timer.remaining, marker))
}

fn describe(report: &WeatherReport) -> String {
    format!(
        "{} {:.0}{} {}",
        report.location,
        report.temperature,
        report.units.symbol(),
        report.condition.label()
    )
}

fn render_weather(state: &WeatherState) -> Option<String> {
    match state {
        WeatherState::Disabled => None,
        WeatherState::Loading => Some("weather loading…".to_string()),
        WeatherState::Ready(report) => Some(describe(report)),
        WeatherState::Fallback { report, error } => {
            Some(format!("{} [{}]", describe(report), error))
        }
    }
}

impl fmt::Display for OverlayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        for part in [
            &self.clock,
            &self.date,
            &self.image,
            &self.countdown,
            &self.timer,
            &self.weather,
        ]
        .into_iter()
        .flatten()
        {
            parts.push(part);
        }
        for ev in &self.events {
            parts.push(ev);
        }
        f.write_str(&parts.join(" | "))
    }
}

/// Shorthand used by log lines.
pub fn timer_label(remaining: Hms, phase: TimerPhase) -> String {
    format!("{remaining} ({phase:?})")
}
