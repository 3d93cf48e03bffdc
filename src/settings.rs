//! User-facing settings persisted as a single JSON blob.
//!
//! The blob is versionless: every field carries a default and unknown keys are
//! ignored, so older or partial blobs still load.

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hms::Hms;

pub const MIN_ROTATION_INTERVAL_SECS: u32 = 10;
pub const DEFAULT_ROTATION_INTERVAL_SECS: u32 = 30;
pub const DEFAULT_BLINK_SECS: u32 = 10;
pub const DEFAULT_DATE_FORMAT: &str = "%A %e %B";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub language: String,
    pub theme: Theme,
    /// Timezone used by the clock and date widgets; local time when unset.
    pub timezone: Option<Tz>,
    pub clock: ClockSettings,
    pub date: DateSettings,
    pub slideshow: SlideshowSettings,
    pub timer: TimerSettings,
    pub weather: WeatherSettings,
    pub calendar_events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClockSettings {
    pub show: bool,
    pub use_24_hour: bool,
    pub show_seconds: bool,
    pub position: WidgetPosition,
    pub size: WidgetSize,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            show: true,
            use_24_hour: true,
            show_seconds: false,
            position: WidgetPosition::BottomRight,
            size: WidgetSize::Large,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DateSettings {
    pub show: bool,
    /// `chrono` format string used when rendering the date.
    pub format: String,
    pub position: WidgetPosition,
    pub size: WidgetSize,
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            show: true,
            format: DEFAULT_DATE_FORMAT.to_string(),
            position: WidgetPosition::BottomRight,
            size: WidgetSize::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideshowOrder {
    #[default]
    Sequential,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    Fade,
    Slide,
    Zoom,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SlideshowSettings {
    /// Seconds an image stays on screen before auto-advancing.
    pub rotation_interval_secs: u32,
    pub order: SlideshowOrder,
    pub show_countdown: bool,
    pub transition: TransitionKind,
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            rotation_interval_secs: DEFAULT_ROTATION_INTERVAL_SECS,
            order: SlideshowOrder::Sequential,
            show_countdown: false,
            transition: TransitionKind::Fade,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerMode {
    #[default]
    Countdown,
    Chronometer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimerSettings {
    pub enabled: bool,
    pub mode: TimerMode,
    /// Initial countdown value.
    pub duration: Hms,
    /// Length of the post-completion blink window.
    pub blink_secs: u32,
    pub position: WidgetPosition,
    pub size: WidgetSize,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: TimerMode::Countdown,
            duration: Hms::new(0, 5, 0),
            blink_secs: DEFAULT_BLINK_SECS,
            position: WidgetPosition::TopRight,
            size: WidgetSize::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WeatherSettings {
    pub enabled: bool,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: TemperatureUnit,
    pub position: WidgetPosition,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            location: "Paris".to_string(),
            latitude: 48.8566,
            longitude: 2.3522,
            units: TemperatureUnit::Celsius,
            position: WidgetPosition::TopLeft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: Theme::Dark,
            timezone: None,
            clock: ClockSettings::default(),
            date: DateSettings::default(),
            slideshow: SlideshowSettings::default(),
            timer: TimerSettings::default(),
            weather: WeatherSettings::default(),
            calendar_events: Vec::new(),
        }
    }
}

impl Settings {
    /// Coerce values the engines cannot use into their nearest valid value.
    pub fn sanitized(mut self) -> Self {
        if self.slideshow.rotation_interval_secs < MIN_ROTATION_INTERVAL_SECS {
            warn!(
                requested = self.slideshow.rotation_interval_secs,
                minimum = MIN_ROTATION_INTERVAL_SECS,
                "rotation interval below minimum; clamping"
            );
            self.slideshow.rotation_interval_secs = MIN_ROTATION_INTERVAL_SECS;
        }
        self.timer.duration = self.timer.duration.normalized();
        if !is_valid_date_format(&self.date.format) {
            warn!(
                format = %self.date.format,
                "invalid date format; restoring default"
            );
            self.date.format = DEFAULT_DATE_FORMAT.to_string();
        }
        if !(-90.0..=90.0).contains(&self.weather.latitude)
            || !(-180.0..=180.0).contains(&self.weather.longitude)
        {
            warn!(
                latitude = self.weather.latitude,
                longitude = self.weather.longitude,
                "weather coordinates out of range; restoring defaults"
            );
            let defaults = WeatherSettings::default();
            self.weather.latitude = defaults.latitude;
            self.weather.longitude = defaults.longitude;
        }
        self.calendar_events.sort_by(|a, b| a.date.cmp(&b.date));
        self
    }

    /// Calendar events falling on `day`.
    pub fn events_on(&self, day: NaiveDate) -> impl Iterator<Item = &CalendarEvent> {
        self.calendar_events.iter().filter(move |ev| ev.date == day)
    }
}

/// Whether chrono can render `format` without a formatting error.
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Partial update applied through [`crate::store::SettingsStore::update`].
///
/// Scalar fields cover the values the control surface edits one at a time;
/// whole sections can be swapped in for everything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub language: Option<String>,
    pub theme: Option<Theme>,
    pub timezone: Option<Tz>,
    pub rotation_interval_secs: Option<u32>,
    pub slideshow_order: Option<SlideshowOrder>,
    pub show_countdown: Option<bool>,
    pub timer_enabled: Option<bool>,
    pub timer_mode: Option<TimerMode>,
    pub timer_duration: Option<Hms>,
    pub blink_secs: Option<u32>,
    pub clock: Option<ClockSettings>,
    pub date: Option<DateSettings>,
    pub weather: Option<WeatherSettings>,
    pub calendar_events: Option<Vec<CalendarEvent>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, settings: &mut Settings) {
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(tz) = self.timezone {
            settings.timezone = Some(tz);
        }
        if let Some(secs) = self.rotation_interval_secs {
            settings.slideshow.rotation_interval_secs = secs;
        }
        if let Some(order) = self.slideshow_order {
            settings.slideshow.order = order;
        }
        if let Some(show) = self.show_countdown {
            settings.slideshow.show_countdown = show;
        }
        if let Some(enabled) = self.timer_enabled {
            settings.timer.enabled = enabled;
        }
        if let Some(mode) = self.timer_mode {
            settings.timer.mode = mode;
        }
        if let Some(duration) = self.timer_duration {
            settings.timer.duration = duration;
        }
        if let Some(blink) = self.blink_secs {
            settings.timer.blink_secs = blink;
        }
        if let Some(clock) = self.clock {
            settings.clock = clock;
        }
        if let Some(date) = self.date {
            settings.date = date;
        }
        if let Some(weather) = self.weather {
            settings.weather = weather;
        }
        if let Some(events) = self.calendar_events {
            settings.calendar_events = events;
        }
    }
}
