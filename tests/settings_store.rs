use chrono::{TimeZone, Utc};
use photo_frame_engine::hms::Hms;
use photo_frame_engine::overlay::{self, OverlayFrame, OverlayInputs};
use photo_frame_engine::settings::{
    DEFAULT_DATE_FORMAT, MIN_ROTATION_INTERVAL_SECS, Settings, SettingsPatch, SlideshowOrder,
    TimerMode, WeatherSettings,
};
use photo_frame_engine::slideshow::SlideshowSnapshot;
use photo_frame_engine::store::{
    JsonFileStore, MemoryStore, SettingsPersistence, SettingsStore, StoreError,
};
use photo_frame_engine::timer::TimerMachine;
use photo_frame_engine::weather::WeatherState;
use tempfile::tempdir;

#[test]
fn missing_file_means_defaults() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::open(JsonFileStore::new(dir.path().join("settings.json")));
    assert_eq!(store.current(), Settings::default());
}

#[test]
fn update_persists_and_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let store = SettingsStore::open(JsonFileStore::new(&path));
    store
        .update(SettingsPatch {
            rotation_interval_secs: Some(45),
            slideshow_order: Some(SlideshowOrder::Random),
            timer_enabled: Some(true),
            timer_mode: Some(TimerMode::Chronometer),
            ..Default::default()
        })
        .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = SettingsStore::open(JsonFileStore::new(&path));
    let settings = reopened.current();
    assert_eq!(settings.slideshow.rotation_interval_secs, 45);
    assert_eq!(settings.slideshow.order, SlideshowOrder::Random);
    assert!(settings.timer.enabled);
    assert_eq!(settings.timer.mode, TimerMode::Chronometer);
}

#[test]
fn malformed_file_falls_back_without_failing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{\"slideshow\": [").unwrap();

    let store = SettingsStore::open(JsonFileStore::new(&path));
    assert_eq!(store.current(), Settings::default());

    let err = JsonFileStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));
}

#[test]
fn partial_blob_fills_in_defaults() {
    let store = SettingsStore::open(MemoryStore::with_blob(
        r#"{"timer": {"enabled": true, "duration": {"minutes": 2}}}"#,
    ));
    let settings = store.current();
    assert!(settings.timer.enabled);
    assert_eq!(settings.timer.duration, Hms::new(0, 2, 0));
    assert_eq!(settings.slideshow, Default::default());
}

#[test]
fn short_rotation_interval_is_clamped() {
    let store = SettingsStore::open(MemoryStore::new());
    let settings = store
        .update(SettingsPatch {
            rotation_interval_secs: Some(3),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        settings.slideshow.rotation_interval_secs,
        MIN_ROTATION_INTERVAL_SECS
    );
    assert_eq!(store.rotation_interval_secs(), MIN_ROTATION_INTERVAL_SECS);
}

#[test]
fn subscribers_see_updates() {
    let store = SettingsStore::open(MemoryStore::new());
    let mut rx = store.subscribe();
    assert!(!rx.has_changed().unwrap());

    store
        .update(SettingsPatch {
            show_countdown: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().slideshow.show_countdown);

    // Same value again: no notification.
    store
        .update(SettingsPatch {
            show_countdown: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn reload_picks_up_external_edit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = SettingsStore::open(JsonFileStore::new(&path));
    assert!(!store.reload().unwrap());

    let mut edited = store.current();
    edited.slideshow.rotation_interval_secs = 90;
    JsonFileStore::new(&path).save(&edited).unwrap();

    assert!(store.reload().unwrap());
    assert_eq!(store.rotation_interval_secs(), 90);
}

#[test]
fn reload_of_garbage_keeps_current_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = SettingsStore::open(JsonFileStore::new(&path));
    store
        .update(SettingsPatch {
            rotation_interval_secs: Some(60),
            ..Default::default()
        })
        .unwrap();

    std::fs::write(&path, "garbage").unwrap();
    assert!(store.reload().is_err());
    assert_eq!(store.rotation_interval_secs(), 60);
}

#[test]
fn failed_save_keeps_in_memory_update() {
    let dir = tempdir().unwrap();
    // Parent is a regular file, so the write cannot succeed.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store = SettingsStore::open(JsonFileStore::new(blocker.join("settings.json")));

    let result = store.update(SettingsPatch {
        rotation_interval_secs: Some(20),
        ..Default::default()
    });
    assert!(matches!(result, Err(StoreError::Io { .. })));
    assert_eq!(store.rotation_interval_secs(), 20);
}

fn render_now(settings: &Settings) -> OverlayFrame {
    overlay::render(&OverlayInputs {
        settings,
        timer: &TimerMachine::new(&settings.timer).snapshot(),
        slideshow: &SlideshowSnapshot::default(),
        weather: &WeatherState::Disabled,
        now: Utc.with_ymd_and_hms(2024, 3, 16, 8, 0, 0).unwrap(),
    })
}

#[test]
fn unrenderable_date_format_in_blob_is_replaced() {
    let store = SettingsStore::open(MemoryStore::with_blob(
        r#"{"timezone": "UTC", "date": {"format": "%Q %Y"}}"#,
    ));
    let settings = store.current();
    assert_eq!(settings.date.format, DEFAULT_DATE_FORMAT);
    assert_eq!(render_now(&settings).date.as_deref(), Some("Saturday 16 March"));
}

#[test]
fn reload_sanitizes_values_before_subscribers_see_them() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let store = SettingsStore::open(JsonFileStore::new(&path));
    let mut rx = store.subscribe();

    std::fs::write(
        &path,
        r#"{
            "timezone": "UTC",
            "date": {"format": "%Y %Q"},
            "weather": {"location": "Nowhere", "latitude": 123.0, "longitude": -400.0},
            "slideshow": {"rotation-interval-secs": 45}
        }"#,
    )
    .unwrap();
    assert!(store.reload().unwrap());

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    let defaults = WeatherSettings::default();
    assert_eq!(seen.slideshow.rotation_interval_secs, 45);
    assert_eq!(seen.weather.location, "Nowhere");
    assert_eq!(seen.weather.latitude, defaults.latitude);
    assert_eq!(seen.weather.longitude, defaults.longitude);
    assert_eq!(seen.date.format, DEFAULT_DATE_FORMAT);
    assert!(render_now(&seen).date.is_some());
}
