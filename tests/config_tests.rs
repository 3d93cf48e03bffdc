use std::path::PathBuf;
use std::time::Duration;

use photo_frame_engine::config::{Configuration, ImageSourceConfig};

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.settings_path, PathBuf::from("photo-frame-settings.json"));
    assert_eq!(cfg.tick_period, Duration::from_secs(1));
    assert_eq!(cfg.image_refresh_interval, Duration::from_secs(300));
    assert_eq!(
        cfg.image_source,
        ImageSourceConfig::Remote {
            url: "http://localhost:3001".into(),
            api_key: None,
        }
    );
    assert_eq!(cfg.rng_seed, None);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
settings-path: "/var/lib/frame/settings.json"
image-refresh-interval: 90s
tick-period: 500ms
transition-delay: 50ms
request-timeout: 3s
rng-seed: 7
weather:
  endpoint: "http://weather.local/v1/forecast"
  refresh-interval: 15m
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.settings_path, PathBuf::from("/var/lib/frame/settings.json"));
    assert_eq!(cfg.image_refresh_interval, Duration::from_secs(90));
    assert_eq!(cfg.tick_period, Duration::from_millis(500));
    assert_eq!(cfg.transition_delay, Duration::from_millis(50));
    assert_eq!(cfg.request_timeout, Duration::from_secs(3));
    assert_eq!(cfg.rng_seed, Some(7));
    assert_eq!(cfg.weather.endpoint, "http://weather.local/v1/forecast");
    assert_eq!(cfg.weather.refresh_interval, Duration::from_secs(15 * 60));
}

#[test]
fn parse_image_sources() {
    let remote: Configuration = serde_yaml::from_str(
        r#"
image-source:
  type: remote
  url: "http://frame.local:3001"
  api-key: "secret"
"#,
    )
    .unwrap();
    assert_eq!(
        remote.image_source,
        ImageSourceConfig::Remote {
            url: "http://frame.local:3001".into(),
            api_key: Some("secret".into()),
        }
    );

    let dir: Configuration = serde_yaml::from_str(
        r#"
image-source:
  type: directory
  path: "/photos"
"#,
    )
    .unwrap();
    assert_eq!(
        dir.image_source,
        ImageSourceConfig::Directory {
            path: PathBuf::from("/photos")
        }
    );

    let fallback: Configuration =
        serde_yaml::from_str("image-source:\n  type: fallback\n").unwrap();
    assert_eq!(fallback.image_source, ImageSourceConfig::Fallback);
}

#[test]
fn unknown_source_type_is_rejected() {
    let res: Result<Configuration, _> =
        serde_yaml::from_str("image-source:\n  type: ftp\n  url: x\n");
    assert!(res.is_err());
}

#[test]
fn zero_tick_period_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str("tick-period: 0s\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("tick-period"));
}

#[test]
fn transition_delay_must_fit_in_a_tick() {
    let cfg: Configuration =
        serde_yaml::from_str("tick-period: 1s\ntransition-delay: 2s\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("transition-delay"));
}

#[test]
fn non_http_image_url_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str(
        "image-source:\n  type: remote\n  url: \"ftp://frame.local\"\n",
    )
    .unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn from_yaml_file_reports_missing_path() {
    let err = Configuration::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn from_yaml_file_reads_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "image-source:\n  type: fallback\nrng-seed: 3\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap().validated().unwrap();
    assert_eq!(cfg.image_source, ImageSourceConfig::Fallback);
    assert_eq!(cfg.rng_seed, Some(3));
}
