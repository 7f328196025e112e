use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use unfold_common::LogFormatSetting;
use unfold_config::UnfoldConfigLoader;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
browser:
  chromedriver_path: /opt/driver/chromedriver
  chromium_path: /opt/chrome/chrome
  page_load_timeout_secs: 45
scrape:
  max_concurrent_sessions: 4
  final_settle_ms: 1500
youtube:
  api_key: "${UNFOLD_TEST_YT_KEY}"
log:
  format: json
  stderr: false
"#;
    let p = write_yaml(&tmp, "unfold.yaml", file_yaml);

    temp_env::with_var("UNFOLD_TEST_YT_KEY", Some("yt-secret"), || {
        let config = UnfoldConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config");

        assert_eq!(
            config.browser.chromedriver_path,
            PathBuf::from("/opt/driver/chromedriver")
        );
        assert_eq!(config.browser.page_load_timeout_secs, 45);
        assert_eq!(config.scrape.max_concurrent_sessions, 4);
        assert_eq!(config.scrape.final_settle_ms, 1500);
        assert_eq!(config.scrape.scroll_step_px, 300);
        assert_eq!(config.youtube.api_key.as_deref(), Some("yt-secret"));
        assert_eq!(config.log.format, LogFormatSetting::Json);
        assert!(!config.log.stderr);
    });
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "unfold.yaml", "browser:\n  page_load_timeout_secs: 45\n");

    temp_env::with_vars(
        [
            ("UNFOLD_BROWSER__PAGE_LOAD_TIMEOUT_SECS", Some("12")),
            ("UNFOLD_SCRAPE__MAX_CONCURRENT_SESSIONS", Some("3")),
        ],
        || {
            let config = UnfoldConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load with env overrides");
            assert_eq!(config.browser.page_load_timeout_secs, 12);
            assert_eq!(config.scrape.max_concurrent_sessions, 3);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = UnfoldConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("optional file may be absent");
    assert!(config.browser.headless);
    assert_eq!(config.browser.viewport.width, 1920);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = UnfoldConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
