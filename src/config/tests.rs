use std::io::Write;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = defaults().expect("valid defaults");
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.render.poll_interval, Duration::from_millis(2_000));
    assert_eq!(settings.watch.debounce, Duration::from_millis(500));
    assert_eq!(settings.watch.settle, Duration::from_millis(100));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("error".to_string());

    let overrides = SettingsOverrides {
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn verbose_only_applies_without_explicit_level() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&SettingsOverrides {
        verbose: true,
        ..Default::default()
    });
    assert_eq!(
        Settings::from_raw(raw).expect("valid").logging.level,
        LevelFilter::INFO
    );

    let mut raw = RawSettings::default();
    raw.logging.level = Some("trace".into());
    raw.apply_overrides(&SettingsOverrides {
        verbose: true,
        ..Default::default()
    });
    assert_eq!(
        Settings::from_raw(raw).expect("valid").logging.level,
        LevelFilter::TRACE
    );
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.poll_interval_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero interval");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.poll_interval_ms",
            ..
        }
    ));
}

#[test]
fn bad_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".into());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn config_file_values_are_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    writeln!(
        file,
        "[render]\npoll_interval_ms = 250\n\n[watch]\ndebounce_ms = 50\n\n[app]\nweb_url = \"http://localhost:3000\""
    )
    .expect("write config");

    let settings = load(&SettingsOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load");

    assert_eq!(settings.render.poll_interval, Duration::from_millis(250));
    assert_eq!(settings.watch.debounce, Duration::from_millis(50));
    assert_eq!(settings.app.web_url.as_str(), "http://localhost:3000/");
}

#[test]
fn missing_explicit_config_file_fails() {
    let result = load(&SettingsOverrides {
        config_file: Some(PathBuf::from("/definitely/not/here/designctl.toml")),
        ..Default::default()
    });
    assert!(matches!(result, Err(LoadError::Build(_))));
}
