use std::fs;

use tagsheet_settings::{AppConfig, ConfigStore};
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let store = ConfigStore::load(temp.path().join("tagsheet.json")).expect("load defaults");

    let config = store.config();
    assert_eq!(config.version, 1);
    assert_eq!(config.layout.page_width, 101.0);
    assert_eq!(config.active_group_id, None);
    assert_eq!(config.raster.scale, 2.0);
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("tagsheet.json");

    let mut store = ConfigStore::new(path.clone(), AppConfig::default());
    store
        .update(|config| {
            config.layout.label_width = 62.0;
            config.active_group_id = Some(3);
            config.broker.url = "ws://printhost:8182".into();
            config.raster.jpeg_quality = 92;
        })
        .expect("save");

    let reloaded = ConfigStore::load(&path).expect("reload");
    let config = reloaded.config();
    assert_eq!(config.layout.label_width, 62.0);
    assert_eq!(config.active_group_id, Some(3));
    assert_eq!(config.broker.url, "ws://printhost:8182");
    assert_eq!(config.raster.jpeg_quality, 92);

    let raw = fs::read_to_string(&path).expect("read");
    assert!(raw.contains("\"activeGroupId\": 3"));
    assert!(raw.contains("\"labelWidth\": 62.0"));
}

#[test]
fn legacy_version_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("tagsheet.json");
    fs::write(
        &path,
        r#"{
            "version": 0,
            "layout": { "pageWidth": -5, "gapX": 2 },
            "raster": { "scale": 40, "jpegQuality": 0 }
        }"#,
    )
    .expect("write legacy config");

    let store = ConfigStore::load(&path).expect("load legacy file");
    let config = store.config();
    assert_eq!(config.version, 1);
    assert_eq!(config.layout.page_width, 101.0);
    assert_eq!(config.layout.gap_x, 2.0);
    assert_eq!(config.raster.scale, 8.0);
    assert_eq!(config.raster.jpeg_quality, 80);
}

#[test]
fn parse_errors_are_reported() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("tagsheet.json");
    fs::write(&path, "{ \"layout\": ").expect("write");
    let err = ConfigStore::load(&path).expect_err("parse failure");
    assert!(err.to_string().contains("tagsheet.json"));
}
