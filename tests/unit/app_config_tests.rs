/*!
 * Tests for application configuration
 */

use catalogtl::app_config::{Config, LogLevel};
use tempfile::TempDir;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(created.pipeline.marker_field, "translated_to");

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.collections, created.collections);
    assert_eq!(reloaded.pipeline.progress_interval_secs, 5);
}

#[test]
fn test_loadOrCreate_withCustomFile_shouldReadValues() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "en",
            "target_language": "uk",
            "log_level": "debug",
            "pipeline": {"max_workers": 2, "worker_override": 1},
            "collections": [
                {"name": "shows", "text_fields": ["summary"],
                 "nested": {"field": "seasons", "items_field": "episodes", "text_fields": ["name"]}}
            ]
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.target_language, "uk");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.pipeline.max_workers, 2);
    assert_eq!(config.pipeline.worker_override, Some(1));
    assert_eq!(config.pipeline.batch_size_ceiling, 20);
    assert_eq!(config.collections[0].nested.as_ref().unwrap().text_fields, vec!["name"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withBrokenJson_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_validate_withInvalidLanguage_shouldFail() {
    let config = Config {
        target_language: "klingon".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}
