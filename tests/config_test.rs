use std::collections::HashMap;
use std::path::{Path, PathBuf};

use worklist::config::Config;
use worklist::definition::WorkListKind;
use worklist::error::Error;
use worklist::store::StoreFormat;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn defaults_without_overrides() {
    let config = Config::default().with_overrides(vars(&[])).unwrap();
    assert_eq!(config.definition_dir, PathBuf::from("."));
    assert_eq!(config.format, StoreFormat::Xml);
    assert_eq!(config.otel_endpoint, None);
    assert_eq!(config.log_level, "info");
}

#[test]
fn environment_overrides_every_key() {
    let config = Config::default()
        .with_overrides(vars(&[
            ("WORKLIST_DIR", "/srv/worklists"),
            ("WORKLIST_FORMAT", "JSON"),
            ("OTEL_ENDPOINT", "http://localhost:4317"),
            ("LOG_LEVEL", "worklist=debug"),
        ]))
        .unwrap();

    assert_eq!(config.definition_dir, PathBuf::from("/srv/worklists"));
    assert_eq!(config.format, StoreFormat::Json);
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "worklist=debug");
    assert_eq!(
        config.definition_path("roads", WorkListKind::Issue),
        Path::new("/srv/worklists/roads.iwl")
    );
}

#[test]
fn empty_endpoint_disables_export() {
    let config = Config::default()
        .with_overrides(vars(&[("OTEL_ENDPOINT", "")]))
        .unwrap();
    assert_eq!(config.otel_endpoint, None);
    assert_eq!(config.telemetry().endpoint, None);
}

#[test]
fn bad_format_is_a_config_error() {
    let result = Config::default().with_overrides(vars(&[("WORKLIST_FORMAT", "yaml")]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn toml_file_fills_missing_keys_with_defaults() {
    let config = Config::from_toml(
        r#"
        definition_dir = "lists"
        format = "json"
        "#,
    )
    .unwrap();

    assert_eq!(config.definition_dir, PathBuf::from("lists"));
    assert_eq!(config.format, StoreFormat::Json);
    assert_eq!(config.log_level, "info");
}

#[test]
fn toml_rejects_unknown_keys() {
    assert!(Config::from_toml("database_url = \"postgres://\"").is_err());
}

#[test]
fn load_reports_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("missing.toml")));
}
