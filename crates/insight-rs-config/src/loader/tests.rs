//! Tests for layered configuration loading.

use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that ignore any system or user config present on the host.
fn isolated_options(cwd: &Path) -> LayerSearch {
    let mut options = LayerSearch::new(cwd);
    options.system_file = None;
    options.user_file = None;
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = InsightConfig::load_from_str("{}").expect("config");
    assert_eq!(config.workflow.buffer_capacity, 50);
    assert_eq!(config.workflow.stream_interval_ms, 1500);
    assert_eq!(config.anchor.confirmations, 12);
    assert_eq!(config.server.bind, "127.0.0.1:8080");
}

#[test]
fn parses_json5_comments_and_partial_blocks() {
    let json5 = r#"{
        // faster demo
        latency: { capsule_ms: 10, verify_ms: 20 },
        workflow: { buffer_capacity: 5, },
    }"#;
    let config = InsightConfig::load_from_str(json5).expect("config");
    assert_eq!(config.latency.capsule_ms, 10);
    assert_eq!(config.latency.verify_ms, 20);
    assert_eq!(config.latency.anchor_preparing_ms, 800);
    assert_eq!(config.workflow.buffer_capacity, 5);
    assert_eq!(config.workflow.batch_size, 25);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = InsightConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("unknown key"));
    assert!(msg.contains("config:unexpected"));
}

#[test]
fn rejects_wrong_field_type_with_path() {
    let err = InsightConfig::load_from_str(r#"{ server: { cors: "yes" } }"#).unwrap_err();
    match err {
        ConfigError::InvalidField { path, message } => {
            assert_eq!(path, "config:server.cors");
            assert_eq!(message, "expected bool");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_negative_latency() {
    let err = InsightConfig::load_from_str(r#"{ latency: { api_ms: -1 } }"#).unwrap_err();
    assert!(format!("{err}").contains("latency.api_ms"));
}

#[test]
fn rejects_zero_buffer_capacity() {
    let err = InsightConfig::load_from_str(r#"{ workflow: { buffer_capacity: 0 } }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

/// Ensure the cwd layer takes precedence over the project root layer.
#[test]
fn layered_config_prefers_cwd_over_project() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        "{ mail: { product_name: \"system\" }, server: { bind: \"0.0.0.0:1\" } }",
    );
    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ mail: { product_name: \"user\" } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ mail: { product_name: \"project\" } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ mail: { product_name: \"cwd\" } }",
    );

    let mut options = LayerSearch::new(&cwd);
    options.system_file = Some(system_config);
    options.user_file = Some(user_config);

    let layered = InsightConfig::load_layered_from(options).expect("layered");
    assert_eq!(layered.config.mail.product_name, "cwd");
    // untouched keys from lower layers survive the merge
    assert_eq!(layered.config.server.bind, "0.0.0.0:1");
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.kind).collect();
    assert_eq!(
        sources,
        vec![
            LayerKind::System,
            LayerKind::User,
            LayerKind::Project,
            LayerKind::Cwd,
        ]
    );
}

#[test]
fn project_and_cwd_layers_dedupe_at_root() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ anchor: { confirmations: 3 } }",
    );

    let layered = InsightConfig::load_layered_from(isolated_options(&project_root))
        .expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].kind, LayerKind::Project);
    assert_eq!(layered.config.anchor.confirmations, 3);
}

#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ workflow: { stream_interval_ms: 900 } }",
    );

    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, "{ workflow: { stream_interval_ms: 10 } }");

    let options = isolated_options(&cwd).with_override(&runtime_config);
    let layered = InsightConfig::load_layered_from(options).expect("layered");
    assert_eq!(layered.config.workflow.stream_interval_ms, 10);
    assert_eq!(
        layered.layers.last().map(|layer| layer.kind),
        Some(LayerKind::Runtime)
    );
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options =
        isolated_options(temp.path()).with_override(temp.path().join("missing.json5"));
    let err = InsightConfig::load_layered_from(options).unwrap_err();
    match err {
        ConfigError::ReadFailed { path, .. } => assert!(path.ends_with("missing.json5")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_layer_reports_layer_label() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path().join("work");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ anchor: { network: 7 } }");

    let err = InsightConfig::load_layered_from(isolated_options(&cwd)).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("anchor.network"));
}

#[test]
fn parse_error_names_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path().join("work");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ workflow: ");

    let err = InsightConfig::load_layered_from(isolated_options(&cwd)).unwrap_err();
    match err {
        ConfigError::ParseFailed { layer, .. } => assert!(layer.starts_with("cwd(")),
        other => panic!("unexpected error: {other}"),
    }
}
