use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.observer.provider, Provider::Gemini);
    assert_eq!(config.observer.debounce_ms, 3000);
    assert_eq!(config.observer.poll_interval_ms, 1000);
    assert_eq!(config.observer.max_wait_ms, 60_000);
    assert_eq!(config.observer.min_response_chars, 2);
    assert!(!config.observer.allow_global_scan);
    assert!(!config.observer.highlight_nodes);
}

#[test]
fn test_probe_default() {
    let probe = ProbeSection::default();
    assert_eq!(probe.attachment_min_size, 50);
    assert_eq!(probe.artifact_min_size, 100);
    assert_eq!(probe.sibling_scan_limit, 10);
    assert_eq!(probe.ancestor_scan_depth, 15);
    assert_eq!(probe.filename_ancestor_depth, 5);
}

#[test]
fn test_storage_default() {
    let storage = StorageSection::default();
    assert_eq!(storage.mode, StorageMode::Local);
    assert_eq!(storage.root_folder_name, "Artifact Sync");
    assert!(storage.folder.is_none());
    assert_eq!(storage.state_path, "~/.artifact-sync/state.db");
}

#[test]
fn test_logging_default() {
    let logging = LoggingSection::default();
    assert_eq!(logging.level, "info");
    assert_eq!(logging.dir, "~/.artifact-sync/logs");
}

#[test]
fn test_provider_display() {
    assert_eq!(Provider::Gemini.to_string(), "gemini");
    assert_eq!(Provider::ChatGpt.to_string(), "chatgpt");
}

#[test]
fn test_storage_mode_display() {
    assert_eq!(StorageMode::Local.to_string(), "local");
    assert_eq!(StorageMode::Folder.to_string(), "folder");
    assert_eq!(StorageMode::Drive.to_string(), "drive");
}

#[test]
fn test_config_roundtrip_through_toml() {
    let mut config = Config::default();
    config.observer.provider = Provider::ChatGpt;
    config.storage.mode = StorageMode::Drive;
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("provider = \"chatgpt\""));
    assert!(text.contains("mode = \"drive\""));
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_section_keeps_defaults() {
    let config: Config = toml::from_str("[observer]\nmax_wait_ms = 5000\n").unwrap();
    assert_eq!(config.observer.max_wait_ms, 5000);
    assert_eq!(config.observer.debounce_ms, 3000);
    assert_eq!(config.probe, ProbeSection::default());
}
