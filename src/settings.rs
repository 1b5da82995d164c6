//! Maps the TOML configuration onto runtime settings.

use std::time::Duration;

use artifact_sync_config::{Config, ConfigLoader, Provider, StorageSection};
use artifact_sync_observer::{ObserverConfig, Probe, ProbeConfig, ProviderProfile};

pub(crate) fn observer_config(config: &Config) -> ObserverConfig {
    let observer = &config.observer;
    ObserverConfig {
        debounce: Duration::from_millis(observer.debounce_ms),
        poll_interval: Duration::from_millis(observer.poll_interval_ms),
        max_wait: Duration::from_millis(observer.max_wait_ms),
        highlight_nodes: observer.highlight_nodes,
    }
}

pub(crate) fn probe_config(config: &Config) -> ProbeConfig {
    ProbeConfig {
        min_response_chars: config.observer.min_response_chars,
        attachment_min_size: config.probe.attachment_min_size,
        artifact_min_size: config.probe.artifact_min_size,
        sibling_scan_limit: config.probe.sibling_scan_limit,
        ancestor_scan_depth: config.probe.ancestor_scan_depth,
        filename_ancestor_depth: config.probe.filename_ancestor_depth,
        allow_global_scan: config.observer.allow_global_scan,
    }
}

pub(crate) fn provider_profile(provider: Provider) -> ProviderProfile {
    match provider {
        Provider::Gemini => ProviderProfile::gemini(),
        Provider::ChatGpt => ProviderProfile::chatgpt(),
    }
}

pub(crate) fn probe(config: &Config) -> Probe {
    Probe::new(provider_profile(config.observer.provider), probe_config(config))
}

/// Storage section with `~` expanded in its paths.
pub(crate) fn storage_section(config: &Config) -> StorageSection {
    let mut section = config.storage.clone();
    section.folder = section.folder.as_deref().map(ConfigLoader::expand_path);
    section.state_path = ConfigLoader::expand_path(&section.state_path);
    section
}
