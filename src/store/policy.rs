//! store::policy
//!
//! Collaborator interfaces consumed by the coordinator.
//!
//! Both collaborators are external concerns - a content-type classifier
//! and a feature-flag lookup - so they are traits with default
//! implementations, letting the surrounding service plug in its own.

use crate::core::config::StoreConfig;
use crate::core::types::{RelPath, RepoName};

/// Classifies a path as a binary asset exempt from lite-branch
/// propagation.
pub trait AssetClassifier: Send + Sync {
    /// Whether `path` is an image/file asset.
    fn is_binary_asset(&self, path: &RelPath) -> bool;
}

/// Default classifier: a path is a binary asset when any of its
/// components is an asset segment (`images` or `files`).
///
/// The lite branch exists purely to cheapen non-asset rebuilds, so assets
/// are excluded even for whitelisted repositories.
#[derive(Debug, Clone)]
pub struct SegmentClassifier {
    segments: Vec<String>,
}

impl Default for SegmentClassifier {
    fn default() -> Self {
        Self {
            segments: vec!["images".to_string(), "files".to_string()],
        }
    }
}

impl SegmentClassifier {
    /// Classifier with custom asset segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl AssetClassifier for SegmentClassifier {
    fn is_binary_asset(&self, path: &RelPath) -> bool {
        path.as_str()
            .split('/')
            .any(|component| self.segments.iter().any(|s| s == component))
    }
}

/// Feature-flag lookup gating lite-branch writes.
pub trait LiteGate: Send + Sync {
    /// Whether `repo` receives staging-lite propagation.
    fn is_whitelisted(&self, repo: &RepoName) -> bool;
}

/// Default gate: the whitelist from [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct ConfigGate {
    whitelist: Vec<RepoName>,
}

impl ConfigGate {
    /// Gate backed by the configured whitelist.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            whitelist: config.lite_whitelist.clone(),
        }
    }
}

impl LiteGate for ConfigGate {
    fn is_whitelisted(&self, repo: &RepoName) -> bool {
        self.whitelist.contains(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    #[test]
    fn asset_segments_classify() {
        let classifier = SegmentClassifier::default();
        assert!(classifier.is_binary_asset(&path("images/logo.png")));
        assert!(classifier.is_binary_asset(&path("content/files/report.pdf")));
        assert!(!classifier.is_binary_asset(&path("pages/about.md")));
    }

    #[test]
    fn segment_must_match_whole_component() {
        let classifier = SegmentClassifier::default();
        assert!(!classifier.is_binary_asset(&path("imagesets/config.yml")));
        assert!(!classifier.is_binary_asset(&path("profiles/a.md")));
    }

    #[test]
    fn config_gate_reads_whitelist() {
        let config: StoreConfig = toml::from_str(
            r#"
            workspace_root = "/var/stagehand"
            provider_base_url = "https://github.com/acme-sites"
            lite_whitelist = ["docs-site"]
            "#,
        )
        .unwrap();

        let gate = ConfigGate::from_config(&config);
        assert!(gate.is_whitelisted(&RepoName::new("docs-site").unwrap()));
        assert!(!gate.is_whitelisted(&RepoName::new("other-site").unwrap()));
    }
}
