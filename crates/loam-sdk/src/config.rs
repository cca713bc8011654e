use std::fs;
use std::io;
use std::path::Path;

use loam_store::{Identity, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Per-repository settings, stored as TOML in `.git/loam.toml`.
///
/// ```toml
/// [user]
/// name = "Ada Lovelace"
/// email = "ada@example.com"
///
/// [store]
/// compression_level = 9
/// fsync = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Author and committer for new commits.
    pub user: Identity,
    pub store: StoreConfig,
}

impl RepoConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SdkError::io(path, e)),
        };
        toml::from_str(&text).map_err(|e| SdkError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write to `path` as TOML.
    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| SdkError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| SdkError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoConfig::load(&dir.path().join("loam.toml")).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.user, Identity::default());
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loam.toml");
        fs::write(&path, "[user]\nname = \"Ada\"\nemail = \"ada@example.com\"\n").unwrap();
        let config = RepoConfig::load(&path).unwrap();
        assert_eq!(config.user, Identity::new("Ada", "ada@example.com"));
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loam.toml");
        let mut config = RepoConfig::default();
        config.store.compression_level = 9;
        config.user = Identity::new("Grace", "grace@example.com");
        config.save(&path).unwrap();
        assert_eq!(RepoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loam.toml");
        fs::write(&path, "[store]\ncompression_level = \"high\"\n").unwrap();
        assert!(matches!(
            RepoConfig::load(&path),
            Err(SdkError::Config { .. })
        ));
    }
}
