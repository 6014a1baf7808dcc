use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::RepoSlug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .backport-scout.toml.
/// All sections are optional; the defaults track ansible/ansible.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Repository that bare `#1234` references and backport searches point at
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Search tuning for backport and commit lookups
    #[serde(default)]
    pub search: SearchConfig,

    /// Release lines to scan when none are given on the command line
    #[serde(default)]
    pub backports: BackportsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN / GITHUB_TOKEN_RO.
    pub token: Option<String>,

    /// Per-request timeout applied by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        let slug = RepoSlug::default();
        Self {
            owner: slug.owner,
            name: slug.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Organizations searched when mapping a cherry-picked commit back to PRs
    #[serde(default = "default_orgs")]
    pub orgs: Vec<String>,

    /// Labels that exclude a backport from the open-backport search
    #[serde(default = "default_exclude_labels")]
    pub exclude_labels: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            orgs: default_orgs(),
            exclude_labels: default_exclude_labels(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackportsConfig {
    #[serde(default = "default_versions")]
    pub versions: Vec<String>,
}

impl Default for BackportsConfig {
    fn default() -> Self {
        Self {
            versions: default_versions(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_orgs() -> Vec<String> {
    vec!["ansible".to_string(), "ansible-collections".to_string()]
}

fn default_exclude_labels() -> Vec<String> {
    vec!["waiting_on_upstream".to_string(), "on_hold".to_string()]
}

fn default_versions() -> Vec<String> {
    vec!["2.10".to_string()]
}

impl Config {
    /// Load configuration from .backport-scout.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".backport-scout.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// then GITHUB_TOKEN, then the read-only GITHUB_TOKEN_RO.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GITHUB_TOKEN_RO").ok())
    }

    pub fn default_repo(&self) -> RepoSlug {
        RepoSlug::new(&self.repository.owner, &self.repository.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.default_repo(), RepoSlug::new("ansible", "ansible"));
        assert_eq!(config.search.orgs, vec!["ansible", "ansible-collections"]);
        assert_eq!(config.search.exclude_labels, vec!["waiting_on_upstream", "on_hold"]);
        assert_eq!(config.backports.versions, vec!["2.10"]);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[repository]
owner = "ansible-collections"
name = "community.general"

[search]
orgs = ["ansible-collections"]

[backports]
versions = ["2.9", "2.10"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_repo().to_string(), "ansible-collections/community.general");
        assert_eq!(config.search.orgs.len(), 1);
        // Unset keys inside a present section still get their defaults
        assert_eq!(config.search.exclude_labels.len(), 2);
        assert_eq!(config.backports.versions, vec!["2.9", "2.10"]);
        assert_eq!(config.github.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"abc\"\ntimeout_secs = 5").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.github.timeout_secs, 5);
        assert_eq!(config.github_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[github\ntoken = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = Config::load_from(Path::new("/nonexistent/.backport-scout.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
