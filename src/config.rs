//! Host configuration (`edugit.toml`).
//!
//! Typed TOML configuration for the shell host: commit identity, default
//! branch, and remote-merge behaviour. Missing fields use defaults;
//! a missing file means all defaults (no error).

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The fixed author/committer identity used for every commit.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Email address.
    #[serde(default = "default_email")]
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: default_name(),
            email: default_email(),
        }
    }
}

fn default_name() -> String {
    "Edu Git".to_owned()
}

fn default_email() -> String {
    "edu@git.local".to_owned()
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Top-level host configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Commit identity.
    #[serde(default)]
    pub identity: Identity,

    /// Repository-level settings.
    #[serde(default)]
    pub repo: RepoConfig,

    /// Remote workspace settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Repository-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// The default branch for `git init` (default: `"main"`).
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

/// Remote workspace settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Delete the compare branch after merging a merge request.
    #[serde(default)]
    pub delete_branch_on_merge: bool,
}

/// Failure to load or parse a config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    /// What failed.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// [`ConfigError`] with the TOML parser's message.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.identity.name, "Edu Git");
        assert_eq!(cfg.identity.email, "edu@git.local");
        assert_eq!(cfg.repo.default_branch, "main");
        assert!(!cfg.remote.delete_branch_on_merge);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_document_fills_rest() {
        let cfg = Config::from_toml(
            r#"
[identity]
name = "Ada"

[remote]
delete_branch_on_merge = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.identity.name, "Ada");
        assert_eq!(cfg.identity.email, "edu@git.local");
        assert!(cfg.remote.delete_branch_on_merge);
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(Config::from_toml("[identity]\nhandle = \"x\"\n").is_err());
    }

    #[test]
    fn identity_display() {
        let id = Identity::default();
        assert_eq!(format!("{id}"), "Edu Git <edu@git.local>");
    }
}
