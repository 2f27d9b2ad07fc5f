use crate::errors::ConfigError;
use crate::path_key::{parse_path, trim_trailing_slash, url_to_key};
use serde::{Deserialize, Serialize};

fn default_skin_enforce() -> bool {
    true
}

/// Virtual hosting configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Whether advanced virtual hosting is turned on for the application
    #[serde(default)]
    pub active: bool,
    /// Virtual hosts, in declaration order
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

impl Config {
    /// Checks that every URL and path parses. Duplicates and dangling
    /// rewrite targets are only detected when the registry is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for host in &self.hosts {
            host.validate()?;
        }
        Ok(())
    }
}

/// One virtual host: an external origin, its aliases and its rewrite rules
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HostConfig {
    /// Canonical URL of the host (e.g. "http://infrae.com/docs")
    pub url: String,
    /// Alternate URLs sharing the same rewrite rules
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Rewrite rules, in declaration order
    pub rewrites: Vec<RewriteConfig>,
}

impl HostConfig {
    pub fn new<U: Into<String>>(url: U, aliases: Vec<String>, rewrites: Vec<RewriteConfig>) -> Self {
        let url: String = url.into();
        HostConfig {
            url: trim_trailing_slash(&url).to_string(),
            aliases,
            rewrites,
        }
    }

    /// The canonical URL without trailing slash.
    pub fn canonical_url(&self) -> &str {
        trim_trailing_slash(&self.url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url_to_key(&self.url)?;
        for alias in &self.aliases {
            url_to_key(alias)?;
        }
        for rewrite in &self.rewrites {
            parse_path(&rewrite.original)?;
            parse_path(&rewrite.rewrite)?;
        }
        Ok(())
    }
}

/// Maps an external path prefix of a host to an internal resource path
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RewriteConfig {
    /// External path prefix below the host URL (e.g. "/admin")
    pub original: String,
    /// Internal resource path (e.g. "/root/docs/admin")
    pub rewrite: String,
    /// Skin to apply to requests matching this rule
    #[serde(default)]
    pub skin: Option<String>,
    /// Forbid any later automatic skin change once the skin is applied
    #[serde(default = "default_skin_enforce")]
    pub skin_enforce: bool,
}

impl RewriteConfig {
    pub fn new<O: Into<String>, R: Into<String>>(original: O, rewrite: R) -> Self {
        RewriteConfig {
            original: original.into(),
            rewrite: rewrite.into(),
            skin: None,
            skin_enforce: true,
        }
    }

    pub fn with_skin<S: Into<String>>(mut self, skin: S, enforce: bool) -> Self {
        self.skin = Some(skin.into());
        self.skin_enforce = enforce;
        self
    }
}
