use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use vhosting::StaticResourceTree;
use vhosting::path_key::FormatError;

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub sentry_dsn: Option<String>,
    /// Default filter, overridden by RUST_LOG
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

/// The published content, as a static tree of internal paths
#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    /// Internal path of the site root
    pub root: String,
    #[serde(default)]
    pub paths: Vec<String>,
    /// Default skin per internal path, inherited by everything below it
    #[serde(default)]
    pub skins: BTreeMap<String, String>,
}

impl SiteConfig {
    pub fn resource_tree(&self) -> Result<StaticResourceTree, FormatError> {
        let mut tree = StaticResourceTree::new(&self.root, &self.paths)?;
        for (path, skin) in &self.skins {
            tree = tree.with_skin(path, skin)?;
        }
        Ok(tree)
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub site: SiteConfig,
    /// Installed skins
    #[serde(default)]
    pub skins: Vec<String>,
    #[serde(flatten)]
    pub vhosting: vhosting::Config,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}
