//! Virtual hosts and the per-origin indices built from their rules.

use crate::config::{HostConfig, RewriteConfig};
use crate::errors::{ConfigError, RewriteKey};
use crate::path_key::{UrlKey, trim_trailing_slash, url_to_key};
use crate::resources::ResourceTree;
use crate::rewrite::RewriteRule;
use crate::segment_trie::{SegmentTrie, TrieMatch};
use std::iter;
use std::sync::Arc;

/// The two lookup structures of one origin (canonical URL or alias).
#[derive(Debug)]
pub struct OriginIndex {
    url: String,
    host_url: String,
    key: UrlKey,
    /// Origin path segments followed by the rule's external path.
    by_external_path: SegmentTrie<Arc<RewriteRule>>,
    /// The rule's internal path.
    by_internal_path: SegmentTrie<Arc<RewriteRule>>,
}

impl OriginIndex {
    fn new(url: &str, host_url: &str, key: UrlKey) -> Self {
        OriginIndex {
            url: url.to_string(),
            host_url: host_url.to_string(),
            key,
            by_external_path: SegmentTrie::new(),
            by_internal_path: SegmentTrie::new(),
        }
    }

    /// URL of this origin, without trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Canonical URL of the virtual host owning this origin.
    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    pub fn key(&self) -> &UrlKey {
        &self.key
    }

    /// Deepest rule whose external path prefixes `path`. `path` is the full
    /// request path, origin sub-path included.
    pub fn match_path<S: AsRef<str>>(&self, path: &[S]) -> Option<TrieMatch<'_, Arc<RewriteRule>>> {
        self.by_external_path.get(path, true)
    }

    /// Deepest rule whose internal path prefixes `internal_path`.
    pub fn locate<S: AsRef<str>>(
        &self,
        internal_path: &[S],
    ) -> Option<TrieMatch<'_, Arc<RewriteRule>>> {
        self.by_internal_path.get(internal_path, true)
    }

    /// The rule at the shallowest external path, if there is exactly one.
    pub fn top_level(&self) -> Option<&Arc<RewriteRule>> {
        match self.by_external_path.top_level_values().as_slice() {
            [rule] => Some(*rule),
            _ => None,
        }
    }

    pub fn rules(&self) -> Vec<&Arc<RewriteRule>> {
        self.by_external_path.values()
    }

    fn insert(&mut self, rule: RewriteRule) -> Result<(), ConfigError> {
        let rule = Arc::new(rule);

        self.by_external_path
            .add(rule.server_script.as_slice(), rule.clone())
            .map_err(|_| ConfigError::DuplicateRewrite {
                host: self.url.clone(),
                kind: RewriteKey::External,
                path: rule.original.clone(),
            })?;

        self.by_internal_path
            .add(rule.internal_path.as_slice(), rule.clone())
            .map_err(|_| ConfigError::DuplicateRewrite {
                host: self.url.clone(),
                kind: RewriteKey::Internal,
                path: rule.rewrite.clone(),
            })?;
        Ok(())
    }
}

/// A virtual host with its rules built and indexed for every origin.
#[derive(Debug)]
pub struct VirtualHost {
    pub url: String,
    pub aliases: Vec<String>,
    /// Rule definitions in declaration order, kept for export.
    pub rewrites: Vec<RewriteConfig>,
    origins: Vec<Arc<OriginIndex>>,
}

impl VirtualHost {
    /// Builds the rules once against the canonical URL, checking their
    /// internal paths, then indexes them for the canonical URL and every
    /// alias.
    pub fn build<T>(config: &HostConfig, resources: &T) -> Result<Self, ConfigError>
    where
        T: ResourceTree + ?Sized,
    {
        let url = config.canonical_url().to_string();
        let rules = config
            .rewrites
            .iter()
            .map(|rewrite| RewriteRule::build(&url, rewrite, resources))
            .collect::<Result<Vec<_>, _>>()?;

        let origin_urls = iter::once(url.as_str())
            .chain(config.aliases.iter().map(String::as_str).map(trim_trailing_slash));

        let mut origins = Vec::new();
        for origin_url in origin_urls {
            let mut index = OriginIndex::new(origin_url, &url, url_to_key(origin_url)?);
            for rule in &rules {
                let rule = if origin_url == url {
                    rule.clone()
                } else {
                    rule.rebase(origin_url)?
                };
                index.insert(rule)?;
            }
            origins.push(Arc::new(index));
        }

        tracing::debug!(
            host = %url,
            aliases = config.aliases.len(),
            rules = rules.len(),
            "Built virtual host"
        );

        Ok(VirtualHost {
            url,
            aliases: config.aliases.clone(),
            rewrites: config.rewrites.clone(),
            origins,
        })
    }

    /// Canonical origin first, then aliases in declaration order.
    pub fn origins(&self) -> &[Arc<OriginIndex>] {
        &self.origins
    }

    pub fn to_config(&self) -> HostConfig {
        HostConfig::new(self.url.clone(), self.aliases.clone(), self.rewrites.clone())
    }
}
