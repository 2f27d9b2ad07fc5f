//! Rewrite rules: one external path prefix of a host mapped to an internal
//! resource path.

use crate::config::RewriteConfig;
use crate::errors::ConfigError;
use crate::metrics_defs::{RESOLVE_FELL_BACK_TO_ROOT, SKIN_MISSING};
use crate::path_key::{FormatError, join_url, parse_path, url_to_key};
use crate::request::RequestContext;
use crate::resources::{ResourceTree, Traversal};
use crate::skins::SkinRegistry;
use shared::counter;

/// A rewrite rule built for one origin. Immutable once built; a
/// configuration change builds new rules.
#[derive(Clone, Debug, PartialEq)]
pub struct RewriteRule {
    /// External path prefix as configured.
    pub original: String,
    /// Internal path as configured.
    pub rewrite: String,
    pub internal_path: Vec<String>,
    /// Normalized origin URL followed by `original`, without trailing slash.
    pub external_url: String,
    /// Scheme and authority of `external_url`.
    pub server_url: String,
    /// Path segments of `external_url`, used as the script root.
    pub server_script: Vec<String>,
    pub skin: Option<String>,
    pub skin_enforce: bool,
}

impl RewriteRule {
    /// Builds the rule for `host_url` and checks that the rewrite target
    /// exists in the resource tree.
    pub fn build<T>(host_url: &str, config: &RewriteConfig, resources: &T) -> Result<Self, ConfigError>
    where
        T: ResourceTree + ?Sized,
    {
        let internal_path = parse_path(&config.rewrite)?;
        if !resources.exists(&internal_path) {
            return Err(ConfigError::InvalidPath {
                host: host_url.to_string(),
                rewrite: config.rewrite.clone(),
            });
        }

        let (external_url, server_url, server_script) = external_parts(host_url, &config.original)?;
        Ok(RewriteRule {
            original: config.original.clone(),
            rewrite: config.rewrite.clone(),
            internal_path,
            external_url,
            server_url,
            server_script,
            skin: config.skin.clone(),
            skin_enforce: config.skin_enforce,
        })
    }

    /// The same rule served under another origin. The internal path is not
    /// checked again.
    pub fn rebase(&self, host_url: &str) -> Result<Self, ConfigError> {
        let (external_url, server_url, server_script) = external_parts(host_url, &self.original)?;
        Ok(RewriteRule {
            external_url,
            server_url,
            server_script,
            ..self.clone()
        })
    }

    /// Writes the rule's URLs and skin into `request` and reaches the
    /// resource behind the internal path.
    ///
    /// A dangling internal path is not an error: the application root is
    /// returned instead, so that moved content never makes the host
    /// unreachable.
    pub fn apply<T>(
        &self,
        request: &mut RequestContext,
        resources: &T,
        skins: &dyn SkinRegistry,
    ) -> Traversal<T::Resource>
    where
        T: ResourceTree + ?Sized,
    {
        let traversal = match resources.resolve(&self.internal_path) {
            Some(resource) => Traversal::Resolved(resource),
            None => {
                tracing::warn!(
                    rewrite = %self.rewrite,
                    url = %self.external_url,
                    "Rewrite path does not resolve, using the application root"
                );
                counter!(RESOLVE_FELL_BACK_TO_ROOT).increment(1);
                Traversal::FellBackToRoot(resources.root())
            }
        };

        request.actual_url = format!("{}{}", self.server_url, request.actual_path());
        request.url = self.external_url.clone();
        request.server_url = self.server_url.clone();
        request.script = self.server_script.clone();

        match &self.skin {
            Some(name) => match skins.lookup(name) {
                Some(skin) => {
                    request.set_skin(skin);
                    if self.skin_enforce {
                        request.skin_change_allowed = false;
                    }
                }
                None => {
                    tracing::error!(skin = %name, "Missing skin, please update your settings");
                    counter!(SKIN_MISSING, "skin" => name.clone()).increment(1);
                }
            },
            None => {
                if let Some(skin) = resources.default_skin(traversal.resource()) {
                    request.set_skin(skin);
                }
            }
        }

        traversal
    }
}

fn external_parts(
    host_url: &str,
    original: &str,
) -> Result<(String, String, Vec<String>), FormatError> {
    let key = url_to_key(host_url)?;
    let mut server_script = key.segments;
    server_script.extend(parse_path(original)?);

    let server_url = key.origin.to_string();
    let external_url = join_url(&server_url, &server_script);
    Ok((external_url, server_url, server_script))
}
