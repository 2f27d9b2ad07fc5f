//! Per-request resolution against the virtual hosts.
//!
//! A resolver is created for one request from a registry snapshot. It goes
//! through the states of [`ResolveState`]: a request without the `X-VHM-Url`
//! header, or declaring an origin no virtual host owns, passes through
//! untouched. A known origin must have a rule for the request path, else the
//! request is unroutable.

use crate::errors::{RequestError, Result};
use crate::hosting::{
    Routing, VirtualHosting, absolute_path, passthrough, preview_url, server_content_url,
    substitute_origin,
};
use crate::metrics_defs::{RESOLVE_APPLIED, RESOLVE_PASSTHROUGH, RESOLVE_UNROUTABLE};
use crate::path_key::{join_url, parse_path, split_url, url_to_key};
use crate::registry::Snapshot;
use crate::request::RequestContext;
use crate::resources::ResourceTree;
use crate::rewrite::RewriteRule;
use crate::skins::SkinRegistry;
use crate::virtual_host::OriginIndex;
use http::HeaderMap;
use shared::counter;
use std::sync::Arc;

/// Header carrying the external origin a request was received at.
pub const VHM_URL_HEADER: &str = "x-vhm-url";

/// The declared origin of a request, if any.
pub fn vhm_url(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(VHM_URL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveState {
    Unresolved,
    HostMatched,
    RuleMatched,
    Applied,
    Passthrough,
}

pub struct VirtualHostResolver<'a, T: ResourceTree> {
    snapshot: Arc<Snapshot>,
    resources: &'a T,
    skins: &'a dyn SkinRegistry,
    state: ResolveState,
    server_url: String,
    host: Option<Arc<OriginIndex>>,
    rule: Option<Arc<RewriteRule>>,
}

impl<'a, T: ResourceTree> VirtualHostResolver<'a, T> {
    pub fn new(snapshot: Arc<Snapshot>, resources: &'a T, skins: &'a dyn SkinRegistry) -> Self {
        VirtualHostResolver {
            snapshot,
            resources,
            skins,
            state: ResolveState::Unresolved,
            server_url: String::new(),
            host: None,
            rule: None,
        }
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    /// The origin matched by the request, if any.
    pub fn host(&self) -> Option<&Arc<OriginIndex>> {
        self.host.as_ref()
    }

    /// The rule applied to the request, if any.
    pub fn rule(&self) -> Option<&Arc<RewriteRule>> {
        self.rule.as_ref()
    }

    fn pass(&mut self, request: &RequestContext) -> Result<Routing<T::Resource>> {
        self.state = ResolveState::Passthrough;
        counter!(RESOLVE_PASSTHROUGH).increment(1);
        passthrough(self.resources, request)
    }
}

impl<T: ResourceTree> VirtualHosting<T::Resource> for VirtualHostResolver<'_, T> {
    fn resolve(&mut self, request: &mut RequestContext, vhm_url: Option<&str>) -> Result<Routing<T::Resource>> {
        self.server_url = request.server_url.clone();

        let Some(url) = vhm_url else {
            return self.pass(request);
        };
        let Some(host) = self.snapshot.query(&url_to_key(url)?).cloned() else {
            tracing::debug!(url, "No virtual host for origin");
            return self.pass(request);
        };
        self.state = ResolveState::HostMatched;

        let path = parse_path(split_url(&request.actual_url).path)?;
        let Some(found) = host.match_path(&path) else {
            counter!(RESOLVE_UNROUTABLE).increment(1);
            return Err(RequestError::Unroutable(join_url(url, &path)));
        };
        let (rule, matched) = (found.value.clone(), found.matched);
        self.state = ResolveState::RuleMatched;
        tracing::debug!(
            host = host.url(),
            original = %rule.original,
            rewrite = %rule.rewrite,
            matched,
            "Matched rewrite rule"
        );

        let traversal = rule.apply(request, self.resources, self.skins);
        self.host = Some(host);
        self.rule = Some(rule);
        self.state = ResolveState::Applied;
        counter!(RESOLVE_APPLIED).increment(1);

        Ok(Routing {
            traversal,
            path: path[matched..].to_vec(),
        })
    }

    fn rewrite_url(&self, target: Option<&str>, original_url: &str) -> Result<String> {
        let (Some(target), Some(host)) = (target, &self.host) else {
            return Ok(substitute_origin(target, original_url));
        };

        // Back to the internal path through the current host...
        let key = url_to_key(original_url)?;
        let found = host
            .match_path(&key.segments)
            .ok_or_else(|| RequestError::Unroutable(original_url.to_string()))?;
        let mut internal = found.value.internal_path.clone();
        internal.extend_from_slice(&key.segments[found.matched..]);

        // ...and out again through the target origin.
        let unroutable = || RequestError::Unroutable(format!("{} under {target}", absolute_path(&internal)));
        let target_host = self.snapshot.query(&url_to_key(target)?).ok_or_else(unroutable)?;
        let found = target_host.locate(&internal).ok_or_else(unroutable)?;

        Ok(format!(
            "{}{}",
            join_url(&found.value.external_url, &internal[found.matched..]),
            split_url(original_url).suffix
        ))
    }

    fn content_url(&self, internal_path: &[String], preview: bool) -> Result<String> {
        let Some(host) = &self.host else {
            return Ok(server_content_url(
                &self.server_url,
                self.resources.site_root(),
                internal_path,
                preview,
            ));
        };

        let found = host.locate(internal_path).ok_or_else(|| {
            RequestError::Unroutable(format!(
                "no virtual host is defined for {}",
                absolute_path(internal_path)
            ))
        })?;
        let preview_at = self.resources.site_root().len().saturating_sub(found.matched);
        Ok(preview_url(
            &found.value.external_url,
            &internal_path[found.matched..],
            preview,
            preview_at,
        ))
    }

    fn root_url(&self) -> String {
        match &self.rule {
            Some(rule) => rule.external_url.clone(),
            None => join_url(&self.server_url, self.resources.site_root()),
        }
    }

    fn root_path(&self) -> String {
        match &self.rule {
            Some(rule) => absolute_path(&rule.server_script),
            None => absolute_path(self.resources.site_root()),
        }
    }

    fn top_level_url(&self) -> String {
        match self.host.as_ref().and_then(|host| host.top_level()) {
            Some(top) => top.external_url.clone(),
            None => self.root_url(),
        }
    }

    fn top_level_path(&self) -> String {
        match self.host.as_ref().and_then(|host| host.top_level()) {
            Some(top) => absolute_path(&top.server_script),
            None => self.root_path(),
        }
    }
}
