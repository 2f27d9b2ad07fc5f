//! Request-time hosting behaviours.
//!
//! [`select`] picks [`VirtualHostResolver`] when advanced virtual hosting
//! is active and [`DefaultHosting`] otherwise. Both compute the externally
//! visible URLs of content and of the virtual site for one request.

use crate::errors::Result;
use crate::path_key::{join_url, parse_path, relative_url, split_url};
use crate::registry::HostRegistry;
use crate::request::RequestContext;
use crate::resolver::{VirtualHostResolver, vhm_url};
use crate::resources::{ResourceTree, Traversal};
use crate::skins::SkinRegistry;
use http::HeaderMap;

/// Namespace segment that switches content to its preview version.
pub const PREVIEW_NAMESPACE: &str = "++preview++";

/// Where inbound resolution leaves a request: the resource to continue
/// traversal from and the path segments still to traverse.
#[derive(Clone, Debug, PartialEq)]
pub struct Routing<R> {
    pub traversal: Traversal<R>,
    pub path: Vec<String>,
}

pub trait VirtualHosting<R> {
    /// Resolves the request against the origin declared by `vhm_url`,
    /// rewriting `request` when a virtual host rule applies.
    fn resolve(&mut self, request: &mut RequestContext, vhm_url: Option<&str>) -> Result<Routing<R>>;

    /// Like [`resolve`](Self::resolve), with the origin read from the
    /// `X-VHM-Url` header.
    fn resolve_headers(&mut self, request: &mut RequestContext, headers: &HeaderMap) -> Result<Routing<R>> {
        self.resolve(request, vhm_url(headers))
    }

    /// Computes `original_url` as seen under the origin `target`. Without a
    /// target, the URL is made relative.
    fn rewrite_url(&self, target: Option<&str>, original_url: &str) -> Result<String>;

    /// External URL of the content at `internal_path`.
    fn content_url(&self, internal_path: &[String], preview: bool) -> Result<String>;

    fn root_url(&self) -> String;

    fn root_path(&self) -> String;

    fn top_level_url(&self) -> String;

    fn top_level_path(&self) -> String;
}

/// Hosting without virtual hosts: the application is published as is under
/// the server URL the request arrived at.
pub struct DefaultHosting<'a, T: ResourceTree> {
    resources: &'a T,
    server_url: String,
}

impl<'a, T: ResourceTree> DefaultHosting<'a, T> {
    pub fn new(resources: &'a T) -> Self {
        DefaultHosting {
            resources,
            server_url: String::new(),
        }
    }
}

impl<T: ResourceTree> VirtualHosting<T::Resource> for DefaultHosting<'_, T> {
    fn resolve(&mut self, request: &mut RequestContext, _vhm_url: Option<&str>) -> Result<Routing<T::Resource>> {
        self.server_url = request.server_url.clone();
        passthrough(self.resources, request)
    }

    fn rewrite_url(&self, target: Option<&str>, original_url: &str) -> Result<String> {
        Ok(substitute_origin(target, original_url))
    }

    fn content_url(&self, internal_path: &[String], preview: bool) -> Result<String> {
        Ok(server_content_url(
            &self.server_url,
            self.resources.site_root(),
            internal_path,
            preview,
        ))
    }

    fn root_url(&self) -> String {
        join_url(&self.server_url, self.resources.site_root())
    }

    fn root_path(&self) -> String {
        absolute_path(self.resources.site_root())
    }

    fn top_level_url(&self) -> String {
        self.root_url()
    }

    fn top_level_path(&self) -> String {
        self.root_path()
    }
}

/// The hosting behaviour for the registry's current state.
pub fn select<'a, T>(
    registry: &HostRegistry,
    resources: &'a T,
    skins: &'a dyn SkinRegistry,
) -> Box<dyn VirtualHosting<T::Resource> + 'a>
where
    T: ResourceTree + 'a,
{
    if registry.is_active() {
        Box::new(VirtualHostResolver::new(registry.snapshot(), resources, skins))
    } else {
        Box::new(DefaultHosting::new(resources))
    }
}

/// Leaves the request untouched: traversal starts at the application root
/// with the full request path.
pub(crate) fn passthrough<T>(resources: &T, request: &RequestContext) -> Result<Routing<T::Resource>>
where
    T: ResourceTree + ?Sized,
{
    Ok(Routing {
        traversal: Traversal::Resolved(resources.root()),
        path: parse_path(split_url(&request.actual_url).path)?,
    })
}

/// Replaces scheme and authority of `url` with the ones of `target`.
pub(crate) fn substitute_origin(target: Option<&str>, url: &str) -> String {
    let raw = split_url(url);
    match target {
        Some(target) => format!("{}{}{}", split_url(target).server_url(), raw.path, raw.suffix),
        None => relative_url(url),
    }
}

/// Joins `path` below `base`, with the preview namespace inserted at
/// `preview_at` when requested.
pub(crate) fn preview_url(base: &str, path: &[String], preview: bool, preview_at: usize) -> String {
    if !preview {
        return join_url(base, path);
    }
    let mut path = path.to_vec();
    path.insert(preview_at.min(path.len()), PREVIEW_NAMESPACE.to_string());
    join_url(base, &path)
}

/// Content URL under the plain server URL: the full internal path, preview
/// namespace right after the site root.
pub(crate) fn server_content_url(
    server_url: &str,
    site_root: &[String],
    internal_path: &[String],
    preview: bool,
) -> String {
    preview_url(server_url, internal_path, preview, site_root.len())
}

pub(crate) fn absolute_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::from("/");
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            path.push('/');
        }
        path.push_str(segment.as_ref());
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostConfig, RewriteConfig};
    use crate::testutils::{path, test_skins, test_tree};

    fn request(url: &str) -> RequestContext {
        RequestContext::new(url)
    }

    #[test]
    fn test_default_hosting() {
        let tree = test_tree();
        let mut hosting = DefaultHosting::new(&tree);
        let mut request = request("http://localhost/root/docs?a=1");

        let routing = hosting.resolve(&mut request, Some("http://localhost")).unwrap();
        assert_eq!(routing.traversal, Traversal::Resolved(Vec::new()));
        assert_eq!(routing.path, path("/root/docs"));
        assert_eq!(request, RequestContext::new("http://localhost/root/docs?a=1"));

        assert_eq!(hosting.content_url(&path("/root"), false).unwrap(), "http://localhost/root");
        assert_eq!(
            hosting.content_url(&path("/root"), true).unwrap(),
            "http://localhost/root/++preview++"
        );
        assert_eq!(
            hosting.content_url(&path("/root/docs/user"), true).unwrap(),
            "http://localhost/root/++preview++/docs/user"
        );
        assert_eq!(
            relative_url(&hosting.content_url(&path("/root"), true).unwrap()),
            "/root/++preview++"
        );

        assert_eq!(hosting.root_url(), "http://localhost/root");
        assert_eq!(hosting.root_path(), "/root");
        assert_eq!(hosting.top_level_url(), "http://localhost/root");
        assert_eq!(hosting.top_level_path(), "/root");
    }

    #[test]
    fn test_default_rewrite_url() {
        let tree = test_tree();
        let hosting = DefaultHosting::new(&tree);
        assert_eq!(
            hosting.rewrite_url(None, "http://localhost/man/edit").unwrap(),
            "/man/edit"
        );
        assert_eq!(
            hosting
                .rewrite_url(Some("https://infrae.com/ignored"), "http://localhost/man/edit?x=1")
                .unwrap(),
            "https://infrae.com/man/edit?x=1"
        );
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(absolute_path::<&str>(&[]), "/");
        assert_eq!(absolute_path(&["docs", "silva"]), "/docs/silva");
    }

    #[test]
    fn test_select() {
        let tree = test_tree();
        let skins = test_skins();
        let registry = HostRegistry::new();
        registry
            .set_hosts(
                &[HostConfig::new(
                    "http://localhost",
                    vec![],
                    vec![RewriteConfig::new("/", "/root")],
                )],
                &tree,
            )
            .unwrap();

        let mut hosting = select(&registry, &tree, &skins);
        let mut req = request("http://localhost/docs");
        let routing = hosting.resolve(&mut req, Some("http://localhost")).unwrap();
        // Inactive: the header is ignored.
        assert_eq!(routing.path, path("/docs"));
        assert_eq!(hosting.root_url(), "http://localhost/root");

        registry.activate().unwrap();
        let mut hosting = select(&registry, &tree, &skins);
        let mut req = request("http://localhost/docs");
        let routing = hosting.resolve(&mut req, Some("http://localhost")).unwrap();
        assert_eq!(routing.traversal, Traversal::Resolved(path("/root")));
        assert_eq!(routing.path, path("/docs"));
        assert_eq!(hosting.root_url(), "http://localhost");
        assert_eq!(hosting.content_url(&path("/root"), true).unwrap(), "http://localhost/++preview++");
    }
}
