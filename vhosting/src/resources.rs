//! Resource tree collaborator: the backend application's content.
//!
//! The core only needs to know whether an internal path exists, to reach
//! the resource behind it and to ask the content for its own default skin.

use crate::path_key::{FormatError, parse_path};
use crate::skins::SkinHandle;
use std::collections::{HashMap, HashSet};

pub trait ResourceTree: Send + Sync {
    type Resource: Clone;

    /// The application root every internal path is traversed from.
    fn root(&self) -> Self::Resource;

    /// Internal path of the published site root, e.g. `["root"]`.
    fn site_root(&self) -> &[String];

    fn resolve(&self, path: &[String]) -> Option<Self::Resource>;

    fn exists(&self, path: &[String]) -> bool {
        self.resolve(path).is_some()
    }

    /// The skin the content itself asks for when no rule sets one.
    fn default_skin(&self, _resource: &Self::Resource) -> Option<SkinHandle> {
        None
    }
}

/// Outcome of traversing a rule's internal path at request time.
#[derive(Clone, Debug, PartialEq)]
pub enum Traversal<R> {
    Resolved(R),
    /// The internal path no longer resolves; the application root is used.
    FellBackToRoot(R),
}

impl<R> Traversal<R> {
    pub fn resource(&self) -> &R {
        match self {
            Traversal::Resolved(resource) | Traversal::FellBackToRoot(resource) => resource,
        }
    }

    pub fn into_resource(self) -> R {
        match self {
            Traversal::Resolved(resource) | Traversal::FellBackToRoot(resource) => resource,
        }
    }

    pub fn fell_back(&self) -> bool {
        matches!(self, Traversal::FellBackToRoot(_))
    }
}

/// In-memory tree made of a set of paths. Every ancestor of a registered
/// path exists too, and a resource's default skin is the one configured on
/// its nearest ancestor.
#[derive(Clone, Debug, Default)]
pub struct StaticResourceTree {
    site_root: Vec<String>,
    paths: HashSet<Vec<String>>,
    skins: HashMap<Vec<String>, String>,
}

impl StaticResourceTree {
    pub fn new<I, S>(site_root: &str, paths: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = StaticResourceTree {
            site_root: parse_path(site_root)?,
            ..Default::default()
        };
        tree.insert(tree.site_root.clone());
        for path in paths {
            tree.insert(parse_path(path.as_ref())?);
        }
        Ok(tree)
    }

    /// Makes `skin` the default skin for `path` and everything below it.
    pub fn with_skin(mut self, path: &str, skin: &str) -> Result<Self, FormatError> {
        let path = parse_path(path)?;
        self.insert(path.clone());
        self.skins.insert(path, skin.to_string());
        Ok(self)
    }

    fn insert(&mut self, path: Vec<String>) {
        for depth in 0..path.len() {
            self.paths.insert(path[..depth].to_vec());
        }
        self.paths.insert(path);
    }
}

impl ResourceTree for StaticResourceTree {
    type Resource = Vec<String>;

    fn root(&self) -> Vec<String> {
        Vec::new()
    }

    fn site_root(&self) -> &[String] {
        &self.site_root
    }

    fn resolve(&self, path: &[String]) -> Option<Vec<String>> {
        self.paths.contains(path).then(|| path.to_vec())
    }

    fn default_skin(&self, resource: &Vec<String>) -> Option<SkinHandle> {
        (0..=resource.len())
            .rev()
            .find_map(|depth| self.skins.get(&resource[..depth]))
            .map(|skin| SkinHandle::new(skin.as_str()))
    }
}
