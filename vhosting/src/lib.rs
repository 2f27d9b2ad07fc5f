//! Advanced virtual hosting.
//!
//! Maps requests received under external origins (scheme, host, port and
//! an optional base path) to the internal paths of one application, and
//! computes external URLs back from internal paths.

pub mod config;
pub mod errors;
pub mod hosting;
pub mod import_export;
pub mod metrics_defs;
pub mod path_key;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod resources;
pub mod rewrite;
pub mod segment_trie;
pub mod skins;
pub mod virtual_host;

#[cfg(test)]
mod testutils;

pub use config::{Config, HostConfig, RewriteConfig};
pub use errors::{ConfigError, RequestError};
pub use hosting::{DefaultHosting, Routing, VirtualHosting, select};
pub use registry::HostRegistry;
pub use request::RequestContext;
pub use resolver::{ResolveState, VirtualHostResolver};
pub use resources::{ResourceTree, StaticResourceTree, Traversal};
pub use skins::{SkinHandle, SkinRegistry, StaticSkinRegistry};
