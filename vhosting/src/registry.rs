//! The registry of virtual hosts.
//!
//! The registry holds an immutable [`Snapshot`] behind an `Arc`. Requests
//! clone the `Arc` and work on that snapshot for their whole lifetime, while
//! a configuration change builds a complete new snapshot and swaps it in.
//! A rejected change leaves the previous snapshot in place.

use crate::config::{Config, HostConfig};
use crate::errors::ConfigError;
use crate::import_export;
use crate::metrics_defs::{
    REGISTRY_HOSTS, REGISTRY_ORIGINS, REGISTRY_REBUILD_DURATION, REGISTRY_REBUILD_FAILURE,
    REGISTRY_REBUILD_SUCCESS,
};
use crate::path_key::UrlKey;
use crate::resources::ResourceTree;
use crate::virtual_host::{OriginIndex, VirtualHost};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use shared::{counter, gauge, histogram};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A fully built and validated set of virtual hosts.
#[derive(Debug, Default)]
pub struct Snapshot {
    hosts: Vec<VirtualHost>,
    /// Every canonical and alias origin, in declaration order.
    origins: IndexMap<UrlKey, Arc<OriginIndex>>,
}

impl Snapshot {
    fn build<T>(hosts: &[HostConfig], resources: &T) -> Result<Self, ConfigError>
    where
        T: ResourceTree + ?Sized,
    {
        let mut snapshot = Snapshot::default();
        for config in hosts {
            let host = VirtualHost::build(config, resources)?;
            for origin in host.origins() {
                if snapshot.origins.contains_key(origin.key()) {
                    return Err(ConfigError::DuplicateHost(origin.url().to_string()));
                }
                snapshot
                    .origins
                    .insert(origin.key().clone(), origin.clone());
            }
            snapshot.hosts.push(host);
        }
        Ok(snapshot)
    }

    /// Exact origin lookup: scheme, hostname, port and path must all match.
    pub fn query(&self, key: &UrlKey) -> Option<&Arc<OriginIndex>> {
        self.origins.get(key)
    }

    pub fn hosts(&self) -> &[VirtualHost] {
        &self.hosts
    }

    pub fn origins(&self) -> impl Iterator<Item = &Arc<OriginIndex>> {
        self.origins.values()
    }
}

#[derive(Debug, Default)]
pub struct HostRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
    // Serializes writers so that two concurrent changes cannot interleave
    // their validation and swap.
    update_lock: Mutex<()>,
    active: AtomicBool,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a configuration, activated if the
    /// configuration says so.
    pub fn from_config<T>(config: &Config, resources: &T) -> Result<Self, ConfigError>
    where
        T: ResourceTree + ?Sized,
    {
        config.validate()?;
        let registry = HostRegistry::new();
        registry.set_hosts(&config.hosts, resources)?;
        if config.active {
            registry.activate()?;
        }
        Ok(registry)
    }

    /// Replaces every virtual host. The new configuration is built and
    /// validated in full before it becomes visible; on error the previous
    /// one stays active.
    pub fn set_hosts<T>(&self, hosts: &[HostConfig], resources: &T) -> Result<(), ConfigError>
    where
        T: ResourceTree + ?Sized,
    {
        let _guard = self.update_lock.lock();

        let start = Instant::now();
        let result = Snapshot::build(hosts, resources);
        histogram!(REGISTRY_REBUILD_DURATION).record(start.elapsed().as_secs_f64());

        match result {
            Ok(snapshot) => {
                let origins = snapshot.origins.len();
                *self.snapshot.write() = Arc::new(snapshot);

                counter!(REGISTRY_REBUILD_SUCCESS).increment(1);
                gauge!(REGISTRY_HOSTS).set(hosts.len() as f64);
                gauge!(REGISTRY_ORIGINS).set(origins as f64);
                tracing::info!(hosts = hosts.len(), origins, "Virtual hosts updated");
                Ok(())
            }
            Err(error) => {
                counter!(REGISTRY_REBUILD_FAILURE).increment(1);
                tracing::warn!(%error, "Rejected virtual hosts, keeping the active configuration");
                Err(error)
            }
        }
    }

    /// The current snapshot. It never changes once obtained.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn query(&self, key: &UrlKey) -> Option<Arc<OriginIndex>> {
        self.snapshot.read().query(key).cloned()
    }

    /// The active host definitions, in declaration order.
    pub fn hosts(&self) -> Vec<HostConfig> {
        self.snapshot()
            .hosts()
            .iter()
            .map(VirtualHost::to_config)
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn activate(&self) -> Result<(), ConfigError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConfigError::AlreadyActive)?;
        tracing::info!("Advanced virtual hosting activated");
        Ok(())
    }

    pub fn deactivate(&self) -> Result<(), ConfigError> {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConfigError::NotActive)?;
        tracing::info!("Advanced virtual hosting deactivated");
        Ok(())
    }

    /// Replaces every virtual host with the content of a CSV export, as a
    /// single change.
    pub fn import_csv<R, T>(&self, reader: R, resources: &T) -> Result<(), ConfigError>
    where
        R: io::Read,
        T: ResourceTree + ?Sized,
    {
        let hosts = import_export::import_csv(reader)?;
        self.set_hosts(&hosts, resources)
    }

    pub fn export_csv<W: io::Write>(&self, writer: W) -> Result<(), ConfigError> {
        import_export::export_csv(&self.hosts(), writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteConfig;
    use crate::path_key::{FormatError, url_to_key};
    use crate::testutils::{path, test_tree};
    use std::thread;

    fn host(url: &str, aliases: &[&str], rewrites: &[(&str, &str)]) -> HostConfig {
        HostConfig::new(
            url,
            aliases.iter().map(|alias| alias.to_string()).collect(),
            rewrites
                .iter()
                .map(|(original, rewrite)| RewriteConfig::new(*original, *rewrite))
                .collect(),
        )
    }

    fn key(url: &str) -> UrlKey {
        url_to_key(url).unwrap()
    }

    #[test]
    fn test_query() {
        let registry = HostRegistry::new();
        registry
            .set_hosts(
                &[
                    host("http://infrae.com/", &["http://www.infrae.com"], &[("/", "/root")]),
                    host("http://infrae.com/docs", &[], &[("/silva", "/root")]),
                ],
                &test_tree(),
            )
            .unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.hosts().len(), 2);
        assert_eq!(snapshot.origins().count(), 3);

        // Default ports are part of the key.
        let index = registry.query(&key("http://infrae.com:80")).unwrap();
        assert_eq!(index.url(), "http://infrae.com");
        let index = registry.query(&key("http://www.infrae.com/")).unwrap();
        assert_eq!(index.host_url(), "http://infrae.com");

        // No fallback on origins.
        assert!(registry.query(&key("https://infrae.com")).is_none());
        assert!(registry.query(&key("http://infrae.com/other")).is_none());

        let index = registry.query(&key("http://infrae.com/docs")).unwrap();
        let found = index.match_path(&path("/docs/silva/index")).unwrap();
        assert_eq!(found.matched, 2);
        assert_eq!(found.value.internal_path, path("/root"));
        assert_eq!(found.value.server_script, vec!["docs", "silva"]);
    }

    #[test]
    fn test_duplicate_host_keeps_configuration() {
        let registry = HostRegistry::new();
        let tree = test_tree();
        registry
            .set_hosts(&[host("http://infrae.com/docs", &[], &[("/", "/root")])], &tree)
            .unwrap();
        let before = registry.snapshot();

        let err = registry
            .set_hosts(
                &[
                    host("http://infrae.com/docs", &[], &[("/", "/root")]),
                    host("http://infrae.com/docs/", &[], &[("/user", "/root/docs/user")]),
                ],
                &tree,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateHost(_)));
        assert_eq!(err.to_string(), "double entry for host http://infrae.com/docs");
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));

        // An alias colliding with another host's canonical URL.
        let err = registry
            .set_hosts(
                &[
                    host("http://infrae.com", &[], &[("/", "/root")]),
                    host("http://silva.org", &["http://infrae.com:80/"], &[("/", "/root")]),
                ],
                &tree,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateHost(_)));
        assert_eq!(registry.hosts(), before.hosts().iter().map(VirtualHost::to_config).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_path_keeps_configuration() {
        let registry = HostRegistry::new();
        let tree = test_tree();
        registry
            .set_hosts(&[host("http://infrae.com", &[], &[("/", "/root")])], &tree)
            .unwrap();

        let err = registry
            .set_hosts(&[host("http://infrae.com", &[], &[("/", "/silva")])], &tree)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath { .. }));
        assert_eq!(registry.hosts()[0].rewrites[0].rewrite, "/root");
    }

    #[test]
    fn test_activation() {
        let registry = HostRegistry::new();
        assert!(!registry.is_active());
        assert!(matches!(registry.deactivate(), Err(ConfigError::NotActive)));

        registry.activate().unwrap();
        assert!(registry.is_active());
        assert!(matches!(registry.activate(), Err(ConfigError::AlreadyActive)));

        registry.deactivate().unwrap();
        assert!(!registry.is_active());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            active: true,
            hosts: vec![host("http://infrae.com", &[], &[("/", "/root")])],
        };
        let registry = HostRegistry::from_config(&config, &test_tree()).unwrap();
        assert!(registry.is_active());
        assert_eq!(registry.hosts(), config.hosts);

        let config = Config {
            active: false,
            hosts: vec![host("http://", &[], &[("/", "/root")])],
        };
        assert!(matches!(
            HostRegistry::from_config(&config, &test_tree()),
            Err(ConfigError::Format(_))
        ));
    }

    #[test]
    fn test_csv_round_trip() {
        let tree = test_tree();
        let registry = HostRegistry::new();
        let hosts = vec![
            host("http://localhost", &[], &[("/", "/root/docs/dev"), ("/site", "/root")]),
            HostConfig::new(
                "https://localhost",
                vec![],
                vec![
                    RewriteConfig::new("/", "/root"),
                    RewriteConfig::new("/admin", "/root/docs/admin").with_skin("Multiflex", false),
                ],
            ),
        ];
        registry.set_hosts(&hosts, &tree).unwrap();

        let mut out = Vec::new();
        registry.export_csv(&mut out).unwrap();

        let imported = HostRegistry::new();
        imported.import_csv(out.as_slice(), &tree).unwrap();
        assert_eq!(imported.hosts(), hosts);
    }

    #[test]
    fn test_import_rejects_whole_file() {
        let tree = test_tree();
        let registry = HostRegistry::new();
        registry
            .set_hosts(&[host("http://infrae.com", &[], &[("/", "/root")])], &tree)
            .unwrap();

        let data = "http://localhost,/,/root,,on\n\
                    http://localhost,/,/root/docs,,on\n";
        let err = registry.import_csv(data.as_bytes(), &tree).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRewrite { .. }));
        assert_eq!(registry.hosts()[0].url, "http://infrae.com");

        let err = registry.import_csv("http://localhost,/\n".as_bytes(), &tree).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCsvRow { line: 0, columns: 2 }));
        assert_eq!(registry.hosts().len(), 1);
    }

    #[test]
    fn test_import_split_host_is_duplicate() {
        let tree = test_tree();
        let registry = HostRegistry::new();
        registry
            .set_hosts(&[host("http://infrae.com", &[], &[("/", "/root")])], &tree)
            .unwrap();
        let before = registry.snapshot();

        let data = "http://a.com,/,/root,,on\n\
                    http://b.com,/,/root,,on\n\
                    http://a.com,/admin,/root/docs/admin,,on\n";
        let err = registry.import_csv(data.as_bytes(), &tree).unwrap_err();
        assert!(matches!(&err, ConfigError::DuplicateHost(url) if url == "http://a.com"));
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));
        assert_eq!(registry.hosts(), vec![host("http://infrae.com", &[], &[("/", "/root")])]);
    }

    #[test]
    fn test_import_empty_hostname() {
        let tree = test_tree();
        let registry = HostRegistry::new();

        let err = registry
            .import_csv("http://,/,/root,,on\n".as_bytes(), &tree)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Format(FormatError::EmptyHostname(_))));
        assert!(registry.hosts().is_empty());

        let err = registry
            .set_hosts(&[host("http:///", &[], &[("/", "/root")])], &tree)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Format(FormatError::EmptyHostname(_))));
    }

    #[test]
    fn test_readers_see_whole_snapshots() {
        let tree = test_tree();
        let registry = HostRegistry::new();
        let small = [host("http://infrae.com", &[], &[("/", "/root")])];
        let large = [host(
            "http://infrae.com",
            &["http://www.infrae.com"],
            &[("/", "/root"), ("/admin", "/root/docs/admin")],
        )];
        registry.set_hosts(&small, &tree).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..50 {
                    let hosts = if round % 2 == 0 { &large } else { &small };
                    registry.set_hosts(hosts, &tree).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = registry.snapshot();
                        let rules = snapshot.hosts()[0].rewrites.len();
                        // Every origin of a snapshot carries every rule of it.
                        for origin in snapshot.origins() {
                            assert_eq!(origin.rules().len(), rules);
                        }
                    }
                });
            }
        });
    }
}
