//! Skin registry collaborator: maps skin names to presentation variants.

use std::collections::HashSet;

/// A presentation variant that was found in the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkinHandle {
    pub name: String,
}

impl SkinHandle {
    pub fn new<N: Into<String>>(name: N) -> Self {
        SkinHandle { name: name.into() }
    }
}

pub trait SkinRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<SkinHandle>;
}

/// Registry backed by a fixed set of skin names.
#[derive(Clone, Debug, Default)]
pub struct StaticSkinRegistry {
    names: HashSet<String>,
}

impl StaticSkinRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticSkinRegistry {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SkinRegistry for StaticSkinRegistry {
    fn lookup(&self, name: &str) -> Option<SkinHandle> {
        self.names.get(name).map(|name| SkinHandle::new(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup() {
        let skins = StaticSkinRegistry::new(["Multiflex", "Standard Issue"]);
        assert_eq!(skins.lookup("Multiflex"), Some(SkinHandle::new("Multiflex")));
        assert_eq!(skins.lookup("multiflex"), None);
        assert_eq!(StaticSkinRegistry::default().lookup("Multiflex"), None);
    }
}
