use crate::path_key::parse_path;
use crate::resources::StaticResourceTree;
use crate::skins::StaticSkinRegistry;

pub fn path(p: &str) -> Vec<String> {
    parse_path(p).unwrap()
}

/// /root with a docs publication holding user, dev and admin folders.
pub fn test_tree() -> StaticResourceTree {
    StaticResourceTree::new(
        "/root",
        [
            "/root/docs/user",
            "/root/docs/admin",
            "/root/docs/dev/resources",
            "/root/docs/dev/man",
        ],
    )
    .unwrap()
    .with_skin("/root/docs", "Standard Issue")
    .unwrap()
}

pub fn test_skins() -> StaticSkinRegistry {
    StaticSkinRegistry::new(["Multiflex", "Standard Issue"])
}
