//! The mutable per-request state that a rewrite rule writes its result to.

use crate::path_key::split_url;
use crate::skins::SkinHandle;

/// URL fields advertised to downstream URL reconstruction, plus the skin
/// chosen for the request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    /// Base URL of the published root.
    pub url: String,
    /// Full externally visible URL of the request.
    pub actual_url: String,
    /// Scheme and authority only.
    pub server_url: String,
    /// Path segments of the script root below `server_url`.
    pub script: Vec<String>,
    pub skin: Option<SkinHandle>,
    /// Cleared when a rule enforces its skin.
    pub skin_change_allowed: bool,
}

impl RequestContext {
    /// Context for a request received at `actual_url`.
    pub fn new(actual_url: &str) -> Self {
        let raw = split_url(actual_url);
        let server_url = raw.server_url();
        RequestContext {
            url: server_url.clone(),
            actual_url: actual_url.to_string(),
            server_url,
            script: Vec::new(),
            skin: None,
            skin_change_allowed: true,
        }
    }

    /// Path, query and fragment of the actual URL.
    pub fn actual_path(&self) -> &str {
        let raw = split_url(&self.actual_url);
        let start = self.actual_url.len() - raw.path.len() - raw.suffix.len();
        &self.actual_url[start..]
    }

    pub fn set_skin(&mut self, skin: SkinHandle) {
        self.skin = Some(skin);
    }
}
