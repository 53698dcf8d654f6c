use crate::pacer::PacerConfig;

/// Largest body the service accepts in a single upload call; anything
/// bigger must go through an upload session.
pub const MAX_CHUNK_SIZE: u64 = 150 * 1024 * 1024;

/// Default upload chunk size. Setting it too small makes uploads slow.
pub const DEFAULT_CHUNK_SIZE: u64 = 128 * 1024 * 1024;

/// Final path components the service itself refuses to sync. Uploading
/// one is treated as a successful no-op so bulk transfers keep going.
pub fn default_ignored_names() -> Vec<String> {
    [
        "desktop.ini",
        "thumbs.db",
        ".ds_store",
        "icon\r",
        ".dropbox",
        ".dropbox.attr",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// One configured binding to a namespace root.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of this remote, for display and logging.
    pub name: String,
    /// Namespace root the store is confined to. Empty for the whole
    /// namespace.
    pub root: String,
    pub chunk_size: u64,
    /// Case-folded final path components to skip on upload.
    pub ignored_names: Vec<String>,
    pub pacer: PacerConfig,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            ignored_names: default_ignored_names(),
            pacer: PacerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct IgnoredNames(Vec<String>);

impl IgnoredNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names.into_iter().map(|name| name.to_lowercase()).collect())
    }

    /// Whether the final component of `path` is on the ignore list.
    pub fn matches(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
        self.0.iter().any(|ignored| *ignored == name)
    }
}
