use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("path {path:?} is not under root {root:?}")]
    NotUnderRoot { path: String, root: String },
}

/// Maps between caller-visible relative paths and the absolute,
/// case-folded paths used to address the remote namespace.
///
/// The service folds case but only reports reliable casing on the final
/// component of a display path, so prefix comparisons fold case while
/// stripped results keep whatever casing the remote handed back. Callers
/// needing guaranteed-correct casing must recurse one directory level at
/// a time instead of trusting a deep listing.
#[derive(Debug, Clone)]
pub struct PathScope {
    root: String,
    slash_root: String,
    slash_root_slash: String,
}

impl PathScope {
    pub fn new(root: &str) -> Self {
        let root = root.trim_matches('/').to_string();
        let lower = root.to_lowercase();
        let slash_root = format!("/{lower}");
        let slash_root_slash = if lower.is_empty() {
            slash_root.clone()
        } else {
            format!("{slash_root}/")
        };
        Self {
            root,
            slash_root,
            slash_root_slash,
        }
    }

    /// The configured root, original casing, no surrounding separators.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Case-folded root with a leading separator; `"/"` for the
    /// namespace root.
    pub fn slash_root(&self) -> &str {
        &self.slash_root
    }

    /// Strips the scope prefix off an absolute remote path.
    pub fn strip(&self, path: &str) -> Result<String, ScopeError> {
        let prefix = &self.slash_root_slash;
        let matched = path.len() >= prefix.len()
            && path.is_char_boundary(prefix.len())
            && path[..prefix.len()].to_lowercase() == *prefix;
        if !matched {
            return Err(ScopeError::NotUnderRoot {
                path: path.to_string(),
                root: prefix.clone(),
            });
        }
        Ok(path[prefix.len()..].to_string())
    }

    /// Joins the root and a relative path with exactly one separator,
    /// whatever either side already carries.
    pub fn absolute(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            return self.slash_root.clone();
        }
        format!("{}{relative}", self.slash_root_slash)
    }
}

/// The literal namespace root has no nameable absolute path; the listing
/// protocol addresses it as the empty string.
pub(crate) fn api_path(absolute: &str) -> &str {
    if absolute == "/" { "" } else { absolute }
}
