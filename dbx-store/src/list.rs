use dbx_core::{DbxError, ListFolderArg, ListFolderContinueArg, Metadata};

use crate::error::StoreError;
use crate::object::{ObjectMeta, RemoteObject};
use crate::scope;
use crate::store::RemoteStore;

/// One directory listing entry.
#[derive(Debug)]
pub enum Entry {
    Folder(Folder),
    File(RemoteObject),
}

/// A subdirectory, named relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub remote: String,
}

/// Lists `dir` non-recursively, draining every continuation page.
///
/// Entries come back in whatever order the service emits them; files
/// carry their metadata straight from the listing payload.
pub(crate) async fn list_dir(store: &RemoteStore, dir: &str) -> Result<Vec<Entry>, StoreError> {
    let inner = &store.inner;
    let absolute = inner.scope.absolute(dir);

    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = match cursor.take() {
            None => {
                let arg = ListFolderArg {
                    path: scope::api_path(&absolute).to_string(),
                    recursive: false,
                };
                match inner.pacer.call(|| inner.srv.list_folder(&arg)).await {
                    Ok(page) => page,
                    Err(DbxError::NotFound) => {
                        return Err(StoreError::DirNotFound {
                            path: dir.to_string(),
                        });
                    }
                    Err(err) => return Err(StoreError::api("list folder", err)),
                }
            }
            Some(cursor) => {
                let arg = ListFolderContinueArg { cursor };
                inner
                    .pacer
                    .call(|| inner.srv.list_folder_continue(&arg))
                    .await
                    .map_err(|err| StoreError::api("list continue", err))?
            }
        };

        for entry in page.entries {
            match entry {
                Metadata::Folder(info) => {
                    // Append a separator so the root-stripping prefix check
                    // also accepts the folder's own path.
                    let stripped = inner.scope.strip(&format!("{}/", info.path_display))?;
                    let name = stripped.trim_matches('/');
                    // The service occasionally re-lists the queried
                    // directory itself; don't report it as its own child.
                    if !name.is_empty() && name != dir {
                        entries.push(Entry::Folder(Folder {
                            remote: name.to_string(),
                        }));
                    }
                }
                Metadata::File(info) => {
                    let remote = inner.scope.strip(&info.path_display)?;
                    let meta = ObjectMeta::from(&info);
                    entries.push(Entry::File(RemoteObject::with_meta(
                        store.clone(),
                        remote,
                        meta,
                    )));
                }
                other => {
                    tracing::warn!(entry = ?other, "skipping unrecognized listing entry");
                }
            }
        }

        if !page.has_more {
            break;
        }
        cursor = Some(page.cursor);
    }

    Ok(entries)
}
