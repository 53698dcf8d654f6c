use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dbx_core::{
    CommitInfo, CreateFolderArg, DbxError, DeleteArg, Download, DownloadArg, FileMetadata,
    FilesApi, FolderMetadata, GetMetadataArg, ListFolderArg, ListFolderContinueArg, Metadata,
    RelocationArg,
};
use time::OffsetDateTime;
use tokio::io::AsyncRead;

use crate::config::{IgnoredNames, MAX_CHUNK_SIZE, StoreConfig};
use crate::error::StoreError;
use crate::list::{self, Entry};
use crate::object::{ObjectMeta, RemoteObject};
use crate::pacer::Pacer;
use crate::scope::{self, PathScope};
use crate::upload;

/// How the configured root resolved during [`RemoteStore::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// The root is a directory, or does not exist yet.
    Directory,
    /// The root addressed a single object; the store was reparented to
    /// the containing directory.
    File,
}

pub(crate) struct StoreInner {
    pub(crate) name: String,
    pub(crate) scope: PathScope,
    pub(crate) srv: Arc<dyn FilesApi>,
    pub(crate) pacer: Pacer,
    pub(crate) chunk_size: u64,
    pub(crate) ignored: IgnoredNames,
}

/// One configured binding to a namespace root, exposing the remote
/// service through a filesystem-like interface.
///
/// Cloning is cheap and clones share the pacer state.
#[derive(Clone)]
pub struct RemoteStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStore")
            .field("name", &self.inner.name)
            .field("scope", &self.inner.scope)
            .field("chunk_size", &self.inner.chunk_size)
            .field("srv", &"<dyn FilesApi>")
            .finish()
    }
}

impl RemoteStore {
    /// Bind to the configured root over an authenticated transport.
    ///
    /// If the root itself addresses a file the store comes back rooted at
    /// the parent directory together with [`RootKind::File`]; callers
    /// decide what that means, construction has not failed.
    pub async fn open(
        config: StoreConfig,
        srv: Arc<dyn FilesApi>,
    ) -> Result<(Self, RootKind), StoreError> {
        if config.chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::ChunkSizeTooBig {
                requested: config.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }

        let pacer = Pacer::new(config.pacer);
        let mut scope = PathScope::new(&config.root);
        let mut kind = RootKind::Directory;

        if !scope.root().is_empty() {
            let arg = GetMetadataArg {
                path: scope.slash_root().to_string(),
            };
            // Probe failures fall back to directory semantics; a missing
            // root is fine, it may be about to be created.
            if let Ok(Metadata::File(_)) = pacer.call(|| srv.get_metadata(&arg)).await {
                let parent = scope
                    .root()
                    .rsplit_once('/')
                    .map(|(parent, _)| parent)
                    .unwrap_or("");
                scope = PathScope::new(parent);
                kind = RootKind::File;
            }
        }

        let inner = StoreInner {
            name: config.name,
            scope,
            srv,
            pacer,
            chunk_size: config.chunk_size,
            ignored: IgnoredNames::new(config.ignored_names),
        };
        Ok((
            Self {
                inner: Arc::new(inner),
            },
            kind,
        ))
    }

    /// Name of the remote, as configured.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Root of the remote, as configured (possibly reparented during
    /// [`RemoteStore::open`]).
    pub fn root(&self) -> &str {
        self.inner.scope.root()
    }

    /// Timestamp precision the service can store.
    pub fn precision(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Handle to the object at `remote`; metadata loads on first access.
    pub fn object(&self, remote: &str) -> RemoteObject {
        RemoteObject::unloaded(self.clone(), remote.to_string())
    }

    /// List the objects and directories in `dir`, in any order but
    /// complete. `dir` is relative to the root; `""` lists the root.
    pub async fn list(&self, dir: &str) -> Result<Vec<Entry>, StoreError> {
        list::list_dir(self, dir).await
    }

    /// Upload `size` bytes from `reader` to `remote`, returning the
    /// stored object.
    pub async fn put<R>(
        &self,
        reader: &mut R,
        remote: &str,
        mod_time: OffsetDateTime,
        size: u64,
    ) -> Result<RemoteObject, StoreError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let object = self.object(remote);
        object.update(reader, mod_time, size).await?;
        Ok(object)
    }

    /// Create `dir` if it doesn't exist. Succeeds if it already exists as
    /// a folder, fails if it exists as a file.
    pub async fn mkdir(&self, dir: &str) -> Result<(), StoreError> {
        let absolute = self.inner.scope.absolute(dir);
        // Can't create or probe the namespace root.
        if absolute == "/" {
            return Ok(());
        }

        match self.dir_metadata(&absolute, dir).await {
            Ok(_) => return Ok(()),
            Err(StoreError::DirNotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let arg = CreateFolderArg { path: absolute };
        self.inner
            .pacer
            .call(|| self.inner.srv.create_folder(&arg))
            .await
            .map(|_| ())
            .map_err(|err| StoreError::api("create folder", err))
    }

    /// Delete `dir`. Fails if it is the namespace root, missing, or not
    /// empty.
    pub async fn rmdir(&self, dir: &str) -> Result<(), StoreError> {
        let absolute = self.inner.scope.absolute(dir);
        if absolute == "/" {
            return Err(StoreError::CannotRemoveRoot);
        }

        self.dir_metadata(&absolute, dir).await?;

        // Refuse to delete anything that still has entries; drain empty
        // pages before concluding the directory is empty.
        let mut cursor: Option<String> = None;
        loop {
            let page = match cursor.take() {
                None => {
                    let arg = ListFolderArg {
                        path: scope::api_path(&absolute).to_string(),
                        recursive: false,
                    };
                    self.inner
                        .pacer
                        .call(|| self.inner.srv.list_folder(&arg))
                        .await
                        .map_err(|err| StoreError::api("rmdir listing", err))?
                }
                Some(cursor) => {
                    let arg = ListFolderContinueArg { cursor };
                    self.inner
                        .pacer
                        .call(|| self.inner.srv.list_folder_continue(&arg))
                        .await
                        .map_err(|err| StoreError::api("rmdir listing", err))?
                }
            };
            if !page.entries.is_empty() {
                return Err(StoreError::DirNotEmpty {
                    path: dir.to_string(),
                });
            }
            if !page.has_more {
                break;
            }
            cursor = Some(page.cursor);
        }

        let arg = DeleteArg { path: absolute };
        self.inner
            .pacer
            .call(|| self.inner.srv.delete(&arg))
            .await
            .map(|_| ())
            .map_err(|err| StoreError::api("rmdir", err))
    }

    /// Server-side copy of `src` to `remote` under this store.
    pub async fn copy(
        &self,
        src: &RemoteObject,
        remote: &str,
    ) -> Result<RemoteObject, StoreError> {
        self.relocate(src, remote, Relocate::Copy).await
    }

    /// Server-side move of `src` to `remote` under this store.
    pub async fn move_object(
        &self,
        src: &RemoteObject,
        remote: &str,
    ) -> Result<RemoteObject, StoreError> {
        self.relocate(src, remote, Relocate::Move).await
    }

    /// Server-side move of the whole `src_dir` subtree to `dst_dir`.
    ///
    /// Fails with [`StoreError::DirExists`] if the destination is already
    /// a directory, so the caller can decide its merge policy.
    pub async fn move_dir(
        &self,
        src: &RemoteStore,
        src_dir: &str,
        dst_dir: &str,
    ) -> Result<(), StoreError> {
        if !Arc::ptr_eq(&self.inner.srv, &src.inner.srv) {
            return Err(StoreError::CrossStore {
                op: "move directory",
            });
        }

        let to = self.inner.scope.absolute(dst_dir);
        match self.dir_metadata(&to, dst_dir).await {
            Ok(_) => {
                return Err(StoreError::DirExists {
                    path: dst_dir.to_string(),
                });
            }
            Err(StoreError::DirNotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let arg = RelocationArg {
            from_path: src.inner.scope.absolute(src_dir),
            to_path: to,
        };
        self.inner
            .pacer
            .call(|| self.inner.srv.move_path(&arg))
            .await
            .map(|_| ())
            .map_err(|err| StoreError::api("move directory", err))
    }

    /// Delete everything under the configured root in one recursive call.
    ///
    /// Only for callers that want the whole subtree gone; partial
    /// deletions go through [`RemoteObject::remove`] and
    /// [`RemoteStore::rmdir`].
    pub async fn purge(&self) -> Result<(), StoreError> {
        let arg = DeleteArg {
            path: self.inner.scope.slash_root().to_string(),
        };
        self.inner
            .pacer
            .call(|| self.inner.srv.delete(&arg))
            .await
            .map(|_| ())
            .map_err(|err| StoreError::api("purge", err))
    }

    async fn relocate(
        &self,
        src: &RemoteObject,
        remote: &str,
        op: Relocate,
    ) -> Result<RemoteObject, StoreError> {
        if !Arc::ptr_eq(&self.inner.srv, &src.store().inner.srv) {
            return Err(StoreError::CrossStore { op: op.name() });
        }

        let arg = RelocationArg {
            from_path: src.store().inner.scope.absolute(src.remote()),
            to_path: self.inner.scope.absolute(remote),
        };
        let entry = self
            .inner
            .pacer
            .call(|| match op {
                Relocate::Copy => self.inner.srv.copy_path(&arg),
                Relocate::Move => self.inner.srv.move_path(&arg),
            })
            .await
            .map_err(|err| StoreError::api(op.name(), err))?;

        match entry {
            Metadata::File(info) => Ok(RemoteObject::with_meta(
                self.clone(),
                remote.to_string(),
                ObjectMeta::from(&info),
            )),
            _ => Err(StoreError::NotAFile {
                path: remote.to_string(),
            }),
        }
    }

    pub(crate) async fn object_meta(&self, remote: &str) -> Result<ObjectMeta, StoreError> {
        let arg = GetMetadataArg {
            path: self.inner.scope.absolute(remote),
        };
        match self
            .inner
            .pacer
            .call(|| self.inner.srv.get_metadata(&arg))
            .await
        {
            Ok(Metadata::File(info)) => Ok(ObjectMeta::from(&info)),
            Ok(_) => Err(StoreError::NotAFile {
                path: remote.to_string(),
            }),
            Err(DbxError::NotFound) => Err(StoreError::ObjectNotFound {
                path: remote.to_string(),
            }),
            Err(err) => Err(StoreError::api("get metadata", err)),
        }
    }

    async fn dir_metadata(
        &self,
        absolute: &str,
        dir: &str,
    ) -> Result<FolderMetadata, StoreError> {
        let arg = GetMetadataArg {
            path: absolute.to_string(),
        };
        match self
            .inner
            .pacer
            .call(|| self.inner.srv.get_metadata(&arg))
            .await
        {
            Ok(Metadata::Folder(info)) => Ok(info),
            Ok(_) => Err(StoreError::NotADirectory {
                path: dir.to_string(),
            }),
            Err(DbxError::NotFound) => Err(StoreError::DirNotFound {
                path: dir.to_string(),
            }),
            Err(err) => Err(StoreError::api("get metadata", err)),
        }
    }

    pub(crate) async fn download(
        &self,
        remote: &str,
        extra_headers: Vec<(String, String)>,
    ) -> Result<Download, StoreError> {
        let arg = DownloadArg {
            path: self.inner.scope.absolute(remote),
            extra_headers,
        };
        match self.inner.pacer.call(|| self.inner.srv.download(&arg)).await {
            Ok(download) => Ok(download),
            Err(DbxError::RestrictedContent) => Err(StoreError::Restricted {
                path: remote.to_string(),
            }),
            Err(DbxError::NotFound) => Err(StoreError::ObjectNotFound {
                path: remote.to_string(),
            }),
            Err(err) => Err(StoreError::api("download", err)),
        }
    }

    /// Returns the committed entry, or `None` when the filename is on the
    /// service's ignore list and the upload was skipped.
    pub(crate) async fn upload_object<R>(
        &self,
        remote: &str,
        reader: &mut R,
        mod_time: OffsetDateTime,
        size: u64,
    ) -> Result<Option<FileMetadata>, StoreError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let absolute = self.inner.scope.absolute(remote);
        if self.inner.ignored.matches(&absolute) {
            tracing::warn!(path = %absolute, "file name disallowed by the service, not uploading");
            return Ok(None);
        }

        let commit = CommitInfo::overwrite(absolute, upload::round_mod_time(mod_time));
        upload::upload(&self.inner, reader, commit, size)
            .await
            .map(Some)
    }

    pub(crate) async fn remove_object(&self, remote: &str) -> Result<(), StoreError> {
        let arg = DeleteArg {
            path: self.inner.scope.absolute(remote),
        };
        self.inner
            .pacer
            .call_no_retry(|| self.inner.srv.delete(&arg))
            .await
            .map(|_| ())
            .map_err(|err| match err {
                DbxError::NotFound => StoreError::ObjectNotFound {
                    path: remote.to_string(),
                },
                err => StoreError::api("remove", err),
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum Relocate {
    Copy,
    Move,
}

impl Relocate {
    fn name(self) -> &'static str {
        match self {
            Relocate::Copy => "copy",
            Relocate::Move => "move",
        }
    }
}

impl fmt::Display for RemoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dropbox root '{}'", self.root())
    }
}
