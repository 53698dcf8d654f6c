use std::sync::{Mutex, PoisonError};

use dbx_core::{BodyStream, FileMetadata};
use time::OffsetDateTime;
use tokio::io::AsyncRead;

use crate::error::StoreError;
use crate::store::RemoteStore;

/// Fully resolved metadata for one remote object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub size: u64,
    pub mod_time: OffsetDateTime,
    pub content_hash: String,
}

impl From<&FileMetadata> for ObjectMeta {
    fn from(info: &FileMetadata) -> Self {
        Self {
            size: info.size,
            mod_time: info.client_modified,
            content_hash: info.content_hash.clone(),
        }
    }
}

#[derive(Debug)]
enum MetaState {
    Unloaded,
    Loaded(ObjectMeta),
    Failed(StoreError),
}

/// A single addressable object under a [`RemoteStore`].
///
/// Size, modification time and content hash are fetched on the first
/// access and never silently refreshed afterwards; only an explicit
/// update (upload, copy, move) replaces them.
#[derive(Debug)]
pub struct RemoteObject {
    store: RemoteStore,
    remote: String,
    meta: Mutex<MetaState>,
}

impl RemoteObject {
    pub(crate) fn with_meta(store: RemoteStore, remote: String, meta: ObjectMeta) -> Self {
        Self {
            store,
            remote,
            meta: Mutex::new(MetaState::Loaded(meta)),
        }
    }

    pub(crate) fn unloaded(store: RemoteStore, remote: String) -> Self {
        Self {
            store,
            remote,
            meta: Mutex::new(MetaState::Unloaded),
        }
    }

    /// The caller-visible path, relative to the store root.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn store(&self) -> &RemoteStore {
        &self.store
    }

    /// The object's metadata, fetched on first access.
    pub async fn metadata(&self) -> Result<ObjectMeta, StoreError> {
        if let Some(known) = self.cached() {
            return known;
        }

        let fetched = self.store.object_meta(&self.remote).await;

        let mut state = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            // A concurrent first access won the race; keep its value.
            MetaState::Loaded(meta) => Ok(meta.clone()),
            _ => match fetched {
                Ok(meta) => {
                    *state = MetaState::Loaded(meta.clone());
                    Ok(meta)
                }
                Err(err) => {
                    *state = MetaState::Failed(err.clone());
                    Err(err)
                }
            },
        }
    }

    pub async fn size(&self) -> Result<u64, StoreError> {
        Ok(self.metadata().await?.size)
    }

    pub async fn mod_time(&self) -> Result<OffsetDateTime, StoreError> {
        Ok(self.metadata().await?.mod_time)
    }

    pub async fn content_hash(&self) -> Result<String, StoreError> {
        Ok(self.metadata().await?.content_hash)
    }

    /// Open the object's content for reading.
    pub async fn open(&self) -> Result<BodyStream, StoreError> {
        self.open_with_headers(Vec::new()).await
    }

    /// Open with extra request headers passed through to the content
    /// endpoint, e.g. a byte range.
    pub async fn open_with_headers(
        &self,
        extra_headers: Vec<(String, String)>,
    ) -> Result<BodyStream, StoreError> {
        let download = self.store.download(&self.remote, extra_headers).await?;
        Ok(download.body)
    }

    /// Replace the object's content, updating size, time and hash from
    /// the committed entry.
    ///
    /// `size` must be the number of bytes `reader` will yield; it decides
    /// between a single upload call and a chunked session.
    pub async fn update<R>(
        &self,
        reader: &mut R,
        mod_time: OffsetDateTime,
        size: u64,
    ) -> Result<(), StoreError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        match self
            .store
            .upload_object(&self.remote, reader, mod_time, size)
            .await?
        {
            Some(entry) => {
                self.set_metadata((&entry).into());
                Ok(())
            }
            // Ignored filename; nothing was uploaded and nothing changed.
            None => Ok(()),
        }
    }

    pub async fn remove(&self) -> Result<(), StoreError> {
        self.store.remove_object(&self.remote).await
    }

    fn cached(&self) -> Option<Result<ObjectMeta, StoreError>> {
        match &*self.meta.lock().unwrap_or_else(PoisonError::into_inner) {
            MetaState::Unloaded => None,
            MetaState::Loaded(meta) => Some(Ok(meta.clone())),
            MetaState::Failed(err) => Some(Err(err.clone())),
        }
    }

    pub(crate) fn set_metadata(&self, meta: ObjectMeta) {
        *self.meta.lock().unwrap_or_else(PoisonError::into_inner) = MetaState::Loaded(meta);
    }
}
