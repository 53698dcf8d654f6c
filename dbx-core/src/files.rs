use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::io::AsyncRead;

use crate::error::DbxError;

/// Streaming download body handed back by the transport.
pub type BodyStream = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    /// Cased path for display purposes. Only the final component is
    /// guaranteed to match the user's casing.
    pub path_display: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub client_modified: OffsetDateTime,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    pub path_display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedMetadata {
    pub name: String,
    pub path_display: String,
}

/// One namespace entry, discriminated the way the wire does it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMetadataArg {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFolderArg {
    /// The namespace root is addressed as the empty string.
    pub path: String,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFolderContinueArg {
    pub cursor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderArg {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteArg {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationArg {
    pub from_path: String,
    pub to_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadArg {
    pub path: String,
    /// Extra request headers passed through to the content endpoint,
    /// e.g. a byte range.
    pub extra_headers: Vec<(String, String)>,
}

impl DownloadArg {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra_headers: Vec::new(),
        }
    }
}

/// A successful download: the entry's metadata plus its content stream.
pub struct Download {
    pub metadata: FileMetadata,
    pub body: BodyStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Add,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub path: String,
    pub mode: WriteMode,
    /// The service keeps client timestamps in UTC with whole-second
    /// precision; senders must round before committing.
    #[serde(with = "time::serde::rfc3339")]
    pub client_modified: OffsetDateTime,
}

impl CommitInfo {
    pub fn overwrite(path: impl Into<String>, client_modified: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            mode: WriteMode::Overwrite,
            client_modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSessionStartResult {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSessionCursor {
    pub session_id: String,
    /// Bytes acknowledged by the service so far.
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSessionAppendArg {
    pub cursor: UploadSessionCursor,
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSessionFinishArg {
    pub cursor: UploadSessionCursor,
    pub commit: CommitInfo,
}

/// The files endpoint family of the service, as exposed by an
/// already-authenticated transport.
///
/// Implementations own the HTTP plumbing and wire encoding; callers only
/// see typed arguments, typed results and [`DbxError`].
#[async_trait]
pub trait FilesApi: Send + Sync {
    async fn get_metadata(&self, arg: &GetMetadataArg) -> Result<Metadata, DbxError>;

    async fn list_folder(&self, arg: &ListFolderArg) -> Result<ListFolderResult, DbxError>;

    async fn list_folder_continue(
        &self,
        arg: &ListFolderContinueArg,
    ) -> Result<ListFolderResult, DbxError>;

    async fn create_folder(&self, arg: &CreateFolderArg) -> Result<FolderMetadata, DbxError>;

    async fn delete(&self, arg: &DeleteArg) -> Result<Metadata, DbxError>;

    async fn copy_path(&self, arg: &RelocationArg) -> Result<Metadata, DbxError>;

    async fn move_path(&self, arg: &RelocationArg) -> Result<Metadata, DbxError>;

    async fn download(&self, arg: &DownloadArg) -> Result<Download, DbxError>;

    async fn upload(&self, commit: &CommitInfo, body: Bytes) -> Result<FileMetadata, DbxError>;

    async fn upload_session_start(&self, body: Bytes)
    -> Result<UploadSessionStartResult, DbxError>;

    async fn upload_session_append(
        &self,
        arg: &UploadSessionAppendArg,
        body: Bytes,
    ) -> Result<(), DbxError>;

    async fn upload_session_finish(
        &self,
        arg: &UploadSessionFinishArg,
        body: Bytes,
    ) -> Result<FileMetadata, DbxError>;
}
