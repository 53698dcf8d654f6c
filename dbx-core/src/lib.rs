mod error;
mod files;

pub use error::{DbxError, ErrorClass};
pub use files::{
    BodyStream, CommitInfo, CreateFolderArg, DeleteArg, DeletedMetadata, Download, DownloadArg,
    FileMetadata, FilesApi, FolderMetadata, GetMetadataArg, ListFolderArg, ListFolderContinueArg,
    ListFolderResult, Metadata, RelocationArg, UploadSessionAppendArg, UploadSessionCursor,
    UploadSessionFinishArg, UploadSessionStartResult, WriteMode,
};
