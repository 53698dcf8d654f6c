#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dbx_core::{
    CommitInfo, CreateFolderArg, DbxError, DeleteArg, DeletedMetadata, Download, DownloadArg,
    FileMetadata, FilesApi, FolderMetadata, GetMetadataArg, ListFolderArg, ListFolderContinueArg,
    ListFolderResult, Metadata, RelocationArg, UploadSessionAppendArg, UploadSessionFinishArg,
    UploadSessionStartResult,
};
use dbx_store::{PacerConfig, RemoteStore, RootKind, StoreConfig};
use time::OffsetDateTime;

/// Scripted in-memory stand-in for the files service transport.
///
/// Tests seed the namespace and listing pages up front, optionally queue
/// failures per endpoint, and assert on the recorded call log afterwards.
#[derive(Default)]
pub struct FakeFiles {
    entries: Mutex<HashMap<String, Metadata>>,
    list_pages: Mutex<HashMap<String, ListFolderResult>>,
    continue_pages: Mutex<HashMap<String, ListFolderResult>>,
    fail_queue: Mutex<HashMap<&'static str, VecDeque<DbxError>>>,
    download_body: Mutex<Vec<u8>>,
    calls: Mutex<Vec<String>>,
    pub commits: Mutex<Vec<CommitInfo>>,
    pub upload_bodies: Mutex<Vec<Vec<u8>>>,
    pub session_starts: Mutex<Vec<Vec<u8>>>,
    pub session_appends: Mutex<Vec<(u64, Vec<u8>)>>,
    pub session_finishes: Mutex<Vec<(u64, Vec<u8>)>>,
}

impl FakeFiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_file(&self, path: &str, size: u64) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_string(), file_entry(path, size));
    }

    pub fn insert_folder(&self, path: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_string(), folder_entry(path));
    }

    pub fn script_page(&self, path: &str, page: ListFolderResult) {
        self.list_pages
            .lock()
            .unwrap()
            .insert(path.to_string(), page);
    }

    pub fn script_continue(&self, cursor: &str, page: ListFolderResult) {
        self.continue_pages
            .lock()
            .unwrap()
            .insert(cursor.to_string(), page);
    }

    pub fn fail_next(&self, op: &'static str, err: DbxError) {
        self.fail_queue
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn set_download_body(&self, body: &[u8]) {
        *self.download_body.lock().unwrap() = body.to_vec();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_failure(&self, op: &'static str) -> Result<(), DbxError> {
        let err = self
            .fail_queue
            .lock()
            .unwrap()
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FilesApi for FakeFiles {
    async fn get_metadata(&self, arg: &GetMetadataArg) -> Result<Metadata, DbxError> {
        self.record(format!("get_metadata {}", arg.path));
        self.take_failure("get_metadata")?;
        self.entries
            .lock()
            .unwrap()
            .get(&arg.path)
            .cloned()
            .ok_or(DbxError::NotFound)
    }

    async fn list_folder(&self, arg: &ListFolderArg) -> Result<ListFolderResult, DbxError> {
        self.record(format!("list_folder {}", arg.path));
        self.take_failure("list_folder")?;
        self.list_pages
            .lock()
            .unwrap()
            .get(&arg.path)
            .cloned()
            .ok_or(DbxError::NotFound)
    }

    async fn list_folder_continue(
        &self,
        arg: &ListFolderContinueArg,
    ) -> Result<ListFolderResult, DbxError> {
        self.record(format!("list_folder_continue {}", arg.cursor));
        self.take_failure("list_folder_continue")?;
        self.continue_pages
            .lock()
            .unwrap()
            .get(&arg.cursor)
            .cloned()
            .ok_or_else(|| DbxError::Other(format!("unknown cursor {}", arg.cursor)))
    }

    async fn create_folder(&self, arg: &CreateFolderArg) -> Result<FolderMetadata, DbxError> {
        self.record(format!("create_folder {}", arg.path));
        self.take_failure("create_folder")?;
        Ok(FolderMetadata {
            name: basename(&arg.path),
            path_display: arg.path.clone(),
        })
    }

    async fn delete(&self, arg: &DeleteArg) -> Result<Metadata, DbxError> {
        self.record(format!("delete {}", arg.path));
        self.take_failure("delete")?;
        Ok(folder_entry(&arg.path))
    }

    async fn copy_path(&self, arg: &RelocationArg) -> Result<Metadata, DbxError> {
        self.record(format!("copy {} -> {}", arg.from_path, arg.to_path));
        self.take_failure("copy_path")?;
        Ok(file_entry(&arg.to_path, 0))
    }

    async fn move_path(&self, arg: &RelocationArg) -> Result<Metadata, DbxError> {
        self.record(format!("move {} -> {}", arg.from_path, arg.to_path));
        self.take_failure("move_path")?;
        Ok(file_entry(&arg.to_path, 0))
    }

    async fn download(&self, arg: &DownloadArg) -> Result<Download, DbxError> {
        self.record(format!("download {}", arg.path));
        self.take_failure("download")?;
        let metadata = match self.entries.lock().unwrap().get(&arg.path) {
            Some(Metadata::File(info)) => info.clone(),
            _ => return Err(DbxError::NotFound),
        };
        let body = self.download_body.lock().unwrap().clone();
        Ok(Download {
            metadata,
            body: Box::new(std::io::Cursor::new(body)),
        })
    }

    async fn upload(&self, commit: &CommitInfo, body: Bytes) -> Result<FileMetadata, DbxError> {
        self.record(format!("upload {}", commit.path));
        self.take_failure("upload")?;
        self.commits.lock().unwrap().push(commit.clone());
        let size = body.len() as u64;
        self.upload_bodies.lock().unwrap().push(body.to_vec());
        Ok(committed_file(commit, size))
    }

    async fn upload_session_start(
        &self,
        body: Bytes,
    ) -> Result<UploadSessionStartResult, DbxError> {
        self.record(format!("session_start len={}", body.len()));
        self.take_failure("upload_session_start")?;
        self.session_starts.lock().unwrap().push(body.to_vec());
        Ok(UploadSessionStartResult {
            session_id: "sess-1".into(),
        })
    }

    async fn upload_session_append(
        &self,
        arg: &UploadSessionAppendArg,
        body: Bytes,
    ) -> Result<(), DbxError> {
        self.record(format!(
            "session_append {} offset={} len={}",
            arg.cursor.session_id,
            arg.cursor.offset,
            body.len()
        ));
        self.take_failure("upload_session_append")?;
        self.session_appends
            .lock()
            .unwrap()
            .push((arg.cursor.offset, body.to_vec()));
        Ok(())
    }

    async fn upload_session_finish(
        &self,
        arg: &UploadSessionFinishArg,
        body: Bytes,
    ) -> Result<FileMetadata, DbxError> {
        self.record(format!(
            "session_finish {} offset={} len={}",
            arg.cursor.session_id,
            arg.cursor.offset,
            body.len()
        ));
        self.take_failure("upload_session_finish")?;
        let size = arg.cursor.offset + body.len() as u64;
        self.session_finishes
            .lock()
            .unwrap()
            .push((arg.cursor.offset, body.to_vec()));
        self.commits.lock().unwrap().push(arg.commit.clone());
        Ok(committed_file(&arg.commit, size))
    }
}

pub fn file_entry(path: &str, size: u64) -> Metadata {
    Metadata::File(FileMetadata {
        name: basename(path),
        path_display: path.to_string(),
        size,
        client_modified: OffsetDateTime::UNIX_EPOCH,
        content_hash: format!("hash-{}", basename(path)),
    })
}

pub fn folder_entry(path: &str) -> Metadata {
    Metadata::Folder(FolderMetadata {
        name: basename(path),
        path_display: path.to_string(),
    })
}

pub fn deleted_entry(path: &str) -> Metadata {
    Metadata::Deleted(DeletedMetadata {
        name: basename(path),
        path_display: path.to_string(),
    })
}

pub fn page(entries: Vec<Metadata>, cursor: &str, has_more: bool) -> ListFolderResult {
    ListFolderResult {
        entries,
        cursor: cursor.to_string(),
        has_more,
    }
}

fn committed_file(commit: &CommitInfo, size: u64) -> FileMetadata {
    FileMetadata {
        name: basename(&commit.path),
        path_display: commit.path.clone(),
        size,
        client_modified: commit.client_modified,
        content_hash: "hash-committed".into(),
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Store config with a zero-delay pacer so tests never sleep.
pub fn fast_config(root: &str) -> StoreConfig {
    let mut config = StoreConfig::new("test", root);
    config.pacer = PacerConfig {
        min_sleep: Duration::ZERO,
        max_sleep: Duration::from_millis(2),
        decay: 1,
        retries: 5,
    };
    config
}

pub async fn open_store(srv: &Arc<FakeFiles>, root: &str) -> RemoteStore {
    let (store, kind) = RemoteStore::open(fast_config(root), srv.clone())
        .await
        .expect("open store");
    assert_eq!(kind, RootKind::Directory);
    srv.clear_calls();
    store
}
