use bytes::Bytes;
use dbx_core::{
    CommitInfo, FileMetadata, UploadSessionAppendArg, UploadSessionCursor, UploadSessionFinishArg,
};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StoreError;
use crate::store::StoreInner;

/// Upload `size` bytes from `reader` to the committed path, as a single
/// call when it fits in one chunk and as a start/append/finish session
/// otherwise.
///
/// Every call is paced but issued exactly once: the reader has already
/// advanced past acknowledged bytes, so a mid-session failure is fatal to
/// this attempt and the caller must restart from a fresh reader.
pub(crate) async fn upload<R>(
    inner: &StoreInner,
    reader: &mut R,
    commit: CommitInfo,
    size: u64,
) -> Result<FileMetadata, StoreError>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    if size > inner.chunk_size {
        return upload_chunked(inner, reader, commit, size).await;
    }

    let body = read_remainder(reader).await?;
    inner
        .pacer
        .call_no_retry(|| inner.srv.upload(&commit, body.clone()))
        .await
        .map_err(|err| StoreError::api("upload", err))
}

async fn upload_chunked<R>(
    inner: &StoreInner,
    reader: &mut R,
    commit: CommitInfo,
    size: u64,
) -> Result<FileMetadata, StoreError>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let chunk_size = inner.chunk_size;
    let chunks = size / chunk_size + 1;

    tracing::debug!(path = %commit.path, chunk = 1, chunks, "uploading chunk");
    let first = read_chunk(reader, chunk_size).await?;
    let started = inner
        .pacer
        .call_no_retry(|| inner.srv.upload_session_start(first.clone()))
        .await
        .map_err(|err| StoreError::api("upload session start", err))?;

    let mut cursor = UploadSessionCursor {
        session_id: started.session_id,
        offset: chunk_size,
    };

    // Whole chunks between the first and the last.
    for chunk in 2..chunks {
        tracing::debug!(path = %commit.path, chunk, chunks, "uploading chunk");
        let body = read_chunk(reader, chunk_size).await?;
        let arg = UploadSessionAppendArg {
            cursor: cursor.clone(),
            close: false,
        };
        inner
            .pacer
            .call_no_retry(|| inner.srv.upload_session_append(&arg, body.clone()))
            .await
            .map_err(|err| StoreError::api("upload session append", err))?;
        cursor.offset += chunk_size;
    }

    tracing::debug!(path = %commit.path, chunk = chunks, chunks, "uploading chunk");
    let rest = read_remainder(reader).await?;
    let finish = UploadSessionFinishArg { cursor, commit };
    inner
        .pacer
        .call_no_retry(|| inner.srv.upload_session_finish(&finish, rest.clone()))
        .await
        .map_err(|err| StoreError::api("upload session finish", err))
}

/// The service keeps client timestamps in UTC with whole-second
/// precision; round to the nearest second before committing.
pub(crate) fn round_mod_time(mod_time: OffsetDateTime) -> OffsetDateTime {
    let utc = mod_time.to_offset(time::UtcOffset::UTC);
    let rounded = if utc.nanosecond() >= 500_000_000 {
        utc + time::Duration::SECOND
    } else {
        utc
    };
    rounded
        .replace_nanosecond(0)
        .expect("zero nanoseconds is in range")
}

/// Reads exactly `limit` bytes, or to the end of the reader if it is
/// shorter.
async fn read_chunk<R>(reader: &mut R, limit: u64) -> Result<Bytes, StoreError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    (&mut *reader)
        .take(limit)
        .read_to_end(&mut buf)
        .await
        .map_err(StoreError::read)?;
    Ok(buf.into())
}

async fn read_remainder<R>(reader: &mut R) -> Result<Bytes, StoreError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.map_err(StoreError::read)?;
    Ok(buf.into())
}
