//! Filesystem storage for files attached to chat messages.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file exceeds configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Path relative to the storage root.
    pub stored_path: String,
    pub size_bytes: u64,
}

/// Filesystem-backed upload storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the provided payload and return where it landed and how large it is.
    ///
    /// The payload is streamed to disk to avoid buffering large files in memory.
    /// Empty files are accepted.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredUpload, UploadStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        let stored_path = build_stored_path(original_name, now_millis());
        let absolute = self.root.join(&stored_path);

        let mut file = fs::File::create(&absolute).await?;
        let mut total_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(UploadStorageError::SizeOverflow)?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(StoredUpload {
            stored_path,
            size_bytes: total_bytes,
        })
    }

    /// Store a fully-buffered payload. Intended for tests and small assets.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        let stream = stream::once(async move { Ok::<_, UploadStorageError>(data) });
        self.store_stream(original_name, stream).await
    }
}

fn now_millis() -> i128 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/// `{millis}-{slug}.{ext}`, flat under the storage root.
fn build_stored_path(original_name: &str, millis: i128) -> String {
    format!("{millis}-{}", sanitize_filename(original_name))
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_path_is_prefixed_with_timestamp() {
        assert_eq!(
            build_stored_path("My Report.PDF", 1_700_000_000_123),
            "1700000000123-my-report.pdf"
        );
    }

    #[test]
    fn traversal_components_are_flattened() {
        let name = sanitize_filename("../../etc/passwd");
        assert_eq!(name, "passwd");
    }

    #[test]
    fn unnamed_uploads_get_a_placeholder() {
        assert_eq!(sanitize_filename("???"), "upload");
    }

    #[tokio::test]
    async fn store_writes_payload_and_reports_size() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("notes.txt", Bytes::from_static(b"hello world"))
            .await
            .expect("stored");

        assert_eq!(stored.size_bytes, 11);
        assert!(stored.stored_path.ends_with("-notes.txt"));
        let contents = std::fs::read(dir.path().join(&stored.stored_path)).expect("file exists");
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn failed_stream_removes_partial_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(UploadStorageError::PayloadStream {
                source: "connection reset".into(),
            }),
        ];
        let result = storage.store_stream("data.bin", stream::iter(chunks)).await;

        assert!(matches!(result, Err(UploadStorageError::PayloadStream { .. })));
        let remaining = std::fs::read_dir(dir.path()).expect("dir readable").count();
        assert_eq!(remaining, 0);
    }
}
