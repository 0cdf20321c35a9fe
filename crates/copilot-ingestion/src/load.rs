//! Load stage: fetch file bytes, verify integrity, classify MIME type
//! (spec §4.1).

use crate::config::BUFFER_THRESHOLD_BYTES;
use crate::error::{PipelineError, Result};
use crate::types::{FileDescriptor, FileLocation, LoadMethod};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Source of file bytes. Implementations talk to whatever object store
/// backs a deployment; the pipeline only depends on this trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn open_stream(&self, path: &str) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}

/// MIME types the pipeline can parse (spec §4.1, §7).
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/markdown",
];

/// Output of the Load stage: raw bytes plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file_id: String,
    pub document_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub checksum: String,
    pub method: LoadMethod,
}

/// Runs the Load stage for one file descriptor.
///
/// Buffers in memory below `BUFFER_THRESHOLD_BYTES`; above it, reads via
/// the streaming path instead (spec §4.1 buffer/stream split). MIME type
/// is sniffed from the bytes and checked against the declared type; a
/// mismatch is logged but does not fail the load, since `infer` wins.
#[instrument(skip(store, descriptor), fields(file_id = %descriptor.file_id))]
pub async fn load(store: &dyn ObjectStore, descriptor: &FileDescriptor) -> Result<LoadedFile> {
    let method = if descriptor.size > BUFFER_THRESHOLD_BYTES {
        LoadMethod::Stream
    } else {
        LoadMethod::Buffer
    };

    let bytes = match &descriptor.location {
        FileLocation::Buffer(bytes) => bytes.clone(),
        FileLocation::Path(path) => match method {
            LoadMethod::Buffer => store.read(path).await?,
            LoadMethod::Stream => read_stream(store, path).await?,
        },
    };

    if bytes.is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let checksum = format!("{:x}", md5::compute(&bytes));
    let mime_type = classify_mime(&bytes, descriptor.declared_mime_type.as_deref());

    if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(PipelineError::UnsupportedFormat(mime_type));
    }

    debug!(mime_type = %mime_type, checksum = %checksum, size = bytes.len(), "loaded file");

    Ok(LoadedFile {
        file_id: descriptor.file_id.clone(),
        document_id: descriptor.document_id.clone(),
        filename: descriptor.filename.clone(),
        bytes,
        mime_type,
        checksum,
        method,
    })
}

async fn read_stream(store: &dyn ObjectStore, path: &str) -> Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut reader = store.open_stream(path).await?;
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(PipelineError::Io)?;
    Ok(buf)
}

/// Sniffs the MIME type from magic bytes via `infer`, preferring the
/// declared type only when sniffing yields nothing (spec §4.1: declared
/// type is a hint, not authoritative).
fn classify_mime(bytes: &[u8], declared: Option<&str>) -> String {
    match infer::get(bytes) {
        Some(kind) => {
            let sniffed = kind.mime_type().to_string();
            if let Some(declared) = declared {
                if declared != sniffed {
                    warn!(declared, sniffed = %sniffed, "declared MIME type disagrees with sniffed type");
                }
            }
            sniffed
        }
        None => declared
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileDescriptor;

    struct NullStore;

    #[async_trait]
    impl ObjectStore for NullStore {
        async fn read(&self, _path: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn open_stream(
            &self,
            _path: &str,
        ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(PipelineError::StorageTerminal("not implemented".to_string()))
        }
    }

    fn descriptor(location: FileLocation, size: u64) -> FileDescriptor {
        FileDescriptor {
            file_id: "file-1".to_string(),
            document_id: "doc-1".to_string(),
            filename: "note.md".to_string(),
            declared_mime_type: Some("text/markdown".to_string()),
            size,
            location,
        }
    }

    #[tokio::test]
    async fn empty_buffer_is_rejected() {
        let store = NullStore;
        let desc = descriptor(FileLocation::Buffer(Vec::new()), 0);
        let err = load(&store, &desc).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDocument));
    }

    #[tokio::test]
    async fn plain_text_buffer_loads_with_checksum() {
        let store = NullStore;
        let bytes = b"# Hello\n\nWorld.".to_vec();
        let desc = descriptor(FileLocation::Buffer(bytes.clone()), bytes.len() as u64);
        let loaded = load(&store, &desc).await.unwrap();
        assert_eq!(loaded.method, LoadMethod::Buffer);
        assert_eq!(loaded.checksum, format!("{:x}", md5::compute(&bytes)));
    }

    #[tokio::test]
    async fn unsupported_mime_is_rejected() {
        let store = NullStore;
        let mut desc = descriptor(FileLocation::Buffer(vec![0xFF, 0xD8, 0xFF, 0xE0]), 4);
        desc.declared_mime_type = Some("image/jpeg".to_string());
        desc.filename = "photo.jpg".to_string();
        let err = load(&store, &desc).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }

    struct StreamingStore {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl ObjectStore for StreamingStore {
        async fn read(&self, _path: &str) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
        async fn open_stream(
            &self,
            _path: &str,
        ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Ok(Box::new(std::io::Cursor::new(self.bytes.clone())))
        }
    }

    #[tokio::test]
    async fn large_descriptor_selects_stream_method() {
        let bytes = b"# Heading\n\nBody text.".to_vec();
        let store = StreamingStore { bytes: bytes.clone() };
        let desc = FileDescriptor {
            file_id: "file-1".to_string(),
            document_id: "doc-1".to_string(),
            filename: "note.md".to_string(),
            declared_mime_type: Some("text/markdown".to_string()),
            size: BUFFER_THRESHOLD_BYTES + 1,
            location: FileLocation::Path("note.md".to_string()),
        };
        let loaded = load(&store, &desc).await.unwrap();
        assert_eq!(loaded.method, LoadMethod::Stream);
        assert_eq!(loaded.bytes, bytes);
    }
}
