//! Backing-store abstraction.
//!
//! The gateway talks to the hierarchical object store through this trait.
//! Paths are absolute backing-store paths (`<bucket_path>/<bucket>/<key>`).

use time::OffsetDateTime;

use crate::http::Body;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory.
#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub name: String,
    pub kind: EntryKind,
    pub mtime: OffsetDateTime,
    pub size: u64,
    pub durability: Option<u32>,
}

/// Metadata for a single entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub mtime: Option<OffsetDateTime>,
    pub content_type: Option<String>,
    /// Base64-encoded MD5 of the content, when the store knows it.
    pub content_md5: Option<String>,
    pub durability: Option<u32>,
    /// User metadata stored alongside the entry.
    pub metadata: Vec<(String, String)>,
}

impl EntryInfo {
    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            size: None,
            mtime: None,
            content_type: None,
            content_md5: None,
            durability: None,
            metadata: Vec::new(),
        }
    }
}

/// Options attached to an upload.
#[derive(Debug, Default, Clone)]
pub struct PutOptions {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub content_md5: Option<String>,
    pub durability: Option<u32>,
    pub metadata: Vec<(String, String)>,
}

/// Result of a completed upload.
#[derive(Debug, Default, Clone)]
pub struct PutOutcome {
    /// Base64-encoded MD5 the store computed for the content.
    pub content_md5: Option<String>,
}

/// An object returned as a byte stream plus its metadata.
pub struct ObjectStream {
    pub info: EntryInfo,
    pub body: Body,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} was not found")]
    NotFound(String),
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StorageError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Asynchronous interface to the backing object store.
///
/// All consistency questions (concurrent delete-vs-list and the like) are
/// the store's responsibility; the gateway issues one logical call per
/// operation and performs no retries.
#[async_trait::async_trait]
pub trait StorageGateway: Send + Sync + 'static {
    /// Lists the direct children of a directory.
    async fn list(&self, path: &str) -> StorageResult<Vec<StorageEntry>>;

    /// Stats a single entry.
    async fn stat(&self, path: &str) -> StorageResult<EntryInfo>;

    /// Creates a directory and any missing parents.
    async fn mkdir_recursive(&self, path: &str) -> StorageResult<()>;

    /// Streams an object into the store.
    async fn put_stream(&self, path: &str, body: Body, opts: PutOptions) -> StorageResult<PutOutcome>;

    /// Streams an object out of the store.
    async fn get_stream(&self, path: &str) -> StorageResult<ObjectStream>;

    /// Removes a single file.
    async fn unlink(&self, path: &str) -> StorageResult<()>;

    /// Removes a directory tree.
    async fn remove_recursive(&self, path: &str) -> StorageResult<()>;

    /// Creates `dst` as a hard link to `src` without copying bytes.
    async fn hard_link(&self, src: &str, dst: &str) -> StorageResult<()>;
}
