//! # filexfer-storage
//!
//! Filesystem side of filexfer: the storage root layout, chunk writes,
//! chunk merging, listing and single-shot uploads, plus the per-key lock
//! table that serializes work on the same upload session or file.

pub mod chunked;
pub mod files;
pub mod layout;
pub mod lock;
pub mod manager;
pub mod transfer;

pub use chunked::{ChunkAssembler, ChunkedUploadHandler, MergedFile, SessionSweeper, WrittenChunk};
pub use files::{FileStore, StoredFile};
pub use layout::StorageRoot;
pub use lock::{KeyGuard, KeyedLocks, LockTable};
pub use manager::StorageManager;
