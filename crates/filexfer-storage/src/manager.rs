//! Storage manager: wires the storage components around one root and one
//! shared lock table.

use std::sync::Arc;

use filexfer_core::config::UploadConfig;

use crate::chunked::{ChunkAssembler, ChunkedUploadHandler, SessionSweeper};
use crate::files::FileStore;
use crate::layout::StorageRoot;
use crate::lock::LockTable;

/// Entry point to every storage operation.
#[derive(Debug, Clone)]
pub struct StorageManager {
    chunks: ChunkedUploadHandler,
    assembler: ChunkAssembler,
    files: FileStore,
    sweeper: SessionSweeper,
}

impl StorageManager {
    /// Build a storage manager over an opened root.
    pub fn new(root: Arc<StorageRoot>, upload: &UploadConfig) -> Self {
        let locks = Arc::new(LockTable::default());
        Self {
            chunks: ChunkedUploadHandler::new(Arc::clone(&root), Arc::clone(&locks)),
            assembler: ChunkAssembler::new(Arc::clone(&root), Arc::clone(&locks), upload),
            files: FileStore::new(Arc::clone(&root), Arc::clone(&locks)),
            sweeper: SessionSweeper::new(root, locks),
        }
    }

    /// Chunk writer.
    pub fn chunks(&self) -> &ChunkedUploadHandler {
        &self.chunks
    }

    /// Merge engine.
    pub fn assembler(&self) -> &ChunkAssembler {
        &self.assembler
    }

    /// Finished files.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Abandoned session cleanup.
    pub fn sweeper(&self) -> &SessionSweeper {
        &self.sweeper
    }
}
