//! Chunked upload handling.

pub mod assembler;
pub mod cleanup;
pub mod upload;

pub use assembler::{ChunkAssembler, MergedFile};
pub use cleanup::SessionSweeper;
pub use upload::{ChunkedUploadHandler, WrittenChunk};
