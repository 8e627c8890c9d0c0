//! Retrieval corpus infrastructure.
//!
//! Turns a directory of personal documents (résumé, cover letters) into a
//! vector index the feedback generator can retrieve from.
//!
//! # Architecture
//!
//! - `loader`: reads supported files (.txt/.md/.pdf/.docx) into raw text
//! - `splitter`: recursive character splitting into bounded chunks
//! - `embeddings`: wraps fastembed for local embedding generation
//! - `index`: in-memory vector index with cosine similarity search
//! - `service`: ties the above into build/query operations

pub mod embeddings;
mod index;
pub mod loader;
mod service;
mod splitter;

pub use embeddings::EmbeddingModel;
pub use loader::{load_directory, RawDocument};
pub use service::{Chunk, CorpusError, CorpusIndex, Retriever};
pub use splitter::TextSplitter;

/// Default embedding model (bge-base offers +13% accuracy vs MiniLM)
pub const DEFAULT_MODEL: &str = "bge-base-en-v1.5";

/// Default maximum chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 4;
