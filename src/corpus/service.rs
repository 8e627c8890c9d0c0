//! High-level corpus index: split, embed, retrieve.

use crate::corpus::embeddings::{EmbeddingError, EmbeddingModel};
use crate::corpus::index::{IndexError, VectorIndex};
use crate::corpus::loader::RawDocument;
use crate::corpus::splitter::TextSplitter;
use std::collections::HashMap;
use std::path::PathBuf;

/// A retrievable slice of a corpus document.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: u64,
    pub source: PathBuf,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Retrieval seam between the corpus and the feedback generator.
pub trait Retriever: Send + Sync {
    /// The `k` chunks most similar to `text`, best first.
    fn retrieve(&self, text: &str, k: usize) -> Result<Vec<Chunk>, CorpusError>;
}

/// An embedded corpus, ready for top-k retrieval.
///
/// Owns the embedding model so queries can be embedded with the same model
/// that produced the chunk vectors.
pub struct CorpusIndex {
    model: EmbeddingModel,
    index: VectorIndex,
    chunks: HashMap<u64, Chunk>,
}

impl CorpusIndex {
    /// Split and embed `documents` into a searchable index.
    ///
    /// An empty document set produces an empty (but queryable) index.
    pub fn build(
        model: EmbeddingModel,
        documents: &[RawDocument],
        splitter: &TextSplitter,
    ) -> Result<Self, CorpusError> {
        let mut chunks: Vec<Chunk> = vec![];
        for document in documents {
            for text in splitter.split(&document.text) {
                chunks.push(Chunk {
                    id: chunks.len() as u64,
                    source: document.path.clone(),
                    text,
                });
            }
        }

        let mut index = VectorIndex::with_capacity(model.dimensions(), chunks.len());

        if !chunks.is_empty() {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = model.embed_batch(&texts)?;

            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                if let Err(err) = index.insert(chunk.id, embedding) {
                    // a degenerate chunk embedding loses that chunk, not the corpus
                    log::warn!("chunk {} from {}: {err}", chunk.id, chunk.source.display());
                }
            }
        }

        log::info!(
            "corpus index built: {} chunks from {} documents",
            index.len(),
            documents.len()
        );

        Ok(Self {
            model,
            index,
            chunks: chunks.into_iter().map(|c| (c.id, c)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The `k` chunks most similar to `text`, best first.
    ///
    /// Querying an empty index returns an empty vec without touching the
    /// embedding model.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>, CorpusError> {
        if self.index.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self.model.embed(text)?;
        let hits = self.index.search(&query_embedding, k)?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| self.chunks.get(&hit.id).cloned())
            .collect())
    }
}

impl Retriever for CorpusIndex {
    fn retrieve(&self, text: &str, k: usize) -> Result<Vec<Chunk>, CorpusError> {
        self.query(text, k)
    }
}
