//! A small retrieval-augmented knowledge base for the recommendation stage.
//!
//! Agronomy notes (fertiliser doses, crop requirements, amendment guides) are
//! split into paragraph chunks, embedded once, and kept in memory. A query is
//! embedded and ranked against every chunk by cosine similarity; a few hundred
//! chunks is the expected size, so a linear scan is plenty.
//!
//! [`KnowledgeBase::index_directory`] reads `.md` / `.txt` files. The index
//! can be saved to and reloaded from a JSON snapshot so embeddings are not
//! recomputed on every run.

use crate::error::SoilError;
use crate::model::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// File name of the persisted snapshot inside a knowledge directory.
pub const SNAPSHOT_FILE: &str = "index.json";

/// Largest chunk, in bytes, produced when splitting documents.
pub const MAX_CHUNK_BYTES: usize = 1200;

/// A retrieved text passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Chunk identifier (`<file>#<n>`).
    pub id: String,
    pub text: String,
    /// Cosine similarity to the query (1.0 = identical).
    pub score: f32,
}

/// Source of context passages for the recommendation prompt.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, SoilError>;
}

/// Retriever that never returns anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetriever;

#[async_trait]
impl Retriever for NoRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, SoilError> {
        Ok(Vec::new())
    }
}

/// Retriever returning a fixed list of passages, best first.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    passages: Vec<String>,
}

impl StaticRetriever {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: passages.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<Passage>, SoilError> {
        Ok(self
            .passages
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(i, text)| Passage {
                id: format!("static#{i}"),
                text: text.clone(),
                score: 1.0,
            })
            .collect())
    }
}

/// A stored chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

/// In-memory vector store over agronomy notes.
pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("entries", &self.len())
            .finish()
    }
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Load `dir/index.json` when present, otherwise index the directory's
    /// text files and write the snapshot for next time.
    pub async fn open(embedder: Arc<dyn Embedder>, dir: &Path) -> Result<Self, SoilError> {
        let kb = Self::new(embedder);
        let snapshot = dir.join(SNAPSHOT_FILE);
        if snapshot.exists() {
            let n = kb.load(&snapshot).await?;
            info!("Loaded {} knowledge chunks from {}", n, snapshot.display());
            return Ok(kb);
        }
        let n = kb.index_directory(dir).await?;
        info!("Indexed {} knowledge chunks from {}", n, dir.display());
        if n > 0 {
            kb.save(&snapshot).await?;
        }
        Ok(kb)
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chunk, embed and upsert one document. Returns the number of chunks.
    pub async fn add_document(
        &self,
        id: &str,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<usize, SoilError> {
        let chunks = chunk_paragraphs(text, MAX_CHUNK_BYTES);
        if chunks.is_empty() {
            return Ok(0);
        }
        let embeddings = self.embedder.embed(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(SoilError::EmbeddingFailed(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let count = chunks.len();
        for (i, (text, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            self.upsert(KnowledgeEntry {
                id: format!("{id}#{i}"),
                text,
                metadata: metadata.clone(),
                embedding,
            })?;
        }
        debug!("Added '{}' as {} chunks", id, count);
        Ok(count)
    }

    /// Insert an entry, replacing any entry with the same id.
    pub fn upsert(&self, entry: KnowledgeEntry) -> Result<(), SoilError> {
        let mut entries = self.write_entries()?;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Remove every chunk whose id is `id` or starts with `id#`.
    /// Returns true if something was removed.
    pub fn delete(&self, id: &str) -> Result<bool, SoilError> {
        let prefix = format!("{id}#");
        let mut entries = self.write_entries()?;
        let before = entries.len();
        entries.retain(|e| e.id != id && !e.id.starts_with(&prefix));
        Ok(entries.len() != before)
    }

    /// Index every `.md` / `.txt` file directly inside `dir`.
    /// Returns the number of chunks added.
    pub async fn index_directory(&self, dir: &Path) -> Result<usize, SoilError> {
        let files = collect_text_files(dir).await?;
        let mut total = 0;
        for path in files {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| kb_error(&path, e))?;
            let id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let mut metadata = BTreeMap::new();
            metadata.insert("path".to_string(), path.display().to_string());
            total += self.add_document(&id, &text, metadata).await?;
        }
        Ok(total)
    }

    /// Rank every chunk against `query`.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, SoilError> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors
            .into_iter()
            .next()
            .ok_or_else(|| SoilError::EmbeddingFailed("no vector returned for query".into()))?;

        let entries = self.read_entries()?;
        let mut scored: Vec<Passage> = entries
            .iter()
            .map(|e| Passage {
                id: e.id.clone(),
                text: e.text.clone(),
                score: cosine_similarity(&e.embedding, &query_vec),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Write every entry to a JSON snapshot.
    pub async fn save(&self, path: &Path) -> Result<(), SoilError> {
        let payload = {
            let entries = self.read_entries()?;
            serde_json::to_string(&*entries).map_err(|e| kb_error(path, e))?
        };
        tokio::fs::write(path, payload)
            .await
            .map_err(|e| SoilError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Load entries from a JSON snapshot. Returns the number loaded.
    pub async fn load(&self, path: &Path) -> Result<usize, SoilError> {
        let payload = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| kb_error(path, e))?;
        let loaded: Vec<KnowledgeEntry> =
            serde_json::from_str(&payload).map_err(|e| kb_error(path, e))?;
        let count = loaded.len();
        for entry in loaded {
            self.upsert(entry)?;
        }
        Ok(count)
    }

    fn read_entries(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<KnowledgeEntry>>, SoilError> {
        self.entries
            .read()
            .map_err(|_| SoilError::Internal("knowledge index poisoned".into()))
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Vec<KnowledgeEntry>>, SoilError> {
        self.entries
            .write()
            .map_err(|_| SoilError::Internal("knowledge index poisoned".into()))
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, SoilError> {
        self.search(query, top_k).await
    }
}

fn kb_error(path: &Path, e: impl std::fmt::Display) -> SoilError {
    SoilError::KnowledgeBase {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

async fn collect_text_files(dir: &Path) -> Result<Vec<PathBuf>, SoilError> {
    let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| kb_error(dir, e))?;
    let mut files = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| kb_error(dir, e))? {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("txt"));
        if is_text && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Split on blank lines; paragraphs longer than `max_bytes` are split on
/// whitespace.
pub fn chunk_paragraphs(text: &str, max_bytes: usize) -> Vec<String> {
    let normalised = text.replace("\r\n", "\n");
    let mut chunks = Vec::new();
    for block in normalised.split("\n\n") {
        let paragraph = block.trim();
        if paragraph.is_empty() {
            continue;
        }
        if paragraph.len() <= max_bytes {
            chunks.push(paragraph.to_string());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > max_bytes {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
    chunks
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bag-of-keywords embedder: one dimension per keyword.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 4] = ["chaux", "compost", "maïs", "azote"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SoilError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    KEYWORDS
                        .iter()
                        .map(|k| lower.matches(k).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn kb() -> KnowledgeBase {
        KnowledgeBase::new(Arc::new(KeywordEmbedder))
    }

    #[test]
    fn chunking_splits_paragraphs() {
        let chunks = chunk_paragraphs("Un.\n\n\n Deux. \r\n\r\nTrois.", 100);
        assert_eq!(chunks, ["Un.", "Deux.", "Trois."]);
    }

    #[test]
    fn chunking_splits_long_paragraphs_on_words() {
        let text = "éléments ".repeat(50);
        let chunks = chunk_paragraphs(&text, 40);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 40), "{chunks:?}");
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let kb = kb();
        kb.add_document(
            "guide.md",
            "Apporter de la chaux sur sol acide.\n\nLe compost améliore la matière organique.\n\nLe maïs demande de l'azote.",
            BTreeMap::new(),
        )
        .await
        .unwrap();
        assert_eq!(kb.len(), 3);

        let hits = kb.search("sol acide: chaux", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "guide.md#0");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_removes() {
        let kb = kb();
        kb.add_document("a", "compost", BTreeMap::new()).await.unwrap();
        kb.add_document("a", "chaux", BTreeMap::new()).await.unwrap();
        assert_eq!(kb.len(), 1);
        assert!(kb.delete("a").unwrap());
        assert!(kb.is_empty());
        assert!(!kb.delete("a").unwrap());
    }

    #[tokio::test]
    async fn empty_base_returns_nothing() {
        assert!(kb().retrieve("chaux", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip_and_directory_indexing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chaulage.md"), "La chaux corrige l'acidité.").unwrap();
        std::fs::write(dir.path().join("mais.txt"), "Le maïs aime l'azote.").unwrap();
        std::fs::write(dir.path().join("ignore.pdf"), "%PDF").unwrap();

        let first = KnowledgeBase::open(Arc::new(KeywordEmbedder), dir.path())
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(dir.path().join(SNAPSHOT_FILE).exists());

        let second = KnowledgeBase::open(Arc::new(KeywordEmbedder), dir.path())
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        let hits = second.search("maïs", 1).await.unwrap();
        assert_eq!(hits[0].id, "mais.txt#0");
    }

    #[tokio::test]
    async fn static_retriever_respects_top_k() {
        let r = StaticRetriever::new(["a", "b", "c"]);
        let hits = r.retrieve("anything", 2).await.unwrap();
        assert_eq!(hits.iter().map(|p| p.text.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }
}
