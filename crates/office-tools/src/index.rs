//! Office Document Index
//!
//! In-memory search over pre-chunked office documents. Chunks and query are
//! turned into term-frequency vectors and ranked by cosine similarity.
//! Building the chunk file is someone else's job; this only loads it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OfficeError, Result};

/// Common words that carry no signal for office lookups
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "do", "does", "for", "from", "how", "in", "is", "it",
    "me", "of", "on", "or", "our", "tell", "that", "the", "there", "this", "to", "was", "what",
    "where", "which", "who", "with",
];

/// One indexed passage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
}

/// A chunk with its similarity to the query
#[derive(Clone, Debug)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

type TermVector = HashMap<String, f64>;

struct Entry {
    chunk: Chunk,
    terms: TermVector,
}

/// Searchable collection of office chunks
#[derive(Default)]
pub struct DocumentIndex {
    entries: Vec<Entry>,
}

impl DocumentIndex {
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let entries = chunks
            .into_iter()
            .map(|chunk| Entry {
                terms: term_vector(&chunk.text),
                chunk,
            })
            .collect();
        Self { entries }
    }

    /// Load a JSON array of `{"id", "text"}` objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| OfficeError::IndexUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let chunks: Vec<Chunk> =
            serde_json::from_str(&raw).map_err(|source| OfficeError::IndexMalformed {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %path.display(), chunks = chunks.len(), "Office index loaded");
        Ok(Self::from_chunks(chunks))
    }

    /// Chunks scoring above zero, best first, at most `top_k`.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredChunk<'_>> {
        let query = term_vector(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: &e.chunk,
                score: cosine_similarity(&query, &e.terms),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

fn term_vector(text: &str) -> TermVector {
    let mut terms = TermVector::new();
    for token in tokenize(text) {
        *terms.entry(token).or_insert(0.0) += 1.0;
    }
    terms
}

/// Cosine similarity of two sparse term vectors.
fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a: f64 = a.values().map(|x| x * x).sum();
    let norm_b: f64 = b.values().map(|y| y * y).sum();

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    #[allow(clippy::cast_possible_truncation)]
    let similarity = (dot / denom) as f32;
    similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.into(),
            text: text.into(),
        }
    }

    fn sample() -> DocumentIndex {
        DocumentIndex::from_chunks([
            chunk("hq", "HQ: 100 Main Street, New York. Headquarters with 1,200 employees."),
            chunk("chi", "Chicago office: 20 Lake Shore Drive, Chicago. Sales and support."),
            chunk("sf", "San Francisco office: 5 Market Street. Engineering hub."),
        ])
    }

    #[test]
    fn test_best_match_first() {
        let index = sample();
        let results = index.search("Where is the Chicago office?", 3);
        assert_eq!(results[0].chunk.id, "chi");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_k_limit() {
        let index = sample();
        assert_eq!(index.search("office", 1).len(), 1);
        assert_eq!(index.search("office street", 10).len(), 3);
    }

    #[test]
    fn test_no_overlap_returns_nothing() {
        let index = sample();
        assert!(index.search("quantum chromodynamics", 3).is_empty());
        assert!(index.search("the of what", 3).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let index = sample();
        assert_eq!(index.search("HEADQUARTERS", 1)[0].chunk.id, "hq");
    }

    #[test]
    fn test_cosine_identical_and_disjoint() {
        let a = term_vector("main street");
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &term_vector("lake shore")).abs() < f32::EPSILON);
        assert!(cosine_similarity(&TermVector::new(), &a).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "hq", "text": "HQ: 100 Main Street"}}]"#).unwrap();

        let index = DocumentIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.search("main street", 3)[0].chunk.text, "HQ: 100 Main Street");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DocumentIndex::load(dir.path().join("missing.json")),
            Err(OfficeError::IndexUnreadable { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            DocumentIndex::load(file.path()),
            Err(OfficeError::IndexMalformed { .. })
        ));
    }
}
