//! Document loading, chunking and in-memory retrieval.
//!
//! Documents are split into overlapping sentence-aligned chunks and indexed as
//! TF-IDF term vectors. Retrieval is brute-force cosine similarity, which is
//! plenty for a single document held in memory.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tokio::process::Command;

use crate::errors::AppError;
use crate::services::ai::{self, LlmProvider};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Characters of retrieved context sent along with a question.
const CONTEXT_LIMIT: usize = 1500;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TERM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").unwrap());

static STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "should", "can", "could", "may", "might", "must", "i",
    "me", "my", "we", "our", "you", "your", "he", "she", "it", "they", "them", "his", "her",
    "its", "their", "what", "which", "who", "whom", "this", "that", "these", "those", "of", "in",
    "to", "for", "with", "on", "at", "from", "by", "about", "as", "into", "and", "but", "or",
    "not", "no", "so", "if", "then", "than", "too", "very", "how", "when", "where", "why", "tell",
];

/// Read a document as plain text. PDFs go through the `pdftotext` tool.
pub async fn load_document(path: &Path) -> anyhow::Result<String> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        extract_pdf_text(path).await?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read document: {}", path.display()))?
    };

    if text.trim().is_empty() {
        return Err(AppError::Document(format!("no text found in {}", path.display())).into());
    }
    Ok(text)
}

async fn extract_pdf_text(path: &Path) -> anyhow::Result<String> {
    let pdftotext = which::which("pdftotext").map_err(|_| {
        AppError::Document("pdftotext not found in PATH; install poppler-utils".to_string())
    })?;

    let output = Command::new(pdftotext)
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("failed to run pdftotext")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(stderr = %stderr, "pdftotext failed");
        return Err(AppError::Document(stderr.trim().to_string()).into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Split text into chunks of at most `chunk_size` words on sentence
/// boundaries, carrying the last `overlap / 10` sentences forward.
///
/// A single sentence longer than `chunk_size` becomes its own chunk.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = WHITESPACE.replace_all(text, " ");
    let carry = overlap / 10;

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for sentence in split_sentences(text.trim()) {
        let words = sentence.split_whitespace().count();

        if current_len + words > chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));
            // Always drop at least one sentence so chunks keep moving forward.
            let keep = carry.min(current.len() - 1);
            current = current.split_off(current.len() - keep);
            current_len = current.iter().map(|s| s.split_whitespace().count()).sum();
        }

        current.push(sentence);
        current_len += words;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') && bytes.get(i + 1) == Some(&b' ') {
            sentences.push(&text[start..=i]);
            start = i + 2;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn terms(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TERM.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

type TermVector = HashMap<String, f32>;

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct DocumentIndex {
    chunks: Vec<String>,
    vectors: Vec<TermVector>,
    idf: HashMap<String, f32>,
}

impl DocumentIndex {
    pub fn build(chunks: Vec<String>) -> anyhow::Result<Self> {
        if chunks.is_empty() {
            return Err(AppError::Document("no chunks to index".to_string()).into());
        }

        let chunk_terms: Vec<Vec<String>> = chunks.iter().map(|c| terms(c)).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for t in &chunk_terms {
            let unique: HashSet<&str> = t.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        let n = chunks.len() as f32;
        let idf: HashMap<String, f32> = doc_freq
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((n + 1.0) / (df as f32 + 1.0)).ln() + 1.0))
            .collect();

        let vectors = chunk_terms.iter().map(|t| weigh(t, &idf)).collect();

        tracing::info!(chunks = chunks.len(), terms = idf.len(), "built document index");
        Ok(Self {
            chunks,
            vectors,
            idf,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` most similar chunks, best first. Chunks sharing no terms with
    /// the query are never returned.
    pub fn search(&self, query: &str, k: usize) -> Vec<ChunkHit> {
        let query = weigh(&terms(query), &self.idf);
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<ChunkHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| ChunkHit {
                index,
                score: cosine_similarity(&query, vector),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }

    /// Relevant context for a question; empty when nothing matches.
    pub fn retrieve(&self, query: &str, k: usize) -> String {
        self.search(query, k)
            .iter()
            .map(|hit| self.chunks[hit.index].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// L2-normalized TF-IDF weights. Terms unknown to the index are dropped.
fn weigh(terms: &[String], idf: &HashMap<String, f32>) -> TermVector {
    let mut vector: TermVector = HashMap::new();
    for term in terms {
        if let Some(weight) = idf.get(term) {
            *vector.entry(term.clone()).or_default() += weight;
        }
    }

    let norm = vector.values().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.values_mut() {
            *value /= norm;
        }
    }
    vector
}

fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum()
}

/// Ask the model to answer from the given context only.
pub async fn ask_document(
    llm: &dyn LlmProvider,
    question: &str,
    context: &str,
) -> anyhow::Result<String> {
    let mut prompt = String::new();
    if !context.is_empty() {
        let context: String = context.chars().take(CONTEXT_LIMIT).collect();
        prompt.push_str(&format!("Based ONLY on this context:\n{context}\n\n"));
    }
    prompt.push_str(&format!("Answer this: {question}"));

    ai::ask(llm, &prompt).await
}
