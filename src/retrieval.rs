//! Nearest-passage lookup over a persisted flat vector index.
//!
//! The index file is JSON with two parallel arrays:
//!
//! ```json
//! {"documents": ["passage one", "passage two"], "vectors": [[0.1, 0.2], [0.3, 0.4]]}
//! ```
//!
//! Distances are squared L2, smallest first, like a flat L2 index.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::providers::{join_url, read_json, send};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read index '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse index '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("index has {documents} documents but {vectors} vectors")]
    LengthMismatch { documents: usize, vectors: usize },
    #[error("vector {position} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },
    #[error("query has dimension {found}, index expects {expected}")]
    QueryDimension { expected: usize, found: usize },
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    documents: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    documents: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorIndex {
    pub fn from_parts(documents: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if documents.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                documents: documents.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        if let Some((position, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, vector)| vector.len() != dimension)
        {
            return Err(IndexError::DimensionMismatch {
                position,
                expected: dimension,
                found: vector.len(),
            });
        }

        Ok(Self {
            documents,
            vectors,
            dimension,
        })
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: IndexFile = serde_json::from_str(&raw).map_err(|source| IndexError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_parts(file.documents, file.vectors)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Up to `k` documents ordered by ascending distance; ties keep index order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<&str>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                found: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, squared_l2(query, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, _)| self.documents[position].as_str())
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

pub type EmbeddingFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>>> + 'a>>;

pub trait Embedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

pub struct OpenAiEmbedder<'a> {
    client: &'a Client,
    base_url: &'a str,
    api_key: &'a str,
    model: &'a str,
    timeout_secs: u64,
}

impl<'a> OpenAiEmbedder<'a> {
    pub fn new(
        client: &'a Client,
        base_url: &'a str,
        api_key: &'a str,
        model: &'a str,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
            timeout_secs,
        }
    }
}

fn parse_embedding(body: &Value) -> Result<Vec<f32>> {
    let values = body
        .pointer("/data/0/embedding")
        .and_then(Value::as_array)
        .context("Unexpected response shape: missing '/data/0/embedding'")?;
    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .context("Embedding contains a non-numeric value")
        })
        .collect()
}

impl Embedder for OpenAiEmbedder<'_> {
    fn embed<'b>(&'b self, text: &'b str) -> EmbeddingFuture<'b> {
        Box::pin(async move {
            let api_url = join_url(self.base_url, "/v1/embeddings");
            debug!(api_url = %api_url, model = %self.model, input_len = text.len(), "requesting embedding");
            let builder = self
                .client
                .post(&api_url)
                .bearer_auth(self.api_key)
                .json(&EmbeddingRequest {
                    model: self.model,
                    input: text,
                });
            let response = send(builder, &api_url, self.timeout_secs).await?;
            let parsed = read_json(response).await?;
            parse_embedding(&parsed)
        })
    }
}
