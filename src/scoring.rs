//! Semantic similarity between article bodies and a fraud concept.
//!
//! Scoring is split in two:
//! - an [`Embedder`] turns text into a fixed-length vector
//! - a [`Scorer`] embeds the concept phrase once and compares every article
//!   body to it with [`cosine_similarity`]
//!
//! Two embedders ship with the crate. [`LexicalEmbedder`] hashes word
//! counts into a vector and needs no network, which makes runs reproducible.
//! [`OpenAiEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.

use crate::config::{EmbeddingProvider, ScoringConfig};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding endpoint returned no vector")]
    Empty,
    #[error("{0}")]
    Config(String),
}

/// Turns text into a vector.
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScoreError>;
}

/// Cosine similarity of two vectors, in `[-1.0, 1.0]`.
///
/// Mismatched lengths and zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// FNV-1a, stable across runs and platforms.
fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Offline embedder: L2-normalised counts of lower-cased word tokens hashed
/// into `dimensions` buckets.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl LexicalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
        {
            let bucket = (fnv1a(token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Embedder for LexicalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScoreError> {
        Ok(self.embed_sync(text))
    }
}

/// Embeddings client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self, ScoreError> {
        if api_key.trim().is_empty() {
            return Err(ScoreError::Config("missing OpenAI API key".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| ScoreError::Config("invalid OpenAI API key".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    #[instrument(level = "debug", skip_all, fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScoreError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ScoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(ScoreError::Empty)
    }
}

/// The embedder chosen by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredEmbedder {
    Lexical(LexicalEmbedder),
    OpenAi(OpenAiEmbedder),
}

impl ConfiguredEmbedder {
    pub fn from_config(config: &ScoringConfig, api_key: Option<&str>) -> Result<Self, ScoreError> {
        match config.provider {
            EmbeddingProvider::Lexical => Ok(Self::Lexical(LexicalEmbedder::new(config.dimensions))),
            EmbeddingProvider::OpenAi => {
                let key = api_key.ok_or_else(|| {
                    ScoreError::Config("scoring.provider is openai but no API key was given".into())
                })?;
                Ok(Self::OpenAi(OpenAiEmbedder::new(
                    key,
                    &config.base_url,
                    &config.model,
                    Duration::from_secs(config.timeout_secs),
                )?))
            }
        }
    }
}

impl Embedder for ConfiguredEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScoreError> {
        match self {
            Self::Lexical(e) => e.embed(text).await,
            Self::OpenAi(e) => e.embed(text).await,
        }
    }
}

/// Compares article bodies against a fixed concept embedding.
#[derive(Debug)]
pub struct Scorer<E> {
    embedder: E,
    concept: Vec<f32>,
}

impl<E: Embedder> Scorer<E> {
    /// Embed the concept phrase once for the whole run.
    #[instrument(level = "info", skip_all)]
    pub async fn new(embedder: E, concept: &str) -> Result<Self, ScoreError> {
        let concept = embedder.embed(concept).await?;
        info!(dimensions = concept.len(), "Embedded fraud concept");
        Ok(Self { embedder, concept })
    }

    /// Similarity of `body` to the concept in `[0.0, 1.0]`; empty text is `0.0`.
    pub async fn score(&self, body: &str) -> Result<f64, ScoreError> {
        if body.trim().is_empty() {
            return Ok(0.0);
        }
        let vector = self.embedder.embed(body).await?;
        let similarity = cosine_similarity(&self.concept, &vector).clamp(0.0, 1.0);
        debug!(similarity, "Scored article body");
        Ok(similarity)
    }
}
