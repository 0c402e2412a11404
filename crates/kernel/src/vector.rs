use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64::consts::TAU;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const EMBEDDING_DIM: usize = 384;
pub const DEFAULT_THRESHOLD: f32 = 0.7;
pub const DEFAULT_LIMIT: usize = 10;

const HASH_SEED: u32 = 0x811c_9dc5;
const PHASE_STEP: u32 = 0x9e37_79b9;
const TOKEN_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VectorError {
    #[error("text for {0} embeds to the zero vector")]
    EmptyEmbedding(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub similarity: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpsertReceipt {
    pub id: String,
    pub upserted: bool,
}

/// Absent fields fall back to `DEFAULT_THRESHOLD` and `DEFAULT_LIMIT`;
/// explicit zeros are honored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct SearchOptions {
    pub threshold: Option<f32>,
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn new(threshold: f32, limit: usize) -> Self {
        Self {
            threshold: Some(threshold),
            limit: Some(limit),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Deterministic projection of `text` onto `EMBEDDING_DIM` dimensions.
///
/// Every lowercase alphanumeric token contributes one hashed sinusoidal basis
/// vector, and every adjacent token pair contributes a half-weight one, so
/// word order moves the result. Text with no alphanumeric run is treated as a
/// single token. Blank text embeds to the zero vector.
pub fn embed(text: &str) -> Vec<f32> {
    let mut tokens = tokenize(text);
    let trimmed = text.trim();
    if tokens.is_empty() && !trimmed.is_empty() {
        tokens.push(trimmed.to_string());
    }

    let mut embedding = vec![0.0f32; EMBEDDING_DIM];
    for token in &tokens {
        accumulate(&mut embedding, seeded_hash(token), TOKEN_WEIGHT);
    }
    for pair in tokens.windows(2) {
        let bigram = format!("{} {}", pair[0], pair[1]);
        accumulate(&mut embedding, seeded_hash(&bigram), BIGRAM_WEIGHT);
    }
    embedding
}

/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn seeded_hash(token: &str) -> u32 {
    token.chars().fold(HASH_SEED, |hash, c| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as u32)
    })
}

fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 13;
    x = x.wrapping_mul(0xc2b2_ae35);
    x ^= x >> 16;
    x
}

fn accumulate(embedding: &mut [f32], hash: u32, weight: f32) {
    for (i, slot) in embedding.iter_mut().enumerate() {
        let phase = f64::from(mix(hash ^ (i as u32).wrapping_mul(PHASE_STEP))) / 4_294_967_296.0;
        *slot += weight * ((phase * TAU).sin() as f32);
    }
}

#[derive(Default)]
struct Records {
    ordered: Vec<VectorRecord>,
    index: HashMap<String, usize>,
}

/// In-process similarity index. Records are never evicted; re-upserting an
/// id replaces its entry in place and keeps its original position.
#[derive(Default)]
pub struct VectorStore {
    records: RwLock<Records>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        embed(text)
    }

    pub fn upsert(
        &self,
        id: &str,
        text: &str,
        metadata: Map<String, Value>,
    ) -> Result<UpsertReceipt, VectorError> {
        let embedding = embed(text);
        if embedding.iter().all(|value| *value == 0.0) {
            return Err(VectorError::EmptyEmbedding(id.to_string()));
        }
        let record = VectorRecord {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata,
        };

        let mut records = self.records.write();
        match records.index.get(id).copied() {
            Some(position) => records.ordered[position] = record,
            None => {
                let position = records.ordered.len();
                records.index.insert(id.to_string(), position);
                records.ordered.push(record);
            }
        }
        Ok(UpsertReceipt {
            id: id.to_string(),
            upserted: true,
        })
    }

    pub fn search(&self, query: &str, options: SearchOptions) -> Vec<SearchHit> {
        let query_embedding = embed(query);
        let threshold = options.threshold();
        let records = self.records.read();
        let mut hits: Vec<SearchHit> = records
            .ordered
            .iter()
            .filter_map(|record| {
                let similarity = cosine_similarity(&query_embedding, &record.embedding);
                (similarity > threshold).then(|| SearchHit {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    metadata: record.metadata.clone(),
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(options.limit());
        hits
    }

    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        let records = self.records.read();
        records
            .index
            .get(id)
            .and_then(|position| records.ordered.get(*position))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
