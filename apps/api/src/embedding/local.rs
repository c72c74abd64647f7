//! Local embedding backend: signed feature hashing.
//!
//! Features per text:
//! - word unigrams (weight 1.0)
//! - adjacent word bigrams (weight 0.5)
//! - boundary-padded character trigrams of each word (weight 0.35)
//!
//! Term counts are damped with `1 + ln(tf)` and hashed with FNV-1a into
//! `dimension` buckets; one hash bit picks the sign so unrelated collisions
//! tend to cancel. No model files, no network, same output on every platform.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{l2_normalize, Embedding, EmbeddingError, EmbeddingProvider};

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;
const TRIGRAM_WEIGHT: f32 = 0.35;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous core. Immutable, so concurrent calls need no locking.
    pub fn embed_sync(&self, text: &str, normalize: bool) -> Embedding {
        // feature -> (base weight, occurrences)
        let mut features: HashMap<String, (f32, u32)> = HashMap::new();
        let mut bump = |key: String, base: f32| {
            features.entry(key).or_insert((base, 0)).1 += 1;
        };
        let words: Vec<&str> = text.split_whitespace().collect();

        for word in &words {
            bump(format!("w:{word}"), UNIGRAM_WEIGHT);

            let padded: Vec<char> = std::iter::once('<')
                .chain(word.chars())
                .chain(std::iter::once('>'))
                .collect();
            for gram in padded.windows(3) {
                bump(format!("c:{}", gram.iter().collect::<String>()), TRIGRAM_WEIGHT);
            }
        }
        for pair in words.windows(2) {
            bump(format!("b:{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let mut vector = vec![0.0_f32; self.dimension];
        // Sort so float accumulation order (and thus every bit) is stable.
        let mut features: Vec<(String, (f32, u32))> = features.into_iter().collect();
        features.sort_by(|a, b| a.0.cmp(&b.0));

        for (feature, (base, count)) in features {
            let hash = fnv1a(feature.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * base * (1.0 + (count as f32).ln());
        }

        if normalize {
            l2_normalize(&mut vector);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str, normalize: bool) -> Result<Embedding, EmbeddingError> {
        // CPU-bound; keep it off the async worker threads.
        let embedder = self.clone();
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || embedder.embed_sync(&text, normalize))
            .await
            .map_err(|e| EmbeddingError::Task(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "local-hashing"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}
