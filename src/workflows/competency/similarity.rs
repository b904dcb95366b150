use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::oracle::ScoringOracle;

/// Neutral score substituted when the oracle cannot be consulted.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Pair score produced by the scorer. `low_confidence` marks scores where
/// the semantic component fell back to the neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub lexical: f32,
    pub semantic: f32,
    pub low_confidence: bool,
}

/// Jaccard overlap of lowercase token sets.
pub fn jaccard(left: &str, right: &str) -> f32 {
    let left_tokens: BTreeSet<String> = tokenize(left);
    let right_tokens: BTreeSet<String> = tokenize(right);
    if left_tokens.is_empty() && right_tokens.is_empty() {
        return 0.0;
    }

    let intersection = left_tokens.intersection(&right_tokens).count();
    let union = left_tokens.union(&right_tokens).count();
    intersection as f32 / union as f32
}

fn tokenize(value: &str) -> BTreeSet<String> {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct CachedScore {
    score: f32,
    low_confidence: bool,
}

type PairCache = Arc<Mutex<HashMap<(String, String), CachedScore>>>;

/// Scores text pairs lexically and semantically, caching oracle results by
/// input pair so repeated responsibility/competency text never triggers a
/// second external call. The cache is shared across jobs.
#[derive(Clone)]
pub struct SimilarityScorer {
    oracle: Arc<dyn ScoringOracle>,
    semantic_cache: PairCache,
    contextual_cache: PairCache,
}

impl SimilarityScorer {
    pub fn new(oracle: Arc<dyn ScoringOracle>) -> Self {
        Self {
            oracle,
            semantic_cache: Arc::new(Mutex::new(HashMap::new())),
            contextual_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn score(&self, left: &str, right: &str) -> SimilarityScore {
        let lexical = jaccard(left, right);
        let cached = self.lookup_semantic(left, right);
        SimilarityScore {
            lexical,
            semantic: cached.score,
            low_confidence: cached.low_confidence,
        }
    }

    /// Semantic similarity alone; used by the auditor where the lexical
    /// component is not part of the contract.
    pub fn semantic(&self, left: &str, right: &str) -> (f32, bool) {
        let cached = self.lookup_semantic(left, right);
        (cached.score, cached.low_confidence)
    }

    /// Externally supplied contextual-relevance score, soft-failing to the
    /// neutral default. Directional: (responsibility, competency).
    pub fn contextual(&self, responsibility: &str, competency: &str) -> (f32, bool) {
        let key = (responsibility.to_string(), competency.to_string());
        if let Some(hit) = lock_cache(&self.contextual_cache).get(&key) {
            return (hit.score, hit.low_confidence);
        }

        let cached = match self.oracle.contextual_relevance(responsibility, competency) {
            Ok(score) => CachedScore {
                score,
                low_confidence: false,
            },
            Err(_) => CachedScore {
                score: NEUTRAL_SCORE,
                low_confidence: true,
            },
        };

        lock_cache(&self.contextual_cache).insert(key, cached);
        (cached.score, cached.low_confidence)
    }

    fn lookup_semantic(&self, left: &str, right: &str) -> CachedScore {
        let key = symmetric_key(left, right);
        if let Some(hit) = lock_cache(&self.semantic_cache).get(&key) {
            return *hit;
        }

        let cached = match self.oracle.semantic_similarity(left, right) {
            Ok(score) => CachedScore {
                score,
                low_confidence: false,
            },
            Err(_) => CachedScore {
                score: NEUTRAL_SCORE,
                low_confidence: true,
            },
        };

        lock_cache(&self.semantic_cache).insert(key, cached);
        cached
    }

    pub fn cached_pairs(&self) -> usize {
        lock_cache(&self.semantic_cache).len()
    }
}

// A poisoned cache only ever holds completed entries, so recover it.
fn lock_cache(
    cache: &Mutex<HashMap<(String, String), CachedScore>>,
) -> std::sync::MutexGuard<'_, HashMap<(String, String), CachedScore>> {
    cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn symmetric_key(left: &str, right: &str) -> (String, String) {
    if left <= right {
        (left.to_string(), right.to_string())
    } else {
        (right.to_string(), left.to_string())
    }
}
