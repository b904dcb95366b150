use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

/// Failure modes surfaced by a scoring oracle. Transient failures are
/// retried; everything else degrades to the scorer's neutral default.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("transient oracle failure: {0}")]
    Transient(String),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle returned {0} outside [0,1]")]
    OutOfRange(f32),
}

/// Narrow seam for the external scoring collaborator. Implementations must
/// return scores in [0,1] and be safe to share across worker threads.
pub trait ScoringOracle: Send + Sync {
    fn semantic_similarity(&self, left: &str, right: &str) -> Result<f32, OracleError>;

    fn contextual_relevance(
        &self,
        responsibility: &str,
        competency: &str,
    ) -> Result<f32, OracleError>;
}

/// Bounded exponential backoff applied to transient oracle failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Wraps any oracle with the retry policy. Exhausted retries surface the
/// last error so the scorer can fall back to its neutral default.
pub struct ResilientOracle<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O: ScoringOracle> ResilientOracle<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    fn with_retries<F>(&self, mut call: F) -> Result<f32, OracleError>
    where
        F: FnMut() -> Result<f32, OracleError>,
    {
        let mut attempt = 0;
        loop {
            match call() {
                Ok(score) if (0.0..=1.0).contains(&score) => return Ok(score),
                Ok(score) => return Err(OracleError::OutOfRange(score)),
                Err(OracleError::Transient(detail)) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        return Err(OracleError::Transient(detail));
                    }
                    thread::sleep(self.policy.backoff_for(attempt - 1));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

impl<O: ScoringOracle> ScoringOracle for ResilientOracle<O> {
    fn semantic_similarity(&self, left: &str, right: &str) -> Result<f32, OracleError> {
        self.with_retries(|| self.inner.semantic_similarity(left, right))
    }

    fn contextual_relevance(
        &self,
        responsibility: &str,
        competency: &str,
    ) -> Result<f32, OracleError> {
        self.with_retries(|| self.inner.contextual_relevance(responsibility, competency))
    }
}

/// Deterministic in-process oracle using a character-bigram Dice
/// coefficient. Default collaborator when no external scorer is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiceOracle;

impl DiceOracle {
    fn bigrams(value: &str) -> Vec<(char, char)> {
        let normalized: Vec<char> = value
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        normalized
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    fn dice(left: &str, right: &str) -> f32 {
        let mut left_bigrams = Self::bigrams(left);
        let right_bigrams = Self::bigrams(right);
        if left_bigrams.is_empty() || right_bigrams.is_empty() {
            return 0.0;
        }

        let total = left_bigrams.len() + right_bigrams.len();
        let mut shared = 0usize;
        for bigram in &right_bigrams {
            if let Some(position) = left_bigrams.iter().position(|other| other == bigram) {
                left_bigrams.swap_remove(position);
                shared += 1;
            }
        }

        (2.0 * shared as f32) / total as f32
    }
}

impl ScoringOracle for DiceOracle {
    fn semantic_similarity(&self, left: &str, right: &str) -> Result<f32, OracleError> {
        Ok(Self::dice(left, right))
    }

    fn contextual_relevance(
        &self,
        responsibility: &str,
        competency: &str,
    ) -> Result<f32, OracleError> {
        Ok(Self::dice(responsibility, competency))
    }
}

/// Oracle stub with pinned pair scores; lookups are symmetric. Pairs not in
/// the table fall back to a fixed score or report the oracle unavailable.
#[derive(Debug, Default, Clone)]
pub struct StaticOracle {
    semantic: BTreeMap<(String, String), f32>,
    contextual: BTreeMap<(String, String), f32>,
    fallback: Option<f32>,
}

impl StaticOracle {
    pub fn with_fallback(fallback: f32) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::default()
        }
    }

    pub fn pin_semantic(&mut self, left: &str, right: &str, score: f32) {
        self.semantic.insert(Self::key(left, right), score);
    }

    pub fn pin_contextual(&mut self, responsibility: &str, competency: &str, score: f32) {
        self.contextual.insert(
            (responsibility.to_string(), competency.to_string()),
            score,
        );
    }

    fn key(left: &str, right: &str) -> (String, String) {
        if left <= right {
            (left.to_string(), right.to_string())
        } else {
            (right.to_string(), left.to_string())
        }
    }

    fn resolve(&self, found: Option<f32>) -> Result<f32, OracleError> {
        found
            .or(self.fallback)
            .ok_or_else(|| OracleError::Unavailable("no pinned score".to_string()))
    }
}

impl ScoringOracle for StaticOracle {
    fn semantic_similarity(&self, left: &str, right: &str) -> Result<f32, OracleError> {
        self.resolve(self.semantic.get(&Self::key(left, right)).copied())
    }

    fn contextual_relevance(
        &self,
        responsibility: &str,
        competency: &str,
    ) -> Result<f32, OracleError> {
        let key = (responsibility.to_string(), competency.to_string());
        self.resolve(self.contextual.get(&key).copied())
    }
}
