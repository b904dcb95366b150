use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::workflows::competency::domain::CriticalityFactors;

/// Fixed factor weights; they always sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub coverage: f32,
    pub impact_risk: f32,
    pub frequency: f32,
    pub complexity: f32,
    pub differentiation: f32,
    pub time_to_proficiency: f32,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            coverage: 0.25,
            impact_risk: 0.20,
            frequency: 0.15,
            complexity: 0.15,
            differentiation: 0.15,
            time_to_proficiency: 0.10,
        }
    }
}

impl FactorWeights {
    pub fn total(&self) -> f32 {
        self.coverage
            + self.impact_risk
            + self.frequency
            + self.complexity
            + self.differentiation
            + self.time_to_proficiency
    }

    pub fn weighted_score(&self, factors: &CriticalityFactors) -> f32 {
        self.coverage * factors.coverage
            + self.impact_risk * factors.impact_risk
            + self.frequency * factors.frequency
            + self.complexity * factors.complexity
            + self.differentiation * factors.differentiation
            + self.time_to_proficiency * factors.time_to_proficiency
    }
}

/// Ranking configuration derived from the pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub weights: FactorWeights,
    pub top_n: usize,
}

impl RankingConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            weights: FactorWeights::default(),
            top_n: config.top_n,
        }
    }
}
