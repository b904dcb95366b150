mod config;
mod factors;

pub use config::{FactorWeights, RankingConfig};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{CoverageSummary, JobId, RankedCompetency, TechnicalCompetency};
use factors::compute_factors;

/// Ranking stage output: the ordered top-N plus the coverage accounting over
/// the full clean set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingOutcome {
    pub job_id: JobId,
    pub ranked: Vec<RankedCompetency>,
    pub coverage: CoverageSummary,
}

/// Scores each clean competency on the six weighted factors and selects the
/// top N. Fully deterministic: fixed inputs produce identical ranks and
/// scores on every run.
pub struct CriticalityRanker {
    config: RankingConfig,
}

impl CriticalityRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn rank(&self, job_id: &JobId, clean: &[TechnicalCompetency]) -> RankingOutcome {
        let total_trace_count: usize = clean.iter().map(|competency| competency.traces.len()).sum();

        let mut scored: Vec<(TechnicalCompetency, _, f32)> = clean
            .iter()
            .map(|competency| {
                let factors = compute_factors(competency, total_trace_count);
                let score = self.config.weights.weighted_score(&factors);
                (competency.clone(), factors, score)
            })
            .collect();

        // Criticality descending, then coverage descending, then competency
        // id ascending: the documented deterministic tie-break.
        scored.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then_with(|| b.1.coverage.total_cmp(&a.1.coverage))
                .then_with(|| a.0.competency_id.cmp(&b.0.competency_id))
        });
        scored.truncate(self.config.top_n);

        let ranked: Vec<RankedCompetency> = scored
            .into_iter()
            .enumerate()
            .map(|(index, (competency, factors, score))| {
                let covered: Vec<String> =
                    competency.covered_responsibilities().into_iter().collect();
                let rationale = format!(
                    "Covers {} of {} traced responsibilities ({}); complexity {:.2} and \
                     differentiation {:.2} yield criticality {:.2}.",
                    competency.traces.len(),
                    total_trace_count,
                    if competency.has_primary_trace() {
                        "primary contributor"
                    } else {
                        "secondary contributor"
                    },
                    factors.complexity,
                    factors.differentiation,
                    score,
                );
                RankedCompetency {
                    rank: index + 1,
                    competency,
                    criticality_score: score,
                    factors,
                    rationale,
                    covered_responsibilities: covered,
                }
            })
            .collect();

        let coverage = coverage_summary(clean, &ranked);

        RankingOutcome {
            job_id: job_id.clone(),
            ranked,
            coverage,
        }
    }
}

/// Coverage of the top-N relative to the full clean set: covered ids are a
/// subset of the total by construction.
fn coverage_summary(
    clean: &[TechnicalCompetency],
    ranked: &[RankedCompetency],
) -> CoverageSummary {
    let total_ids: BTreeSet<String> = clean
        .iter()
        .flat_map(|competency| competency.covered_responsibilities())
        .collect();
    let covered_ids: BTreeSet<String> = ranked
        .iter()
        .flat_map(|entry| entry.covered_responsibilities.iter().cloned())
        .collect();

    let coverage_rate = if total_ids.is_empty() {
        0.0
    } else {
        covered_ids.len() as f32 / total_ids.len() as f32
    };

    CoverageSummary {
        total_responsibilities: total_ids.len(),
        covered_responsibilities: covered_ids.len(),
        coverage_rate,
        uncovered: total_ids.difference(&covered_ids).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::workflows::competency::domain::{
        Contribution, QualityMetadata, ResponsibilityTrace,
    };

    fn competency(id: &str, responsibility_ids: &[&str], primary: bool) -> TechnicalCompetency {
        TechnicalCompetency {
            competency_id: id.to_string(),
            name: id.to_string(),
            definition: "def".to_string(),
            why_it_matters: "matters".to_string(),
            behavioral_indicators: vec!["a".into(), "b".into(), "c".into()],
            applied_scope: Vec::new(),
            traces: responsibility_ids
                .iter()
                .enumerate()
                .map(|(index, responsibility_id)| ResponsibilityTrace {
                    responsibility_id: responsibility_id.to_string(),
                    contribution: if primary && index == 0 {
                        Contribution::Primary
                    } else {
                        Contribution::Secondary
                    },
                    relevance: 0.7,
                })
                .collect(),
            overlap: Default::default(),
            benchmarking: Default::default(),
            quality: QualityMetadata {
                definition_word_count: 60,
                indicator_count: 3,
            },
        }
    }

    fn ranker() -> CriticalityRanker {
        CriticalityRanker::new(RankingConfig::from_pipeline(&PipelineConfig::default()))
    }

    #[test]
    fn weighted_score_matches_hand_computation() {
        let job_id = JobId("job-1".to_string());
        let clean = vec![competency("comp-a", &["r1", "r2"], true)];

        let outcome = ranker().rank(&job_id, &clean);
        let entry = &outcome.ranked[0];

        // coverage 1.0, impact 0.8, frequency 0.4, complexity 0, diff 0.5, ttp 0
        let expected = 0.25 * 1.0 + 0.20 * 0.8 + 0.15 * 0.4 + 0.15 * 0.5;
        assert!((entry.criticality_score - expected).abs() < 1e-6);
        assert_eq!(entry.rank, 1);
    }

    #[test]
    fn higher_scores_rank_first_and_ties_break_deterministically() {
        let job_id = JobId("job-1".to_string());
        let clean = vec![
            competency("zeta", &["r1"], false),
            competency("alpha", &["r2"], false),
            competency("mid", &["r3", "r4"], true),
        ];

        let outcome = ranker().rank(&job_id, &clean);
        let ids: Vec<&str> = outcome
            .ranked
            .iter()
            .map(|entry| entry.competency.competency_id.as_str())
            .collect();

        // "mid" wins on coverage+impact; the equal pair orders by id.
        assert_eq!(ids, vec!["mid", "alpha", "zeta"]);
        assert_eq!(outcome.ranked[0].rank, 1);
        assert_eq!(outcome.ranked[2].rank, 3);
    }

    #[test]
    fn reranking_fixed_inputs_is_deterministic() {
        let job_id = JobId("job-1".to_string());
        let clean = vec![
            competency("comp-a", &["r1", "r2"], true),
            competency("comp-b", &["r3"], false),
        ];

        let first = ranker().rank(&job_id, &clean);
        let second = ranker().rank(&job_id, &clean);

        assert_eq!(first, second);
    }

    #[test]
    fn selection_is_truncated_to_top_n() {
        let job_id = JobId("job-1".to_string());
        let clean: Vec<TechnicalCompetency> = (0..12)
            .map(|index| {
                competency(
                    &format!("comp-{index:02}"),
                    &[&format!("r{index}") as &str],
                    index % 2 == 0,
                )
            })
            .collect();

        let outcome = ranker().rank(&job_id, &clean);

        assert_eq!(outcome.ranked.len(), 8);
        assert_eq!(outcome.coverage.total_responsibilities, 12);
        assert_eq!(outcome.coverage.covered_responsibilities, 8);
    }

    #[test]
    fn coverage_identity_holds_exactly() {
        let job_id = JobId("job-1".to_string());
        let clean = vec![
            competency("comp-a", &["r1", "r2", "r3"], true),
            competency("comp-b", &["r3", "r4"], false),
        ];

        let outcome = ranker().rank(&job_id, &clean);
        let coverage = &outcome.coverage;

        assert_eq!(coverage.total_responsibilities, 4);
        assert_eq!(coverage.covered_responsibilities, 4);
        assert!((coverage.coverage_rate - 1.0).abs() < f32::EPSILON);
        assert!(coverage.uncovered.is_empty());
    }

    #[test]
    fn empty_clean_set_yields_empty_ranking() {
        let outcome = ranker().rank(&JobId("job-1".to_string()), &[]);

        assert!(outcome.ranked.is_empty());
        assert_eq!(outcome.coverage.total_responsibilities, 0);
        assert_eq!(outcome.coverage.coverage_rate, 0.0);
    }
}
