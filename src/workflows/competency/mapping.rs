use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

use super::domain::{
    CompetencyCandidate, CompetencyLibrary, Job, JobId, LibraryKind, ResponsibilityMapping,
};
use super::similarity::SimilarityScorer;

/// Blend weights for candidate relevance.
const SEMANTIC_WEIGHT: f32 = 0.4;
const LEXICAL_WEIGHT: f32 = 0.3;
const CONTEXTUAL_WEIGHT: f32 = 0.3;

/// Mapping stage output for one job: one mapping per responsibility plus the
/// unmapped list surfaced to the quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingOutcome {
    pub job_id: JobId,
    pub mappings: Vec<ResponsibilityMapping>,
    pub unmapped: Vec<String>,
    /// Pairs whose semantic or contextual component fell back to neutral.
    pub low_confidence_pairs: usize,
}

impl MappingOutcome {
    pub fn unmapped_rate(&self) -> f32 {
        if self.mappings.is_empty() {
            return 0.0;
        }
        self.unmapped.len() as f32 / self.mappings.len() as f32
    }
}

/// Ranks technical-library competencies against every responsibility of a
/// job and keeps the top candidates above the relevance floor.
pub struct CandidateMapper {
    scorer: SimilarityScorer,
    relevance_floor: f32,
    candidate_cap: usize,
}

impl CandidateMapper {
    pub fn new(scorer: SimilarityScorer, config: &PipelineConfig) -> Self {
        Self {
            scorer,
            relevance_floor: config.relevance_floor,
            candidate_cap: config.candidate_cap,
        }
    }

    pub fn map_job(&self, job: &Job, library: &CompetencyLibrary) -> MappingOutcome {
        debug_assert_eq!(library.kind, LibraryKind::Technical);

        let mut mappings = Vec::with_capacity(job.responsibilities.len());
        let mut unmapped = Vec::new();
        let mut low_confidence_pairs = 0usize;

        for responsibility in &job.responsibilities {
            let mut candidates = Vec::new();

            for entry in &library.entries {
                let score = self
                    .scorer
                    .score(&responsibility.normalized_text, &entry.definition);
                let (contextual, contextual_low) = self
                    .scorer
                    .contextual(&responsibility.normalized_text, &entry.definition);

                let low_confidence = score.low_confidence || contextual_low;
                if low_confidence {
                    low_confidence_pairs += 1;
                }

                let relevance = (SEMANTIC_WEIGHT * score.semantic
                    + LEXICAL_WEIGHT * score.lexical
                    + CONTEXTUAL_WEIGHT * contextual)
                    .clamp(0.0, 1.0);

                if relevance >= self.relevance_floor {
                    candidates.push(CompetencyCandidate {
                        competency_id: entry.competency_id.clone(),
                        lexical: score.lexical,
                        semantic: score.semantic,
                        contextual,
                        relevance,
                        low_confidence,
                    });
                }
            }

            // Explicit comparator: relevance descending, then competency id
            // ascending, so candidate order never depends on library order.
            candidates.sort_by(|a, b| {
                b.relevance
                    .total_cmp(&a.relevance)
                    .then_with(|| a.competency_id.cmp(&b.competency_id))
            });
            candidates.truncate(self.candidate_cap);

            if candidates.is_empty() {
                unmapped.push(responsibility.responsibility_id.clone());
            }

            mappings.push(ResponsibilityMapping {
                responsibility_id: responsibility.responsibility_id.clone(),
                candidates,
            });
        }

        MappingOutcome {
            job_id: job.job_id.clone(),
            mappings,
            unmapped,
            low_confidence_pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::competency::domain::{
        CompetencyLibraryEntry, Responsibility,
    };
    use crate::workflows::competency::oracle::StaticOracle;
    use std::sync::Arc;

    fn entry(id: &str, definition: &str) -> CompetencyLibraryEntry {
        CompetencyLibraryEntry {
            competency_id: id.to_string(),
            name: id.to_string(),
            definition: definition.to_string(),
            indicators: Vec::new(),
            tags: Vec::new(),
            source_evidence: None,
        }
    }

    fn job_with(responsibilities: &[(&str, &str)]) -> Job {
        Job {
            job_id: JobId("job-1".to_string()),
            title: "Data Engineer".to_string(),
            family: "Engineering".to_string(),
            level: "Senior".to_string(),
            summary: Some("Builds data platforms".to_string()),
            responsibilities: responsibilities
                .iter()
                .map(|(id, text)| Responsibility {
                    responsibility_id: id.to_string(),
                    raw_text: text.to_string(),
                    normalized_text: text.to_string(),
                    priority_hint: None,
                })
                .collect(),
        }
    }

    fn mapper_with(oracle: StaticOracle) -> CandidateMapper {
        CandidateMapper::new(
            SimilarityScorer::new(Arc::new(oracle)),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn keeps_candidates_at_or_above_the_relevance_floor() {
        let mut oracle = StaticOracle::with_fallback(0.5);
        oracle.pin_semantic("build pipelines", "pipeline engineering practices", 0.9);
        oracle.pin_contextual("build pipelines", "pipeline engineering practices", 0.9);
        oracle.pin_semantic("build pipelines", "public speaking", 0.1);

        let job = job_with(&[("job-1-r01", "build pipelines")]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![
                entry("data-eng", "pipeline engineering practices"),
                entry("speaking", "public speaking"),
            ],
        );

        let outcome = mapper_with(oracle).map_job(&job, &library);
        let mapping = &outcome.mappings[0];

        // data-eng: 0.4*0.9 + 0.3*0.0 + 0.3*0.9 = 0.63; speaking well below.
        assert_eq!(mapping.candidates.len(), 1);
        assert_eq!(mapping.candidates[0].competency_id, "data-eng");
        assert!(outcome.unmapped.is_empty());
    }

    #[test]
    fn responsibility_without_candidates_is_unmapped() {
        let oracle = StaticOracle::with_fallback(0.1);
        let job = job_with(&[("job-1-r01", "negotiate vendor contracts")]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![entry("data-eng", "pipeline engineering practices")],
        );

        let outcome = mapper_with(oracle).map_job(&job, &library);

        assert!(outcome.mappings[0].is_unmapped());
        assert_eq!(outcome.unmapped, vec!["job-1-r01".to_string()]);
        assert!((outcome.unmapped_rate() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn candidate_list_is_capped_at_five() {
        let oracle = StaticOracle::with_fallback(0.9);
        let job = job_with(&[("job-1-r01", "operate distributed systems")]);
        let entries = (0..7)
            .map(|i| entry(&format!("comp-{i}"), &format!("definition {i}")))
            .collect();
        let library = CompetencyLibrary::new(LibraryKind::Technical, entries);

        let outcome = mapper_with(oracle).map_job(&job, &library);

        assert_eq!(outcome.mappings[0].candidates.len(), 5);
    }

    #[test]
    fn equal_relevance_breaks_ties_by_competency_id() {
        let oracle = StaticOracle::with_fallback(0.9);
        let job = job_with(&[("job-1-r01", "operate distributed systems")]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![
                entry("zeta", "identical definition"),
                entry("alpha", "identical definition"),
            ],
        );

        let outcome = mapper_with(oracle).map_job(&job, &library);
        let ids: Vec<&str> = outcome.mappings[0]
            .candidates
            .iter()
            .map(|candidate| candidate.competency_id.as_str())
            .collect();

        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn oracle_outage_counts_low_confidence_pairs() {
        // No pinned scores and no fallback: every oracle call soft-fails.
        let oracle = StaticOracle::default();
        let job = job_with(&[("job-1-r01", "design services and systems")]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![entry("design", "design services and systems")],
        );

        let outcome = mapper_with(oracle).map_job(&job, &library);

        assert!(outcome.low_confidence_pairs > 0);
        // Neutral semantic (0.5) + strong lexical overlap keeps the
        // candidate above the floor.
        assert_eq!(outcome.mappings[0].candidates.len(), 1);
        assert!(outcome.mappings[0].candidates[0].low_confidence);
    }
}
