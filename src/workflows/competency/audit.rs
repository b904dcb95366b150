use serde::{Deserialize, Serialize};

use crate::config::OverlapThresholds;

use super::domain::{
    CompetencyLibrary, DistinctnessConflict, DistinctnessFlag, JobId, JobOverlapAudit,
    LibraryKind, OverlapCheck, OverlapFlag, OverlapSeverity, SuggestedAction,
    TechnicalCompetency,
};
use super::similarity::SimilarityScorer;

/// Audit stage output: the findings plus a re-annotated competency snapshot
/// whose `OverlapCheck` fields reflect this pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub audit: JobOverlapAudit,
    pub audited: Vec<TechnicalCompetency>,
}

/// Compares normalized competencies against the leadership library and
/// against their own job-siblings. Auditing an already-clean set is
/// idempotent: it yields the same empty flag lists every time.
pub struct OverlapAuditor {
    scorer: SimilarityScorer,
    thresholds: OverlapThresholds,
}

impl OverlapAuditor {
    pub fn new(scorer: SimilarityScorer, thresholds: OverlapThresholds) -> Self {
        Self { scorer, thresholds }
    }

    pub fn audit(
        &self,
        job_id: &JobId,
        competencies: &[TechnicalCompetency],
        leadership: &CompetencyLibrary,
    ) -> AuditOutcome {
        debug_assert_eq!(leadership.kind, LibraryKind::Leadership);

        let mut overlap_flags = Vec::new();
        let mut audited = Vec::with_capacity(competencies.len());

        for competency in competencies {
            let mut max_similarity = 0.0f32;
            let mut nearest_entry: Option<String> = None;

            for entry in &leadership.entries {
                let (similarity, _) = self
                    .scorer
                    .semantic(&competency.definition, &entry.definition);
                if similarity > max_similarity {
                    max_similarity = similarity;
                    nearest_entry = Some(entry.name.clone());
                }
            }

            let severity = self.classify(max_similarity);
            if severity != OverlapSeverity::None {
                let action = match severity {
                    OverlapSeverity::Material => SuggestedAction::Remove,
                    OverlapSeverity::Minor => SuggestedAction::Revise,
                    OverlapSeverity::None => SuggestedAction::Keep,
                };
                overlap_flags.push(OverlapFlag {
                    competency_id: competency.competency_id.clone(),
                    severity,
                    similarity: max_similarity,
                    target_domain: nearest_entry
                        .clone()
                        .unwrap_or_else(|| "leadership".to_string()),
                    action,
                });
            }

            let mut annotated = competency.clone();
            annotated.overlap = OverlapCheck {
                severity,
                max_similarity,
                nearest_entry,
                // Notes from an earlier remediation pass survive reaudit.
                remediation_notes: competency.overlap.remediation_notes.clone(),
            };
            audited.push(annotated);
        }

        let distinctness_flags = self.distinctness(competencies);
        let audit_passed = overlap_flags
            .iter()
            .all(|flag| flag.severity != OverlapSeverity::Material)
            && distinctness_flags.is_empty();

        AuditOutcome {
            audit: JobOverlapAudit {
                job_id: job_id.clone(),
                overlap_flags,
                distinctness_flags,
                audit_passed,
            },
            audited,
        }
    }

    fn classify(&self, similarity: f32) -> OverlapSeverity {
        if similarity >= self.thresholds.material {
            OverlapSeverity::Material
        } else if similarity >= self.thresholds.minor {
            OverlapSeverity::Minor
        } else {
            OverlapSeverity::None
        }
    }

    fn distinctness(&self, competencies: &[TechnicalCompetency]) -> Vec<DistinctnessFlag> {
        let mut flags = Vec::new();
        for (index, first) in competencies.iter().enumerate() {
            for second in competencies.iter().skip(index + 1) {
                let (similarity, _) = self.scorer.semantic(&first.definition, &second.definition);
                if similarity < self.thresholds.duplicate {
                    continue;
                }

                let conflict = if similarity >= self.thresholds.identical {
                    DistinctnessConflict::Duplicate
                } else {
                    DistinctnessConflict::NearDuplicate
                };
                // The second member by insertion order is the removal
                // candidate.
                flags.push(DistinctnessFlag {
                    first_id: first.competency_id.clone(),
                    second_id: second.competency_id.clone(),
                    similarity,
                    conflict,
                });
            }
        }
        flags
    }
}
