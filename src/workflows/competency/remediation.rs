use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::audit::AuditOutcome;
use super::domain::{
    JobId, OverlapSeverity, RemediationAction, RemediationActionKind, TechnicalCompetency,
};

/// Remediation stage output: the clean set, the full action log, and whether
/// the revised items must be audited again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub job_id: JobId,
    pub clean: Vec<TechnicalCompetency>,
    pub log: Vec<RemediationAction>,
    /// True iff any revision occurred. Removals alone never require a
    /// reaudit since removal can only reduce similarity.
    pub reaudit_required: bool,
}

impl RemediationOutcome {
    pub fn removed_count(&self) -> usize {
        self.log
            .iter()
            .filter(|action| action.kind == RemediationActionKind::Removed)
            .count()
    }

    pub fn revised_count(&self) -> usize {
        self.log
            .iter()
            .filter(|action| {
                matches!(
                    action.kind,
                    RemediationActionKind::RevisedDefinition
                        | RemediationActionKind::RevisedIndicators
                )
            })
            .count()
    }
}

/// Applies exactly one action per flagged competency: material overlaps and
/// the second member of each distinctness pair are removed, minor overlaps
/// are revised, everything else passes through unchanged. Runs at most once
/// per pipeline pass; whether revised items still overlap is decided by the
/// reaudit gate, not here.
pub struct OverlapRemediator;

impl OverlapRemediator {
    pub fn remediate(&self, outcome: &AuditOutcome) -> RemediationOutcome {
        let mut removal_reasons: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut revise_reasons: BTreeMap<String, String> = BTreeMap::new();

        for flag in &outcome.audit.overlap_flags {
            match flag.severity {
                OverlapSeverity::Material => {
                    removal_reasons
                        .entry(flag.competency_id.clone())
                        .or_default()
                        .push(format!(
                            "material overlap ({:.2}) with leadership entry '{}'",
                            flag.similarity, flag.target_domain
                        ));
                }
                OverlapSeverity::Minor => {
                    revise_reasons.insert(
                        flag.competency_id.clone(),
                        format!(
                            "minor overlap ({:.2}) with leadership entry '{}'",
                            flag.similarity, flag.target_domain
                        ),
                    );
                }
                OverlapSeverity::None => {}
            }
        }

        for flag in &outcome.audit.distinctness_flags {
            removal_reasons
                .entry(flag.second_id.clone())
                .or_default()
                .push(format!(
                    "{:?} of '{}' at similarity {:.2}",
                    flag.conflict, flag.first_id, flag.similarity
                ));
        }

        let mut clean = Vec::with_capacity(outcome.audited.len());
        let mut log = Vec::with_capacity(outcome.audited.len());
        let mut reaudit_required = false;

        for competency in &outcome.audited {
            if let Some(reasons) = removal_reasons.get(&competency.competency_id) {
                log.push(RemediationAction {
                    competency_id: competency.competency_id.clone(),
                    kind: RemediationActionKind::Removed,
                    before: competency.clone(),
                    after: None,
                    rationale: reasons.join("; "),
                });
                continue;
            }

            if let Some(reason) = revise_reasons.get(&competency.competency_id) {
                let revised = revise(competency);
                reaudit_required = true;
                log.push(RemediationAction {
                    competency_id: competency.competency_id.clone(),
                    kind: RemediationActionKind::RevisedDefinition,
                    before: competency.clone(),
                    after: Some(revised.clone()),
                    rationale: reason.clone(),
                });
                clean.push(revised);
                continue;
            }

            log.push(RemediationAction {
                competency_id: competency.competency_id.clone(),
                kind: RemediationActionKind::NoAction,
                before: competency.clone(),
                after: None,
                rationale: "no overlap or distinctness flags".to_string(),
            });
            clean.push(competency.clone());
        }

        RemediationOutcome {
            job_id: outcome.audit.job_id.clone(),
            clean,
            log,
            reaudit_required,
        }
    }
}

fn revise(competency: &TechnicalCompetency) -> TechnicalCompetency {
    let mut revised = competency.clone();

    revised.definition = format!(
        "Technical execution of {}: {}",
        competency.name, competency.definition
    );
    revised.why_it_matters = format!(
        "Captures the hands-on technical execution of {}, distinct from the leadership \
         expectations it borders on.",
        competency.name
    );
    revised.overlap.severity = OverlapSeverity::Minor;
    revised
        .overlap
        .remediation_notes
        .push("definition re-scoped to technical execution".to_string());
    revised
        .overlap
        .remediation_notes
        .push("why-it-matters reworded".to_string());
    revised.recompute_quality();

    revised
}
