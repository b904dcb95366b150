mod rules;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

use super::domain::FlagSeverity;

/// Single rule evaluation inside a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule: String,
    pub passed: bool,
    pub severity: FlagSeverity,
    pub blocking: bool,
    pub detail: String,
}

/// The four gates in stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    PostExtraction,
    PostMapping,
    PostRemediation,
    PostRanking,
}

impl GateKind {
    pub const fn label(self) -> &'static str {
        match self {
            GateKind::PostExtraction => "post_extraction",
            GateKind::PostMapping => "post_mapping",
            GateKind::PostRemediation => "post_remediation",
            GateKind::PostRanking => "post_ranking",
        }
    }
}

/// Routing verdict for a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Continue,
    Reaudit,
    Fail,
}

/// A gate's evaluated rules plus the routing decision derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: GateKind,
    pub results: Vec<ValidationResult>,
    pub decision: GateDecision,
}

impl GateOutcome {
    pub fn blocking_failures(&self) -> Vec<&ValidationResult> {
        self.results
            .iter()
            .filter(|result| !result.passed && result.blocking)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationResult> {
        self.results
            .iter()
            .filter(|result| !result.passed && !result.blocking)
            .collect()
    }
}

/// Inputs to the post-remediation gate, which owns the reaudit route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemediationGateContext {
    pub clean_count: usize,
    pub remaining_material: usize,
    pub remaining_conflicts: usize,
    pub reaudit_required: bool,
    pub reaudits_remaining: usize,
}

/// Evaluates the fixed rule list after each stage and routes control flow.
/// Non-blocking failures are recorded and execution continues; any failing
/// blocking rule routes to the terminal fail state.
pub struct QualityGate {
    config: PipelineConfig,
}

impl QualityGate {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn post_extraction(&self, job_count: usize, missing_summaries: usize) -> GateOutcome {
        let results = vec![
            rules::jobs_extracted(job_count),
            rules::missing_summary_rate(
                missing_summaries,
                job_count,
                self.config.missing_summary_limit,
            ),
        ];
        finish(GateKind::PostExtraction, results)
    }

    pub fn post_mapping(&self, responsibility_count: usize, unmapped: usize) -> GateOutcome {
        let results = vec![rules::unmapped_rate(
            unmapped,
            responsibility_count,
            self.config.unmapped_rate_limit,
            self.config.lenient,
        )];
        finish(GateKind::PostMapping, results)
    }

    pub fn post_remediation(&self, context: &RemediationGateContext) -> GateOutcome {
        let mut results = vec![rules::clean_set_nonempty(context.clean_count)];

        if results.iter().any(|result| !result.passed && result.blocking) {
            return GateOutcome {
                gate: GateKind::PostRemediation,
                results,
                decision: GateDecision::Fail,
            };
        }

        // Revised items must be audited again before the overlap rule can be
        // judged; the reaudit route takes precedence while budget remains.
        if context.reaudit_required && context.reaudits_remaining > 0 {
            results.push(rules::reaudit_scheduled(context.reaudits_remaining));
            return GateOutcome {
                gate: GateKind::PostRemediation,
                results,
                decision: GateDecision::Reaudit,
            };
        }

        results.push(rules::overlaps_resolved(
            context.remaining_material,
            context.remaining_conflicts,
            self.config.lenient,
        ));
        finish(GateKind::PostRemediation, results)
    }

    pub fn post_ranking(&self, coverage_rate: f32, selection_size: usize) -> GateOutcome {
        let results = vec![
            rules::coverage_floor(coverage_rate, self.config.coverage_floor),
            rules::top_n_size(selection_size, self.config.top_n_bounds),
        ];
        finish(GateKind::PostRanking, results)
    }
}

fn finish(gate: GateKind, results: Vec<ValidationResult>) -> GateOutcome {
    let decision = if results
        .iter()
        .any(|result| !result.passed && result.blocking)
    {
        GateDecision::Fail
    } else {
        GateDecision::Continue
    };
    GateOutcome {
        gate,
        results,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> QualityGate {
        QualityGate::new(PipelineConfig::default())
    }

    fn lenient_gate() -> QualityGate {
        let config = PipelineConfig {
            lenient: true,
            ..PipelineConfig::default()
        };
        QualityGate::new(config)
    }

    #[test]
    fn extraction_fails_when_no_jobs_were_extracted() {
        let outcome = gate().post_extraction(0, 0);

        assert_eq!(outcome.decision, GateDecision::Fail);
        let failure = &outcome.blocking_failures()[0];
        assert_eq!(failure.rule, "jobs_extracted");
        assert_eq!(failure.severity, FlagSeverity::Critical);
    }

    #[test]
    fn missing_summaries_warn_without_blocking() {
        let outcome = gate().post_extraction(10, 2);

        assert_eq!(outcome.decision, GateDecision::Continue);
        assert_eq!(outcome.warnings().len(), 1);
        assert_eq!(outcome.warnings()[0].rule, "missing_summary_rate");
    }

    #[test]
    fn unmapped_rate_over_limit_blocks_by_default() {
        let outcome = gate().post_mapping(10, 1);
        assert_eq!(outcome.decision, GateDecision::Fail);

        let within = gate().post_mapping(100, 5);
        assert_eq!(within.decision, GateDecision::Continue);
    }

    #[test]
    fn lenient_mode_downgrades_unmapped_rate_to_warning() {
        let outcome = lenient_gate().post_mapping(10, 1);

        assert_eq!(outcome.decision, GateDecision::Continue);
        let warning = &outcome.warnings()[0];
        assert_eq!(warning.severity, FlagSeverity::Warning);
        assert!(!warning.blocking);
    }

    #[test]
    fn empty_clean_set_fails_before_anything_else() {
        let outcome = gate().post_remediation(&RemediationGateContext {
            clean_count: 0,
            remaining_material: 0,
            remaining_conflicts: 0,
            reaudit_required: true,
            reaudits_remaining: 1,
        });

        assert_eq!(outcome.decision, GateDecision::Fail);
        assert_eq!(outcome.blocking_failures()[0].rule, "clean_set_nonempty");
    }

    #[test]
    fn revisions_route_to_reaudit_while_budget_remains() {
        let outcome = gate().post_remediation(&RemediationGateContext {
            clean_count: 4,
            remaining_material: 0,
            remaining_conflicts: 0,
            reaudit_required: true,
            reaudits_remaining: 1,
        });

        assert_eq!(outcome.decision, GateDecision::Reaudit);
        assert!(outcome
            .results
            .iter()
            .any(|result| result.rule == "revisions_require_reaudit"));
    }

    #[test]
    fn exhausted_reaudit_budget_judges_remaining_overlaps() {
        let outcome = gate().post_remediation(&RemediationGateContext {
            clean_count: 4,
            remaining_material: 1,
            remaining_conflicts: 0,
            reaudit_required: false,
            reaudits_remaining: 0,
        });

        assert_eq!(outcome.decision, GateDecision::Fail);
        assert_eq!(
            outcome.blocking_failures()[0].rule,
            "material_overlaps_resolved"
        );
    }

    #[test]
    fn clean_remediation_continues() {
        let outcome = gate().post_remediation(&RemediationGateContext {
            clean_count: 4,
            remaining_material: 0,
            remaining_conflicts: 0,
            reaudit_required: false,
            reaudits_remaining: 1,
        });

        assert_eq!(outcome.decision, GateDecision::Continue);
    }

    #[test]
    fn low_coverage_and_odd_top_n_are_warnings_only() {
        let outcome = gate().post_ranking(0.60, 3);

        assert_eq!(outcome.decision, GateDecision::Continue);
        let rules: Vec<&str> = outcome
            .warnings()
            .iter()
            .map(|warning| warning.rule.as_str())
            .collect();
        assert_eq!(rules, vec!["coverage_rate", "top_n_size"]);
    }
}
