mod runner;
mod snapshot;

pub use runner::{CancellationFlag, PipelineRunner};
pub use snapshot::{MemorySnapshotStore, SnapshotKey, SnapshotStore, StoreError, StoredSnapshot};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;

use super::audit::OverlapAuditor;
use super::benchmark::{BenchmarkStage, ReferenceStore};
use super::domain::{
    CompetencyLibrary, CoverageSummary, FlagSeverity, Job, JobId, PipelineStage,
    RankedCompetency, RemediationAction, RunFlag,
};
use super::gate::{GateDecision, GateOutcome, QualityGate, RemediationGateContext};
use super::mapping::CandidateMapper;
use super::normalize::CompetencyNormalizer;
use super::oracle::ScoringOracle;
use super::ranking::{CriticalityRanker, RankingConfig};
use super::remediation::OverlapRemediator;
use super::similarity::SimilarityScorer;

/// Stage labels used for snapshot keys.
mod stages {
    pub const EXTRACTION: &str = "extraction";
    pub const MAPPING: &str = "mapping";
    pub const NORMALIZED: &str = "normalized";
    pub const AUDIT: &str = "audit";
    pub const CLEAN: &str = "clean";
    pub const REMEDIATION_LOG: &str = "remediation-log";
    pub const BENCHMARKED: &str = "benchmarked";
    pub const RANKED: &str = "ranked";
}

/// Infrastructure failures; domain findings travel as run flags instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize stage artifact: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Shared inputs a run needs besides the jobs themselves.
#[derive(Debug, Clone)]
pub struct PipelineMaterials {
    pub technical: CompetencyLibrary,
    pub leadership: CompetencyLibrary,
    pub references: ReferenceStore,
}

/// Everything recorded about one job's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRunReport {
    pub job_id: JobId,
    pub job_title: String,
    pub final_stage: PipelineStage,
    pub last_completed_stage: PipelineStage,
    pub reaudited: bool,
    pub flags: Vec<RunFlag>,
    pub gates: Vec<GateOutcome>,
    pub unmapped: Vec<String>,
    pub remediation_log: Vec<RemediationAction>,
    pub ranked: Vec<RankedCompetency>,
    pub coverage: Option<CoverageSummary>,
}

impl JobRunReport {
    pub fn succeeded(&self) -> bool {
        self.final_stage == PipelineStage::Done
    }

    pub fn blocking_flags(&self) -> Vec<&RunFlag> {
        self.flags
            .iter()
            .filter(|flag| flag.severity >= FlagSeverity::Error)
            .collect()
    }
}

/// Terminal state of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Completed,
    CompletedWithWarnings,
    Failed,
}

impl RunState {
    pub const fn label(self) -> &'static str {
        match self {
            RunState::Completed => "completed",
            RunState::CompletedWithWarnings => "completed_with_warnings",
            RunState::Failed => "failed",
        }
    }
}

/// Aggregated result for a full run across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: RunState,
    pub extraction_gate: GateOutcome,
    pub flags: Vec<RunFlag>,
    pub jobs: Vec<JobRunReport>,
    pub skipped_jobs: Vec<JobId>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.state != RunState::Failed
    }

    pub fn blocking_flags(&self) -> Vec<&RunFlag> {
        self.flags
            .iter()
            .chain(self.jobs.iter().flat_map(|job| job.flags.iter()))
            .filter(|flag| flag.severity >= FlagSeverity::Error)
            .collect()
    }
}

/// Per-job engine: strictly sequential stages, each producing a fresh
/// immutable snapshot, with the quality gate routing between them.
pub struct CompetencyPipeline {
    config: PipelineConfig,
    scorer: SimilarityScorer,
    gate: QualityGate,
    store: Arc<dyn SnapshotStore>,
}

impl CompetencyPipeline {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        config: PipelineConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let scorer = SimilarityScorer::new(oracle);
        let gate = QualityGate::new(config.clone());
        Self {
            config,
            scorer,
            gate,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Run-level gate evaluated once before jobs are dispatched.
    pub fn extraction_gate(&self, jobs: &[Job]) -> GateOutcome {
        let missing_summaries = jobs.iter().filter(|job| job.summary.is_none()).count();
        self.gate.post_extraction(jobs.len(), missing_summaries)
    }

    pub fn run_job(
        &self,
        run_id: &str,
        job: &Job,
        materials: &PipelineMaterials,
    ) -> Result<JobRunReport, PipelineError> {
        let job_key = job.job_id.0.as_str();
        let mut flags: Vec<RunFlag> = Vec::new();
        let mut gates: Vec<GateOutcome> = Vec::new();

        self.snapshot(run_id, job_key, stages::EXTRACTION, job)?;

        // MAP
        let mapper = CandidateMapper::new(self.scorer.clone(), &self.config);
        let mapping = mapper.map_job(job, &materials.technical);
        self.snapshot(run_id, job_key, stages::MAPPING, &mapping)?;
        if mapping.low_confidence_pairs > 0 {
            flags.push(RunFlag::new(
                PipelineStage::Map,
                FlagSeverity::Info,
                "LOW_CONFIDENCE",
                format!(
                    "{} scored pair(s) fell back to the neutral default",
                    mapping.low_confidence_pairs
                ),
            ));
        }

        let mapping_gate = self
            .gate
            .post_mapping(job.responsibilities.len(), mapping.unmapped.len());
        record_gate(&mapping_gate, PipelineStage::Map, &mut flags);
        let mapping_failed = mapping_gate.decision == GateDecision::Fail;
        gates.push(mapping_gate);
        if mapping_failed {
            warn!(job = job_key, "mapping gate failed");
            return Ok(self.failed_report(
                job,
                PipelineStage::Map,
                flags,
                gates,
                mapping.unmapped,
            ));
        }

        // NORMALIZE
        let normalizer = CompetencyNormalizer::new(&self.config);
        let normalized = normalizer.normalize(job, &mapping, &materials.technical);
        self.snapshot(run_id, job_key, stages::NORMALIZED, &normalized)?;
        if normalized.is_empty() {
            flags.push(RunFlag::new(
                PipelineStage::Normalize,
                FlagSeverity::Critical,
                "NO_COMPETENCIES",
                "normalization produced zero competencies",
            ));
            return Ok(self.failed_report(
                job,
                PipelineStage::Normalize,
                flags,
                gates,
                mapping.unmapped,
            ));
        }

        // AUDIT ⇄ REMEDIATE
        let auditor = OverlapAuditor::new(self.scorer.clone(), self.config.thresholds);
        let first_audit = auditor.audit(&job.job_id, &normalized, &materials.leadership);
        self.snapshot(run_id, job_key, stages::AUDIT, &first_audit.audit)?;

        let remediation = OverlapRemediator.remediate(&first_audit);
        self.snapshot(run_id, job_key, stages::CLEAN, &remediation.clean)?;
        self.snapshot(run_id, job_key, stages::REMEDIATION_LOG, &remediation.log)?;
        flags.push(RunFlag::new(
            PipelineStage::Remediate,
            FlagSeverity::Info,
            "REMEDIATION_SUMMARY",
            format!(
                "{} removed, {} revised, {} untouched",
                remediation.removed_count(),
                remediation.revised_count(),
                remediation.clean.len() - remediation.revised_count()
            ),
        ));

        let mut clean = remediation.clean;
        let mut reaudited = false;

        let first_gate = self.gate.post_remediation(&RemediationGateContext {
            clean_count: clean.len(),
            remaining_material: 0,
            remaining_conflicts: 0,
            reaudit_required: remediation.reaudit_required,
            reaudits_remaining: self.config.max_reaudits,
        });
        record_gate(&first_gate, PipelineStage::Remediate, &mut flags);
        let decision = first_gate.decision;
        gates.push(first_gate);

        match decision {
            GateDecision::Fail => {
                return Ok(self.failed_report(
                    job,
                    PipelineStage::Remediate,
                    flags,
                    gates,
                    mapping.unmapped,
                ));
            }
            GateDecision::Reaudit => {
                reaudited = true;
                info!(job = job_key, "revisions re-enter the overlap auditor");
                let second_audit = auditor.audit(&job.job_id, &clean, &materials.leadership);
                self.snapshot(run_id, job_key, stages::AUDIT, &second_audit.audit)?;
                clean = second_audit.audited;

                let reaudit_gate = self.gate.post_remediation(&RemediationGateContext {
                    clean_count: clean.len(),
                    remaining_material: second_audit.audit.material_overlap_count(),
                    remaining_conflicts: second_audit.audit.distinctness_flags.len(),
                    reaudit_required: false,
                    reaudits_remaining: 0,
                });
                record_gate(&reaudit_gate, PipelineStage::Audit, &mut flags);
                let reaudit_failed = reaudit_gate.decision == GateDecision::Fail;
                gates.push(reaudit_gate);
                if reaudit_failed {
                    warn!(job = job_key, "overlaps persisted after the bounded reaudit");
                    let mut report = self.failed_report(
                        job,
                        PipelineStage::Audit,
                        flags,
                        gates,
                        mapping.unmapped,
                    );
                    report.reaudited = true;
                    return Ok(report);
                }
            }
            GateDecision::Continue => {}
        }

        // BENCHMARK
        let benchmarked = BenchmarkStage::new(&materials.references).benchmark(&clean);
        self.snapshot(run_id, job_key, stages::BENCHMARKED, &benchmarked)?;

        // RANK
        let ranker = CriticalityRanker::new(RankingConfig::from_pipeline(&self.config));
        let ranking = ranker.rank(&job.job_id, &benchmarked);
        self.snapshot(run_id, job_key, stages::RANKED, &ranking)?;

        let ranking_gate = self
            .gate
            .post_ranking(ranking.coverage.coverage_rate, ranking.ranked.len());
        record_gate(&ranking_gate, PipelineStage::Rank, &mut flags);
        let ranking_failed = ranking_gate.decision == GateDecision::Fail;
        gates.push(ranking_gate);
        if ranking_failed {
            return Ok(self.failed_report(
                job,
                PipelineStage::Rank,
                flags,
                gates,
                mapping.unmapped,
            ));
        }

        info!(
            job = job_key,
            selected = ranking.ranked.len(),
            coverage = ranking.coverage.coverage_rate,
            "job pipeline complete"
        );

        Ok(JobRunReport {
            job_id: job.job_id.clone(),
            job_title: job.title.clone(),
            final_stage: PipelineStage::Done,
            last_completed_stage: PipelineStage::Rank,
            reaudited,
            flags,
            gates,
            unmapped: mapping.unmapped,
            remediation_log: remediation.log,
            ranked: ranking.ranked,
            coverage: Some(ranking.coverage),
        })
    }

    fn failed_report(
        &self,
        job: &Job,
        last_completed_stage: PipelineStage,
        flags: Vec<RunFlag>,
        gates: Vec<GateOutcome>,
        unmapped: Vec<String>,
    ) -> JobRunReport {
        JobRunReport {
            job_id: job.job_id.clone(),
            job_title: job.title.clone(),
            final_stage: PipelineStage::Failed,
            last_completed_stage,
            reaudited: false,
            flags,
            gates,
            unmapped,
            remediation_log: Vec::new(),
            ranked: Vec::new(),
            coverage: None,
        }
    }

    fn snapshot<T: serde::Serialize>(
        &self,
        run_id: &str,
        job_id: &str,
        stage: &str,
        value: &T,
    ) -> Result<u32, PipelineError> {
        let key = SnapshotKey::new(run_id, job_id, stage);
        let payload = serde_json::to_value(value)?;
        Ok(self.store.put(&key, payload)?)
    }
}

fn record_gate(outcome: &GateOutcome, stage: PipelineStage, flags: &mut Vec<RunFlag>) {
    for result in &outcome.results {
        if result.passed {
            continue;
        }
        flags.push(RunFlag::new(
            stage,
            result.severity,
            &result.rule.to_uppercase(),
            result.detail.clone(),
        ));
    }
    if outcome.decision == GateDecision::Continue {
        flags.push(RunFlag::new(
            stage,
            FlagSeverity::Info,
            "GATE_PASSED",
            format!("{} gate cleared", outcome.gate.label()),
        ));
    }
}
