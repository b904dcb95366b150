use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::info;

use crate::workflows::competency::domain::{FlagSeverity, Job, PipelineStage, RunFlag};
use crate::workflows::competency::gate::GateDecision;

use super::{CompetencyPipeline, PipelineError, PipelineMaterials, RunReport, RunState};

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> String {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("run-{id:06}")
}

/// Run-level cancellation: stops dispatching new jobs while letting
/// in-flight jobs reach their next gate cleanly.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fans independent jobs out to a bounded worker pool. Stages within a job
/// stay strictly sequential; the scorer cache is the only state shared
/// across workers.
pub struct PipelineRunner {
    pipeline: Arc<CompetencyPipeline>,
}

impl PipelineRunner {
    pub fn new(pipeline: Arc<CompetencyPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<CompetencyPipeline> {
        &self.pipeline
    }

    pub async fn run(
        &self,
        jobs: Vec<Job>,
        materials: PipelineMaterials,
        cancellation: CancellationFlag,
    ) -> Result<RunReport, PipelineError> {
        let run_id = next_run_id();
        let started_at = Utc::now();
        info!(run = run_id.as_str(), jobs = jobs.len(), "pipeline run starting");

        let extraction_gate = self.pipeline.extraction_gate(&jobs);
        let mut flags: Vec<RunFlag> = Vec::new();
        for result in &extraction_gate.results {
            if !result.passed {
                flags.push(RunFlag::new(
                    PipelineStage::Ingest,
                    result.severity,
                    &result.rule.to_uppercase(),
                    result.detail.clone(),
                ));
            }
        }

        if extraction_gate.decision == GateDecision::Fail {
            return Ok(RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                state: RunState::Failed,
                extraction_gate,
                flags,
                jobs: Vec::new(),
                skipped_jobs: Vec::new(),
            });
        }

        let materials = Arc::new(materials);
        let semaphore = Arc::new(Semaphore::new(self.pipeline.config().concurrency));
        let mut handles = Vec::with_capacity(jobs.len());
        let mut skipped_jobs = Vec::new();

        for job in jobs {
            if cancellation.is_cancelled() {
                flags.push(RunFlag::new(
                    PipelineStage::Ingest,
                    FlagSeverity::Info,
                    "DISPATCH_CANCELLED",
                    format!("job {} not dispatched after cancellation", job.job_id.0),
                ));
                skipped_jobs.push(job.job_id);
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|err| PipelineError::Worker(err.to_string()))?;
            let pipeline = self.pipeline.clone();
            let materials = materials.clone();
            let run_id = run_id.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let report = pipeline.run_job(&run_id, &job, &materials);
                drop(permit);
                report
            }));
        }

        let mut job_reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let report = handle
                .await
                .map_err(|err| PipelineError::Worker(err.to_string()))??;
            job_reports.push(report);
        }

        let any_failed = job_reports.iter().any(|report| !report.succeeded());
        let any_warnings = flags
            .iter()
            .chain(job_reports.iter().flat_map(|report| report.flags.iter()))
            .any(|flag| flag.severity == FlagSeverity::Warning);

        let state = if any_failed {
            RunState::Failed
        } else if any_warnings {
            RunState::CompletedWithWarnings
        } else {
            RunState::Completed
        };

        info!(
            run = run_id.as_str(),
            state = state.label(),
            jobs = job_reports.len(),
            skipped = skipped_jobs.len(),
            "pipeline run finished"
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            state,
            extraction_gate,
            flags,
            jobs: job_reports,
            skipped_jobs,
        })
    }
}
