use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflows::intake::{
    IntakeError, IntakeWarning, JobImporter, LibraryImporter, ReferenceImporter,
};

use super::benchmark::ReferenceStore;
use super::domain::{LibraryKind, ReferenceDocument};
use super::pipeline::{
    CancellationFlag, PipelineError, PipelineMaterials, PipelineRunner, RunReport,
};

/// Inline CSV payloads plus per-run options for the run endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSubmission {
    pub jobs_csv: String,
    pub technical_csv: String,
    pub leadership_csv: String,
    #[serde(default)]
    pub references_csv: Option<String>,
}

/// Run endpoint response: the extraction warnings plus the full report.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub intake_warnings: Vec<IntakeWarning>,
    pub report: RunReport,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Service composing intake, the pipeline runner, and the run registry that
/// backs inspection.
pub struct CompetencyService {
    runner: PipelineRunner,
    references: ReferenceStore,
    runs: Mutex<HashMap<String, RunReport>>,
}

impl CompetencyService {
    pub fn new(runner: PipelineRunner, references: ReferenceStore) -> Self {
        Self {
            runner,
            references,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Parse the submitted CSV payloads, run the pipeline, and register the
    /// report for later inspection.
    pub async fn run_from_csv(
        &self,
        submission: RunSubmission,
    ) -> Result<RunOutcome, ServiceError> {
        let intake = JobImporter::from_reader(Cursor::new(submission.jobs_csv.into_bytes()))?;
        let technical = LibraryImporter::from_reader(
            Cursor::new(submission.technical_csv.into_bytes()),
            LibraryKind::Technical,
        )?;
        let leadership = LibraryImporter::from_reader(
            Cursor::new(submission.leadership_csv.into_bytes()),
            LibraryKind::Leadership,
        )?;
        let references = match submission.references_csv {
            Some(csv) => ReferenceImporter::from_reader(Cursor::new(csv.into_bytes()))?,
            None => self.references.clone(),
        };

        let materials = PipelineMaterials {
            technical,
            leadership,
            references,
        };
        let report = self
            .runner
            .run(intake.jobs, materials, CancellationFlag::default())
            .await?;

        if let Ok(mut registry) = self.runs.lock() {
            registry.insert(report.run_id.clone(), report.clone());
        }

        Ok(RunOutcome {
            intake_warnings: intake.warnings,
            report,
        })
    }

    pub fn run_report(&self, run_id: &str) -> Option<RunReport> {
        self.runs
            .lock()
            .ok()
            .and_then(|registry| registry.get(run_id).cloned())
    }

    pub fn search_references(&self, query: &str) -> Vec<ReferenceDocument> {
        self.references
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Router builder exposing the pipeline over HTTP.
pub fn competency_router(service: Arc<CompetencyService>) -> Router {
    Router::new()
        .route("/api/v1/competency/runs", post(run_handler))
        .route("/api/v1/competency/runs/:run_id", get(inspect_handler))
        .route("/api/v1/reference/search", get(search_handler))
        .with_state(service)
}

pub(crate) async fn run_handler(
    State(service): State<Arc<CompetencyService>>,
    axum::Json(submission): axum::Json<RunSubmission>,
) -> Response {
    match service.run_from_csv(submission).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(ServiceError::Intake(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn inspect_handler(
    State(service): State<Arc<CompetencyService>>,
    Path(run_id): Path<String>,
) -> Response {
    match service.run_report(&run_id) {
        Some(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        None => {
            let payload = json!({ "error": format!("run '{run_id}' not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    q: String,
}

pub(crate) async fn search_handler(
    State(service): State<Arc<CompetencyService>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let matches = service.search_references(&params.q);
    (StatusCode::OK, axum::Json(matches)).into_response()
}
