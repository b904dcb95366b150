//! Competency-graph construction, overlap resolution, and criticality
//! ranking. Stages hand immutable artifacts downstream (mapper → normalizer
//! → auditor ⇄ remediator → benchmark → ranker) with a quality gate routing
//! control flow between them.

pub mod audit;
pub mod benchmark;
pub mod domain;
pub mod gate;
pub mod mapping;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod ranking;
pub mod remediation;
pub mod router;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use audit::{AuditOutcome, OverlapAuditor};
pub use benchmark::{BenchmarkStage, ReferenceStore};
pub use domain::{
    CompetencyLibrary, CompetencyLibraryEntry, Contribution, CoverageSummary,
    DistinctnessConflict, DistinctnessFlag, FlagSeverity, Job, JobId, JobOverlapAudit,
    LibraryKind, OverlapFlag, OverlapSeverity, PipelineStage, PriorityHint, RankedCompetency,
    ReferenceDocument, RemediationAction, RemediationActionKind, Responsibility,
    ResponsibilityMapping, ResponsibilityTrace, RunFlag, SuggestedAction, TechnicalCompetency,
};
pub use gate::{GateDecision, GateKind, GateOutcome, QualityGate, ValidationResult};
pub use mapping::{CandidateMapper, MappingOutcome};
pub use normalize::CompetencyNormalizer;
pub use oracle::{DiceOracle, OracleError, ResilientOracle, RetryPolicy, ScoringOracle, StaticOracle};
pub use pipeline::{
    CancellationFlag, CompetencyPipeline, JobRunReport, MemorySnapshotStore, PipelineError,
    PipelineMaterials, PipelineRunner, RunReport, RunState, SnapshotKey, SnapshotStore,
};
pub use ranking::{CriticalityRanker, FactorWeights, RankingConfig, RankingOutcome};
pub use remediation::{OverlapRemediator, RemediationOutcome};
pub use router::{competency_router, CompetencyService, RunSubmission, ServiceError};
pub use similarity::{SimilarityScore, SimilarityScorer};
