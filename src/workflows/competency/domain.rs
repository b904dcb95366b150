use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for ingested jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

/// A job description as produced by intake. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub title: String,
    pub family: String,
    pub level: String,
    pub summary: Option<String>,
    pub responsibilities: Vec<Responsibility>,
}

impl Job {
    pub fn has_responsibility(&self, responsibility_id: &str) -> bool {
        self.responsibilities
            .iter()
            .any(|responsibility| responsibility.responsibility_id == responsibility_id)
    }
}

/// An atomic duty statement, the unit of coverage accounting. Created at
/// intake and only referenced by id afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsibility {
    pub responsibility_id: String,
    pub raw_text: String,
    pub normalized_text: String,
    pub priority_hint: Option<PriorityHint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityHint {
    High,
    Standard,
    Low,
}

impl PriorityHint {
    pub const fn label(self) -> &'static str {
        match self {
            PriorityHint::High => "high",
            PriorityHint::Standard => "standard",
            PriorityHint::Low => "low",
        }
    }
}

/// Distinguishes the mapping source library from the overlap reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LibraryKind {
    /// Mapping source for responsibility candidates.
    Technical,
    /// Overlap reference only, never a mapping target.
    Leadership,
}

impl LibraryKind {
    pub const fn label(self) -> &'static str {
        match self {
            LibraryKind::Technical => "technical",
            LibraryKind::Leadership => "leadership",
        }
    }
}

/// Raw library row after intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyLibraryEntry {
    pub competency_id: String,
    pub name: String,
    pub definition: String,
    pub indicators: Vec<String>,
    pub tags: Vec<String>,
    pub source_evidence: Option<String>,
}

/// One ingested competency library with its role in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyLibrary {
    pub kind: LibraryKind,
    pub entries: Vec<CompetencyLibraryEntry>,
}

impl CompetencyLibrary {
    pub fn new(kind: LibraryKind, entries: Vec<CompetencyLibraryEntry>) -> Self {
        Self { kind, entries }
    }

    pub fn entry(&self, competency_id: &str) -> Option<&CompetencyLibraryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.competency_id == competency_id)
    }
}

/// Scored (responsibility, competency) tuple. Ephemeral: produced and
/// consumed inside the mapping stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyCandidate {
    pub competency_id: String,
    pub lexical: f32,
    pub semantic: f32,
    pub contextual: f32,
    pub relevance: f32,
    pub low_confidence: bool,
}

/// Candidate list for one responsibility, descending relevance, capped at K.
/// An empty list means the responsibility is unmapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityMapping {
    pub responsibility_id: String,
    pub candidates: Vec<CompetencyCandidate>,
}

impl ResponsibilityMapping {
    pub fn is_unmapped(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn top_candidate(&self) -> Option<&CompetencyCandidate> {
        self.candidates.first()
    }
}

/// How strongly a responsibility leans on a competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contribution {
    Primary,
    Secondary,
    Supporting,
}

impl Contribution {
    pub const fn label(self) -> &'static str {
        match self {
            Contribution::Primary => "primary",
            Contribution::Secondary => "secondary",
            Contribution::Supporting => "supporting",
        }
    }
}

/// Link from a normalized competency back to a source responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityTrace {
    pub responsibility_id: String,
    pub contribution: Contribution,
    pub relevance: f32,
}

/// Overlap audit verdict carried on each competency. Empty until the audit
/// stage populates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapCheck {
    pub severity: OverlapSeverity,
    pub max_similarity: f32,
    pub nearest_entry: Option<String>,
    pub remediation_notes: Vec<String>,
}

impl Default for OverlapCheck {
    fn default() -> Self {
        Self {
            severity: OverlapSeverity::None,
            max_similarity: 0.0,
            nearest_entry: None,
            remediation_notes: Vec::new(),
        }
    }
}

/// Benchmark alignment carried on each competency. Empty until the
/// benchmarking stage populates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkingRecord {
    pub alignment_score: Option<f32>,
    pub matched_sources: Vec<String>,
}

/// Recomputed quality metadata for downstream gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityMetadata {
    pub definition_word_count: usize,
    pub indicator_count: usize,
}

/// Canonical competency record produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalCompetency {
    pub competency_id: String,
    pub name: String,
    pub definition: String,
    pub why_it_matters: String,
    pub behavioral_indicators: Vec<String>,
    pub applied_scope: Vec<String>,
    pub traces: Vec<ResponsibilityTrace>,
    pub overlap: OverlapCheck,
    pub benchmarking: BenchmarkingRecord,
    pub quality: QualityMetadata,
}

impl TechnicalCompetency {
    pub fn covered_responsibilities(&self) -> BTreeSet<String> {
        self.traces
            .iter()
            .map(|trace| trace.responsibility_id.clone())
            .collect()
    }

    pub fn has_primary_trace(&self) -> bool {
        self.traces
            .iter()
            .any(|trace| trace.contribution == Contribution::Primary)
    }

    pub fn recompute_quality(&mut self) {
        self.quality = QualityMetadata {
            definition_word_count: self.definition.split_whitespace().count(),
            indicator_count: self.behavioral_indicators.len(),
        };
    }
}

/// Severity of a cross-library overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapSeverity {
    None,
    Minor,
    Material,
}

impl OverlapSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            OverlapSeverity::None => "none",
            OverlapSeverity::Minor => "minor",
            OverlapSeverity::Material => "material",
        }
    }
}

/// Suggested disposition for a flagged competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedAction {
    Keep,
    Revise,
    Remove,
    Replace,
    Review,
}

/// Cross-library overlap finding for one competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapFlag {
    pub competency_id: String,
    pub severity: OverlapSeverity,
    pub similarity: f32,
    pub target_domain: String,
    pub action: SuggestedAction,
}

/// Conflict classification for two competencies within the same job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistinctnessConflict {
    Duplicate,
    NearDuplicate,
    SemanticOverlap,
}

/// Within-job near-duplicate pair; the second member (insertion order) is
/// the removal candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinctnessFlag {
    pub first_id: String,
    pub second_id: String,
    pub similarity: f32,
    pub conflict: DistinctnessConflict,
}

/// All overlap findings for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOverlapAudit {
    pub job_id: JobId,
    pub overlap_flags: Vec<OverlapFlag>,
    pub distinctness_flags: Vec<DistinctnessFlag>,
    pub audit_passed: bool,
}

impl JobOverlapAudit {
    pub fn material_overlap_count(&self) -> usize {
        self.overlap_flags
            .iter()
            .filter(|flag| flag.severity == OverlapSeverity::Material)
            .count()
    }
}

/// What the remediator did to one competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationActionKind {
    Removed,
    RevisedDefinition,
    RevisedIndicators,
    Replaced,
    NoAction,
}

impl RemediationActionKind {
    pub const fn label(self) -> &'static str {
        match self {
            RemediationActionKind::Removed => "removed",
            RemediationActionKind::RevisedDefinition => "revised_definition",
            RemediationActionKind::RevisedIndicators => "revised_indicators",
            RemediationActionKind::Replaced => "replaced",
            RemediationActionKind::NoAction => "no_action",
        }
    }
}

/// One remediation log entry with before/after snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub competency_id: String,
    pub kind: RemediationActionKind,
    pub before: TechnicalCompetency,
    pub after: Option<TechnicalCompetency>,
    pub rationale: String,
}

/// Six normalized sub-scores feeding the criticality ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalityFactors {
    pub coverage: f32,
    pub impact_risk: f32,
    pub frequency: f32,
    pub complexity: f32,
    pub differentiation: f32,
    pub time_to_proficiency: f32,
}

/// A competency selected into the top-N, with its scoring trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCompetency {
    pub rank: usize,
    pub competency: TechnicalCompetency,
    pub criticality_score: f32,
    pub factors: CriticalityFactors,
    pub rationale: String,
    pub covered_responsibilities: Vec<String>,
}

/// Responsibility coverage of the top-N relative to the full clean set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_responsibilities: usize,
    pub covered_responsibilities: usize,
    pub coverage_rate: f32,
    pub uncovered: Vec<String>,
}

/// Severity taxonomy for run flags and validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlagSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl FlagSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            FlagSeverity::Info => "info",
            FlagSeverity::Warning => "warning",
            FlagSeverity::Error => "error",
            FlagSeverity::Critical => "critical",
        }
    }
}

/// Pipeline stages; also used to attribute run flags and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Ingest,
    Map,
    Normalize,
    Audit,
    Remediate,
    Benchmark,
    Rank,
    Done,
    Failed,
}

impl PipelineStage {
    pub const fn label(self) -> &'static str {
        match self {
            PipelineStage::Ingest => "ingest",
            PipelineStage::Map => "map",
            PipelineStage::Normalize => "normalize",
            PipelineStage::Audit => "audit",
            PipelineStage::Remediate => "remediate",
            PipelineStage::Benchmark => "benchmark",
            PipelineStage::Rank => "rank",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

/// A flag recorded against the run rather than raised up the stack; the
/// quality gate alone decides whether accumulated flags terminate the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFlag {
    pub stage: PipelineStage,
    pub severity: FlagSeverity,
    pub code: String,
    pub detail: String,
}

impl RunFlag {
    pub fn new(
        stage: PipelineStage,
        severity: FlagSeverity,
        code: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            severity,
            code: code.to_string(),
            detail: detail.into(),
        }
    }
}

/// Reference document used by the benchmarking stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub doc_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}
