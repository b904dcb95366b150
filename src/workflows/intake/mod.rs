mod normalizer;
mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workflows::competency::benchmark::ReferenceStore;
use crate::workflows::competency::domain::{
    CompetencyLibrary, CompetencyLibraryEntry, FlagSeverity, Job, JobId, LibraryKind,
    PriorityHint, ReferenceDocument, Responsibility,
};

use normalizer::{normalize_text, slugify};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to read intake data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid intake CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Codes attached to extraction warnings surfaced to the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeWarningCode {
    MissingSummary,
    NoResponsibilities,
    EmptyTitle,
}

impl IntakeWarningCode {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeWarningCode::MissingSummary => "MISSING_SUMMARY",
            IntakeWarningCode::NoResponsibilities => "NO_RESPONSIBILITIES",
            IntakeWarningCode::EmptyTitle => "EMPTY_TITLE",
        }
    }
}

/// One extraction warning tied to a source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeWarning {
    pub row: usize,
    pub code: IntakeWarningCode,
    pub severity: FlagSeverity,
    pub detail: String,
}

/// Extraction result: the jobs that survived plus every warning raised.
#[derive(Debug)]
pub struct JobIntakeOutcome {
    pub jobs: Vec<Job>,
    pub warnings: Vec<IntakeWarning>,
}

impl JobIntakeOutcome {
    pub fn missing_summary_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.summary.is_none()).count()
    }
}

/// Imports job rows (Job Title, Job Family, Job Level, Summary,
/// Responsibilities) from tabular CSV data.
pub struct JobImporter;

impl JobImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<JobIntakeOutcome, IntakeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<JobIntakeOutcome, IntakeError> {
        let rows = parser::parse_job_rows(reader)?;
        let mut jobs = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 2; // header occupies row 1

            if row.title.is_empty() {
                warnings.push(IntakeWarning {
                    row: row_number,
                    code: IntakeWarningCode::EmptyTitle,
                    severity: FlagSeverity::Error,
                    detail: "row has no job title and was skipped".to_string(),
                });
                continue;
            }

            if row.responsibilities.is_empty() {
                warnings.push(IntakeWarning {
                    row: row_number,
                    code: IntakeWarningCode::NoResponsibilities,
                    severity: FlagSeverity::Error,
                    detail: format!("job '{}' lists no responsibilities and was skipped", row.title),
                });
                continue;
            }

            if row.summary.is_none() {
                warnings.push(IntakeWarning {
                    row: row_number,
                    code: IntakeWarningCode::MissingSummary,
                    severity: FlagSeverity::Warning,
                    detail: format!("job '{}' has no summary", row.title),
                });
            }

            let job_id = unique_id(&mut seen_ids, &slugify(&row.title));
            let responsibilities = row
                .responsibilities
                .iter()
                .enumerate()
                .map(|(offset, raw)| {
                    let (text, priority_hint) = parse_priority(raw);
                    Responsibility {
                        responsibility_id: format!("{job_id}-r{:02}", offset + 1),
                        raw_text: text.to_string(),
                        normalized_text: normalize_text(text),
                        priority_hint,
                    }
                })
                .collect();

            jobs.push(Job {
                job_id: JobId(job_id),
                title: row.title,
                family: row.family,
                level: row.level,
                summary: row.summary,
                responsibilities,
            });
        }

        Ok(JobIntakeOutcome { jobs, warnings })
    }
}

/// Imports competency rows (Competency Name, Definition, Indicators, Tags)
/// for either library.
pub struct LibraryImporter;

impl LibraryImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        kind: LibraryKind,
    ) -> Result<CompetencyLibrary, IntakeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, kind)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        kind: LibraryKind,
    ) -> Result<CompetencyLibrary, IntakeError> {
        let rows = parser::parse_library_rows(reader)?;
        let mut seen_ids: HashSet<String> = HashSet::new();
        let entries = rows
            .into_iter()
            .filter(|row| !row.name.is_empty())
            .map(|row| CompetencyLibraryEntry {
                competency_id: unique_id(&mut seen_ids, &slugify(&row.name)),
                name: row.name,
                definition: row.definition,
                indicators: row.indicators,
                tags: row.tags,
                source_evidence: row.source_evidence,
            })
            .collect();

        Ok(CompetencyLibrary::new(kind, entries))
    }
}

/// Imports reference documents (Title, Body, Tags) for the benchmark store.
pub struct ReferenceImporter;

impl ReferenceImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ReferenceStore, IntakeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ReferenceStore, IntakeError> {
        let rows = parser::parse_reference_rows(reader)?;
        let mut seen_ids: HashSet<String> = HashSet::new();
        let documents = rows
            .into_iter()
            .filter(|row| !row.title.is_empty())
            .map(|row| ReferenceDocument {
                doc_id: unique_id(&mut seen_ids, &slugify(&row.title)),
                title: row.title,
                body: row.body,
                tags: row.tags,
            })
            .collect();

        Ok(ReferenceStore::new(documents))
    }
}

fn unique_id(seen: &mut HashSet<String>, base: &str) -> String {
    let base = if base.is_empty() { "entry" } else { base };
    if seen.insert(base.to_string()) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// A trailing "[high]" / "[low]" marker on a responsibility line becomes a
/// priority hint.
fn parse_priority(raw: &str) -> (&str, Option<PriorityHint>) {
    let trimmed = raw.trim();
    for (marker, hint) in [
        ("[high]", PriorityHint::High),
        ("[standard]", PriorityHint::Standard),
        ("[low]", PriorityHint::Low),
    ] {
        if let Some(stripped) = trimmed.strip_suffix(marker) {
            return (stripped.trim_end(), Some(hint));
        }
    }
    (trimmed, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const JOBS_CSV: &str = "\
Job Title,Job Family,Job Level,Summary,Responsibilities
Data Engineer,Engineering,Senior,Builds data platforms,\"- Design ingestion pipelines
- Operate the warehouse [high]
1. Tune batch workloads\"
Platform Engineer,Engineering,Mid,,\"* Maintain Kubernetes clusters\"
,,Junior,Orphan row,\"- Something\"
Empty Role,Operations,Mid,Has a summary,
";

    #[test]
    fn imports_jobs_with_split_responsibilities() {
        let outcome = JobImporter::from_reader(Cursor::new(JOBS_CSV)).expect("import succeeds");

        assert_eq!(outcome.jobs.len(), 2);
        let job = &outcome.jobs[0];
        assert_eq!(job.job_id, JobId("data-engineer".to_string()));
        assert_eq!(job.responsibilities.len(), 3);
        assert_eq!(job.responsibilities[0].responsibility_id, "data-engineer-r01");
        assert_eq!(
            job.responsibilities[2].raw_text,
            "Tune batch workloads"
        );
        assert_eq!(
            job.responsibilities[0].normalized_text,
            "design ingestion pipelines"
        );
    }

    #[test]
    fn priority_markers_become_hints() {
        let outcome = JobImporter::from_reader(Cursor::new(JOBS_CSV)).expect("import succeeds");
        let job = &outcome.jobs[0];

        assert_eq!(job.responsibilities[1].raw_text, "Operate the warehouse");
        assert_eq!(job.responsibilities[1].priority_hint, Some(PriorityHint::High));
        assert_eq!(job.responsibilities[0].priority_hint, None);
    }

    #[test]
    fn warnings_cover_missing_summary_and_skipped_rows() {
        let outcome = JobImporter::from_reader(Cursor::new(JOBS_CSV)).expect("import succeeds");

        let codes: Vec<IntakeWarningCode> =
            outcome.warnings.iter().map(|warning| warning.code).collect();
        assert_eq!(
            codes,
            vec![
                IntakeWarningCode::MissingSummary,
                IntakeWarningCode::EmptyTitle,
                IntakeWarningCode::NoResponsibilities,
            ]
        );
        assert_eq!(outcome.warnings[0].severity, FlagSeverity::Warning);
        assert_eq!(outcome.warnings[1].severity, FlagSeverity::Error);
        assert_eq!(outcome.missing_summary_count(), 1);
    }

    #[test]
    fn duplicate_titles_get_distinct_job_ids() {
        let csv = "\
Job Title,Job Family,Job Level,Summary,Responsibilities
Analyst,Ops,Mid,First,\"- Duty one\"
Analyst,Ops,Senior,Second,\"- Duty two\"
";
        let outcome = JobImporter::from_reader(Cursor::new(csv)).expect("import succeeds");

        assert_eq!(outcome.jobs[0].job_id, JobId("analyst".to_string()));
        assert_eq!(outcome.jobs[1].job_id, JobId("analyst-2".to_string()));
    }

    #[test]
    fn imports_library_entries_with_split_indicators() {
        let csv = "\
Competency Name,Definition,Indicators,Tags
Data Modeling,Designs robust data models,\"Models facts and dimensions; Documents schemas\",\"data; modeling\"
SQL Tuning,Optimizes analytical queries,Profiles slow queries,sql
";
        let library = LibraryImporter::from_reader(Cursor::new(csv), LibraryKind::Technical)
            .expect("import succeeds");

        assert_eq!(library.kind, LibraryKind::Technical);
        assert_eq!(library.entries.len(), 2);
        assert_eq!(library.entries[0].competency_id, "data-modeling");
        assert_eq!(library.entries[0].indicators.len(), 2);
        assert_eq!(library.entries[0].tags, vec!["data", "modeling"]);
    }

    #[test]
    fn imports_reference_documents() {
        let csv = "\
Title,Body,Tags
Data Platform Standard,Describes ingestion and modeling practice,data
";
        let store = ReferenceImporter::from_reader(Cursor::new(csv)).expect("import succeeds");

        assert_eq!(store.documents().len(), 1);
        assert_eq!(store.documents()[0].doc_id, "data-platform-standard");
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = JobImporter::from_path("./does-not-exist.csv").expect_err("expected io error");
        assert!(matches!(error, IntakeError::Io(_)));
    }

    #[test]
    fn normalize_strips_bom_and_collapses_whitespace() {
        let normalized = normalizer::normalize_for_tests("\u{feff}Design  Ingestion   Pipelines");
        assert_eq!(normalized, "design ingestion pipelines");
    }

    #[test]
    fn numbered_and_bulleted_lines_are_stripped() {
        let lines = parser::split_responsibilities_for_tests(
            "1. First duty\n- Second duty\n\u{2022} Third duty\n\n12) Fourth duty",
        );
        assert_eq!(
            lines,
            vec!["First duty", "Second duty", "Third duty", "Fourth duty"]
        );
    }
}
