use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::workflows::competency::benchmark::ReferenceStore;
use crate::workflows::competency::domain::{
    CompetencyLibrary, CompetencyLibraryEntry, Job, JobId, LibraryKind, Responsibility,
};
use crate::workflows::competency::oracle::StaticOracle;
use crate::workflows::competency::pipeline::{
    CompetencyPipeline, MemorySnapshotStore, PipelineMaterials, PipelineRunner,
};

/// Seeds a definition long enough to clear the normalizer's word floor, so
/// audit-stage pins can target the exact library text.
pub(super) fn long_definition(seed: &str) -> String {
    let filler = "covering analysis design implementation validation and operations across \
                  production systems with documented standards peer reviews and measurable \
                  outcomes for every mapped responsibility in scope";
    format!("{seed} {filler} {filler}")
}

pub(super) fn job(job_id: &str, responsibilities: &[(&str, &str)]) -> Job {
    Job {
        job_id: JobId(job_id.to_string()),
        title: "Data Engineer".to_string(),
        family: "Engineering".to_string(),
        level: "Senior".to_string(),
        summary: Some("Owns the data platform".to_string()),
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

pub(super) fn library_entry(id: &str, definition: &str) -> CompetencyLibraryEntry {
    CompetencyLibraryEntry {
        competency_id: id.to_string(),
        name: format!("{id} name"),
        definition: definition.to_string(),
        indicators: vec![
            "Delivers working implementations".to_string(),
            "Documents design decisions".to_string(),
            "Reviews peer work".to_string(),
        ],
        tags: vec!["engineering".to_string()],
        source_evidence: None,
    }
}

pub(super) fn technical(entries: Vec<CompetencyLibraryEntry>) -> CompetencyLibrary {
    CompetencyLibrary::new(LibraryKind::Technical, entries)
}

pub(super) fn leadership(entries: Vec<CompetencyLibraryEntry>) -> CompetencyLibrary {
    CompetencyLibrary::new(LibraryKind::Leadership, entries)
}

pub(super) fn materials(
    technical: CompetencyLibrary,
    leadership: CompetencyLibrary,
) -> PipelineMaterials {
    PipelineMaterials {
        technical,
        leadership,
        references: ReferenceStore::default(),
    }
}

/// Pin both the semantic and contextual score for a mapping pair.
pub(super) fn pin_mapping(oracle: &mut StaticOracle, responsibility: &str, definition: &str, score: f32) {
    oracle.pin_semantic(responsibility, definition, score);
    oracle.pin_contextual(responsibility, definition, score);
}

pub(super) fn pipeline_with(oracle: StaticOracle) -> Arc<CompetencyPipeline> {
    Arc::new(CompetencyPipeline::new(
        Arc::new(oracle),
        PipelineConfig::default(),
        Arc::new(MemorySnapshotStore::default()),
    ))
}

pub(super) fn runner_with(oracle: StaticOracle) -> PipelineRunner {
    PipelineRunner::new(pipeline_with(oracle))
}
