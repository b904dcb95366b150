use std::collections::HashMap;

use crate::config::PipelineConfig;

use super::domain::{
    BenchmarkingRecord, CompetencyLibrary, Contribution, Job, OverlapCheck, ResponsibilityTrace,
    TechnicalCompetency,
};
use super::mapping::MappingOutcome;

const MIN_INDICATORS: usize = 3;
const MAX_INDICATORS: usize = 7;
const MAX_NAME_CHARS: usize = 80;
const DEFINITION_WORD_FLOOR: usize = 50;

/// Builds canonical `TechnicalCompetency` records from the top candidate of
/// each responsibility mapping, merging traces and enforcing the quality
/// floors expected by downstream gating.
pub struct CompetencyNormalizer {
    primary_relevance: f32,
}

impl CompetencyNormalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            primary_relevance: config.primary_relevance,
        }
    }

    pub fn normalize(
        &self,
        job: &Job,
        mapping: &MappingOutcome,
        library: &CompetencyLibrary,
    ) -> Vec<TechnicalCompetency> {
        // Merge traces per competency, preserving first-appearance order so
        // the normalized set is deterministic for a fixed mapping.
        let mut order: Vec<String> = Vec::new();
        let mut traces: HashMap<String, Vec<ResponsibilityTrace>> = HashMap::new();

        for entry in &mapping.mappings {
            let Some(top) = entry.top_candidate() else {
                continue;
            };
            if !job.has_responsibility(&entry.responsibility_id) {
                continue;
            }

            let contribution = if top.relevance >= self.primary_relevance {
                Contribution::Primary
            } else {
                Contribution::Secondary
            };

            let bucket = traces.entry(top.competency_id.clone()).or_insert_with(|| {
                order.push(top.competency_id.clone());
                Vec::new()
            });
            bucket.push(ResponsibilityTrace {
                responsibility_id: entry.responsibility_id.clone(),
                contribution,
                relevance: top.relevance,
            });
        }

        let mut competencies = Vec::with_capacity(order.len());
        for competency_id in order {
            let Some(source) = library.entry(&competency_id) else {
                continue;
            };
            let merged = traces.remove(&competency_id).unwrap_or_default();
            if merged.is_empty() {
                continue;
            }

            let name: String = source.name.chars().take(MAX_NAME_CHARS).collect();
            let definition = enforce_definition_floor(&source.definition);
            let indicators = normalize_indicators(&source.indicators, &name);
            let why_it_matters = why_it_matters(&name, job, merged.len());

            let mut competency = TechnicalCompetency {
                competency_id,
                name,
                definition,
                why_it_matters,
                behavioral_indicators: indicators,
                applied_scope: source.tags.clone(),
                traces: merged,
                overlap: OverlapCheck::default(),
                benchmarking: BenchmarkingRecord::default(),
                quality: Default::default(),
            };
            competency.recompute_quality();
            competencies.push(competency);
        }

        competencies
    }
}

fn why_it_matters(name: &str, job: &Job, trace_count: usize) -> String {
    format!(
        "{} anchors {} of the responsibilities carried by the {} role and sets the technical bar for the {} family.",
        name, trace_count, job.title, job.family
    )
}

fn normalize_indicators(source: &[String], name: &str) -> Vec<String> {
    let mut indicators: Vec<String> = source
        .iter()
        .map(|indicator| indicator.trim().to_string())
        .filter(|indicator| !indicator.is_empty())
        .collect();

    let generic = [
        format!("Applies {} to day-to-day delivery with minimal supervision", name),
        format!("Selects appropriate tools and methods when exercising {}", name),
        format!("Explains {} decisions and trade-offs to technical peers", name),
    ];
    let mut padding = generic.into_iter();
    while indicators.len() < MIN_INDICATORS {
        match padding.next() {
            Some(statement) => indicators.push(statement),
            None => break,
        }
    }

    indicators.truncate(MAX_INDICATORS);
    indicators
}

fn enforce_definition_floor(definition: &str) -> String {
    let mut expanded = definition.trim().to_string();
    let clauses = [
        "This capability underpins reliable delivery of the mapped responsibilities and is \
         exercised against the tools, standards, and outputs the role owns.",
        "Proficiency is demonstrated through repeatable execution, peer review of produced \
         artifacts, and measurable outcomes on the responsibilities this competency supports.",
        "It requires sustained, hands-on practice across representative scenarios before an \
         incumbent can operate independently at the expected level.",
    ];

    for clause in clauses {
        if word_count(&expanded) >= DEFINITION_WORD_FLOOR {
            break;
        }
        if !expanded.is_empty() && !expanded.ends_with('.') {
            expanded.push('.');
        }
        if !expanded.is_empty() {
            expanded.push(' ');
        }
        expanded.push_str(clause);
    }

    expanded
}

fn word_count(value: &str) -> usize {
    value.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::competency::domain::{
        CompetencyCandidate, CompetencyLibraryEntry, JobId, LibraryKind, Responsibility,
        ResponsibilityMapping,
    };

    fn job() -> Job {
        Job {
            job_id: JobId("job-1".to_string()),
            title: "Platform Engineer".to_string(),
            family: "Engineering".to_string(),
            level: "Senior".to_string(),
            summary: Some("Runs the platform".to_string()),
            responsibilities: ["r1", "r2", "r3"]
                .iter()
                .map(|id| Responsibility {
                    responsibility_id: id.to_string(),
                    raw_text: format!("{id} text"),
                    normalized_text: format!("{id} text"),
                    priority_hint: None,
                })
                .collect(),
        }
    }

    fn candidate(id: &str, relevance: f32) -> CompetencyCandidate {
        CompetencyCandidate {
            competency_id: id.to_string(),
            lexical: relevance,
            semantic: relevance,
            contextual: relevance,
            relevance,
            low_confidence: false,
        }
    }

    fn mapping_for(entries: &[(&str, &str, f32)]) -> MappingOutcome {
        MappingOutcome {
            job_id: JobId("job-1".to_string()),
            mappings: entries
                .iter()
                .map(|(responsibility, competency, relevance)| ResponsibilityMapping {
                    responsibility_id: responsibility.to_string(),
                    candidates: vec![candidate(competency, *relevance)],
                })
                .collect(),
            unmapped: Vec::new(),
            low_confidence_pairs: 0,
        }
    }

    fn library_entry(id: &str, definition: &str, indicators: &[&str]) -> CompetencyLibraryEntry {
        CompetencyLibraryEntry {
            competency_id: id.to_string(),
            name: format!("{id} name"),
            definition: definition.to_string(),
            indicators: indicators.iter().map(|s| s.to_string()).collect(),
            tags: vec!["tooling".to_string()],
            source_evidence: None,
        }
    }

    fn normalizer() -> CompetencyNormalizer {
        CompetencyNormalizer::new(&crate::config::PipelineConfig::default())
    }

    #[test]
    fn merges_traces_for_shared_top_candidate() {
        let mapping = mapping_for(&[
            ("r1", "comp-a", 0.85),
            ("r2", "comp-a", 0.65),
            ("r3", "comp-b", 0.9),
        ]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![
                library_entry("comp-a", "short definition", &["i1"]),
                library_entry("comp-b", "another definition", &["i1", "i2", "i3"]),
            ],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized.len(), 2);
        let first = &normalized[0];
        assert_eq!(first.competency_id, "comp-a");
        assert_eq!(first.traces.len(), 2);
        assert_eq!(first.traces[0].contribution, Contribution::Primary);
        assert_eq!(first.traces[1].contribution, Contribution::Secondary);
    }

    #[test]
    fn pads_indicators_to_minimum_of_three() {
        let mapping = mapping_for(&[("r1", "comp-a", 0.9)]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![library_entry("comp-a", "short definition", &["only one"])],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized[0].behavioral_indicators.len(), 3);
        assert_eq!(normalized[0].behavioral_indicators[0], "only one");
        assert_eq!(normalized[0].quality.indicator_count, 3);
    }

    #[test]
    fn caps_indicators_at_seven() {
        let indicators: Vec<String> = (0..9).map(|i| format!("indicator {i}")).collect();
        let refs: Vec<&str> = indicators.iter().map(|s| s.as_str()).collect();
        let mapping = mapping_for(&[("r1", "comp-a", 0.9)]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![library_entry("comp-a", "short definition", &refs)],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized[0].behavioral_indicators.len(), 7);
    }

    #[test]
    fn short_definitions_are_extended_past_the_word_floor() {
        let mapping = mapping_for(&[("r1", "comp-a", 0.9)]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![library_entry("comp-a", "Designs ingestion pipelines", &["i1"])],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert!(normalized[0].quality.definition_word_count >= 50);
        assert!(normalized[0]
            .definition
            .starts_with("Designs ingestion pipelines"));
    }

    #[test]
    fn long_definitions_are_left_untouched() {
        let long_definition = vec!["word"; 80].join(" ");
        let mapping = mapping_for(&[("r1", "comp-a", 0.9)]);
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![library_entry("comp-a", &long_definition, &["i1"])],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized[0].definition, long_definition);
        assert_eq!(normalized[0].quality.definition_word_count, 80);
    }

    #[test]
    fn names_are_truncated_to_eighty_chars() {
        let mapping = mapping_for(&[("r1", "comp-a", 0.9)]);
        let mut entry = library_entry("comp-a", "short definition", &["i1"]);
        entry.name = "x".repeat(120);
        let library = CompetencyLibrary::new(LibraryKind::Technical, vec![entry]);

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized[0].name.chars().count(), 80);
    }

    #[test]
    fn competency_never_topping_a_responsibility_is_absent() {
        let mapping = MappingOutcome {
            job_id: JobId("job-1".to_string()),
            mappings: vec![ResponsibilityMapping {
                responsibility_id: "r1".to_string(),
                candidates: vec![candidate("comp-a", 0.9), candidate("comp-b", 0.7)],
            }],
            unmapped: Vec::new(),
            low_confidence_pairs: 0,
        };
        let library = CompetencyLibrary::new(
            LibraryKind::Technical,
            vec![
                library_entry("comp-a", "short definition", &["i1"]),
                library_entry("comp-b", "short definition", &["i1"]),
            ],
        );

        let normalized = normalizer().normalize(&job(), &mapping, &library);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].competency_id, "comp-a");
    }
}
