use serde::{Deserialize, Serialize};

use super::domain::{BenchmarkingRecord, ReferenceDocument, TechnicalCompetency};
use super::similarity::jaccard;

/// Minimum lexical alignment for a reference document to count as a match.
const MATCH_FLOOR: f32 = 0.2;

/// In-memory reference-document store consulted by the benchmarking stage
/// and exposed through the list/search surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStore {
    documents: Vec<ReferenceDocument>,
}

impl ReferenceStore {
    pub fn new(documents: Vec<ReferenceDocument>) -> Self {
        Self { documents }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[ReferenceDocument] {
        &self.documents
    }

    /// Rank documents by lexical overlap with the query; zero-overlap
    /// documents are omitted.
    pub fn search(&self, query: &str) -> Vec<&ReferenceDocument> {
        let mut scored: Vec<(f32, &ReferenceDocument)> = self
            .documents
            .iter()
            .filter_map(|document| {
                let haystack = format!(
                    "{} {} {}",
                    document.title,
                    document.body,
                    document.tags.join(" ")
                );
                let score = jaccard(query, &haystack);
                (score > 0.0).then_some((score, document))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.doc_id.cmp(&b.1.doc_id))
        });
        scored.into_iter().map(|(_, document)| document).collect()
    }
}

/// Populates each clean competency's `BenchmarkingRecord` from the reference
/// store. Purely lexical; an empty store leaves every record empty so the
/// ranker falls back to its neutral differentiation.
pub struct BenchmarkStage<'a> {
    store: &'a ReferenceStore,
}

impl<'a> BenchmarkStage<'a> {
    pub fn new(store: &'a ReferenceStore) -> Self {
        Self { store }
    }

    pub fn benchmark(&self, competencies: &[TechnicalCompetency]) -> Vec<TechnicalCompetency> {
        competencies
            .iter()
            .map(|competency| {
                let mut benchmarked = competency.clone();
                benchmarked.benchmarking = self.record_for(competency);
                benchmarked
            })
            .collect()
    }

    fn record_for(&self, competency: &TechnicalCompetency) -> BenchmarkingRecord {
        let needle = format!("{} {}", competency.name, competency.definition);
        let mut matches: Vec<(f32, &ReferenceDocument)> = self
            .store
            .documents
            .iter()
            .filter_map(|document| {
                let haystack = format!("{} {}", document.title, document.body);
                let score = jaccard(&needle, &haystack);
                (score >= MATCH_FLOOR).then_some((score, document))
            })
            .collect();

        matches.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.doc_id.cmp(&b.1.doc_id))
        });

        BenchmarkingRecord {
            alignment_score: matches.first().map(|(score, _)| *score),
            matched_sources: matches
                .iter()
                .map(|(_, document)| document.doc_id.clone())
                .collect(),
        }
    }
}
