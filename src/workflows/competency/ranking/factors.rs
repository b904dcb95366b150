use crate::workflows::competency::domain::{CriticalityFactors, TechnicalCompetency};

/// Trace count at which frequency saturates.
const FREQUENCY_SATURATION: f32 = 5.0;
const COMPLEX_DEFINITION_WORDS: usize = 100;
const COMPLEX_INDICATOR_COUNT: usize = 5;

/// Computes all six factors from the competency's own data; no external
/// calls are made at ranking time.
pub(crate) fn compute_factors(
    competency: &TechnicalCompetency,
    total_trace_count: usize,
) -> CriticalityFactors {
    let trace_count = competency.traces.len();

    let coverage = if total_trace_count == 0 {
        0.0
    } else {
        trace_count as f32 / total_trace_count as f32
    };

    let impact_risk = if competency.has_primary_trace() {
        0.8
    } else {
        0.5
    };

    let frequency = (trace_count as f32 / FREQUENCY_SATURATION).min(1.0);

    let mut complexity: f32 = 0.0;
    if competency.quality.definition_word_count >= COMPLEX_DEFINITION_WORDS {
        complexity += 0.5;
    }
    if competency.quality.indicator_count >= COMPLEX_INDICATOR_COUNT {
        complexity += 0.5;
    }
    let complexity = complexity.min(1.0);

    let differentiation = competency.benchmarking.alignment_score.unwrap_or(0.5);

    CriticalityFactors {
        coverage,
        impact_risk,
        frequency,
        complexity,
        differentiation,
        time_to_proficiency: complexity,
    }
}
