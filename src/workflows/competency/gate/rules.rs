use crate::workflows::competency::domain::FlagSeverity;

use super::ValidationResult;

pub(crate) fn jobs_extracted(job_count: usize) -> ValidationResult {
    ValidationResult {
        rule: "jobs_extracted".to_string(),
        passed: job_count > 0,
        severity: FlagSeverity::Critical,
        blocking: true,
        detail: format!("{job_count} job(s) extracted"),
    }
}

pub(crate) fn missing_summary_rate(
    missing: usize,
    total: usize,
    limit: f32,
) -> ValidationResult {
    let rate = rate_of(missing, total);
    ValidationResult {
        rule: "missing_summary_rate".to_string(),
        passed: rate <= limit,
        severity: FlagSeverity::Warning,
        blocking: false,
        detail: format!("{missing}/{total} jobs missing a summary ({rate:.2} vs limit {limit:.2})"),
    }
}

pub(crate) fn unmapped_rate(
    unmapped: usize,
    total: usize,
    limit: f32,
    lenient: bool,
) -> ValidationResult {
    let rate = rate_of(unmapped, total);
    ValidationResult {
        rule: "unmapped_responsibility_rate".to_string(),
        passed: rate <= limit,
        severity: if lenient {
            FlagSeverity::Warning
        } else {
            FlagSeverity::Error
        },
        blocking: !lenient,
        detail: format!(
            "{unmapped}/{total} responsibilities unmapped ({rate:.2} vs limit {limit:.2})"
        ),
    }
}

pub(crate) fn clean_set_nonempty(clean_count: usize) -> ValidationResult {
    ValidationResult {
        rule: "clean_set_nonempty".to_string(),
        passed: clean_count > 0,
        severity: FlagSeverity::Critical,
        blocking: true,
        detail: format!("{clean_count} competencies after remediation"),
    }
}

pub(crate) fn overlaps_resolved(
    remaining_material: usize,
    remaining_conflicts: usize,
    lenient: bool,
) -> ValidationResult {
    ValidationResult {
        rule: "material_overlaps_resolved".to_string(),
        passed: remaining_material == 0 && remaining_conflicts == 0,
        severity: if lenient {
            FlagSeverity::Warning
        } else {
            FlagSeverity::Error
        },
        blocking: !lenient,
        detail: format!(
            "{remaining_material} material overlap(s) and {remaining_conflicts} distinctness \
             conflict(s) remaining"
        ),
    }
}

pub(crate) fn reaudit_scheduled(reaudits_remaining: usize) -> ValidationResult {
    ValidationResult {
        rule: "revisions_require_reaudit".to_string(),
        passed: true,
        severity: FlagSeverity::Info,
        blocking: false,
        detail: format!("revised competencies re-enter the auditor ({reaudits_remaining} pass(es) left)"),
    }
}

pub(crate) fn coverage_floor(rate: f32, floor: f32) -> ValidationResult {
    ValidationResult {
        rule: "coverage_rate".to_string(),
        passed: rate >= floor,
        severity: FlagSeverity::Warning,
        blocking: false,
        detail: format!("top-N coverage {rate:.2} vs floor {floor:.2}"),
    }
}

pub(crate) fn top_n_size(size: usize, bounds: (usize, usize)) -> ValidationResult {
    let (lower, upper) = bounds;
    ValidationResult {
        rule: "top_n_size".to_string(),
        passed: size >= lower && size <= upper,
        severity: FlagSeverity::Warning,
        blocking: false,
        detail: format!("{size} competencies selected (expected {lower}..={upper})"),
    }
}

fn rate_of(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}
