use tracing::debug;

use crate::matching::requirements::RequirementPartition;
use crate::models::job::RequirementType;
use crate::models::matching::{CoverageSummary, RequirementMatchResult, YearsGap};

fn ratio(covered: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Coverage ratios per requirement type plus years-of-experience shortfalls.
///
/// A requirement's years are checked against its best evidence first and the
/// resume's calculated total otherwise. Requirements with neither are skipped.
pub fn summarize_coverage(
    partition: &RequirementPartition,
    calculated_total_years: Option<f64>,
) -> CoverageSummary {
    let all: Vec<&RequirementMatchResult> =
        partition.matched.iter().chain(&partition.missing).collect();

    let count = |req_type: RequirementType, covered_only: bool| {
        all.iter()
            .filter(|r| r.requirement.req_type == req_type && (!covered_only || r.is_covered))
            .count()
    };

    let required_total = count(RequirementType::Required, false);
    let preferred_total = count(RequirementType::Preferred, false);

    let years_gaps: Vec<YearsGap> = all
        .iter()
        .filter_map(|result| {
            let required = result.requirement.min_years?;
            let found = result
                .evidence
                .as_ref()
                .and_then(|e| e.years_value)
                .or(calculated_total_years)?;
            (found < required).then(|| YearsGap {
                requirement_id: result.requirement.id.clone(),
                required,
                found,
                shortfall: required - found,
            })
        })
        .collect();

    if !years_gaps.is_empty() {
        debug!("{} requirement(s) ask for more years than found", years_gaps.len());
    }

    CoverageSummary {
        required_coverage: ratio(count(RequirementType::Required, true), required_total),
        preferred_coverage: ratio(count(RequirementType::Preferred, true), preferred_total),
        required_total,
        preferred_total,
        years_gaps,
    }
}
