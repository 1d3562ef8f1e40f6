use serde::Serialize;

use crate::rubric::{Grade, GradeBand, GradeZone, RubricModel};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub grade: Grade,
    pub zone: GradeZone,
    pub description: String,
    pub zone_description: Option<String>,
}

/// Walks `bands` (highest minimum first) and returns the first band the
/// score meets. A failed gate is always `D`.
pub fn resolve(passed: bool, total_score: f64, bands: &[GradeBand]) -> Grade {
    if !passed {
        return Grade::D;
    }
    bands
        .iter()
        .find(|band| total_score >= band.min)
        .map(|band| band.grade)
        .unwrap_or(Grade::D)
}

pub fn outcome(passed: bool, total_score: f64, rubric: &RubricModel) -> GradeOutcome {
    let grade = resolve(passed, total_score, &rubric.grades);
    let band = rubric.grades.iter().find(|band| band.grade == grade);
    let zone = band.map(|band| band.zone).unwrap_or(GradeZone::D);
    GradeOutcome {
        grade,
        zone,
        description: band.map(|band| band.description.clone()).unwrap_or_default(),
        zone_description: rubric.zone_description(zone).map(str::to_string),
    }
}
