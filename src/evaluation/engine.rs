use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::evaluation::capability::CapabilityScorer;
use crate::evaluation::education::EducationValueScorer;
use crate::evaluation::grade;
use crate::evaluation::qualification;
use crate::evaluation::scoring::{CategoryScore, ScoringContext};
use crate::evaluation::{CategoryBreakdown, EvaluationInput, EvaluationResult, SubcategoryBreakdown};
use crate::rubric::{standard_rubric, RubricModel};

/// Rounds half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stateless scorer over an immutable rubric. Cloning shares the rubric.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    rubric: Arc<RubricModel>,
}

impl EvaluationEngine {
    pub fn new(rubric: Arc<RubricModel>) -> Self {
        Self { rubric }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(standard_rubric()))
    }

    pub fn rubric(&self) -> &RubricModel {
        &self.rubric
    }

    pub fn evaluate(&self, input: &EvaluationInput) -> EvaluationResult {
        let rubric = self.rubric();
        let gate = qualification::report(
            &rubric.qualification,
            &input.qualification,
            input.company.ships_devices(),
        );

        let ctx = ScoringContext::new(input);
        let capability = breakdown(CapabilityScorer.evaluate(rubric, &ctx));
        let education = breakdown(EducationValueScorer.evaluate(rubric, &ctx));

        let total_score = if gate.passed {
            round1(capability.points + education.points)
        } else {
            0.0
        };
        let grade = grade::outcome(gate.passed, total_score, rubric);

        let details: BTreeMap<String, f64> = capability
            .subcategories
            .iter()
            .chain(education.subcategories.iter())
            .map(|sub| (sub.id.clone(), sub.points))
            .collect();

        info!(
            company = %input.company.name,
            passed = gate.passed,
            total_score,
            grade = %grade.grade,
            "evaluation complete"
        );

        EvaluationResult {
            passed: gate.passed,
            total_score,
            capability_score: capability.points,
            education_value_score: education.points,
            grade: grade.grade,
            grade_zone: grade.zone,
            grade_description: grade.description,
            details,
            breakdown: vec![capability, education],
            qualification: gate,
        }
    }
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::standard()
    }
}

/// Rounds every subcategory first and sums the rounded parts, so displayed
/// subtotals always add up.
fn breakdown(score: CategoryScore) -> CategoryBreakdown {
    let subcategories: Vec<SubcategoryBreakdown> = score
        .subcategories
        .into_iter()
        .map(|sub| SubcategoryBreakdown {
            id: sub.id,
            name: sub.name,
            points: round1(sub.points),
            max_points: round1(sub.max_points),
        })
        .collect();
    let points = round1(subcategories.iter().fold(0.0, |acc, s| acc + s.points));
    CategoryBreakdown {
        id: score.id,
        name: score.name,
        points,
        max_points: score.max_points,
        subcategories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{Answer, CompanyProfile, IndicatorValue};
    use crate::rubric::{BusinessModel, Grade, Stage};
    use proptest::prelude::*;

    fn passing_input(company: CompanyProfile) -> EvaluationInput {
        let rubric = standard_rubric();
        let mut input = EvaluationInput::new(company);
        for item in &rubric.qualification {
            input.set_answer(item.id.clone(), Some(Answer::Pass));
        }
        input
    }

    fn growth_platform() -> CompanyProfile {
        CompanyProfile {
            name: "Acme".to_string(),
            business_models: vec![BusinessModel::Platform],
            stage: Some(Stage::Growth),
            ..CompanyProfile::default()
        }
    }

    #[test]
    fn round1_matches_one_decimal_display() {
        assert_eq!(round1(7.25), 7.3);
        assert_eq!(round1(7.24), 7.2);
        assert_eq!(round1(0.0), 0.0);
        assert_eq!(round1(39.96), 40.0);
    }

    #[test]
    fn category_missing_from_rubric_reports_positive_zero() {
        let mut rubric = standard_rubric();
        rubric
            .categories
            .retain(|c| c.id != crate::rubric::standard::CAPABILITY);
        let engine = EvaluationEngine::new(Arc::new(rubric));
        let input = passing_input(growth_platform()).with_indicator("debtRatio", 4);
        let result = engine.evaluate(&input);

        assert_eq!(result.capability_score, 0.0);
        assert!(result.capability_score.is_sign_positive());
        assert!(result.breakdown[0].subcategories.is_empty());
        assert!(result.total_score.is_sign_positive());
    }

    #[test]
    fn subtotals_are_sums_of_rounded_parts() {
        let engine = EvaluationEngine::standard();
        let input = passing_input(growth_platform())
            .with_indicator("debtRatio", 3)
            .with_indicator("customerRetentionRate", 4)
            .with_indicator("qualityMonitoring", 2)
            .with_indicator("userEngagement", 7)
            .with_indicator("dataAiEthics", 5);
        let result = engine.evaluate(&input);
        assert!(result.passed);
        for category in &result.breakdown {
            let sum: f64 = category.subcategories.iter().map(|s| s.points).sum();
            assert_eq!(category.points, round1(sum));
        }
        assert_eq!(
            result.total_score,
            round1(result.capability_score + result.education_value_score)
        );
        assert_eq!(result.details.len(), 6);
    }

    #[test]
    fn failed_gate_keeps_subscores_but_zeroes_total() {
        let engine = EvaluationEngine::standard();
        let mut input = passing_input(growth_platform()).with_indicator("debtRatio", 4);
        input.set_answer("privacyPolicy", Some(Answer::Fail));
        let result = engine.evaluate(&input);
        assert!(!result.passed);
        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.grade, Grade::D);
        assert!(result.capability_score > 0.0);
    }

    #[test]
    fn full_marks_round_to_category_ceilings() {
        let engine = EvaluationEngine::standard();
        let mut input = passing_input(growth_platform());
        for criterion in engine.rubric().criteria() {
            if let Some(max) = criterion.kind.max_raw() {
                input.set_indicator(criterion.id.clone(), IndicatorValue::answered(max));
            }
        }
        input.set_indicator("platformCoreFunction", IndicatorValue::answered(4));
        input.set_indicator("platformSystemPerformance", IndicatorValue::answered(3));
        let result = engine.evaluate(&input);
        assert_eq!(result.capability_score, 40.0);
        // 29.3 + 15.0 + 15.6 once each subcategory is rounded
        assert_eq!(result.education_value_score, 59.9);
        assert_eq!(result.total_score, 99.9);
        assert_eq!(result.grade, Grade::Aaa);
    }

    #[test]
    fn engine_never_mutates_its_input() {
        let engine = EvaluationEngine::standard();
        let input = passing_input(growth_platform()).with_indicator("debtRatio", 2);
        let before = input.clone();
        let first = engine.evaluate(&input);
        let second = engine.evaluate(&input);
        assert_eq!(input, before);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn passed_totals_equal_sum_of_rounded_categories(
            values in proptest::collection::vec(0u32..10, 40),
            early in any::<bool>(),
        ) {
            let engine = EvaluationEngine::standard();
            let mut company = growth_platform();
            if early {
                company.stage = Some(Stage::Early);
            }
            let mut input = passing_input(company);
            let ids: Vec<String> = engine.rubric().indicator_ids().into_iter().collect();
            for (id, value) in ids.iter().zip(values.iter()) {
                input.set_indicator(id.clone(), IndicatorValue::answered(*value));
            }
            let result = engine.evaluate(&input);
            prop_assert!(result.passed);
            prop_assert_eq!(
                round1(result.capability_score + result.education_value_score),
                result.total_score
            );
            prop_assert!(result.capability_score <= 40.0);
            prop_assert!(result.education_value_score <= 60.0);
        }
    }
}
