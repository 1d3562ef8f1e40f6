use tracing::debug;

use crate::evaluation::scoring::{CategoryScore, CategoryScorer, ScoringContext};
use crate::rubric::standard::EDUCATION_VALUE;
use crate::rubric::RubricModel;

/// Educational, technical and social value, worth 60 points in the
/// standard rubric. Business-model-linked criteria read the company's model
/// mix from the scoring context.
#[derive(Debug, Clone, Copy, Default)]
pub struct EducationValueScorer;

impl CategoryScorer for EducationValueScorer {
    fn category_id(&self) -> &str {
        EDUCATION_VALUE
    }
}

impl EducationValueScorer {
    pub fn evaluate(&self, rubric: &RubricModel, ctx: &ScoringContext<'_>) -> CategoryScore {
        let score = self.score(rubric, ctx);
        debug!(
            models = ?ctx.models,
            ratios = ?ctx.ratios,
            field_metric = ?ctx.adjust.field_metric,
            points = score.points(),
            "scored public-education value"
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{BusinessModelRatio, CompanyProfile, EvaluationInput};
    use crate::rubric::{standard_rubric, BusinessModel, FieldMetric, Stage};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn company(models: Vec<BusinessModel>) -> CompanyProfile {
        CompanyProfile {
            name: "Classroom Co".to_string(),
            business_models: models,
            stage: Some(Stage::Growth),
            ..CompanyProfile::default()
        }
    }

    fn technical_value(score: &CategoryScore) -> f64 {
        score
            .subcategories
            .iter()
            .find(|s| s.id == "technicalValue")
            .map(|s| s.points)
            .unwrap_or_default()
    }

    #[test]
    fn technical_output_is_weighted_by_revenue_share() {
        let rubric = standard_rubric();
        let mut company = company(vec![BusinessModel::Device, BusinessModel::Service]);
        company.business_model_ratios = vec![
            BusinessModelRatio {
                model: "device".to_string(),
                revenue_ratio: 70.0,
                employee_ratio: 50.0,
            },
            BusinessModelRatio {
                model: "service".to_string(),
                revenue_ratio: 30.0,
                employee_ratio: 50.0,
            },
        ];
        // device 3/3 and 3/3 -> 1.0; service 3/3 and 0 -> 0.5
        let input = EvaluationInput::new(company)
            .with_indicator("deviceProductDevelopment", 3)
            .with_indicator("deviceTechLevel", 3)
            .with_indicator("serviceOperationRecord", 3);
        let score = EducationValueScorer.evaluate(&rubric, &ScoringContext::new(&input));
        let output = 1.0 * 0.7 + 0.5 * 0.3;
        let expected = 0.4 * 0.3 * output * 0.25 * 60.0;
        assert_close(technical_value(&score), expected);
    }

    #[test]
    fn field_metric_switches_the_counted_indicator() {
        let rubric = standard_rubric();
        let base = EvaluationInput::new(company(vec![BusinessModel::Platform]))
            .with_indicator("institutionAdoption", 4);
        let by_institution = EducationValueScorer.evaluate(&rubric, &ScoringContext::new(&base));
        assert!(by_institution.points() > 0.0);

        let mut by_users = base.clone();
        by_users.company.field_utilization_metric = FieldMetric::UserCount;
        let score = EducationValueScorer.evaluate(&rubric, &ScoringContext::new(&by_users));
        assert_eq!(score.points(), 0.0);
    }

    #[test]
    fn unselected_model_outputs_are_ignored() {
        let rubric = standard_rubric();
        let input = EvaluationInput::new(company(vec![BusinessModel::Content]))
            .with_indicator("networkServiceScale", 4)
            .with_indicator("networkTechLevel", 4);
        let score = EducationValueScorer.evaluate(&rubric, &ScoringContext::new(&input));
        assert_eq!(technical_value(&score), 0.0);
    }
}
