use tracing::debug;

use crate::evaluation::scoring::{CategoryScore, CategoryScorer, ScoringContext};
use crate::rubric::standard::CAPABILITY;
use crate::rubric::RubricModel;

/// Financial stability, operational continuity and technical reliability,
/// worth 40 points in the standard rubric.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityScorer;

impl CategoryScorer for CapabilityScorer {
    fn category_id(&self) -> &str {
        CAPABILITY
    }
}

impl CapabilityScorer {
    pub fn evaluate(&self, rubric: &RubricModel, ctx: &ScoringContext<'_>) -> CategoryScore {
        let score = self.score(rubric, ctx);
        debug!(
            stage = ?ctx.adjust.stage,
            choices = ?ctx.adjust.choices,
            include_optional = ctx.adjust.include_optional,
            points = score.points(),
            "scored company capability"
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{CompanyProfile, EvaluationInput};
    use crate::rubric::{standard_rubric, BusinessModel, ChoiceOption, Stage};

    fn early_company(health: ChoiceOption) -> CompanyProfile {
        CompanyProfile {
            name: "Seedling".to_string(),
            business_models: vec![BusinessModel::Content],
            stage: Some(Stage::Early),
            selection_choices: [("financialHealth".to_string(), health)].into(),
            ..CompanyProfile::default()
        }
    }

    #[test]
    fn only_the_chosen_side_of_a_pair_scores() {
        let rubric = standard_rubric();
        let input = EvaluationInput::new(early_company(ChoiceOption::A))
            .with_indicator("interestCoverageRatio", 5);
        let score = CapabilityScorer.evaluate(&rubric, &ScoringContext::new(&input));
        assert_eq!(score.subcategories[0].points, 0.0);

        let input = EvaluationInput::new(early_company(ChoiceOption::B))
            .with_indicator("interestCoverageRatio", 5);
        let score = CapabilityScorer.evaluate(&rubric, &ScoringContext::new(&input));
        assert!(score.subcategories[0].points > 0.0);
    }

    #[test]
    fn financial_points_follow_redistributed_weights() {
        let rubric = standard_rubric();
        // growth: cash flow excluded, its weight spread over the other health items
        let company = CompanyProfile {
            stage: Some(Stage::Growth),
            ..early_company(ChoiceOption::A)
        };
        let input = EvaluationInput::new(company).with_indicator("debtRatio", 4);
        let score = CapabilityScorer.evaluate(&rubric, &ScoringContext::new(&input));
        let debt_weight = 0.154 + 0.217 * 0.154 / (0.123 + 0.154 + 0.126);
        let expected = debt_weight * 0.229 * 40.0;
        assert!((score.subcategories[0].points - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_category_scores_nothing() {
        let mut rubric = standard_rubric();
        rubric.categories.retain(|c| c.id != CAPABILITY);
        let input = EvaluationInput::new(early_company(ChoiceOption::A));
        let score = CapabilityScorer.evaluate(&rubric, &ScoringContext::new(&input));
        assert_eq!(score.points(), 0.0);
        assert!(score.subcategories.is_empty());
    }
}
