use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::evaluation::business_model::{aggregate, per_model_scores, resolve_ratios};
use crate::evaluation::checklist;
use crate::evaluation::weights::{adjust, AdjustContext};
use crate::evaluation::{EvaluationInput, IndicatorValue};
use crate::rubric::{
    BusinessModel, RubricCategory, RubricCriterion, RubricGroup, RubricModel, RubricSubcategory,
    ScoreKind,
};

/// Everything the arithmetic needs from one evaluation input, resolved once.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    pub indicators: &'a BTreeMap<String, IndicatorValue>,
    pub models: Vec<BusinessModel>,
    pub ratios: BTreeMap<BusinessModel, f64>,
    pub adjust: AdjustContext,
}

impl<'a> ScoringContext<'a> {
    pub fn new(input: &'a EvaluationInput) -> Self {
        Self {
            indicators: &input.indicators,
            models: input.company.selected_models(),
            ratios: resolve_ratios(&input.company),
            adjust: AdjustContext::from_company(&input.company),
        }
    }

    fn value(&self, id: &str) -> IndicatorValue {
        self.indicators.get(id).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubcategoryScore {
    pub id: String,
    pub name: String,
    /// Weighted group average in `[0, 1]`.
    pub ratio: f64,
    pub points: f64,
    pub max_points: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryScore {
    pub id: String,
    pub name: String,
    pub max_points: f64,
    pub subcategories: Vec<SubcategoryScore>,
}

impl CategoryScore {
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            max_points: 0.0,
            subcategories: Vec::new(),
        }
    }

    pub fn points(&self) -> f64 {
        self.subcategories.iter().fold(0.0, |acc, s| acc + s.points)
    }
}

/// Normalised `[0, 1]` score of one criterion. Unanswered values count as
/// zero here and nowhere earlier.
pub fn criterion_score(criterion: &RubricCriterion, ctx: &ScoringContext<'_>) -> f64 {
    match &criterion.kind {
        ScoreKind::Scale { max_score } => {
            if *max_score == 0 {
                return 0.0;
            }
            let max = f64::from(*max_score);
            ctx.value(&criterion.id).points().min(max) / max
        }
        ScoreKind::Checklist { size } => {
            checklist::score(ctx.value(&criterion.id), size.total_for(&ctx.models))
        }
        ScoreKind::PassFail => {
            if ctx.value(&criterion.id).points() >= 1.0 {
                1.0
            } else {
                0.0
            }
        }
        ScoreKind::ModelOutput { outputs } => {
            let per_model = per_model_scores(outputs, &ctx.models, ctx.indicators);
            aggregate(&ctx.models, &per_model, &ctx.ratios)
        }
    }
}

/// Weighted mean over the group's adjusted weights; zero when nothing counts.
pub fn group_score(group: &RubricGroup, ctx: &ScoringContext<'_>) -> f64 {
    let weights = adjust(group, &ctx.adjust);
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = group
        .criteria
        .iter()
        .map(|criterion| {
            let weight = weights.get(&criterion.id);
            if weight > 0.0 {
                criterion_score(criterion, ctx) * weight
            } else {
                0.0
            }
        })
        .sum();
    weighted / total
}

pub fn subcategory_ratio(subcategory: &RubricSubcategory, ctx: &ScoringContext<'_>) -> f64 {
    let total: f64 = subcategory.groups.iter().map(|g| g.weight).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = subcategory
        .groups
        .iter()
        .map(|group| group.weight * group_score(group, ctx))
        .sum();
    weighted / total
}

pub fn score_category(category: &RubricCategory, ctx: &ScoringContext<'_>) -> CategoryScore {
    let subcategories = category
        .subcategories
        .iter()
        .map(|sub| {
            let max_points = sub.weight * category.max_points;
            let ratio = subcategory_ratio(sub, ctx);
            SubcategoryScore {
                id: sub.id.clone(),
                name: sub.name.clone(),
                ratio,
                points: ratio * max_points,
                max_points,
            }
        })
        .collect();
    CategoryScore {
        id: category.id.clone(),
        name: category.name.clone(),
        max_points: category.max_points,
        subcategories,
    }
}

/// A top-level category of the rubric scored on its own.
pub trait CategoryScorer: Send + Sync {
    fn category_id(&self) -> &str;

    fn score(&self, rubric: &RubricModel, ctx: &ScoringContext<'_>) -> CategoryScore {
        match rubric.category(self.category_id()) {
            Some(category) => score_category(category, ctx),
            None => {
                warn!(category = self.category_id(), "rubric has no such category");
                CategoryScore::empty(self.category_id())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::CompanyProfile;
    use crate::rubric::{standard_rubric, Stage};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn company(models: Vec<BusinessModel>, stage: Stage) -> CompanyProfile {
        CompanyProfile {
            name: "Acme".to_string(),
            business_models: models,
            stage: Some(stage),
            ..CompanyProfile::default()
        }
    }

    #[test]
    fn scale_scores_clamp_to_max() {
        let rubric = standard_rubric();
        let criterion = rubric.criterion("debtRatio").expect("criterion").clone();
        let input = EvaluationInput::new(company(vec![BusinessModel::Platform], Stage::Growth))
            .with_indicator("debtRatio", 9);
        let ctx = ScoringContext::new(&input);
        assert_eq!(criterion_score(&criterion, &ctx), 1.0);
    }

    #[test]
    fn pooled_checklist_grows_with_selected_models() {
        let rubric = standard_rubric();
        let criterion = rubric.criterion("dataUtilization").expect("criterion").clone();

        let one = EvaluationInput::new(company(vec![BusinessModel::Platform], Stage::Growth))
            .with_indicator("dataUtilization", 4);
        assert_eq!(criterion_score(&criterion, &ScoringContext::new(&one)), 1.0);

        let two = EvaluationInput::new(company(
            vec![BusinessModel::Platform, BusinessModel::Content],
            Stage::Growth,
        ))
        .with_indicator("dataUtilization", 4);
        // 4 of 10 pooled entries
        assert_close(criterion_score(&criterion, &ScoringContext::new(&two)), 0.6);
    }

    #[test]
    fn core_skillset_uses_average_denominator() {
        let rubric = standard_rubric();
        let criterion = rubric.criterion("coreSkillset").expect("criterion").clone();
        // platform 6 and content 4 average to 5; 3 of 5 is tier 4
        let input = EvaluationInput::new(company(
            vec![BusinessModel::Platform, BusinessModel::Content],
            Stage::Mature,
        ))
        .with_indicator("coreSkillset", 3);
        assert_close(criterion_score(&criterion, &ScoringContext::new(&input)), 0.8);
    }

    #[test]
    fn core_skillset_without_models_uses_six_items() {
        let rubric = standard_rubric();
        let criterion = rubric.criterion("coreSkillset").expect("criterion").clone();
        let full = EvaluationInput::new(company(Vec::new(), Stage::Growth))
            .with_indicator("coreSkillset", 6);
        assert_eq!(criterion_score(&criterion, &ScoringContext::new(&full)), 1.0);

        // 3 of 6 is tier 3
        let half = EvaluationInput::new(company(Vec::new(), Stage::Growth))
            .with_indicator("coreSkillset", 3);
        assert_close(criterion_score(&criterion, &ScoringContext::new(&half)), 0.6);
    }

    #[test]
    fn operational_group_matches_hand_computation() {
        let rubric = standard_rubric();
        let operational = &rubric.categories[0].subcategories[1];
        let input = EvaluationInput::new(company(vec![BusinessModel::Service], Stage::Growth))
            .with_indicator("customerRetentionRate", 5)
            .with_indicator("revenueGrowthRate", 7);
        let ctx = ScoringContext::new(&input);
        assert_close(subcategory_ratio(operational, &ctx), 1.0);

        let input = EvaluationInput::new(company(vec![BusinessModel::Service], Stage::Growth))
            .with_indicator("customerRetentionRate", 5);
        let ctx = ScoringContext::new(&input);
        assert_close(subcategory_ratio(operational, &ctx), 0.583);
    }

    #[test]
    fn excluded_items_do_not_score_even_when_answered() {
        let rubric = standard_rubric();
        let health = &rubric.categories[0].subcategories[0].groups[0];
        let input = EvaluationInput::new(company(vec![BusinessModel::Platform], Stage::Growth))
            .with_indicator("cashFlowSafety", 5);
        assert_eq!(group_score(health, &ScoringContext::new(&input)), 0.0);
    }

    #[test]
    fn full_marks_reach_category_budget() {
        let rubric = standard_rubric();
        let mut input = EvaluationInput::new(company(vec![BusinessModel::Platform], Stage::Growth));
        for criterion in rubric.criteria() {
            if let Some(max) = criterion.kind.max_raw() {
                input.set_indicator(criterion.id.clone(), IndicatorValue::answered(max));
            }
        }
        input.set_indicator("platformCoreFunction", IndicatorValue::answered(4));
        input.set_indicator("platformSystemPerformance", IndicatorValue::answered(3));
        let ctx = ScoringContext::new(&input);
        let capability = score_category(&rubric.categories[0], &ctx);
        assert_close(capability.points(), 40.0);
        let education = score_category(&rubric.categories[1], &ctx);
        assert_close(education.points(), 59.964);
    }
}
