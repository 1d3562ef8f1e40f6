use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::debug;

use crate::evaluation::{checklist, CompanyProfile, IndicatorValue};
use crate::rubric::{BusinessModel, ModelOutputSpec, OutputIndicator, OutputKind};

/// Declared share of each selected model, in percent. Entries for unknown or
/// unselected models and non-positive shares are left out so the aggregator
/// falls back to an equal split for those models.
pub fn resolve_ratios(company: &CompanyProfile) -> BTreeMap<BusinessModel, f64> {
    let selected = company.selected_models();
    let mut ratios = BTreeMap::new();
    for entry in &company.business_model_ratios {
        let Ok(model) = BusinessModel::from_str(&entry.model) else {
            debug!(model = %entry.model, "ignoring ratio for unknown business model");
            continue;
        };
        if !selected.contains(&model) {
            debug!(%model, "ignoring ratio for unselected business model");
            continue;
        }
        let share = entry.share(company.ratio_basis);
        if share > 0.0 {
            ratios.insert(model, share);
        }
    }
    ratios
}

/// Ratio-weighted mean of per-model scores over the selected models.
///
/// `ratios` are percentages. A model without a positive ratio counts as
/// `1 / n` of the mix; the weights are then normalised by their sum, so
/// partial or over-full declarations still yield a score in `[0, 1]`.
pub fn aggregate(
    selected: &[BusinessModel],
    per_model_score: &BTreeMap<BusinessModel, f64>,
    ratios: &BTreeMap<BusinessModel, f64>,
) -> f64 {
    let mut models: Vec<BusinessModel> = Vec::with_capacity(selected.len());
    for model in selected {
        if !models.contains(model) {
            models.push(*model);
        }
    }
    if models.is_empty() {
        return 0.0;
    }
    let equal_share = 1.0 / models.len() as f64;

    let mut weighted = 0.0;
    let mut total_ratio = 0.0;
    for model in &models {
        let ratio = ratios
            .get(model)
            .copied()
            .filter(|pct| *pct > 0.0)
            .map(|pct| pct / 100.0)
            .unwrap_or(equal_share);
        let score = per_model_score.get(model).copied().unwrap_or(0.0);
        weighted += score * ratio;
        total_ratio += ratio;
    }
    if total_ratio > 0.0 {
        weighted / total_ratio
    } else {
        0.0
    }
}

pub fn indicator_score(indicator: &OutputIndicator, value: IndicatorValue) -> f64 {
    match indicator.kind {
        OutputKind::Scale { max_score } if max_score > 0 => {
            value.points().min(f64::from(max_score)) / f64::from(max_score)
        }
        OutputKind::Scale { .. } => 0.0,
        OutputKind::Checklist { items } => checklist::score(value, f64::from(items)),
    }
}

/// Mean of each selected model's own output indicators.
pub fn per_model_scores(
    outputs: &[ModelOutputSpec],
    selected: &[BusinessModel],
    indicators: &BTreeMap<String, IndicatorValue>,
) -> BTreeMap<BusinessModel, f64> {
    outputs
        .iter()
        .filter(|spec| selected.contains(&spec.model))
        .map(|spec| {
            let score = if spec.indicators.is_empty() {
                0.0
            } else {
                let sum: f64 = spec
                    .indicators
                    .iter()
                    .map(|indicator| {
                        let value = indicators.get(&indicator.id).copied().unwrap_or_default();
                        indicator_score(indicator, value)
                    })
                    .sum();
                sum / spec.indicators.len() as f64
            };
            (spec.model, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{BusinessModelRatio, RatioBasis};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn ratio(model: &str, revenue: f64, employee: f64) -> BusinessModelRatio {
        BusinessModelRatio {
            model: model.to_string(),
            revenue_ratio: revenue,
            employee_ratio: employee,
        }
    }

    #[test]
    fn seventy_thirty_mix() {
        let selected = [BusinessModel::Platform, BusinessModel::Content];
        let scores = BTreeMap::from([
            (BusinessModel::Platform, 0.8),
            (BusinessModel::Content, 0.4),
        ]);
        let ratios = BTreeMap::from([
            (BusinessModel::Platform, 70.0),
            (BusinessModel::Content, 30.0),
        ]);
        assert_close(aggregate(&selected, &scores, &ratios), 0.68);
    }

    #[test]
    fn missing_ratios_split_equally() {
        let selected = [BusinessModel::Device, BusinessModel::Service];
        let scores = BTreeMap::from([
            (BusinessModel::Device, 1.0),
            (BusinessModel::Service, 0.0),
        ]);
        assert_close(aggregate(&selected, &scores, &BTreeMap::new()), 0.5);
    }

    #[test]
    fn ratios_are_normalised_by_their_sum() {
        let selected = [BusinessModel::Platform, BusinessModel::Network];
        let scores = BTreeMap::from([
            (BusinessModel::Platform, 1.0),
            (BusinessModel::Network, 0.5),
        ]);
        let ratios = BTreeMap::from([
            (BusinessModel::Platform, 30.0),
            (BusinessModel::Network, 30.0),
        ]);
        assert_close(aggregate(&selected, &scores, &ratios), 0.75);
    }

    #[test]
    fn no_models_scores_zero() {
        assert_eq!(aggregate(&[], &BTreeMap::new(), &BTreeMap::new()), 0.0);
    }

    #[test]
    fn unselected_scores_do_not_leak_in() {
        let selected = [BusinessModel::Platform];
        let scores = BTreeMap::from([
            (BusinessModel::Platform, 0.2),
            (BusinessModel::Device, 1.0),
        ]);
        let ratios = BTreeMap::from([(BusinessModel::Device, 90.0)]);
        assert_close(aggregate(&selected, &scores, &ratios), 0.2);
    }

    #[test]
    fn resolve_ratios_follows_basis_and_skips_unknowns() {
        let company = CompanyProfile {
            business_models: vec![BusinessModel::Platform, BusinessModel::Content],
            business_model_ratios: vec![
                ratio("platform", 70.0, 20.0),
                ratio("content", 30.0, 80.0),
                ratio("hologram", 50.0, 50.0),
                ratio("device", 10.0, 10.0),
            ],
            ratio_basis: RatioBasis::Employee,
            ..CompanyProfile::default()
        };
        let ratios = resolve_ratios(&company);
        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[&BusinessModel::Platform], 20.0);
        assert_eq!(ratios[&BusinessModel::Content], 80.0);
    }

    #[test]
    fn zero_share_falls_back_to_equal_split() {
        let company = CompanyProfile {
            business_models: vec![BusinessModel::Platform],
            business_model_ratios: vec![ratio("platform", 0.0, 0.0)],
            ..CompanyProfile::default()
        };
        assert!(resolve_ratios(&company).is_empty());
    }

    #[test]
    fn per_model_scores_average_each_models_indicators() {
        let outputs = crate::rubric::standard_rubric()
            .criterion("technicalOutput")
            .map(|c| match &c.kind {
                crate::rubric::ScoreKind::ModelOutput { outputs } => outputs.clone(),
                _ => Vec::new(),
            })
            .expect("technical output");
        let indicators = BTreeMap::from([
            ("platformCoreFunction".to_string(), IndicatorValue::answered(4)),
            ("platformSystemPerformance".to_string(), IndicatorValue::answered(0)),
            ("networkServiceScale".to_string(), IndicatorValue::answered(2)),
        ]);
        let scores = per_model_scores(
            &outputs,
            &[BusinessModel::Platform, BusinessModel::Network],
            &indicators,
        );
        assert_eq!(scores.len(), 2);
        assert_close(scores[&BusinessModel::Platform], 0.5);
        assert_close(scores[&BusinessModel::Network], 0.25);
    }
}
