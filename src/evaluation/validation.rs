use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::evaluation::qualification;
use crate::evaluation::weights::{adjust, AdjustContext};
use crate::evaluation::EvaluationInput;
use crate::rubric::{BusinessModel, ChecklistSize, RubricModel, ScoreKind};

/// Declared ratios may drift this far from 100% before a warning is raised.
const RATIO_SUM_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("company name is required")]
    MissingCompanyName,
    #[error("at least one business model must be selected")]
    NoBusinessModel,
    #[error("company stage must be selected")]
    MissingStage,
    #[error("business model {model} is selected more than once")]
    DuplicateBusinessModel { model: BusinessModel },
    #[error("indicator {id} is not part of the rubric")]
    UnknownIndicator { id: String },
    #[error("qualification item {id} is not part of the rubric")]
    UnknownQualificationItem { id: String },
    #[error("indicator {id} value {value} exceeds the maximum of {max}; it will be capped")]
    ValueOutOfRange { id: String, value: u32, max: u32 },
    #[error("ratio entry {model} does not name a business model")]
    UnknownRatioModel { model: String },
    #[error("declared ratios sum to {sum}%, not 100%")]
    RatioSum { sum: f64 },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    /// Indicators that currently carry weight for this company.
    pub applicable: usize,
    pub answered: usize,
    pub missing: Vec<String>,
    pub pending_qualification: Vec<String>,
}

impl CompletenessReport {
    pub fn ratio(&self) -> f64 {
        if self.applicable == 0 {
            return 1.0;
        }
        self.answered as f64 / self.applicable as f64
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub basic_qualification_passed: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub completeness: CompletenessReport,
}

impl ValidationReport {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Checks an input against a rubric without scoring it. Errors make the
/// input unscorable; warnings describe values the engine will coerce or
/// ignore.
pub fn validate_input(input: &EvaluationInput, rubric: &RubricModel) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let company = &input.company;

    if company.name.trim().is_empty() {
        errors.push(ValidationIssue::MissingCompanyName);
    }
    if company.business_models.is_empty() {
        errors.push(ValidationIssue::NoBusinessModel);
    }
    if company.stage.is_none() {
        errors.push(ValidationIssue::MissingStage);
    }
    let mut seen = Vec::with_capacity(company.business_models.len());
    for model in &company.business_models {
        if seen.contains(model) {
            errors.push(ValidationIssue::DuplicateBusinessModel { model: *model });
        } else {
            seen.push(*model);
        }
    }

    let known = rubric.indicator_ids();
    for (id, value) in &input.indicators {
        if !known.contains(id) {
            errors.push(ValidationIssue::UnknownIndicator { id: id.clone() });
            continue;
        }
        let (Some(value), Some(max)) = (value.get(), max_raw(rubric, id)) else {
            continue;
        };
        if value > max {
            warnings.push(ValidationIssue::ValueOutOfRange {
                id: id.clone(),
                value,
                max,
            });
        }
    }

    for id in input.qualification.keys() {
        if !rubric.qualification.iter().any(|item| &item.id == id) {
            warnings.push(ValidationIssue::UnknownQualificationItem { id: id.clone() });
        }
    }

    check_ratios(input, &mut warnings);

    let basic_qualification_passed = qualification::evaluate(
        &rubric.qualification,
        &input.qualification,
        company.ships_devices(),
    );

    ValidationReport {
        is_valid: errors.is_empty(),
        basic_qualification_passed,
        errors,
        warnings,
        completeness: completeness(input, rubric),
    }
}

/// Counts the indicators that carry weight for this company and how many of
/// them are answered.
pub fn completeness(input: &EvaluationInput, rubric: &RubricModel) -> CompletenessReport {
    let ctx = AdjustContext::from_company(&input.company);
    let models = input.company.selected_models();
    let mut applicable = Vec::new();

    for category in &rubric.categories {
        for sub in &category.subcategories {
            for group in &sub.groups {
                let weights = adjust(group, &ctx);
                for criterion in &group.criteria {
                    if weights.get(&criterion.id) <= 0.0 {
                        continue;
                    }
                    match &criterion.kind {
                        ScoreKind::ModelOutput { outputs } => applicable.extend(
                            outputs
                                .iter()
                                .filter(|spec| models.contains(&spec.model))
                                .flat_map(|spec| spec.indicators.iter().map(|i| i.id.clone())),
                        ),
                        ScoreKind::Checklist {
                            size: size @ ChecklistSize::PerModel { .. },
                        } if size.total_for(&models) <= 0.0 => {}
                        _ => applicable.push(criterion.id.clone()),
                    }
                }
            }
        }
    }

    let missing: Vec<String> = applicable
        .iter()
        .filter(|id| !input.indicator(id).is_answered())
        .cloned()
        .collect();
    let gate = qualification::report(
        &rubric.qualification,
        &input.qualification,
        input.company.ships_devices(),
    );
    CompletenessReport {
        applicable: applicable.len(),
        answered: applicable.len() - missing.len(),
        missing,
        pending_qualification: gate
            .with_status(qualification::ItemStatus::Pending)
            .map(|item| item.id.clone())
            .collect(),
    }
}

fn max_raw(rubric: &RubricModel, id: &str) -> Option<u32> {
    if let Some(criterion) = rubric.criterion(id) {
        return criterion.kind.max_raw();
    }
    rubric.criteria().find_map(|criterion| match &criterion.kind {
        ScoreKind::ModelOutput { outputs } => outputs
            .iter()
            .flat_map(|spec| spec.indicators.iter())
            .find(|indicator| indicator.id == id)
            .map(|indicator| indicator.kind.max_raw()),
        _ => None,
    })
}

fn check_ratios(input: &EvaluationInput, warnings: &mut Vec<ValidationIssue>) {
    let company = &input.company;
    if company.business_model_ratios.is_empty() {
        return;
    }
    let mut sum = 0.0;
    for entry in &company.business_model_ratios {
        if BusinessModel::from_str(&entry.model).is_err() {
            warnings.push(ValidationIssue::UnknownRatioModel {
                model: entry.model.clone(),
            });
            continue;
        }
        sum += entry.share(company.ratio_basis);
    }
    if (sum - 100.0).abs() > RATIO_SUM_TOLERANCE {
        warnings.push(ValidationIssue::RatioSum { sum });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{Answer, BusinessModelRatio, CompanyProfile};
    use crate::rubric::{standard_rubric, FieldMetric, Stage};
    use pretty_assertions::assert_eq;

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme Learning".to_string(),
            business_models: vec![BusinessModel::Platform],
            stage: Some(Stage::Growth),
            ..CompanyProfile::default()
        }
    }

    #[test]
    fn a_complete_profile_is_valid() {
        let rubric = standard_rubric();
        let report = validate_input(&EvaluationInput::new(company()), &rubric);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(!report.basic_qualification_passed);
        assert_eq!(report.completeness.answered, 0);
    }

    #[test]
    fn missing_profile_fields_are_errors() {
        let rubric = standard_rubric();
        let input = EvaluationInput::new(CompanyProfile {
            business_models: vec![BusinessModel::Content, BusinessModel::Content],
            ..CompanyProfile::default()
        });
        let report = validate_input(&input, &rubric);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                ValidationIssue::MissingCompanyName,
                ValidationIssue::MissingStage,
                ValidationIssue::DuplicateBusinessModel {
                    model: BusinessModel::Content
                },
            ]
        );
    }

    #[test]
    fn unknown_indicator_is_an_error_and_overflow_a_warning() {
        let rubric = standard_rubric();
        let input = EvaluationInput::new(company())
            .with_indicator("notAnIndicator", 1)
            .with_indicator("debtRatio", 7);
        let report = validate_input(&input, &rubric);
        assert_eq!(
            report.errors,
            vec![ValidationIssue::UnknownIndicator {
                id: "notAnIndicator".to_string()
            }]
        );
        assert_eq!(
            report.warnings,
            vec![ValidationIssue::ValueOutOfRange {
                id: "debtRatio".to_string(),
                value: 7,
                max: 4
            }]
        );
    }

    #[test]
    fn completeness_tracks_applicable_indicators_only() {
        let rubric = standard_rubric();
        let input = EvaluationInput::new(company()).with_indicator("debtRatio", 3);
        let report = completeness(&input, &rubric);
        assert!(!report.missing.contains(&"debtRatio".to_string()));
        // cash flow counts only for early-stage companies
        assert!(!report.missing.contains(&"cashFlowSafety".to_string()));
        assert!(report.missing.contains(&"platformCoreFunction".to_string()));
        assert!(!report.missing.contains(&"networkTechLevel".to_string()));
        assert!(!report.missing.contains(&"userCount".to_string()));
        assert_eq!(report.answered, 1);
        assert_eq!(report.pending_qualification.len(), 5);
    }

    #[test]
    fn field_metric_switches_completeness() {
        let rubric = standard_rubric();
        let mut profile = company();
        profile.field_utilization_metric = FieldMetric::UserCount;
        let report = completeness(&EvaluationInput::new(profile), &rubric);
        assert!(report.missing.contains(&"userCount".to_string()));
        assert!(!report.missing.contains(&"institutionAdoption".to_string()));
    }

    #[test]
    fn device_models_add_qualification_items() {
        let rubric = standard_rubric();
        let mut profile = company();
        profile.business_models.push(BusinessModel::Device);
        let mut input = EvaluationInput::new(profile);
        for item in &rubric.qualification {
            input.set_answer(item.id.clone(), Some(Answer::Pass));
        }
        input.set_answer("emcCompliance", None);
        let report = validate_input(&input, &rubric);
        assert!(!report.basic_qualification_passed);
        assert_eq!(
            report.completeness.pending_qualification,
            vec!["emcCompliance".to_string()]
        );
    }

    #[test]
    fn ratio_problems_are_warnings() {
        let rubric = standard_rubric();
        let mut profile = company();
        profile.business_model_ratios = vec![
            BusinessModelRatio {
                model: "platform".to_string(),
                revenue_ratio: 60.0,
                employee_ratio: 0.0,
            },
            BusinessModelRatio {
                model: "spaceship".to_string(),
                revenue_ratio: 40.0,
                employee_ratio: 0.0,
            },
        ];
        let report = validate_input(&EvaluationInput::new(profile), &rubric);
        assert!(report.is_valid);
        assert_eq!(
            report.warnings,
            vec![
                ValidationIssue::UnknownRatioModel {
                    model: "spaceship".to_string()
                },
                ValidationIssue::RatioSum { sum: 60.0 },
            ]
        );
    }

    #[test]
    fn issues_serialize_with_a_code_tag() {
        let json = serde_json::to_value(ValidationIssue::UnknownIndicator {
            id: "x".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["code"], "unknown_indicator");
        assert_eq!(json["id"], "x");
    }
}
