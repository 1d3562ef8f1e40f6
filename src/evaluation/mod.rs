pub mod business_model;
pub mod capability;
pub mod checklist;
pub mod education;
pub mod engine;
pub mod grade;
pub mod qualification;
pub mod scoring;
pub mod validation;
pub mod weights;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rubric::{BusinessModel, ChoiceOption, FieldMetric, Grade, GradeZone, RubricModel, Stage};

pub use engine::EvaluationEngine;
pub use qualification::{GateOutcome, ItemStatus, QualificationReport};
pub use validation::{validate_input, CompletenessReport, ValidationIssue, ValidationReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Pass,
    Fail,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorValueError {
    #[error("indicator value {0} is negative; use -1 or null for unanswered")]
    Negative(i64),
    #[error("indicator value {0} is out of range")]
    TooLarge(i64),
}

/// A raw indicator answer. `None` means unanswered; it is kept distinct from
/// zero until the scoring arithmetic reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Option<i64>", into = "Option<i64>")]
pub struct IndicatorValue(Option<u32>);

impl IndicatorValue {
    pub const UNANSWERED: IndicatorValue = IndicatorValue(None);

    pub fn answered(value: u32) -> Self {
        Self(Some(value))
    }

    pub fn get(self) -> Option<u32> {
        self.0
    }

    pub fn is_answered(self) -> bool {
        self.0.is_some()
    }

    /// Unanswered reads as zero.
    pub fn points(self) -> f64 {
        f64::from(self.0.unwrap_or(0))
    }
}

impl From<Option<u32>> for IndicatorValue {
    fn from(value: Option<u32>) -> Self {
        Self(value)
    }
}

impl TryFrom<Option<i64>> for IndicatorValue {
    type Error = IndicatorValueError;

    fn try_from(value: Option<i64>) -> Result<Self, Self::Error> {
        match value {
            None | Some(-1) => Ok(Self(None)),
            Some(v) if v < 0 => Err(IndicatorValueError::Negative(v)),
            Some(v) => u32::try_from(v)
                .map(|v| Self(Some(v)))
                .map_err(|_| IndicatorValueError::TooLarge(v)),
        }
    }
}

impl From<IndicatorValue> for Option<i64> {
    fn from(value: IndicatorValue) -> Self {
        value.0.map(i64::from)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RatioBasis {
    #[default]
    Revenue,
    Employee,
}

/// Share of one business model in the company's revenue and headcount, in
/// percent. `model` stays a string so unknown entries can be skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessModelRatio {
    pub model: String,
    #[serde(default)]
    pub revenue_ratio: f64,
    #[serde(default)]
    pub employee_ratio: f64,
}

impl BusinessModelRatio {
    pub fn share(&self, basis: RatioBasis) -> f64 {
        match basis {
            RatioBasis::Revenue => self.revenue_ratio,
            RatioBasis::Employee => self.employee_ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub business_models: Vec<BusinessModel>,
    #[serde(default)]
    pub business_model_ratios: Vec<BusinessModelRatio>,
    #[serde(default, alias = "ratioType")]
    pub ratio_basis: RatioBasis,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub has_device: bool,
    #[serde(default)]
    pub field_utilization_metric: FieldMetric,
    #[serde(default)]
    pub selection_choices: BTreeMap<String, ChoiceOption>,
    #[serde(default = "default_true")]
    pub include_investment_record: bool,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            business_models: Vec::new(),
            business_model_ratios: Vec::new(),
            ratio_basis: RatioBasis::default(),
            stage: None,
            has_device: false,
            field_utilization_metric: FieldMetric::default(),
            selection_choices: BTreeMap::new(),
            include_investment_record: true,
        }
    }
}

impl CompanyProfile {
    /// Selected models in first-seen order, without repeats.
    pub fn selected_models(&self) -> Vec<BusinessModel> {
        let mut models = Vec::with_capacity(self.business_models.len());
        for model in &self.business_models {
            if !models.contains(model) {
                models.push(*model);
            }
        }
        models
    }

    pub fn ships_devices(&self) -> bool {
        self.has_device || self.business_models.contains(&BusinessModel::Device)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationInput {
    #[serde(alias = "companyInfo")]
    pub company: CompanyProfile,
    #[serde(default, alias = "basicQualification")]
    pub qualification: BTreeMap<String, Option<Answer>>,
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorValue>,
}

impl EvaluationInput {
    pub fn new(company: CompanyProfile) -> Self {
        Self {
            company,
            ..Self::default()
        }
    }

    /// A fresh input with every qualification item and indicator of the
    /// rubric present and unanswered.
    pub fn blank(rubric: &RubricModel) -> Self {
        Self {
            company: CompanyProfile::default(),
            qualification: rubric
                .qualification
                .iter()
                .map(|item| (item.id.clone(), None))
                .collect(),
            indicators: rubric
                .indicator_ids()
                .into_iter()
                .map(|id| (id, IndicatorValue::UNANSWERED))
                .collect(),
        }
    }

    pub fn indicator(&self, id: &str) -> IndicatorValue {
        self.indicators.get(id).copied().unwrap_or_default()
    }

    pub fn answer(&self, id: &str) -> Option<Answer> {
        self.qualification.get(id).copied().flatten()
    }

    pub fn set_indicator(&mut self, id: impl Into<String>, value: impl Into<IndicatorValue>) {
        self.indicators.insert(id.into(), value.into());
    }

    pub fn set_answer(&mut self, id: impl Into<String>, answer: Option<Answer>) {
        self.qualification.insert(id.into(), answer);
    }

    pub fn with_indicator(mut self, id: &str, value: u32) -> Self {
        self.set_indicator(id, IndicatorValue::answered(value));
        self
    }

    pub fn with_answer(mut self, id: &str, answer: Answer) -> Self {
        self.set_answer(id, Some(answer));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryBreakdown {
    pub id: String,
    pub name: String,
    pub points: f64,
    pub max_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub id: String,
    pub name: String,
    pub points: f64,
    pub max_points: f64,
    pub subcategories: Vec<SubcategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub passed: bool,
    pub total_score: f64,
    pub capability_score: f64,
    pub education_value_score: f64,
    pub grade: Grade,
    pub grade_zone: GradeZone,
    pub grade_description: String,
    /// Rounded points per subcategory id.
    pub details: BTreeMap<String, f64>,
    pub breakdown: Vec<CategoryBreakdown>,
    pub qualification: QualificationReport,
}

fn default_true() -> bool {
    true
}
