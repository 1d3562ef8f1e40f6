use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::rubric::standard::{CAPABILITY, EDUCATION_VALUE};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BusinessModel {
    Platform,
    Content,
    Device,
    Service,
    Network,
}

impl BusinessModel {
    pub const ALL: [BusinessModel; 5] = [
        BusinessModel::Platform,
        BusinessModel::Content,
        BusinessModel::Device,
        BusinessModel::Service,
        BusinessModel::Network,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Content => "content",
            Self::Device => "device",
            Self::Service => "service",
            Self::Network => "network",
        }
    }
}

impl Display for BusinessModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Platform => "Platform",
            Self::Content => "Content",
            Self::Device => "Device",
            Self::Service => "Service",
            Self::Network => "Network",
        };
        write!(f, "{display}")
    }
}

impl FromStr for BusinessModel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "platform" => Ok(Self::Platform),
            "content" | "contents" => Ok(Self::Content),
            "device" | "hardware" => Ok(Self::Device),
            "service" => Ok(Self::Service),
            "network" => Ok(Self::Network),
            _ => Err(ParseError::new("business model", s)),
        }
    }
}

/// Company lifecycle phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Early,
    Growth,
    Mature,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Early, Stage::Growth, Stage::Mature];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Growth => "growth",
            Self::Mature => "mature",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for Stage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" => Ok(Self::Early),
            "growth" => Ok(Self::Growth),
            "mature" => Ok(Self::Mature),
            _ => Err(ParseError::new("stage", s)),
        }
    }
}

/// One side of an exclusive-choice pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ChoiceOption {
    #[default]
    A,
    B,
}

impl Display for ChoiceOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Which field-utilisation indicator counts toward suitability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldMetric {
    #[default]
    InstitutionAdoption,
    UserCount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA")]
    Aa,
    A,
    #[serde(rename = "BBB")]
    Bbb,
    #[serde(rename = "BB")]
    Bb,
    B,
    #[serde(rename = "CCC")]
    Ccc,
    #[serde(rename = "CC")]
    Cc,
    C,
    D,
}

impl Grade {
    pub const ALL: [Grade; 10] = [
        Grade::Aaa,
        Grade::Aa,
        Grade::A,
        Grade::Bbb,
        Grade::Bb,
        Grade::B,
        Grade::Ccc,
        Grade::Cc,
        Grade::C,
        Grade::D,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Aaa => "AAA",
            Self::Aa => "AA",
            Self::A => "A",
            Self::Bbb => "BBB",
            Self::Bb => "BB",
            Self::B => "B",
            Self::Ccc => "CCC",
            Self::Cc => "CC",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Grade {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|grade| grade.label() == normalized)
            .ok_or_else(|| ParseError::new("grade", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GradeZone {
    A,
    B,
    C,
    D,
}

impl Display for GradeZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let zone = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        write!(f, "{zone}")
    }
}

/// Conditional applicability of a criterion. Evaluated only by the weight
/// adjuster; scoring code never inspects these directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ApplicabilityRule {
    /// Excluded at every other stage; weight spreads proportionally.
    StageOnly { stage: Stage },
    /// At `stage`, excluded unless the group's selection picked `option`.
    ExclusiveChoice { option: ChoiceOption, stage: Stage },
    /// At the listed stages the caller may drop the item; its weight then
    /// moves entirely to `transfer_to`.
    OptionalFor {
        stages: Vec<Stage>,
        transfer_to: String,
    },
    /// Counts only when the caller picked `metric`; otherwise dropped.
    FieldMetric { metric: FieldMetric },
}

impl Display for ApplicabilityRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StageOnly { stage } => write!(f, "{stage} only"),
            Self::ExclusiveChoice { option, stage } => write!(f, "choice {option} at {stage}"),
            Self::OptionalFor {
                stages,
                transfer_to,
            } => {
                let stages = stages
                    .iter()
                    .map(Stage::as_slug)
                    .collect::<Vec<_>>()
                    .join("/");
                write!(f, "optional at {stages} -> {transfer_to}")
            }
            Self::FieldMetric { metric } => write!(f, "field metric {metric:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PerModelMode {
    /// Entries of every selected model are pooled into one list.
    Pooled,
    /// Denominator is the mean of the selected models' own list lengths.
    Averaged,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelItemCount {
    pub model: BusinessModel,
    pub items: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum ChecklistSize {
    Fixed {
        items: u32,
    },
    PerModel {
        counts: Vec<ModelItemCount>,
        mode: PerModelMode,
        /// List length used when none of the selected models has a count.
        #[serde(default)]
        fallback: u32,
    },
}

impl ChecklistSize {
    /// Number of checklist entries visible to a company holding `selected`.
    pub fn total_for(&self, selected: &[BusinessModel]) -> f64 {
        match self {
            Self::Fixed { items } => f64::from(*items),
            Self::PerModel {
                counts,
                mode,
                fallback,
            } => {
                let matched: Vec<u32> = counts
                    .iter()
                    .filter(|entry| selected.contains(&entry.model))
                    .map(|entry| entry.items)
                    .collect();
                if matched.is_empty() {
                    return f64::from(*fallback);
                }
                let sum: f64 = matched.iter().copied().map(f64::from).sum();
                match mode {
                    PerModelMode::Pooled => sum,
                    PerModelMode::Averaged => sum / matched.len() as f64,
                }
            }
        }
    }

    pub fn upper_bound(&self) -> u32 {
        match self {
            Self::Fixed { items } => *items,
            Self::PerModel {
                counts, fallback, ..
            } => counts
                .iter()
                .map(|entry| entry.items)
                .sum::<u32>()
                .max(*fallback),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputKind {
    Scale { max_score: u32 },
    Checklist { items: u32 },
}

impl OutputKind {
    pub fn max_raw(&self) -> u32 {
        match self {
            Self::Scale { max_score } => *max_score,
            Self::Checklist { items } => *items,
        }
    }
}

/// A per-business-model technical output indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputIndicator {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: OutputKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelOutputSpec {
    pub model: BusinessModel,
    pub indicators: Vec<OutputIndicator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreKind {
    Scale { max_score: u32 },
    Checklist { size: ChecklistSize },
    PassFail,
    /// Each selected model scores its own indicators; the results are
    /// combined by revenue or headcount share.
    ModelOutput { outputs: Vec<ModelOutputSpec> },
}

impl ScoreKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Checklist { .. } => "checklist",
            Self::PassFail => "pass_fail",
            Self::ModelOutput { .. } => "model_output",
        }
    }

    /// Largest raw value a caller may submit for this criterion.
    pub fn max_raw(&self) -> Option<u32> {
        match self {
            Self::Scale { max_score } => Some(*max_score),
            Self::Checklist { size } => Some(size.upper_bound()),
            Self::PassFail => Some(1),
            Self::ModelOutput { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricCriterion {
    pub id: String,
    pub name: String,
    pub weight: f64,
    #[serde(flatten)]
    pub kind: ScoreKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applicability: Vec<ApplicabilityRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricGroup {
    pub id: String,
    pub name: String,
    pub weight: f64,
    /// Set when the group holds an exclusive-choice pair; the caller's pick
    /// is looked up under this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_group: Option<String>,
    pub criteria: Vec<RubricCriterion>,
}

impl RubricGroup {
    pub fn base_total(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricSubcategory {
    pub id: String,
    pub name: String,
    /// Share of the parent category's points.
    pub weight: f64,
    pub groups: Vec<RubricGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricCategory {
    pub id: String,
    pub name: String,
    pub max_points: f64,
    pub subcategories: Vec<RubricSubcategory>,
}

impl RubricCategory {
    pub fn achievable_points(&self) -> f64 {
        self.subcategories
            .iter()
            .map(|sub| sub.weight * self.max_points)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Always,
    /// Required when the company ships hardware.
    Device,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualificationItem {
    pub id: String,
    pub name: String,
    pub required_when: Requirement,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeBand {
    pub grade: Grade,
    pub min: f64,
    pub zone: GradeZone,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneInfo {
    pub zone: GradeZone,
    pub min: f64,
    pub description: String,
}

/// The complete criteria tree. Loaded once and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricModel {
    pub version: String,
    pub qualification: Vec<QualificationItem>,
    pub categories: Vec<RubricCategory>,
    pub grades: Vec<GradeBand>,
    #[serde(default)]
    pub zones: Vec<ZoneInfo>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RubricError {
    #[error("duplicate rubric id: {0}")]
    DuplicateId(String),
    #[error("{id} has invalid weight {weight}")]
    InvalidWeight { id: String, weight: f64 },
    #[error("criterion {0} has a zero-sized score range")]
    EmptyRange(String),
    #[error("criterion {id} transfers its weight to unknown sibling {target}")]
    UnknownTransferTarget { id: String, target: String },
    #[error("group {0} has exclusive-choice criteria but no selection group")]
    MissingSelectionGroup(String),
    #[error("grade bands must be listed by strictly descending minimum")]
    UnorderedGrades,
    #[error("rubric defines no grade bands")]
    NoGrades,
    #[error("category {0} has no subcategories")]
    EmptyCategory(String),
    #[error("rubric has no {0} category")]
    MissingCategory(String),
}

impl RubricModel {
    pub fn category(&self, id: &str) -> Option<&RubricCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn criteria(&self) -> impl Iterator<Item = &RubricCriterion> {
        self.categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.criteria.iter())
    }

    pub fn criterion(&self, id: &str) -> Option<&RubricCriterion> {
        self.criteria().find(|c| c.id == id)
    }

    /// Every key a caller may use in the indicator map, including per-model
    /// output indicators.
    pub fn indicator_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for criterion in self.criteria() {
            match &criterion.kind {
                ScoreKind::ModelOutput { outputs } => {
                    for spec in outputs {
                        ids.extend(spec.indicators.iter().map(|i| i.id.clone()));
                    }
                }
                _ => {
                    ids.insert(criterion.id.clone());
                }
            }
        }
        ids
    }

    pub fn zone_description(&self, zone: GradeZone) -> Option<&str> {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .map(|z| z.description.as_str())
    }

    pub fn max_points(&self) -> f64 {
        self.categories.iter().map(|c| c.max_points).sum()
    }

    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        let mut seen = BTreeSet::new();
        let mut claim = |id: &str| {
            if seen.insert(id.to_string()) {
                Ok(())
            } else {
                Err(RubricError::DuplicateId(id.to_string()))
            }
        };

        for item in &self.qualification {
            claim(&item.id)?;
        }
        for category in &self.categories {
            claim(&category.id)?;
            if category.subcategories.is_empty() {
                return Err(RubricError::EmptyCategory(category.id.clone()));
            }
            for sub in &category.subcategories {
                claim(&sub.id)?;
                check_weight(&sub.id, sub.weight)?;
                for group in &sub.groups {
                    claim(&group.id)?;
                    check_weight(&group.id, group.weight)?;
                    for criterion in &group.criteria {
                        claim(&criterion.id)?;
                        if let ScoreKind::ModelOutput { outputs } = &criterion.kind {
                            for indicator in outputs.iter().flat_map(|o| o.indicators.iter()) {
                                claim(&indicator.id)?;
                            }
                        }
                    }
                    validate_group(group)?;
                }
            }
        }

        for required in [CAPABILITY, EDUCATION_VALUE] {
            if self.category(required).is_none() {
                return Err(RubricError::MissingCategory(required.to_string()));
            }
        }

        if self.grades.is_empty() {
            return Err(RubricError::NoGrades);
        }
        let descending = self.grades.windows(2).all(|pair| pair[0].min > pair[1].min);
        if !descending {
            return Err(RubricError::UnorderedGrades);
        }
        Ok(())
    }
}

fn check_weight(id: &str, weight: f64) -> Result<(), RubricError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(RubricError::InvalidWeight {
            id: id.to_string(),
            weight,
        })
    }
}

fn validate_group(group: &RubricGroup) -> Result<(), RubricError> {
    for criterion in &group.criteria {
        check_weight(&criterion.id, criterion.weight)?;
        let empty_range = match &criterion.kind {
            ScoreKind::Scale { max_score } => *max_score == 0,
            ScoreKind::Checklist { size } => size.upper_bound() == 0,
            ScoreKind::PassFail => false,
            ScoreKind::ModelOutput { outputs } => outputs
                .iter()
                .flat_map(|o| o.indicators.iter())
                .any(|i| match i.kind {
                    OutputKind::Scale { max_score } => max_score == 0,
                    OutputKind::Checklist { items } => items == 0,
                }),
        };
        if empty_range {
            return Err(RubricError::EmptyRange(criterion.id.clone()));
        }
        for rule in &criterion.applicability {
            match rule {
                ApplicabilityRule::ExclusiveChoice { .. } if group.selection_group.is_none() => {
                    return Err(RubricError::MissingSelectionGroup(group.id.clone()));
                }
                ApplicabilityRule::OptionalFor { transfer_to, .. } => {
                    let known = group
                        .criteria
                        .iter()
                        .any(|c| &c.id == transfer_to && c.id != criterion.id);
                    if !known {
                        return Err(RubricError::UnknownTransferTarget {
                            id: criterion.id.clone(),
                            target: transfer_to.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}
