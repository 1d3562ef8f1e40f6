use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::evaluation::CompanyProfile;
use crate::rubric::{ApplicabilityRule, ChoiceOption, FieldMetric, RubricGroup, Stage};

/// Company state that decides which criteria of a group count.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustContext {
    pub stage: Option<Stage>,
    pub choices: BTreeMap<String, ChoiceOption>,
    pub include_optional: bool,
    pub field_metric: FieldMetric,
}

impl AdjustContext {
    pub fn from_company(company: &CompanyProfile) -> Self {
        Self {
            stage: company.stage,
            choices: company.selection_choices.clone(),
            include_optional: company.include_investment_record,
            field_metric: company.field_utilization_metric,
        }
    }

    fn choice(&self, selection_group: Option<&str>) -> ChoiceOption {
        selection_group
            .and_then(|group| self.choices.get(group))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightStatus {
    Counted,
    OtherStage,
    NotChosen,
    OptedOut,
    MetricNotSelected,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdjustedWeight {
    pub id: String,
    pub base: f64,
    pub weight: f64,
    pub status: WeightStatus,
}

/// Adjusted weights of one group, in rubric order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdjustedWeights {
    pub group: String,
    pub entries: Vec<AdjustedWeight>,
}

impl AdjustedWeights {
    pub fn get(&self, id: &str) -> f64 {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.weight)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }

    pub fn base_total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.base).sum()
    }
}

/// Applies stage exclusion and exclusive choices (proportional spread), then
/// optional opt-outs (fixed transfer) and the field-metric pick (drop).
/// A missing stage counts as not early for opt-outs.
pub fn adjust(group: &RubricGroup, ctx: &AdjustContext) -> AdjustedWeights {
    let mut entries: Vec<AdjustedWeight> = group
        .criteria
        .iter()
        .map(|criterion| AdjustedWeight {
            id: criterion.id.clone(),
            base: criterion.weight,
            weight: criterion.weight,
            status: WeightStatus::Counted,
        })
        .collect();

    let choice = ctx.choice(group.selection_group.as_deref());
    for (entry, criterion) in entries.iter_mut().zip(&group.criteria) {
        for rule in &criterion.applicability {
            let status = match rule {
                ApplicabilityRule::StageOnly { stage } if ctx.stage != Some(*stage) => {
                    WeightStatus::OtherStage
                }
                ApplicabilityRule::ExclusiveChoice { option, stage }
                    if ctx.stage == Some(*stage) && choice != *option =>
                {
                    WeightStatus::NotChosen
                }
                ApplicabilityRule::FieldMetric { metric } if *metric != ctx.field_metric => {
                    WeightStatus::MetricNotSelected
                }
                _ => continue,
            };
            if entry.status == WeightStatus::Counted {
                entry.status = status;
            }
        }
    }

    let spread: Vec<usize> = indices_with(&entries, |s| {
        matches!(s, WeightStatus::OtherStage | WeightStatus::NotChosen)
    });
    let excluded: f64 = spread.iter().map(|&i| entries[i].weight).sum();
    for &i in &spread {
        entries[i].weight = 0.0;
    }
    for i in indices_with(&entries, |s| s == WeightStatus::MetricNotSelected) {
        entries[i].weight = 0.0;
    }
    distribute(&mut entries, excluded);

    if !ctx.include_optional {
        for (index, criterion) in group.criteria.iter().enumerate() {
            let target = criterion.applicability.iter().find_map(|rule| match rule {
                ApplicabilityRule::OptionalFor {
                    stages,
                    transfer_to,
                } if optional_at(stages, ctx.stage) => Some(transfer_to.as_str()),
                _ => None,
            });
            let Some(target) = target else {
                continue;
            };
            if entries[index].status != WeightStatus::Counted {
                continue;
            }
            let moved = entries[index].weight;
            entries[index].weight = 0.0;
            entries[index].status = WeightStatus::OptedOut;
            let recipient = entries
                .iter()
                .position(|e| e.id == target && e.status == WeightStatus::Counted);
            match recipient {
                Some(j) => entries[j].weight += moved,
                None => distribute(&mut entries, moved),
            }
        }
    }

    let adjusted = AdjustedWeights {
        group: group.id.clone(),
        entries,
    };
    debug!(
        group = %group.id,
        base_total = adjusted.base_total(),
        total = adjusted.total(),
        "adjusted group weights"
    );
    adjusted
}

fn optional_at(stages: &[Stage], stage: Option<Stage>) -> bool {
    match stage {
        Some(stage) => stages.contains(&stage),
        None => stages.iter().any(|s| *s != Stage::Early),
    }
}

fn indices_with(entries: &[AdjustedWeight], pred: impl Fn(WeightStatus) -> bool) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| pred(entry.status))
        .map(|(i, _)| i)
        .collect()
}

/// Spreads `amount` over the counted entries in proportion to their current
/// weight. With nothing left to receive it, the amount is lost and the group
/// scores zero.
fn distribute(entries: &mut [AdjustedWeight], amount: f64) {
    if amount <= 0.0 {
        return;
    }
    let remaining: f64 = entries
        .iter()
        .filter(|e| e.status == WeightStatus::Counted)
        .map(|e| e.weight)
        .sum();
    if remaining <= 0.0 {
        return;
    }
    for entry in entries
        .iter_mut()
        .filter(|e| e.status == WeightStatus::Counted)
    {
        entry.weight += amount * entry.weight / remaining;
    }
}
