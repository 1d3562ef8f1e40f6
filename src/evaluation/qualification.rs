use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evaluation::Answer;
use crate::rubric::{QualificationItem, Requirement};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pass,
    Fail,
    Pending,
    NotRequired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Passed,
    Failed,
    /// Nothing failed yet, but at least one required item is unanswered.
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualificationStatus {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualificationReport {
    pub passed: bool,
    pub outcome: GateOutcome,
    pub items: Vec<QualificationStatus>,
}

impl QualificationReport {
    pub fn with_status(&self, status: ItemStatus) -> impl Iterator<Item = &QualificationStatus> {
        self.items.iter().filter(move |item| item.status == status)
    }
}

pub fn is_required(item: &QualificationItem, has_device: bool) -> bool {
    match item.required_when {
        Requirement::Always => true,
        Requirement::Device => has_device,
    }
}

pub fn item_status(
    item: &QualificationItem,
    answers: &BTreeMap<String, Option<Answer>>,
    has_device: bool,
) -> ItemStatus {
    if !is_required(item, has_device) {
        return ItemStatus::NotRequired;
    }
    match answers.get(&item.id).copied().flatten() {
        Some(Answer::Pass) => ItemStatus::Pass,
        Some(Answer::Fail) => ItemStatus::Fail,
        None => ItemStatus::Pending,
    }
}

/// True only when every required item is explicitly answered `pass`.
pub fn evaluate(
    items: &[QualificationItem],
    answers: &BTreeMap<String, Option<Answer>>,
    has_device: bool,
) -> bool {
    items.iter().all(|item| {
        matches!(
            item_status(item, answers, has_device),
            ItemStatus::Pass | ItemStatus::NotRequired
        )
    })
}

pub fn report(
    items: &[QualificationItem],
    answers: &BTreeMap<String, Option<Answer>>,
    has_device: bool,
) -> QualificationReport {
    let items: Vec<QualificationStatus> = items
        .iter()
        .map(|item| QualificationStatus {
            id: item.id.clone(),
            name: item.name.clone(),
            status: item_status(item, answers, has_device),
        })
        .collect();
    let outcome = if items.iter().any(|i| i.status == ItemStatus::Fail) {
        GateOutcome::Failed
    } else if items.iter().any(|i| i.status == ItemStatus::Pending) {
        GateOutcome::Pending
    } else {
        GateOutcome::Passed
    };
    QualificationReport {
        passed: outcome == GateOutcome::Passed,
        outcome,
        items,
    }
}
