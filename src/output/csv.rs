use anyhow::Result;

use crate::evaluation::EvaluationResult;
use crate::rubric::RubricModel;

/// One row per subcategory, then a row per category subtotal and a total row.
pub fn result_to_csv(result: &EvaluationResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["category", "subcategory", "points", "max_points"])?;
    for category in &result.breakdown {
        for sub in &category.subcategories {
            writer.write_record([
                category.id.clone(),
                sub.id.clone(),
                format!("{:.1}", sub.points),
                format!("{:.1}", sub.max_points),
            ])?;
        }
        writer.write_record([
            category.id.clone(),
            String::new(),
            format!("{:.1}", category.points),
            format!("{:.1}", category.max_points),
        ])?;
    }
    writer.write_record([
        "total".to_string(),
        result.grade.to_string(),
        format!("{:.1}", result.total_score),
        "100.0".to_string(),
    ])?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn rubric_to_csv(rubric: &RubricModel) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "category",
        "subcategory",
        "group",
        "criterion",
        "kind",
        "weight",
        "rules",
    ])?;
    for category in &rubric.categories {
        for sub in &category.subcategories {
            for group in &sub.groups {
                for criterion in &group.criteria {
                    let rules = criterion
                        .applicability
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    writer.write_record([
                        category.id.clone(),
                        sub.id.clone(),
                        group.id.clone(),
                        criterion.id.clone(),
                        criterion.kind.label().to_string(),
                        format!("{:.3}", criterion.weight),
                        rules,
                    ])?;
                }
            }
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
