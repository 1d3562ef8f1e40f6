use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::evaluation::grade::GradeOutcome;
use crate::evaluation::{EvaluationResult, ItemStatus, QualificationReport, ValidationReport};
use crate::rubric::{GradeZone, RubricModel};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn zone_color(zone: GradeZone) -> Color {
    match zone {
        GradeZone::A => Color::Green,
        GradeZone::B => Color::Cyan,
        GradeZone::C => Color::Yellow,
        GradeZone::D => Color::Red,
    }
}

pub fn render_result_table(result: &EvaluationResult) -> String {
    let mut table = new_table();
    table.set_header(vec!["Item", "Value"]);

    let gate = if result.passed {
        Cell::new("PASSED").fg(Color::Green)
    } else {
        Cell::new("FAILED").fg(Color::Red)
    };
    table.add_row(Row::from(vec![Cell::new("Basic qualification"), gate]));
    for category in &result.breakdown {
        table.add_row(vec![
            category.name.clone(),
            format!("{:.1} / {:.0}", category.points, category.max_points),
        ]);
    }
    table.add_row(vec![
        "Total".to_string(),
        format!("{:.1} / 100", result.total_score),
    ]);
    table.add_row(Row::from(vec![
        Cell::new("Grade"),
        Cell::new(format!("{} (zone {})", result.grade, result.grade_zone))
            .fg(zone_color(result.grade_zone)),
    ]));
    table.add_row(vec!["Assessment", result.grade_description.as_str()]);

    let mut out = table.to_string();
    out.push('\n');
    out.push_str(&render_breakdown_table(result));
    if !result.passed {
        out.push('\n');
        out.push_str(&render_qualification_table(&result.qualification));
    }
    out
}

pub fn render_breakdown_table(result: &EvaluationResult) -> String {
    let mut table = new_table();
    table.set_header(vec!["Category", "Subcategory", "Points", "Max"]);
    for category in &result.breakdown {
        for sub in &category.subcategories {
            table.add_row(vec![
                category.name.clone(),
                sub.name.clone(),
                format!("{:.1}", sub.points),
                format!("{:.1}", sub.max_points),
            ]);
        }
    }
    table.to_string()
}

pub fn render_qualification_table(report: &QualificationReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Requirement", "Status"]);
    for item in &report.items {
        let status = match item.status {
            ItemStatus::Pass => Cell::new("PASS").fg(Color::Green),
            ItemStatus::Fail => Cell::new("FAIL").fg(Color::Red),
            ItemStatus::Pending => Cell::new("PENDING").fg(Color::Yellow),
            ItemStatus::NotRequired => Cell::new("n/a"),
        };
        table.add_row(Row::from(vec![Cell::new(&item.name), status]));
    }
    table.to_string()
}

pub fn render_validation_table(report: &ValidationReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Level", "Issue"]);
    for issue in &report.errors {
        table.add_row(Row::from(vec![
            Cell::new("ERROR").fg(Color::Red),
            Cell::new(issue.to_string()),
        ]));
    }
    for issue in &report.warnings {
        table.add_row(Row::from(vec![
            Cell::new("WARN").fg(Color::Yellow),
            Cell::new(issue.to_string()),
        ]));
    }

    let completeness = &report.completeness;
    let mut out = String::new();
    if report.errors.is_empty() && report.warnings.is_empty() {
        out.push_str("Input is valid.\n");
    } else {
        out.push_str(&table.to_string());
        out.push('\n');
    }
    out.push_str(&format!(
        "Indicators answered: {}/{} ({:.0}%)\nBasic qualification passed: {}",
        completeness.answered,
        completeness.applicable,
        completeness.ratio() * 100.0,
        report.basic_qualification_passed
    ));
    if !completeness.pending_qualification.is_empty() {
        out.push_str(&format!(
            "\nPending qualification items: {}",
            completeness.pending_qualification.join(", ")
        ));
    }
    out
}

pub fn render_rubric_table(rubric: &RubricModel) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Subcategory",
        "Group",
        "Criterion",
        "Kind",
        "Weight",
        "Rules",
    ]);
    for category in &rubric.categories {
        for sub in &category.subcategories {
            for group in &sub.groups {
                for criterion in &group.criteria {
                    let rules = criterion
                        .applicability
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    table.add_row(vec![
                        format!("{} ({:.1} pts)", sub.name, sub.weight * category.max_points),
                        group.name.clone(),
                        criterion.name.clone(),
                        criterion.kind.label().to_string(),
                        format!("{:.3}", criterion.weight),
                        rules,
                    ]);
                }
            }
        }
    }
    format!(
        "Rubric {} ({} criteria, fingerprint {})\n{}",
        rubric.version,
        rubric.criteria().count(),
        &rubric.fingerprint()[..12],
        table
    )
}

pub fn render_grade_table(score: f64, outcome: &GradeOutcome) -> String {
    let mut table = new_table();
    table.set_header(vec!["Score", "Grade", "Zone", "Assessment"]);
    table.add_row(Row::from(vec![
        Cell::new(format!("{score:.1}")),
        Cell::new(outcome.grade.to_string()).fg(zone_color(outcome.zone)),
        Cell::new(outcome.zone.to_string()),
        Cell::new(&outcome.description),
    ]));
    match &outcome.zone_description {
        Some(zone) => format!("{table}\n{zone}"),
        None => table.to_string(),
    }
}
