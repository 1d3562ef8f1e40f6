pub mod loader;
pub mod schema;
pub mod standard;

pub use loader::{load_rubric, resolve_rubric};
pub use schema::{
    ApplicabilityRule, BusinessModel, ChecklistSize, ChoiceOption, FieldMetric, Grade, GradeBand,
    GradeZone, ModelItemCount, ModelOutputSpec, OutputIndicator, OutputKind, ParseError,
    PerModelMode, QualificationItem, Requirement, RubricCategory, RubricCriterion, RubricError,
    RubricGroup, RubricModel, RubricSubcategory, ScoreKind, Stage,
};
pub use standard::standard_rubric;
