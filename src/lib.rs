//! Hierarchical rubric scoring for public-education edtech vendor
//! evaluations: a qualification gate, stage and selection aware weight
//! adjustment, and business-model weighted technical output scores rolled up
//! into a 100-point total and a letter grade.

pub mod config;
pub mod evaluation;
pub mod output;
pub mod rubric;
pub mod server;
