use crate::rubric::schema::{
    ApplicabilityRule, BusinessModel, ChecklistSize, ChoiceOption, FieldMetric, Grade, GradeBand,
    GradeZone, ModelItemCount, ModelOutputSpec, OutputIndicator, OutputKind, PerModelMode,
    QualificationItem, Requirement, RubricCategory, RubricCriterion, RubricGroup, RubricModel,
    RubricSubcategory, ScoreKind, Stage, ZoneInfo,
};

pub const STANDARD_VERSION: &str = "1.0.0";

pub const CAPABILITY: &str = "companyCapability";
pub const EDUCATION_VALUE: &str = "publicEducationValue";

/// The published edtech vendor rubric: a 40 point company capability
/// category and a 60 point public-education value category.
pub fn standard_rubric() -> RubricModel {
    RubricModel {
        version: STANDARD_VERSION.to_string(),
        qualification: qualification_items(),
        categories: vec![capability_category(), education_category()],
        grades: grade_bands(),
        zones: zones(),
    }
}

fn qualification_items() -> Vec<QualificationItem> {
    let item = |id: &str, name: &str, required_when| QualificationItem {
        id: id.to_string(),
        name: name.to_string(),
        required_when,
    };
    vec![
        item("businessRegistration", "Business registration", Requirement::Always),
        item("privacyPolicy", "Privacy policy", Requirement::Always),
        item("serviceAvailability", "Service availability", Requirement::Always),
        item("educationEthics", "Education ethics compliance", Requirement::Always),
        item("dataTransparency", "Data transparency", Requirement::Always),
        item("emcCompliance", "Electromagnetic compatibility", Requirement::Device),
        item("hazardousSubstance", "Hazardous substance regulation", Requirement::Device),
    ]
}

fn capability_category() -> RubricCategory {
    let early_only = ApplicabilityRule::StageOnly {
        stage: Stage::Early,
    };
    let choose = |option| ApplicabilityRule::ExclusiveChoice {
        option,
        stage: Stage::Early,
    };
    let optional_funding = ApplicabilityRule::OptionalFor {
        stages: vec![Stage::Growth, Stage::Mature],
        transfer_to: "operatingProfitMargin".to_string(),
    };

    let financial = RubricSubcategory {
        id: "financialStability".to_string(),
        name: "Financial stability".to_string(),
        weight: 0.229,
        groups: vec![
            choice_group(
                "financialHealth",
                "Financial health",
                0.62,
                vec![
                    scale("cashFlowSafety", "Cash flow safety", 0.217, 5)
                        .with_rules(vec![early_only, choose(ChoiceOption::A)]),
                    scale("interestCoverageRatio", "Interest coverage ratio", 0.123, 5)
                        .with_rules(vec![choose(ChoiceOption::B)]),
                    scale("debtRatio", "Debt ratio", 0.154, 4),
                    scale("currentRatio", "Current ratio", 0.126, 4),
                ],
            ),
            choice_group(
                "fundingCapability",
                "Funding capability",
                0.38,
                vec![
                    scale("investmentRecord", "Investment record", 0.099, 4)
                        .with_rules(vec![choose(ChoiceOption::A), optional_funding.clone()]),
                    scale("investorReliability", "Investor reliability", 0.099, 4)
                        .with_rules(vec![choose(ChoiceOption::A), optional_funding]),
                    scale("operatingProfitMargin", "Operating profit margin", 0.182, 5)
                        .with_rules(vec![choose(ChoiceOption::B)]),
                ],
            ),
        ],
    };

    let operational = RubricSubcategory {
        id: "operationalContinuity".to_string(),
        name: "Operational continuity".to_string(),
        weight: 0.333,
        groups: vec![group(
            "customerAndRevenue",
            "Customers and revenue",
            1.0,
            vec![
                scale("customerRetentionRate", "Customer retention rate", 0.583, 5),
                scale("revenueGrowthRate", "Revenue growth rate", 0.417, 7),
            ],
        )],
    };

    let technical = RubricSubcategory {
        id: "technicalReliability".to_string(),
        name: "Technical reliability".to_string(),
        weight: 0.438,
        groups: vec![
            group(
                "qualityManagement",
                "Quality management",
                0.456,
                vec![
                    scale("qualityMonitoring", "Quality monitoring", 0.228, 3),
                    scale("improvementProcess", "Improvement process", 0.228, 2),
                ],
            ),
            group(
                "incidentManagement",
                "Incident management",
                0.222,
                vec![
                    scale("disasterResponse", "Disaster response", 0.111, 3),
                    scale("postIncidentManagement", "Post-incident management", 0.111, 2),
                ],
            ),
            group(
                "informationSecurity",
                "Information security",
                0.322,
                vec![scale("securityCertification", "Security certification", 0.322, 3)],
            ),
        ],
    };

    RubricCategory {
        id: CAPABILITY.to_string(),
        name: "Company capability".to_string(),
        max_points: 40.0,
        subcategories: vec![financial, operational, technical],
    }
}

fn education_category() -> RubricCategory {
    let educational = RubricSubcategory {
        id: "educationalValue".to_string(),
        name: "Educational value".to_string(),
        weight: 0.489,
        groups: vec![
            group(
                "effectiveness",
                "Educational effectiveness",
                0.417,
                vec![
                    scale("userEngagement", "User engagement", 0.217, 9),
                    scale("learningImprovement", "Learning improvement", 0.217, 3),
                    checklist("learnerAutonomy", "Learner autonomy support", 0.333, 6),
                    checklist("teacherEfficiency", "Teacher workload efficiency", 0.117, 9),
                    checklist("systemConvenience", "System convenience", 0.116, 6),
                ],
            ),
            group(
                "suitability",
                "Public-education suitability",
                0.385,
                vec![
                    checklist("curriculumAlignment", "National curriculum alignment", 0.184, 4),
                    checklist("policyAlignment", "Education policy alignment", 0.183, 6),
                    scale("institutionAdoption", "Institution adoption", 0.296, 4).with_rules(
                        vec![ApplicabilityRule::FieldMetric {
                            metric: FieldMetric::InstitutionAdoption,
                        }],
                    ),
                    scale("userCount", "User count", 0.296, 3).with_rules(vec![
                        ApplicabilityRule::FieldMetric {
                            metric: FieldMetric::UserCount,
                        },
                    ]),
                    scale("renewalRate", "Contract renewal rate", 0.148, 9),
                    checklist("equityInclusion", "Equity and inclusion", 0.189, 6),
                ],
            ),
            group(
                "innovation",
                "Educational innovation",
                0.095,
                vec![
                    checklist("aiPersonalizedLearning", "AI personalised learning", 0.333, 6),
                    checklist("innovativeLearningEnv", "Innovative learning environment", 0.333, 3),
                    checklist("learningMethodSupport", "Learning method support", 0.334, 7),
                ],
            ),
            group(
                "expertise",
                "Educational expertise",
                0.103,
                vec![
                    scale("expertPersonnel", "Education experts on staff", 0.5, 3),
                    scale("expertRatio", "Education expert ratio", 0.5, 2),
                ],
            ),
        ],
    };

    let technical = RubricSubcategory {
        id: "technicalValue".to_string(),
        name: "Technical value".to_string(),
        weight: 0.25,
        groups: vec![
            group(
                "commonTech",
                "Common technical capability",
                0.6,
                vec![
                    scale("rdCapability", "R&D capability", 0.151, 4),
                    scale("technicalDifferentiation", "Technical differentiation", 0.173, 3),
                    model_checklist(
                        "dataUtilization",
                        "Learning data utilisation",
                        0.236,
                        &[5, 5, 5, 5, 5],
                        PerModelMode::Pooled,
                        0,
                    ),
                    checklist("learningExperienceDesign", "Learning experience design", 0.223, 18),
                    checklist("scalability", "Technical scalability", 0.151, 8),
                    checklist("globalExpansion", "Global expansion potential", 0.066, 5),
                ],
            ),
            group(
                "bmCapability",
                "Business-model capability",
                0.4,
                vec![
                    scale("corePersonnel", "Core personnel", 0.3, 4),
                    model_checklist(
                        "coreSkillset",
                        "Core skillset",
                        0.4,
                        &[6, 4, 6, 5, 5],
                        PerModelMode::Averaged,
                        6,
                    ),
                    RubricCriterion {
                        id: "technicalOutput".to_string(),
                        name: "Technical output".to_string(),
                        weight: 0.3,
                        kind: ScoreKind::ModelOutput {
                            outputs: technical_outputs(),
                        },
                        applicability: Vec::new(),
                    },
                ],
            ),
        ],
    };

    let social = RubricSubcategory {
        id: "socialValue".to_string(),
        name: "Social value".to_string(),
        weight: 0.2604,
        groups: vec![
            group(
                "socialResponsibility",
                "Digital divide mitigation",
                0.271,
                vec![
                    scale("lowSpecDeviceSupport", "Low-spec device support", 0.4, 2),
                    checklist("offlineModeSupport", "Offline mode support", 0.3, 3),
                    checklist("dataSavingFeatures", "Data saving features", 0.3, 3),
                ],
            ),
            group(
                "ethicsCompliance",
                "Ethics compliance",
                0.396,
                vec![checklist("dataAiEthics", "Data and AI ethics", 1.0, 8)],
            ),
            group(
                "ecosystemBuilding",
                "Ecosystem building",
                0.333,
                vec![checklist("educationPartnership", "Education partnerships", 1.0, 10)],
            ),
        ],
    };

    RubricCategory {
        id: EDUCATION_VALUE.to_string(),
        name: "Public-education value".to_string(),
        max_points: 60.0,
        subcategories: vec![educational, technical, social],
    }
}

fn technical_outputs() -> Vec<ModelOutputSpec> {
    let scale = |id: &str, name: &str, max_score| OutputIndicator {
        id: id.to_string(),
        name: name.to_string(),
        kind: OutputKind::Scale { max_score },
    };
    let checklist = |id: &str, name: &str, items| OutputIndicator {
        id: id.to_string(),
        name: name.to_string(),
        kind: OutputKind::Checklist { items },
    };
    vec![
        ModelOutputSpec {
            model: BusinessModel::Platform,
            indicators: vec![
                checklist("platformCoreFunction", "Core platform functions", 4),
                scale("platformSystemPerformance", "System performance", 3),
            ],
        },
        ModelOutputSpec {
            model: BusinessModel::Content,
            indicators: vec![
                scale("contentProductionRecord", "Production record", 3),
                checklist("contentQualityLevel", "Content quality level", 4),
            ],
        },
        ModelOutputSpec {
            model: BusinessModel::Device,
            indicators: vec![
                scale("deviceProductDevelopment", "Product development record", 3),
                scale("deviceTechLevel", "Device technology level", 3),
            ],
        },
        ModelOutputSpec {
            model: BusinessModel::Service,
            indicators: vec![
                scale("serviceOperationRecord", "Service operation record", 3),
                scale("serviceScope", "Service scope", 3),
            ],
        },
        ModelOutputSpec {
            model: BusinessModel::Network,
            indicators: vec![
                scale("networkServiceScale", "Network service scale", 4),
                scale("networkTechLevel", "Network technology level", 4),
            ],
        },
    ]
}

fn grade_bands() -> Vec<GradeBand> {
    let band = |grade, min, zone, description: &str| GradeBand {
        grade,
        min,
        zone,
        description: description.to_string(),
    };
    vec![
        band(Grade::Aaa, 95.0, GradeZone::A, "Very high"),
        band(Grade::Aa, 90.0, GradeZone::A, "High"),
        band(Grade::A, 85.0, GradeZone::A, "Excellent"),
        band(Grade::Bbb, 80.0, GradeZone::B, "Fairly good"),
        band(Grade::Bb, 70.0, GradeZone::B, "Average"),
        band(Grade::B, 65.0, GradeZone::B, "Partly lacking"),
        band(Grade::Ccc, 60.0, GradeZone::C, "Some improvement needed"),
        band(Grade::Cc, 55.0, GradeZone::C, "Key items need improvement"),
        band(Grade::C, 50.0, GradeZone::C, "Broad improvement needed"),
        band(Grade::D, 0.0, GradeZone::D, "Low"),
    ]
}

fn zones() -> Vec<ZoneInfo> {
    let zone = |zone, min, description: &str| ZoneInfo {
        zone,
        min,
        description: description.to_string(),
    };
    vec![
        zone(
            GradeZone::A,
            85.0,
            "Meets requirements overall; stable for public-education use",
        ),
        zone(
            GradeZone::B,
            65.0,
            "Meets most core requirements; usable in public education with some improvements",
        ),
        zone(
            GradeZone::C,
            50.0,
            "Needs improvement before public-education use",
        ),
        zone(
            GradeZone::D,
            0.0,
            "Difficult to apply in a public-education setting",
        ),
    ]
}

impl RubricCriterion {
    fn with_rules(mut self, rules: Vec<ApplicabilityRule>) -> Self {
        self.applicability = rules;
        self
    }
}

fn group(id: &str, name: &str, weight: f64, criteria: Vec<RubricCriterion>) -> RubricGroup {
    RubricGroup {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        selection_group: None,
        criteria,
    }
}

fn choice_group(id: &str, name: &str, weight: f64, criteria: Vec<RubricCriterion>) -> RubricGroup {
    RubricGroup {
        selection_group: Some(id.to_string()),
        ..group(id, name, weight, criteria)
    }
}

fn scale(id: &str, name: &str, weight: f64, max_score: u32) -> RubricCriterion {
    RubricCriterion {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        kind: ScoreKind::Scale { max_score },
        applicability: Vec::new(),
    }
}

fn checklist(id: &str, name: &str, weight: f64, items: u32) -> RubricCriterion {
    RubricCriterion {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        kind: ScoreKind::Checklist {
            size: ChecklistSize::Fixed { items },
        },
        applicability: Vec::new(),
    }
}

/// `counts` follows `BusinessModel::ALL` order.
fn model_checklist(
    id: &str,
    name: &str,
    weight: f64,
    counts: &[u32; 5],
    mode: PerModelMode,
    fallback: u32,
) -> RubricCriterion {
    let counts = BusinessModel::ALL
        .iter()
        .zip(counts.iter())
        .map(|(model, items)| ModelItemCount {
            model: *model,
            items: *items,
        })
        .collect();
    RubricCriterion {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        kind: ScoreKind::Checklist {
            size: ChecklistSize::PerModel {
                counts,
                mode,
                fallback,
            },
        },
        applicability: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn standard_rubric_is_valid() {
        standard_rubric().validate().expect("standard rubric validates");
    }

    #[test]
    fn category_budgets_match_published_points() {
        let rubric = standard_rubric();
        assert_close(rubric.max_points(), 100.0);
        let capability = rubric.category(CAPABILITY).expect("capability");
        assert_close(capability.achievable_points(), 40.0);
        let education = rubric.category(EDUCATION_VALUE).expect("education");
        assert_close(
            education.subcategories.iter().map(|s| s.weight).sum::<f64>(),
            0.9994,
        );
    }

    #[test]
    fn group_weights_sum_to_one_per_subcategory() {
        let rubric = standard_rubric();
        for category in &rubric.categories {
            for sub in &category.subcategories {
                let total: f64 = sub.groups.iter().map(|g| g.weight).sum();
                assert_close(total, 1.0);
            }
        }
    }

    #[test]
    fn group_weight_matches_item_weights_where_items_are_absolute() {
        let rubric = standard_rubric();
        let financial = &rubric.categories[0].subcategories[0];
        for group in &financial.groups {
            assert_close(group.base_total(), group.weight);
        }
    }

    #[test]
    fn qualification_has_five_fixed_and_two_device_items() {
        let rubric = standard_rubric();
        let always = rubric
            .qualification
            .iter()
            .filter(|q| q.required_when == Requirement::Always)
            .count();
        let device = rubric
            .qualification
            .iter()
            .filter(|q| q.required_when == Requirement::Device)
            .count();
        assert_eq!((always, device), (5, 2));
    }
}
