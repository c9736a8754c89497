//! Hardcoded defaults used to bootstrap an empty configuration catalog and
//! to seed new simulations.

use crate::{
    ArchiveStatus, ComplexityFactorItem, MemberId, OfficeCostConfigItem, ProjectStage,
    ProjectStageItem, TeamMemberConfigItem,
};
use rust_decimal::Decimal;

/// Project styles offered by the proposal form; the first is the default.
pub const PROJECT_STYLES: [&str; 4] = [
    "Standard",
    "Luxury",
    "Simplified Commercial",
    "Express Consultancy",
];

/// Office overhead rows inserted the first time the catalog is accessed.
pub fn default_office_costs() -> Vec<OfficeCostConfigItem> {
    [
        ("config-fixed-rent", "Office rent/mortgage", 1600),
        ("config-fixed-condo", "Building condo fee", 400),
        ("config-fixed-insurance", "Office insurance", 100),
        ("config-fixed-property-tax", "Property tax", 100),
        ("config-fixed-power", "Electricity", 120),
        ("config-fixed-internet", "Internet", 100),
        ("config-fixed-water", "Water", 60),
        ("config-fixed-accountant", "Accountant", 150),
        ("config-fixed-cleaning", "Cleaning", 200),
        ("config-fixed-supplies", "Supplies (coffee, cleaning)", 300),
        ("config-fixed-subscriptions", "Subscriptions (software, etc)", 80),
        ("config-fixed-licenses", "Software licenses (monthly)", 400),
        ("config-fixed-social-media", "Social media", 1000),
        ("config-fixed-traffic-manager", "Ad traffic manager", 1300),
        ("config-fixed-ads", "Paid ads", 1000),
        ("config-fixed-fuel", "Fuel (general office)", 400),
    ]
    .into_iter()
    .map(|(id, name, value)| OfficeCostConfigItem {
        id: id.to_string(),
        name: name.to_string(),
        monthly_base_value: Decimal::new(value, 0),
        status: ArchiveStatus::Active,
    })
    .collect()
}

/// Team rows inserted the first time the catalog is accessed.
pub fn default_team_members() -> Vec<TeamMemberConfigItem> {
    [
        ("user-principal", "Principal Architect", "Principal Architect", 15000),
        ("user-partner1", "Partner 01 (Ana)", "Partner Architect", 9722),
        ("user-partner2", "Partner 02 (Bruno)", "Managing Partner", 9722),
        ("user-junior", "Junior Architect (Carlos)", "Junior Architect", 2552),
        ("user-intern1", "Intern 01 (Diana)", "Architecture Intern", 933),
        ("user-intern2", "Intern 02 (Eduardo)", "Design Intern", 933),
        ("outsourced", "Outsourced Studio", "Outsourced Services", 3500),
    ]
    .into_iter()
    .map(|(id, name, role, cents)| TeamMemberConfigItem {
        id: MemberId::new(id),
        name: name.to_string(),
        role: role.to_string(),
        hourly_rate: Decimal::new(cents, 2),
        status: ArchiveStatus::Active,
    })
    .collect()
}

/// The fixed complexity factor catalog, all inert.
pub fn default_complexity_factors() -> Vec<ComplexityFactorItem> {
    [
        ("topography", "Topography"),
        ("condo-approval", "Hard-to-approve condominium"),
        ("construction-method", "Complex construction method"),
        ("staircase", "Staircase typology"),
        ("extensive-program", "Extensive needs program"),
        ("after-hours", "After-hours meetings"),
        ("short-deadline", "Short deadline"),
        ("extra-consultants", "Extra team (consultants)"),
        ("no-soil-study", "No soil study"),
        ("no-topography-study", "No topography study"),
        ("automation", "Automation"),
        ("sustainability", "Sustainability"),
        ("photoreal-images", "Additional photorealistic images"),
    ]
    .into_iter()
    .map(|(key, name)| ComplexityFactorItem {
        id: format!("complex-{key}"),
        name: name.to_string(),
        percentage: Decimal::ZERO,
        is_applied: false,
    })
    .collect()
}

fn stage(id: &str, name: &str, collapsed: bool, items: &[(&str, &str, &str, i64)]) -> ProjectStage {
    ProjectStage {
        id: id.to_string(),
        name: name.to_string(),
        is_collapsed: collapsed,
        items: items
            .iter()
            .map(|(item_id, item_name, responsible, hundredths)| ProjectStageItem {
                id: item_id.to_string(),
                name: item_name.to_string(),
                responsible_id: Some(MemberId::new(*responsible)),
                hours: Some(Decimal::new(*hundredths, 2)),
            })
            .collect(),
    }
}

/// The office's standard staged work plan. Hours are given in hundredths.
pub fn default_stage_template() -> Vec<ProjectStage> {
    vec![
        stage(
            "template-stage-1",
            "STAGE 01 - CONTACT AND ORGANIZATION",
            false,
            &[
                ("template-item-1-1", "FIRST CONTACT - PRE-BRIEFING", "outsourced", 100),
                ("template-item-1-2", "REGISTRATION FORM", "user-principal", 50),
                ("template-item-1-3", "SITE VISIT", "user-principal", 50),
                ("template-item-1-4", "PROPOSAL PREPARATION AND PRESENTATION", "outsourced", 75),
                ("template-item-1-5", "FOLDER AND FILE ORGANIZATION", "user-principal", 50),
                ("template-item-1-6", "CONTRACT", "user-principal", 50),
            ],
        ),
        stage(
            "template-stage-2",
            "STAGE 02 - PRELIMINARY STUDY",
            true,
            &[
                ("template-item-2-1", "BRIEFING STUDY", "outsourced", 150),
                ("template-item-2-2", "ON-SITE SURVEY", "user-principal", 100),
                ("template-item-2-3", "SURVEY CLEAN-UP", "user-principal", 200),
                ("template-item-2-4", "REFERENCE RESEARCH", "outsourced", 50),
                ("template-item-2-5", "FIRST SKETCHES", "user-principal", 150),
                ("template-item-2-6", "LAYOUT AND SITING STUDY", "user-principal", 150),
                ("template-item-2-7", "MOOD BOARD", "outsourced", 100),
                ("template-item-2-8", "LAYOUT PLAN", "outsourced", 100),
                ("template-item-2-9", "PRELIMINARY STUDY PRESENTATION", "outsourced", 100),
                ("template-item-2-10", "APPROVAL MINUTES", "user-principal", 50),
            ],
        ),
        stage(
            "template-stage-3",
            "STAGE 03 - DRAFT DESIGN",
            true,
            &[
                ("template-item-3-1", "3D MODELLING", "outsourced", 300),
                ("template-item-3-2", "RENDERING AND IMAGES", "user-principal", 300),
                ("template-item-3-3", "DRAFT DESIGN PRESENTATION", "user-principal", 100),
                ("template-item-3-4", "REVISION PERIOD", "outsourced", 200),
                ("template-item-3-5", "APPROVAL MINUTES", "user-principal", 50),
            ],
        ),
        stage(
            "template-stage-4",
            "STAGE 04 - GENERAL PLANS",
            true,
            &[
                ("template-item-4-1", "DEMOLITION AND CONSTRUCTION PLAN", "user-principal", 100),
                ("template-item-4-2", "FLOOR PLAN", "outsourced", 100),
                ("template-item-4-3", "CEILING PLAN", "outsourced", 100),
                ("template-item-4-4", "LIGHTING PLAN", "outsourced", 100),
            ],
        ),
    ]
}
