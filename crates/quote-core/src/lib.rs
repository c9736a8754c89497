#![deny(warnings)]

//! Core domain models and invariants for the studio quote engine.
//!
//! This crate defines the serializable records shared by the pricing
//! engine, the store and the CLI: priced cost lines, staged work plans,
//! complexity factors, the persisted cost simulation, and the CRM records
//! (leads, clients, projects) that a simulation feeds into. Validation
//! helpers guard the invariants that are enforced at save time.

pub mod catalog;
pub mod input;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The single currency every monetary amount is expressed in.
pub const CURRENCY_CODE: &str = "BRL";

/// Identifier of a team member, shared by config items and users.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Identifier of a CRM lead.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Whether a configuration row is offered to new simulations.
///
/// Rows are archived instead of deleted so that stored simulations can
/// still resolve the ids they reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveStatus {
    #[default]
    Active,
    Archived,
}

impl ArchiveStatus {
    pub fn is_active(self) -> bool {
        matches!(self, ArchiveStatus::Active)
    }
}

/// Category of a priced line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostItemType {
    /// Office overhead, prorated by project duration.
    OfficeFixed,
    /// Costs specific to one project.
    ProjectVariable,
    /// Staff hours.
    Team,
}

/// Unit the base value of a priced line is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostItemUnit {
    Monthly,
    ProjectSpecific,
    Hourly,
    Unit,
}

/// A priced line of a simulation.
///
/// `calculated_cost` is always `base_value * quantity`: the numeric fields
/// are only reachable through setters that recompute it, and deserialized
/// records are recomputed on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CostItemRecord")]
pub struct CostItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_item_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: CostItemType,
    pub unit: CostItemUnit,
    base_value: Decimal,
    quantity: Decimal,
    calculated_cost: Decimal,
    /// Excluded from totals when false, but still listed.
    pub is_applied: bool,
    pub is_default: bool,
    /// Whether name and base value may be changed by the user.
    pub editable: bool,
}

/// Wire shape of [`CostItem`]; `calculatedCost` is accepted but ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostItemRecord {
    id: String,
    #[serde(default)]
    config_item_id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    item_type: CostItemType,
    unit: CostItemUnit,
    base_value: Decimal,
    quantity: Decimal,
    #[serde(default)]
    #[allow(dead_code)]
    calculated_cost: Option<Decimal>,
    #[serde(default = "default_true")]
    is_applied: bool,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    editable: bool,
}

fn default_true() -> bool {
    true
}

impl From<CostItemRecord> for CostItem {
    fn from(r: CostItemRecord) -> Self {
        let mut item = CostItem {
            id: r.id,
            config_item_id: r.config_item_id,
            name: r.name,
            item_type: r.item_type,
            unit: r.unit,
            base_value: r.base_value,
            quantity: r.quantity,
            calculated_cost: Decimal::ZERO,
            is_applied: r.is_applied,
            is_default: r.is_default,
            editable: r.editable,
        };
        item.recalculate();
        item
    }
}

impl CostItem {
    /// Office overhead line seeded from a catalog entry, prorated over `months`.
    pub fn office_fixed(id: impl Into<String>, config: &OfficeCostConfigItem, months: u32) -> Self {
        let mut item = CostItem {
            id: id.into(),
            config_item_id: Some(config.id.clone()),
            name: config.name.clone(),
            item_type: CostItemType::OfficeFixed,
            unit: CostItemUnit::Monthly,
            base_value: config.monthly_base_value,
            quantity: Decimal::from(months),
            calculated_cost: Decimal::ZERO,
            is_applied: true,
            is_default: true,
            editable: false,
        };
        item.recalculate();
        item
    }

    /// A user-entered project-variable line.
    pub fn variable(
        id: impl Into<String>,
        name: impl Into<String>,
        base_value: Decimal,
        quantity: Decimal,
    ) -> Self {
        let mut item = CostItem {
            id: id.into(),
            config_item_id: None,
            name: name.into(),
            item_type: CostItemType::ProjectVariable,
            unit: CostItemUnit::Unit,
            base_value,
            quantity,
            calculated_cost: Decimal::ZERO,
            is_applied: true,
            is_default: false,
            editable: true,
        };
        item.recalculate();
        item
    }

    pub fn base_value(&self) -> Decimal {
        self.base_value
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn calculated_cost(&self) -> Decimal {
        self.calculated_cost
    }

    pub fn set_base_value(&mut self, value: Decimal) {
        self.base_value = value;
        self.recalculate();
    }

    pub fn set_quantity(&mut self, quantity: Decimal) {
        self.quantity = quantity;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.calculated_cost = self
            .base_value
            .checked_mul(self.quantity)
            .unwrap_or(Decimal::ZERO);
    }
}

/// One unit of work inside a stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStageItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_id: Option<MemberId>,
    /// Estimated hours; absent counts as zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
}

impl ProjectStageItem {
    pub fn hours_or_zero(&self) -> Decimal {
        self.hours.unwrap_or(Decimal::ZERO)
    }
}

/// An ordered group of work items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<ProjectStageItem>,
    /// View state only; never a cost input.
    #[serde(default)]
    pub is_collapsed: bool,
}

/// A named risk/complexity surcharge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFactorItem {
    pub id: String,
    pub name: String,
    /// Percentage of the direct cost, e.g. 10 for 10%.
    pub percentage: Decimal,
    #[serde(default)]
    pub is_applied: bool,
}

/// The four user-set percentages of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    pub profit_margin_percentage: Decimal,
    /// Applied as an uplift on top of profit, not as a discount.
    pub negotiation_margin_percentage: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    pub tax_percentage: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            profit_margin_percentage: Decimal::new(25, 0),
            negotiation_margin_percentage: Decimal::ZERO,
            discount_percentage: Decimal::ZERO,
            tax_percentage: Decimal::new(6, 0),
        }
    }
}

impl PricingPolicy {
    /// Copy with every negative percentage replaced by zero.
    pub fn sanitized(&self) -> Self {
        Self {
            profit_margin_percentage: input::non_negative(self.profit_margin_percentage),
            negotiation_margin_percentage: input::non_negative(self.negotiation_margin_percentage),
            discount_percentage: input::non_negative(self.discount_percentage),
            tax_percentage: input::non_negative(self.tax_percentage),
        }
    }
}

/// Every intermediate value of the cost-to-price waterfall, in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallTotals {
    /// Applied office costs prorated over the project duration.
    pub subtotal_office_fixed_costs_pro_rata: Decimal,
    /// Share of the office subtotal charged to this project.
    pub office_fixed_costs_contribution: Decimal,
    pub subtotal_project_variable_costs: Decimal,
    pub subtotal_team_costs: Decimal,
    pub subtotal_direct_costs: Decimal,
    pub total_complexity_value: Decimal,
    pub cost_with_complexity: Decimal,
    pub profit_value: Decimal,
    pub cost_plus_profit: Decimal,
    pub negotiation_value: Decimal,
    pub cost_plus_profit_and_negotiation: Decimal,
    pub discount_value: Decimal,
    pub final_value_before_tax: Decimal,
    pub tax_value: Decimal,
    /// The authoritative proposal price.
    pub final_proposed_value: Decimal,
}

/// A lead's saved cost simulation: inputs and computed outputs together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSimulation {
    pub id: String,
    pub lead_id: LeadId,
    pub project_duration_months: u32,
    pub simulated_office_fixed_costs: Vec<CostItem>,
    pub simulated_project_variable_costs: Vec<CostItem>,
    pub simulated_complexity_factors: Vec<ComplexityFactorItem>,
    #[serde(default)]
    pub detailed_stages: Vec<ProjectStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_style: Option<String>,
    #[serde(flatten)]
    pub policy: PricingPolicy,
    #[serde(flatten)]
    pub totals: WaterfallTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sales pipeline state of a lead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    ProposalSent,
    Negotiation,
    Won,
    Lost,
    Archived,
}

impl LeadStatus {
    /// Won and archived leads may not be converted into a project.
    pub fn can_convert(self) -> bool {
        !matches!(self, LeadStatus::Won | LeadStatus::Archived)
    }
}

/// How a lead reached the office.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Referral,
    Website,
    SocialMedia,
    Event,
    Other,
}

/// A business opportunity tracked in the CRM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub potential_client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    pub project_description: String,
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LeadSource>,
    /// Final price of the current simulation, kept for list sorting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_simulation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<MemberId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer of the office.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// CPF or CNPJ.
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    Residential,
    Commercial,
    Interior,
    Consultancy,
    Report,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    Ongoing,
    Completed,
    OnHold,
    Canceled,
}

/// A delivery project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub address: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: ProjectStatus,
    #[serde(default)]
    pub notes: String,
    pub total_value: Decimal,
    #[serde(default)]
    pub paid_value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_style: Option<String>,
    #[serde(default)]
    pub detailed_stages: Vec<ProjectStage>,
    /// Lead this project was converted from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_lead_id: Option<LeadId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Office overhead entry of the configuration catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeCostConfigItem {
    pub id: String,
    pub name: String,
    pub monthly_base_value: Decimal,
    #[serde(default)]
    pub status: ArchiveStatus,
}

/// Team member entry of the configuration catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberConfigItem {
    pub id: MemberId,
    pub name: String,
    pub role: String,
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub status: ArchiveStatus,
}

/// A user of the tool who may also be staffed on stage items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub status: ArchiveStatus,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Project duration must be at least one month.
    #[error("project duration must be at least 1 month, got {0}")]
    DurationTooShort(u32),
    /// Percentages must be non-negative.
    #[error("{0} must not be negative")]
    NegativePercentage(&'static str),
    /// Price or cost must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Hours must be non-negative.
    #[error("negative hour estimate on item {0}")]
    NegativeHours(String),
    /// A required text field is blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Validate the four policy percentages.
pub fn validate_policy(p: &PricingPolicy) -> Result<(), ValidationError> {
    let fields = [
        ("profit margin", p.profit_margin_percentage),
        ("negotiation margin", p.negotiation_margin_percentage),
        ("discount", p.discount_percentage),
        ("tax", p.tax_percentage),
    ];
    for (name, value) in fields {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativePercentage(name));
        }
    }
    Ok(())
}

/// Validate a priced line.
pub fn validate_cost_item(item: &CostItem) -> Result<(), ValidationError> {
    if item.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("cost item name"));
    }
    if item.base_value < Decimal::ZERO || item.quantity < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Validate a stage list.
pub fn validate_stages(stages: &[ProjectStage]) -> Result<(), ValidationError> {
    for stage in stages {
        for item in &stage.items {
            if item.hours_or_zero() < Decimal::ZERO {
                return Err(ValidationError::NegativeHours(item.id.clone()));
            }
        }
    }
    Ok(())
}

/// Validate a simulation before it is persisted.
pub fn validate_simulation(sim: &CostSimulation) -> Result<(), ValidationError> {
    if sim.lead_id.0.trim().is_empty() {
        return Err(ValidationError::EmptyField("lead id"));
    }
    if sim.project_duration_months < 1 {
        return Err(ValidationError::DurationTooShort(sim.project_duration_months));
    }
    validate_policy(&sim.policy)?;
    for item in sim
        .simulated_office_fixed_costs
        .iter()
        .chain(&sim.simulated_project_variable_costs)
    {
        validate_cost_item(item)?;
    }
    for f in &sim.simulated_complexity_factors {
        if f.percentage < Decimal::ZERO {
            return Err(ValidationError::NegativePercentage("complexity factor"));
        }
    }
    validate_stages(&sim.detailed_stages)
}

/// Validate a catalog office cost entry.
pub fn validate_office_cost_config(item: &OfficeCostConfigItem) -> Result<(), ValidationError> {
    if item.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("office cost name"));
    }
    if item.monthly_base_value < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Validate a catalog team member entry.
pub fn validate_team_member_config(item: &TeamMemberConfigItem) -> Result<(), ValidationError> {
    if item.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("team member name"));
    }
    if item.hourly_rate < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Round an amount for display with the office's single rounding rule.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for display, e.g. `BRL 1378.00`.
pub fn format_money(value: Decimal) -> String {
    format!("{} {:.2}", CURRENCY_CODE, round_money(value))
}
