//! The editable simulation of one lead.
//!
//! A draft either starts from the configuration catalog or from the lead's
//! saved simulation. Catalog rows are copied into the draft at seed time
//! and never re-synced, so later catalog edits cannot alter a stored
//! proposal.

use crate::ids::IdGen;
use crate::stages::{Confirmation, StagePlan};
use crate::waterfall::{compute_waterfall, prorate_office_items, TeamRates, WaterfallInputs};
use chrono::{DateTime, Utc};
use quote_core::{
    catalog, input, ComplexityFactorItem, CostItem, CostSimulation, LeadId, OfficeCostConfigItem,
    PricingPolicy, WaterfallTotals,
};
use rust_decimal::Decimal;

const NEW_VARIABLE_NAME: &str = "New variable cost";

/// A single editable field of a project-variable line.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableField {
    Name(String),
    BaseValue(Decimal),
    Quantity(Decimal),
}

#[derive(Clone, Debug, PartialEq)]
struct SavedIdentity {
    id: String,
    created_at: DateTime<Utc>,
}

/// In-memory simulation inputs; totals are derived on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationDraft {
    pub lead_id: LeadId,
    pub project_style: Option<String>,
    saved: Option<SavedIdentity>,
    duration_months: u32,
    office_fixed: Vec<CostItem>,
    variable: Vec<CostItem>,
    complexity: Vec<ComplexityFactorItem>,
    stages: StagePlan,
    policy: PricingPolicy,
}

impl SimulationDraft {
    /// Fresh draft for a lead without a saved simulation.
    ///
    /// Archived catalog entries are skipped. Office lines start applied and
    /// prorated over one month; complexity factors start inert.
    pub fn seed(
        lead_id: LeadId,
        office_catalog: &[OfficeCostConfigItem],
        policy: PricingPolicy,
        ids: &mut IdGen,
    ) -> Self {
        let duration_months = 1;
        let office_fixed = office_catalog
            .iter()
            .filter(|c| c.status.is_active())
            .map(|c| CostItem::office_fixed(ids.next_id("fixed"), c, duration_months))
            .collect();
        Self {
            lead_id,
            project_style: catalog::PROJECT_STYLES.first().map(|s| s.to_string()),
            saved: None,
            duration_months,
            office_fixed,
            variable: Vec::new(),
            complexity: catalog::default_complexity_factors(),
            stages: StagePlan::template(),
            policy: policy.sanitized(),
        }
    }

    /// Draft over a stored simulation, using its snapshots verbatim.
    pub fn from_saved(sim: &CostSimulation) -> Self {
        Self {
            lead_id: sim.lead_id.clone(),
            project_style: sim.project_style.clone(),
            saved: Some(SavedIdentity {
                id: sim.id.clone(),
                created_at: sim.created_at,
            }),
            duration_months: input::clamp_duration_months(sim.project_duration_months),
            office_fixed: sim.simulated_office_fixed_costs.clone(),
            variable: sim.simulated_project_variable_costs.clone(),
            complexity: sim.simulated_complexity_factors.clone(),
            stages: StagePlan::from(sim.detailed_stages.clone()),
            policy: sim.policy,
        }
    }

    /// Id of the stored simulation this draft edits, if any.
    pub fn saved_id(&self) -> Option<&str> {
        self.saved.as_ref().map(|s| s.id.as_str())
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    pub fn office_items(&self) -> &[CostItem] {
        &self.office_fixed
    }

    pub fn variable_items(&self) -> &[CostItem] {
        &self.variable
    }

    pub fn complexity_factors(&self) -> &[ComplexityFactorItem] {
        &self.complexity
    }

    pub fn stages(&self) -> &StagePlan {
        &self.stages
    }

    pub fn policy(&self) -> PricingPolicy {
        self.policy
    }

    /// Change the duration and re-prorate every monthly office line.
    pub fn set_duration_months(&mut self, months: u32) {
        self.duration_months = input::clamp_duration_months(months);
        self.office_fixed = prorate_office_items(&self.office_fixed, self.duration_months);
    }

    /// Flip `is_applied` on an office line. Returns false for an unknown id.
    pub fn toggle_office_item(&mut self, item_id: &str) -> bool {
        match self.office_fixed.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.is_applied = !item.is_applied;
                true
            }
            None => false,
        }
    }

    /// Change the base value of an editable office line.
    pub fn set_office_base_value(&mut self, item_id: &str, value: Decimal) -> bool {
        match self
            .office_fixed
            .iter_mut()
            .find(|i| i.id == item_id && i.editable)
        {
            Some(item) => {
                item.set_base_value(input::non_negative(value));
                true
            }
            None => false,
        }
    }

    /// Append a blank variable line and return its id.
    pub fn add_variable_item(&mut self, ids: &mut IdGen) -> String {
        let id = ids.next_id("var");
        self.variable.push(CostItem::variable(
            id.clone(),
            NEW_VARIABLE_NAME,
            Decimal::ZERO,
            Decimal::ONE,
        ));
        id
    }

    pub fn update_variable_item(&mut self, item_id: &str, field: VariableField) -> bool {
        let Some(item) = self.variable.iter_mut().find(|i| i.id == item_id) else {
            return false;
        };
        match field {
            VariableField::Name(name) => item.name = name,
            VariableField::BaseValue(v) => item.set_base_value(input::non_negative(v)),
            VariableField::Quantity(q) => item.set_quantity(input::non_negative(q)),
        }
        true
    }

    pub fn remove_variable_item(&mut self, item_id: &str, confirm: Confirmation) {
        if confirm == Confirmation::Confirmed {
            self.variable.retain(|i| i.id != item_id);
        }
    }

    pub fn toggle_complexity(&mut self, factor_id: &str) -> bool {
        match self.complexity.iter_mut().find(|f| f.id == factor_id) {
            Some(f) => {
                f.is_applied = !f.is_applied;
                true
            }
            None => false,
        }
    }

    pub fn set_complexity_percentage(&mut self, factor_id: &str, percentage: Decimal) -> bool {
        match self.complexity.iter_mut().find(|f| f.id == factor_id) {
            Some(f) => {
                f.percentage = input::non_negative(percentage);
                true
            }
            None => false,
        }
    }

    pub fn set_policy(&mut self, policy: PricingPolicy) {
        self.policy = policy.sanitized();
    }

    /// Apply a sequence of stage plan edits.
    pub fn edit_stages(&mut self, edit: impl FnOnce(StagePlan) -> StagePlan) {
        let plan = std::mem::take(&mut self.stages);
        self.stages = edit(plan);
    }

    pub fn set_project_style(&mut self, style: Option<String>) {
        self.project_style = style;
    }

    pub fn inputs<'a>(&'a self, rates: &'a TeamRates) -> WaterfallInputs<'a> {
        WaterfallInputs {
            duration_months: self.duration_months,
            office_fixed: &self.office_fixed,
            variable: &self.variable,
            stages: self.stages.stages(),
            complexity: &self.complexity,
            policy: self.policy,
            rates,
        }
    }

    pub fn totals(&self, rates: &TeamRates) -> WaterfallTotals {
        compute_waterfall(&self.inputs(rates))
    }

    /// Freeze inputs and computed totals into a storable record.
    ///
    /// A draft opened from a saved simulation keeps its id and creation time.
    pub fn into_simulation(
        self,
        rates: &TeamRates,
        ids: &mut IdGen,
        now: DateTime<Utc>,
    ) -> CostSimulation {
        let totals = self.totals(rates);
        let (id, created_at) = match self.saved {
            Some(saved) => (saved.id, saved.created_at),
            None => (ids.next_id("sim"), now),
        };
        CostSimulation {
            id,
            lead_id: self.lead_id,
            project_duration_months: self.duration_months,
            simulated_office_fixed_costs: prorate_office_items(
                &self.office_fixed,
                self.duration_months,
            ),
            simulated_project_variable_costs: self.variable,
            simulated_complexity_factors: self.complexity,
            detailed_stages: self.stages.into_stages(),
            project_style: self.project_style,
            policy: self.policy,
            totals,
            created_at,
            updated_at: now,
        }
    }
}
