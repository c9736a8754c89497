//! Editing operations over a staged work plan.
//!
//! Every operation consumes the plan and returns the edited one, so callers
//! always hold a complete snapshot they can hand to the waterfall.

use crate::waterfall::{self, TeamRates};
use quote_core::{catalog, MemberId, ProjectStage, ProjectStageItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Explicit answer required by irreversible removals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// A single field of a stage item.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemField {
    Name(String),
    Responsible(Option<MemberId>),
    Hours(Option<Decimal>),
}

const NEW_ITEM_NAME: &str = "New project item";

/// Ordered stages, each holding ordered work items.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagePlan {
    stages: Vec<ProjectStage>,
}

impl From<Vec<ProjectStage>> for StagePlan {
    fn from(stages: Vec<ProjectStage>) -> Self {
        Self { stages }
    }
}

impl StagePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// The firm's default plan used for new simulations.
    pub fn template() -> Self {
        Self::from(catalog::default_stage_template())
    }

    pub fn stages(&self) -> &[ProjectStage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<ProjectStage> {
        self.stages
    }

    pub fn stage(&self, stage_id: &str) -> Option<&ProjectStage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn item_count(&self) -> usize {
        self.stages.iter().map(|s| s.items.len()).sum()
    }

    /// Append an expanded, empty stage named after its position.
    #[must_use]
    pub fn add_stage(mut self, stage_id: impl Into<String>) -> Self {
        let name = format!("Stage {}", self.stages.len() + 1);
        self.stages.push(ProjectStage {
            id: stage_id.into(),
            name,
            items: Vec::new(),
            is_collapsed: false,
        });
        self
    }

    #[must_use]
    pub fn rename_stage(mut self, stage_id: &str, name: impl Into<String>) -> Self {
        if let Some(stage) = self.stage_mut(stage_id) {
            stage.name = name.into();
        }
        self
    }

    #[must_use]
    pub fn toggle_stage_collapsed(mut self, stage_id: &str) -> Self {
        if let Some(stage) = self.stage_mut(stage_id) {
            stage.is_collapsed = !stage.is_collapsed;
        }
        self
    }

    /// Remove a stage and all its items.
    #[must_use]
    pub fn remove_stage(mut self, stage_id: &str, confirm: Confirmation) -> Self {
        if confirm == Confirmation::Confirmed {
            self.stages.retain(|s| s.id != stage_id);
        }
        self
    }

    /// Append a blank item: default name, zero hours, nobody responsible.
    #[must_use]
    pub fn add_item(mut self, stage_id: &str, item_id: impl Into<String>) -> Self {
        if let Some(stage) = self.stage_mut(stage_id) {
            stage.items.push(ProjectStageItem {
                id: item_id.into(),
                name: NEW_ITEM_NAME.to_string(),
                responsible_id: None,
                hours: Some(Decimal::ZERO),
            });
        }
        self
    }

    /// Copy an item under `new_id`, right after the original.
    #[must_use]
    pub fn duplicate_item(
        mut self,
        stage_id: &str,
        item_id: &str,
        new_id: impl Into<String>,
    ) -> Self {
        if let Some(stage) = self.stage_mut(stage_id) {
            if let Some(pos) = stage.items.iter().position(|i| i.id == item_id) {
                let mut copy = stage.items[pos].clone();
                copy.id = new_id.into();
                stage.items.insert(pos + 1, copy);
            }
        }
        self
    }

    #[must_use]
    pub fn update_item(mut self, stage_id: &str, item_id: &str, field: ItemField) -> Self {
        let item = self
            .stage_mut(stage_id)
            .and_then(|s| s.items.iter_mut().find(|i| i.id == item_id));
        if let Some(item) = item {
            match field {
                ItemField::Name(name) => item.name = name,
                ItemField::Responsible(member) => item.responsible_id = member,
                ItemField::Hours(hours) => item.hours = hours,
            }
        }
        self
    }

    #[must_use]
    pub fn remove_item(mut self, stage_id: &str, item_id: &str, confirm: Confirmation) -> Self {
        if confirm == Confirmation::Declined {
            return self;
        }
        if let Some(stage) = self.stage_mut(stage_id) {
            stage.items.retain(|i| i.id != item_id);
        }
        self
    }

    /// Cost of one stage, or zero for an unknown id.
    pub fn stage_cost(&self, stage_id: &str, rates: &TeamRates) -> Decimal {
        self.stage(stage_id)
            .map(|s| waterfall::stage_cost(s, rates))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_cost(&self, rates: &TeamRates) -> Decimal {
        waterfall::team_cost(&self.stages, rates)
    }

    fn stage_mut(&mut self, stage_id: &str) -> Option<&mut ProjectStage> {
        self.stages.iter_mut().find(|s| s.id == stage_id)
    }
}
