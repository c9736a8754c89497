//! The quote desk: store-backed operations on leads and their simulations.

use crate::clients::{client_from_lead, find_matching_client};
use chrono::{DateTime, Utc};
use persistence::Store;
use quote_core::{
    catalog, validate_office_cost_config, validate_simulation, validate_team_member_config,
    Client, CostSimulation, Lead, LeadId, LeadSource, LeadStatus, MemberId, OfficeCostConfigItem,
    PricingPolicy, Project, TeamMemberConfigItem, ValidationError,
};
use quote_pricing::{
    convert_lead, ConversionSource, ConversionStamp, IdGen, SimulationDraft, TeamRates,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by desk operations.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),
    /// Won and archived leads cannot be converted again.
    #[error("lead {id} cannot be converted while {status:?}")]
    LeadNotConvertible { id: LeadId, status: LeadStatus },
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),
    /// The store rejected an operation; not retried.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Fields supplied when registering a lead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewLead {
    pub potential_client_name: String,
    pub project_description: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub source: Option<LeadSource>,
    pub estimated_value: Option<Decimal>,
    pub notes: Option<String>,
}

/// Store-backed front for the pricing engine.
pub struct QuoteDesk<S: Store> {
    store: S,
    ids: IdGen,
    default_policy: PricingPolicy,
    clock: fn() -> DateTime<Utc>,
}

impl<S: Store> QuoteDesk<S> {
    pub fn new(store: S, ids: IdGen) -> Self {
        Self {
            store,
            ids,
            default_policy: PricingPolicy::default(),
            clock: Utc::now,
        }
    }

    /// Policy used to seed simulations of leads without one.
    pub fn with_default_policy(mut self, policy: PricingPolicy) -> Self {
        self.default_policy = policy.sanitized();
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Insert the default office and team catalogs into whichever of the two
    /// tables has no rows at all. Archived rows count as rows.
    pub async fn bootstrap_catalog(&self) -> Result<bool, DeskError> {
        let mut seeded = false;
        if self.store.list_office_costs().await?.is_empty() {
            for item in catalog::default_office_costs() {
                self.store.create_office_cost(&item).await?;
            }
            seeded = true;
        }
        if self.store.list_team_member_configs().await?.is_empty() {
            for item in catalog::default_team_members() {
                self.store.create_team_member_config(&item).await?;
            }
            seeded = true;
        }
        if seeded {
            info!("default catalog inserted");
        }
        Ok(seeded)
    }

    /// Current hourly rates: every catalog entry, then users with a rate.
    pub async fn team_rates(&self) -> Result<TeamRates, DeskError> {
        let mut rates = TeamRates::from_configs(&self.store.list_team_member_configs().await?);
        rates.fill_from_members(&self.store.list_users().await?);
        Ok(rates)
    }

    pub async fn add_lead(&mut self, new: NewLead) -> Result<Lead, DeskError> {
        let now = self.now();
        let lead = Lead {
            id: LeadId::new(self.ids.next_id("lead")),
            potential_client_name: new.potential_client_name,
            contact_email: new.contact_email,
            contact_phone: new.contact_phone,
            project_description: new.project_description,
            status: LeadStatus::New,
            source: new.source,
            estimated_value: new.estimated_value,
            next_action_date: None,
            notes: new.notes,
            cost_simulation_id: None,
            responsible_user_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_lead(&lead).await?;
        info!(lead = %lead.id, "lead added");
        Ok(lead)
    }

    pub async fn leads(&self) -> Result<Vec<Lead>, DeskError> {
        Ok(self.store.list_leads().await?)
    }

    pub async fn find_lead(&self, lead_id: &LeadId) -> Result<Lead, DeskError> {
        self.store
            .list_leads()
            .await?
            .into_iter()
            .find(|l| &l.id == lead_id)
            .ok_or_else(|| DeskError::LeadNotFound(lead_id.clone()))
    }

    /// The lead's stored simulation, if it has one.
    pub async fn simulation_for(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<CostSimulation>, DeskError> {
        Ok(self
            .store
            .list_simulations()
            .await?
            .into_iter()
            .find(|s| &s.lead_id == lead_id))
    }

    /// Draft over the lead's saved simulation, or a fresh one seeded from
    /// the active catalog.
    pub async fn open_simulation(&mut self, lead_id: &LeadId) -> Result<SimulationDraft, DeskError> {
        if let Some(saved) = self.simulation_for(lead_id).await? {
            debug!(lead = %lead_id, simulation = %saved.id, "opening saved simulation");
            return Ok(SimulationDraft::from_saved(&saved));
        }
        let office = self.store.list_office_costs().await?;
        Ok(SimulationDraft::seed(
            lead_id.clone(),
            &office,
            self.default_policy,
            &mut self.ids,
        ))
    }

    /// Price, validate and store the draft, then point the lead at it.
    ///
    /// The stored record replaces any previous one with the same id. Returns
    /// the record as re-read from the store.
    pub async fn save_simulation(
        &mut self,
        draft: SimulationDraft,
    ) -> Result<CostSimulation, DeskError> {
        let mut lead = self.find_lead(&draft.lead_id).await?;
        let rates = self.team_rates().await?;
        let now = self.now();
        let sim = draft.into_simulation(&rates, &mut self.ids, now);
        validate_simulation(&sim)?;

        let exists = self
            .store
            .list_simulations()
            .await?
            .iter()
            .any(|s| s.id == sim.id);
        if exists {
            self.store.update_simulation(&sim).await?;
        } else {
            self.store.create_simulation(&sim).await?;
        }
        let stored = self
            .store
            .list_simulations()
            .await?
            .into_iter()
            .find(|s| s.id == sim.id)
            .ok_or_else(|| anyhow::anyhow!("simulation {} missing after save", sim.id))?;

        lead.estimated_value = Some(stored.totals.final_proposed_value);
        lead.cost_simulation_id = Some(stored.id.clone());
        lead.updated_at = now;
        self.store.update_lead(&lead).await?;
        info!(
            lead = %lead.id,
            simulation = %stored.id,
            final_value = %stored.totals.final_proposed_value,
            "simulation saved"
        );
        Ok(stored)
    }

    /// Existing client matching the lead, or a new one created from its
    /// contact fields.
    pub async fn resolve_client(&mut self, lead: &Lead) -> Result<Client, DeskError> {
        let clients = self.store.list_clients().await?;
        if let Some(found) = find_matching_client(lead, &clients) {
            return Ok(found.clone());
        }
        let client = client_from_lead(lead, self.ids.next_id("client"), self.now());
        self.store.create_client(&client).await?;
        info!(client = %client.id, lead = %lead.id, "client created from lead");
        Ok(client)
    }

    /// Convert a lead into a project and mark it won.
    ///
    /// Uses `draft` when given, else the lead's saved simulation, else only
    /// the lead's estimate.
    pub async fn convert_lead(
        &mut self,
        lead_id: &LeadId,
        client: &Client,
        draft: Option<&SimulationDraft>,
    ) -> Result<Project, DeskError> {
        let mut lead = self.find_lead(lead_id).await?;
        if !lead.status.can_convert() {
            return Err(DeskError::LeadNotConvertible {
                id: lead.id,
                status: lead.status,
            });
        }
        let rates = self.team_rates().await?;
        let saved = match draft {
            Some(_) => None,
            None => self.simulation_for(lead_id).await?,
        };
        let source = match (draft, &saved) {
            (Some(d), _) => Some(ConversionSource::from_draft(d, &rates)),
            (None, Some(s)) => Some(ConversionSource::from(s)),
            (None, None) => None,
        };
        let now = self.now();
        let stamp = ConversionStamp {
            project_id: self.ids.next_id("proj"),
            today: now.date_naive(),
            now,
        };
        let project = convert_lead(&mut lead, client, source, stamp);
        self.store.create_project(&project).await?;
        self.store.update_lead(&lead).await?;
        info!(lead = %lead.id, project = %project.id, "lead converted");
        Ok(project)
    }

    /// Delete a lead and every simulation it owns. Simulations go first so a
    /// failure never leaves one pointing at a missing lead.
    pub async fn delete_lead(&self, lead_id: &LeadId) -> Result<(), DeskError> {
        self.store.delete_simulations_by_lead(lead_id).await?;
        self.store.delete_lead(lead_id).await?;
        info!(lead = %lead_id, "lead deleted");
        Ok(())
    }

    pub async fn office_costs(&self) -> Result<Vec<OfficeCostConfigItem>, DeskError> {
        Ok(self.store.list_office_costs().await?)
    }

    pub async fn add_office_cost(
        &mut self,
        name: &str,
        monthly_base_value: Decimal,
    ) -> Result<OfficeCostConfigItem, DeskError> {
        let item = OfficeCostConfigItem {
            id: self.ids.next_id("config-fixed"),
            name: name.to_string(),
            monthly_base_value,
            status: Default::default(),
        };
        validate_office_cost_config(&item)?;
        self.store.create_office_cost(&item).await?;
        Ok(item)
    }

    pub async fn update_office_cost(&self, item: &OfficeCostConfigItem) -> Result<(), DeskError> {
        validate_office_cost_config(item)?;
        Ok(self.store.update_office_cost(item).await?)
    }

    pub async fn archive_office_cost(&self, id: &str) -> Result<(), DeskError> {
        Ok(self.store.archive_office_cost(id).await?)
    }

    pub async fn team_member_configs(&self) -> Result<Vec<TeamMemberConfigItem>, DeskError> {
        Ok(self.store.list_team_member_configs().await?)
    }

    pub async fn add_team_member_config(
        &mut self,
        name: &str,
        role: &str,
        hourly_rate: Decimal,
    ) -> Result<TeamMemberConfigItem, DeskError> {
        let item = TeamMemberConfigItem {
            id: MemberId::new(self.ids.next_id("member")),
            name: name.to_string(),
            role: role.to_string(),
            hourly_rate,
            status: Default::default(),
        };
        validate_team_member_config(&item)?;
        self.store.create_team_member_config(&item).await?;
        Ok(item)
    }

    pub async fn update_team_member_config(
        &self,
        item: &TeamMemberConfigItem,
    ) -> Result<(), DeskError> {
        validate_team_member_config(item)?;
        Ok(self.store.update_team_member_config(item).await?)
    }

    pub async fn archive_team_member_config(&self, id: &MemberId) -> Result<(), DeskError> {
        Ok(self.store.archive_team_member_config(id).await?)
    }
}
