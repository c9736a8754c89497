//! Turning a lead into a delivery project.

use crate::draft::SimulationDraft;
use crate::waterfall::TeamRates;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use quote_core::{
    Client, CostSimulation, Lead, LeadStatus, Project, ProjectStage, ProjectStatus, ProjectType,
};
use rust_decimal::Decimal;

const DAYS_PER_MONTH: i64 = 30;
const NAME_MAX_CHARS: usize = 50;
const UNKNOWN_ADDRESS: &str = "To be defined";

/// The parts of a simulation a new project inherits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionSource<'a> {
    pub final_proposed_value: Decimal,
    pub duration_months: u32,
    pub stages: &'a [ProjectStage],
    pub project_style: Option<&'a str>,
}

impl<'a> From<&'a CostSimulation> for ConversionSource<'a> {
    fn from(sim: &'a CostSimulation) -> Self {
        Self {
            final_proposed_value: sim.totals.final_proposed_value,
            duration_months: sim.project_duration_months,
            stages: &sim.detailed_stages,
            project_style: sim.project_style.as_deref(),
        }
    }
}

impl<'a> ConversionSource<'a> {
    /// Source from an unsaved draft, priced with the current rates.
    pub fn from_draft(draft: &'a SimulationDraft, rates: &TeamRates) -> Self {
        Self {
            final_proposed_value: draft.totals(rates).final_proposed_value,
            duration_months: draft.duration_months(),
            stages: draft.stages().stages(),
            project_style: draft.project_style.as_deref(),
        }
    }
}

/// Identity and clock values of a conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionStamp {
    pub project_id: String,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Build a project from a lead and mark the lead as won.
///
/// No check is made on the lead's current status; a second call yields a
/// second, independent project.
pub fn convert_lead(
    lead: &mut Lead,
    client: &Client,
    source: Option<ConversionSource<'_>>,
    stamp: ConversionStamp,
) -> Project {
    let total_value = source
        .map(|s| s.final_proposed_value)
        .or(lead.estimated_value)
        .unwrap_or(Decimal::ZERO);
    let months = source.map(|s| s.duration_months.max(1)).unwrap_or(1);
    let due_date = stamp
        .today
        .checked_add_signed(Duration::days(i64::from(months) * DAYS_PER_MONTH))
        .unwrap_or(stamp.today);

    let name: String = lead
        .project_description
        .chars()
        .take(NAME_MAX_CHARS)
        .collect();
    let name = if name.trim().is_empty() {
        format!("Project {}", client.name)
    } else {
        name
    };
    let address = if client.address.trim().is_empty() {
        UNKNOWN_ADDRESS.to_string()
    } else {
        client.address.clone()
    };
    let notes = format!(
        "Converted from CRM lead: {} - {}\n\n{}",
        lead.potential_client_name,
        lead.project_description,
        lead.notes.as_deref().unwrap_or("")
    );

    let project = Project {
        id: stamp.project_id,
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        name,
        project_type: ProjectType::Residential,
        address,
        start_date: stamp.today,
        due_date,
        status: ProjectStatus::Planning,
        notes,
        total_value,
        paid_value: Decimal::ZERO,
        project_style: source.and_then(|s| s.project_style).map(str::to_string),
        detailed_stages: source.map(|s| s.stages.to_vec()).unwrap_or_default(),
        source_lead_id: Some(lead.id.clone()),
        created_at: stamp.now,
        updated_at: stamp.now,
    };

    lead.status = LeadStatus::Won;
    lead.updated_at = stamp.now;
    project
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGen;
    use chrono::TimeZone;
    use quote_core::{catalog, LeadId, PricingPolicy};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
    }

    fn stamp(id: &str) -> ConversionStamp {
        ConversionStamp {
            project_id: id.to_string(),
            today: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            now: now(),
        }
    }

    fn lead() -> Lead {
        Lead {
            id: LeadId::new("lead-7"),
            potential_client_name: "Marina Alves".to_string(),
            contact_email: Some("marina@example.com".to_string()),
            contact_phone: None,
            project_description: "Beach house renovation".to_string(),
            status: LeadStatus::Negotiation,
            source: None,
            estimated_value: Some(Decimal::new(9000, 0)),
            next_action_date: None,
            notes: Some("Prefers natural materials".to_string()),
            cost_simulation_id: None,
            responsible_user_id: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn client() -> Client {
        Client {
            id: "client-1".to_string(),
            name: "Marina Alves".to_string(),
            email: "marina@example.com".to_string(),
            phone: String::new(),
            tax_id: String::new(),
            address: String::new(),
            notes: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn simulation() -> CostSimulation {
        let rates = TeamRates::from_configs(&catalog::default_team_members());
        let mut draft = SimulationDraft::seed(
            LeadId::new("lead-7"),
            &catalog::default_office_costs(),
            PricingPolicy::default(),
            &mut IdGen::seeded(2),
        );
        draft.set_duration_months(4);
        draft.set_project_style(Some("Luxury".to_string()));
        draft.into_simulation(&rates, &mut IdGen::seeded(2), now())
    }

    #[test]
    fn project_inherits_simulation() {
        let sim = simulation();
        let mut lead = lead();
        let project = convert_lead(&mut lead, &client(), Some((&sim).into()), stamp("proj-1"));
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.total_value, sim.totals.final_proposed_value);
        assert_eq!(project.due_date, NaiveDate::from_ymd_opt(2024, 9, 7).unwrap());
        assert_eq!(project.detailed_stages, sim.detailed_stages);
        assert_eq!(project.project_style.as_deref(), Some("Luxury"));
        assert_eq!(project.source_lead_id, Some(LeadId::new("lead-7")));
        assert_eq!(project.name, "Beach house renovation");
        assert_eq!(project.address, UNKNOWN_ADDRESS);
        assert_eq!(project.project_type, ProjectType::Residential);
        assert_eq!(project.paid_value, Decimal::ZERO);
        assert_eq!(
            project.notes,
            "Converted from CRM lead: Marina Alves - Beach house renovation\n\nPrefers natural materials"
        );
        assert_eq!(lead.status, LeadStatus::Won);
    }

    #[test]
    fn without_simulation_falls_back_to_estimate() {
        let mut lead = lead();
        let project = convert_lead(&mut lead, &client(), None, stamp("proj-1"));
        assert_eq!(project.total_value, Decimal::new(9000, 0));
        assert_eq!(project.due_date, NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
        assert!(project.detailed_stages.is_empty());
        assert!(project.project_style.is_none());

        let mut bare = self::lead();
        bare.estimated_value = None;
        let project = convert_lead(&mut bare, &client(), None, stamp("proj-2"));
        assert_eq!(project.total_value, Decimal::ZERO);
    }

    #[test]
    fn long_description_is_truncated_and_empty_one_named_after_client() {
        let mut lead = lead();
        lead.project_description = "x".repeat(80);
        let project = convert_lead(&mut lead, &client(), None, stamp("p"));
        assert_eq!(project.name.chars().count(), NAME_MAX_CHARS);

        let mut lead = self::lead();
        lead.project_description = String::new();
        let project = convert_lead(&mut lead, &client(), None, stamp("p"));
        assert_eq!(project.name, "Project Marina Alves");
    }

    #[test]
    fn client_address_is_used_when_known() {
        let mut c = client();
        c.address = "Rua das Flores, 12".to_string();
        let project = convert_lead(&mut lead(), &c, None, stamp("p"));
        assert_eq!(project.address, "Rua das Flores, 12");
        assert_eq!(project.client_id, "client-1");
    }

    #[test]
    fn converting_twice_yields_two_projects() {
        let sim = simulation();
        let mut lead = lead();
        let first = convert_lead(&mut lead, &client(), Some((&sim).into()), stamp("proj-a"));
        let second = convert_lead(&mut lead, &client(), Some((&sim).into()), stamp("proj-b"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.source_lead_id, second.source_lead_id);
        assert_eq!(lead.status, LeadStatus::Won);
    }

    #[test]
    fn conversion_does_not_guard_closed_leads() {
        let mut lead = lead();
        lead.status = LeadStatus::Archived;
        let project = convert_lead(&mut lead, &client(), None, stamp("p"));
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(lead.status, LeadStatus::Won);
    }

    #[test]
    fn unsaved_draft_can_be_converted() {
        let rates = TeamRates::from_configs(&catalog::default_team_members());
        let draft = SimulationDraft::seed(
            LeadId::new("lead-7"),
            &catalog::default_office_costs(),
            PricingPolicy::default(),
            &mut IdGen::seeded(4),
        );
        let source = ConversionSource::from_draft(&draft, &rates);
        assert_eq!(source.final_proposed_value, draft.totals(&rates).final_proposed_value);
        let project = convert_lead(&mut lead(), &client(), Some(source), stamp("p"));
        assert_eq!(project.detailed_stages.len(), 4);
        assert_eq!(project.project_style.as_deref(), Some("Standard"));
    }
}
