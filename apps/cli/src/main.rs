#![deny(warnings)]

//! Headless CLI for pricing leads and converting them into projects.

mod config;

use anyhow::{anyhow, bail, Result};
use config::CliConfig;
use persistence::SqliteStore;
use quote_core::{format_money, input, LeadId, WaterfallTotals};
use quote_pricing::{IdGen, VariableField};
use quote_runtime::{NewLead, QuoteDesk};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: quote [--config FILE] [--db URL] <command>

commands:
  init                                   insert the default catalog if empty
  catalog                                list office costs and team rates
  lead add --name N --description D [--email E] [--phone P] [--estimate V]
  leads                                  list leads
  simulate LEAD [--months N] [--profit P] [--negotiation P] [--discount P]
           [--tax P] [--complexity ID=P]... [--variable NAME=V]... [--save] [--json]
  convert LEAD                           convert a lead into a project
  delete-lead LEAD                       delete a lead and its simulation
  --version";

#[derive(Debug, Default, PartialEq)]
struct SimulateArgs {
    lead: Option<LeadId>,
    months: Option<u32>,
    profit: Option<Decimal>,
    negotiation: Option<Decimal>,
    discount: Option<Decimal>,
    tax: Option<Decimal>,
    complexity: Vec<(String, Decimal)>,
    variable: Vec<(String, Decimal)>,
    save: bool,
    json: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Init,
    Catalog,
    AddLead(NewLead),
    Leads,
    Simulate(SimulateArgs),
    Convert(LeadId),
    DeleteLead(LeadId),
    Version,
}

#[derive(Debug, PartialEq)]
struct Cli {
    config: Option<PathBuf>,
    db: Option<String>,
    command: Command,
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn pair(raw: &str) -> Result<(String, Decimal)> {
    let (key, amount) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {raw:?}"))?;
    Ok((key.trim().to_string(), input::parse_amount(amount)))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut config = None;
    let mut db = None;
    let mut positional = Vec::new();
    let mut rest = Vec::new();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(value(&mut it, "--config")?)),
            "--db" => db = Some(value(&mut it, "--db")?),
            "--version" | "-V" => positional.push("--version".to_string()),
            _ if positional.is_empty() || (positional.len() == 1 && positional[0] == "lead") => {
                positional.push(arg)
            }
            _ => {
                rest.push(arg);
                rest.extend(it.by_ref());
            }
        }
    }

    let command = match positional
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .as_slice()
    {
        ["--version", ..] => Command::Version,
        ["init"] => Command::Init,
        ["catalog"] => Command::Catalog,
        ["leads"] => Command::Leads,
        ["lead", "add"] => Command::AddLead(parse_new_lead(rest)?),
        ["simulate"] => Command::Simulate(parse_simulate(rest)?),
        ["convert"] => Command::Convert(single_lead(rest)?),
        ["delete-lead"] => Command::DeleteLead(single_lead(rest)?),
        _ => bail!("{USAGE}"),
    };
    Ok(Cli {
        config,
        db,
        command,
    })
}

fn single_lead(rest: Vec<String>) -> Result<LeadId> {
    match rest.as_slice() {
        [id] => Ok(LeadId::new(id.as_str())),
        _ => bail!("expected exactly one lead id"),
    }
}

fn parse_new_lead(rest: Vec<String>) -> Result<NewLead> {
    let mut lead = NewLead::default();
    let mut it = rest.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--name" => lead.potential_client_name = value(&mut it, "--name")?,
            "--description" => lead.project_description = value(&mut it, "--description")?,
            "--email" => lead.contact_email = Some(value(&mut it, "--email")?),
            "--phone" => lead.contact_phone = Some(value(&mut it, "--phone")?),
            "--notes" => lead.notes = Some(value(&mut it, "--notes")?),
            "--estimate" => {
                lead.estimated_value = Some(input::parse_amount(&value(&mut it, "--estimate")?))
            }
            other => bail!("unknown flag {other}"),
        }
    }
    if lead.potential_client_name.trim().is_empty() {
        bail!("--name is required");
    }
    Ok(lead)
}

fn parse_simulate(rest: Vec<String>) -> Result<SimulateArgs> {
    let mut sim = SimulateArgs::default();
    let mut it = rest.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--months" => {
                sim.months = Some(input::parse_duration_months(&value(&mut it, "--months")?))
            }
            "--profit" => sim.profit = Some(input::parse_percentage(&value(&mut it, "--profit")?)),
            "--negotiation" => {
                sim.negotiation = Some(input::parse_percentage(&value(&mut it, "--negotiation")?))
            }
            "--discount" => {
                sim.discount = Some(input::parse_percentage(&value(&mut it, "--discount")?))
            }
            "--tax" => sim.tax = Some(input::parse_percentage(&value(&mut it, "--tax")?)),
            "--complexity" => sim.complexity.push(pair(&value(&mut it, "--complexity")?)?),
            "--variable" => sim.variable.push(pair(&value(&mut it, "--variable")?)?),
            "--save" => sim.save = true,
            "--json" => sim.json = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            id if sim.lead.is_none() => sim.lead = Some(LeadId::new(id)),
            extra => bail!("unexpected argument {extra}"),
        }
    }
    if sim.lead.is_none() {
        bail!("simulate needs a lead id");
    }
    Ok(sim)
}

fn render_waterfall(t: &WaterfallTotals) -> String {
    let rows = [
        ("Office fixed costs (pro rata)", t.subtotal_office_fixed_costs_pro_rata),
        ("Office contribution (15%)", t.office_fixed_costs_contribution),
        ("Project variable costs", t.subtotal_project_variable_costs),
        ("Team costs", t.subtotal_team_costs),
        ("Direct costs", t.subtotal_direct_costs),
        ("Complexity", t.total_complexity_value),
        ("Cost with complexity", t.cost_with_complexity),
        ("Profit", t.profit_value),
        ("Cost + profit", t.cost_plus_profit),
        ("Negotiation margin", t.negotiation_value),
        ("Cost + profit + negotiation", t.cost_plus_profit_and_negotiation),
        ("Discount", t.discount_value),
        ("Value before tax", t.final_value_before_tax),
        ("Tax", t.tax_value),
        ("Final proposed value", t.final_proposed_value),
    ];
    rows.iter()
        .map(|(label, amount)| format!("{label:<30} {:>18}", format_money(*amount)))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn simulate(desk: &mut QuoteDesk<SqliteStore>, args: SimulateArgs) -> Result<()> {
    let lead_id = args
        .lead
        .ok_or_else(|| anyhow!("simulate needs a lead id"))?;
    desk.find_lead(&lead_id).await?;
    let mut draft = desk.open_simulation(&lead_id).await?;
    if let Some(months) = args.months {
        draft.set_duration_months(months);
    }
    let mut policy = draft.policy();
    if let Some(p) = args.profit {
        policy.profit_margin_percentage = p;
    }
    if let Some(p) = args.negotiation {
        policy.negotiation_margin_percentage = p;
    }
    if let Some(p) = args.discount {
        policy.discount_percentage = p;
    }
    if let Some(p) = args.tax {
        policy.tax_percentage = p;
    }
    draft.set_policy(policy);
    for (key, pct) in args.complexity {
        let id = if key.starts_with("complex-") {
            key
        } else {
            format!("complex-{key}")
        };
        let applied = draft
            .complexity_factors()
            .iter()
            .any(|f| f.id == id && f.is_applied);
        if !draft.set_complexity_percentage(&id, pct) {
            bail!("unknown complexity factor {id}");
        }
        if !applied {
            draft.toggle_complexity(&id);
        }
    }
    let mut ids = IdGen::from_entropy();
    for (name, amount) in args.variable {
        let id = draft.add_variable_item(&mut ids);
        draft.update_variable_item(&id, VariableField::Name(name));
        draft.update_variable_item(&id, VariableField::BaseValue(amount));
    }

    let totals = if args.save {
        let saved = desk.save_simulation(draft).await?;
        info!(simulation = %saved.id, "saved");
        saved.totals
    } else {
        let rates = desk.team_rates().await?;
        draft.totals(&rates)
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
    } else {
        println!("{}", render_waterfall(&totals));
    }
    Ok(())
}

async fn run(desk: &mut QuoteDesk<SqliteStore>, command: Command) -> Result<()> {
    match command {
        Command::Version => {}
        Command::Init => {
            if desk.bootstrap_catalog().await? {
                println!("Default catalog inserted");
            } else {
                println!("Catalog already present");
            }
        }
        Command::Catalog => {
            for item in desk.office_costs().await? {
                println!(
                    "office {:<32} {:<36} {:>14} {:?}",
                    item.id,
                    item.name,
                    format_money(item.monthly_base_value),
                    item.status
                );
            }
            for item in desk.team_member_configs().await? {
                println!(
                    "team   {:<32} {:<36} {:>14}/h {:?}",
                    item.id.0,
                    item.name,
                    format_money(item.hourly_rate),
                    item.status
                );
            }
        }
        Command::AddLead(new) => {
            let lead = desk.add_lead(new).await?;
            println!("{}", lead.id);
        }
        Command::Leads => {
            for lead in desk.leads().await? {
                println!(
                    "{:<24} {:<14} {:<28} {}",
                    lead.id,
                    format!("{:?}", lead.status),
                    lead.potential_client_name,
                    lead.estimated_value.map(format_money).unwrap_or_default()
                );
            }
        }
        Command::Simulate(args) => simulate(desk, args).await?,
        Command::Convert(lead_id) => {
            let lead = desk.find_lead(&lead_id).await?;
            let client = desk.resolve_client(&lead).await?;
            let project = desk.convert_lead(&lead_id, &client, None).await?;
            println!(
                "Project {} \"{}\" for {} | total {} | due {}",
                project.id,
                project.name,
                project.client_name,
                format_money(project.total_value),
                project.due_date
            );
        }
        Command::DeleteLead(lead_id) => {
            desk.delete_lead(&lead_id).await?;
            println!("Deleted {lead_id}");
        }
    }
    Ok(())
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.starts_with(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args(std::env::args().skip(1))?;
    if cli.command == Command::Version {
        println!(
            "quote {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let url = cli.db.clone().unwrap_or_else(|| cfg.database_url());
    ensure_parent_dir(&url)?;
    info!(%url, "opening database");
    let store = SqliteStore::connect(&url).await?;
    let mut desk =
        QuoteDesk::new(store, IdGen::from_entropy()).with_default_policy(cfg.default_policy());
    if cli.command != Command::Init {
        desk.bootstrap_catalog().await?;
    }
    run(&mut desk, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn global_flags_precede_command() {
        let cli = parse_args(args("--db sqlite::memory: --config q.yaml init")).unwrap();
        assert_eq!(cli.db.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.config, Some(PathBuf::from("q.yaml")));
        assert_eq!(cli.command, Command::Init);
    }

    #[test]
    fn lead_add_requires_name() {
        let cli = parse_args(args("lead add --name Ana --description House --estimate 9000,50"))
            .unwrap();
        match cli.command {
            Command::AddLead(new) => {
                assert_eq!(new.potential_client_name, "Ana");
                assert_eq!(new.estimated_value, Some(Decimal::new(900050, 2)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_args(args("lead add --description House")).is_err());
    }

    #[test]
    fn simulate_flags_are_coerced() {
        let cli = parse_args(args(
            "simulate lead-1 --months 0 --profit abc --tax 6 --complexity topography=10 --variable Plotting=500 --save",
        ))
        .unwrap();
        let Command::Simulate(sim) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim.lead, Some(LeadId::new("lead-1")));
        assert_eq!(sim.months, Some(1));
        assert_eq!(sim.profit, Some(Decimal::ZERO));
        assert_eq!(sim.tax, Some(Decimal::new(6, 0)));
        assert_eq!(
            sim.complexity,
            vec![("topography".to_string(), Decimal::new(10, 0))]
        );
        assert_eq!(
            sim.variable,
            vec![("Plotting".to_string(), Decimal::new(500, 0))]
        );
        assert!(sim.save);
        assert!(!sim.json);
    }

    #[test]
    fn bad_invocations_fail() {
        assert!(parse_args(args("")).is_err());
        assert!(parse_args(args("convert")).is_err());
        assert!(parse_args(args("simulate --save")).is_err());
        assert!(parse_args(args("simulate l1 --complexity nope")).is_err());
        assert!(parse_args(args("frobnicate")).is_err());
    }

    #[test]
    fn version_flag_wins() {
        assert_eq!(parse_args(args("--version")).unwrap().command, Command::Version);
    }

    #[test]
    fn waterfall_render_lists_every_step() {
        let totals = WaterfallTotals {
            final_proposed_value: Decimal::new(1378, 0),
            ..WaterfallTotals::default()
        };
        let text = render_waterfall(&totals);
        assert_eq!(text.lines().count(), 15);
        assert!(text.lines().last().unwrap().ends_with("BRL 1378.00"));
    }
}
