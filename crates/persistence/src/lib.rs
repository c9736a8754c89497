#![deny(warnings)]

//! Persistence layer: the record store behind the quote engine.
//!
//! Configuration rows are kept in typed columns with money in integer
//! cents. CRM records and simulations are stored whole as JSON documents,
//! so a saved simulation always carries every waterfall figure it was
//! priced with. Writes are last-write-wins; there is no version column.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use quote_core::{
    ArchiveStatus, Client, CostSimulation, Lead, LeadId, MemberId, OfficeCostConfigItem, Project,
    TeamMember, TeamMemberConfigItem,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

/// Returns the default SQLite URL used for the local database.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./data/quotes.db"
}

/// Open (creating if needed) the database at `url` and run migrations.
///
/// In-memory databases get a single connection so every query sees the
/// same schema.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid sqlite url {url}"))?
        .create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().max_connections(5);
    if url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {url}"))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    debug!(url, "database ready");
    Ok(pool)
}

/// Convert an amount to integer cents, rounding half away from zero.
pub fn decimal_to_cents_i64(value: Decimal) -> Result<i64> {
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|c| c.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|c| c.to_i64())
        .ok_or_else(|| anyhow!("amount {value} does not fit in cents"))
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn status_str(status: ArchiveStatus) -> &'static str {
    match status {
        ArchiveStatus::Active => "ACTIVE",
        ArchiveStatus::Archived => "ARCHIVED",
    }
}

fn parse_status(raw: &str) -> Result<ArchiveStatus> {
    match raw {
        "ACTIVE" => Ok(ArchiveStatus::Active),
        "ARCHIVED" => Ok(ArchiveStatus::Archived),
        other => Err(anyhow!("unknown archive status {other:?}")),
    }
}

/// Record storage used by the quote desk.
///
/// Every failure is returned to the caller unchanged; nothing is retried.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_leads(&self) -> Result<Vec<Lead>>;
    async fn create_lead(&self, lead: &Lead) -> Result<()>;
    async fn update_lead(&self, lead: &Lead) -> Result<()>;
    async fn delete_lead(&self, id: &LeadId) -> Result<()>;

    async fn list_clients(&self) -> Result<Vec<Client>>;
    async fn create_client(&self, client: &Client) -> Result<()>;
    async fn update_client(&self, client: &Client) -> Result<()>;

    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn create_project(&self, project: &Project) -> Result<()>;
    async fn update_project(&self, project: &Project) -> Result<()>;

    async fn list_simulations(&self) -> Result<Vec<CostSimulation>>;
    async fn create_simulation(&self, sim: &CostSimulation) -> Result<()>;
    async fn update_simulation(&self, sim: &CostSimulation) -> Result<()>;
    /// Remove every simulation owned by `lead_id`.
    async fn delete_simulations_by_lead(&self, lead_id: &LeadId) -> Result<()>;

    async fn list_office_costs(&self) -> Result<Vec<OfficeCostConfigItem>>;
    async fn create_office_cost(&self, item: &OfficeCostConfigItem) -> Result<()>;
    async fn update_office_cost(&self, item: &OfficeCostConfigItem) -> Result<()>;
    async fn archive_office_cost(&self, id: &str) -> Result<()>;

    async fn list_team_member_configs(&self) -> Result<Vec<TeamMemberConfigItem>>;
    async fn create_team_member_config(&self, item: &TeamMemberConfigItem) -> Result<()>;
    async fn update_team_member_config(&self, item: &TeamMemberConfigItem) -> Result<()>;
    async fn archive_team_member_config(&self, id: &MemberId) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<TeamMember>>;
    async fn create_user(&self, user: &TeamMember) -> Result<()>;
    async fn update_user(&self, user: &TeamMember) -> Result<()>;
    async fn archive_user(&self, id: &MemberId) -> Result<()>;
}

/// [`Store`] over a SQLite pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(init_db(url).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn list_docs<T: DeserializeOwned>(&self, table: &'static str) -> Result<Vec<T>> {
        let sql = format!("SELECT data FROM {table} ORDER BY seq");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("listing {table}"))?;
        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                serde_json::from_str(&data).with_context(|| format!("decoding {table} record"))
            })
            .collect()
    }

    async fn insert_doc<T: Serialize + Sync>(
        &self,
        table: &'static str,
        id: &str,
        doc: &T,
    ) -> Result<()> {
        let data = serde_json::to_string(doc)?;
        let sql = format!("INSERT INTO {table} (id, data) VALUES (?, ?)");
        sqlx::query(&sql)
            .bind(id)
            .bind(data)
            .execute(&self.pool)
            .await
            .with_context(|| format!("inserting {id} into {table}"))?;
        Ok(())
    }

    async fn update_doc<T: Serialize + Sync>(
        &self,
        table: &'static str,
        id: &str,
        doc: &T,
    ) -> Result<()> {
        let data = serde_json::to_string(doc)?;
        let sql = format!("UPDATE {table} SET data = ? WHERE id = ?");
        let done = sqlx::query(&sql)
            .bind(data)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating {id} in {table}"))?;
        if done.rows_affected() == 0 {
            bail!("{table} record {id} not found");
        }
        Ok(())
    }

    async fn archive_row(&self, table: &'static str, id: &str) -> Result<()> {
        let sql = format!("UPDATE {table} SET status = ? WHERE id = ?");
        let done = sqlx::query(&sql)
            .bind(status_str(ArchiveStatus::Archived))
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("archiving {id} in {table}"))?;
        if done.rows_affected() == 0 {
            bail!("{table} record {id} not found");
        }
        Ok(())
    }
}

fn office_cost_from_row(row: &SqliteRow) -> Result<OfficeCostConfigItem> {
    let status: String = row.try_get("status")?;
    Ok(OfficeCostConfigItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        monthly_base_value: cents_to_decimal(row.try_get("monthly_base_cents")?),
        status: parse_status(&status)?,
    })
}

fn team_member_config_from_row(row: &SqliteRow) -> Result<TeamMemberConfigItem> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(TeamMemberConfigItem {
        id: MemberId(id),
        name: row.try_get("name")?,
        role: row.try_get("role")?,
        hourly_rate: cents_to_decimal(row.try_get("hourly_rate_cents")?),
        status: parse_status(&status)?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<TeamMember> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let rate: Option<i64> = row.try_get("hourly_rate_cents")?;
    Ok(TeamMember {
        id: MemberId(id),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        hourly_rate: rate.map(cents_to_decimal),
        status: parse_status(&status)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_leads(&self) -> Result<Vec<Lead>> {
        self.list_docs("leads").await
    }

    async fn create_lead(&self, lead: &Lead) -> Result<()> {
        self.insert_doc("leads", &lead.id.0, lead).await
    }

    async fn update_lead(&self, lead: &Lead) -> Result<()> {
        self.update_doc("leads", &lead.id.0, lead).await
    }

    async fn delete_lead(&self, id: &LeadId) -> Result<()> {
        sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting lead {id}"))?;
        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.list_docs("clients").await
    }

    async fn create_client(&self, client: &Client) -> Result<()> {
        self.insert_doc("clients", &client.id, client).await
    }

    async fn update_client(&self, client: &Client) -> Result<()> {
        self.update_doc("clients", &client.id, client).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list_docs("projects").await
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.insert_doc("projects", &project.id, project).await
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        self.update_doc("projects", &project.id, project).await
    }

    async fn list_simulations(&self) -> Result<Vec<CostSimulation>> {
        self.list_docs("cost_simulations").await
    }

    async fn create_simulation(&self, sim: &CostSimulation) -> Result<()> {
        let data = serde_json::to_string(sim)?;
        sqlx::query("INSERT INTO cost_simulations (id, lead_id, data) VALUES (?, ?, ?)")
            .bind(&sim.id)
            .bind(&sim.lead_id.0)
            .bind(data)
            .execute(&self.pool)
            .await
            .with_context(|| format!("inserting simulation {}", sim.id))?;
        Ok(())
    }

    async fn update_simulation(&self, sim: &CostSimulation) -> Result<()> {
        let data = serde_json::to_string(sim)?;
        let done = sqlx::query("UPDATE cost_simulations SET lead_id = ?, data = ? WHERE id = ?")
            .bind(&sim.lead_id.0)
            .bind(data)
            .bind(&sim.id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating simulation {}", sim.id))?;
        if done.rows_affected() == 0 {
            bail!("simulation {} not found", sim.id);
        }
        Ok(())
    }

    async fn delete_simulations_by_lead(&self, lead_id: &LeadId) -> Result<()> {
        let done = sqlx::query("DELETE FROM cost_simulations WHERE lead_id = ?")
            .bind(&lead_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting simulations of lead {lead_id}"))?;
        debug!(lead = %lead_id, removed = done.rows_affected(), "simulations deleted");
        Ok(())
    }

    async fn list_office_costs(&self) -> Result<Vec<OfficeCostConfigItem>> {
        let rows = sqlx::query(
            "SELECT id, name, monthly_base_cents, status FROM office_cost_config ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing office costs")?;
        rows.iter().map(office_cost_from_row).collect()
    }

    async fn create_office_cost(&self, item: &OfficeCostConfigItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO office_cost_config (id, name, monthly_base_cents, status) VALUES (?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(decimal_to_cents_i64(item.monthly_base_value)?)
        .bind(status_str(item.status))
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting office cost {}", item.id))?;
        Ok(())
    }

    async fn update_office_cost(&self, item: &OfficeCostConfigItem) -> Result<()> {
        let done = sqlx::query(
            "UPDATE office_cost_config SET name = ?, monthly_base_cents = ?, status = ? WHERE id = ?",
        )
        .bind(&item.name)
        .bind(decimal_to_cents_i64(item.monthly_base_value)?)
        .bind(status_str(item.status))
        .bind(&item.id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("updating office cost {}", item.id))?;
        if done.rows_affected() == 0 {
            bail!("office cost {} not found", item.id);
        }
        Ok(())
    }

    async fn archive_office_cost(&self, id: &str) -> Result<()> {
        self.archive_row("office_cost_config", id).await
    }

    async fn list_team_member_configs(&self) -> Result<Vec<TeamMemberConfigItem>> {
        let rows = sqlx::query(
            "SELECT id, name, role, hourly_rate_cents, status FROM team_member_config ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing team member configs")?;
        rows.iter().map(team_member_config_from_row).collect()
    }

    async fn create_team_member_config(&self, item: &TeamMemberConfigItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO team_member_config (id, name, role, hourly_rate_cents, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&item.id.0)
        .bind(&item.name)
        .bind(&item.role)
        .bind(decimal_to_cents_i64(item.hourly_rate)?)
        .bind(status_str(item.status))
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting team member config {}", item.id.0))?;
        Ok(())
    }

    async fn update_team_member_config(&self, item: &TeamMemberConfigItem) -> Result<()> {
        let done = sqlx::query(
            "UPDATE team_member_config SET name = ?, role = ?, hourly_rate_cents = ?, status = ? WHERE id = ?",
        )
        .bind(&item.name)
        .bind(&item.role)
        .bind(decimal_to_cents_i64(item.hourly_rate)?)
        .bind(status_str(item.status))
        .bind(&item.id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("updating team member config {}", item.id.0))?;
        if done.rows_affected() == 0 {
            bail!("team member config {} not found", item.id.0);
        }
        Ok(())
    }

    async fn archive_team_member_config(&self, id: &MemberId) -> Result<()> {
        self.archive_row("team_member_config", &id.0).await
    }

    async fn list_users(&self) -> Result<Vec<TeamMember>> {
        let rows = sqlx::query(
            "SELECT id, name, email, role, hourly_rate_cents, status FROM users ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing users")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn create_user(&self, user: &TeamMember) -> Result<()> {
        let rate = user.hourly_rate.map(decimal_to_cents_i64).transpose()?;
        sqlx::query(
            "INSERT INTO users (id, name, email, role, hourly_rate_cents, status) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(rate)
        .bind(status_str(user.status))
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting user {}", user.id.0))?;
        Ok(())
    }

    async fn update_user(&self, user: &TeamMember) -> Result<()> {
        let rate = user.hourly_rate.map(decimal_to_cents_i64).transpose()?;
        let done = sqlx::query(
            "UPDATE users SET name = ?, email = ?, role = ?, hourly_rate_cents = ?, status = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(rate)
        .bind(status_str(user.status))
        .bind(&user.id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("updating user {}", user.id.0))?;
        if done.rows_affected() == 0 {
            bail!("user {} not found", user.id.0);
        }
        Ok(())
    }

    async fn archive_user(&self, id: &MemberId) -> Result<()> {
        self.archive_row("users", &id.0).await
    }
}
