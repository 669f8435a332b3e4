//! ClickHouse-backed analytics store.
//! Projects, tracked users, and events live in three MergeTree tables;
//! distinct-user counting is pushed down as `uniqExact`.

use crate::AnalyticsStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use nexus_core::config::ClickHouseConfig;
use nexus_core::{EventScope, NexusError, NexusResult};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Row, Deserialize)]
struct ProjectRow {
    id: String,
}

#[derive(Debug, Row, Deserialize)]
struct MemberRow {
    external_user_id: String,
}

#[derive(Debug, Row, Deserialize)]
struct CountRow {
    active: u64,
}

/// Read-only ClickHouse store. The client pools HTTP connections internally,
/// so one handle is shared by every request.
pub struct ClickHouseStore {
    client: Client,
}

impl ClickHouseStore {
    pub fn new(config: &ClickHouseConfig) -> Self {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        if let Some(user) = &config.user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.password {
            client = client.with_password(password);
        }
        Self { client }
    }

    /// Connect and create the analytics tables if they don't exist.
    pub async fn connect(config: &ClickHouseConfig) -> NexusResult<Self> {
        let store = Self::new(config);
        store.ensure_schema().await?;
        info!(url = %config.url, database = %config.database, "ClickHouse store ready");
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> NexusResult<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS projects (
                id String,
                company_id String,
                name String
            ) ENGINE = ReplacingMergeTree()
            ORDER BY (company_id, id)",
            "CREATE TABLE IF NOT EXISTS tracked_users (
                external_user_id String,
                project_id String,
                environment LowCardinality(String),
                first_seen DateTime64(3)
            ) ENGINE = ReplacingMergeTree()
            ORDER BY (project_id, environment, external_user_id)",
            "CREATE TABLE IF NOT EXISTS events (
                project_id String,
                environment LowCardinality(String),
                user_id String,
                event_name String,
                timestamp DateTime64(3)
            ) ENGINE = MergeTree()
            ORDER BY (project_id, environment, timestamp)
            PARTITION BY toYYYYMM(timestamp)",
        ];

        for statement in statements {
            self.client
                .query(statement)
                .execute()
                .await
                .map_err(store_error)?;
        }

        info!("ClickHouse schema verified");
        Ok(())
    }
}

fn store_error(e: clickhouse::error::Error) -> NexusError {
    NexusError::Store(e.to_string())
}

fn project_ids(scope: &EventScope) -> Vec<String> {
    scope.project_ids.iter().map(Uuid::to_string).collect()
}

fn environment_clause(scope: &EventScope) -> &'static str {
    if scope.environment.is_some() {
        " AND environment = ?"
    } else {
        ""
    }
}

fn members_sql(scope: &EventScope) -> String {
    format!(
        "SELECT external_user_id FROM tracked_users \
         WHERE has(?, project_id){} \
         AND first_seen >= fromUnixTimestamp64Milli(toInt64(?)) \
         AND first_seen < fromUnixTimestamp64Milli(toInt64(?))",
        environment_clause(scope)
    )
}

fn active_users_sql(scope: &EventScope) -> String {
    format!(
        "SELECT uniqExact(user_id) AS active FROM events \
         WHERE has(?, project_id){} \
         AND has(?, user_id) \
         AND timestamp >= fromUnixTimestamp64Milli(toInt64(?))",
        environment_clause(scope)
    )
}

#[async_trait]
impl AnalyticsStore for ClickHouseStore {
    async fn company_projects(&self, company_id: Uuid) -> NexusResult<Vec<Uuid>> {
        let rows = self
            .client
            .query("SELECT DISTINCT id FROM projects WHERE company_id = ?")
            .bind(company_id.to_string())
            .fetch_all::<ProjectRow>()
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.id)
                    .map_err(|e| NexusError::Store(format!("malformed project id {}: {e}", row.id)))
            })
            .collect()
    }

    async fn cohort_members(
        &self,
        scope: &EventScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> NexusResult<Vec<String>> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let sql = members_sql(scope);
        let mut query = self.client.query(&sql).bind(project_ids(scope));
        if let Some(environment) = &scope.environment {
            query = query.bind(environment.as_str());
        }
        let rows = query
            .bind(start.timestamp_millis())
            .bind(end.timestamp_millis())
            .fetch_all::<MemberRow>()
            .await
            .map_err(store_error)?;

        debug!(count = rows.len(), %start, %end, "Cohort members resolved");
        Ok(rows.into_iter().map(|r| r.external_user_id).collect())
    }

    async fn count_active_users(
        &self,
        scope: &EventScope,
        user_ids: &[String],
        since: DateTime<Utc>,
    ) -> NexusResult<u64> {
        if scope.is_empty() || user_ids.is_empty() {
            return Ok(0);
        }

        let sql = active_users_sql(scope);
        let mut query = self.client.query(&sql).bind(project_ids(scope));
        if let Some(environment) = &scope.environment {
            query = query.bind(environment.as_str());
        }
        let row = query
            .bind(user_ids)
            .bind(since.timestamp_millis())
            .fetch_one::<CountRow>()
            .await
            .map_err(store_error)?;

        Ok(row.active)
    }
}
