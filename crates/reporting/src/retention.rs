//! Cohort retention — for each trailing cohort, how many members were still
//! active at or after 1, 7, 14, and 30 days from the cohort's start.

use crate::cohort::{cohort_windows, CohortWindow, RetentionHorizon, RetentionRange};
use crate::summary::{key_metrics, KeyMetric};
use chrono::{DateTime, Local, TimeZone, Utc};
use nexus_core::{EventScope, NexusError, NexusResult};
use nexus_store::AnalyticsStore;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Which of the company's projects a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSelector {
    All,
    Project(Uuid),
}

impl ProjectSelector {
    /// `None`, empty, or `"all"` select every owned project.
    pub fn parse(raw: Option<&str>) -> NexusResult<Self> {
        match raw {
            None | Some("") | Some("all") => Ok(Self::All),
            Some(id) => Uuid::parse_str(id)
                .map(Self::Project)
                .map_err(|_| NexusError::InvalidInput(format!("invalid projectId: {id}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionQuery {
    pub company_id: Uuid,
    pub range: RetentionRange,
    pub project: ProjectSelector,
    /// `None` applies no environment filter.
    pub environment: Option<String>,
}

impl RetentionQuery {
    /// Build a query from raw request parameters.
    pub fn from_params(
        company_id: Uuid,
        range: Option<&str>,
        project_id: Option<&str>,
        environment: Option<&str>,
    ) -> NexusResult<Self> {
        let environment = match environment {
            None | Some("") | Some("all") => None,
            Some(env) => Some(env.to_string()),
        };
        Ok(Self {
            company_id,
            range: RetentionRange::parse(range),
            project: ProjectSelector::parse(project_id)?,
            environment,
        })
    }
}

/// Retention of one cohort. A horizon is `None` while it lies in the future;
/// `Some(0)` means it was reached and nobody returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CohortRetention {
    pub cohort: String,
    pub users: u64,
    pub day1: Option<u64>,
    pub day7: Option<u64>,
    pub day14: Option<u64>,
    pub day30: Option<u64>,
    #[serde(skip)]
    pub period_start: DateTime<Utc>,
    #[serde(skip)]
    pub period_end: DateTime<Utc>,
}

impl CohortRetention {
    /// Empty cohorts report zero at every horizon, never `None`.
    fn empty(window: CohortWindow) -> Self {
        Self {
            cohort: window.label,
            users: 0,
            day1: Some(0),
            day7: Some(0),
            day14: Some(0),
            day30: Some(0),
            period_start: window.start,
            period_end: window.end,
        }
    }

    pub fn horizon(&self, horizon: RetentionHorizon) -> Option<u64> {
        match horizon {
            RetentionHorizon::Day1 => self.day1,
            RetentionHorizon::Day7 => self.day7,
            RetentionHorizon::Day14 => self.day14,
            RetentionHorizon::Day30 => self.day30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    /// Most recent cohort first.
    pub cohorts: Vec<CohortRetention>,
    pub key_metrics: Vec<KeyMetric>,
}

/// Computes cohort retention against an injected analytics store.
pub struct RetentionCalculator {
    store: Arc<dyn AnalyticsStore>,
}

impl RetentionCalculator {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    /// Compute retention as of the server's local wall clock.
    pub async fn compute(&self, query: &RetentionQuery) -> NexusResult<RetentionReport> {
        self.compute_at(query, Local::now()).await
    }

    /// Compute retention as of `now`. Cohort boundaries are local midnights
    /// in `now`'s time zone; `now` is captured once and reused for every
    /// horizon comparison.
    pub fn compute_at<'a, Tz: TimeZone + 'a>(
        &'a self,
        query: &'a RetentionQuery,
        now: DateTime<Tz>,
    ) -> impl Future<Output = NexusResult<RetentionReport>> + Send + 'a {
        let windows = cohort_windows(query.range.granularity(), &now);
        let now = now.with_timezone(&Utc);
        self.evaluate(query, windows, now)
    }

    /// Restrict the query to projects owned by the company. A specific project
    /// the company doesn't own is rejected before any cohort lookup.
    pub async fn resolve_scope(&self, query: &RetentionQuery) -> NexusResult<EventScope> {
        let owned = self.store.company_projects(query.company_id).await?;
        let project_ids = match query.project {
            ProjectSelector::All => owned,
            ProjectSelector::Project(id) if owned.contains(&id) => vec![id],
            ProjectSelector::Project(id) => {
                warn!(company_id = %query.company_id, project_id = %id, "Project not owned by company");
                return Err(NexusError::AccessDenied);
            }
        };
        Ok(EventScope::new(project_ids, query.environment.clone()))
    }

    async fn evaluate(
        &self,
        query: &RetentionQuery,
        windows: Vec<CohortWindow>,
        now: DateTime<Utc>,
    ) -> NexusResult<RetentionReport> {
        let started = Instant::now();
        let scope = self.resolve_scope(query).await?;

        let mut cohorts = Vec::with_capacity(windows.len());
        for window in windows {
            cohorts.push(self.evaluate_cohort(&scope, window, now).await?);
        }
        let key_metrics = key_metrics(&cohorts);

        info!(
            company_id = %query.company_id,
            range = query.range.as_str(),
            projects = scope.project_ids.len(),
            cohorts = cohorts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retention computed"
        );
        Ok(RetentionReport {
            cohorts,
            key_metrics,
        })
    }

    async fn evaluate_cohort(
        &self,
        scope: &EventScope,
        window: CohortWindow,
        now: DateTime<Utc>,
    ) -> NexusResult<CohortRetention> {
        let mut user_ids = self
            .store
            .cohort_members(scope, window.start, window.end)
            .await?;
        let users = user_ids.len() as u64;
        if users == 0 {
            return Ok(CohortRetention::empty(window));
        }
        user_ids.sort_unstable();
        user_ids.dedup();

        let start = window.start;
        let (day1, day7, day14, day30) = tokio::try_join!(
            self.active_at(scope, &user_ids, start, RetentionHorizon::Day1, now),
            self.active_at(scope, &user_ids, start, RetentionHorizon::Day7, now),
            self.active_at(scope, &user_ids, start, RetentionHorizon::Day14, now),
            self.active_at(scope, &user_ids, start, RetentionHorizon::Day30, now),
        )?;

        debug!(cohort = %window.label, users, ?day1, ?day7, ?day14, ?day30, "Cohort evaluated");
        Ok(CohortRetention {
            cohort: window.label,
            users,
            day1,
            day7,
            day14,
            day30,
            period_start: window.start,
            period_end: window.end,
        })
    }

    /// Distinct members active at or after the horizon, or `None` while the
    /// horizon is still in the future.
    async fn active_at(
        &self,
        scope: &EventScope,
        user_ids: &[String],
        cohort_start: DateTime<Utc>,
        horizon: RetentionHorizon,
        now: DateTime<Utc>,
    ) -> NexusResult<Option<u64>> {
        if !horizon.is_observable(cohort_start, now) {
            return Ok(None);
        }
        let since = horizon.activity_start(cohort_start);
        let active = self.store.count_active_users(scope, user_ids, since).await?;
        Ok(Some(active))
    }
}
