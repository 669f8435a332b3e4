//! In-process analytics store backed by DashMap.
//!
//! Used for development, demos, and tests. Rows are partitioned by project so
//! scope filtering only touches the projects a request may see.

use crate::AnalyticsStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use nexus_core::{Event, EventScope, NexusResult, Project, TrackedUser};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Seed data accepted by [`MemoryStore::load_fixture`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tracked_users: Vec<TrackedUser>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Thread-safe in-memory store for projects, tracked users, and events.
pub struct MemoryStore {
    projects: DashMap<Uuid, Project>,
    tracked_users: DashMap<Uuid, Vec<TrackedUser>>,
    events: DashMap<Uuid, Vec<Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            tracked_users: DashMap::new(),
            events: DashMap::new(),
        }
    }

    /// Build a store from a JSON fixture file.
    pub fn from_fixture(path: impl AsRef<Path>) -> NexusResult<Self> {
        let store = Self::new();
        store.load_fixture(path)?;
        Ok(store)
    }

    /// Load a JSON fixture of the form `{ projects, trackedUsers, events }`.
    pub fn load_fixture(&self, path: impl AsRef<Path>) -> NexusResult<()> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        let (projects, users, events) = (
            fixture.projects.len(),
            fixture.tracked_users.len(),
            fixture.events.len(),
        );
        self.apply(fixture);
        info!(
            path = %path.display(),
            projects,
            tracked_users = users,
            events,
            "Memory store fixture loaded"
        );
        Ok(())
    }

    pub fn apply(&self, fixture: Fixture) {
        for project in fixture.projects {
            self.insert_project(project);
        }
        for user in fixture.tracked_users {
            self.insert_tracked_user(user);
        }
        for event in fixture.events {
            self.record_event(event);
        }
    }

    pub fn insert_project(&self, project: Project) {
        self.projects.insert(project.id, project);
    }

    /// Register a tracked user. Returns `false` when the user was already
    /// known for that project/environment; the original first-seen is kept.
    pub fn insert_tracked_user(&self, user: TrackedUser) -> bool {
        let mut users = self.tracked_users.entry(user.project_id).or_default();
        let exists = users.iter().any(|u| {
            u.external_user_id == user.external_user_id && u.environment == user.environment
        });
        if exists {
            return false;
        }
        users.push(user);
        true
    }

    pub fn record_event(&self, event: Event) {
        self.events.entry(event.project_id).or_default().push(event);
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.iter().map(|e| e.value().len()).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn company_projects(&self, company_id: Uuid) -> NexusResult<Vec<Uuid>> {
        Ok(self
            .projects
            .iter()
            .filter(|p| p.company_id == company_id)
            .map(|p| p.id)
            .collect())
    }

    async fn cohort_members(
        &self,
        scope: &EventScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> NexusResult<Vec<String>> {
        let mut members = Vec::new();
        for project_id in &scope.project_ids {
            let Some(users) = self.tracked_users.get(project_id) else {
                continue;
            };
            members.extend(
                users
                    .iter()
                    .filter(|u| scope.matches(&u.project_id, &u.environment))
                    .filter(|u| u.first_seen >= start && u.first_seen < end)
                    .map(|u| u.external_user_id.clone()),
            );
        }
        debug!(count = members.len(), %start, %end, "Cohort members resolved");
        Ok(members)
    }

    async fn count_active_users(
        &self,
        scope: &EventScope,
        user_ids: &[String],
        since: DateTime<Utc>,
    ) -> NexusResult<u64> {
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        let guards: Vec<_> = scope
            .project_ids
            .iter()
            .filter_map(|project_id| self.events.get(project_id))
            .collect();
        let mut active: HashSet<&str> = HashSet::new();
        for events in &guards {
            for event in events.iter() {
                if event.timestamp >= since
                    && scope.matches(&event.project_id, &event.environment)
                    && wanted.contains(event.user_id.as_str())
                {
                    active.insert(event.user_id.as_str());
                }
            }
        }
        Ok(active.len() as u64)
    }
}
