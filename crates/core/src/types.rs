use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked project. Only used to scope which projects a company may query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub company_id: Uuid,
    #[serde(default)]
    pub name: String,
}

/// First sighting of an end user within a project/environment.
/// `first_seen` is set once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedUser {
    pub external_user_id: String,
    pub project_id: Uuid,
    pub environment: String,
    pub first_seen: DateTime<Utc>,
}

/// An entry in the append-only activity log. Any event counts as activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub project_id: Uuid,
    pub environment: String,
    pub user_id: String,
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Resolved project/environment filter applied to every membership and
/// activity lookup of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventScope {
    pub project_ids: Vec<Uuid>,
    /// `None` matches every environment.
    pub environment: Option<String>,
}

impl EventScope {
    pub fn new(project_ids: Vec<Uuid>, environment: Option<String>) -> Self {
        Self {
            project_ids,
            environment,
        }
    }

    pub fn matches(&self, project_id: &Uuid, environment: &str) -> bool {
        self.project_ids.contains(project_id)
            && self
                .environment
                .as_deref()
                .map_or(true, |env| env == environment)
    }

    pub fn is_empty(&self) -> bool {
        self.project_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_matches_environment() {
        let project = Uuid::new_v4();
        let scope = EventScope::new(vec![project], Some("production".into()));
        assert!(scope.matches(&project, "production"));
        assert!(!scope.matches(&project, "staging"));
        assert!(!scope.matches(&Uuid::new_v4(), "production"));

        let any_env = EventScope::new(vec![project], None);
        assert!(any_env.matches(&project, "staging"));
    }

    #[test]
    fn test_tracked_user_camel_case() {
        let json = serde_json::json!({
            "externalUserId": "u-1",
            "projectId": "4f8c2a5e-0b1d-4c3a-9e7f-1a2b3c4d5e6f",
            "environment": "production",
            "firstSeen": "2024-03-13T09:30:00Z"
        });
        let user: TrackedUser = serde_json::from_value(json).unwrap();
        assert_eq!(user.external_user_id, "u-1");
        assert_eq!(user.environment, "production");
    }
}
