//! Headline retention percentages folded from per-cohort results.

use crate::retention::CohortRetention;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct KeyMetric {
    pub label: String,
    /// One-decimal percentage, e.g. `"42.5%"`.
    pub value: String,
    pub description: String,
}

impl KeyMetric {
    fn new(label: &str, percentage: f64, description: &str) -> Self {
        Self {
            label: label.to_string(),
            value: format_percentage(percentage),
            description: description.to_string(),
        }
    }
}

/// Running totals over non-empty cohorts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetentionTotals {
    pub users: u64,
    pub day1: u64,
    pub day7: u64,
    pub day7_cohorts: u32,
    pub day30: u64,
    pub day30_cohorts: u32,
}

impl RetentionTotals {
    pub fn fold(cohorts: &[CohortRetention]) -> Self {
        cohorts
            .iter()
            .filter(|c| c.users > 0)
            .fold(Self::default(), |mut acc, c| {
                acc.users += c.users;
                acc.day1 += c.day1.unwrap_or(0);
                if let Some(day7) = c.day7 {
                    acc.day7 += day7;
                    acc.day7_cohorts += 1;
                }
                if let Some(day30) = c.day30 {
                    acc.day30 += day30;
                    acc.day30_cohorts += 1;
                }
                acc
            })
    }

    pub fn day1_retention(&self) -> f64 {
        if self.users == 0 {
            return 0.0;
        }
        percentage(self.day1, self.users)
    }

    /// Divides by every cohort member in the window, including members of
    /// cohorts whose day-7 horizon hasn't been reached yet.
    // TODO: decide with product whether the denominator should be limited to
    // cohorts with an observable day-7 horizon.
    pub fn day7_retention(&self) -> f64 {
        if self.day7_cohorts == 0 {
            return 0.0;
        }
        percentage(self.day7, self.users)
    }

    /// Same denominator as [`Self::day7_retention`].
    pub fn day30_retention(&self) -> f64 {
        if self.day30_cohorts == 0 {
            return 0.0;
        }
        percentage(self.day30, self.users)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64 * 100.0
}

/// One decimal, ties rounded up (`1.25` -> `"1.3%"`).
pub fn format_percentage(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    format!("{rounded:.1}%")
}

/// Day 1 / Day 7 / Day 30 headline metrics, in that order.
pub fn key_metrics(cohorts: &[CohortRetention]) -> Vec<KeyMetric> {
    let totals = RetentionTotals::fold(cohorts);
    vec![
        KeyMetric::new(
            "Day 1 Retention",
            totals.day1_retention(),
            "Users active on signup day",
        ),
        KeyMetric::new(
            "Day 7 Retention",
            totals.day7_retention(),
            "Coming back within 7 days",
        ),
        KeyMetric::new(
            "Day 30 Retention",
            totals.day30_retention(),
            "Active after 30 days",
        ),
    ]
}
