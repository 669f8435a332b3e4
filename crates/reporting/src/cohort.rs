//! Cohort partitioning — trailing daily or weekly first-seen buckets and the
//! retention horizons measured against them.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Requested reporting range. Only decides the cohort granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionRange {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "all")]
    All,
}

impl RetentionRange {
    /// Permissive parse: a missing range means `30d`, an unrecognized one
    /// falls back to weekly cohorts rather than being rejected.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("30d") => Self::Last30Days,
            Some("24h") => Self::Last24Hours,
            Some("7d") => Self::Last7Days,
            Some("all") => Self::All,
            Some(other) => {
                debug!(range = other, "Unrecognized retention range, using weekly cohorts");
                Self::Last30Days
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::All => "all",
        }
    }

    pub fn granularity(&self) -> CohortGranularity {
        match self {
            Self::Last24Hours | Self::Last7Days => CohortGranularity::Daily,
            Self::Last30Days | Self::All => CohortGranularity::Weekly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortGranularity {
    Daily,
    Weekly,
}

impl CohortGranularity {
    /// Number of cohorts reported.
    pub fn periods(&self) -> u32 {
        match self {
            Self::Daily => 7,
            Self::Weekly => 4,
        }
    }

    fn span_days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
        }
    }
}

/// A cohort bucket: users first seen in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortWindow {
    /// 0 is the most recent bucket.
    pub index: u32,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Build the trailing cohort buckets, most recent first.
///
/// Boundaries are local midnights in `now`'s time zone. Daily bucket `i`
/// covers calendar day `today - i`; weekly bucket `i` covers
/// `[today - 7(i+1), today - 7i)`, so the current week-to-date is excluded.
pub fn cohort_windows<Tz: TimeZone>(
    granularity: CohortGranularity,
    now: &DateTime<Tz>,
) -> Vec<CohortWindow> {
    let tz = now.timezone();
    let today = now.date_naive();
    let span = granularity.span_days();

    (0..granularity.periods())
        .map(|index| {
            let offset = i64::from(index);
            let (first_day, end_day) = match granularity {
                CohortGranularity::Daily => {
                    let day = today - Duration::days(offset);
                    (day, day + Duration::days(1))
                }
                CohortGranularity::Weekly => (
                    today - Duration::days((offset + 1) * span),
                    today - Duration::days(offset * span),
                ),
            };
            let label = match granularity {
                CohortGranularity::Daily => short_date(first_day),
                CohortGranularity::Weekly => format!("Week of {}", short_date(first_day)),
            };
            CohortWindow {
                index,
                label,
                start: start_of_day(&tz, first_day),
                end: start_of_day(&tz, end_day),
            }
        })
        .collect()
}

/// "Mar 8" style label.
fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// First instant of `date` in `tz`. When a DST shift skips midnight, the
/// first valid local time after it is used.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Offset from a cohort's start at which retention is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionHorizon {
    Day1,
    Day7,
    Day14,
    Day30,
}

impl RetentionHorizon {
    pub const ALL: [RetentionHorizon; 4] = [Self::Day1, Self::Day7, Self::Day14, Self::Day30];

    pub fn days(&self) -> i64 {
        match self {
            Self::Day1 => 1,
            Self::Day7 => 7,
            Self::Day14 => 14,
            Self::Day30 => 30,
        }
    }

    /// `cohort_start + days * 86400s`. Not calendar-aware.
    pub fn activity_start(&self, cohort_start: DateTime<Utc>) -> DateTime<Utc> {
        cohort_start + Duration::seconds(self.days() * 86_400)
    }

    /// A horizon is observable once its activity start is not in the future.
    pub fn is_observable(&self, cohort_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.activity_start(cohort_start) <= now
    }
}
