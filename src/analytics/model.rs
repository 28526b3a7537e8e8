use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NO_STATUS: &str = "No Status";
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Weekly,
    Monthly,
    Quarterly,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            other => Err(format!(
                "unknown period '{}' (expected weekly, monthly or quarterly)",
                other
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One bucket of a distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

impl CategoryCount {
    /// Share of `item_count` in percent; `None` when there are no items
    pub fn percentage(&self, item_count: usize) -> Option<f64> {
        (item_count > 0).then(|| self.count as f64 / item_count as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityData {
    pub period: Period,
    #[serde(with = "crate::timestamp")]
    pub period_start: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub period_end: DateTime<Utc>,
    pub completed_items: usize,
    pub added_items: usize,
    /// `completed / (completed + added)`, 0 when both are 0
    pub closure_rate: f64,
    /// Mean days from creation to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_time_days: Option<f64>,
    /// Mean days from start date to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_time_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Inclusive day count between start and end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<i64>,
    pub milestone_count: usize,
    pub activity_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsInfo {
    pub project_id: String,
    pub title: String,
    pub item_count: usize,
    pub field_count: usize,
    pub view_count: usize,
    pub status_stats: Vec<CategoryCount>,
    pub assignee_stats: Vec<CategoryCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_data: Option<VelocityData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_data: Option<TimelineData>,
    #[serde(with = "crate::timestamp")]
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsInfo {
    /// Percentages for a distribution, in bucket order; `None` with no items
    pub fn percentages(&self, stats: &[CategoryCount]) -> Option<Vec<f64>> {
        if self.item_count == 0 {
            return None;
        }
        stats
            .iter()
            .map(|bucket| bucket.percentage(self.item_count))
            .collect()
    }
}
