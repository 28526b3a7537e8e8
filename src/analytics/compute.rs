//! Pure analytics over a complete item collection

use super::model::{
    AnalyticsInfo, CategoryCount, NO_STATUS, Period, TimelineData, UNASSIGNED, VelocityData,
};
use crate::api::models::{Item, Project};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Group by value in one pass; `None` and blank values land in `none_label`.
/// Buckets are ordered by count descending, then name.
pub fn distribution<'a, I>(values: I, none_label: &str) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        let key = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => none_label.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut buckets: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount { name, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    buckets
}

pub fn status_distribution(items: &[Item]) -> Vec<CategoryCount> {
    distribution(items.iter().map(Item::status), NO_STATUS)
}

pub fn assignee_distribution(items: &[Item]) -> Vec<CategoryCount> {
    distribution(items.iter().map(Item::primary_assignee), UNASSIGNED)
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

fn mean(samples: &[f64]) -> Option<f64> {
    (!samples.is_empty()).then(|| samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Completion and intake over the `period` window ending at `now`
pub fn velocity(items: &[Item], period: Period, now: DateTime<Utc>) -> VelocityData {
    let start = now - Duration::days(period.days());
    let in_window = |ts: DateTime<Utc>| ts >= start && ts <= now;

    let added = items.iter().filter(|item| in_window(item.created_at)).count();

    let completed: Vec<(&Item, DateTime<Utc>)> = items
        .iter()
        .filter_map(|item| item.completed_at.map(|done| (item, done)))
        .filter(|(_, done)| in_window(*done))
        .collect();

    let lead_times: Vec<f64> = completed
        .iter()
        .map(|(item, done)| days_between(item.created_at, *done))
        .filter(|days| *days >= 0.0)
        .collect();

    let cycle_times: Vec<f64> = completed
        .iter()
        .filter_map(|(item, done)| {
            let started = item.start_date()?.and_hms_opt(0, 0, 0)?.and_utc();
            Some(days_between(started, *done))
        })
        .filter(|days| *days >= 0.0)
        .collect();

    let finished = completed.len();
    let closure_rate = if finished + added == 0 {
        0.0
    } else {
        finished as f64 / (finished + added) as f64
    };

    VelocityData {
        period,
        period_start: start,
        period_end: now,
        completed_items: finished,
        added_items: added,
        closure_rate,
        lead_time_days: mean(&lead_times),
        cycle_time_days: mean(&cycle_times),
    }
}

/// Earliest and latest dates across date fields, iteration starts and
/// milestone due dates
pub fn timeline(items: &[Item]) -> TimelineData {
    let dates: Vec<NaiveDate> = items.iter().flat_map(Item::dates).collect();
    let milestones: BTreeSet<&str> = items
        .iter()
        .filter_map(|item| item.milestone.as_ref())
        .map(|m| m.title.as_str())
        .collect();

    let start_date = dates.iter().min().copied();
    let end_date = dates.iter().max().copied();
    let duration_days = match (start_date, end_date) {
        (Some(start), Some(end)) => Some((end - start).num_days() + 1),
        _ => None,
    };

    TimelineData {
        start_date,
        end_date,
        duration_days,
        milestone_count: milestones.len(),
        activity_count: dates.len(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsOptions {
    pub period: Option<Period>,
    pub timeline: bool,
    /// Reference time for the velocity window; defaults to the current time
    pub now: Option<DateTime<Utc>>,
}

impl AnalyticsOptions {
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_timeline(mut self) -> Self {
        self.timeline = true;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

pub fn analyze(project: &Project, items: &[Item], options: &AnalyticsOptions) -> AnalyticsInfo {
    let now = options.now.unwrap_or_else(Utc::now);

    AnalyticsInfo {
        project_id: project.id.clone(),
        title: project.title.clone(),
        item_count: items.len(),
        field_count: project.fields.len(),
        view_count: project.views.len(),
        status_stats: status_distribution(items),
        assignee_stats: assignee_distribution(items),
        velocity_data: options.period.map(|period| velocity(items, period, now)),
        timeline_data: options.timeline.then(|| timeline(items)),
        generated_at: now,
    }
}
