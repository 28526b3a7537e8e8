//! Table and JSON rendering of engine results

use anyhow::{Context, Result};
use colored::*;
use gh_projects::analytics::{AnalyticsInfo, CategoryCount};
use gh_projects::automation::{
    ExecutionStatus, WorkflowDefinition, WorkflowExecution, WorkflowStatus,
};
use gh_projects::bulk::{BulkOperation, BulkStatus};
use gh_projects::timestamp;
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned, coloured tables
    Table,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Format stored in settings; unknown values fall back to a table
    pub fn from_setting(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Table
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to format JSON output")
}

/// Render rows as left-aligned columns with a bold header
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let pad = |text: &str, width: usize| {
        let fill = width.saturating_sub(text.chars().count());
        format!("{}{}", text, " ".repeat(fill))
    };

    let mut out = String::new();
    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    out.push_str(&format!("  {}\n", header.join("  ").trim_end().bold()));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| pad(cell, *w))
            .collect();
        out.push_str(&format!("  {}\n", cells.join("  ").trim_end()));
    }
    out
}

fn bulk_status_label(status: BulkStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        BulkStatus::Completed => label.bright_green().bold(),
        BulkStatus::PartiallyFailed => label.bright_yellow().bold(),
        BulkStatus::Failed => label.bright_red().bold(),
        BulkStatus::Pending | BulkStatus::Running => label.cyan(),
    }
}

pub fn bulk_operation(operation: &BulkOperation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {} {}\n",
        "Bulk".bright_white().bold(),
        operation.operation_type.to_string().bright_white().bold(),
        operation.id.to_string().dimmed()
    ));
    out.push_str(&format!("  Status:     {}\n", bulk_status_label(operation.status)));
    out.push_str(&format!(
        "  Processed:  {}/{} ({:.0}%)\n",
        operation.processed_items,
        operation.total_items,
        operation.progress * 100.0
    ));
    out.push_str(&format!("  Succeeded:  {}\n", operation.succeeded_items()));
    out.push_str(&format!("  Failed:     {}\n", operation.failed_items));
    out.push_str(&format!("  Created:    {}\n", timestamp::format(&operation.created_at)));
    if let Some(completed) = &operation.completed_at {
        out.push_str(&format!("  Completed:  {}\n", timestamp::format(completed)));
    }
    if let Some(message) = &operation.error_message {
        out.push_str(&format!("  Error:      {}\n", message.bright_red()));
    }

    if !operation.failures.is_empty() {
        out.push('\n');
        let rows: Vec<Vec<String>> = operation
            .failures
            .iter()
            .map(|f| vec![f.item_id.clone(), f.message.clone()])
            .collect();
        out.push_str(&table(&["ITEM", "ERROR"], &rows));
    }
    out
}

pub fn workflow_list(workflows: &[WorkflowDefinition]) -> String {
    if workflows.is_empty() {
        return format!("  {}\n", "No workflows defined".bright_yellow());
    }

    let rows: Vec<Vec<String>> = workflows
        .iter()
        .map(|w| {
            vec![
                w.id.to_string(),
                w.name.clone(),
                w.trigger.to_string(),
                w.condition
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string()),
                w.action.to_string(),
                w.status.to_string(),
            ]
        })
        .collect();
    table(&["ID", "NAME", "TRIGGER", "CONDITION", "ACTION", "STATUS"], &rows)
}

pub fn workflow_detail(workflow: &WorkflowDefinition) -> String {
    let condition = workflow
        .condition
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(always)".to_string());
    let status = match workflow.is_enabled() {
        true => workflow.status.to_string().bright_green(),
        false => workflow.status.to_string().dimmed(),
    };

    format!(
        "  {} {}\n  Project:    {}\n  Trigger:    {}\n  Condition:  {}\n  Action:     {}\n  Status:     {}\n  Updated:    {}\n",
        workflow.name.bright_white().bold(),
        workflow.id.to_string().dimmed(),
        workflow.project_id,
        workflow.trigger,
        condition,
        workflow.action,
        status,
        timestamp::format(&workflow.updated_at)
    )
}

pub fn executions(executions: &[WorkflowExecution]) -> String {
    if executions.is_empty() {
        return format!("  {}\n", "No workflows matched".dimmed());
    }

    let rows: Vec<Vec<String>> = executions
        .iter()
        .map(|e| {
            let status = match e.status {
                ExecutionStatus::Success => "success".to_string(),
                ExecutionStatus::Failure => "failure".to_string(),
            };
            vec![
                timestamp::format(&e.executed_at),
                e.workflow_id.to_string(),
                e.item_id.clone(),
                status,
                format!("{}ms", e.duration_ms),
                e.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(&["EXECUTED", "WORKFLOW", "ITEM", "STATUS", "DURATION", "ERROR"], &rows)
}

pub fn workflow_status(status: &WorkflowStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {}\n",
        "Workflows for".bright_white().bold(),
        status.project_id.bright_white().bold()
    ));
    out.push_str(&format!("  Total:       {}\n", status.total_workflows));
    out.push_str(&format!("  Active:      {}\n", status.active_workflows));
    out.push_str(&format!("  Executions:  {}\n", status.total_executions));
    out.push_str(&format!(
        "  Success:     {:.1}%\n",
        status.success_rate * 100.0
    ));

    if !status.recent_executions.is_empty() {
        out.push('\n');
        out.push_str(&format!("  {}\n", "Recent executions".bright_white()));
        out.push_str(&executions(&status.recent_executions));
    }
    out
}

/// Shares in tenths of a percent, rounded by largest remainder so the
/// displayed values add up to 100.0 when the counts cover every item.
fn rounded_shares(counts: &[usize], item_count: usize) -> Option<Vec<usize>> {
    if item_count == 0 {
        return None;
    }
    let scaled: Vec<usize> = counts.iter().map(|c| c * 1000).collect();
    let mut shares: Vec<usize> = scaled.iter().map(|s| s / item_count).collect();

    let covered: usize = counts.iter().sum();
    let target = (covered * 1000 + item_count / 2) / item_count;
    let assigned: usize = shares.iter().sum();

    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by_key(|&i| std::cmp::Reverse(scaled[i] % item_count));
    for &i in by_remainder.iter().take(target.saturating_sub(assigned)) {
        shares[i] += 1;
    }
    Some(shares)
}

fn distribution_rows(stats: &[CategoryCount], item_count: usize) -> Vec<Vec<String>> {
    let counts: Vec<usize> = stats.iter().map(|bucket| bucket.count).collect();
    let shares = rounded_shares(&counts, item_count);

    stats
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let share = shares
                .as_ref()
                .map(|tenths| format!("{}.{}%", tenths[i] / 10, tenths[i] % 10))
                .unwrap_or_else(|| "-".to_string());
            vec![bucket.name.clone(), bucket.count.to_string(), share]
        })
        .collect()
}

fn days(value: Option<f64>) -> String {
    value
        .map(|d| format!("{:.1} days", d))
        .unwrap_or_else(|| "-".to_string())
}

pub fn analytics(info: &AnalyticsInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {}\n",
        info.title.bright_white().bold(),
        info.project_id.dimmed()
    ));
    out.push_str(&format!(
        "  Items: {}  Fields: {}  Views: {}\n\n",
        info.item_count, info.field_count, info.view_count
    ));

    out.push_str(&table(
        &["STATUS", "ITEMS", "SHARE"],
        &distribution_rows(&info.status_stats, info.item_count),
    ));
    out.push('\n');
    out.push_str(&table(
        &["ASSIGNEE", "ITEMS", "SHARE"],
        &distribution_rows(&info.assignee_stats, info.item_count),
    ));

    if let Some(velocity) = &info.velocity_data {
        out.push('\n');
        out.push_str(&format!(
            "  {} ({}, {} to {})\n",
            "Velocity".bright_white().bold(),
            velocity.period,
            timestamp::format(&velocity.period_start),
            timestamp::format(&velocity.period_end)
        ));
        out.push_str(&format!("  Completed:     {}\n", velocity.completed_items));
        out.push_str(&format!("  Added:         {}\n", velocity.added_items));
        out.push_str(&format!(
            "  Closure rate:  {:.1}%\n",
            velocity.closure_rate * 100.0
        ));
        out.push_str(&format!("  Lead time:     {}\n", days(velocity.lead_time_days)));
        out.push_str(&format!("  Cycle time:    {}\n", days(velocity.cycle_time_days)));
    }

    if let Some(timeline) = &info.timeline_data {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        };
        out.push('\n');
        out.push_str(&format!("  {}\n", "Timeline".bright_white().bold()));
        out.push_str(&format!("  Start:       {}\n", date(timeline.start_date)));
        out.push_str(&format!("  End:         {}\n", date(timeline.end_date)));
        out.push_str(&format!(
            "  Duration:    {}\n",
            timeline
                .duration_days
                .map(|d| format!("{} days", d))
                .unwrap_or_else(|| "-".to_string())
        ));
        out.push_str(&format!("  Milestones:  {}\n", timeline.milestone_count));
        out.push_str(&format!("  Activity:    {}\n", timeline.activity_count));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gh_projects::bulk::{BulkOperationType, ItemFailure};
    use uuid::Uuid;

    #[test]
    fn test_table_alignment() {
        colored::control::set_override(false);
        let rendered = table(
            &["NAME", "N"],
            &[
                vec!["Todo".into(), "1".into()],
                vec!["In Progress".into(), "12".into()],
            ],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "  NAME         N");
        assert_eq!(lines[1], "  Todo         1");
        assert_eq!(lines[2], "  In Progress  12");
    }

    #[test]
    fn test_percentages_omitted_without_items() {
        let rows = distribution_rows(
            &[CategoryCount {
                name: "No Status".into(),
                count: 0,
            }],
            0,
        );
        assert_eq!(rows[0][2], "-");
    }

    fn displayed_total(rows: &[Vec<String>]) -> f64 {
        rows.iter()
            .map(|row| row[2].trim_end_matches('%').parse::<f64>().unwrap())
            .sum()
    }

    #[test]
    fn test_displayed_shares_add_up_to_one_hundred() {
        let even: Vec<CategoryCount> = (0..6)
            .map(|i| CategoryCount {
                name: format!("bucket-{}", i),
                count: 1,
            })
            .collect();
        let rows = distribution_rows(&even, 6);
        assert!((displayed_total(&rows) - 100.0).abs() < 1e-9, "{:?}", rows);
        assert!(rows.iter().all(|row| row[2] == "16.7%" || row[2] == "16.6%"));

        let thirds: Vec<CategoryCount> = [("Done", 1), ("Todo", 1), ("In Progress", 1)]
            .iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count: *count,
            })
            .collect();
        let rows = distribution_rows(&thirds, 3);
        assert!((displayed_total(&rows) - 100.0).abs() < 1e-9, "{:?}", rows);

        let skewed: Vec<CategoryCount> = [("Done", 5), ("Todo", 1), ("Blocked", 1)]
            .iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count: *count,
            })
            .collect();
        let rows = distribution_rows(&skewed, 7);
        assert_eq!(rows[0][2], "71.4%");
        assert!((displayed_total(&rows) - 100.0).abs() < 1e-9, "{:?}", rows);
    }

    #[test]
    fn test_bulk_record_lists_failures() {
        colored::control::set_override(false);
        let operation = BulkOperation {
            id: Uuid::new_v4(),
            operation_type: BulkOperationType::Archive,
            status: BulkStatus::PartiallyFailed,
            total_items: 3,
            processed_items: 3,
            failed_items: 1,
            progress: 1.0,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: Some("1 of 3 items failed".into()),
            failures: vec![ItemFailure {
                item_id: "PVTI_2".into(),
                message: "not found: item".into(),
            }],
        };

        let rendered = bulk_operation(&operation);
        assert!(rendered.contains("partially failed"));
        assert!(rendered.contains("3/3 (100%)"));
        assert!(rendered.contains("PVTI_2"));
    }
}
