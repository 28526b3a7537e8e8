//! Integration tests for project analytics

mod common;

use common::{ItemBuilder, MockProvider, PROJECT_ID, date, ts};
use gh_projects::analytics::{Aggregator, AnalyticsOptions, NO_STATUS, Period, UNASSIGNED};
use gh_projects::api::ProjectRef;
use gh_projects::error::CoreError;
use std::sync::Arc;

fn roadmap() -> ProjectRef {
    ProjectRef::new("octo-org", 7)
}

fn sample_items() -> Vec<gh_projects::api::Item> {
    vec![
        ItemBuilder::new("1").status("Done").assignees(&["zed", "amy"]).build(),
        ItemBuilder::new("2").status("Done").assignees(&["amy"]).build(),
        ItemBuilder::new("3").status("Todo").build(),
        ItemBuilder::new("4").assignees(&["bob"]).build(),
        ItemBuilder::new("5").status("In Progress").build(),
    ]
}

#[tokio::test]
async fn test_distributions_cover_every_item() {
    let provider = Arc::new(MockProvider::new().with_pages(vec![
        sample_items()[..3].to_vec(),
        sample_items()[3..].to_vec(),
    ]));
    let aggregator = Aggregator::new(Arc::clone(&provider));

    let info = aggregator
        .aggregate(&roadmap(), &AnalyticsOptions::default())
        .await
        .unwrap();

    assert_eq!(info.project_id, PROJECT_ID);
    assert_eq!(info.title, "Roadmap");
    assert_eq!(info.item_count, 5);
    assert_eq!(info.field_count, 2);
    assert_eq!(info.view_count, 1);
    assert_eq!(provider.page_calls.load(std::sync::atomic::Ordering::SeqCst), 2);

    let status_total: usize = info.status_stats.iter().map(|c| c.count).sum();
    let assignee_total: usize = info.assignee_stats.iter().map(|c| c.count).sum();
    assert_eq!(status_total, info.item_count);
    assert_eq!(assignee_total, info.item_count);

    assert_eq!(info.status_stats[0].name, "Done");
    assert_eq!(info.status_stats[0].count, 2);
    assert!(info.status_stats.iter().any(|c| c.name == NO_STATUS && c.count == 1));

    // Multi-assignee items count once, under the alphabetically first login
    let amy = info.assignee_stats.iter().find(|c| c.name == "amy").unwrap();
    assert_eq!(amy.count, 2);
    assert!(info.assignee_stats.iter().all(|c| c.name != "zed"));
    assert!(info.assignee_stats.iter().any(|c| c.name == UNASSIGNED && c.count == 2));

    let percentages = info.percentages(&info.status_stats).unwrap();
    let total: f64 = percentages.iter().sum();
    assert!((total - 100.0).abs() < 1e-6);

    assert!(info.velocity_data.is_none());
    assert!(info.timeline_data.is_none());
}

#[tokio::test]
async fn test_empty_project_has_no_percentages() {
    let aggregator = Aggregator::new(Arc::new(MockProvider::new()));

    let info = aggregator
        .aggregate(&roadmap(), &AnalyticsOptions::default().with_timeline())
        .await
        .unwrap();

    assert_eq!(info.item_count, 0);
    assert!(info.status_stats.is_empty());
    assert!(info.percentages(&info.status_stats).is_none());
    let timeline = info.timeline_data.unwrap();
    assert_eq!(timeline.start_date, None);
    assert_eq!(timeline.activity_count, 0);
}

#[tokio::test]
async fn test_page_failure_fails_whole_aggregation() {
    let provider = MockProvider::new()
        .with_pages(vec![sample_items(), sample_items()])
        .failing_page(1);
    let aggregator = Aggregator::new(Arc::new(provider));

    let result = aggregator
        .aggregate(&roadmap(), &AnalyticsOptions::default())
        .await;
    assert!(matches!(result, Err(CoreError::RemoteUnavailable(_))));
}

#[tokio::test]
async fn test_invalid_reference_is_rejected_before_fetching() {
    let provider = Arc::new(MockProvider::new());
    let aggregator = Aggregator::new(Arc::clone(&provider));

    let result = aggregator
        .aggregate(&ProjectRef::new("octo-org", 0), &AnalyticsOptions::default())
        .await;
    assert!(matches!(result, Err(CoreError::InvalidRequest(_))));

    let result = aggregator
        .aggregate(&ProjectRef::new(" ", 3), &AnalyticsOptions::default())
        .await;
    assert!(matches!(result, Err(CoreError::InvalidRequest(_))));
    assert_eq!(provider.page_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    let result = aggregator
        .aggregate(&ProjectRef::new("missing", 3), &AnalyticsOptions::default())
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_velocity_over_window() {
    let now = ts(2024, 3, 31);
    let items = vec![
        // Created and closed inside the week: lead time 2 days, cycle time 1 day
        ItemBuilder::new("1")
            .created(ts(2024, 3, 26))
            .date_field("Start date", date(2024, 3, 27))
            .completed(ts(2024, 3, 28))
            .build(),
        // Closed inside the week, created long before: lead time 30 days
        ItemBuilder::new("2")
            .created(ts(2024, 2, 28))
            .completed(ts(2024, 3, 29))
            .build(),
        // Added inside the week, still open
        ItemBuilder::new("3").created(ts(2024, 3, 30)).build(),
        // Closed before the window
        ItemBuilder::new("4")
            .created(ts(2024, 1, 1))
            .completed(ts(2024, 2, 1))
            .build(),
    ];
    let aggregator = Aggregator::new(Arc::new(MockProvider::new().with_items(items)));

    let info = aggregator
        .aggregate(
            &roadmap(),
            &AnalyticsOptions::default().with_period(Period::Weekly).at(now),
        )
        .await
        .unwrap();

    let velocity = info.velocity_data.unwrap();
    assert_eq!(velocity.period, Period::Weekly);
    assert_eq!(velocity.period_end, now);
    assert_eq!(velocity.period_start, ts(2024, 3, 24));
    assert_eq!(velocity.completed_items, 2);
    assert_eq!(velocity.added_items, 2);
    assert!((velocity.closure_rate - 0.5).abs() < 1e-9);
    assert!((velocity.lead_time_days.unwrap() - 16.0).abs() < 1e-9);
    assert!((velocity.cycle_time_days.unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_timeline_spans_item_dates() {
    let items = vec![
        ItemBuilder::new("1")
            .date_field("Start date", date(2024, 4, 1))
            .milestone("v1", Some(date(2024, 4, 30)))
            .build(),
        ItemBuilder::new("2")
            .date_field("Due", date(2024, 4, 15))
            .milestone("v1", None)
            .build(),
        ItemBuilder::new("3").milestone("v2", Some(date(2024, 5, 10))).build(),
        ItemBuilder::new("4").build(),
    ];
    let aggregator = Aggregator::new(Arc::new(MockProvider::new().with_items(items)));

    let info = aggregator
        .aggregate(&roadmap(), &AnalyticsOptions::default().with_timeline())
        .await
        .unwrap();

    let timeline = info.timeline_data.unwrap();
    assert_eq!(timeline.start_date, Some(date(2024, 4, 1)));
    assert_eq!(timeline.end_date, Some(date(2024, 5, 10)));
    assert_eq!(timeline.duration_days, Some(40));
    assert_eq!(timeline.milestone_count, 2);
    assert_eq!(timeline.activity_count, 4);
}
