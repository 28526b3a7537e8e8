//! In-memory project provider shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gh_projects::api::{
    FieldDataType, Item, ItemFieldValue, ItemMutation, ItemPage, ItemRef, ItemType, Milestone,
    Project, ProjectAction, ProjectDataProvider, ProjectField, ProjectView,
};
use gh_projects::error::ProviderError;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const PROJECT_ID: &str = "PVT_kwDOtest";

pub fn project() -> Project {
    Project {
        id: PROJECT_ID.to_string(),
        number: 7,
        title: "Roadmap".to_string(),
        fields: vec![
            ProjectField {
                id: "PVTF_status".into(),
                name: "Status".into(),
                data_type: FieldDataType::SingleSelect,
                options: Vec::new(),
                iterations: Vec::new(),
            },
            ProjectField {
                id: "PVTF_title".into(),
                name: "Title".into(),
                data_type: FieldDataType::Text,
                options: Vec::new(),
                iterations: Vec::new(),
            },
        ],
        views: vec![ProjectView {
            id: "PVTV_board".into(),
            name: "Board".into(),
            layout: "BOARD_LAYOUT".into(),
        }],
    }
}

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builder for test items
pub struct ItemBuilder(Item);

impl ItemBuilder {
    pub fn new(id: &str) -> Self {
        Self(Item {
            id: id.to_string(),
            item_type: ItemType::Issue,
            content_id: Some(format!("I_{}", id)),
            title: format!("Item {}", id),
            number: None,
            state: Some("OPEN".into()),
            created_at: ts(2024, 1, 1),
            updated_at: ts(2024, 1, 1),
            completed_at: None,
            assignees: Vec::new(),
            milestone: None,
            archived: false,
            field_values: BTreeMap::new(),
        })
    }

    pub fn status(mut self, status: &str) -> Self {
        self.0
            .field_values
            .insert("Status".into(), ItemFieldValue::SingleSelect(status.into()));
        self
    }

    pub fn assignees(mut self, logins: &[&str]) -> Self {
        self.0.assignees = logins.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.0.created_at = at;
        self
    }

    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.0.completed_at = Some(at);
        self.0.state = Some("CLOSED".into());
        self
    }

    pub fn date_field(mut self, name: &str, value: NaiveDate) -> Self {
        self.0
            .field_values
            .insert(name.into(), ItemFieldValue::Date(value));
        self
    }

    pub fn milestone(mut self, title: &str, due_on: Option<NaiveDate>) -> Self {
        self.0.milestone = Some(Milestone {
            title: title.into(),
            due_on,
        });
        self
    }

    pub fn build(self) -> Item {
        self.0
    }
}

/// Provider double with scripted failures and call accounting
#[derive(Default)]
pub struct MockProvider {
    pages: Vec<Vec<Item>>,
    failing_items: HashSet<String>,
    slow_items: HashSet<String>,
    failing_page: Option<usize>,
    failing_action: Option<String>,
    delay: Option<Duration>,
    pub mutate_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub actions: Mutex<Vec<(String, ProjectAction)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.pages = vec![items];
        self
    }

    pub fn with_pages(mut self, pages: Vec<Vec<Item>>) -> Self {
        self.pages = pages;
        self
    }

    /// Mutations of these items fail with `Rejected`
    pub fn failing_items(mut self, ids: &[&str]) -> Self {
        self.failing_items = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Mutations of these items never finish within a test timeout
    pub fn slow_items(mut self, ids: &[&str]) -> Self {
        self.slow_items = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// The page at `index` (zero based) reports the service unavailable
    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_page = Some(index);
        self
    }

    /// Actions with this tag fail
    pub fn failing_action(mut self, tag: &str) -> Self {
        self.failing_action = Some(tag.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn mutate_calls(&self) -> usize {
        self.mutate_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_actions(&self) -> Vec<(String, ProjectAction)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectDataProvider for MockProvider {
    async fn fetch_project(&self, owner: &str, number: u32) -> Result<Project, ProviderError> {
        if owner == "missing" {
            return Err(ProviderError::NotFound(format!("{}/{}", owner, number)));
        }
        Ok(project())
    }

    async fn fetch_items_page(
        &self,
        _project_id: &str,
        cursor: Option<&str>,
    ) -> Result<ItemPage, ProviderError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        if self.failing_page == Some(index) {
            return Err(ProviderError::Unavailable("service unavailable".into()));
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_cursor = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(ItemPage { items, next_cursor })
    }

    async fn mutate_item(
        &self,
        _project_id: &str,
        item_id: &str,
        _mutation: &ItemMutation,
    ) -> Result<(), ProviderError> {
        self.mutate_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.slow_items.contains(item_id) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_items.contains(item_id) {
            return Err(ProviderError::Rejected(format!("cannot modify {}", item_id)));
        }
        Ok(())
    }

    async fn invoke_action(
        &self,
        _project_id: &str,
        action: &ProjectAction,
        item: &ItemRef,
    ) -> Result<(), ProviderError> {
        self.actions
            .lock()
            .unwrap()
            .push((item.item_id.clone(), action.clone()));
        if self.failing_action.as_deref() == Some(action.tag()) {
            return Err(ProviderError::AccessDenied(format!(
                "{} not permitted",
                action.tag()
            )));
        }
        Ok(())
    }
}
