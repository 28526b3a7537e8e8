//! The remote data provider boundary
//!
//! Every engine in this crate talks to the hosted project system only through
//! [`ProjectDataProvider`]. The GitHub GraphQL client implements it for real
//! runs; tests substitute an in-memory double.

use super::models::{Item, ItemMutation, ItemPage, ItemRef, Project, ProjectAction};
use crate::error::ProviderError;
use async_trait::async_trait;
use log::debug;

#[async_trait]
pub trait ProjectDataProvider: Send + Sync {
    /// Resolve `owner/number` to a project with its fields and views
    async fn fetch_project(&self, owner: &str, number: u32) -> Result<Project, ProviderError>;

    /// One page of items; pass the previous page's cursor to continue
    async fn fetch_items_page(
        &self,
        project_id: &str,
        cursor: Option<&str>,
    ) -> Result<ItemPage, ProviderError>;

    /// Apply a single mutation to a single item. Exactly one attempt, no retries.
    async fn mutate_item(
        &self,
        project_id: &str,
        item_id: &str,
        mutation: &ItemMutation,
    ) -> Result<(), ProviderError>;

    async fn invoke_action(
        &self,
        project_id: &str,
        action: &ProjectAction,
        item: &ItemRef,
    ) -> Result<(), ProviderError>;

    /// Walk every page from the start. Any page error fails the whole read.
    async fn fetch_all_items(&self, project_id: &str) -> Result<Vec<Item>, ProviderError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_items_page(project_id, cursor.as_deref()).await?;
            pages += 1;
            items.extend(page.items);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            "Fetched {} items in {} pages for project {}",
            items.len(),
            pages,
            project_id
        );
        Ok(items)
    }
}
