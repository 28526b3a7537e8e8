use super::compute::{AnalyticsOptions, analyze};
use super::model::AnalyticsInfo;
use crate::api::models::ProjectRef;
use crate::api::provider::ProjectDataProvider;
use crate::error::{CoreError, CoreResult};
use log::{debug, info};
use std::sync::Arc;

/// Builds [`AnalyticsInfo`] from a project's complete item collection.
///
/// Every call re-reads the collection from the first page. If any page
/// fails the whole aggregation fails; there are no partial results.
pub struct Aggregator<P: ?Sized> {
    provider: Arc<P>,
}

impl<P> Aggregator<P>
where
    P: ProjectDataProvider + ?Sized,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn aggregate(
        &self,
        project: &ProjectRef,
        options: &AnalyticsOptions,
    ) -> CoreResult<AnalyticsInfo> {
        if project.owner.trim().is_empty() {
            return Err(CoreError::InvalidRequest("project owner is required".into()));
        }
        if project.number == 0 {
            return Err(CoreError::InvalidRequest(
                "project number must be positive".into(),
            ));
        }

        let resolved = self
            .provider
            .fetch_project(&project.owner, project.number)
            .await?;
        debug!("Resolved {} to {}", project, resolved.id);

        let items = self.provider.fetch_all_items(&resolved.id).await?;
        let info = analyze(&resolved, &items, options);

        info!(
            "Aggregated {} items across {} status buckets for {}",
            info.item_count,
            info.status_stats.len(),
            project
        );
        Ok(info)
    }
}
