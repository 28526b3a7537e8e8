use super::constants::{self, headers};
use super::fields;
use super::graphql::{
    self, GraphQlResponse, IdNode, ItemContentNode, ItemsNode, NodeData, ProjectByNumberData,
    ProjectNode, UserData, ViewerData,
};
use super::models::{
    FieldUpdate, FieldValue, ItemMutation, ItemPage, ItemRef, Project, ProjectAction,
    STATUS_FIELD,
};
use super::provider::ProjectDataProvider;
use super::resilience::{RateLimiter, RateLimiterStats, ResilienceConfig, RetryPolicy};
use crate::error::ProviderError;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// GitHub GraphQL client for Projects (v2) with connection pooling
pub struct GitHubClient {
    api_url: String,
    http_client: reqwest::Client,
    token: String,
    request_timeout: Duration,
    retry_policy: RetryPolicy, // reads only
    rate_limiter: RateLimiter, // shared by every request of this client
    page_size: u32,
    // Field schemas by project id, fetched once per invocation
    schemas: Mutex<HashMap<String, Arc<Project>>>,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        resilience: ResilienceConfig,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(resilience.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into(),
            http_client,
            token: token.into(),
            request_timeout: resilience.request_timeout,
            retry_policy: RetryPolicy::new(resilience.retry),
            rate_limiter: RateLimiter::new(resilience.rate_limit),
            page_size: constants::MAX_PAGE_SIZE,
            schemas: Mutex::new(HashMap::new()),
        })
    }

    /// Items requested per page, clamped to what GitHub accepts
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, constants::MAX_PAGE_SIZE);
        self
    }

    pub fn rate_limiter_stats(&self) -> RateLimiterStats {
        self.rate_limiter.stats()
    }

    /// Login of the token's owner; used to verify credentials
    pub async fn viewer_login(&self) -> Result<String, ProviderError> {
        let data: ViewerData = self.query("Viewer", graphql::VIEWER, json!({})).await?;
        Ok(data.viewer.login)
    }

    /// Read with retries on transient failures
    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: &str,
        variables: Value,
    ) -> Result<T, ProviderError> {
        self.retry_policy
            .execute(|| self.send(operation, document, variables.clone()))
            .await
    }

    /// Write, exactly one attempt
    async fn mutate(&self, operation: &str, document: &str, variables: Value) -> Result<(), ProviderError> {
        self.send::<Value>(operation, document, variables).await.map(|_| ())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: &str,
        variables: Value,
    ) -> Result<T, ProviderError> {
        self.rate_limiter.acquire().await;

        let correlation_id = uuid::Uuid::new_v4().to_string();
        debug!(
            "GraphQL Request: {}",
            json!({
                "event": "graphql_request",
                "correlation_id": correlation_id,
                "operation": operation,
                "variables": variables,
            })
        );

        let started = Instant::now();
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .header("Content-Type", headers::CONTENT_TYPE_JSON)
            .header("Accept", headers::ACCEPT_JSON)
            .header(headers::X_CORRELATION_ID, &correlation_id)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let retry_after = response.headers().contains_key("retry-after");
        debug!(
            "GraphQL Response: {}",
            json!({
                "event": "graphql_response",
                "correlation_id": correlation_id,
                "operation": operation,
                "status_code": status.as_u16(),
                "duration_ms": started.elapsed().as_millis() as u64,
            })
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("GraphQL {} failed with HTTP {}: {}", operation, status, body);
            return Err(status_error(status, retry_after, body));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("{}: {}", operation, e)))?;

        if !envelope.errors.is_empty() {
            return Err(graphql::classify_errors(&envelope.errors));
        }
        envelope
            .data
            .ok_or_else(|| ProviderError::Decode(format!("{}: response had no data", operation)))
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.request_timeout)
        } else if error.is_decode() {
            ProviderError::Decode(error.to_string())
        } else {
            ProviderError::Unavailable(error.to_string())
        }
    }

    /// Field schema for a project id, fetched on first use
    async fn schema(&self, project_id: &str) -> Result<Arc<Project>, ProviderError> {
        let mut schemas = self.schemas.lock().await;
        if let Some(project) = schemas.get(project_id) {
            return Ok(project.clone());
        }

        let data: NodeData<ProjectNode> = self
            .query(
                "ProjectById",
                &graphql::project_by_id_query(),
                json!({ "id": project_id }),
            )
            .await?;
        let project = data
            .node
            .map(|node| Arc::new(node.into_project()))
            .ok_or_else(|| ProviderError::NotFound(format!("project {}", project_id)))?;

        debug!(
            "Cached schema for project {} ({} fields)",
            project_id,
            project.fields.len()
        );
        schemas.insert(project_id.to_string(), project.clone());
        Ok(project)
    }

    async fn apply_field_updates(
        &self,
        project_id: &str,
        item_id: &str,
        updates: &[FieldUpdate],
    ) -> Result<(), ProviderError> {
        let schema = self.schema(project_id).await?;

        for update in updates {
            let field = schema.field(&update.field).ok_or_else(|| {
                ProviderError::InvalidValue(format!(
                    "project '{}' has no field '{}'",
                    schema.title, update.field
                ))
            })?;

            if update.value.is_clear() {
                self.mutate(
                    "ClearFieldValue",
                    graphql::CLEAR_FIELD_VALUE,
                    json!({ "project": project_id, "item": item_id, "field": field.id }),
                )
                .await?;
            } else {
                let value = fields::coerce(field, &update.value)?;
                self.mutate(
                    "UpdateFieldValue",
                    graphql::UPDATE_FIELD_VALUE,
                    json!({ "project": project_id, "item": item_id, "field": field.id, "value": value }),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn assign(&self, item: &ItemRef, login: &str) -> Result<(), ProviderError> {
        let content_id = match &item.content_id {
            Some(id) => id.clone(),
            None => {
                let data: NodeData<ItemContentNode> = self
                    .query(
                        "ItemContentId",
                        graphql::ITEM_CONTENT_ID,
                        json!({ "id": item.item_id }),
                    )
                    .await?;
                data.node
                    .and_then(|node| node.content)
                    .map(|content: IdNode| content.id)
                    .ok_or_else(|| {
                        ProviderError::NotFound(format!("content of item {}", item.item_id))
                    })?
            }
        };

        let user: UserData = self
            .query("UserId", graphql::USER_ID, json!({ "login": login }))
            .await?;
        let user_id = user
            .user
            .map(|u| u.id)
            .ok_or_else(|| ProviderError::NotFound(format!("user '{}'", login)))?;

        self.mutate(
            "AddAssignees",
            graphql::ADD_ASSIGNEES,
            json!({ "assignable": content_id, "assignees": [user_id] }),
        )
        .await
    }
}

fn status_error(status: StatusCode, retry_after: bool, body: String) -> ProviderError {
    let message = if body.is_empty() {
        status.to_string()
    } else {
        body
    };
    match status.as_u16() {
        401 => ProviderError::Unauthorized(message),
        // Secondary rate limits come back as 403 with Retry-After
        403 if retry_after => ProviderError::Unavailable(message),
        403 => ProviderError::AccessDenied(message),
        404 => ProviderError::NotFound(message),
        408 | 429 | 500..=599 => ProviderError::Unavailable(message),
        _ => ProviderError::Rejected(message),
    }
}

#[async_trait]
impl ProjectDataProvider for GitHubClient {
    async fn fetch_project(&self, owner: &str, number: u32) -> Result<Project, ProviderError> {
        let data: ProjectByNumberData = self
            .query(
                "ProjectByNumber",
                &graphql::project_by_number_query(),
                json!({ "owner": owner, "number": number }),
            )
            .await?;

        let project = data
            .repository_owner
            .and_then(|owner| owner.project_v2)
            .map(ProjectNode::into_project)
            .ok_or_else(|| ProviderError::NotFound(format!("project {}/{}", owner, number)))?;

        info!(
            "Loaded project '{}' ({} fields, {} views)",
            project.title,
            project.fields.len(),
            project.views.len()
        );
        self.schemas
            .lock()
            .await
            .insert(project.id.clone(), Arc::new(project.clone()));
        Ok(project)
    }

    async fn fetch_items_page(
        &self,
        project_id: &str,
        cursor: Option<&str>,
    ) -> Result<ItemPage, ProviderError> {
        let data: NodeData<ItemsNode> = self
            .query(
                "ItemsPage",
                graphql::ITEMS_PAGE,
                json!({
                    "id": project_id,
                    "first": self.page_size,
                    "after": cursor,
                    "valuesFirst": constants::FIELD_VALUES_PER_ITEM,
                    "assigneesFirst": constants::ASSIGNEES_PER_ITEM,
                }),
            )
            .await?;

        data.node
            .map(|node| node.items.into_page())
            .ok_or_else(|| ProviderError::NotFound(format!("project {}", project_id)))
    }

    async fn mutate_item(
        &self,
        project_id: &str,
        item_id: &str,
        mutation: &ItemMutation,
    ) -> Result<(), ProviderError> {
        match mutation {
            ItemMutation::Update(updates) => {
                self.apply_field_updates(project_id, item_id, updates).await
            }
            ItemMutation::Delete => {
                self.mutate(
                    "DeleteItem",
                    graphql::DELETE_ITEM,
                    json!({ "project": project_id, "item": item_id }),
                )
                .await
            }
            ItemMutation::Archive => {
                self.mutate(
                    "ArchiveItem",
                    graphql::ARCHIVE_ITEM,
                    json!({ "project": project_id, "item": item_id }),
                )
                .await
            }
        }
    }

    async fn invoke_action(
        &self,
        project_id: &str,
        action: &ProjectAction,
        item: &ItemRef,
    ) -> Result<(), ProviderError> {
        match action {
            ProjectAction::SetField { field, value } => {
                let update = FieldUpdate::new(field.clone(), value.clone());
                self.apply_field_updates(project_id, &item.item_id, &[update])
                    .await
            }
            ProjectAction::MoveToStatus { status } => {
                let update = FieldUpdate::new(STATUS_FIELD, FieldValue::text(status.clone()));
                self.apply_field_updates(project_id, &item.item_id, &[update])
                    .await
            }
            ProjectAction::Assign { login } => self.assign(item, login).await,
            ProjectAction::Archive => {
                self.mutate_item(project_id, &item.item_id, &ItemMutation::Archive)
                    .await
            }
        }
    }
}
