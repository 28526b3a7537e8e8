//! GraphQL documents and response shapes for Projects (v2)

use super::models::{
    FieldDataType, FieldOption, Item, ItemFieldValue, ItemPage, ItemType, IterationOption,
    Milestone, Project, ProjectField, ProjectView,
};
use crate::error::ProviderError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

const PROJECT_FRAGMENT: &str = r#"
fragment ProjectParts on ProjectV2 {
  id
  number
  title
  fields(first: 100) {
    nodes {
      ... on ProjectV2FieldCommon { id name dataType }
      ... on ProjectV2SingleSelectField { options { id name } }
      ... on ProjectV2IterationField {
        configuration {
          iterations { id title startDate }
          completedIterations { id title startDate }
        }
      }
    }
  }
  views(first: 50) { nodes { id name layout } }
}
"#;

const PROJECT_BY_NUMBER: &str = r#"
query ProjectByNumber($owner: String!, $number: Int!) {
  repositoryOwner(login: $owner) {
    ... on ProjectV2Owner {
      projectV2(number: $number) { ...ProjectParts }
    }
  }
}
"#;

const PROJECT_BY_ID: &str = r#"
query ProjectById($id: ID!) {
  node(id: $id) { ... on ProjectV2 { ...ProjectParts } }
}
"#;

pub const ITEMS_PAGE: &str = r#"
query ItemsPage($id: ID!, $first: Int!, $after: String, $valuesFirst: Int!, $assigneesFirst: Int!) {
  node(id: $id) {
    ... on ProjectV2 {
      items(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          type
          isArchived
          createdAt
          updatedAt
          content {
            __typename
            ... on Issue {
              id title number state createdAt closedAt
              assignees(first: $assigneesFirst) { nodes { login } }
              milestone { title dueOn }
            }
            ... on PullRequest {
              id title number state createdAt closedAt mergedAt
              assignees(first: $assigneesFirst) { nodes { login } }
              milestone { title dueOn }
            }
            ... on DraftIssue {
              id title createdAt
              assignees(first: $assigneesFirst) { nodes { login } }
            }
          }
          fieldValues(first: $valuesFirst) {
            nodes {
              __typename
              ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldTextValue { text field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldNumberValue { number field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldDateValue { date field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldIterationValue { title startDate field { ... on ProjectV2FieldCommon { name } } }
            }
          }
        }
      }
    }
  }
}
"#;

pub const UPDATE_FIELD_VALUE: &str = r#"
mutation UpdateFieldValue($project: ID!, $item: ID!, $field: ID!, $value: ProjectV2FieldValue!) {
  updateProjectV2ItemFieldValue(input: {projectId: $project, itemId: $item, fieldId: $field, value: $value}) {
    projectV2Item { id }
  }
}
"#;

pub const CLEAR_FIELD_VALUE: &str = r#"
mutation ClearFieldValue($project: ID!, $item: ID!, $field: ID!) {
  clearProjectV2ItemFieldValue(input: {projectId: $project, itemId: $item, fieldId: $field}) {
    projectV2Item { id }
  }
}
"#;

pub const DELETE_ITEM: &str = r#"
mutation DeleteItem($project: ID!, $item: ID!) {
  deleteProjectV2Item(input: {projectId: $project, itemId: $item}) { deletedItemId }
}
"#;

pub const ARCHIVE_ITEM: &str = r#"
mutation ArchiveItem($project: ID!, $item: ID!) {
  archiveProjectV2Item(input: {projectId: $project, itemId: $item}) { item { id } }
}
"#;

pub const VIEWER: &str = r#"
query Viewer { viewer { login } }
"#;

pub const USER_ID: &str = r#"
query UserId($login: String!) { user(login: $login) { id } }
"#;

pub const ITEM_CONTENT_ID: &str = r#"
query ItemContentId($id: ID!) {
  node(id: $id) {
    ... on ProjectV2Item {
      content {
        ... on Issue { id }
        ... on PullRequest { id }
        ... on DraftIssue { id }
      }
    }
  }
}
"#;

pub const ADD_ASSIGNEES: &str = r#"
mutation AddAssignees($assignable: ID!, $assignees: [ID!]!) {
  addAssigneesToAssignable(input: {assignableId: $assignable, assigneeIds: $assignees}) { clientMutationId }
}
"#;

pub fn project_by_number_query() -> String {
    format!("{}{}", PROJECT_BY_NUMBER, PROJECT_FRAGMENT)
}

pub fn project_by_id_query() -> String {
    format!("{}{}", PROJECT_BY_ID, PROJECT_FRAGMENT)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectByNumberData {
    pub repository_owner: Option<OwnerNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerNode {
    pub project_v2: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct NodeData<T> {
    pub node: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectNode {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub fields: Connection<FieldNode>,
    pub views: Connection<ViewNode>,
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
}

impl<T> Connection<T> {
    fn into_nodes(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub data_type: Option<String>,
    pub options: Option<Vec<FieldOptionNode>>,
    pub configuration: Option<IterationConfigNode>,
}

#[derive(Debug, Deserialize)]
pub struct FieldOptionNode {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationConfigNode {
    #[serde(default)]
    pub iterations: Vec<IterationNode>,
    #[serde(default)]
    pub completed_iterations: Vec<IterationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationNode {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ViewNode {
    pub id: String,
    pub name: String,
    pub layout: String,
}

impl ProjectNode {
    pub fn into_project(self) -> Project {
        let fields = self
            .fields
            .into_nodes()
            .filter_map(|node| {
                let (id, name, data_type) = (node.id?, node.name?, node.data_type?);
                let iterations = node
                    .configuration
                    .map(|config| {
                        config
                            .iterations
                            .into_iter()
                            .chain(config.completed_iterations)
                            .map(|it| IterationOption {
                                id: it.id,
                                title: it.title,
                                start_date: it.start_date,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(ProjectField {
                    id,
                    name,
                    data_type: FieldDataType::from_graphql(&data_type),
                    options: node
                        .options
                        .unwrap_or_default()
                        .into_iter()
                        .map(|o| FieldOption { id: o.id, name: o.name })
                        .collect(),
                    iterations,
                })
            })
            .collect();

        let views = self
            .views
            .into_nodes()
            .map(|v| ProjectView {
                id: v.id,
                name: v.name,
                layout: v.layout,
            })
            .collect();

        Project {
            id: self.id,
            number: self.number,
            title: self.title,
            fields,
            views,
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ItemsNode {
    pub items: ItemConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<ItemNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content: Option<ContentNode>,
    pub field_values: Connection<FieldValueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: Option<String>,
    pub title: Option<String>,
    pub number: Option<u64>,
    pub state: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub assignees: Option<Connection<LoginNode>>,
    pub milestone: Option<MilestoneNode>,
}

#[derive(Debug, Deserialize)]
pub struct LoginNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneNode {
    pub title: String,
    pub due_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueNode {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub name: Option<String>,
    pub text: Option<String>,
    pub number: Option<f64>,
    pub date: Option<NaiveDate>,
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub field: Option<FieldNameNode>,
}

#[derive(Debug, Deserialize)]
pub struct FieldNameNode {
    pub name: Option<String>,
}

impl FieldValueNode {
    fn into_entry(self) -> Option<(String, ItemFieldValue)> {
        let field = self.field.and_then(|f| f.name)?;
        let value = match self.typename.as_str() {
            "ProjectV2ItemFieldSingleSelectValue" => ItemFieldValue::SingleSelect(self.name?),
            "ProjectV2ItemFieldTextValue" => ItemFieldValue::Text(self.text?),
            "ProjectV2ItemFieldNumberValue" => ItemFieldValue::Number(self.number?),
            "ProjectV2ItemFieldDateValue" => ItemFieldValue::Date(self.date?),
            "ProjectV2ItemFieldIterationValue" => ItemFieldValue::Iteration {
                title: self.title?,
                start_date: self.start_date?,
            },
            // Labels, reviewers, repository and similar system values
            _ => return None,
        };
        Some((field, value))
    }
}

impl ItemNode {
    pub fn into_item(self) -> Item {
        let item_type = match self.item_type.as_str() {
            "ISSUE" => ItemType::Issue,
            "PULL_REQUEST" => ItemType::PullRequest,
            "DRAFT_ISSUE" => ItemType::DraftIssue,
            _ => ItemType::Redacted,
        };

        let field_values: BTreeMap<String, ItemFieldValue> = self
            .field_values
            .into_nodes()
            .filter_map(FieldValueNode::into_entry)
            .collect();

        let content = self.content;
        let completed_at = content
            .as_ref()
            .and_then(|c| c.merged_at.or(c.closed_at));
        let assignees = content
            .as_ref()
            .and_then(|c| c.assignees.as_ref())
            .map(|conn| {
                conn.nodes
                    .iter()
                    .flatten()
                    .map(|n| n.login.clone())
                    .collect()
            })
            .unwrap_or_default();

        Item {
            id: self.id,
            item_type,
            content_id: content.as_ref().and_then(|c| c.id.clone()),
            title: content
                .as_ref()
                .and_then(|c| c.title.clone())
                .unwrap_or_else(|| "(redacted)".to_string()),
            number: content.as_ref().and_then(|c| c.number),
            state: content.as_ref().and_then(|c| c.state.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at,
            assignees,
            milestone: content.and_then(|c| c.milestone).map(|m| Milestone {
                title: m.title,
                due_on: m.due_on.map(|d| d.date_naive()),
            }),
            archived: self.is_archived,
            field_values,
        }
    }
}

impl ItemConnection {
    pub fn into_page(self) -> ItemPage {
        let next_cursor = if self.page_info.has_next_page {
            self.page_info.end_cursor
        } else {
            None
        };
        ItemPage {
            items: self.nodes.into_iter().flatten().map(ItemNode::into_item).collect(),
            next_cursor,
        }
    }
}

// ---------------------------------------------------------------------------
// Small lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ViewerData {
    pub viewer: LoginNode,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
pub struct IdNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemContentNode {
    pub content: Option<IdNode>,
}

/// Map GraphQL `errors` into a provider error, first error wins
pub fn classify_errors(errors: &[GraphQlError]) -> ProviderError {
    use super::constants::error_types;

    let Some(first) = errors.first() else {
        return ProviderError::Decode("response contained neither data nor errors".into());
    };
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    match first.error_type.as_deref() {
        Some(error_types::NOT_FOUND) => ProviderError::NotFound(message),
        Some(error_types::FORBIDDEN) | Some(error_types::INSUFFICIENT_SCOPES) => {
            ProviderError::AccessDenied(message)
        }
        Some(error_types::RATE_LIMITED) => ProviderError::Unavailable(message),
        _ => ProviderError::Rejected(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_node_decoding() {
        let raw = json!({
            "id": "PVTI_a",
            "type": "PULL_REQUEST",
            "isArchived": false,
            "createdAt": "2024-04-01T10:00:00Z",
            "updatedAt": "2024-04-03T10:00:00Z",
            "content": {
                "__typename": "PullRequest",
                "id": "PR_1",
                "title": "Add retries",
                "number": 42,
                "state": "MERGED",
                "createdAt": "2024-03-30T10:00:00Z",
                "closedAt": "2024-04-02T12:00:00Z",
                "mergedAt": "2024-04-02T11:00:00Z",
                "assignees": { "nodes": [{ "login": "octocat" }] },
                "milestone": { "title": "v1.0", "dueOn": "2024-05-01T07:00:00Z" }
            },
            "fieldValues": { "nodes": [
                { "__typename": "ProjectV2ItemFieldSingleSelectValue", "name": "Done", "field": { "name": "Status" } },
                { "__typename": "ProjectV2ItemFieldNumberValue", "number": 3.0, "field": { "name": "Estimate" } },
                { "__typename": "ProjectV2ItemFieldRepositoryValue", "field": { "name": "Repository" } }
            ] }
        });

        let node: ItemNode = serde_json::from_value(raw).unwrap();
        let item = node.into_item();

        assert_eq!(item.item_type, ItemType::PullRequest);
        assert_eq!(item.content_id.as_deref(), Some("PR_1"));
        assert_eq!(item.status(), Some("Done"));
        assert_eq!(item.field("estimate"), Some(&ItemFieldValue::Number(3.0)));
        assert_eq!(item.field_values.len(), 2);
        assert_eq!(item.assignees, vec!["octocat".to_string()]);
        // merged wins over closed
        assert_eq!(
            item.completed_at.unwrap().to_rfc3339(),
            "2024-04-02T11:00:00+00:00"
        );
        assert_eq!(
            item.milestone.unwrap().due_on,
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn test_page_cursor_only_when_more_pages() {
        let last: ItemConnection = serde_json::from_value(json!({
            "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29y" },
            "nodes": []
        }))
        .unwrap();
        assert_eq!(last.into_page().next_cursor, None);

        let more: ItemConnection = serde_json::from_value(json!({
            "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29y" },
            "nodes": []
        }))
        .unwrap();
        assert_eq!(more.into_page().next_cursor.as_deref(), Some("Y3Vyc29y"));
    }

    #[test]
    fn test_project_node_skips_unnamed_fields() {
        let node: ProjectNode = serde_json::from_value(json!({
            "id": "PVT_1",
            "number": 3,
            "title": "Roadmap",
            "fields": { "nodes": [
                { "id": "F1", "name": "Status", "dataType": "SINGLE_SELECT",
                  "options": [{ "id": "o1", "name": "Todo" }, { "id": "o2", "name": "Done" }] },
                { "id": "F2", "name": "Sprint", "dataType": "ITERATION",
                  "configuration": {
                      "iterations": [{ "id": "i2", "title": "Sprint 2", "startDate": "2024-02-01" }],
                      "completedIterations": [{ "id": "i1", "title": "Sprint 1", "startDate": "2024-01-15" }]
                  } },
                {}
            ] },
            "views": { "nodes": [{ "id": "V1", "name": "Board", "layout": "BOARD_LAYOUT" }] }
        }))
        .unwrap();

        let project = node.into_project();
        assert_eq!(project.fields.len(), 2);
        assert_eq!(project.field("status").unwrap().options.len(), 2);
        assert_eq!(project.field("Sprint").unwrap().iterations.len(), 2);
        assert_eq!(project.views.len(), 1);
    }

    #[test]
    fn test_error_classification() {
        let errors = vec![GraphQlError {
            message: "Could not resolve to a ProjectV2 with the number 9.".into(),
            error_type: Some("NOT_FOUND".into()),
        }];
        assert!(matches!(classify_errors(&errors), ProviderError::NotFound(_)));

        let errors = vec![GraphQlError {
            message: "Your token has not been granted the required scopes".into(),
            error_type: Some("INSUFFICIENT_SCOPES".into()),
        }];
        assert!(matches!(classify_errors(&errors), ProviderError::AccessDenied(_)));

        let errors = vec![GraphQlError {
            message: "Something".into(),
            error_type: None,
        }];
        assert!(matches!(classify_errors(&errors), ProviderError::Rejected(_)));
    }

    #[test]
    fn test_viewer_and_assignee_logins_share_a_node() {
        let viewer: ViewerData = serde_json::from_value(json!({ "viewer": { "login": "octocat" } })).unwrap();
        assert_eq!(viewer.viewer.login, "octocat");

        let assignees: Connection<LoginNode> =
            serde_json::from_value(json!({ "nodes": [{ "login": "amy" }, { "login": "bob" }] })).unwrap();
        let logins: Vec<String> = assignees.into_nodes().map(|n| n.login).collect();
        assert_eq!(logins, vec!["amy", "bob"]);
    }
}
