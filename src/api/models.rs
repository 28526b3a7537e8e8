//! Project, item and mutation types exchanged with the remote data provider

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the single-select field GitHub creates on every project
pub const STATUS_FIELD: &str = "Status";

/// `owner/number` address of a project as typed by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub owner: String,
    pub number: u32,
}

impl ProjectRef {
    pub fn new(owner: impl Into<String>, number: u32) -> Self {
        Self {
            owner: owner.into(),
            number,
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub fields: Vec<ProjectField>,
    pub views: Vec<ProjectView>,
}

impl Project {
    /// Case-insensitive lookup by field name
    pub fn field(&self, name: &str) -> Option<&ProjectField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldDataType {
    Text,
    Number,
    Date,
    SingleSelect,
    Iteration,
    /// Read-only system fields (assignees, labels, linked PRs, ...)
    Other(String),
}

impl FieldDataType {
    pub fn from_graphql(data_type: &str) -> Self {
        match data_type {
            "TEXT" => Self::Text,
            "NUMBER" => Self::Number,
            "DATE" => Self::Date,
            "SINGLE_SELECT" => Self::SingleSelect,
            "ITERATION" => Self::Iteration,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectField {
    pub id: String,
    pub name: String,
    pub data_type: FieldDataType,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub iterations: Vec<IterationOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationOption {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub layout: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Issue,
    PullRequest,
    DraftIssue,
    Redacted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub due_on: Option<NaiveDate>,
}

/// Current value of one field on one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemFieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    SingleSelect(String),
    Iteration { title: String, start_date: NaiveDate },
}

impl ItemFieldValue {
    /// Value as it reads in a condition or a table cell
    pub fn display_value(&self) -> String {
        match self {
            Self::Text(s) | Self::SingleSelect(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.to_string(),
            Self::Iteration { title, .. } => title.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub item_type: ItemType,
    /// Node id of the underlying issue / pull request / draft
    pub content_id: Option<String>,
    pub title: String,
    pub number: Option<u64>,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Closed (issues) or merged/closed (pull requests)
    pub completed_at: Option<DateTime<Utc>>,
    pub assignees: Vec<String>,
    pub milestone: Option<Milestone>,
    pub archived: bool,
    /// Keyed by field name
    pub field_values: BTreeMap<String, ItemFieldValue>,
}

impl Item {
    pub fn field(&self, name: &str) -> Option<&ItemFieldValue> {
        self.field_values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Current `Status` option, blank values treated as unset
    pub fn status(&self) -> Option<&str> {
        match self.field(STATUS_FIELD) {
            Some(ItemFieldValue::SingleSelect(name)) if !name.trim().is_empty() => Some(name),
            _ => None,
        }
    }

    /// Alphabetically first assignee login
    pub fn primary_assignee(&self) -> Option<&str> {
        self.assignees
            .iter()
            .filter(|login| !login.trim().is_empty())
            .min()
            .map(String::as_str)
    }

    /// Date work started: a `Start date`/`Start` date field, else the iteration start
    pub fn start_date(&self) -> Option<NaiveDate> {
        for name in ["Start date", "Start"] {
            if let Some(ItemFieldValue::Date(date)) = self.field(name) {
                return Some(*date);
            }
        }
        self.field_values.values().find_map(|value| match value {
            ItemFieldValue::Iteration { start_date, .. } => Some(*start_date),
            _ => None,
        })
    }

    /// Every date carried by the item: date fields, iteration starts, milestone due date
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .field_values
            .values()
            .filter_map(|value| match value {
                ItemFieldValue::Date(date) => Some(*date),
                ItemFieldValue::Iteration { start_date, .. } => Some(*start_date),
                _ => None,
            })
            .collect();
        if let Some(due) = self.milestone.as_ref().and_then(|m| m.due_on) {
            dates.push(due);
        }
        dates
    }

    /// Flat `field name -> value` map used as a workflow event payload
    pub fn payload(&self) -> BTreeMap<String, String> {
        self.field_values
            .iter()
            .map(|(name, value)| (name.clone(), value.display_value()))
            .collect()
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            item_id: self.id.clone(),
            content_id: self.content_id.clone(),
        }
    }
}

/// One page of a project's item collection
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// Handle to an item that an action is applied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl ItemRef {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            content_id: None,
        }
    }
}

/// New value for a field; coerced against the field's data type by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Clear,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "{}", d),
            Self::Text(s) => write!(f, "{}", s),
            Self::Clear => write!(f, "<clear>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn new(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// Parse a `field=value` argument; an empty value clears the field
    pub fn parse(spec: &str) -> Option<Self> {
        let (field, value) = spec.split_once('=')?;
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = if value.is_empty() {
            FieldValue::Clear
        } else {
            FieldValue::text(value)
        };
        Some(Self::new(field, value))
    }
}

/// Single-item mutation applied by a bulk operation
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMutation {
    Update(Vec<FieldUpdate>),
    Delete,
    Archive,
}

impl ItemMutation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Delete => "delete",
            Self::Archive => "archive",
        }
    }
}

/// Action a workflow can apply to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    SetField { field: String, value: FieldValue },
    MoveToStatus { status: String },
    Assign { login: String },
    Archive,
}

impl ProjectAction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "set_field",
            Self::MoveToStatus { .. } => "move_to_status",
            Self::Assign { .. } => "assign",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetField { field, value } => write!(f, "set {} = {}", field, value),
            Self::MoveToStatus { status } => write!(f, "move to {}", status),
            Self::Assign { login } => write!(f, "assign @{}", login),
            Self::Archive => write!(f, "archive"),
        }
    }
}
