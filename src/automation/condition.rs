//! Workflow condition predicates

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Predicate over an event payload. Field names match case-insensitively,
/// values exactly; a field missing from the payload never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals { field: String, value: String },
    OneOf { field: String, values: Vec<String> },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn evaluate(&self, payload: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals { field, value } => {
                lookup(payload, field).is_some_and(|v| v == value.as_str())
            }
            Self::OneOf { field, values } => lookup(payload, field)
                .is_some_and(|v| values.iter().any(|candidate| candidate.as_str() == v)),
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(payload)),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(payload)),
        }
    }

    /// Every field name the condition reads
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Equals { field, .. } | Self::OneOf { field, .. } => vec![field.as_str()],
            Self::All(conditions) | Self::Any(conditions) => {
                conditions.iter().flat_map(|c| c.fields()).collect()
            }
        }
    }
}

fn lookup<'a>(payload: &'a BTreeMap<String, String>, field: &str) -> Option<&'a str> {
    payload
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(field))
        .map(|(_, value)| value.as_str())
}

/// Parses the short command-line forms:
/// `field=value`, `field in a|b|c`, and `&&` / `||` between them
/// (`&&` binds tighter).
impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alternatives = s
            .split("||")
            .map(parse_conjunction)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collapse(alternatives, Condition::Any))
    }
}

fn parse_conjunction(s: &str) -> Result<Condition, String> {
    let terms = s
        .split("&&")
        .map(parse_term)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collapse(terms, Condition::All))
}

fn parse_term(s: &str) -> Result<Condition, String> {
    let term = s.trim();

    if let Some((field, value)) = term.split_once('=') {
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("condition '{}' has no field name", term));
        }
        return Ok(Condition::equals(field, value.trim()));
    }

    if let Some((field, values)) = term.split_once(" in ") {
        let field = field.trim();
        let values: Vec<String> = values
            .split('|')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if field.is_empty() || values.is_empty() {
            return Err(format!("condition '{}' needs a field and at least one value", term));
        }
        return Ok(Condition::OneOf {
            field: field.to_string(),
            values,
        });
    }

    Err(format!(
        "cannot parse condition '{}' (expected field=value or field in a|b)",
        term
    ))
}

fn collapse(mut conditions: Vec<Condition>, group: fn(Vec<Condition>) -> Condition) -> Condition {
    if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        group(conditions)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { field, value } => write!(f, "{}={}", field, value),
            Self::OneOf { field, values } => write!(f, "{} in {}", field, values.join("|")),
            Self::All(conditions) => join(f, conditions, " && "),
            Self::Any(conditions) => join(f, conditions, " || "),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, conditions: &[Condition], separator: &str) -> fmt::Result {
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match condition {
            Condition::All(_) | Condition::Any(_) => write!(f, "({})", condition)?,
            _ => write!(f, "{}", condition)?,
        }
    }
    Ok(())
}

/// Accepts either the structured form or a legacy `field=value` string
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Legacy(String),
        Structured(Condition),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Structured(condition)) => Ok(Some(condition)),
        Some(Repr::Legacy(text)) if text.trim().is_empty() => Ok(None),
        Some(Repr::Legacy(text)) => text.parse().map(Some).map_err(D::Error::custom),
    }
}
