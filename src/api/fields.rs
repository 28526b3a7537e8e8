//! Coercion of user-supplied field values into `ProjectV2FieldValue` inputs

use super::models::{FieldDataType, FieldValue, ProjectField};
use crate::error::ProviderError;
use chrono::NaiveDate;
use serde_json::{Value, json};

/// Build the GraphQL `value` input for `field`. `FieldValue::Clear` has no
/// input form and is rejected here; callers issue a clear mutation instead.
pub fn coerce(field: &ProjectField, value: &FieldValue) -> Result<Value, ProviderError> {
    let invalid = |reason: String| {
        ProviderError::InvalidValue(format!("field '{}': {}", field.name, reason))
    };

    match (&field.data_type, value) {
        (_, FieldValue::Clear) => Err(invalid("clear has no value form".into())),

        (FieldDataType::Text, other) => Ok(json!({ "text": other.to_string() })),

        (FieldDataType::Number, FieldValue::Number(n)) => Ok(json!({ "number": n })),
        (FieldDataType::Number, FieldValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(|n| json!({ "number": n }))
            .map_err(|_| invalid(format!("'{}' is not a number", s))),
        (FieldDataType::Number, other) => Err(invalid(format!("'{}' is not a number", other))),

        (FieldDataType::Date, FieldValue::Date(d)) => Ok(json!({ "date": d.to_string() })),
        (FieldDataType::Date, FieldValue::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(|d| json!({ "date": d.to_string() }))
            .map_err(|_| invalid(format!("'{}' is not a YYYY-MM-DD date", s))),
        (FieldDataType::Date, other) => Err(invalid(format!("'{}' is not a date", other))),

        (FieldDataType::SingleSelect, other) => {
            let wanted = other.to_string();
            field
                .options
                .iter()
                .find(|o| o.name.eq_ignore_ascii_case(wanted.trim()))
                .map(|o| json!({ "singleSelectOptionId": o.id }))
                .ok_or_else(|| {
                    let known: Vec<&str> = field.options.iter().map(|o| o.name.as_str()).collect();
                    invalid(format!("no option '{}' (options: {})", wanted, known.join(", ")))
                })
        }

        (FieldDataType::Iteration, other) => {
            let wanted = other.to_string();
            field
                .iterations
                .iter()
                .find(|it| it.title.eq_ignore_ascii_case(wanted.trim()))
                .map(|it| json!({ "iterationId": it.id }))
                .ok_or_else(|| invalid(format!("no iteration '{}'", wanted)))
        }

        (FieldDataType::Other(kind), _) => {
            Err(invalid(format!("{} fields cannot be set through projects", kind)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{FieldOption, IterationOption};

    fn field(data_type: FieldDataType) -> ProjectField {
        ProjectField {
            id: "F".into(),
            name: "Field".into(),
            data_type,
            options: vec![
                FieldOption { id: "opt-todo".into(), name: "Todo".into() },
                FieldOption { id: "opt-done".into(), name: "Done".into() },
            ],
            iterations: vec![IterationOption {
                id: "it-1".into(),
                title: "Sprint 1".into(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            }],
        }
    }

    #[test]
    fn test_single_select_matches_option_name_case_insensitively() {
        let value = coerce(&field(FieldDataType::SingleSelect), &FieldValue::text("done")).unwrap();
        assert_eq!(value, json!({ "singleSelectOptionId": "opt-done" }));

        let err = coerce(&field(FieldDataType::SingleSelect), &FieldValue::text("Blocked"));
        assert!(matches!(err, Err(ProviderError::InvalidValue(msg)) if msg.contains("Todo, Done")));
    }

    #[test]
    fn test_number_and_date_parsing() {
        assert_eq!(
            coerce(&field(FieldDataType::Number), &FieldValue::text(" 5 ")).unwrap(),
            json!({ "number": 5.0 })
        );
        assert!(coerce(&field(FieldDataType::Number), &FieldValue::text("five")).is_err());

        assert_eq!(
            coerce(&field(FieldDataType::Date), &FieldValue::text("2024-06-30")).unwrap(),
            json!({ "date": "2024-06-30" })
        );
        assert!(coerce(&field(FieldDataType::Date), &FieldValue::text("30/06/2024")).is_err());
    }

    #[test]
    fn test_text_iteration_and_readonly_fields() {
        assert_eq!(
            coerce(&field(FieldDataType::Text), &FieldValue::Number(2.5)).unwrap(),
            json!({ "text": "2.5" })
        );
        assert_eq!(
            coerce(&field(FieldDataType::Iteration), &FieldValue::text("sprint 1")).unwrap(),
            json!({ "iterationId": "it-1" })
        );
        assert!(coerce(&field(FieldDataType::Other("ASSIGNEES".into())), &FieldValue::text("x")).is_err());
        assert!(coerce(&field(FieldDataType::Text), &FieldValue::Clear).is_err());
    }
}
