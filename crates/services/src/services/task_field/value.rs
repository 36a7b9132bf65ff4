//! Type checks that need nothing but the raw value.

use chrono::DateTime;
use db::models::{task_field::FieldType, template::FieldTemplate, task_field::TaskField};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::{
    error::{STRING_MAX_LENGTH, TaskFieldError},
    selection::Selection,
};

const DATE_FORMAT: &str = "%b %d, %Y, %I:%M%p";

/// What validation needs to know about a field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules<'a> {
    pub field_type: FieldType,
    pub name: &'a str,
    pub api_name: &'a str,
    pub is_required: bool,
}

impl<'a> From<&'a FieldTemplate> for FieldRules<'a> {
    fn from(template: &'a FieldTemplate) -> Self {
        Self {
            field_type: template.field_type,
            name: &template.name,
            api_name: &template.api_name,
            is_required: template.is_required,
        }
    }
}

impl<'a> From<&'a TaskField> for FieldRules<'a> {
    fn from(field: &'a TaskField) -> Self {
        Self {
            field_type: field.field_type,
            name: &field.name,
            api_name: &field.api_name,
            is_required: field.is_required,
        }
    }
}

impl FieldRules<'_> {
    pub(super) fn api_name(&self) -> String {
        self.api_name.to_string()
    }
}

/// Value and markdown forms of a validated raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub value: String,
    pub markdown: String,
}

impl Rendered {
    pub fn same(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            markdown: value.clone(),
            value,
        }
    }
}

/// `null`, `""` and `[]` count as no value.
pub fn is_empty(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

pub fn string(rules: FieldRules<'_>, raw: &Value) -> Result<Rendered, TaskFieldError> {
    let text = raw.as_str().ok_or_else(|| TaskFieldError::NotString {
        api_name: rules.api_name(),
    })?;
    if rules.field_type == FieldType::String {
        if text.chars().count() > STRING_MAX_LENGTH {
            return Err(TaskFieldError::StringTooLong {
                api_name: rules.api_name(),
            });
        }
        if text.contains(['\n', '\r']) {
            return Err(TaskFieldError::LineBreak {
                api_name: rules.api_name(),
            });
        }
    }
    Ok(Rendered::same(text))
}

pub fn single_selection<S: Selection>(
    rules: FieldRules<'_>,
    raw: &Value,
    selections: &[S],
) -> Result<Rendered, TaskFieldError> {
    raw.as_str()
        .and_then(|name| selections.iter().find(|s| s.is_named_by(name)))
        .map(|selection| Rendered::same(selection.value()))
        .ok_or_else(|| TaskFieldError::InvalidSelection {
            api_name: rules.api_name(),
        })
}

pub fn multi_selection<S: Selection>(
    rules: FieldRules<'_>,
    raw: &Value,
    selections: &[S],
) -> Result<Rendered, TaskFieldError> {
    let items = raw.as_array().ok_or_else(|| TaskFieldError::NotList {
        api_name: rules.api_name(),
    })?;
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        let name = item.as_str().ok_or_else(|| TaskFieldError::ItemNotString {
            api_name: rules.api_name(),
        })?;
        if !selections.iter().any(|s| s.is_named_by(name)) {
            return Err(TaskFieldError::SelectionNotFound {
                api_name: rules.api_name(),
                selection: name.to_string(),
            });
        }
        names.push(name);
    }
    let values: Vec<&str> = selections
        .iter()
        .filter(|s| names.iter().any(|name| s.is_named_by(name)))
        .map(|s| s.value())
        .collect();
    Ok(Rendered::same(values.join(", ")))
}

pub fn date(rules: FieldRules<'_>, raw: &Value) -> Result<Rendered, TaskFieldError> {
    let invalid = || TaskFieldError::InvalidDate {
        api_name: rules.api_name(),
    };
    let Value::Number(number) = raw else {
        return Err(invalid());
    };
    let timestamp = number.as_f64().filter(|t| t.is_finite()).ok_or_else(invalid)?;
    let seconds = timestamp.floor();
    let nanos = ((timestamp - seconds) * 1_000_000_000.0) as u32;
    let date = DateTime::from_timestamp(seconds as i64, nanos.min(999_999_999)).ok_or_else(invalid)?;
    Ok(Rendered {
        value: number.to_string(),
        markdown: date.format(DATE_FORMAT).to_string(),
    })
}

pub fn url(rules: FieldRules<'_>, raw: &Value) -> Result<Rendered, TaskFieldError> {
    let text = raw.as_str().ok_or_else(|| TaskFieldError::UrlNotString {
        api_name: rules.api_name(),
    })?;
    let parsed = Url::parse(text).map_err(|_| TaskFieldError::InvalidUrl {
        api_name: rules.api_name(),
    })?;
    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(parsed.scheme(), "http" | "https") || !has_host {
        return Err(TaskFieldError::InvalidUrl {
            api_name: rules.api_name(),
        });
    }
    Ok(Rendered {
        value: text.to_string(),
        markdown: format!("[{}]({})", rules.name, text),
    })
}

/// Attachment ids of a file field, deduplicated, in the given order.
/// Any empty value clears the field.
pub fn attachment_ids(rules: FieldRules<'_>, raw: &Value) -> Result<Vec<Uuid>, TaskFieldError> {
    if is_empty(raw) {
        return Ok(Vec::new());
    }
    let invalid = || TaskFieldError::InvalidAttachments {
        api_name: rules.api_name(),
    };
    let items = raw.as_array().ok_or_else(invalid)?;
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(invalid)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use db::models::template::FieldTemplateSelection;
    use serde_json::json;

    use super::*;

    fn rules(field_type: FieldType) -> FieldRules<'static> {
        FieldRules {
            field_type,
            name: "Contract",
            api_name: "contract",
            is_required: false,
        }
    }

    fn choices() -> Vec<FieldTemplateSelection> {
        ["low", "mid", "high"]
            .into_iter()
            .map(|name| FieldTemplateSelection {
                id: Uuid::new_v4(),
                field_template_id: Uuid::nil(),
                value: name.to_uppercase(),
                api_name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_values() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&json!(" ")));
        assert!(!is_empty(&json!(0)));
    }

    #[test]
    fn string_rules() {
        let ok = string(rules(FieldType::String), &json!("Acme")).unwrap();
        assert_eq!(ok, Rendered::same("Acme"));

        let long = "x".repeat(STRING_MAX_LENGTH + 1);
        assert!(matches!(
            string(rules(FieldType::String), &json!(long)),
            Err(TaskFieldError::StringTooLong { .. })
        ));
        assert!(matches!(
            string(rules(FieldType::String), &json!("a\nb")),
            Err(TaskFieldError::LineBreak { .. })
        ));
        assert!(string(rules(FieldType::Text), &json!("a\nb")).is_ok());
        assert!(string(rules(FieldType::Text), &json!("x".repeat(1000))).is_ok());

        let err = string(rules(FieldType::Text), &json!(12)).unwrap_err();
        assert_eq!(err.api_name(), Some("contract"));
    }

    #[test]
    fn single_selection_by_api_name_or_id() {
        let choices = choices();
        let by_name = single_selection(rules(FieldType::Radio), &json!("mid"), &choices).unwrap();
        assert_eq!(by_name.value, "MID");

        let id = choices[2].id.to_string();
        let by_id = single_selection(rules(FieldType::Dropdown), &json!(id), &choices).unwrap();
        assert_eq!(by_id.markdown, "HIGH");

        assert!(matches!(
            single_selection(rules(FieldType::Radio), &json!("none"), &choices),
            Err(TaskFieldError::InvalidSelection { .. })
        ));
        assert!(matches!(
            single_selection(rules(FieldType::Radio), &json!(["mid"]), &choices),
            Err(TaskFieldError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn multi_selection_keeps_selection_order() {
        let choices = choices();
        let rendered =
            multi_selection(rules(FieldType::Checkbox), &json!(["high", "low"]), &choices).unwrap();
        assert_eq!(rendered.value, "LOW, HIGH");

        assert!(matches!(
            multi_selection(rules(FieldType::Checkbox), &json!("low"), &choices),
            Err(TaskFieldError::NotList { .. })
        ));
        assert!(matches!(
            multi_selection(rules(FieldType::Checkbox), &json!(["low", 3]), &choices),
            Err(TaskFieldError::ItemNotString { .. })
        ));
        match multi_selection(rules(FieldType::Checkbox), &json!(["low", "max"]), &choices) {
            Err(TaskFieldError::SelectionNotFound { selection, .. }) => assert_eq!(selection, "max"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn date_renders_in_utc() {
        let rendered = date(rules(FieldType::Date), &json!(176516132)).unwrap();
        assert_eq!(rendered.value, "176516132");
        assert_eq!(rendered.markdown, "Aug 06, 1975, 12:15AM");

        let float = date(rules(FieldType::Date), &json!(176516132.5)).unwrap();
        assert_eq!(float.value, "176516132.5");
        assert_eq!(float.markdown, "Aug 06, 1975, 12:15AM");

        assert!(matches!(
            date(rules(FieldType::Date), &json!("176516132")),
            Err(TaskFieldError::InvalidDate { .. })
        ));
        assert!(matches!(
            date(rules(FieldType::Date), &json!(1e300)),
            Err(TaskFieldError::InvalidDate { .. })
        ));
    }

    #[test]
    fn url_rules() {
        let rendered = url(rules(FieldType::Url), &json!("https://example.com/a?b=1")).unwrap();
        assert_eq!(rendered.value, "https://example.com/a?b=1");
        assert_eq!(rendered.markdown, "[Contract](https://example.com/a?b=1)");

        assert!(matches!(
            url(rules(FieldType::Url), &json!(5)),
            Err(TaskFieldError::UrlNotString { .. })
        ));
        for bad in ["example.com", "ftp://example.com", "https://", "not a url"] {
            assert!(
                matches!(
                    url(rules(FieldType::Url), &json!(bad)),
                    Err(TaskFieldError::InvalidUrl { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn attachment_ids_are_parsed_and_deduplicated() {
        let id = Uuid::new_v4();
        let ids = attachment_ids(
            rules(FieldType::File),
            &json!([id.to_string(), id.to_string()]),
        )
        .unwrap();
        assert_eq!(ids, vec![id]);
        for empty in [Value::Null, json!(""), json!([])] {
            assert!(attachment_ids(rules(FieldType::File), &empty).unwrap().is_empty());
        }
        assert!(matches!(
            attachment_ids(rules(FieldType::File), &json!(["nope"])),
            Err(TaskFieldError::InvalidAttachments { .. })
        ));
        assert!(matches!(
            attachment_ids(rules(FieldType::File), &json!(id.to_string())),
            Err(TaskFieldError::InvalidAttachments { .. })
        ));
    }
}
