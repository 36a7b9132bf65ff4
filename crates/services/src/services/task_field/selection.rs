use db::models::{field_selection::FieldSelection, template::FieldTemplateSelection};
use serde_json::Value;
use uuid::Uuid;

/// A choice of a radio, dropdown or checkbox field.
pub trait Selection {
    fn id(&self) -> Uuid;
    fn value(&self) -> &str;
    fn api_name(&self) -> &str;

    /// Selections are addressed by id or by api name.
    fn is_named_by(&self, name: &str) -> bool {
        name == self.api_name() || Uuid::parse_str(name).is_ok_and(|id| id == self.id())
    }
}

impl Selection for FieldTemplateSelection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

impl Selection for FieldSelection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

/// Whether a raw field value picks `selection`: a string names one
/// selection, a list names several.
pub fn is_selected_by(raw: &Value, selection: &impl Selection) -> bool {
    match raw {
        Value::String(name) => selection.is_named_by(name),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|name| selection.is_named_by(name)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn choice(api_name: &str) -> FieldTemplateSelection {
        FieldTemplateSelection {
            id: Uuid::new_v4(),
            field_template_id: Uuid::new_v4(),
            value: api_name.to_uppercase(),
            api_name: api_name.to_string(),
        }
    }

    #[test]
    fn named_by_id_or_api_name() {
        let red = choice("red");
        assert!(red.is_named_by("red"));
        assert!(red.is_named_by(&red.id.to_string()));
        assert!(red.is_named_by(&red.id.to_string().to_uppercase()));
        assert!(!red.is_named_by("RED"));
    }

    #[test]
    fn raw_values_select() {
        let red = choice("red");
        assert!(is_selected_by(&json!("red"), &red));
        assert!(is_selected_by(&json!(["blue", "red"]), &red));
        assert!(!is_selected_by(&json!(["blue", 1]), &red));
        assert!(!is_selected_by(&Value::Null, &red));
    }
}
