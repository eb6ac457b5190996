use serde::Deserialize;
use std::collections::HashMap;

/// Naming convention applied to output field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    AsIs,
    /// Lowercase the first character only.
    #[default]
    CamelCase,
    LowerCase,
}

/// Default rename table: framework-internal keys mapped to the names
/// Logz.io dashboards expect.
pub fn default_rename_table() -> HashMap<String, String> {
    HashMap::from([
        ("SourceContext".to_string(), "logger".to_string()),
        ("ThreadId".to_string(), "thread".to_string()),
    ])
}

/// Maps raw event keys to output field names.
#[derive(Debug, Clone, Default)]
pub struct FieldTransform {
    naming: FieldNaming,
    renames: HashMap<String, String>,
}

impl FieldTransform {
    pub fn new(naming: FieldNaming, renames: HashMap<String, String>) -> Self {
        FieldTransform { naming, renames }
    }

    /// Apply the naming convention only.
    pub fn transform(&self, field: &str) -> String {
        match self.naming {
            FieldNaming::AsIs => field.to_string(),
            FieldNaming::LowerCase => field.to_lowercase(),
            FieldNaming::CamelCase => {
                let mut chars = field.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }

    /// Non-blank rename-table entry for `key`, if any.
    pub fn rename(&self, key: &str) -> Option<&str> {
        self.renames
            .get(key)
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    /// Rename-table entry taken literally, else the naming convention.
    pub fn resolve(&self, key: &str) -> String {
        match self.rename(key) {
            Some(name) => name.to_string(),
            None => self.transform(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(naming: FieldNaming) -> FieldTransform {
        FieldTransform::new(naming, HashMap::new())
    }

    #[test]
    fn camel_case_only_touches_first_char() {
        let t = plain(FieldNaming::CamelCase);
        assert_eq!(t.transform("EnrichedProperty"), "enrichedProperty");
        assert_eq!(t.transform("properties.PropInt1"), "properties.PropInt1");
        assert_eq!(t.transform("Level"), "level");
        assert_eq!(t.transform(""), "");
    }

    #[test]
    fn lower_case_and_as_is() {
        assert_eq!(
            plain(FieldNaming::LowerCase).transform("Properties.PropInt1"),
            "properties.propint1"
        );
        assert_eq!(plain(FieldNaming::AsIs).transform("MessageTemplate"), "MessageTemplate");
        assert_eq!(plain(FieldNaming::AsIs).transform(""), "");
    }

    #[test]
    fn rename_table_replaces_name_literally() {
        let t = FieldTransform::new(FieldNaming::LowerCase, default_rename_table());
        assert_eq!(t.resolve("SourceContext"), "logger");
        assert_eq!(t.resolve("ThreadId"), "thread");
        assert_eq!(t.resolve("RequestId"), "requestid");

        let shouting = FieldTransform::new(
            FieldNaming::CamelCase,
            HashMap::from([("Level".to_string(), "SEVERITY".to_string())]),
        );
        assert_eq!(shouting.resolve("Level"), "SEVERITY");
    }

    #[test]
    fn blank_rename_falls_back_to_convention() {
        let t = FieldTransform::new(
            FieldNaming::CamelCase,
            HashMap::from([("UserId".to_string(), "   ".to_string())]),
        );
        assert_eq!(t.rename("UserId"), None);
        assert_eq!(t.resolve("UserId"), "userId");
    }
}
