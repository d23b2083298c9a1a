//! Provider selection for connection-string lookups

use crate::provider::{DbProvider, ProviderName};

/// Which connection strings a caller wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// No filtering
    #[default]
    All,
    /// A known provider kind
    Kind(DbProvider),
    /// A provider string, classified like a `_ProviderName` value
    Name(String),
}

impl Selector {
    /// Resolve the selector into the provider name used for filtering.
    ///
    /// `None` means "everything". Blank names select everything; the literal
    /// name `custom` selects every custom entry regardless of its name.
    pub fn to_provider_name(&self) -> Option<ProviderName> {
        match self {
            Selector::All => None,
            Selector::Kind(kind) => Some(ProviderName::kind_only(*kind)),
            Selector::Name(name) if name.trim().is_empty() => None,
            Selector::Name(name) if name.trim().eq_ignore_ascii_case("custom") => {
                Some(ProviderName::kind_only(DbProvider::Custom))
            }
            Selector::Name(name) => Some(ProviderName::classify(Some(name))),
        }
    }
}

impl From<DbProvider> for Selector {
    fn from(kind: DbProvider) -> Self {
        Selector::Kind(kind)
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl TryFrom<&serde_json::Value> for Selector {
    type Error = String;

    /// Accepts a JSON string or null; any other JSON type is rejected with a
    /// message naming that type.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Selector::All),
            serde_json::Value::String(s) => Ok(Selector::Name(s.clone())),
            other => Err(format!(
                "selector only supports a provider kind or a string (provided type '{}')",
                json_type_name(other)
            )),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_to_provider_name() {
        assert_eq!(Selector::All.to_provider_name(), None);
        assert_eq!(Selector::Name("  ".into()).to_provider_name(), None);
        assert_eq!(
            Selector::Kind(DbProvider::MySql).to_provider_name(),
            Some(ProviderName::kind_only(DbProvider::MySql))
        );
        assert_eq!(
            Selector::from("MSSQL").to_provider_name(),
            Some(ProviderName::kind_only(DbProvider::SqlServer))
        );
        assert_eq!(
            Selector::from("Custom").to_provider_name(),
            Some(ProviderName::kind_only(DbProvider::Custom))
        );
        assert_eq!(
            Selector::from("cosmos").to_provider_name(),
            Some(ProviderName::custom("COSMOS"))
        );
    }

    #[test]
    fn test_selector_from_option() {
        assert_eq!(Selector::from(None::<&str>), Selector::All);
        assert_eq!(Selector::from(Some("mysql")), Selector::Name("mysql".into()));
    }

    #[test]
    fn test_selector_from_json() {
        assert_eq!(Selector::try_from(&json!(null)).unwrap(), Selector::All);
        assert_eq!(
            Selector::try_from(&json!("npgsql")).unwrap(),
            Selector::Name("npgsql".into())
        );

        let err = Selector::try_from(&json!(42)).unwrap_err();
        assert!(err.contains("number"));
        let err = Selector::try_from(&json!({"kind": "mysql"})).unwrap_err();
        assert!(err.contains("object"));
    }
}
