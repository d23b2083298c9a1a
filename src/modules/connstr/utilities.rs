//! Treating a connection string's `key=value;...` pairs as configuration

use layerconf_core::{ConfigData, ConfigError, Configuration, ConfigurationBuilder, MemorySource, Result};
use serde::de::DeserializeOwned;

/// Split a connection string into its key/value pairs.
///
/// Keys and values are trimmed. Values may be wrapped in single or double
/// quotes, inside which a doubled quote stands for one quote character. A
/// doubled `==` in a key stands for `=`. An empty unquoted value removes the
/// key; when a key repeats, the last value wins.
pub fn parse_pairs(connection_string: &str) -> Result<ConfigData> {
    let mut data = ConfigData::new();
    let chars: Vec<char> = connection_string.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && (chars[i] == ';' || chars[i].is_whitespace()) {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let mut key = String::new();
        loop {
            match chars.get(i) {
                Some('=') if chars.get(i + 1) == Some(&'=') => {
                    key.push('=');
                    i += 2;
                }
                Some('=') => {
                    i += 1;
                    break;
                }
                Some(';') | None => {
                    return Err(invalid(format!("missing '=' after key '{}'", key.trim())));
                }
                Some(c) => {
                    key.push(*c);
                    i += 1;
                }
            }
        }
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(invalid("empty key".to_string()));
        }

        while i < chars.len() && chars[i].is_whitespace() && chars[i] != ';' {
            i += 1;
        }

        match chars.get(i) {
            Some(&quote) if quote == '"' || quote == '\'' => {
                i += 1;
                let mut value = String::new();
                loop {
                    match chars.get(i) {
                        Some(&c) if c == quote && chars.get(i + 1) == Some(&quote) => {
                            value.push(quote);
                            i += 2;
                        }
                        Some(&c) if c == quote => {
                            i += 1;
                            break;
                        }
                        Some(&c) => {
                            value.push(c);
                            i += 1;
                        }
                        None => return Err(invalid(format!("unterminated quote in value of '{}'", key))),
                    }
                }
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if i < chars.len() && chars[i] != ';' {
                    return Err(invalid(format!("unexpected text after quoted value of '{}'", key)));
                }
                data.set(key, value);
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != ';' {
                    i += 1;
                }
                let value: String = chars[start..i].iter().collect();
                let value = value.trim();
                if value.is_empty() {
                    data.remove(&key);
                } else {
                    data.set(key, value);
                }
            }
        }
    }

    Ok(data)
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidArgument(format!("Format of the connection string is invalid: {}", message))
}

/// The pairs of `connection_string` as an in-memory configuration
pub fn to_configuration(connection_string: &str) -> Result<Configuration> {
    let data = parse_pairs(connection_string)?;
    let mut builder = ConfigurationBuilder::new();
    builder.add(MemorySource::new(data.iter()));
    builder.build()
}

/// Bind the pairs of `connection_string` to `T`
pub fn get_as<T: DeserializeOwned>(connection_string: &str) -> Result<T> {
    to_configuration(connection_string)?.get_as()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct ServiceOptions {
        provider: Option<String>,
        account_endpoint: Option<String>,
        account_key: Option<String>,
        number: Option<i32>,
        amount: Option<f64>,
        url: Option<String>,
    }

    #[test]
    fn test_empty_connection_string() {
        let config = to_configuration("").unwrap();
        assert_eq!(config.provider_count(), 1);
        assert!(config.children().is_empty());
    }

    #[test]
    fn test_full_connection_string() {
        let input = " provider = \" The Name \" ; accountEndpoint = ; AccountKey= Pa$$w0rd ; Number = -1234 ; AMOUNT = 3.14159";
        let config = to_configuration(input).unwrap();
        assert_eq!(config.get("AccountEndpoint"), None);

        let options: ServiceOptions = config.get_as().unwrap();
        assert_eq!(options.provider.as_deref(), Some(" The Name "));
        assert_eq!(options.account_endpoint, None);
        assert_eq!(options.account_key.as_deref(), Some("Pa$$w0rd"));
        assert_eq!(options.number, Some(-1234));
        assert_eq!(options.amount, Some(3.14159));
    }

    #[test]
    fn test_quoted_empty_value_is_kept() {
        let options: ServiceOptions =
            get_as(" accountEndpoint = \"\" ; url = file:///C:/Temp/Document.pdf ").unwrap();
        assert_eq!(options.account_endpoint.as_deref(), Some(""));
        assert_eq!(options.url.as_deref(), Some("file:///C:/Temp/Document.pdf"));
    }

    #[test]
    fn test_partial_connection_string() {
        let options: ServiceOptions =
            get_as("accountEndpoint=https://7d48.documents.azure.com:443/;").unwrap();
        assert_eq!(
            options.account_endpoint.as_deref(),
            Some("https://7d48.documents.azure.com:443/")
        );
        assert_eq!(options.account_key, None);
    }

    #[test]
    fn test_escapes_and_duplicates() {
        let data = parse_pairs("a==b = 'it''s' ; Name=first; name=second; q=\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(data.get("a=b"), Some("it's"));
        assert_eq!(data.get("NAME"), Some("second"));
        assert_eq!(data.get("q"), Some("say \"hi\""));
    }

    #[test]
    fn test_invalid_connection_strings() {
        for input in ["novalue", "=value", "a='open", "a='x' trailing"] {
            let err = parse_pairs(input).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidArgument(_)), "{}", input);
        }
    }
}
