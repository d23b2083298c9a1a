//! File formats and flattening into `:`-delimited keys

use layerconf_core::{key, ConfigData, ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::xml::parse_xml;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Yaml,
    Toml,
    Ini,
    Xml,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Json => write!(f, "json"),
            FileFormat::Yaml => write!(f, "yaml"),
            FileFormat::Toml => write!(f, "toml"),
            FileFormat::Ini => write!(f, "ini"),
            FileFormat::Xml => write!(f, "xml"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileFormat::from_extension(s).ok_or_else(|| format!("Unknown file format: {}", s))
    }
}

impl FileFormat {
    /// Returns all supported formats
    pub fn all() -> &'static [FileFormat] {
        &[
            FileFormat::Json,
            FileFormat::Yaml,
            FileFormat::Toml,
            FileFormat::Ini,
            FileFormat::Xml,
        ]
    }

    /// Match an extension, with or without the leading dot
    pub fn from_extension(extension: &str) -> Option<FileFormat> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            "toml" => Some(FileFormat::Toml),
            "ini" => Some(FileFormat::Ini),
            "xml" => Some(FileFormat::Xml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<FileFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
    }

    /// Parse file content into flat key/value pairs
    pub fn parse(&self, content: &str, path: &Path) -> Result<ConfigData> {
        if content.trim().is_empty() {
            return Ok(ConfigData::new());
        }
        match self {
            FileFormat::Json => {
                let value: serde_json::Value = serde_json::from_str(content)
                    .map_err(|e| ConfigError::parse(path, format!("JSON parse error: {}", e)))?;
                flatten_document(value, path)
            }
            FileFormat::Yaml => {
                let value: serde_yaml::Value = serde_yaml::from_str(content)
                    .map_err(|e| ConfigError::parse(path, format!("YAML parse error: {}", e)))?;
                flatten_document(yaml_to_json(value, path)?, path)
            }
            FileFormat::Toml => {
                let value: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::parse(path, format!("TOML parse error: {}", e)))?;
                flatten_document(toml_to_json(value), path)
            }
            FileFormat::Ini => parse_ini(content, path),
            FileFormat::Xml => parse_xml(content, path),
        }
    }
}

/// Flatten a parsed document; the top level must be an object
fn flatten_document(value: serde_json::Value, path: &Path) -> Result<ConfigData> {
    let mut data = ConfigData::new();
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Object(_) => flatten_into(&mut data, "", value),
        _ => {
            return Err(ConfigError::parse(
                path,
                "top-level element must be an object",
            ))
        }
    }
    Ok(data)
}

/// Flatten a JSON value below `prefix` into `data`
pub fn flatten_into(data: &mut ConfigData, prefix: &str, value: serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten_into(data, &key::combine(prefix, &k), v);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, v) in items.into_iter().enumerate() {
                flatten_into(data, &key::combine(prefix, &index.to_string()), v);
            }
        }
        serde_json::Value::String(s) => data.set(prefix, s),
        serde_json::Value::Null => data.set(prefix, ""),
        other => data.set(prefix, other.to_string()),
    }
}

fn yaml_to_json(value: serde_yaml::Value, path: &Path) -> Result<serde_json::Value> {
    Ok(match value {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(b),
        serde_yaml::Value::Number(n) => serde_json::Value::String(n.to_string()),
        serde_yaml::Value::String(s) => serde_json::Value::String(s),
        serde_yaml::Value::Sequence(items) => serde_json::Value::Array(
            items
                .into_iter()
                .map(|v| yaml_to_json(v, path))
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                let k = match k {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    _ => return Err(ConfigError::parse(path, "Invalid key type in YAML mapping")),
                };
                object.insert(k, yaml_to_json(v, path)?);
            }
            serde_json::Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value, path)?,
    })
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::String(i.to_string()),
        toml::Value::Float(f) => serde_json::Value::String(f.to_string()),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// INI: `[section]` headers, `key=value` lines, comments starting with
/// `;`, `#` or `/`. Surrounding double quotes on values are removed.
fn parse_ini(content: &str, path: &Path) -> Result<ConfigData> {
    let mut data = ConfigData::new();
    let mut section = String::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with([';', '#', '/']) {
            continue;
        }

        if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = inner.trim().to_string();
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            return Err(ConfigError::parse(
                path,
                format!("Unrecognized line format at line {}: '{}'", index + 1, line),
            ));
        };

        let full_key = key::combine(&section, name.trim());
        let mut value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }

        if data.contains_key(&full_key) {
            return Err(ConfigError::parse(
                path,
                format!("Duplicate key '{}' at line {}", full_key, index + 1),
            ));
        }
        data.set(full_key, value);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(format: FileFormat, content: &str) -> ConfigData {
        format.parse(content, Path::new("test")).unwrap()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_path(Path::new("a/appsettings.JSON")), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_path(Path::new("a.yml")), Some(FileFormat::Yaml));
        assert_eq!(FileFormat::from_extension(".toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("ini"), Some(FileFormat::Ini));
        assert_eq!(FileFormat::from_path(Path::new("a.XML")), Some(FileFormat::Xml));
        assert_eq!(FileFormat::from_path(Path::new("a.cfg")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_json() {
        let data = parse(
            FileFormat::Json,
            r#"{
                "ConnectionStrings": { "Default": "Server=db;Port=1433" },
                "Hosts": ["a", "b"],
                "Retry": { "Count": 3, "Enabled": true, "Jitter": null }
            }"#,
        );
        assert_eq!(data.get("connectionstrings:default"), Some("Server=db;Port=1433"));
        assert_eq!(data.get("Hosts:1"), Some("b"));
        assert_eq!(data.get("Retry:Count"), Some("3"));
        assert_eq!(data.get("Retry:Enabled"), Some("true"));
        assert_eq!(data.get("Retry:Jitter"), Some(""));
    }

    #[test]
    fn test_parse_json_rejects_top_level_array() {
        let err = FileFormat::Json.parse("[1, 2]", Path::new("a.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_parse_yaml() {
        let data = parse(
            FileFormat::Yaml,
            "Logging:\n  Level: Debug\nPorts:\n  - 80\n  - 443\n1: numeric-key\n",
        );
        assert_eq!(data.get("Logging:Level"), Some("Debug"));
        assert_eq!(data.get("Ports:0"), Some("80"));
        assert_eq!(data.get("1"), Some("numeric-key"));
    }

    #[test]
    fn test_parse_toml() {
        let data = parse(
            FileFormat::Toml,
            "name = \"svc\"\n[ConnectionStrings]\nmain_npgsql = \"Host=pg\"\n[limits]\nmax = 10\n",
        );
        assert_eq!(data.get("name"), Some("svc"));
        assert_eq!(data.get("ConnectionStrings:main_npgsql"), Some("Host=pg"));
        assert_eq!(data.get("limits:max"), Some("10"));
    }

    #[test]
    fn test_parse_ini() {
        let data = parse(
            FileFormat::Ini,
            "; comment\n# another\nroot = top\n[Serilog:MinimumLevel:Override]\nMicrosoft = \"Warning\"\n",
        );
        assert_eq!(data.get("root"), Some("top"));
        assert_eq!(data.get("Serilog:MinimumLevel:Override:Microsoft"), Some("Warning"));
    }

    #[test]
    fn test_parse_ini_errors() {
        assert!(FileFormat::Ini.parse("no separator", Path::new("a.ini")).is_err());
        assert!(FileFormat::Ini.parse("a=1\nA=2", Path::new("a.ini")).is_err());
    }

    #[test]
    fn test_parse_xml() {
        let data = parse(
            FileFormat::Xml,
            "<config><ConnectionStrings><Main>Server=xml</Main></ConnectionStrings></config>",
        );
        assert_eq!(data.get("ConnectionStrings:Main"), Some("Server=xml"));
    }

    #[test]
    fn test_empty_content() {
        for format in FileFormat::all() {
            assert!(parse(*format, "  \n").is_empty());
        }
    }
}
