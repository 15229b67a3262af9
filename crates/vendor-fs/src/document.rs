//! Format-preserving configuration documents
//!
//! A [`Document`] holds the whole parsed config file as an ordered JSON
//! object, regardless of whether it came from TOML, YAML or JSON. Keys the
//! caller never touches survive a load/save cycle, and the original
//! indentation and trailing newline are re-applied on save.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result, io};

/// Serialization format of a config document, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Detect the format from a file extension.
    ///
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

/// Whitespace conventions observed in the file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStyle {
    /// Indentation unit (only JSON output honours it)
    pub indent: String,
    /// Whether the file ended with a newline
    pub final_newline: bool,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            final_newline: true,
        }
    }
}

impl DocumentStyle {
    /// Infer the style from raw file content.
    pub fn detect(content: &str) -> Self {
        let indent = content
            .lines()
            .skip(1)
            .find_map(|line| {
                let trimmed = line.trim_start_matches([' ', '\t']);
                let width = line.len() - trimmed.len();
                (width > 0 && !trimmed.is_empty()).then(|| line[..width].to_string())
            })
            .unwrap_or_else(|| "  ".to_string());

        Self {
            indent,
            final_newline: content.ends_with('\n'),
        }
    }
}

/// A config file held as an ordered JSON object.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    format: Format,
    style: DocumentStyle,
    root: Map<String, Value>,
}

impl Document {
    /// Create an empty document that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = Format::from_path(&path)?;
        Ok(Self {
            path,
            format,
            style: DocumentStyle::default(),
            root: Map::new(),
        })
    }

    /// Load and parse a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_text(path)?;
        Self::parse(path, &content)
    }

    /// Parse `content` as if it had been read from `path`.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let format = Format::from_path(path)?;
        let parse_error = |message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.name().into(),
            message,
        };

        let value: Value = match format {
            Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
            Format::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
            Format::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
        };

        let root = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(parse_error(format!(
                    "expected a table at the top level, found {}",
                    kind_of(&other)
                )));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            format,
            style: DocumentStyle::detect(content),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn style(&self) -> &DocumentStyle {
        &self.style
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    /// Get a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Get a top-level table, creating it (or replacing a non-table) if needed.
    pub fn table_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .root
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        }
    }

    /// Render the document in its original format and style.
    pub fn render(&self) -> Result<String> {
        let serialize_error = |message: String| Error::ConfigSerialize {
            path: self.path.clone(),
            format: self.format.name().into(),
            message,
        };

        let mut text = match self.format {
            Format::Json => {
                let mut buf = Vec::new();
                let formatter =
                    serde_json::ser::PrettyFormatter::with_indent(self.style.indent.as_bytes());
                let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
                self.root
                    .serialize(&mut serializer)
                    .map_err(|e| serialize_error(e.to_string()))?;
                String::from_utf8(buf).map_err(|e| serialize_error(e.to_string()))?
            }
            Format::Toml => {
                let stripped = strip_nulls(Value::Object(self.root.clone()));
                toml::to_string_pretty(&stripped).map_err(|e| serialize_error(e.to_string()))?
            }
            Format::Yaml => {
                serde_yaml::to_string(&self.root).map_err(|e| serialize_error(e.to_string()))?
            }
        };

        let trimmed_len = text.trim_end_matches('\n').len();
        text.truncate(trimmed_len);
        if self.style.final_newline {
            text.push('\n');
        }
        Ok(text)
    }

    /// Write the document back to its path atomically.
    pub fn save(&self) -> Result<()> {
        let text = self.render()?;
        io::write_atomic(&self.path, text.as_bytes())?;
        tracing::debug!(path = %self.path.display(), format = self.format.name(), "Saved config document");
        Ok(())
    }
}

/// TOML has no null; drop null members and array items before rendering.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_four_space_indent() {
        let style = DocumentStyle::detect("{\n    \"a\": 1\n}");
        assert_eq!(style.indent, "    ");
        assert!(!style.final_newline);
    }

    #[test]
    fn detects_tab_indent() {
        let style = DocumentStyle::detect("{\n\t\"a\": 1\n}\n");
        assert_eq!(style.indent, "\t");
        assert!(style.final_newline);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let result = Format::from_path(Path::new("vendor.ini"));
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn strip_nulls_removes_nested_nulls() {
        let value = serde_json::json!({"a": null, "b": {"c": null, "d": 1}, "e": [null, 2]});
        assert_eq!(
            strip_nulls(value),
            serde_json::json!({"b": {"d": 1}, "e": [2]})
        );
    }
}
