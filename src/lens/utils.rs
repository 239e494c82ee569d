//! Common utility functions for lens modules
//!
//! Output format selection and rendering shared by the ingest report and the
//! administrative listings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unified output format for all commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }

    /// Get a list of all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty"]
    }

    /// Serialize a value as JSON in this format's layout
    ///
    /// Table formats fall back to pretty JSON.
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Json => serde_json::to_string(value)?,
            _ => serde_json::to_string_pretty(value)?,
        })
    }

    /// Render rows as a table in this format's style
    ///
    /// JSON formats serialize the rows instead.
    #[cfg(feature = "display")]
    pub fn render_rows<T>(&self, rows: &[T]) -> Result<String>
    where
        T: tabled::Tabled + Serialize,
    {
        use tabled::settings::Style;
        use tabled::Table;

        match self {
            Self::Table => Ok(Table::new(rows).with(Style::rounded()).to_string()),
            Self::Markdown => Ok(Table::new(rows).with(Style::markdown()).to_string()),
            Self::Json | Self::JsonPretty => self.to_json(rows),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("pretty").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("MD").unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_str("json-pretty").unwrap(),
            OutputFormat::JsonPretty
        );
        assert!(OutputFormat::from_str("psv").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for name in OutputFormat::all_names() {
            let format = OutputFormat::from_str(name).unwrap();
            assert_eq!(&format.to_string(), name);
        }
    }

    #[test]
    fn test_to_json() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(OutputFormat::Json.to_json(&value).unwrap(), r#"{"a":1}"#);
        assert!(OutputFormat::JsonPretty
            .to_json(&value)
            .unwrap()
            .contains('\n'));
    }

    #[cfg(feature = "display")]
    #[test]
    fn test_render_rows() {
        #[derive(tabled::Tabled, Serialize)]
        struct Row {
            name: String,
        }
        let rows = vec![Row {
            name: "apnic".to_string(),
        }];
        let md = OutputFormat::Markdown.render_rows(&rows).unwrap();
        assert!(md.contains("| apnic |"));
        let json = OutputFormat::Json.render_rows(&rows).unwrap();
        assert_eq!(json, r#"[{"name":"apnic"}]"#);
    }
}
