//! Purpose: Data types that cross the guest/host boundary.
//! Exports: config ids, raw/resolved config envelopes, plugin metadata, format request/result types.
//! Role: Serde contract for every JSON payload written into or read from the shared buffer.
//! Invariants: JSON field names are camelCase and stable; lists serialize as `[]`, never `null`.

use crate::core::value::{ConfigKeyMap, ConfigValue, GlobalConfiguration};
use serde::{Deserialize, Serialize};

/// Schema version reported by the version probe.
pub const PLUGIN_SCHEMA_VERSION: u32 = 4;

/// Opaque handle chosen by the host for one registered configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FormatConfigId(u32);

impl FormatConfigId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawFormatConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plugin: ConfigKeyMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub global: GlobalConfiguration,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<ConfigKeyMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<ConfigKeyMap>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDiagnostic {
    pub property_name: String,
    pub message: String,
}

impl ConfigurationDiagnostic {
    pub fn new(property_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMatchingInfo {
    pub file_extensions: Vec<String>,
    pub file_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConfigurationResult<T> {
    pub file_matching: FileMatchingInfo,
    pub diagnostics: Vec<ConfigurationDiagnostic>,
    pub config: T,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub config_key: String,
    pub help_url: String,
    pub config_schema_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConfigUpdatesMessage {
    #[serde(default)]
    pub old_version: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub config: ConfigKeyMap,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigChangeKind {
    Add,
    Set,
    Remove,
}

/// One segment of a config change path: an object key or an array index.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigChangePathItem {
    Key(String),
    Index(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigChange {
    pub path: Vec<ConfigChangePathItem>,
    pub kind: ConfigChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ConfigValue>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormatRange {
    pub start: u32,
    pub end: u32,
}

/// Status codes returned by the format operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum FormatResultCode {
    NoChange = 0,
    Change = 1,
    Error = 2,
}

impl FormatResultCode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(FormatResultCode::NoChange),
            1 => Some(FormatResultCode::Change),
            2 => Some(FormatResultCode::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormatResult {
    NoChange,
    Change(Vec<u8>),
    Error(String),
}

impl FormatResult {
    pub fn code(&self) -> FormatResultCode {
        match self {
            FormatResult::NoChange => FormatResultCode::NoChange,
            FormatResult::Change(_) => FormatResultCode::Change,
            FormatResult::Error(_) => FormatResultCode::Error,
        }
    }
}

/// Request to format a region through the host (reverse call).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostFormatRequest {
    pub file_path: String,
    pub file_bytes: Vec<u8>,
    pub range: Option<FormatRange>,
    pub override_config: ConfigKeyMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_config_defaults_missing_and_null_sections() {
        let config: RawFormatConfig = serde_json::from_str(r#"{"plugin":null}"#).expect("decode");
        assert!(config.plugin.is_empty());
        assert!(config.global.is_empty());

        let config: RawFormatConfig =
            serde_json::from_str(r#"{"plugin":{"indentWidth":2},"global":{"lineWidth":120}}"#)
                .expect("decode");
        assert_eq!(config.plugin.get("indentWidth"), Some(&ConfigValue::Int(2)));
        assert_eq!(config.global.get("lineWidth"), Some(&ConfigValue::Int(120)));
    }

    #[test]
    fn plugin_info_omits_missing_update_url() {
        let info = PluginInfo {
            name: "demo".to_string(),
            version: "0.0.0".to_string(),
            config_key: "demo".to_string(),
            help_url: "https://example.com".to_string(),
            config_schema_url: String::new(),
            update_url: None,
        };
        let value = serde_json::to_value(&info).expect("encode");
        assert_eq!(value["configKey"], json!("demo"));
        assert!(value.get("updateUrl").is_none());
    }

    #[test]
    fn config_change_serializes_mixed_path() {
        let change = ConfigChange {
            path: vec![
                ConfigChangePathItem::Key("plugins".to_string()),
                ConfigChangePathItem::Index(0),
            ],
            kind: ConfigChangeKind::Remove,
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&change).expect("encode"),
            json!({"path": ["plugins", 0], "kind": "remove"})
        );
    }

    #[test]
    fn result_codes_round_trip_through_raw() {
        for code in [
            FormatResultCode::NoChange,
            FormatResultCode::Change,
            FormatResultCode::Error,
        ] {
            assert_eq!(FormatResultCode::from_raw(code as u32), Some(code));
        }
        assert_eq!(FormatResultCode::from_raw(3), None);
    }
}
