//! Purpose: Resolve a typed configuration from plugin-scoped and global key/value maps.
//! Exports: `UInt32Field`, `BoolField`, `ConfigField`, `ResolverSpec`, `resolve_config`.
//! Role: Declarative field tables drive defaults, coercion, precedence, and diagnostics.
//! Invariants: Order is defaults, then global (override-eligible fields only), then plugin (all fields).
//! Invariants: Plugin-scoped values therefore win over global ones for the same key.
//! Invariants: Null and absent keys are equivalent; the fallback is kept without a diagnostic.
//! Invariants: Unknown keys are reported from the plugin map only; diagnostics sort by property name.

use crate::core::coerce::{coerce_bool, coerce_u32};
use crate::core::types::ConfigurationDiagnostic;
use crate::core::value::{ConfigKeyMap, ConfigValue, GlobalConfiguration};
use std::collections::BTreeSet;

pub struct UInt32Field<T> {
    pub key: &'static str,
    pub default_value: u32,
    pub allow_global_override: bool,
    pub get: fn(&T) -> u32,
    pub set: fn(&mut T, u32),
}

pub struct BoolField<T> {
    pub key: &'static str,
    pub default_value: bool,
    pub allow_global_override: bool,
    pub get: fn(&T) -> bool,
    pub set: fn(&mut T, bool),
}

pub enum ConfigField<T> {
    UInt32(UInt32Field<T>),
    Bool(BoolField<T>),
}

impl<T> ConfigField<T> {
    pub fn key(&self) -> &'static str {
        match self {
            ConfigField::UInt32(field) => field.key,
            ConfigField::Bool(field) => field.key,
        }
    }

    pub fn allow_global_override(&self) -> bool {
        match self {
            ConfigField::UInt32(field) => field.allow_global_override,
            ConfigField::Bool(field) => field.allow_global_override,
        }
    }

    /// Kind phrase used in type-mismatch diagnostics.
    pub fn kind_description(&self) -> &'static str {
        match self {
            ConfigField::UInt32(_) => "a non-negative integer",
            ConfigField::Bool(_) => "a boolean",
        }
    }

    fn apply_default(&self, resolved: &mut T) {
        match self {
            ConfigField::UInt32(field) => (field.set)(resolved, field.default_value),
            ConfigField::Bool(field) => (field.set)(resolved, field.default_value),
        }
    }

    fn apply_from(
        &self,
        source: &ConfigKeyMap,
        resolved: &mut T,
        diagnostics: &mut Vec<ConfigurationDiagnostic>,
    ) {
        let Some(value) = source.get(self.key()).filter(|value| !value.is_null()) else {
            return;
        };

        let coerced = match self {
            ConfigField::UInt32(field) => {
                coerce_u32(value).map(|next| (field.set)(resolved, next))
            }
            ConfigField::Bool(field) => coerce_bool(value).map(|next| (field.set)(resolved, next)),
        };
        if coerced.is_none() {
            diagnostics.push(self.mismatch(value));
        }
    }

    fn mismatch(&self, value: &ConfigValue) -> ConfigurationDiagnostic {
        ConfigurationDiagnostic::new(
            self.key(),
            format!(
                "Expected '{}' to be {}, but got {}.",
                self.key(),
                self.kind_description(),
                value.type_name()
            ),
        )
    }
}

pub struct ResolverSpec<'a, T> {
    pub fields: &'a [ConfigField<T>],
    /// Keys accepted without an unknown-property diagnostic. Empty means "the field keys".
    pub known_keys: &'a [&'a str],
}

impl<T> ResolverSpec<'_, T> {
    pub fn known_key_set(&self) -> BTreeSet<&str> {
        if self.known_keys.is_empty() {
            self.fields.iter().map(ConfigField::key).collect()
        } else {
            self.known_keys.iter().copied().collect()
        }
    }

    /// Current value of every field, in table order, as JSON-like values.
    pub fn snapshot(&self, config: &T) -> Vec<(&'static str, ConfigValue)> {
        self.fields
            .iter()
            .map(|field| match field {
                ConfigField::UInt32(field) => (field.key, ConfigValue::from((field.get)(config))),
                ConfigField::Bool(field) => (field.key, ConfigValue::from((field.get)(config))),
            })
            .collect()
    }
}

pub fn resolve_config<T: Default>(
    plugin: &ConfigKeyMap,
    global: &GlobalConfiguration,
    spec: &ResolverSpec<'_, T>,
) -> (T, Vec<ConfigurationDiagnostic>) {
    let mut diagnostics = unknown_property_diagnostics(plugin, &spec.known_key_set());

    let mut resolved = T::default();
    for field in spec.fields {
        field.apply_default(&mut resolved);
    }

    for field in spec.fields.iter().filter(|field| field.allow_global_override()) {
        field.apply_from(global, &mut resolved, &mut diagnostics);
    }
    for field in spec.fields {
        field.apply_from(plugin, &mut resolved, &mut diagnostics);
    }

    diagnostics.sort_by(|a, b| a.property_name.cmp(&b.property_name));
    (resolved, diagnostics)
}

fn unknown_property_diagnostics(
    plugin: &ConfigKeyMap,
    known_keys: &BTreeSet<&str>,
) -> Vec<ConfigurationDiagnostic> {
    plugin
        .keys()
        .filter(|key| !known_keys.contains(key.as_str()))
        .map(|key| ConfigurationDiagnostic::new(key.clone(), format!("Unknown property '{key}'.")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{BoolField, ConfigField, ResolverSpec, UInt32Field, resolve_config};
    use crate::core::types::ConfigurationDiagnostic;
    use crate::core::value::{ConfigKeyMap, ConfigValue};
    use serde_json::Number;

    #[derive(Debug, Default, PartialEq)]
    struct TestConfig {
        indent_width: u32,
        use_tabs: bool,
        minify: bool,
    }

    const FIELDS: &[ConfigField<TestConfig>] = &[
        ConfigField::UInt32(UInt32Field {
            key: "indentWidth",
            default_value: 2,
            allow_global_override: true,
            get: |config| config.indent_width,
            set: |config, value| config.indent_width = value,
        }),
        ConfigField::Bool(BoolField {
            key: "useTabs",
            default_value: false,
            allow_global_override: true,
            get: |config| config.use_tabs,
            set: |config, value| config.use_tabs = value,
        }),
        ConfigField::Bool(BoolField {
            key: "minify",
            default_value: false,
            allow_global_override: false,
            get: |config| config.minify,
            set: |config, value| config.minify = value,
        }),
    ];

    const SPEC: ResolverSpec<'static, TestConfig> = ResolverSpec {
        fields: FIELDS,
        known_keys: &["locked", "indentWidth", "useTabs", "minify"],
    };

    fn map(entries: Vec<(&str, ConfigValue)>) -> ConfigKeyMap {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn empty_maps_yield_defaults_without_diagnostics() {
        let (resolved, diagnostics) = resolve_config(&map(vec![]), &map(vec![]), &SPEC);
        assert_eq!(
            resolved,
            TestConfig {
                indent_width: 2,
                use_tabs: false,
                minify: false,
            }
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn plugin_values_win_over_global_values() {
        let (resolved, diagnostics) = resolve_config(
            &map(vec![
                ("indentWidth", ConfigValue::from(4.0f64)),
                ("useTabs", ConfigValue::from(b"false".as_slice())),
                ("minify", ConfigValue::from(b"true".as_slice())),
                ("unknown", ConfigValue::from(true)),
            ]),
            &map(vec![
                ("indentWidth", ConfigValue::from(Number::from(8))),
                ("useTabs", ConfigValue::from(b"1".as_slice())),
            ]),
            &SPEC,
        );

        assert_eq!(resolved.indent_width, 4);
        assert!(!resolved.use_tabs);
        assert!(resolved.minify);
        assert_eq!(
            diagnostics,
            vec![ConfigurationDiagnostic::new(
                "unknown",
                "Unknown property 'unknown'."
            )]
        );
    }

    #[test]
    fn global_applies_only_to_override_eligible_fields() {
        let (resolved, diagnostics) = resolve_config(
            &map(vec![]),
            &map(vec![
                ("indentWidth", ConfigValue::from(8u32)),
                ("minify", ConfigValue::from(true)),
                ("lineWidth", ConfigValue::from(120u32)),
            ]),
            &SPEC,
        );
        assert_eq!(resolved.indent_width, 8);
        assert!(!resolved.minify);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn allowlisted_extra_key_is_not_unknown() {
        let (_, diagnostics) = resolve_config(
            &map(vec![("locked", ConfigValue::from(true))]),
            &map(vec![]),
            &SPEC,
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn null_values_keep_fallback() {
        let (resolved, diagnostics) = resolve_config(
            &map(vec![
                ("indentWidth", ConfigValue::Null),
                ("useTabs", ConfigValue::Null),
            ]),
            &map(vec![
                ("indentWidth", ConfigValue::Null),
                ("useTabs", ConfigValue::Null),
            ]),
            &SPEC,
        );
        assert_eq!(resolved.indent_width, 2);
        assert!(!resolved.use_tabs);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn mismatch_keeps_previous_value_and_reports_once() {
        let (resolved, diagnostics) = resolve_config(
            &map(vec![("indentWidth", ConfigValue::from("wide"))]),
            &map(vec![("indentWidth", ConfigValue::from(4u32))]),
            &SPEC,
        );
        assert_eq!(resolved.indent_width, 4);
        assert_eq!(
            diagnostics,
            vec![ConfigurationDiagnostic::new(
                "indentWidth",
                "Expected 'indentWidth' to be a non-negative integer, but got string."
            )]
        );
    }

    #[test]
    fn diagnostics_are_sorted_by_property_name() {
        let (_, diagnostics) = resolve_config(
            &map(vec![
                ("zeta", ConfigValue::from(1u32)),
                ("useTabs", ConfigValue::from(3u32)),
                ("alpha", ConfigValue::from(1u32)),
            ]),
            &map(vec![("indentWidth", ConfigValue::from(-1i32))]),
            &SPEC,
        );
        let names: Vec<&str> = diagnostics
            .iter()
            .map(|diagnostic| diagnostic.property_name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "indentWidth", "useTabs", "zeta"]);
        assert_eq!(
            diagnostics[2].message,
            "Expected 'useTabs' to be a boolean, but got integer."
        );
    }

    #[test]
    fn field_keys_are_known_when_no_allowlist_is_given() {
        let spec = ResolverSpec {
            fields: FIELDS,
            known_keys: &[],
        };
        let (_, diagnostics) = resolve_config(
            &map(vec![
                ("minify", ConfigValue::from(true)),
                ("locked", ConfigValue::from(true)),
            ]),
            &map(vec![]),
            &spec,
        );
        assert_eq!(
            diagnostics,
            vec![ConfigurationDiagnostic::new("locked", "Unknown property 'locked'.")]
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let plugin = map(vec![
            ("indentWidth", ConfigValue::from("3")),
            ("bogus", ConfigValue::from(1u8)),
        ]);
        let global = map(vec![("useTabs", ConfigValue::from(true))]);
        let first = resolve_config(&plugin, &global, &SPEC);
        let second = resolve_config(&plugin, &global, &SPEC);
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_reads_through_getters() {
        let (resolved, _) = resolve_config(
            &map(vec![("useTabs", ConfigValue::from(true))]),
            &map(vec![]),
            &SPEC,
        );
        assert_eq!(
            SPEC.snapshot(&resolved),
            vec![
                ("indentWidth", ConfigValue::UInt(2)),
                ("useTabs", ConfigValue::Bool(true)),
                ("minify", ConfigValue::Bool(false)),
            ]
        );
    }
}
