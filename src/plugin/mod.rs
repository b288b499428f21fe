//! Purpose: The shell formatting plugin served over the runtime protocol.
//! Exports: `ShellPlugin`, `Configuration`, the resolver field table, plugin metadata constants.
//! Role: Binds config resolution, dialect detection, and the formatter to `PluginHandler`.
//! Invariants: Formatting output identical to the input is reported as `NoChange`.
//! Invariants: Only `indentWidth` and `useTabs` may come from the global configuration.
//! Notes: Range requests format the whole file.

pub mod variant;

use crate::core::error::Error;
use crate::core::resolve::{BoolField, ConfigField, ResolverSpec, UInt32Field, resolve_config};
use crate::core::types::{
    CheckConfigUpdatesMessage, ConfigChange, FileMatchingInfo, FormatResult, PluginInfo,
    ResolveConfigurationResult,
};
use crate::core::value::{ConfigKeyMap, GlobalConfiguration};
use crate::runtime::host::FormatWithHost;
use crate::runtime::{FormatRequest, PluginHandler};
use crate::shell::{Indent, PrintOptions, format_source};
use serde::Serialize;

pub const PLUGIN_NAME: &str = "dprint-plugin-shell";
pub const CONFIG_KEY: &str = "shfmt";
pub const HELP_URL: &str = "https://github.com/dprint/dprint-plugin-shell";
pub const FILE_EXTENSIONS: &[&str] = &["sh", "bash", "zsh", "ksh", "bats"];

const LICENSE_TEXT: &str = include_str!("../../LICENSE");

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub indent_width: u32,
    pub use_tabs: bool,
    pub binary_next_line: bool,
    pub switch_case_indent: bool,
    pub space_redirects: bool,
    pub func_next_line: bool,
    pub minify: bool,
}

impl Configuration {
    pub fn print_options(&self) -> PrintOptions {
        PrintOptions {
            indent: if self.use_tabs {
                Indent::Tabs
            } else {
                Indent::Spaces(self.indent_width)
            },
            binary_next_line: self.binary_next_line,
            switch_case_indent: self.switch_case_indent,
            space_redirects: self.space_redirects,
            func_next_line: self.func_next_line,
            minify: self.minify,
        }
    }
}

pub const CONFIG_FIELDS: &[ConfigField<Configuration>] = &[
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
        key: "binaryNextLine",
        default_value: false,
        allow_global_override: false,
        get: |config| config.binary_next_line,
        set: |config, value| config.binary_next_line = value,
    }),
    ConfigField::Bool(BoolField {
        key: "switchCaseIndent",
        default_value: false,
        allow_global_override: false,
        get: |config| config.switch_case_indent,
        set: |config, value| config.switch_case_indent = value,
    }),
    ConfigField::Bool(BoolField {
        key: "spaceRedirects",
        default_value: false,
        allow_global_override: false,
        get: |config| config.space_redirects,
        set: |config, value| config.space_redirects = value,
    }),
    ConfigField::Bool(BoolField {
        key: "funcNextLine",
        default_value: false,
        allow_global_override: false,
        get: |config| config.func_next_line,
        set: |config, value| config.func_next_line = value,
    }),
    ConfigField::Bool(BoolField {
        key: "minify",
        default_value: false,
        allow_global_override: false,
        get: |config| config.minify,
        set: |config, value| config.minify = value,
    }),
];

/// Accepted plugin keys; `locked` is consumed by the host.
pub const KNOWN_KEYS: &[&str] = &[
    "indentWidth",
    "useTabs",
    "binaryNextLine",
    "switchCaseIndent",
    "spaceRedirects",
    "funcNextLine",
    "minify",
    "locked",
];

pub const RESOLVER_SPEC: ResolverSpec<'static, Configuration> = ResolverSpec {
    fields: CONFIG_FIELDS,
    known_keys: KNOWN_KEYS,
};

pub fn file_matching() -> FileMatchingInfo {
    FileMatchingInfo {
        file_extensions: FILE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        file_names: Vec::new(),
    }
}

pub fn plugin_info() -> PluginInfo {
    let version = env!("CARGO_PKG_VERSION");
    PluginInfo {
        name: PLUGIN_NAME.to_string(),
        version: version.to_string(),
        config_key: CONFIG_KEY.to_string(),
        help_url: HELP_URL.to_string(),
        config_schema_url: format!("https://plugins.dprint.dev/dprint/shell/v{version}/schema.json"),
        update_url: Some("https://plugins.dprint.dev/dprint/shell/latest.json".to_string()),
    }
}

#[derive(Debug, Default)]
pub struct ShellPlugin;

impl PluginHandler for ShellPlugin {
    type Config = Configuration;

    fn resolve_config(
        &mut self,
        config: &ConfigKeyMap,
        global: &GlobalConfiguration,
    ) -> ResolveConfigurationResult<Configuration> {
        let (config, diagnostics) = resolve_config(config, global, &RESOLVER_SPEC);
        ResolveConfigurationResult {
            file_matching: file_matching(),
            diagnostics,
            config,
        }
    }

    fn plugin_info(&self) -> PluginInfo {
        plugin_info()
    }

    fn license_text(&self) -> String {
        LICENSE_TEXT.to_string()
    }

    fn check_config_updates(
        &self,
        _message: CheckConfigUpdatesMessage,
    ) -> Result<Vec<ConfigChange>, Error> {
        Ok(Vec::new())
    }

    fn format(
        &mut self,
        request: FormatRequest<'_, Configuration>,
        _host: &mut dyn FormatWithHost,
    ) -> FormatResult {
        if request.token.is_cancelled() {
            return FormatResult::Error("formatting was cancelled".to_string());
        }
        let source = match std::str::from_utf8(&request.file_bytes) {
            Ok(source) => source,
            Err(err) => return FormatResult::Error(format!("file is not valid utf-8: {err}")),
        };

        let variant = variant::detect_variant(request.file_path, &request.file_bytes);
        tracing::debug!(path = request.file_path, ?variant, "format shell source");
        match format_source(source, variant, &request.config.print_options()) {
            Ok(formatted) if formatted.as_bytes() == request.file_bytes.as_slice() => {
                FormatResult::NoChange
            }
            Ok(formatted) => FormatResult::Change(formatted.into_bytes()),
            Err(err) => FormatResult::Error(err.to_string()),
        }
    }
}
