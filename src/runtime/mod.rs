//! Purpose: Shared-buffer request/response state machine between the host and a plugin handler.
//! Exports: `Runtime`, `PluginHandler`, `FormatRequest`, and the buffer/registry/host submodules.
//! Role: Every protocol operation is one turn: consume the buffer, drive the handler, write the buffer.
//! Invariants: One in-flight operation at a time; no state survives a call except the buffer,
//!             the registry, and the staged path/override/result slots.
//! Invariants: Misuse (unknown id, missing path, result never produced) returns `ErrorKind::Protocol`;
//!             the ABI layer turns that into a trap.
//! Invariants: A staged override is consumed by the next format attempt whatever its outcome.
//! Invariants: `check_config_updates` never fails; all failures land in the `err` envelope.

pub mod buffer;
pub mod host;
pub mod registry;

use crate::core::error::{Error, ErrorKind};
use crate::core::types::{
    CheckConfigUpdatesMessage, ConfigChange, FormatConfigId, FormatRange, FormatResult,
    PLUGIN_SCHEMA_VERSION, PluginInfo, RawFormatConfig, ResolveConfigurationResult,
};
use crate::core::value::{ConfigKeyMap, GlobalConfiguration};
use buffer::SharedBuffer;
use host::{
    CancellationToken, FormatWithHost, HostBridge, HostCancellationToken, HostFormatter,
    default_host,
};
use registry::ConfigRegistry;
use serde::Serialize;
use serde_json::{Value, json};
use std::borrow::Cow;

/// Plugin-facing formatting request.
pub struct FormatRequest<'a, T> {
    pub file_path: &'a str,
    pub file_bytes: Vec<u8>,
    pub config_id: FormatConfigId,
    pub config: &'a T,
    pub range: Option<FormatRange>,
    pub token: &'a dyn CancellationToken,
}

/// Hooks the runtime calls; one implementation per plugin.
pub trait PluginHandler {
    type Config: Serialize + Clone;

    fn resolve_config(
        &mut self,
        config: &ConfigKeyMap,
        global: &GlobalConfiguration,
    ) -> ResolveConfigurationResult<Self::Config>;

    fn plugin_info(&self) -> PluginInfo;

    fn license_text(&self) -> String;

    fn check_config_updates(
        &self,
        message: CheckConfigUpdatesMessage,
    ) -> Result<Vec<ConfigChange>, Error>;

    fn format(
        &mut self,
        request: FormatRequest<'_, Self::Config>,
        host: &mut dyn FormatWithHost,
    ) -> FormatResult;
}

pub struct Runtime<H: PluginHandler> {
    handler: H,
    host: Box<dyn HostBridge>,
    buffer: SharedBuffer,
    registry: ConfigRegistry<H::Config>,
    override_config: Option<ConfigKeyMap>,
    file_path: Option<String>,
    formatted_text: Option<Vec<u8>>,
    error_text: Option<String>,
}

impl<H: PluginHandler> Runtime<H> {
    pub fn new(handler: H) -> Self {
        Self::with_host(handler, default_host())
    }

    pub fn with_host(handler: H, host: Box<dyn HostBridge>) -> Self {
        Self {
            handler,
            host,
            buffer: SharedBuffer::new(),
            registry: ConfigRegistry::new(),
            override_config: None,
            file_path: None,
            formatted_text: None,
            error_text: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn plugin_schema_version(&self) -> u32 {
        PLUGIN_SCHEMA_VERSION
    }

    pub fn get_plugin_info(&mut self) -> Result<u32, Error> {
        let bytes = to_json_bytes(&self.handler.plugin_info(), "plugin info")?;
        Ok(self.buffer.set(bytes))
    }

    pub fn get_license_text(&mut self) -> u32 {
        let text = self.handler.license_text();
        self.buffer.set(text.into_bytes())
    }

    pub fn register_config(&mut self, config_id: u32) -> Result<(), Error> {
        let bytes = self.buffer.take();
        let config: RawFormatConfig = serde_json::from_slice(&bytes).map_err(|err| {
            Error::new(ErrorKind::InvalidJson)
                .with_message("failed to decode format config")
                .with_config_id(config_id)
                .with_source(err)
        })?;
        tracing::debug!(
            config_id,
            plugin_keys = config.plugin.len(),
            global_keys = config.global.len(),
            "register config"
        );
        self.registry
            .register(FormatConfigId::from_raw(config_id), config);
        Ok(())
    }

    pub fn release_config(&mut self, config_id: u32) {
        let released = self.registry.release(FormatConfigId::from_raw(config_id));
        tracing::debug!(config_id, released, "release config");
    }

    pub fn get_config_diagnostics(&mut self, config_id: u32) -> Result<u32, Error> {
        let bytes = to_json_bytes(&self.resolved(config_id)?.diagnostics, "diagnostics")?;
        Ok(self.buffer.set(bytes))
    }

    pub fn get_resolved_config(&mut self, config_id: u32) -> Result<u32, Error> {
        let bytes = to_json_bytes(&self.resolved(config_id)?.config, "resolved config")?;
        Ok(self.buffer.set(bytes))
    }

    pub fn get_config_file_matching(&mut self, config_id: u32) -> Result<u32, Error> {
        let bytes = to_json_bytes(&self.resolved(config_id)?.file_matching, "file matching")?;
        Ok(self.buffer.set(bytes))
    }

    pub fn set_override_config(&mut self) -> Result<(), Error> {
        let bytes = self.buffer.take();
        let config = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Option<ConfigKeyMap>>(&bytes).map_err(|err| {
                Error::new(ErrorKind::InvalidJson)
                    .with_message("failed to decode override config")
                    .with_source(err)
            })?
        };
        if self.override_config.is_some() {
            tracing::warn!("replacing an override config that was never used");
        }
        self.override_config = config;
        Ok(())
    }

    pub fn set_file_path(&mut self) -> Result<(), Error> {
        let path = self.buffer.take_text().map_err(|_| {
            Error::new(ErrorKind::Protocol).with_message("expected file path to be utf-8")
        })?;
        self.file_path = Some(path.replace('\\', "/"));
        Ok(())
    }

    pub fn format(&mut self, config_id: u32) -> Result<u32, Error> {
        self.format_inner(config_id, None)
    }

    pub fn format_range(
        &mut self,
        config_id: u32,
        range_start: u32,
        range_end: u32,
    ) -> Result<u32, Error> {
        self.format_inner(
            config_id,
            Some(FormatRange {
                start: range_start,
                end: range_end,
            }),
        )
    }

    pub fn get_formatted_text(&mut self) -> Result<u32, Error> {
        let text = self.formatted_text.take().ok_or_else(|| {
            Error::new(ErrorKind::Protocol).with_message("expected to have formatted text")
        })?;
        Ok(self.buffer.set(text))
    }

    pub fn get_error_text(&mut self) -> Result<u32, Error> {
        let text = self.error_text.take().ok_or_else(|| {
            Error::new(ErrorKind::Protocol).with_message("expected to have error text")
        })?;
        Ok(self.buffer.set(text.into_bytes()))
    }

    pub fn check_config_updates(&mut self) -> u32 {
        let bytes = self.buffer.take();
        let outcome = serde_json::from_slice::<CheckConfigUpdatesMessage>(&bytes)
            .map_err(|err| err.to_string())
            .and_then(|message| {
                self.handler
                    .check_config_updates(message)
                    .map_err(|err| err.message().map(str::to_string).unwrap_or_else(|| err.to_string()))
            })
            .and_then(|changes| serde_json::to_value(changes).map_err(|err| err.to_string()));

        let response = match outcome {
            Ok(changes) => json!({ "kind": "ok", "data": changes }),
            Err(message) => json!({ "kind": "err", "data": Value::String(message) }),
        };
        self.buffer.set(response.to_string().into_bytes())
    }

    pub fn get_shared_bytes_ptr(&self) -> usize {
        self.buffer.address()
    }

    pub fn clear_shared_bytes(&mut self, size: u32) -> usize {
        self.buffer.clear(size)
    }

    /// Host-side write: size the buffer and copy `bytes` into it.
    pub fn write_shared_bytes(&mut self, bytes: &[u8]) {
        self.buffer.clear(bytes.len() as u32);
        self.buffer.as_mut_slice().copy_from_slice(bytes);
    }

    pub fn shared_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    fn resolved(&mut self, config_id: u32) -> Result<&ResolveConfigurationResult<H::Config>, Error> {
        let handler = &mut self.handler;
        self.registry
            .get_or_resolve(FormatConfigId::from_raw(config_id), |raw| {
                tracing::debug!(config_id, "resolve config");
                resolve_raw(handler, raw, None)
            })
    }

    fn format_inner(&mut self, config_id: u32, range: Option<FormatRange>) -> Result<u32, Error> {
        self.formatted_text = None;
        self.error_text = None;

        let config = match self.override_config.take() {
            Some(override_config) => {
                let raw = self.registry.get(FormatConfigId::from_raw(config_id))?;
                resolve_raw(&mut self.handler, raw, Some(&override_config)).config
            }
            None => self.resolved(config_id)?.config.clone(),
        };

        let file_path = self.file_path.take().ok_or_else(|| {
            Error::new(ErrorKind::Protocol).with_message("expected the file path to be set")
        })?;
        let file_bytes = self.buffer.take();
        tracing::debug!(config_id, path = %file_path, len = file_bytes.len(), ?range, "format");

        let token = HostCancellationToken::new(self.host.as_ref());
        let mut host_formatter = HostFormatter::new(&mut self.buffer, self.host.as_ref());
        let result = self.handler.format(
            FormatRequest {
                file_path: &file_path,
                file_bytes,
                config_id: FormatConfigId::from_raw(config_id),
                config: &config,
                range,
                token: &token,
            },
            &mut host_formatter,
        );
        if let Some(violation) = host_formatter.into_violation() {
            return Err(violation);
        }

        let code = result.code();
        match result {
            FormatResult::NoChange => {}
            FormatResult::Change(text) => self.formatted_text = Some(text),
            FormatResult::Error(message) => self.error_text = Some(message),
        }
        Ok(code as u32)
    }
}

fn resolve_raw<H: PluginHandler>(
    handler: &mut H,
    raw: &RawFormatConfig,
    override_config: Option<&ConfigKeyMap>,
) -> ResolveConfigurationResult<H::Config> {
    let plugin = match override_config {
        Some(override_config) => {
            let mut merged = raw.plugin.clone();
            merged.extend(
                override_config
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            Cow::Owned(merged)
        }
        None => Cow::Borrowed(&raw.plugin),
    };
    handler.resolve_config(&plugin, &raw.global)
}

fn to_json_bytes<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to serialize {what}"))
            .with_source(err)
    })
}
