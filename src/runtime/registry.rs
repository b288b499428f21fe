//! Purpose: Keyed store of host-registered configurations.
//! Exports: `ConfigRegistry`.
//! Role: Arena-style table keyed by host-chosen ids; owned by the runtime for the process lifetime.
//! Invariants: Re-registering an id replaces the raw payload and drops any cached resolution.
//! Invariants: Lookups of unknown or released ids are protocol errors, never defaults.
//! Invariants: Map iteration order is never observable.

use crate::core::error::{Error, ErrorKind};
use crate::core::types::{FormatConfigId, RawFormatConfig, ResolveConfigurationResult};
use std::collections::HashMap;

struct RegistryEntry<T> {
    raw: RawFormatConfig,
    resolved: Option<ResolveConfigurationResult<T>>,
}

pub struct ConfigRegistry<T> {
    entries: HashMap<FormatConfigId, RegistryEntry<T>>,
}

impl<T> Default for ConfigRegistry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ConfigRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: FormatConfigId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn register(&mut self, id: FormatConfigId, raw: RawFormatConfig) {
        self.entries.insert(id, RegistryEntry { raw, resolved: None });
    }

    /// Returns whether the id was registered.
    pub fn release(&mut self, id: FormatConfigId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn get(&self, id: FormatConfigId) -> Result<&RawFormatConfig, Error> {
        self.entries
            .get(&id)
            .map(|entry| &entry.raw)
            .ok_or_else(|| not_registered(id))
    }

    pub fn cached(&self, id: FormatConfigId) -> Option<&ResolveConfigurationResult<T>> {
        self.entries
            .get(&id)
            .and_then(|entry| entry.resolved.as_ref())
    }

    /// Returns the cached resolution for `id`, computing it with `resolve` on first use.
    pub fn get_or_resolve(
        &mut self,
        id: FormatConfigId,
        resolve: impl FnOnce(&RawFormatConfig) -> ResolveConfigurationResult<T>,
    ) -> Result<&ResolveConfigurationResult<T>, Error> {
        let entry = self.entries.get_mut(&id).ok_or_else(|| not_registered(id))?;
        Ok(entry.resolved.get_or_insert_with(|| resolve(&entry.raw)))
    }
}

fn not_registered(id: FormatConfigId) -> Error {
    Error::new(ErrorKind::Protocol)
        .with_message("plugin must have config set before use")
        .with_config_id(id.as_raw())
}
