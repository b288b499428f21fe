//! Purpose: Shell formatting plugin for hosts that speak the dprint Wasm plugin protocol (schema 4).
//! Exports: `core` (values, coercion, resolution, protocol types, errors), `runtime` (protocol state
//!          machine), `plugin` (the shell handler), `shell` (the formatter), and the ABI exports.
//! Role: Built as a `cdylib` for the Wasm guest and as an `rlib` for the `shell-fmt` CLI and tests.
//! Invariants: All host-visible state lives in one `runtime::Runtime` per thread.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod core;
pub mod plugin;
pub mod runtime;
pub mod shell;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::plugin::ShellPlugin;
pub use crate::runtime::{FormatRequest, PluginHandler, Runtime};
