//! Purpose: Exported functions the host calls, one per protocol operation.
//! Exports: `dprint_plugin_version_4` and the buffer/config/format entry points.
//! Role: Thin adapter from the C ABI onto a per-thread `Runtime<ShellPlugin>`.
//! Invariants: Every export is a single synchronous turn; none re-enters the runtime.
//! Invariants: Any runtime `Err` is a protocol violation and traps after being logged.
//! Notes: Lengths are `u32`, addresses are `usize` (32-bit on wasm32).

use crate::core::error::{Error, ErrorKind};
use crate::core::types::PLUGIN_SCHEMA_VERSION;
use crate::plugin::ShellPlugin;
use crate::runtime::Runtime;
use std::cell::RefCell;

thread_local! {
    static RUNTIME: RefCell<Runtime<ShellPlugin>> = RefCell::new(Runtime::new(ShellPlugin));
}

fn with_runtime<R>(f: impl FnOnce(&mut Runtime<ShellPlugin>) -> R) -> R {
    RUNTIME.with(|runtime| f(&mut runtime.borrow_mut()))
}

fn fatal(err: Error) -> ! {
    tracing::error!(error = %err, "fatal plugin protocol error");
    panic!("{err}");
}

fn or_fatal<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fatal(err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn dprint_plugin_version_4() -> u32 {
    PLUGIN_SCHEMA_VERSION
}

#[unsafe(no_mangle)]
pub extern "C" fn get_plugin_info() -> u32 {
    or_fatal(with_runtime(Runtime::get_plugin_info))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_license_text() -> u32 {
    with_runtime(Runtime::get_license_text)
}

#[unsafe(no_mangle)]
pub extern "C" fn register_config(config_id: u32) {
    or_fatal(with_runtime(|runtime| runtime.register_config(config_id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn release_config(config_id: u32) {
    with_runtime(|runtime| runtime.release_config(config_id))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_config_diagnostics(config_id: u32) -> u32 {
    or_fatal(with_runtime(|runtime| runtime.get_config_diagnostics(config_id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_resolved_config(config_id: u32) -> u32 {
    or_fatal(with_runtime(|runtime| runtime.get_resolved_config(config_id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_config_file_matching(config_id: u32) -> u32 {
    or_fatal(with_runtime(|runtime| runtime.get_config_file_matching(config_id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn set_override_config() {
    or_fatal(with_runtime(Runtime::set_override_config))
}

#[unsafe(no_mangle)]
pub extern "C" fn set_file_path() {
    or_fatal(with_runtime(Runtime::set_file_path))
}

#[unsafe(no_mangle)]
pub extern "C" fn format(config_id: u32) -> u32 {
    or_fatal(with_runtime(|runtime| runtime.format(config_id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn format_range(config_id: u32, range_start: u32, range_end: u32) -> u32 {
    or_fatal(with_runtime(|runtime| {
        runtime.format_range(config_id, range_start, range_end)
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_formatted_text() -> u32 {
    or_fatal(with_runtime(Runtime::get_formatted_text))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_error_text() -> u32 {
    or_fatal(with_runtime(Runtime::get_error_text))
}

#[unsafe(no_mangle)]
pub extern "C" fn check_config_updates() -> u32 {
    with_runtime(Runtime::check_config_updates)
}

#[unsafe(no_mangle)]
pub extern "C" fn get_shared_bytes_ptr() -> usize {
    with_runtime(|runtime| runtime.get_shared_bytes_ptr())
}

#[unsafe(no_mangle)]
pub extern "C" fn clear_shared_bytes(size: usize) -> usize {
    let size = or_fatal(u32::try_from(size).map_err(|err| {
        Error::new(ErrorKind::Protocol)
            .with_message("shared buffer size exceeds u32")
            .with_source(err)
    }));
    with_runtime(|runtime| runtime.clear_shared_bytes(size))
}
