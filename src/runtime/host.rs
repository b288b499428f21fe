//! Purpose: Guest-to-host calls: delegated formatting and cancellation polling.
//! Exports: `HostBridge`, `HostFormatCall`, `HostFormatter`, `FormatWithHost`, cancellation tokens,
//!          `DetachedHost`, `WasmHost` (wasm32 only), `default_host`.
//! Role: Reverse call path; reads host results back through the shared buffer.
//! Invariants: Host results are pulled with the same clear/write/take cycle the host uses to send data.
//! Invariants: An unknown host status code is recorded as a protocol violation, not a format error.
//! Notes: Outside wasm32 the detached host answers every delegated format with an error.

use crate::core::error::{Error, ErrorKind};
use crate::core::types::{FormatResult, FormatResultCode, HostFormatRequest};
use crate::runtime::buffer::SharedBuffer;

/// Arguments of one `host_format` call, borrowed for the duration of the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HostFormatCall<'a> {
    pub file_path: &'a str,
    pub range_start: u32,
    pub range_end: u32,
    pub override_config: &'a [u8],
    pub file_bytes: &'a [u8],
}

/// The host functions the guest imports.
pub trait HostBridge {
    /// Returns a raw format status code.
    fn format(&self, call: &HostFormatCall<'_>) -> u32;
    /// Length of the formatted text the host is holding after a `Change` status.
    fn formatted_text_len(&self) -> u32;
    /// Length of the error text the host is holding after an `Error` status.
    fn error_text_len(&self) -> u32;
    /// Host copies its pending bytes into `buffer`, which is already sized.
    fn write_buffer(&self, buffer: &mut [u8]);
    fn has_cancelled(&self) -> bool;
}

pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

pub struct NullCancellationToken;

impl CancellationToken for NullCancellationToken {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Polls the host on every query; there is no caching and no timeout.
pub struct HostCancellationToken<'a> {
    host: &'a dyn HostBridge,
}

impl<'a> HostCancellationToken<'a> {
    pub fn new(host: &'a dyn HostBridge) -> Self {
        Self { host }
    }
}

impl CancellationToken for HostCancellationToken<'_> {
    fn is_cancelled(&self) -> bool {
        self.host.has_cancelled()
    }
}

/// Callback handed to the formatter so it can delegate embedded regions.
pub trait FormatWithHost {
    fn format_with_host(&mut self, request: HostFormatRequest) -> FormatResult;
}

pub struct HostFormatter<'a> {
    buffer: &'a mut SharedBuffer,
    host: &'a dyn HostBridge,
    violation: Option<Error>,
}

impl<'a> HostFormatter<'a> {
    pub fn new(buffer: &'a mut SharedBuffer, host: &'a dyn HostBridge) -> Self {
        Self {
            buffer,
            host,
            violation: None,
        }
    }

    /// Protocol violation observed during any delegated call, if one occurred.
    pub fn into_violation(self) -> Option<Error> {
        self.violation
    }

    fn read_from_host(&mut self, len: u32) -> Vec<u8> {
        self.buffer.clear(len);
        self.host.write_buffer(self.buffer.as_mut_slice());
        self.buffer.take()
    }
}

impl FormatWithHost for HostFormatter<'_> {
    fn format_with_host(&mut self, request: HostFormatRequest) -> FormatResult {
        let override_config = if request.override_config.is_empty() {
            Vec::new()
        } else {
            match serde_json::to_vec(&request.override_config) {
                Ok(bytes) => bytes,
                Err(err) => return FormatResult::Error(err.to_string()),
            }
        };
        let (range_start, range_end) = match request.range {
            Some(range) => (range.start, range.end),
            None => (0, request.file_bytes.len() as u32),
        };

        let code = self.host.format(&HostFormatCall {
            file_path: &request.file_path,
            range_start,
            range_end,
            override_config: &override_config,
            file_bytes: &request.file_bytes,
        });

        match FormatResultCode::from_raw(code) {
            Some(FormatResultCode::NoChange) => FormatResult::NoChange,
            Some(FormatResultCode::Change) => {
                let len = self.host.formatted_text_len();
                FormatResult::Change(self.read_from_host(len))
            }
            Some(FormatResultCode::Error) => {
                let len = self.host.error_text_len();
                let text = self.read_from_host(len);
                FormatResult::Error(String::from_utf8_lossy(&text).into_owned())
            }
            None => {
                let message = format!("unknown host format value: {code}");
                self.violation = Some(Error::new(ErrorKind::Protocol).with_message(message.clone()));
                FormatResult::Error(message)
            }
        }
    }
}

const DETACHED_MESSAGE: &[u8] = b"host formatting is unavailable outside a wasm host";

/// Stand-in used when no host is attached (native builds, tests, the CLI).
#[derive(Debug, Default)]
pub struct DetachedHost;

impl HostBridge for DetachedHost {
    fn format(&self, _call: &HostFormatCall<'_>) -> u32 {
        FormatResultCode::Error as u32
    }

    fn formatted_text_len(&self) -> u32 {
        0
    }

    fn error_text_len(&self) -> u32 {
        DETACHED_MESSAGE.len() as u32
    }

    fn write_buffer(&self, buffer: &mut [u8]) {
        let len = buffer.len().min(DETACHED_MESSAGE.len());
        buffer[..len].copy_from_slice(&DETACHED_MESSAGE[..len]);
    }

    fn has_cancelled(&self) -> bool {
        false
    }
}

#[cfg(target_arch = "wasm32")]
mod imports {
    #[link(wasm_import_module = "dprint")]
    unsafe extern "C" {
        pub fn host_write_buffer(pointer: usize);
        pub fn host_format(
            file_path_ptr: usize,
            file_path_len: u32,
            range_start: u32,
            range_end: u32,
            override_config_ptr: usize,
            override_config_len: u32,
            file_bytes_ptr: usize,
            file_bytes_len: u32,
        ) -> u32;
        pub fn host_get_formatted_text() -> u32;
        pub fn host_get_error_text() -> u32;
        pub fn host_has_cancelled() -> u32;
    }
}

/// Host functions imported from the `dprint` wasm module.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct WasmHost;

#[cfg(target_arch = "wasm32")]
impl HostBridge for WasmHost {
    fn format(&self, call: &HostFormatCall<'_>) -> u32 {
        use crate::runtime::buffer::bytes_address;
        unsafe {
            imports::host_format(
                bytes_address(call.file_path.as_bytes()),
                call.file_path.len() as u32,
                call.range_start,
                call.range_end,
                bytes_address(call.override_config),
                call.override_config.len() as u32,
                bytes_address(call.file_bytes),
                call.file_bytes.len() as u32,
            )
        }
    }

    fn formatted_text_len(&self) -> u32 {
        unsafe { imports::host_get_formatted_text() }
    }

    fn error_text_len(&self) -> u32 {
        unsafe { imports::host_get_error_text() }
    }

    fn write_buffer(&self, buffer: &mut [u8]) {
        if buffer.is_empty() {
            return;
        }
        unsafe { imports::host_write_buffer(buffer.as_mut_ptr() as usize) }
    }

    fn has_cancelled(&self) -> bool {
        unsafe { imports::host_has_cancelled() == 1 }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn default_host() -> Box<dyn HostBridge> {
    Box::new(WasmHost)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_host() -> Box<dyn HostBridge> {
    Box::new(DetachedHost)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{HostBridge, HostFormatCall};
    use std::cell::{Cell, RefCell};

    #[derive(Clone, Debug, Default, PartialEq)]
    pub(crate) struct RecordedCall {
        pub file_path: String,
        pub range_start: u32,
        pub range_end: u32,
        pub override_config: Vec<u8>,
        pub file_bytes: Vec<u8>,
    }

    /// Scripted host that records the last delegated call.
    #[derive(Default)]
    pub(crate) struct ScriptedHost {
        pub status: u32,
        pub formatted_text: Vec<u8>,
        pub error_text: Vec<u8>,
        pub cancelled: Cell<bool>,
        pub pending: RefCell<Vec<u8>>,
        pub calls: RefCell<Vec<RecordedCall>>,
    }

    impl HostBridge for ScriptedHost {
        fn format(&self, call: &HostFormatCall<'_>) -> u32 {
            self.calls.borrow_mut().push(RecordedCall {
                file_path: call.file_path.to_string(),
                range_start: call.range_start,
                range_end: call.range_end,
                override_config: call.override_config.to_vec(),
                file_bytes: call.file_bytes.to_vec(),
            });
            self.status
        }

        fn formatted_text_len(&self) -> u32 {
            *self.pending.borrow_mut() = self.formatted_text.clone();
            self.formatted_text.len() as u32
        }

        fn error_text_len(&self) -> u32 {
            *self.pending.borrow_mut() = self.error_text.clone();
            self.error_text.len() as u32
        }

        fn write_buffer(&self, buffer: &mut [u8]) {
            buffer.copy_from_slice(&self.pending.borrow());
        }

        fn has_cancelled(&self) -> bool {
            self.cancelled.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedHost;
    use super::{
        CancellationToken, DetachedHost, FormatWithHost, HostCancellationToken, HostFormatter,
    };
    use crate::core::error::ErrorKind;
    use crate::core::types::{FormatRange, FormatResult, HostFormatRequest};
    use crate::core::value::{ConfigKeyMap, ConfigValue};
    use crate::runtime::buffer::SharedBuffer;

    fn request(range: Option<FormatRange>, override_config: ConfigKeyMap) -> HostFormatRequest {
        HostFormatRequest {
            file_path: "script.sh".to_string(),
            file_bytes: b"echo test\n".to_vec(),
            range,
            override_config,
        }
    }

    #[test]
    fn no_change_forwards_request() {
        let host = ScriptedHost::default();
        let mut buffer = SharedBuffer::new();
        let mut overrides = ConfigKeyMap::new();
        overrides.insert("useTabs".to_string(), ConfigValue::Bool(true));

        let mut formatter = HostFormatter::new(&mut buffer, &host);
        let result = formatter.format_with_host(request(
            Some(FormatRange { start: 2, end: 5 }),
            overrides,
        ));
        assert_eq!(result, FormatResult::NoChange);
        assert!(formatter.into_violation().is_none());

        let calls = host.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_path, "script.sh");
        assert_eq!((calls[0].range_start, calls[0].range_end), (2, 5));
        assert_eq!(calls[0].file_bytes, b"echo test\n".to_vec());
        assert_eq!(calls[0].override_config, br#"{"useTabs":true}"#.to_vec());
    }

    #[test]
    fn change_reads_formatted_bytes_and_defaults_range() {
        let host = ScriptedHost {
            status: 1,
            formatted_text: b"formatted\n".to_vec(),
            ..ScriptedHost::default()
        };
        let mut buffer = SharedBuffer::new();
        let mut formatter = HostFormatter::new(&mut buffer, &host);
        let result = formatter.format_with_host(request(None, ConfigKeyMap::new()));
        assert_eq!(result, FormatResult::Change(b"formatted\n".to_vec()));

        let calls = host.calls.borrow();
        assert_eq!((calls[0].range_start, calls[0].range_end), (0, 10));
        assert!(calls[0].override_config.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn error_reads_error_text() {
        let host = ScriptedHost {
            status: 2,
            error_text: b"host failed".to_vec(),
            ..ScriptedHost::default()
        };
        let mut buffer = SharedBuffer::new();
        let mut formatter = HostFormatter::new(&mut buffer, &host);
        let result = formatter.format_with_host(request(None, ConfigKeyMap::new()));
        assert_eq!(result, FormatResult::Error("host failed".to_string()));
    }

    #[test]
    fn unknown_status_is_recorded_as_violation() {
        let host = ScriptedHost {
            status: 9,
            ..ScriptedHost::default()
        };
        let mut buffer = SharedBuffer::new();
        let mut formatter = HostFormatter::new(&mut buffer, &host);
        let _ = formatter.format_with_host(request(None, ConfigKeyMap::new()));
        let violation = formatter.into_violation().expect("violation");
        assert_eq!(violation.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn detached_host_reports_an_error() {
        let host = DetachedHost;
        let mut buffer = SharedBuffer::new();
        let mut formatter = HostFormatter::new(&mut buffer, &host);
        let result = formatter.format_with_host(request(None, ConfigKeyMap::new()));
        let FormatResult::Error(message) = result else {
            panic!("expected error");
        };
        assert!(message.contains("unavailable"));
    }

    #[test]
    fn cancellation_polls_host_each_time() {
        let host = ScriptedHost::default();
        let token = HostCancellationToken::new(&host);
        assert!(!token.is_cancelled());
        host.cancelled.set(true);
        assert!(token.is_cancelled());
    }
}
