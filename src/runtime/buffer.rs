// Single shared byte channel between guest and host.

/// Owned byte buffer exposed to the host only as (address, length).
///
/// At most one payload is live at a time. `take` moves it out and leaves the
/// buffer empty; `set` replaces the backing storage rather than copying into it.
#[derive(Debug, Default)]
pub struct SharedBuffer {
    bytes: Vec<u8>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Address of the first byte, or 0 when empty.
    pub fn address(&self) -> usize {
        bytes_address(&self.bytes)
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Replaces the payload and returns its length as reported to the host.
    pub fn set(&mut self, bytes: Vec<u8>) -> u32 {
        self.bytes = bytes;
        self.bytes.len() as u32
    }

    /// Resizes to `size` zeroed bytes, reusing storage when it is large enough.
    pub fn clear(&mut self, size: u32) -> usize {
        let size = size as usize;
        if self.bytes.capacity() >= size {
            self.bytes.clear();
            self.bytes.resize(size, 0);
        } else {
            self.bytes = vec![0; size];
        }
        self.address()
    }

    /// Consumes the payload as UTF-8 text.
    pub fn take_text(&mut self) -> Result<String, Vec<u8>> {
        String::from_utf8(self.take()).map_err(|err| err.into_bytes())
    }
}

pub fn bytes_address(bytes: &[u8]) -> usize {
    if bytes.is_empty() {
        0
    } else {
        bytes.as_ptr() as usize
    }
}
