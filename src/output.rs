use std::sync::{Arc, Mutex};

/// Append-only byte sink attached to a child's stdout or stderr.
///
/// Clones share the same underlying buffer, so the accumulated output
/// survives restarts: every generation of a supervised process appends to
/// the same sink.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk to the buffer.
    pub(crate) fn append(&self, chunk: &[u8]) {
        self.bytes
            .lock()
            .expect("output buffer lock poisoned")
            .extend_from_slice(chunk);
    }

    /// Returns a copy of everything written so far.
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .expect("output buffer lock poisoned")
            .clone()
    }
}
