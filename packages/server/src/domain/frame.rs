//! Opaque message unit exchanged over a connection.

use std::{fmt, sync::Arc};

/// Longest payload prefix rendered by the `Debug` impl.
const DEBUG_PREVIEW_LEN: usize = 32;

/// An immutable byte payload relayed between members.
///
/// The relay never inspects the contents. Cloning is cheap (reference
/// counted), so one broadcast can hand the same frame to every mailbox.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    /// Create a frame from any owned or borrowed byte buffer.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Frame {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for Frame {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<Vec<u8>> for Frame {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for Frame {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = &self.0[..self.0.len().min(DEBUG_PREVIEW_LEN)];
        f.debug_struct("Frame")
            .field("len", &self.0.len())
            .field("preview", &String::from_utf8_lossy(preview))
            .finish()
    }
}
