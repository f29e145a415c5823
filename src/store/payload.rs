//! Opaque cache payload.
//!
//! A payload is an immutable byte sequence plus an absolute expiry instant.
//! The bytes are reference-counted so that handles can be cloned freely
//! between the store and callers, but the backing buffer is never exposed:
//! `bytes()` always returns a fresh copy, so nothing outside the cache can
//! mutate a cached value.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::lru::Measured;

/// Read-only view over a cached byte value.
#[derive(Debug, Clone)]
pub struct Payload {
    data: Arc<[u8]>,
    expires_at: Option<Instant>,
}

impl Payload {
    /// Builds a payload that never expires. The input is copied, so the
    /// caller keeps no handle into the cached buffer.
    pub fn new(bytes: &[u8]) -> Self {
        Self::with_expiry(bytes, None)
    }

    /// Builds a payload with an absolute expiry instant. `None` means the
    /// value never expires.
    pub fn with_expiry(bytes: &[u8], expires_at: Option<Instant>) -> Self {
        Self {
            data: Arc::from(bytes),
            expires_at,
        }
    }

    /// Length of the stored bytes, without copying.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The absolute expiry instant, if any.
    pub fn expiry(&self) -> Option<Instant> {
        self.expires_at
    }

    /// An independent copy of the stored bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}

impl Measured for Payload {
    fn len(&self) -> usize {
        self.data.len()
    }
}

impl Measured for String {
    fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

impl Measured for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }
}
