//! Transport tuning options.

use serde::Deserialize;

/// Payloads strictly larger than this many bytes are compressed and sent as binary frames.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

/// Options fixed when a transport is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Compress inline before the write instead of on the blocking pool.
    /// Only affects latency; the frames produced are identical.
    pub sync_compression: bool,
    /// Size gate for compression, in bytes of UTF-8.
    pub compression_threshold: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            sync_compression: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

impl TransportOptions {
    /// Set whether compression runs inline.
    pub fn with_sync_compression(mut self, sync: bool) -> Self {
        self.sync_compression = sync;
        self
    }

    /// Set the size above which payloads are compressed.
    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub(crate) fn should_compress(&self, message: &str) -> bool {
        message.len() > self.compression_threshold
    }
}
