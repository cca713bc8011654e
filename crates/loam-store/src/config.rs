use serde::{Deserialize, Serialize};

/// Highest zlib compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Tuning knobs for on-disk object storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// zlib level, 0 (store) through 9 (best). Values above 9 are clamped.
    pub compression_level: u32,
    /// Re-hash every object on read and reject it if the digest differs
    /// from the requested id.
    pub verify_on_read: bool,
    /// `fsync` each object file before it is renamed into place.
    pub fsync: bool,
}

impl StoreConfig {
    pub fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(MAX_COMPRESSION_LEVEL))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            verify_on_read: true,
            fsync: false,
        }
    }
}
