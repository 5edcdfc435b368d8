//! Record codec - plain or gzip-compressed JSON
//!
//! The codec is resolved once per record: at creation from the configured
//! default, at load from whichever encoding is found on disk.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Encoding of a persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Pretty-printed JSON, `.json` (default)
    #[default]
    Plain,
    /// Compact JSON through gzip, `.json.gz`
    Gzip,
}

impl Codec {
    /// Both codecs, in lookup order.
    pub const ALL: [Self; 2] = [Self::Plain, Self::Gzip];

    /// Codec for a compression flag.
    #[must_use]
    pub const fn from_compression(compressed: bool) -> Self {
        if compressed {
            Self::Gzip
        } else {
            Self::Plain
        }
    }

    /// Get codec name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
        }
    }

    /// File extension, without the leading dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Plain => "json",
            Self::Gzip => "json.gz",
        }
    }

    /// Whether records are compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip)
    }

    /// Serialize `value` into record bytes.
    ///
    /// # Errors
    /// Returns error if serialization or compression fails
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(serde_json::to_vec_pretty(value)?),
            Self::Gzip => {
                let json = serde_json::to_vec(value)?;
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&json)?;
                encoder
                    .finish()
                    .map_err(|e| Error::StorageError(format!("gzip compression failed: {e}")))
            }
        }
    }

    /// Deserialize record bytes.
    ///
    /// # Errors
    /// Returns error if decompression fails (e.g., corrupted data) or the
    /// JSON does not match `T`
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Plain => Ok(serde_json::from_slice(bytes)?),
            Self::Gzip => {
                let mut json = Vec::new();
                GzDecoder::new(bytes)
                    .read_to_end(&mut json)
                    .map_err(|e| Error::StorageError(format!("gzip decompression failed: {e}")))?;
                Ok(serde_json::from_slice(&json)?)
            }
        }
    }
}
