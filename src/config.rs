//! Configuration - where records live and how they are encoded
//!
//! ```rust
//! use expflow::{Codec, Config};
//!
//! let config = Config::builder()
//!     .base_dir("/srv/lab/expflow")
//!     .compression(true)
//!     .build();
//! assert_eq!(config.codec(), Codec::Gzip);
//! ```

use std::path::{Path, PathBuf};

use crate::store::{Codec, FileRecordStore};
use crate::Result;

/// Environment variable naming the permanent base directory.
pub const ENV_DIR: &str = "EXPFLOW_DIR";

/// Environment variable toggling gzip compression for new records.
pub const ENV_COMPRESSION: &str = "EXPFLOW_COMPRESSION";

/// Record store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    base_dir: Option<PathBuf>,
    codec: Codec,
}

impl Config {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read `EXPFLOW_DIR` and `EXPFLOW_COMPRESSION` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::builder();
        if let Some(dir) = lookup(ENV_DIR).filter(|d| !d.trim().is_empty()) {
            builder = builder.base_dir(dir);
        }
        if let Some(raw) = lookup(ENV_COMPRESSION) {
            builder = builder.compression(parse_flag(&raw));
        }
        builder.build()
    }

    /// Permanent base directory, if configured.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Codec for newly created records.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Open the file store this config describes.
    ///
    /// Without a base directory, falls back to a temporary directory that
    /// is removed when the store is dropped and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn open_store(&self) -> Result<FileRecordStore> {
        match &self.base_dir {
            Some(dir) => FileRecordStore::open(dir),
            None => FileRecordStore::ephemeral(),
        }
    }
}

/// Config builder
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base_dir: Option<PathBuf>,
    codec: Codec,
}

impl ConfigBuilder {
    /// Set the permanent base directory
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Set the codec for new records
    #[must_use]
    pub const fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Gzip new records (`true`) or write plain JSON (`false`)
    #[must_use]
    pub const fn compression(self, compressed: bool) -> Self {
        self.codec(Codec::from_compression(compressed))
    }

    /// Build the config
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            base_dir: self.base_dir,
            codec: self.codec,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "gzip" => true,
        "" | "0" | "false" | "no" | "off" | "plain" => false,
        other => {
            tracing::warn!(
                value = other,
                "{ENV_COMPRESSION} not understood; writing uncompressed records"
            );
            false
        }
    }
}
