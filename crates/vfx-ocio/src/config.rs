//! Configuration slice relevant to shader generation.
//!
//! Only the schema major version is modelled. Version 1 carries legacy
//! semantics (basic exponent with clamping only); 2 and later enable the
//! negative styles and the exponent-with-linear curve.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OcioError, OcioResult};

/// Config schema family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    /// OCIO v1.x.
    V1,
    /// OCIO v2.x and later.
    #[default]
    V2,
}

/// Minimal config: a settable schema major version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    major_version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { major_version: 2 }
    }
}

impl Config {
    /// Creates a config at the current schema version.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config at `major` version.
    pub fn with_major_version(major: u32) -> OcioResult<Self> {
        let mut config = Self::default();
        config.set_major_version(major)?;
        Ok(config)
    }

    /// Sets the schema major version. Version 0 is rejected.
    pub fn set_major_version(&mut self, major: u32) -> OcioResult<()> {
        if major == 0 {
            return Err(OcioError::InvalidVersion { version: major });
        }
        debug!(major, "config version");
        self.major_version = major;
        Ok(())
    }

    /// Raw major version.
    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    /// Schema family of this config.
    pub fn version(&self) -> ConfigVersion {
        if self.major_version == 1 { ConfigVersion::V1 } else { ConfigVersion::V2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_v2() {
        let config = Config::new();
        assert_eq!(config.major_version(), 2);
        assert_eq!(config.version(), ConfigVersion::V2);
    }

    #[test]
    fn test_set_versions() {
        let mut config = Config::new();
        config.set_major_version(1).unwrap();
        assert_eq!(config.version(), ConfigVersion::V1);
        config.set_major_version(3).unwrap();
        assert_eq!(config.version(), ConfigVersion::V2);
        assert_eq!(config.major_version(), 3);
    }

    #[test]
    fn test_zero_rejected() {
        let mut config = Config::new();
        assert!(matches!(
            config.set_major_version(0),
            Err(OcioError::InvalidVersion { version: 0 })
        ));
        assert_eq!(config.major_version(), 2);
    }
}
