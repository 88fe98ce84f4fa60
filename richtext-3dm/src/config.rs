//! Tunable parameters of a diff session.
//!
//! Every knob is an explicit value handed to the algorithms that use it.
//! A `DiffConfig` can be built in code or loaded from a TOML file; missing
//! keys fall back to the defaults in [`crate::constants`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::AlignConfig;
use crate::constants::{BODY_TAG, MAX_MATCH_RATIO, STRUCTURE_TAGS};
use crate::error::{Error, Result};

/// Configuration of a three-way diff session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Bounds for the sequence alignment primitive.
    #[serde(default)]
    pub align: AlignConfig,

    /// Tags whose text differs by more than this ratio are never identical.
    #[serde(default = "default_max_match_ratio")]
    pub max_match_ratio: f64,

    /// Tag names scoping structural conflicts. The body is always included.
    #[serde(default = "default_structure_tags")]
    pub structure_tags: Vec<String>,
}

fn default_max_match_ratio() -> f64 {
    MAX_MATCH_RATIO
}

fn default_structure_tags() -> Vec<String> {
    STRUCTURE_TAGS.iter().map(|s| s.to_string()).collect()
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            align: AlignConfig::default(),
            max_match_ratio: default_max_match_ratio(),
            structure_tags: default_structure_tags(),
        }
    }
}

impl DiffConfig {
    /// Loads a configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "loaded diff configuration");
        Ok(config)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: DiffConfig =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_match_ratio) {
            return Err(Error::Config(format!(
                "max_match_ratio must lie in [0, 1], got {}",
                self.max_match_ratio
            )));
        }
        if self.align.pow_limit < 1.0 {
            return Err(Error::Config(format!(
                "align.pow_limit must be at least 1, got {}",
                self.align.pow_limit
            )));
        }
        if self.align.too_long <= 0.0 {
            return Err(Error::Config(format!(
                "align.too_long must be positive, got {}",
                self.align.too_long
            )));
        }
        Ok(())
    }

    /// Returns true if the tag name scopes structural conflicts.
    pub fn is_structure_tag(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(BODY_TAG)
            || self
                .structure_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(name))
    }
}
