//! Patch engine configuration.
//!
//! Everything here is host-version specific. The binding section names the
//! catalog fields the engine reaches into; `merge_tags` controls whether
//! tag associations are carried across a refreeze.
//!
//! ```toml
//! default_namespace = "core"
//! merge_tags = true
//! lease_timeout_ms = 250
//!
//! [binding]
//! tag_index_field = "tags"
//! pending_holders_pattern = "unregistered"
//! ```

use std::path::Path;
use std::time::Duration;

use graft_catalog::{DEFAULT_NAMESPACE, Identifier, IdentifierError};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Names of the catalog fields the engine binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
	/// Name of the frozen flag. `None` binds the catalog's only flag field.
	pub frozen_field: Option<String>,
	/// Name of the tag index field.
	pub tag_index_field: String,
	/// Case-insensitive substring identifying the pending-holder buffer.
	pub pending_holders_pattern: String,
}

impl Default for BindingConfig {
	fn default() -> Self {
		Self {
			frozen_field: None,
			tag_index_field: "tags".to_string(),
			pending_holders_pattern: "unregistered".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
	/// Namespace for entries registered by bare path.
	pub default_namespace: String,
	/// Carry pre-patch tag associations across the refreeze.
	pub merge_tags: bool,
	/// How long a patch operation waits for the catalog write lease.
	pub lease_timeout_ms: u64,
	pub binding: BindingConfig,
}

impl Default for PatchConfig {
	fn default() -> Self {
		Self {
			default_namespace: DEFAULT_NAMESPACE.to_string(),
			merge_tags: true,
			lease_timeout_ms: 250,
			binding: BindingConfig::default(),
		}
	}
}

impl PatchConfig {
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let src = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&src)
	}

	fn validate(&self) -> Result<(), IdentifierError> {
		Identifier::with_namespace(&self.default_namespace, "probe").map(drop)
	}

	pub fn lease_timeout(&self) -> Duration {
		Duration::from_millis(self.lease_timeout_ms)
	}

	/// Builds an identifier for `path` in the default namespace.
	pub fn identifier(&self, path: &str) -> Result<Identifier, IdentifierError> {
		Identifier::with_namespace(&self.default_namespace, path)
	}
}
