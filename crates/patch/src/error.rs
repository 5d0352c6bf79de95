use std::path::PathBuf;
use std::time::Duration;

use graft_catalog::{CatalogError, FieldKind, Identifier, IdentifierError};
use thiserror::Error;

/// The catalog does not have the internal shape this engine binds to.
///
/// Raised once, at bind time. It means the host version differs from the
/// one the binding configuration was written for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
	#[error("catalog {catalog}: no {kind} field matching {expected}")]
	MissingField {
		catalog: &'static str,
		kind: FieldKind,
		expected: String,
	},
	#[error("catalog {catalog}: {kind} field is ambiguous ({candidates:?}); configure it by name")]
	AmbiguousField {
		catalog: &'static str,
		kind: FieldKind,
		candidates: Vec<&'static str>,
	},
	#[error("catalog {catalog}: field {name:?} is declared as {declared} but exposes {actual:?}")]
	ShapeMismatch {
		catalog: &'static str,
		name: &'static str,
		declared: FieldKind,
		actual: Option<FieldKind>,
	},
}

/// Failure of a single patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
	/// Another writer holds the catalog.
	#[error("catalog {catalog}: write lease unavailable after {waited:?}")]
	LeaseUnavailable {
		catalog: &'static str,
		waited: Duration,
	},
	/// A patch cycle found the catalog already open for writes.
	#[error("catalog {catalog}: already unfrozen at start of patch cycle")]
	AlreadyUnfrozen { catalog: &'static str },
	/// A write ran while the catalog was frozen.
	#[error("catalog {catalog}: frozen while a write was in progress")]
	UnexpectedlyFrozen { catalog: &'static str },
	/// The catalog reports the id as present but has no entry for it.
	#[error("catalog {catalog}: {id} is registered but has no entry")]
	MissingEntry {
		catalog: &'static str,
		id: Identifier,
	},
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	#[error(transparent)]
	Catalog(#[from] CatalogError),
}

/// Errors loading a [`crate::PatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {}: {error}", path.display())]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},
	#[error("invalid patch config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("invalid default namespace: {0}")]
	Identifier(#[from] IdentifierError),
}
