use thiserror::Error;

use crate::identifier::Identifier;

/// Rejected identifier text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
	#[error("identifier is empty")]
	Empty,
	#[error("invalid namespace {0:?} (expected [a-z0-9_.-]+)")]
	InvalidNamespace(String),
	#[error("invalid path {0:?} (expected [a-z0-9_.-/]+)")]
	InvalidPath(String),
}

/// Errors raised by the catalog's own public surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
	/// A write was attempted after the catalog was sealed.
	#[error("catalog {label}: {op} is not allowed while frozen")]
	Frozen { label: &'static str, op: &'static str },
	/// `freeze` was called on a catalog that is already frozen.
	#[error("catalog {label}: already frozen")]
	AlreadyFrozen { label: &'static str },
	/// An identifier was registered twice.
	#[error("catalog {label}: duplicate id {id}")]
	DuplicateId { label: &'static str, id: Identifier },
	/// Intrusive holders were created but never registered before freezing.
	#[error("catalog {label}: {count} intrusive holder(s) were never registered")]
	UnboundHolders { label: &'static str, count: usize },
}
