//! Namespaced identifiers for catalog entries, tags and external keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdentifierError;

/// Namespace used when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "core";

/// Identity of a catalog entry, written `namespace:path`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
	namespace: Box<str>,
	path: Box<str>,
}

fn valid_namespace_char(c: char) -> bool {
	matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn valid_path_char(c: char) -> bool {
	valid_namespace_char(c) || c == '/'
}

impl Identifier {
	/// Builds an identifier from explicit parts, validating both.
	pub fn with_namespace(namespace: &str, path: &str) -> Result<Self, IdentifierError> {
		if namespace.is_empty() || !namespace.chars().all(valid_namespace_char) {
			return Err(IdentifierError::InvalidNamespace(namespace.to_string()));
		}
		if path.is_empty() || !path.chars().all(valid_path_char) {
			return Err(IdentifierError::InvalidPath(path.to_string()));
		}
		Ok(Self {
			namespace: namespace.into(),
			path: path.into(),
		})
	}

	/// Builds an identifier in [`DEFAULT_NAMESPACE`].
	pub fn with_default_namespace(path: &str) -> Result<Self, IdentifierError> {
		Self::with_namespace(DEFAULT_NAMESPACE, path)
	}

	/// Parses `namespace:path`, or a bare `path` in [`DEFAULT_NAMESPACE`].
	pub fn parse(s: &str) -> Result<Self, IdentifierError> {
		if s.is_empty() {
			return Err(IdentifierError::Empty);
		}
		match s.split_once(':') {
			Some((namespace, path)) => Self::with_namespace(namespace, path),
			None => Self::with_default_namespace(s),
		}
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn path(&self) -> &str {
		&self.path
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.namespace, self.path)
	}
}

impl fmt::Debug for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Identifier({self})")
	}
}

impl FromStr for Identifier {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for Identifier {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Identifier {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}

/// Category label in a catalog's tag index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(Identifier);

impl TagId {
	/// Parses a tag name, accepting an optional leading `#`.
	pub fn parse(s: &str) -> Result<Self, IdentifierError> {
		Identifier::parse(s.strip_prefix('#').unwrap_or(s)).map(Self)
	}
}

impl fmt::Display for TagId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

impl fmt::Debug for TagId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TagId({self})")
	}
}

impl FromStr for TagId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Key used by external consumers of the catalog.
///
/// Carries the same information as an [`Identifier`] but belongs to the
/// consumer-facing layer; conversion is explicit.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ExternalKey {
	namespace: Box<str>,
	key: Box<str>,
}

impl ExternalKey {
	pub fn new(namespace: &str, key: &str) -> Result<Self, IdentifierError> {
		let id = Identifier::with_namespace(namespace, key)?;
		Ok(Self::from(&id))
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Path part of the key, without its namespace.
	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn to_identifier(&self) -> Identifier {
		Identifier {
			namespace: self.namespace.clone(),
			path: self.key.clone(),
		}
	}
}

impl From<&Identifier> for ExternalKey {
	fn from(id: &Identifier) -> Self {
		Self {
			namespace: id.namespace.clone(),
			key: id.path.clone(),
		}
	}
}

impl fmt::Display for ExternalKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.namespace, self.key)
	}
}

impl fmt::Debug for ExternalKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ExternalKey({self})")
	}
}
