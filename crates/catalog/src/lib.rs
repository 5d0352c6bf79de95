//! Sealed entity catalog.
//!
//! This crate provides the host side of the catalog:
//! - [`MappedCatalog`]: identifier-keyed entries with a one-shot freeze and
//!   a tag index derived at freeze time
//! - [`Holder`]: shared reference to a catalog value
//! - [`ExternalRegistry`]: consumer-facing lookup with a memoizing cache
//! - [`Catalog`] / [`Introspect`]: the public and field-level surfaces that
//!   external tooling binds to

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

mod error;
mod external;
mod holder;
mod identifier;
mod introspect;
mod mapped;
mod traits;

pub use error::{CatalogError, IdentifierError};
pub use external::{ExternalRegistry, Mapper};
pub use holder::Holder;
pub use identifier::{DEFAULT_NAMESPACE, ExternalKey, Identifier, TagId};
pub use introspect::{FieldDescriptor, FieldKind, FieldMut, FieldRef, Introspect};
pub use mapped::MappedCatalog;
pub use traits::Catalog;

/// Entry storage: identifier to holder.
pub type EntryMap<T> = FxHashMap<Identifier, Holder<T>>;

/// Tag index: tag to member identifiers.
pub type TagIndex = FxHashMap<TagId, BTreeSet<Identifier>>;

/// Process-wide catalog instance shared between the host and its readers.
pub type SharedCatalog<C> = Arc<RwLock<C>>;

/// Wraps a catalog for process-wide sharing.
pub fn shared<C>(catalog: C) -> SharedCatalog<C> {
	Arc::new(RwLock::new(catalog))
}
