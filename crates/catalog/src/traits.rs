use std::sync::Arc;

use crate::error::CatalogError;
use crate::holder::Holder;
use crate::identifier::Identifier;
use crate::introspect::Introspect;
use crate::TagIndex;

/// Public surface of a sealed catalog.
///
/// Writes (`create_intrusive_holder`, `register`) are only valid while the
/// catalog is unfrozen. `freeze` seals it and recomputes derived indexes.
pub trait Catalog: Introspect {
	fn contains_key(&self, id: &Identifier) -> bool;

	fn get(&self, id: &Identifier) -> Option<Holder<Self::Value>>;

	/// Creates a holder for `value` ahead of its registration.
	fn create_intrusive_holder(
		&mut self,
		value: Arc<Self::Value>,
	) -> Result<Holder<Self::Value>, CatalogError>;

	/// Inserts `value` under `id` and returns its holder.
	fn register(
		&mut self,
		id: Identifier,
		value: Arc<Self::Value>,
	) -> Result<Holder<Self::Value>, CatalogError>;

	fn freeze(&mut self) -> Result<(), CatalogError>;

	fn is_frozen(&self) -> bool;

	fn tags(&self) -> &TagIndex;

	/// Replaces the tag index wholesale.
	fn bind_tags(&mut self, tags: TagIndex);

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
