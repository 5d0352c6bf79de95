//! Hash-mapped catalog with a one-shot freeze.
//!
//! # Lifecycle
//!
//! 1. The host registers entries and declares tags while unfrozen.
//! 2. [`MappedCatalog::freeze`] resolves the pending tag declarations into
//!    the tag index and seals the catalog.
//! 3. Afterwards only reads and [`MappedCatalog::bind_tags`] are allowed.
//!
//! `freeze` rebuilds the tag index from pending declarations only. Tags
//! resolved by an earlier freeze are not carried over.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::holder::Holder;
use crate::identifier::{Identifier, TagId};
use crate::introspect::{FieldDescriptor, FieldKind, FieldMut, FieldRef, Introspect};
use crate::traits::Catalog;
use crate::{EntryMap, TagIndex};

/// Catalog backed by hash maps.
pub struct MappedCatalog<T> {
	label: &'static str,
	by_id: EntryMap<T>,
	frozen: bool,
	tags: TagIndex,
	pending_tags: TagIndex,
	unregistered_intrusive_holders: Vec<Holder<T>>,
}

impl<T> MappedCatalog<T> {
	/// Creates an empty, unfrozen catalog.
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			by_id: FxHashMap::default(),
			frozen: false,
			tags: FxHashMap::default(),
			pending_tags: FxHashMap::default(),
			unregistered_intrusive_holders: Vec::new(),
		}
	}

	fn ensure_unfrozen(&self, op: &'static str) -> Result<(), CatalogError> {
		if self.frozen {
			return Err(CatalogError::Frozen {
				label: self.label,
				op,
			});
		}
		Ok(())
	}

	pub fn contains_key(&self, id: &Identifier) -> bool {
		self.by_id.contains_key(id)
	}

	pub fn get(&self, id: &Identifier) -> Option<Holder<T>> {
		self.by_id.get(id).cloned()
	}

	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}

	pub fn is_frozen(&self) -> bool {
		self.frozen
	}

	pub fn tags(&self) -> &TagIndex {
		&self.tags
	}

	/// Returns the members of `tag` as resolved by the last freeze or bind.
	pub fn tag(&self, tag: &TagId) -> Option<&BTreeSet<Identifier>> {
		self.tags.get(tag)
	}

	/// Number of holders created but not yet registered.
	pub fn unregistered_holders(&self) -> usize {
		self.unregistered_intrusive_holders.len()
	}

	/// Declares tag members, resolved at the next freeze.
	pub fn declare_tag<I>(&mut self, tag: TagId, members: I) -> Result<(), CatalogError>
	where
		I: IntoIterator<Item = Identifier>,
	{
		self.ensure_unfrozen("declare_tag")?;
		self.pending_tags.entry(tag).or_default().extend(members);
		Ok(())
	}

	pub fn create_intrusive_holder(&mut self, value: Arc<T>) -> Result<Holder<T>, CatalogError> {
		self.ensure_unfrozen("create_intrusive_holder")?;
		let holder = Holder::unbound(value);
		self.unregistered_intrusive_holders.push(holder.clone());
		Ok(holder)
	}

	pub fn register(&mut self, id: Identifier, value: Arc<T>) -> Result<Holder<T>, CatalogError> {
		self.ensure_unfrozen("register")?;
		if self.by_id.contains_key(&id) {
			return Err(CatalogError::DuplicateId {
				label: self.label,
				id,
			});
		}

		let pending = self
			.unregistered_intrusive_holders
			.iter()
			.position(|h| h.holds(&value));
		let holder = match pending {
			Some(idx) => {
				let holder = self.unregistered_intrusive_holders.swap_remove(idx);
				holder.bind(id.clone());
				holder
			}
			None => Holder::bound(id.clone(), value),
		};

		debug!(catalog = self.label, id = %id, intrusive = pending.is_some(), "registered entry");
		self.by_id.insert(id, holder.clone());
		Ok(holder)
	}

	/// Seals the catalog and resolves pending tag declarations.
	pub fn freeze(&mut self) -> Result<(), CatalogError> {
		if self.frozen {
			return Err(CatalogError::AlreadyFrozen { label: self.label });
		}
		if !self.unregistered_intrusive_holders.is_empty() {
			return Err(CatalogError::UnboundHolders {
				label: self.label,
				count: self.unregistered_intrusive_holders.len(),
			});
		}

		let mut resolved: TagIndex = FxHashMap::default();
		for (tag, members) in std::mem::take(&mut self.pending_tags) {
			let mut present = BTreeSet::new();
			for member in members {
				if self.by_id.contains_key(&member) {
					present.insert(member);
				} else {
					warn!(catalog = self.label, tag = %tag, member = %member, "dropping unknown tag member");
				}
			}
			resolved.insert(tag, present);
		}

		debug!(catalog = self.label, entries = self.by_id.len(), tags = resolved.len(), "catalog frozen");
		self.tags = resolved;
		self.frozen = true;
		Ok(())
	}

	pub fn bind_tags(&mut self, tags: TagIndex) {
		self.tags = tags;
	}
}

impl<T> Introspect for MappedCatalog<T> {
	type Value = T;

	const FIELDS: &'static [FieldDescriptor] = &[
		FieldDescriptor::new("by_id", FieldKind::Entries),
		FieldDescriptor::new("frozen", FieldKind::Flag),
		FieldDescriptor::new("tags", FieldKind::TagIndex),
		FieldDescriptor::new("pending_tags", FieldKind::TagIndex),
		FieldDescriptor::new("unregistered_intrusive_holders", FieldKind::HolderBuffer),
	];

	fn label(&self) -> &'static str {
		self.label
	}

	fn field(&self, slot: usize) -> Option<FieldRef<'_, T>> {
		Some(match slot {
			0 => FieldRef::Entries(&self.by_id),
			1 => FieldRef::Flag(&self.frozen),
			2 => FieldRef::TagIndex(&self.tags),
			3 => FieldRef::TagIndex(&self.pending_tags),
			4 => FieldRef::HolderBuffer(&self.unregistered_intrusive_holders),
			_ => return None,
		})
	}

	fn field_mut(&mut self, slot: usize) -> Option<FieldMut<'_, T>> {
		Some(match slot {
			0 => FieldMut::Entries(&mut self.by_id),
			1 => FieldMut::Flag(&mut self.frozen),
			2 => FieldMut::TagIndex(&mut self.tags),
			3 => FieldMut::TagIndex(&mut self.pending_tags),
			4 => FieldMut::HolderBuffer(&mut self.unregistered_intrusive_holders),
			_ => return None,
		})
	}
}

impl<T> Catalog for MappedCatalog<T> {
	fn contains_key(&self, id: &Identifier) -> bool {
		MappedCatalog::contains_key(self, id)
	}

	fn get(&self, id: &Identifier) -> Option<Holder<T>> {
		MappedCatalog::get(self, id)
	}

	fn create_intrusive_holder(&mut self, value: Arc<T>) -> Result<Holder<T>, CatalogError> {
		MappedCatalog::create_intrusive_holder(self, value)
	}

	fn register(&mut self, id: Identifier, value: Arc<T>) -> Result<Holder<T>, CatalogError> {
		MappedCatalog::register(self, id, value)
	}

	fn freeze(&mut self) -> Result<(), CatalogError> {
		MappedCatalog::freeze(self)
	}

	fn is_frozen(&self) -> bool {
		self.frozen
	}

	fn tags(&self) -> &TagIndex {
		&self.tags
	}

	fn bind_tags(&mut self, tags: TagIndex) {
		MappedCatalog::bind_tags(self, tags)
	}

	fn len(&self) -> usize {
		self.by_id.len()
	}
}
