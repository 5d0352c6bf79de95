//! Typed access to a catalog's internal fields.
//!
//! [`CatalogHandle::bind`] resolves the frozen flag, the tag index and the
//! pending-holder buffer against the catalog's [`Introspect`] field table,
//! once, and checks each against the live instance. Every later access goes
//! straight to the bound slot.
//!
//! # Invariants
//!
//! - A bound slot always exposes the kind it was bound as. A catalog whose
//!   field table disagrees with its accessors fails [`CatalogHandle::bind`]
//!   with [`BindError::ShapeMismatch`]; accessors panic if the shape changes
//!   after a successful bind.

use std::marker::PhantomData;

use graft_catalog::{
	Catalog, CatalogError, FieldKind, FieldMut, FieldRef, Holder, Identifier, Introspect,
};
use tracing::debug;

use crate::config::BindingConfig;
use crate::error::BindError;
use crate::tags::TagSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
	index: usize,
	name: &'static str,
	kind: FieldKind,
}

/// Bound view of one catalog type's internals.
pub struct CatalogHandle<C> {
	catalog: &'static str,
	frozen: Slot,
	tags: Slot,
	pending: Slot,
	_marker: PhantomData<fn(&mut C)>,
}

impl<C> Clone for CatalogHandle<C> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<C> Copy for CatalogHandle<C> {}

impl<C> std::fmt::Debug for CatalogHandle<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CatalogHandle")
			.field("catalog", &self.catalog)
			.field("frozen", &self.frozen.name)
			.field("tags", &self.tags.name)
			.field("pending", &self.pending.name)
			.finish()
	}
}

impl<C: Introspect> CatalogHandle<C> {
	/// Binds to `catalog`'s internals as described by `binding`.
	pub fn bind(catalog: &C, binding: &BindingConfig) -> Result<Self, BindError> {
		let label = catalog.label();

		let frozen = match &binding.frozen_field {
			Some(name) => find_named::<C>(label, FieldKind::Flag, name)?,
			None => find_unique::<C>(label, FieldKind::Flag)?,
		};
		let tags = find_named::<C>(label, FieldKind::TagIndex, &binding.tag_index_field)?;
		let pending = find_matching::<C>(
			label,
			FieldKind::HolderBuffer,
			&binding.pending_holders_pattern,
		)?;

		for slot in [frozen, tags, pending] {
			let actual = catalog.field(slot.index).map(|f| f.kind());
			if actual != Some(slot.kind) {
				return Err(BindError::ShapeMismatch {
					catalog: label,
					name: slot.name,
					declared: slot.kind,
					actual,
				});
			}
		}

		debug!(
			catalog = label,
			frozen = frozen.name,
			tags = tags.name,
			pending = pending.name,
			"bound catalog internals"
		);

		Ok(Self {
			catalog: label,
			frozen,
			tags,
			pending,
			_marker: PhantomData,
		})
	}

	pub fn label(&self) -> &'static str {
		self.catalog
	}

	fn drifted(&self, slot: Slot) -> ! {
		panic!(
			"catalog {}: field {:?} no longer exposes a {} after bind",
			self.catalog, slot.name, slot.kind
		)
	}

	pub fn is_frozen(&self, catalog: &C) -> bool {
		match catalog.field(self.frozen.index) {
			Some(FieldRef::Flag(frozen)) => *frozen,
			_ => self.drifted(self.frozen),
		}
	}

	fn frozen_flag<'c>(&self, catalog: &'c mut C) -> &'c mut bool {
		match catalog.field_mut(self.frozen.index) {
			Some(FieldMut::Flag(frozen)) => frozen,
			_ => self.drifted(self.frozen),
		}
	}

	pub fn snapshot_tags(&self, catalog: &C) -> TagSnapshot {
		match catalog.field(self.tags.index) {
			Some(FieldRef::TagIndex(tags)) => TagSnapshot::capture(tags),
			_ => self.drifted(self.tags),
		}
	}

	/// Replaces the catalog's tag index with `tags`.
	pub fn restore_tags(&self, catalog: &mut C, tags: TagSnapshot) {
		match catalog.field_mut(self.tags.index) {
			Some(FieldMut::TagIndex(index)) => *index = tags.into_index(),
			_ => self.drifted(self.tags),
		}
	}

	/// Discards holders created but never registered. Returns how many.
	pub fn clear_pending_holders(&self, catalog: &mut C) -> usize {
		match catalog.field_mut(self.pending.index) {
			Some(FieldMut::HolderBuffer(buffer)) => {
				let discarded = buffer.len();
				buffer.clear();
				discarded
			}
			_ => self.drifted(self.pending),
		}
	}
}

impl<C: Catalog> CatalogHandle<C> {
	pub fn contains_key(&self, catalog: &C, id: &Identifier) -> bool {
		catalog.contains_key(id)
	}

	pub fn get(&self, catalog: &C, id: &Identifier) -> Option<Holder<C::Value>> {
		catalog.get(id)
	}

	/// Opens or seals the catalog.
	///
	/// Unfreezing flips the bound flag directly. Freezing goes through the
	/// catalog's own freeze so its derived indexes are recomputed; an
	/// already-frozen catalog is left as is.
	pub fn set_frozen(&self, catalog: &mut C, frozen: bool) -> Result<(), CatalogError> {
		if !frozen {
			*self.frozen_flag(catalog) = false;
			return Ok(());
		}
		match catalog.freeze() {
			Ok(()) | Err(CatalogError::AlreadyFrozen { .. }) => Ok(()),
			Err(e) => Err(e),
		}
	}
}

fn find_named<C: Introspect>(
	catalog: &'static str,
	kind: FieldKind,
	name: &str,
) -> Result<Slot, BindError> {
	C::FIELDS
		.iter()
		.enumerate()
		.find(|(_, f)| f.kind == kind && f.name == name)
		.map(|(index, f)| Slot {
			index,
			name: f.name,
			kind,
		})
		.ok_or_else(|| BindError::MissingField {
			catalog,
			kind,
			expected: format!("name {name:?}"),
		})
}

fn find_unique<C: Introspect>(catalog: &'static str, kind: FieldKind) -> Result<Slot, BindError> {
	select_one::<C>(catalog, kind, "any name".to_string(), |_| true)
}

fn find_matching<C: Introspect>(
	catalog: &'static str,
	kind: FieldKind,
	pattern: &str,
) -> Result<Slot, BindError> {
	let needle = pattern.to_lowercase();
	select_one::<C>(catalog, kind, format!("pattern {pattern:?}"), |name| {
		name.to_lowercase().contains(&needle)
	})
}

fn select_one<C: Introspect>(
	catalog: &'static str,
	kind: FieldKind,
	expected: String,
	accept: impl Fn(&str) -> bool,
) -> Result<Slot, BindError> {
	let candidates: Vec<(usize, &'static str)> = C::FIELDS
		.iter()
		.enumerate()
		.filter(|(_, f)| f.kind == kind && accept(f.name))
		.map(|(index, f)| (index, f.name))
		.collect();

	match candidates.as_slice() {
		[] => Err(BindError::MissingField {
			catalog,
			kind,
			expected,
		}),
		[(index, name)] => Ok(Slot {
			index: *index,
			name: *name,
			kind,
		}),
		_ => Err(BindError::AmbiguousField {
			catalog,
			kind,
			candidates: candidates.iter().map(|(_, name)| *name).collect(),
		}),
	}
}
