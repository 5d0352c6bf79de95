//! Field-level shape surface of a catalog implementation.
//!
//! A catalog publishes a static table of its internal fields. Callers that
//! need to reach past the public surface (see the patch engine) locate the
//! fields they need by name or kind once, then access them by slot.
//!
//! The table is part of a catalog's versioned contract: renaming or removing
//! a field is a breaking change for anything bound to it.

use std::fmt;

use crate::{EntryMap, Holder, TagIndex};

/// Kind of an internal catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
	/// Boolean flag (e.g. the frozen bit).
	Flag,
	/// Identifier to holder map.
	Entries,
	/// Tag to member set map.
	TagIndex,
	/// Holders created but not yet registered.
	HolderBuffer,
}

impl fmt::Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Flag => "flag",
			Self::Entries => "entries",
			Self::TagIndex => "tag index",
			Self::HolderBuffer => "holder buffer",
		})
	}
}

/// Static description of one internal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
	pub name: &'static str,
	pub kind: FieldKind,
}

impl FieldDescriptor {
	pub const fn new(name: &'static str, kind: FieldKind) -> Self {
		Self { name, kind }
	}
}

/// Shared view of an internal field.
pub enum FieldRef<'a, T> {
	Flag(&'a bool),
	Entries(&'a EntryMap<T>),
	TagIndex(&'a TagIndex),
	HolderBuffer(&'a [Holder<T>]),
}

/// Exclusive view of an internal field.
pub enum FieldMut<'a, T> {
	Flag(&'a mut bool),
	Entries(&'a mut EntryMap<T>),
	TagIndex(&'a mut TagIndex),
	HolderBuffer(&'a mut Vec<Holder<T>>),
}

impl<T> FieldRef<'_, T> {
	pub fn kind(&self) -> FieldKind {
		match self {
			Self::Flag(_) => FieldKind::Flag,
			Self::Entries(_) => FieldKind::Entries,
			Self::TagIndex(_) => FieldKind::TagIndex,
			Self::HolderBuffer(_) => FieldKind::HolderBuffer,
		}
	}
}

impl<T> FieldMut<'_, T> {
	pub fn kind(&self) -> FieldKind {
		match self {
			Self::Flag(_) => FieldKind::Flag,
			Self::Entries(_) => FieldKind::Entries,
			Self::TagIndex(_) => FieldKind::TagIndex,
			Self::HolderBuffer(_) => FieldKind::HolderBuffer,
		}
	}
}

/// Slot-indexed access to a catalog's internal fields.
///
/// `FIELDS[slot]` must describe what `field(slot)` and `field_mut(slot)`
/// return; slots past the table end return `None`.
pub trait Introspect {
	/// Payload type stored in the catalog's holders.
	type Value;

	/// Field table, in slot order.
	const FIELDS: &'static [FieldDescriptor];

	/// Label used in logs and errors.
	fn label(&self) -> &'static str;

	fn field(&self, slot: usize) -> Option<FieldRef<'_, Self::Value>>;

	fn field_mut(&mut self, slot: usize) -> Option<FieldMut<'_, Self::Value>>;
}
