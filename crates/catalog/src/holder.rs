//! Intrusive holders: the host's first-class reference to a catalog value.
//!
//! A holder wraps the payload allocation and a bind-once key slot. Holders
//! created through [`crate::MappedCatalog::create_intrusive_holder`] start
//! unbound and receive their key when the matching payload is registered.

use std::sync::{Arc, OnceLock};

use crate::identifier::Identifier;

struct HolderInner<T> {
	value: Arc<T>,
	key: OnceLock<Identifier>,
}

/// Shared reference to a catalog value.
pub struct Holder<T>(Arc<HolderInner<T>>);

impl<T> Clone for Holder<T> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}

impl<T> Holder<T> {
	pub(crate) fn unbound(value: Arc<T>) -> Self {
		Self(Arc::new(HolderInner {
			value,
			key: OnceLock::new(),
		}))
	}

	pub(crate) fn bound(key: Identifier, value: Arc<T>) -> Self {
		let holder = Self::unbound(value);
		holder.bind(key);
		holder
	}

	/// Binds the key once; later calls keep the first key.
	pub(crate) fn bind(&self, key: Identifier) {
		let _ = self.0.key.set(key);
	}

	/// Returns the registered key, if the holder has been bound.
	pub fn key(&self) -> Option<&Identifier> {
		self.0.key.get()
	}

	pub fn is_bound(&self) -> bool {
		self.0.key.get().is_some()
	}

	pub fn value(&self) -> &T {
		&self.0.value
	}

	/// True if this holder wraps the given payload allocation.
	pub fn holds(&self, value: &Arc<T>) -> bool {
		Arc::ptr_eq(&self.0.value, value)
	}

	/// Identity comparison: both handles refer to the same holder.
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}
}

impl<T> std::ops::Deref for Holder<T> {
	type Target = T;

	fn deref(&self) -> &T {
		self.value()
	}
}

impl<T> std::fmt::Debug for Holder<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Holder").field("key", &self.key()).finish_non_exhaustive()
	}
}
