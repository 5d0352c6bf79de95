//! Merged native/custom lookup for external consumers.
//!
//! [`FacadeCache::install`] swaps the external registry's mapper for one
//! that asks the custom-entry provider first and falls back to the native
//! catalog. Consumers keep calling the same registry and cannot tell which
//! side answered beyond [`Facade::is_custom`].
//!
//! The registry's lookup cache has no per-key hook, so every change to the
//! merged entry set clears it entirely.

use std::sync::Arc;

use graft_catalog::{Catalog, ExternalKey, ExternalRegistry, Holder, Mapper, SharedCatalog};
use tracing::{debug, info};

use crate::injector::{EntryInjector, EntryProvider, InjectedEntry, LookupInvalidator};

/// What external consumers receive for a key.
///
/// Exactly one of the native and custom views is present.
pub enum Facade<T> {
	Native(Holder<T>),
	Custom(InjectedEntry<T>),
}

impl<T> Facade<T> {
	pub fn native_ref(&self) -> Option<&Holder<T>> {
		match self {
			Self::Native(holder) => Some(holder),
			Self::Custom(_) => None,
		}
	}

	pub fn custom_ref(&self) -> Option<&InjectedEntry<T>> {
		match self {
			Self::Native(_) => None,
			Self::Custom(entry) => Some(entry),
		}
	}

	pub fn holder(&self) -> &Holder<T> {
		match self {
			Self::Native(holder) => holder,
			Self::Custom(entry) => entry.holder(),
		}
	}

	pub fn value(&self) -> &T {
		self.holder().value()
	}

	pub fn is_custom(&self) -> bool {
		matches!(self, Self::Custom(_))
	}
}

impl<T> Clone for Facade<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Native(holder) => Self::Native(holder.clone()),
			Self::Custom(entry) => Self::Custom(entry.clone()),
		}
	}
}

impl<T> std::fmt::Debug for Facade<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Native(holder) => f.debug_tuple("Native").field(&holder.key()).finish(),
			Self::Custom(entry) => f.debug_tuple("Custom").field(entry.id()).finish(),
		}
	}
}

impl<V: Send + Sync> LookupInvalidator for ExternalRegistry<V> {
	fn invalidate_all(&self) {
		self.clear_cache();
	}
}

/// Owns the merged resolution installed on an [`ExternalRegistry`].
pub struct FacadeCache<C: Catalog> {
	catalog: SharedCatalog<C>,
	external: Arc<ExternalRegistry<Facade<C::Value>>>,
}

impl<C> FacadeCache<C>
where
	C: Catalog + Send + Sync + 'static,
	C::Value: Send + Sync + 'static,
{
	pub fn new(catalog: SharedCatalog<C>, external: Arc<ExternalRegistry<Facade<C::Value>>>) -> Self {
		Self { catalog, external }
	}

	/// Replaces the registry's mapper with a merged one backed by `provider`.
	///
	/// Clears the lookup cache once so nothing resolved by the previous
	/// mapper survives. The mapper reads the catalog and the provider under
	/// one catalog read lock, so `provider` must not take the catalog lock
	/// itself.
	pub fn install(&self, provider: EntryProvider<C::Value>) {
		let catalog = Arc::clone(&self.catalog);
		let mapper: Box<Mapper<Facade<C::Value>>> = Box::new(move |key: &ExternalKey| {
			let id = key.to_identifier();
			// Held across the provider call; registrations take the catalog first.
			let native = catalog.read();
			if let Some(entry) = provider(&id) {
				return Some(Facade::Custom(entry));
			}
			native.get(&id).map(Facade::Native)
		});

		drop(self.external.replace_mapper(mapper));
		let discarded = self.external.clear_cache();
		info!(registry = self.external.label(), discarded, "merged facade installed");
	}

	/// Installs the overlay of `injector` as the custom-entry provider.
	pub fn install_overlay(&self, injector: &EntryInjector<C>) {
		self.install(injector.provider());
	}

	pub fn resolve(&self, key: &ExternalKey) -> Option<Arc<Facade<C::Value>>> {
		self.external.get(key)
	}

	/// Clears the lookup cache and returns how many results were dropped.
	pub fn invalidate(&self) -> usize {
		let discarded = self.external.clear_cache();
		debug!(registry = self.external.label(), discarded, "facade cache invalidated");
		discarded
	}

	/// Invalidation hook for an [`EntryInjector`].
	pub fn invalidator(&self) -> Arc<dyn LookupInvalidator> {
		self.external.clone()
	}

	pub fn external(&self) -> &Arc<ExternalRegistry<Facade<C::Value>>> {
		&self.external
	}
}
