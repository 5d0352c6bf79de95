//! One-stop wiring of the patch engine for a single catalog.

use std::sync::Arc;

use graft_catalog::{
	Catalog, ExternalKey, ExternalRegistry, Holder, Identifier, SharedCatalog, TagIndex,
};
use tracing::info;

use crate::config::PatchConfig;
use crate::error::{BindError, PatchError};
use crate::facade::{Facade, FacadeCache};
use crate::gate::MutationGate;
use crate::handle::CatalogHandle;
use crate::injector::{EntryInjector, EntryProvider, InjectedEntry};

/// Patch engine bound to one catalog and its external registry.
///
/// Cache invalidation is wired at construction: every registration that
/// changes the merged entry set clears the registry's lookup cache.
pub struct CatalogPatcher<C: Catalog> {
	catalog: SharedCatalog<C>,
	injector: EntryInjector<C>,
	facade: FacadeCache<C>,
}

impl<C> CatalogPatcher<C>
where
	C: Catalog + Send + Sync + 'static,
	C::Value: Send + Sync + 'static,
{
	/// Binds to `catalog` and prepares the injector and facade.
	///
	/// Nothing is installed on `external` yet; call
	/// [`CatalogPatcher::install_overlay`] or [`CatalogPatcher::install`].
	pub fn bind(
		catalog: SharedCatalog<C>,
		external: Arc<ExternalRegistry<Facade<C::Value>>>,
		config: PatchConfig,
	) -> Result<Self, BindError> {
		let handle = CatalogHandle::bind(&*catalog.read(), &config.binding)?;
		let gate = MutationGate::new(handle, config.merge_tags);
		let injector = EntryInjector::new(Arc::clone(&catalog), gate, &config);
		let facade = FacadeCache::new(Arc::clone(&catalog), external);
		injector.add_invalidator(facade.invalidator());

		info!(catalog = handle.label(), merge_tags = config.merge_tags, "patch engine bound");
		Ok(Self {
			catalog,
			injector,
			facade,
		})
	}

	pub fn register(&self, id: Identifier, payload: C::Value) -> Result<InjectedEntry<C::Value>, PatchError> {
		self.injector.register(id, payload)
	}

	pub fn register_path(&self, path: &str, payload: C::Value) -> Result<InjectedEntry<C::Value>, PatchError> {
		self.injector.register_path(path, payload)
	}

	pub fn register_many<I>(&self, entries: I) -> Result<Vec<InjectedEntry<C::Value>>, PatchError>
	where
		I: IntoIterator<Item = (Identifier, C::Value)>,
	{
		self.injector.register_many(entries)
	}

	pub fn unregister(&self, id: &Identifier) {
		self.injector.unregister(id);
	}

	pub fn install(&self, provider: EntryProvider<C::Value>) {
		self.facade.install(provider);
	}

	/// Installs the merged facade backed by this patcher's own overlay.
	pub fn install_overlay(&self) {
		self.facade.install_overlay(&self.injector);
	}

	pub fn resolve(&self, key: &ExternalKey) -> Option<Arc<Facade<C::Value>>> {
		self.facade.resolve(key)
	}

	/// Freezes the catalog unless it already is.
	///
	/// Returns whether this call did the freezing.
	pub fn freeze(&self) -> Result<bool, PatchError> {
		let mut catalog = self.injector.lease()?;
		self.injector.gate().ensure_frozen(&mut *catalog)
	}

	pub fn is_frozen(&self) -> bool {
		self.catalog.read().is_frozen()
	}

	pub fn contains_key(&self, id: &Identifier) -> bool {
		self.catalog.read().contains_key(id)
	}

	pub fn get(&self, id: &Identifier) -> Option<Holder<C::Value>> {
		self.catalog.read().get(id)
	}

	/// Copy of the current tag index.
	pub fn tags(&self) -> TagIndex {
		self.catalog.read().tags().clone()
	}

	pub fn injector(&self) -> &EntryInjector<C> {
		&self.injector
	}

	pub fn facade(&self) -> &FacadeCache<C> {
		&self.facade
	}
}
