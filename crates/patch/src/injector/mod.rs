//! Idempotent insertion of custom entries into a frozen catalog.
//!
//! Each identifier is inserted at most once for the lifetime of the catalog.
//! Registering an identifier that is already present returns the holder the
//! catalog already has and touches nothing, so re-running an extension's
//! initialization after a reload is safe.
//!
//! There is no removal. [`EntryInjector::unregister`] is a no-op because a
//! frozen catalog has no supported removal path; a stale entry stays until
//! the host rebuilds the whole catalog.

use std::sync::Arc;
use std::time::Duration;

use graft_catalog::{Catalog, Holder, Identifier, SharedCatalog};
use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::PatchConfig;
use crate::error::PatchError;
use crate::gate::MutationGate;

/// How an [`InjectedEntry`] came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	/// Inserted by this injector.
	Inserted,
	/// Already present in the catalog when registration was requested.
	Existing,
}

/// Stable handle to an entry registered through an [`EntryInjector`].
pub struct InjectedEntry<T> {
	id: Identifier,
	holder: Holder<T>,
	origin: Origin,
}

impl<T> Clone for InjectedEntry<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id.clone(),
			holder: self.holder.clone(),
			origin: self.origin,
		}
	}
}

impl<T> std::fmt::Debug for InjectedEntry<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InjectedEntry")
			.field("id", &self.id)
			.field("origin", &self.origin)
			.finish_non_exhaustive()
	}
}

impl<T> InjectedEntry<T> {
	pub fn id(&self) -> &Identifier {
		&self.id
	}

	pub fn holder(&self) -> &Holder<T> {
		&self.holder
	}

	pub fn value(&self) -> &T {
		self.holder.value()
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}
}

/// Something caching lookups derived from the catalog.
///
/// Invalidation is all-or-nothing; there is no per-key hook.
pub trait LookupInvalidator: Send + Sync {
	fn invalidate_all(&self);
}

/// Custom-entry lookup consulted ahead of the native catalog.
pub type EntryProvider<T> = Arc<dyn Fn(&Identifier) -> Option<InjectedEntry<T>> + Send + Sync>;

type Overlay<T> = Arc<RwLock<FxHashMap<Identifier, InjectedEntry<T>>>>;

enum Planned<T> {
	Ready(InjectedEntry<T>),
	Insert(Identifier, Arc<T>),
	Repeat(usize),
}

/// Registers custom entries through a [`MutationGate`].
pub struct EntryInjector<C: Catalog> {
	catalog: SharedCatalog<C>,
	gate: MutationGate<C>,
	lease_timeout: Duration,
	config: PatchConfig,
	overlay: Overlay<C::Value>,
	invalidators: RwLock<Vec<Arc<dyn LookupInvalidator>>>,
}

impl<C: Catalog> EntryInjector<C> {
	pub fn new(catalog: SharedCatalog<C>, gate: MutationGate<C>, config: &PatchConfig) -> Self {
		Self {
			catalog,
			gate,
			lease_timeout: config.lease_timeout(),
			config: config.clone(),
			overlay: Arc::new(RwLock::new(FxHashMap::default())),
			invalidators: RwLock::new(Vec::new()),
		}
	}

	fn label(&self) -> &'static str {
		self.gate.handle().label()
	}

	/// Subscribes `invalidator` to every change of the merged entry set.
	pub fn add_invalidator(&self, invalidator: Arc<dyn LookupInvalidator>) {
		self.invalidators.write().push(invalidator);
	}

	pub(crate) fn lease(&self) -> Result<RwLockWriteGuard<'_, C>, PatchError> {
		self.catalog
			.try_write_for(self.lease_timeout)
			.ok_or_else(|| PatchError::LeaseUnavailable {
				catalog: self.label(),
				waited: self.lease_timeout,
			})
	}

	/// Registers `payload` under `id`, or returns the entry already there.
	pub fn register(
		&self,
		id: Identifier,
		payload: C::Value,
	) -> Result<InjectedEntry<C::Value>, PatchError> {
		let entries = self.register_many([(id.clone(), payload)])?;
		entries
			.into_iter()
			.next()
			.ok_or(PatchError::MissingEntry {
				catalog: self.label(),
				id,
			})
	}

	/// Registers `payload` under `path` in the configured default namespace.
	pub fn register_path(
		&self,
		path: &str,
		payload: C::Value,
	) -> Result<InjectedEntry<C::Value>, PatchError> {
		let id = self.config.identifier(path)?;
		self.register(id, payload)
	}

	/// Registers a batch in a single patch cycle.
	///
	/// Results come back in input order. Ids already in the catalog are
	/// returned as they are; an id repeated within the batch resolves to its
	/// first occurrence and later payloads are dropped.
	///
	/// A failure partway through leaves the entries inserted before it in the
	/// catalog, outside the overlay. Lookups are still invalidated so they
	/// resolve as native entries, and registering the same ids again adopts
	/// them.
	pub fn register_many<I>(&self, entries: I) -> Result<Vec<InjectedEntry<C::Value>>, PatchError>
	where
		I: IntoIterator<Item = (Identifier, C::Value)>,
	{
		let mut catalog = self.lease()?;
		let plan = self.plan(&*catalog, entries)?;

		let to_insert: Vec<(Identifier, Arc<C::Value>)> = plan
			.iter()
			.filter_map(|p| match p {
				Planned::Insert(id, payload) => Some((id.clone(), Arc::clone(payload))),
				_ => None,
			})
			.collect();

		let inserted = if to_insert.is_empty() {
			Vec::new()
		} else {
			let mut landed = 0usize;
			let cycled = self.gate.cycle(&mut *catalog, |c| {
				self.gate.ensure_open(c)?;
				let mut holders = Vec::with_capacity(to_insert.len());
				for (id, payload) in &to_insert {
					holders.push(insert_one(c, id, payload)?);
					landed += 1;
				}
				Ok(holders)
			});
			match cycled {
				Ok(holders) => holders,
				Err(e) => {
					if landed > 0 {
						warn!(
							catalog = self.label(),
							landed,
							error = %e,
							"batch failed after partial insert; entries stay in the catalog"
						);
						self.invalidate_lookups();
					}
					return Err(e);
				}
			}
		};
		let catalog_changed = !inserted.is_empty();

		let mut inserted = inserted.into_iter();
		let mut results: Vec<InjectedEntry<C::Value>> = Vec::with_capacity(plan.len());
		for planned in plan {
			let entry = match planned {
				Planned::Ready(entry) => entry,
				Planned::Insert(id, _) => {
					let holder = inserted.next().ok_or_else(|| PatchError::MissingEntry {
						catalog: self.label(),
						id: id.clone(),
					})?;
					info!(catalog = self.label(), id = %id, "injected entry");
					InjectedEntry {
						id,
						holder,
						origin: Origin::Inserted,
					}
				}
				Planned::Repeat(first) => results[first].clone(),
			};
			results.push(entry);
		}

		let overlay_changed = {
			let mut overlay = self.overlay.write();
			let before = overlay.len();
			for entry in &results {
				overlay.entry(entry.id.clone()).or_insert_with(|| entry.clone());
			}
			overlay.len() != before
		};

		if catalog_changed || overlay_changed {
			self.invalidate_lookups();
		}
		drop(catalog);

		Ok(results)
	}

	fn plan<I>(&self, catalog: &C, entries: I) -> Result<Vec<Planned<C::Value>>, PatchError>
	where
		I: IntoIterator<Item = (Identifier, C::Value)>,
	{
		let handle = self.gate.handle();
		let mut first_seen: FxHashMap<Identifier, usize> = FxHashMap::default();
		let mut plan = Vec::new();

		for (id, payload) in entries {
			if let Some(&first) = first_seen.get(&id) {
				debug!(catalog = self.label(), id = %id, "repeated id in batch; keeping first payload");
				plan.push(Planned::Repeat(first));
				continue;
			}
			first_seen.insert(id.clone(), plan.len());

			if !handle.contains_key(catalog, &id) {
				plan.push(Planned::Insert(id, Arc::new(payload)));
				continue;
			}

			let Some(holder) = handle.get(catalog, &id) else {
				return Err(PatchError::MissingEntry {
					catalog: self.label(),
					id,
				});
			};
			debug!(catalog = self.label(), id = %id, "already registered; reusing holder");
			plan.push(Planned::Ready(InjectedEntry {
				id,
				holder,
				origin: Origin::Existing,
			}));
		}

		Ok(plan)
	}

	fn invalidate_lookups(&self) {
		for invalidator in self.invalidators.read().iter() {
			invalidator.invalidate_all();
		}
	}

	/// Does nothing. Frozen catalogs cannot drop entries.
	pub fn unregister(&self, id: &Identifier) {
		debug!(catalog = self.label(), id = %id, "unregister ignored; entries persist until the host rebuilds the catalog");
	}

	/// Returns the entry this injector handed out for `id`.
	pub fn lookup(&self, id: &Identifier) -> Option<InjectedEntry<C::Value>> {
		self.overlay.read().get(id).cloned()
	}

	/// Number of entries this injector has handed out.
	pub fn len(&self) -> usize {
		self.overlay.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.overlay.read().is_empty()
	}

	pub fn gate(&self) -> &MutationGate<C> {
		&self.gate
	}
}

impl<C> EntryInjector<C>
where
	C: Catalog,
	C::Value: Send + Sync + 'static,
{
	/// Exposes [`EntryInjector::lookup`] as a custom-entry provider.
	pub fn provider(&self) -> EntryProvider<C::Value> {
		let overlay = Arc::clone(&self.overlay);
		Arc::new(move |id: &Identifier| overlay.read().get(id).cloned())
	}
}

fn insert_one<C: Catalog>(
	catalog: &mut C,
	id: &Identifier,
	payload: &Arc<C::Value>,
) -> Result<Holder<C::Value>, PatchError> {
	let holder = catalog.create_intrusive_holder(Arc::clone(payload))?;
	catalog.register(id.clone(), Arc::clone(payload))?;
	Ok(holder)
}
