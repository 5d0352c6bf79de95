//! Consumer-facing lookup layer over a catalog.
//!
//! Consumers look values up by [`ExternalKey`]. The registry resolves a key
//! through its current mapper and memoizes non-empty results in a lookup
//! cache. The mapper can be replaced at runtime; the cache has no per-key
//! invalidation, only [`ExternalRegistry::clear_cache`].
//!
//! # Invariants
//!
//! - A result computed before a `clear_cache` is never inserted after it.
//!   Each clear bumps a generation counter and inserts are dropped when the
//!   generation moved while the mapper ran.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifier::ExternalKey;

/// Resolution function from an external key to a consumer-facing value.
pub type Mapper<V> = dyn Fn(&ExternalKey) -> Option<V> + Send + Sync;

struct LookupCache<V> {
	generation: u64,
	entries: FxHashMap<ExternalKey, Arc<V>>,
}

/// Memoizing lookup layer with a swappable mapper.
pub struct ExternalRegistry<V> {
	label: &'static str,
	mapper: ArcSwap<Box<Mapper<V>>>,
	cache: Mutex<LookupCache<V>>,
}

impl<V> ExternalRegistry<V> {
	pub fn new<F>(label: &'static str, mapper: F) -> Self
	where
		F: Fn(&ExternalKey) -> Option<V> + Send + Sync + 'static,
	{
		let mapper: Box<Mapper<V>> = Box::new(mapper);
		Self {
			label,
			mapper: ArcSwap::from_pointee(mapper),
			cache: Mutex::new(LookupCache {
				generation: 0,
				entries: FxHashMap::default(),
			}),
		}
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Resolves `key`, answering from the cache when possible.
	pub fn get(&self, key: &ExternalKey) -> Option<Arc<V>> {
		let generation = {
			let cache = self.cache.lock();
			if let Some(hit) = cache.entries.get(key) {
				return Some(Arc::clone(hit));
			}
			cache.generation
		};

		let mapper = self.mapper.load_full();
		let value = Arc::new((mapper.as_ref())(key)?);

		let mut cache = self.cache.lock();
		if cache.generation != generation {
			debug!(registry = self.label, key = %key, "cache cleared during resolution; not caching");
			return Some(value);
		}
		Some(Arc::clone(cache.entries.entry(key.clone()).or_insert(value)))
	}

	/// Installs a new mapper and returns the previous one.
	///
	/// Cached results produced by the old mapper stay until the cache is
	/// cleared.
	pub fn replace_mapper(&self, mapper: Box<Mapper<V>>) -> Arc<Box<Mapper<V>>> {
		self.mapper.swap(Arc::new(mapper))
	}

	/// Drops every cached result and returns how many were discarded.
	pub fn clear_cache(&self) -> usize {
		let mut cache = self.cache.lock();
		cache.generation += 1;
		let discarded = cache.entries.len();
		cache.entries.clear();
		debug!(registry = self.label, discarded, generation = cache.generation, "lookup cache cleared");
		discarded
	}

	pub fn cached_len(&self) -> usize {
		self.cache.lock().entries.len()
	}

	/// Number of times the cache has been cleared.
	pub fn generation(&self) -> u64 {
		self.cache.lock().generation
	}
}
