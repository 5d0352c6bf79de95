use std::sync::Arc;

use graft_catalog::{ExternalKey, Holder, SharedCatalog};

use crate::config::PatchConfig;
use crate::error::PatchError;
use crate::patcher::CatalogPatcher;
use crate::test_fixtures::{SpellCatalog, id, native_registry, shared_catalog, spell, tag};

fn patcher(catalog: &SharedCatalog<SpellCatalog>) -> CatalogPatcher<SpellCatalog> {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let patcher =
		CatalogPatcher::bind(Arc::clone(catalog), native_registry(catalog), PatchConfig::default())
			.unwrap();
	patcher.install_overlay();
	patcher
}

/// Must keep every pre-patch tag association after a patch cycle.
///
/// * Enforced in: `MutationGate::cycle`, `TagSnapshot::merge_into`
/// * Failure symptom: tagged native entries vanish from tag queries after the first injection.
#[cfg_attr(test, test)]
pub(crate) fn test_tag_index_is_superset_after_patch() {
	let catalog = shared_catalog();
	let before = catalog.read().tags().clone();
	let patcher = patcher(&catalog);

	patcher.register(id("custom:blaze"), spell(9)).unwrap();
	patcher.register(id("custom:frost"), spell(4)).unwrap();

	let after = patcher.tags();
	for (tag, members) in &before {
		let kept = after.get(tag).unwrap_or_else(|| panic!("{tag} dropped"));
		assert!(kept.is_superset(members), "{tag} lost members");
	}
	assert!(after.get(&tag("native:elemental")).is_some());
}

/// Must leave the catalog frozen after every cycle, including failed ones.
///
/// * Enforced in: `MutationGate::cycle`, `MutationGate::close`
/// * Failure symptom: host code can register entries outside any patch cycle.
#[cfg_attr(test, test)]
pub(crate) fn test_catalog_frozen_after_any_cycle() {
	let catalog = shared_catalog();
	let patcher = patcher(&catalog);

	patcher.register(id("custom:blaze"), spell(9)).unwrap();
	assert!(patcher.is_frozen());

	let gate = patcher.injector().gate().clone();
	let err = gate
		.cycle(&mut *catalog.write(), |c| {
			c.create_intrusive_holder(Arc::new(spell(1)))?;
			c.register(id("custom:blaze"), Arc::new(spell(1)))?;
			Ok(())
		})
		.unwrap_err();
	assert!(matches!(err, PatchError::Catalog(_)), "{err}");
	assert!(patcher.is_frozen());
}

/// Must map each identifier to one holder for the catalog's lifetime.
///
/// * Enforced in: `EntryInjector::plan`, `MappedCatalog::register`
/// * Failure symptom: re-running extension init swaps payloads under live handles.
#[cfg_attr(test, test)]
pub(crate) fn test_identifier_maps_to_one_holder() {
	let catalog = shared_catalog();
	let patcher = patcher(&catalog);

	let first = patcher.register(id("custom:blaze"), spell(9)).unwrap();
	let again = patcher.register(id("custom:blaze"), spell(1)).unwrap();
	let batch = patcher
		.register_many([(id("custom:blaze"), spell(2)), (id("custom:blaze"), spell(3))])
		.unwrap();

	for entry in [&again, &batch[0], &batch[1]] {
		assert!(Holder::ptr_eq(first.holder(), entry.holder()));
	}
	assert!(Holder::ptr_eq(&patcher.get(&id("custom:blaze")).unwrap(), first.holder()));
}

/// Must never serve a facade cached before the most recent completed patch.
///
/// * Enforced in: `EntryInjector::register_many`, `ExternalRegistry::clear_cache`
/// * Failure symptom: consumers keep seeing pre-patch lookups until restart.
#[cfg_attr(test, test)]
pub(crate) fn test_cache_never_older_than_last_patch() {
	let catalog = shared_catalog();
	let patcher = patcher(&catalog);
	let key = ExternalKey::from(&id("native:fire"));

	let stale = patcher.resolve(&key).unwrap();
	patcher.register(id("custom:blaze"), spell(9)).unwrap();
	let fresh = patcher.resolve(&key).unwrap();

	assert!(!Arc::ptr_eq(&stale, &fresh));
}

/// Must keep entries in place after an unregister request.
///
/// * Enforced in: `EntryInjector::unregister`
/// * Failure symptom: handles held by consumers point at entries the catalog no longer has.
#[cfg_attr(test, test)]
pub(crate) fn test_unregister_never_removes() {
	let catalog = shared_catalog();
	let patcher = patcher(&catalog);
	let entry = patcher.register(id("custom:blaze"), spell(9)).unwrap();

	patcher.unregister(&id("custom:blaze"));
	patcher.unregister(&id("native:fire"));

	assert!(patcher.contains_key(&id("custom:blaze")));
	assert!(patcher.contains_key(&id("native:fire")));
	assert!(Holder::ptr_eq(&patcher.get(&id("custom:blaze")).unwrap(), entry.holder()));
	assert!(patcher.resolve(&ExternalKey::from(&id("custom:blaze"))).is_some());
}

/// Must refuse to patch while another writer holds the catalog.
///
/// * Enforced in: `EntryInjector::lease`
/// * Failure symptom: two writers interleave freeze cycles and one loses its tags.
#[cfg_attr(test, test)]
pub(crate) fn test_patch_requires_exclusive_lease() {
	let catalog = shared_catalog();
	let config = PatchConfig {
		lease_timeout_ms: 1,
		..PatchConfig::default()
	};
	let patcher = CatalogPatcher::bind(Arc::clone(&catalog), native_registry(&catalog), config).unwrap();

	let reader = catalog.read();
	let err = patcher.register(id("custom:blaze"), spell(9)).unwrap_err();
	drop(reader);

	assert!(matches!(err, PatchError::LeaseUnavailable { .. }), "{err}");
	assert!(!patcher.contains_key(&id("custom:blaze")));
}
