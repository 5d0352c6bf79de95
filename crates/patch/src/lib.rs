//! Patch engine for frozen catalogs.
//!
//! Injects custom entries into a catalog after its host has frozen it,
//! without losing the tag associations computed at freeze time, and
//! presents native and custom entries to external consumers through one
//! merged lookup.
//!
//! # Layers
//!
//! - [`CatalogHandle`]: binds to the catalog's internal fields by name or
//!   shape, once, and fails fatally on a host-version mismatch
//! - [`MutationGate`]: the unfreeze, write, refreeze and tag-merge cycle
//! - [`EntryInjector`]: idempotent registration through the gate
//! - [`FacadeCache`]: merged resolution installed on the host's
//!   [`ExternalRegistry`](graft_catalog::ExternalRegistry)
//! - [`CatalogPatcher`]: all of the above wired from a [`PatchConfig`]
//!
//! # Concurrency
//!
//! Patch operations are single-writer. Each one takes the catalog's write
//! lock as its lease for the whole cycle and gives up after the configured
//! timeout instead of queueing behind another writer.

mod config;
mod error;
mod facade;
mod gate;
mod handle;
mod injector;
mod patcher;
mod tags;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_fixtures;

pub use config::{BindingConfig, PatchConfig};
pub use error::{BindError, ConfigError, PatchError};
pub use facade::{Facade, FacadeCache};
pub use gate::MutationGate;
pub use handle::CatalogHandle;
pub use injector::{EntryInjector, EntryProvider, InjectedEntry, LookupInvalidator, Origin};
pub use patcher::CatalogPatcher;
pub use tags::{MergeStats, TagSnapshot};
