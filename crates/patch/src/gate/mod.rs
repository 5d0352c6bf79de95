//! Unfreeze, write, refreeze.
//!
//! # Cycle
//!
//! 1. Snapshot the tag index.
//! 2. Clear the frozen flag.
//! 3. Discard pending holders left by an earlier, unfinished write.
//! 4. Run the caller's write.
//! 5. Refreeze through the catalog's own freeze, which recomputes the tag
//!    index from whatever it sees at that instant.
//! 6. Merge the snapshot back into the recomputed index.
//! 7. Install the merged index.
//!
//! # Invariants
//!
//! - The catalog is frozen when [`MutationGate::cycle`] returns, whether the
//!   write succeeded or not. The one exception is a host freeze that fails
//!   twice in a row; the catalog is then left open and a warning names the
//!   freeze error.
//! - The tag index after a cycle is a superset of the index before it
//!   (unless tag merging is disabled in config).
//! - A cycle never starts on an unfrozen catalog. Finding one open means a
//!   second writer is active, which is a contract violation, not a state to
//!   recover from.

use graft_catalog::{Catalog, CatalogError};
use tracing::{debug, warn};

use crate::error::PatchError;
use crate::handle::CatalogHandle;
use crate::tags::TagSnapshot;

/// Runs writes against a frozen catalog.
pub struct MutationGate<C> {
	handle: CatalogHandle<C>,
	merge_tags: bool,
}

impl<C> Clone for MutationGate<C> {
	fn clone(&self) -> Self {
		Self {
			handle: self.handle,
			merge_tags: self.merge_tags,
		}
	}
}

impl<C: Catalog> MutationGate<C> {
	pub fn new(handle: CatalogHandle<C>, merge_tags: bool) -> Self {
		Self { handle, merge_tags }
	}

	pub fn handle(&self) -> &CatalogHandle<C> {
		&self.handle
	}

	/// Runs `write` with the catalog open and reseals it afterwards.
	///
	/// If `write` fails, pending holders it left behind are discarded before
	/// the refreeze and the write error is returned.
	pub fn cycle<R, W>(&self, catalog: &mut C, write: W) -> Result<R, PatchError>
	where
		W: FnOnce(&mut C) -> Result<R, PatchError>,
	{
		let label = self.handle.label();
		if !self.handle.is_frozen(catalog) {
			return Err(PatchError::AlreadyUnfrozen { catalog: label });
		}

		let snapshot = self.handle.snapshot_tags(catalog);
		self.handle.set_frozen(catalog, false)?;
		let stale = self.handle.clear_pending_holders(catalog);
		debug!(catalog = label, tags = snapshot.len(), stale, "patch cycle opened");

		let written = write(catalog);
		if let Err(e) = &written {
			warn!(catalog = label, error = %e, "write failed inside patch cycle; resealing");
			self.handle.clear_pending_holders(catalog);
		}

		let sealed = self.close(catalog, snapshot);
		match (written, sealed) {
			(Err(e), Err(seal)) => {
				warn!(catalog = label, write = %e, seal = %seal, "reseal after failed write also failed");
				Err(e)
			}
			(Err(e), Ok(())) => Err(e),
			(Ok(_), Err(e)) => Err(e),
			(Ok(value), Ok(())) => Ok(value),
		}
	}

	/// Fails unless the catalog is open for writes.
	pub fn ensure_open(&self, catalog: &C) -> Result<(), PatchError> {
		if self.handle.is_frozen(catalog) {
			return Err(PatchError::UnexpectedlyFrozen {
				catalog: self.handle.label(),
			});
		}
		Ok(())
	}

	/// Freezes the catalog if it is not frozen yet.
	///
	/// Returns whether this call did the freezing.
	pub fn ensure_frozen(&self, catalog: &mut C) -> Result<bool, PatchError> {
		match catalog.freeze() {
			Ok(()) => Ok(true),
			Err(CatalogError::AlreadyFrozen { .. }) => {
				debug!(catalog = self.handle.label(), "catalog already frozen");
				Ok(false)
			}
			Err(e) => Err(e.into()),
		}
	}

	fn close(&self, catalog: &mut C, snapshot: TagSnapshot) -> Result<(), PatchError> {
		let label = self.handle.label();
		if let Err(err) = self.handle.set_frozen(catalog, true) {
			warn!(catalog = label, error = %err, "refreeze failed; discarding pending holders and retrying");
			self.handle.clear_pending_holders(catalog);
			if let Err(retry) = self.handle.set_frozen(catalog, true) {
				warn!(catalog = label, error = %retry, "refreeze retry failed; catalog left unfrozen");
				return Err(retry.into());
			}
			self.restore(catalog, snapshot);
			return Err(err.into());
		}
		self.restore(catalog, snapshot);
		Ok(())
	}

	fn restore(&self, catalog: &mut C, snapshot: TagSnapshot) {
		let label = self.handle.label();
		if !self.merge_tags {
			debug!(catalog = label, "tag merge disabled; keeping recomputed index");
			return;
		}
		let post = self.handle.snapshot_tags(catalog).into_index();
		let (merged, stats) = snapshot.merge_into(post);
		debug!(
			catalog = label,
			tags = merged.len(),
			restored_tags = stats.restored_tags,
			restored_members = stats.restored_members,
			"patch cycle sealed"
		);
		self.handle.restore_tags(catalog, merged);
	}
}
