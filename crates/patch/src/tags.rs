//! Tag index snapshots and the post-freeze merge.

use graft_catalog::TagIndex;

/// Copy of a catalog's tag index taken before a freeze cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot(TagIndex);

/// What a merge had to put back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
	/// Tags missing from the post-freeze index.
	pub restored_tags: usize,
	/// Members missing from tags the post-freeze index did keep.
	pub restored_members: usize,
}

impl TagSnapshot {
	pub fn capture(index: &TagIndex) -> Self {
		Self(index.clone())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_index(self) -> TagIndex {
		self.0
	}

	/// Folds this snapshot into the index a freeze just computed.
	///
	/// Tags only in the snapshot are reinstalled as-is. Tags in both keep
	/// every member the freeze computed and regain the members it dropped.
	/// The result is a superset of both inputs.
	pub fn merge_into(self, post: TagIndex) -> (TagSnapshot, MergeStats) {
		let mut merged = post;
		let mut stats = MergeStats::default();

		for (tag, members) in self.0 {
			match merged.get_mut(&tag) {
				None => {
					stats.restored_tags += 1;
					merged.insert(tag, members);
				}
				Some(current) => {
					for member in members {
						if current.insert(member) {
							stats.restored_members += 1;
						}
					}
				}
			}
		}

		(TagSnapshot(merged), stats)
	}
}

impl From<TagIndex> for TagSnapshot {
	fn from(index: TagIndex) -> Self {
		Self(index)
	}
}
