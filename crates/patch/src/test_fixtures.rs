use std::io;
use std::sync::Arc;

use graft_catalog::{
	Catalog, CatalogError, ExternalRegistry, FieldDescriptor, FieldKind, FieldMut, FieldRef,
	Holder, Identifier, Introspect, MappedCatalog, SharedCatalog, TagId, TagIndex, shared,
};
use parking_lot::Mutex;

use crate::facade::Facade;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spell {
	pub power: u32,
}

pub(crate) fn spell(power: u32) -> Spell {
	Spell { power }
}

pub(crate) fn id(s: &str) -> Identifier {
	Identifier::parse(s).unwrap()
}

pub(crate) fn tag(s: &str) -> TagId {
	TagId::parse(s).unwrap()
}

pub(crate) type SpellCatalog = MappedCatalog<Spell>;

/// Frozen catalog with `native:fire` and `native:ice`, tagged
/// `#native:fire = {fire}` and `#native:elemental = {fire, ice}`.
pub(crate) fn frozen_catalog() -> SpellCatalog {
	let mut catalog = MappedCatalog::new("spells");
	catalog.register(id("native:fire"), spell(3).into()).unwrap();
	catalog.register(id("native:ice"), spell(2).into()).unwrap();
	catalog.declare_tag(tag("native:fire"), [id("native:fire")]).unwrap();
	catalog
		.declare_tag(tag("native:elemental"), [id("native:fire"), id("native:ice")])
		.unwrap();
	catalog.freeze().unwrap();
	catalog
}

pub(crate) fn shared_catalog() -> SharedCatalog<SpellCatalog> {
	shared(frozen_catalog())
}

/// External layer as the host ships it: native entries only.
pub(crate) fn native_registry(
	catalog: &SharedCatalog<SpellCatalog>,
) -> Arc<ExternalRegistry<Facade<Spell>>> {
	let catalog = Arc::clone(catalog);
	Arc::new(ExternalRegistry::new("spells", move |key| {
		catalog.read().get(&key.to_identifier()).map(Facade::Native)
	}))
}

/// Catalog from a different host version: two flags and no buffer whose
/// name mentions "unregistered".
pub(crate) struct LegacyCatalog {
	pub sealed: bool,
	pub locked: bool,
	pub tags: TagIndex,
	pub holders: Vec<Holder<Spell>>,
}

impl LegacyCatalog {
	pub fn new() -> Self {
		Self {
			sealed: true,
			locked: false,
			tags: TagIndex::default(),
			holders: Vec::new(),
		}
	}
}

impl Introspect for LegacyCatalog {
	type Value = Spell;

	const FIELDS: &'static [FieldDescriptor] = &[
		FieldDescriptor::new("sealed", FieldKind::Flag),
		FieldDescriptor::new("locked", FieldKind::Flag),
		FieldDescriptor::new("tags", FieldKind::TagIndex),
		FieldDescriptor::new("intrusive_holders", FieldKind::HolderBuffer),
	];

	fn label(&self) -> &'static str {
		"legacy"
	}

	fn field(&self, slot: usize) -> Option<FieldRef<'_, Spell>> {
		Some(match slot {
			0 => FieldRef::Flag(&self.sealed),
			1 => FieldRef::Flag(&self.locked),
			2 => FieldRef::TagIndex(&self.tags),
			3 => FieldRef::HolderBuffer(&self.holders),
			_ => return None,
		})
	}

	fn field_mut(&mut self, slot: usize) -> Option<FieldMut<'_, Spell>> {
		Some(match slot {
			0 => FieldMut::Flag(&mut self.sealed),
			1 => FieldMut::Flag(&mut self.locked),
			2 => FieldMut::TagIndex(&mut self.tags),
			3 => FieldMut::HolderBuffer(&mut self.holders),
			_ => return None,
		})
	}
}

/// Catalog whose field table disagrees with what its accessors return.
pub(crate) struct MisdeclaredCatalog {
	pub tags: TagIndex,
	pub holders: Vec<Holder<Spell>>,
}

impl Introspect for MisdeclaredCatalog {
	type Value = Spell;

	const FIELDS: &'static [FieldDescriptor] = &[
		FieldDescriptor::new("frozen", FieldKind::Flag),
		FieldDescriptor::new("tags", FieldKind::TagIndex),
		FieldDescriptor::new("unregistered", FieldKind::HolderBuffer),
	];

	fn label(&self) -> &'static str {
		"misdeclared"
	}

	fn field(&self, slot: usize) -> Option<FieldRef<'_, Spell>> {
		match slot {
			0 | 1 => Some(FieldRef::TagIndex(&self.tags)),
			2 => Some(FieldRef::HolderBuffer(&self.holders)),
			_ => None,
		}
	}

	fn field_mut(&mut self, slot: usize) -> Option<FieldMut<'_, Spell>> {
		match slot {
			0 | 1 => Some(FieldMut::TagIndex(&mut self.tags)),
			2 => Some(FieldMut::HolderBuffer(&mut self.holders)),
			_ => None,
		}
	}
}

/// Mapped catalog with injectable faults in `register` and `freeze`.
pub(crate) struct FaultyCatalog {
	pub inner: SpellCatalog,
	pub jam_freeze: bool,
	pub reject: Option<Identifier>,
}

impl FaultyCatalog {
	/// Frozen copy of [`frozen_catalog`] with no faults armed.
	pub fn new() -> Self {
		Self {
			inner: frozen_catalog(),
			jam_freeze: false,
			reject: None,
		}
	}
}

impl Introspect for FaultyCatalog {
	type Value = Spell;

	const FIELDS: &'static [FieldDescriptor] = <SpellCatalog as Introspect>::FIELDS;

	fn label(&self) -> &'static str {
		self.inner.label()
	}

	fn field(&self, slot: usize) -> Option<FieldRef<'_, Spell>> {
		self.inner.field(slot)
	}

	fn field_mut(&mut self, slot: usize) -> Option<FieldMut<'_, Spell>> {
		self.inner.field_mut(slot)
	}
}

impl Catalog for FaultyCatalog {
	fn contains_key(&self, id: &Identifier) -> bool {
		self.inner.contains_key(id)
	}

	fn get(&self, id: &Identifier) -> Option<Holder<Spell>> {
		self.inner.get(id)
	}

	fn create_intrusive_holder(&mut self, value: Arc<Spell>) -> Result<Holder<Spell>, CatalogError> {
		self.inner.create_intrusive_holder(value)
	}

	fn register(&mut self, id: Identifier, value: Arc<Spell>) -> Result<Holder<Spell>, CatalogError> {
		if self.reject.as_ref() == Some(&id) {
			return Err(CatalogError::DuplicateId {
				label: self.inner.label(),
				id,
			});
		}
		self.inner.register(id, value)
	}

	fn freeze(&mut self) -> Result<(), CatalogError> {
		if self.jam_freeze && !self.inner.is_frozen() {
			return Err(CatalogError::UnboundHolders {
				label: self.inner.label(),
				count: 0,
			});
		}
		self.inner.freeze()
	}

	fn is_frozen(&self) -> bool {
		self.inner.is_frozen()
	}

	fn tags(&self) -> &TagIndex {
		self.inner.tags()
	}

	fn bind_tags(&mut self, tags: TagIndex) {
		self.inner.bind_tags(tags);
	}

	fn len(&self) -> usize {
		self.inner.len()
	}
}

/// Log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.lock()).into_owned()
	}
}

impl io::Write for CapturedLogs {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

/// Runs `f` with a thread-local subscriber and returns what it logged.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
	let logs = CapturedLogs::default();
	let writer = logs.clone();
	let subscriber = tracing_subscriber::fmt()
		.with_writer(move || writer.clone())
		.with_ansi(false)
		.with_max_level(tracing::Level::DEBUG)
		.finish();
	let out = tracing::subscriber::with_default(subscriber, f);
	(out, logs.contents())
}
