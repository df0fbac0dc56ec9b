//! In-memory storage backend
//!
//! Nothing survives a restart. Uses a single RwLock so each mutation, including its index
//! update, is applied atomically with respect to readers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{RecordId, RecordStore, Result, StoreError, StoredRecord};
use crate::codec::ResourceRecord;
use crate::rr::Name;

#[derive(Default)]
struct Inner {
	records: BTreeMap<RecordId, ResourceRecord>,
	/// name -> ids of records at that name
	by_name: HashMap<Name, BTreeSet<RecordId>>,
	/// Only ever grows, so ids are never handed out twice.
	next_id: u64,
}

impl Inner {
	fn unindex(&mut self, name: &Name, id: RecordId) {
		if let Some(ids) = self.by_name.get_mut(name) {
			ids.remove(&id);
			if ids.is_empty() { self.by_name.remove(name); }
		}
	}
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

impl MemoryStore {
	/// Create a new empty memory store
	pub fn new() -> Self {
		Self::default()
	}

	fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
		self.inner.write()
			.map_err(|e| StoreError::Lock(format!("write lock poisoned: {}", e)))
	}

	fn read_lock(&self) -> Result<RwLockReadGuard<'_, Inner>> {
		self.inner.read()
			.map_err(|e| StoreError::Lock(format!("read lock poisoned: {}", e)))
	}
}

impl RecordStore for MemoryStore {
	fn insert(&self, record: &ResourceRecord) -> Result<RecordId> {
		let mut inner = self.write_lock()?;
		inner.next_id += 1;
		let id = RecordId(inner.next_id);
		inner.by_name.entry(record.name().clone()).or_default().insert(id);
		inner.records.insert(id, record.clone());
		Ok(id)
	}

	fn update(&self, id: RecordId, record: &ResourceRecord) -> Result<()> {
		let mut inner = self.write_lock()?;
		let old_name = match inner.records.get(&id) {
			Some(old) => old.name().clone(),
			None => return Err(StoreError::NotFound(id)),
		};
		if &old_name != record.name() {
			inner.unindex(&old_name, id);
			inner.by_name.entry(record.name().clone()).or_default().insert(id);
		}
		inner.records.insert(id, record.clone());
		Ok(())
	}

	fn delete(&self, id: RecordId) -> Result<()> {
		let mut inner = self.write_lock()?;
		let old = inner.records.remove(&id).ok_or(StoreError::NotFound(id))?;
		inner.unindex(old.name(), id);
		Ok(())
	}

	fn get(&self, id: RecordId) -> Result<Option<StoredRecord>> {
		let inner = self.read_lock()?;
		Ok(inner.records.get(&id).map(|record| StoredRecord { id, record: record.clone() }))
	}

	fn list_by_name(&self, name: &Name) -> Result<Vec<StoredRecord>> {
		let inner = self.read_lock()?;
		let ids = match inner.by_name.get(name) {
			Some(ids) => ids,
			None => return Ok(Vec::new()),
		};
		ids.iter()
			.map(|id| inner.records.get(id)
				.map(|record| StoredRecord { id: *id, record: record.clone() })
				.ok_or_else(|| StoreError::Corrupt(format!("name index points at missing record {}", id))))
			.collect()
	}
}
