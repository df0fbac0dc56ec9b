//! Record storage.
//!
//! The store owns every record. Callers get copies back and refer to records by [`RecordId`].
//! Two backends implement [`RecordStore`]:
//! - [`MemoryStore`], for tests and throwaway instances
//! - [`RedbStore`], durable across restarts
//!
//! Both apply each mutation atomically, so a concurrent reader sees either the old or the new
//! version of a record, never a mix.

mod memory;
mod redb;
#[cfg(test)]
mod tests;

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;

use core::fmt;
use core::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::codec::ResourceRecord;
use crate::rr::{Name, RecordType};

/// Identifies a stored record. Allocated by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);
impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { self.0.fmt(f) }
}
impl FromStr for RecordId {
	type Err = core::num::ParseIntError;
	fn from_str(s: &str) -> core::result::Result<RecordId, Self::Err> { s.parse().map(RecordId) }
}

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
	/// The record's identifier.
	pub id: RecordId,
	/// The record.
	pub record: ResourceRecord,
}
impl StoredRecord {
	/// The JSON-friendly view handed out by the management API.
	pub fn view(&self) -> RecordView {
		RecordView {
			id: self.id,
			name: self.record.name().to_string(),
			ty: self.record.ty().mnemonic(),
			ttl: self.record.ttl,
			content: self.record.rr.text_data(),
		}
	}
}

/// A stored record flattened for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
	/// The record's identifier.
	pub id: RecordId,
	/// Owner name, lowercase and dot-terminated.
	pub name: String,
	/// Type mnemonic.
	#[serde(rename = "type")]
	pub ty: &'static str,
	/// TTL in seconds.
	pub ttl: u32,
	/// Record data in presentation format.
	pub content: String,
}

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StoreError {
	/// No record has this id.
	#[error("no record with id {0}")]
	NotFound(RecordId),

	/// The backing database failed.
	#[error("database error: {0}")]
	Database(String),

	/// Persisted data could not be decoded.
	#[error("corrupt record data: {0}")]
	Corrupt(String),

	/// A lock was poisoned by a panicking writer.
	#[error("lock error: {0}")]
	Lock(String),
}

/// Result of a store operation.
pub type Result<T> = core::result::Result<T, StoreError>;

/// Storage interface shared by the submission pipeline and the query resolver.
///
/// Methods are blocking; async callers should move them onto a blocking thread.
pub trait RecordStore: Send + Sync {
	/// Stores a new record under a fresh id.
	fn insert(&self, record: &ResourceRecord) -> Result<RecordId>;

	/// Replaces the record at `id`, keeping the id.
	fn update(&self, id: RecordId, record: &ResourceRecord) -> Result<()>;

	/// Removes the record at `id`. Fails with [`StoreError::NotFound`] if it is already gone.
	fn delete(&self, id: RecordId) -> Result<()>;

	/// Fetches one record.
	fn get(&self, id: RecordId) -> Result<Option<StoredRecord>>;

	/// All records at `name`, of any type, in id order.
	fn list_by_name(&self, name: &Name) -> Result<Vec<StoredRecord>>;

	/// Records at `name` of type `ty`, in id order.
	fn find_for_question(&self, name: &Name, ty: RecordType) -> Result<Vec<StoredRecord>> {
		let mut records = self.list_by_name(name)?;
		records.retain(|stored| stored.record.rr.matches_type(ty));
		Ok(records)
	}
}
