//! ReDB storage backend
//!
//! Persistent storage using the ReDB embedded database. Records are kept in their canonical wire
//! encoding and decoded on the way out.
//!
//! ## Table Structure
//!
//! ```text
//! records_v1         : id (u64) -> record (wire bytes, including TTL)
//! records_by_name_v1 : (name, id) -> ()
//! meta_v1            : "next_id" -> u64
//! ```

use core::fmt;
use std::path::Path;

use redb::{Database, MultimapTableDefinition, ReadableDatabase, ReadableTable, TableDefinition};

use super::{RecordId, RecordStore, Result, StoreError, StoredRecord};
use crate::codec::{self, ResourceRecord};
use crate::rr::Name;

// Table definitions
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records_v1");
const RECORDS_BY_NAME: MultimapTableDefinition<&str, u64> = MultimapTableDefinition::new("records_by_name_v1");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta_v1");

const NEXT_ID: &str = "next_id";

fn db_err<E: fmt::Display>(e: E) -> StoreError {
	StoreError::Database(e.to_string())
}

fn decode(id: RecordId, raw: &[u8]) -> Result<StoredRecord> {
	let record = codec::parse(raw)
		.map_err(|e| StoreError::Corrupt(format!("record {}: {}", id, e)))?;
	Ok(StoredRecord { id, record })
}

/// ReDB storage backend.
pub struct RedbStore {
	db: Database,
}

impl RedbStore {
	/// Open or create a ReDB database at the given path.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let db = Database::create(path).map_err(db_err)?;

		// Create all tables on first open so readers never find them missing.
		let write_txn = db.begin_write().map_err(db_err)?;
		{
			write_txn.open_table(RECORDS).map_err(db_err)?;
			write_txn.open_multimap_table(RECORDS_BY_NAME).map_err(db_err)?;
			write_txn.open_table(META).map_err(db_err)?;
		}
		write_txn.commit().map_err(db_err)?;

		Ok(Self { db })
	}
}

impl RecordStore for RedbStore {
	fn insert(&self, record: &ResourceRecord) -> Result<RecordId> {
		let raw = record.raw();
		let write_txn = self.db.begin_write().map_err(db_err)?;
		let id = {
			let mut meta = write_txn.open_table(META).map_err(db_err)?;
			let id = meta.get(NEXT_ID).map_err(db_err)?.map_or(1, |next| next.value());
			meta.insert(NEXT_ID, id + 1).map_err(db_err)?;

			let mut records = write_txn.open_table(RECORDS).map_err(db_err)?;
			records.insert(id, raw.as_slice()).map_err(db_err)?;
			let mut by_name = write_txn.open_multimap_table(RECORDS_BY_NAME).map_err(db_err)?;
			by_name.insert(record.name().as_str(), id).map_err(db_err)?;
			id
		};
		write_txn.commit().map_err(db_err)?;
		Ok(RecordId(id))
	}

	fn update(&self, id: RecordId, record: &ResourceRecord) -> Result<()> {
		let raw = record.raw();
		let write_txn = self.db.begin_write().map_err(db_err)?;
		{
			let mut records = write_txn.open_table(RECORDS).map_err(db_err)?;
			let old = match records.get(id.0).map_err(db_err)? {
				Some(old) => decode(id, old.value())?,
				None => return Err(StoreError::NotFound(id)),
			};
			if old.record.name() != record.name() {
				let mut by_name = write_txn.open_multimap_table(RECORDS_BY_NAME).map_err(db_err)?;
				by_name.remove(old.record.name().as_str(), id.0).map_err(db_err)?;
				by_name.insert(record.name().as_str(), id.0).map_err(db_err)?;
			}
			records.insert(id.0, raw.as_slice()).map_err(db_err)?;
		}
		write_txn.commit().map_err(db_err)?;
		Ok(())
	}

	fn delete(&self, id: RecordId) -> Result<()> {
		let write_txn = self.db.begin_write().map_err(db_err)?;
		{
			let mut records = write_txn.open_table(RECORDS).map_err(db_err)?;
			let old = match records.remove(id.0).map_err(db_err)? {
				Some(old) => decode(id, old.value())?,
				None => return Err(StoreError::NotFound(id)),
			};
			let mut by_name = write_txn.open_multimap_table(RECORDS_BY_NAME).map_err(db_err)?;
			by_name.remove(old.record.name().as_str(), id.0).map_err(db_err)?;
		}
		write_txn.commit().map_err(db_err)?;
		Ok(())
	}

	fn get(&self, id: RecordId) -> Result<Option<StoredRecord>> {
		let read_txn = self.db.begin_read().map_err(db_err)?;
		let records = read_txn.open_table(RECORDS).map_err(db_err)?;
		match records.get(id.0).map_err(db_err)? {
			Some(raw) => Ok(Some(decode(id, raw.value())?)),
			None => Ok(None),
		}
	}

	fn list_by_name(&self, name: &Name) -> Result<Vec<StoredRecord>> {
		let read_txn = self.db.begin_read().map_err(db_err)?;
		let by_name = read_txn.open_multimap_table(RECORDS_BY_NAME).map_err(db_err)?;
		let records = read_txn.open_table(RECORDS).map_err(db_err)?;

		let mut res = Vec::new();
		for id in by_name.get(name.as_str()).map_err(db_err)? {
			let id = RecordId(id.map_err(db_err)?.value());
			let raw = records.get(id.0).map_err(db_err)?
				.ok_or_else(|| StoreError::Corrupt(format!("name index points at missing record {}", id)))?;
			res.push(decode(id, raw.value())?);
		}
		Ok(res)
	}
}
