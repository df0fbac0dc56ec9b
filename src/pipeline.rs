//! The write path: submitted bytes are parsed, checked against the root zone, and only then
//! handed to the store.
//!
//! Each stage may refuse a submission, and a refused submission leaves the store untouched.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::codec;
use crate::guard::{Rejected, RootZone};
use crate::rr::Name;
use crate::ser::ParseError;
use crate::store::{RecordId, RecordStore, StoreError, StoredRecord};

/// Why a submission failed, tagged by the stage which refused it.
#[derive(Debug, Error)]
pub enum SubmitError {
	/// The bytes were not a valid record.
	#[error("invalid record: {0}")]
	Parse(#[from] ParseError),
	/// The record's name is outside of the root zone.
	#[error("record rejected: {0}")]
	Rejected(#[from] Rejected),
	/// No record exists with the given id.
	#[error("no record with id {0}")]
	NotFound(RecordId),
	/// The store failed.
	#[error("storage failure: {0}")]
	Store(StoreError),
}

impl From<StoreError> for SubmitError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::NotFound(id) => SubmitError::NotFound(id),
			e => SubmitError::Store(e),
		}
	}
}

/// Accepts record submissions for one root zone.
pub struct Submissions {
	store: Arc<dyn RecordStore>,
	zone: RootZone,
}

impl Submissions {
	/// Creates a pipeline writing to `store`, accepting only names within `zone`.
	pub fn new(store: Arc<dyn RecordStore>, zone: RootZone) -> Self {
		Submissions { store, zone }
	}

	/// The zone submissions must fall within.
	pub fn zone(&self) -> &RootZone { &self.zone }

	fn validate(&self, bytes: &[u8]) -> Result<codec::ResourceRecord, SubmitError> {
		let record = codec::parse(bytes).map_err(|e| {
			warn!("Refusing unparseable record: {}", e);
			e
		})?;
		self.zone.authorize(&record).map_err(|e| {
			warn!("Refusing record: {}", e);
			e
		})?;
		Ok(record)
	}

	/// Parses, checks and stores a new record.
	pub fn submit(&self, bytes: &[u8]) -> Result<StoredRecord, SubmitError> {
		let record = self.validate(bytes)?;
		let id = self.store.insert(&record).map_err(log_store_err)?;
		info!("Created record {} ({} {})", id, record.name(), record.ty());
		Ok(StoredRecord { id, record })
	}

	/// Replaces the record at `id` with a newly submitted one, keeping the id.
	pub fn resubmit(&self, id: RecordId, bytes: &[u8]) -> Result<StoredRecord, SubmitError> {
		let record = self.validate(bytes)?;
		self.store.update(id, &record).map_err(log_store_err)?;
		info!("Updated record {} ({} {})", id, record.name(), record.ty());
		Ok(StoredRecord { id, record })
	}

	/// Deletes the record at `id`.
	pub fn remove(&self, id: RecordId) -> Result<(), SubmitError> {
		self.store.delete(id).map_err(log_store_err)?;
		info!("Deleted record {}", id);
		Ok(())
	}

	/// Every record stored at `name`.
	pub fn list_by_name(&self, name: &Name) -> Result<Vec<StoredRecord>, SubmitError> {
		Ok(self.store.list_by_name(name).map_err(log_store_err)?)
	}
}

fn log_store_err(e: StoreError) -> SubmitError {
	match &e {
		StoreError::NotFound(id) => warn!("No record with id {}", id),
		e => error!("Record store failed: {}", e),
	}
	e.into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rr::RecordType;
	use crate::store::MemoryStore;

	fn pipeline() -> (Arc<MemoryStore>, Submissions) {
		let store = Arc::new(MemoryStore::new());
		let zone = RootZone::new("messwithdns.com.".try_into().unwrap());
		(Arc::clone(&store), Submissions::new(store, zone))
	}

	fn name(s: &str) -> Name { s.try_into().unwrap() }

	#[test]
	fn submit_and_list() {
		let (_, submissions) = pipeline();
		let stored = submissions.submit(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		assert_eq!(stored.record.ty(), RecordType::A);
		assert_eq!(stored.record.ttl, 300);

		let listed = submissions.list_by_name(&name("foo.messwithdns.com.")).unwrap();
		assert_eq!(listed, vec![stored]);
	}

	#[test]
	fn submit_wire_record() {
		let (_, submissions) = pipeline();
		let wire = codec::parse(b"foo.messwithdns.com. 60 IN MX 10 mail.example.com.").unwrap().raw();
		let stored = submissions.submit(&wire).unwrap();
		assert_eq!(stored.record.rr.text_data(), "10 mail.example.com.");
	}

	#[test]
	fn rejected_names_never_reach_the_store() {
		let (store, submissions) = pipeline();
		for text in [
			"evilmesswithdns.com. 300 IN A 1.2.3.4",
			"foo.evilmesswithdns.com. 300 IN A 1.2.3.4",
			"foo.example.com. 300 IN A 1.2.3.4",
			"com. 300 IN A 1.2.3.4",
		] {
			assert!(matches!(submissions.submit(text.as_bytes()), Err(SubmitError::Rejected(_))), "{}", text);
		}
		assert!(store.list_by_name(&name("evilmesswithdns.com.")).unwrap().is_empty());
		assert!(store.list_by_name(&name("foo.evilmesswithdns.com.")).unwrap().is_empty());
		assert!(store.list_by_name(&name("foo.example.com.")).unwrap().is_empty());
		// Nothing was allocated, so the first real id is still 1.
		assert_eq!(submissions.submit(b"ok.messwithdns.com. 1 IN A 1.2.3.4").unwrap().id, RecordId(1));
	}

	#[test]
	fn parse_errors_never_reach_the_store() {
		let (store, submissions) = pipeline();
		assert!(matches!(submissions.submit(b"foo.messwithdns.com. 300 IN A 1.2.3"), Err(SubmitError::Parse(_))));
		assert!(matches!(submissions.submit(b""), Err(SubmitError::Parse(_))));
		assert!(store.list_by_name(&name("foo.messwithdns.com.")).unwrap().is_empty());
	}

	#[test]
	fn oversized_txt_leaves_name_readable() {
		let (_, submissions) = pipeline();
		let first = submissions.submit(b"big.messwithdns.com. 60 IN A 1.2.3.4").unwrap();
		let mut text = "big.messwithdns.com. 60 IN TXT".to_owned();
		for _ in 0..257 {
			text.push(' ');
			text += &"x".repeat(255);
		}
		assert!(matches!(submissions.submit(text.as_bytes()), Err(SubmitError::Parse(_))));
		assert_eq!(submissions.list_by_name(&name("big.messwithdns.com.")).unwrap(), vec![first]);
	}

	#[test]
	fn resubmit_keeps_id() {
		let (_, submissions) = pipeline();
		let first = submissions.submit(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		let updated = submissions.resubmit(first.id, b"foo.messwithdns.com. 30 IN A 5.6.7.8").unwrap();
		assert_eq!(updated.id, first.id);
		let listed = submissions.list_by_name(&name("foo.messwithdns.com.")).unwrap();
		assert_eq!(listed, vec![updated]);
		assert_eq!(listed[0].record.rr.text_data(), "5.6.7.8");
	}

	#[test]
	fn rejected_resubmit_leaves_record_alone() {
		let (_, submissions) = pipeline();
		let first = submissions.submit(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		assert!(matches!(submissions.resubmit(first.id, b"foo.example.com. 300 IN A 5.6.7.8"),
			Err(SubmitError::Rejected(_))));
		assert!(matches!(submissions.resubmit(first.id, b"not a record"), Err(SubmitError::Parse(_))));
		assert_eq!(submissions.list_by_name(&name("foo.messwithdns.com.")).unwrap(), vec![first]);
	}

	#[test]
	fn resubmit_unknown_id() {
		let (_, submissions) = pipeline();
		assert!(matches!(submissions.resubmit(RecordId(7), b"foo.messwithdns.com. 300 IN A 1.2.3.4"),
			Err(SubmitError::NotFound(RecordId(7)))));
	}

	#[test]
	fn remove_twice() {
		let (_, submissions) = pipeline();
		let stored = submissions.submit(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		submissions.remove(stored.id).unwrap();
		assert!(matches!(submissions.remove(stored.id), Err(SubmitError::NotFound(id)) if id == stored.id));
		assert!(submissions.list_by_name(&name("foo.messwithdns.com.")).unwrap().is_empty());
	}
}
