//! Tests run against every backend.

use std::sync::Arc;
use std::thread;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::*;
use crate::codec;

fn record(text: &str) -> ResourceRecord {
	codec::parse(text.as_bytes()).unwrap()
}

fn name(s: &str) -> Name {
	s.try_into().unwrap()
}

fn redb_store() -> (tempfile::TempDir, RedbStore) {
	let dir = tempfile::tempdir().unwrap();
	let store = RedbStore::open(dir.path().join("records.redb")).unwrap();
	(dir, store)
}

/// Runs a test body against each backend.
fn for_each_backend(test: impl Fn(&dyn RecordStore)) {
	test(&MemoryStore::new());
	let (_dir, store) = redb_store();
	test(&store);
}

#[test]
fn record_ids_from_text() {
	assert_eq!("42".parse::<RecordId>(), Ok(RecordId(42)));
	assert_eq!(RecordId(7).to_string().parse::<RecordId>(), Ok(RecordId(7)));
	assert!("".parse::<RecordId>().is_err());
	assert!("-1".parse::<RecordId>().is_err());
	assert!("abc".parse::<RecordId>().is_err());
}

#[test]
fn insert_then_list() {
	for_each_backend(|store| {
		let a = record("foo.messwithdns.com. 300 IN A 1.2.3.4");
		let id = store.insert(&a).unwrap();
		let listed = store.list_by_name(&name("foo.messwithdns.com.")).unwrap();
		assert_eq!(listed, vec![StoredRecord { id, record: a.clone() }]);
		assert_eq!(store.get(id).unwrap(), Some(StoredRecord { id, record: a }));
		assert!(store.list_by_name(&name("bar.messwithdns.com.")).unwrap().is_empty());
	});
}

#[test]
fn lookups_ignore_case() {
	for_each_backend(|store| {
		store.insert(&record("FOO.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		assert_eq!(store.list_by_name(&name("foo.MESSWITHDNS.com.")).unwrap().len(), 1);
	});
}

#[test]
fn many_records_per_name_and_type() {
	for_each_backend(|store| {
		let first = store.insert(&record("rr.messwithdns.com. 60 IN A 10.0.0.1")).unwrap();
		let second = store.insert(&record("rr.messwithdns.com. 60 IN A 10.0.0.2")).unwrap();
		// Identical records are still distinct entries.
		let third = store.insert(&record("rr.messwithdns.com. 60 IN A 10.0.0.2")).unwrap();
		let txt = store.insert(&record("rr.messwithdns.com. 60 IN TXT hello")).unwrap();
		assert!(first < second && second < third && third < txt);

		let ids: Vec<_> = store.list_by_name(&name("rr.messwithdns.com.")).unwrap()
			.into_iter().map(|stored| stored.id).collect();
		assert_eq!(ids, vec![first, second, third, txt]);

		let a_ids: Vec<_> = store.find_for_question(&name("rr.messwithdns.com."), RecordType::A).unwrap()
			.into_iter().map(|stored| stored.id).collect();
		assert_eq!(a_ids, vec![first, second, third]);
		assert!(store.find_for_question(&name("rr.messwithdns.com."), RecordType::AAAA).unwrap().is_empty());
	});
}

#[test]
fn update_replaces_in_place() {
	for_each_backend(|store| {
		let id = store.insert(&record("foo.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		let new = record("foo.messwithdns.com. 60 IN A 5.6.7.8");
		store.update(id, &new).unwrap();
		assert_eq!(store.list_by_name(&name("foo.messwithdns.com.")).unwrap(),
			vec![StoredRecord { id, record: new }]);
	});
}

#[test]
fn update_moves_between_names() {
	for_each_backend(|store| {
		let id = store.insert(&record("old.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		let other = store.insert(&record("old.messwithdns.com. 300 IN A 1.2.3.5")).unwrap();
		store.update(id, &record("new.messwithdns.com. 300 IN AAAA ::1")).unwrap();

		let old: Vec<_> = store.list_by_name(&name("old.messwithdns.com.")).unwrap()
			.into_iter().map(|stored| stored.id).collect();
		assert_eq!(old, vec![other]);
		let new = store.list_by_name(&name("new.messwithdns.com.")).unwrap();
		assert_eq!(new.len(), 1);
		assert_eq!(new[0].id, id);
		assert_eq!(new[0].record.ty(), RecordType::AAAA);
	});
}

#[test]
fn update_missing_is_not_found() {
	for_each_backend(|store| {
		let err = store.update(RecordId(42), &record("foo.messwithdns.com. 1 IN A 1.2.3.4")).unwrap_err();
		assert!(matches!(err, StoreError::NotFound(RecordId(42))));
		assert!(store.list_by_name(&name("foo.messwithdns.com.")).unwrap().is_empty());
	});
}

#[test]
fn delete_twice_is_not_found() {
	for_each_backend(|store| {
		let id = store.insert(&record("foo.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		store.delete(id).unwrap();
		assert!(matches!(store.delete(id), Err(StoreError::NotFound(missing)) if missing == id));
		assert_eq!(store.get(id).unwrap(), None);
		assert!(store.list_by_name(&name("foo.messwithdns.com.")).unwrap().is_empty());
	});
}

#[test]
fn ids_are_never_reused() {
	for_each_backend(|store| {
		let first = store.insert(&record("foo.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		store.delete(first).unwrap();
		let second = store.insert(&record("foo.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		assert_ne!(first, second);
		assert!(second > first);
	});
}

#[test]
fn redb_survives_reopen() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("records.redb");
	let (kept, deleted) = {
		let store = RedbStore::open(&path).unwrap();
		let kept = store.insert(&record("foo.messwithdns.com. 300 IN TXT \"still here\"")).unwrap();
		let deleted = store.insert(&record("foo.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
		store.delete(deleted).unwrap();
		(kept, deleted)
	};

	let store = RedbStore::open(&path).unwrap();
	let listed = store.list_by_name(&name("foo.messwithdns.com.")).unwrap();
	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, kept);
	// The id counter is persisted too.
	let next = store.insert(&record("bar.messwithdns.com. 300 IN A 1.2.3.4")).unwrap();
	assert!(next > deleted);
}

/// Writers rewrite one record between two versions while readers check they only ever see one
/// of the two whole versions.
fn concurrent_updates_are_atomic(store: Arc<dyn RecordStore>) {
	let versions = [
		record("atomic.messwithdns.com. 100 IN A 1.1.1.1"),
		record("atomic.messwithdns.com. 200 IN A 2.2.2.2"),
	];
	let id = store.insert(&versions[0]).unwrap();

	let mut handles = Vec::new();
	for seed in 0..4u64 {
		let store = Arc::clone(&store);
		let versions = versions.clone();
		handles.push(thread::spawn(move || {
			let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
			for _ in 0..50 {
				if rng.gen_bool(0.5) {
					let version = versions.choose(&mut rng).unwrap();
					store.update(id, version).unwrap();
				} else {
					let seen = store.find_for_question(&name("atomic.messwithdns.com."), RecordType::A).unwrap();
					assert_eq!(seen.len(), 1);
					assert!(versions.contains(&seen[0].record), "torn read: {:?}", seen[0].record);
				}
			}
		}));
	}
	for handle in handles { handle.join().unwrap(); }
}

#[test]
fn memory_concurrent_updates_are_atomic() {
	concurrent_updates_are_atomic(Arc::new(MemoryStore::new()));
}

#[test]
fn redb_concurrent_updates_are_atomic() {
	let (_dir, store) = redb_store();
	concurrent_updates_are_atomic(Arc::new(store));
}
