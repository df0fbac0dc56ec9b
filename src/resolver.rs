//! Answers DNS questions from the record store.
//!
//! Matching is exact: no wildcards, and no chasing of CNAMEs to other names. When a name holds a
//! CNAME, a question of any other type is answered with the CNAME alone.

use std::sync::Arc;

use crate::rr::{Name, RecordType};
use crate::store::{RecordStore, Result, StoredRecord};

/// The outcome of a lookup, distinguishing the two ways of having no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
	/// Matching records (never empty).
	Answer(Vec<StoredRecord>),
	/// The name has records, just none of the requested type.
	NoData,
	/// Nothing at all is stored at the name.
	NxDomain,
}

/// Resolves questions against a [`RecordStore`].
pub struct Resolver {
	store: Arc<dyn RecordStore>,
}

impl Resolver {
	/// Creates a resolver reading from `store`.
	pub fn new(store: Arc<dyn RecordStore>) -> Self {
		Resolver { store }
	}

	/// Returns the records answering `ty` at `name`, possibly none.
	pub fn resolve(&self, name: &Name, ty: RecordType) -> Result<Vec<StoredRecord>> {
		if ty != RecordType::CName {
			let cnames = self.store.find_for_question(name, RecordType::CName)?;
			if !cnames.is_empty() { return Ok(cnames); }
		}
		self.store.find_for_question(name, ty)
	}

	/// Returns true if any record, of any type, is stored at `name`.
	pub fn exists(&self, name: &Name) -> Result<bool> {
		Ok(!self.store.list_by_name(name)?.is_empty())
	}

	/// Like [`Self::resolve`], but tells an empty name apart from a name without this type.
	pub fn lookup(&self, name: &Name, ty: RecordType) -> Result<Lookup> {
		let all = self.store.list_by_name(name)?;
		if all.is_empty() { return Ok(Lookup::NxDomain); }

		let cnames: Vec<_> = all.iter().filter(|stored| stored.record.rr.matches_type(RecordType::CName)).cloned().collect();
		let answers = if ty != RecordType::CName && !cnames.is_empty() {
			cnames
		} else {
			all.into_iter().filter(|stored| stored.record.rr.matches_type(ty)).collect()
		};
		if answers.is_empty() { Ok(Lookup::NoData) } else { Ok(Lookup::Answer(answers)) }
	}
}
