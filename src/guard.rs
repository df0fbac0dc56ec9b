//! Keeps every stored record inside the zone delegated to us.

use thiserror::Error;

use crate::codec::ResourceRecord;
use crate::rr::Name;

/// A record was refused because its name is outside of the root zone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name} is not within {zone}")]
pub struct Rejected {
	/// The offending record name.
	pub name: Name,
	/// The zone it had to be inside of.
	pub zone: Name,
}

/// The zone all submitted names must fall under, e.g. `messwithdns.com.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootZone(Name);
impl RootZone {
	/// Wraps the zone apex name.
	pub fn new(apex: Name) -> Self { RootZone(apex) }

	/// The zone apex.
	pub fn apex(&self) -> &Name { &self.0 }

	/// Returns true if `name` is the apex or any name below it.
	pub fn contains(&self, name: &Name) -> bool { name.is_within(&self.0) }

	/// Checks a record may be written.
	pub fn authorize(&self, record: &ResourceRecord) -> Result<(), Rejected> {
		if self.contains(record.name()) {
			Ok(())
		} else {
			Err(Rejected { name: record.name().clone(), zone: self.0.clone() })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::codec;

	fn zone() -> RootZone { RootZone::new("messwithdns.com.".try_into().unwrap()) }

	#[test]
	fn accepts_names_in_zone() {
		for text in [
			"messwithdns.com. 60 IN TXT hi",
			"foo.messwithdns.com. 60 IN A 1.2.3.4",
			"FOO.MESSWITHDNS.COM. 60 IN A 1.2.3.4",
			"a.b.c.messwithdns.com. 60 IN A 1.2.3.4",
		] {
			assert_eq!(zone().authorize(&codec::parse(text.as_bytes()).unwrap()), Ok(()), "{}", text);
		}
	}

	#[test]
	fn rejects_suffix_confusables() {
		for text in [
			"foo.evilmesswithdns.com. 60 IN A 1.2.3.4",
			"evilmesswithdns.com. 60 IN A 1.2.3.4",
			"messwithdns.com.evil.net. 60 IN A 1.2.3.4",
			"com. 60 IN A 1.2.3.4",
			"example.org. 60 IN A 1.2.3.4",
		] {
			let record = codec::parse(text.as_bytes()).unwrap();
			let err = zone().authorize(&record).unwrap_err();
			assert_eq!(&err.name, record.name());
			assert_eq!(err.zone.as_str(), "messwithdns.com.");
		}
	}

	#[test]
	fn only_the_owner_name_matters() {
		// Pointing at a name outside the zone is fine, owning one is not.
		let record = codec::parse(b"foo.messwithdns.com. 60 IN CNAME example.org.").unwrap();
		assert!(zone().authorize(&record).is_ok());
	}
}
