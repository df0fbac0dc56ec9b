//! Turns untrusted submission bytes into a [`ResourceRecord`] and back.
//!
//! A submission is a single record, either in the RFC 1035 wire format (with no name
//! compression) or as one line of presentation format, e.g. `foo.messwithdns.com. 300 IN A
//! 1.2.3.4`. Which one is detected by looking for a zero byte: every wire record has one, the
//! root label ending its owner name, and presentation text never does.

use crate::rr::{Name, RecordType, RR};
use crate::ser::*;

/// The two encodings a record may be submitted or returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	/// RFC 1035 wire format.
	Wire,
	/// Presentation (zone file) format.
	Text,
}
impl Encoding {
	/// Guesses the encoding of a submission.
	pub fn detect(bytes: &[u8]) -> Encoding {
		if bytes.contains(&0) { Encoding::Wire } else { Encoding::Text }
	}
}

/// A parsed record with its TTL, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
	/// Seconds resolvers may cache this record for.
	pub ttl: u32,
	/// The record itself, carrying its name, type and data.
	pub rr: RR,
}
impl ResourceRecord {
	/// The name this record is at.
	pub fn name(&self) -> &Name { self.rr.name() }
	/// The type of this record.
	pub fn ty(&self) -> RecordType { self.rr.ty() }
	/// The canonical wire encoding of this record, as it is persisted.
	pub fn raw(&self) -> Vec<u8> { serialize(self, Encoding::Wire) }
}

/// Parses a single submitted record.
pub fn parse(bytes: &[u8]) -> Result<ResourceRecord, ParseError> {
	let (rr, ttl) = match Encoding::detect(bytes) {
		Encoding::Text => parse_rr_text(bytes)?,
		Encoding::Wire => {
			let mut inp = bytes;
			let res = parse_rr(&mut inp)?;
			if !inp.is_empty() { return Err(ParseError::TrailingData(inp.len())); }
			res
		},
	};
	Ok(ResourceRecord { ttl, rr })
}

/// Serializes a record in the given encoding. Text output is UTF-8 and has no trailing newline.
pub fn serialize(record: &ResourceRecord, encoding: Encoding) -> Vec<u8> {
	match encoding {
		Encoding::Wire => {
			let mut out = Vec::new();
			write_rr(&record.rr, record.ttl, &mut out);
			out
		},
		Encoding::Text => write_rr_text(&record.rr, record.ttl).into_bytes(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rr::*;

	fn samples() -> Vec<&'static str> {
		vec![
			"foo.messwithdns.com. 300 IN A 1.2.3.4",
			"foo.messwithdns.com. 300 IN AAAA 2001:db8::1",
			"foo.messwithdns.com. 60 IN CNAME example.com.",
			"messwithdns.com. 3600 IN NS ns1.messwithdns.com.",
			"4.3.2.1.in-addr.messwithdns.com. 60 IN PTR host.example.com.",
			"foo.messwithdns.com. 60 IN MX 10 mail.example.com.",
			"foo.messwithdns.com. 60 IN TXT \"v=spf1 -all\"",
			"foo.messwithdns.com. 60 IN TXT \"two\" \"strings\"",
			"foo.messwithdns.com. 60 IN TXT \"\\000\\255\"",
			"_sip._tcp.messwithdns.com. 60 IN SRV 1 2 5060 sip.example.com.",
		]
	}

	#[test]
	fn detects_encoding() {
		assert_eq!(Encoding::detect(b"foo.com. 1 A 1.2.3.4"), Encoding::Text);
		assert_eq!(Encoding::detect(b"\nfoo.com. 1 A 1.2.3.4"), Encoding::Text);
		assert_eq!(Encoding::detect(&[3, b'f', b'o', b'o', 0]), Encoding::Wire);
		assert_eq!(Encoding::detect(&[]), Encoding::Text);
	}

	#[test]
	fn wire_record_with_printable_leading_length() {
		// A 52-byte first label starts with b'4', which is also how a reverse name in text starts.
		let text = format!("{}.messwithdns.com. 60 IN A 10.0.0.1", "4".repeat(52));
		let record = parse(text.as_bytes()).unwrap();
		let wire = record.raw();
		assert_eq!(wire[0], b'4');
		assert_eq!(Encoding::detect(&wire), Encoding::Wire);
		assert_eq!(parse(&wire).unwrap(), record);
	}

	#[test]
	fn text_and_wire_roundtrip() {
		for text in samples() {
			let from_text = parse(text.as_bytes()).unwrap();
			let wire = serialize(&from_text, Encoding::Wire);
			assert_eq!(Encoding::detect(&wire), Encoding::Wire);
			let from_wire = parse(&wire).unwrap();
			assert_eq!(from_text, from_wire, "{}", text);

			let text_again = serialize(&from_wire, Encoding::Text);
			assert_eq!(parse(&text_again).unwrap(), from_text, "{}", text);
		}
	}

	#[test]
	fn multi_string_txt_concatenates() {
		let record = parse(b"foo.messwithdns.com. 60 IN TXT \"two\" \"strings\"").unwrap();
		assert_eq!(record.rr, Txt { name: "foo.messwithdns.com.".try_into().unwrap(), data: b"twostrings".to_vec() }.into());
	}

	fn txt_of(strings: &[usize]) -> String {
		let mut text = "big.messwithdns.com. 60 IN TXT".to_owned();
		for len in strings {
			text.push(' ');
			text += &"x".repeat(*len);
		}
		text
	}

	#[test]
	fn txt_must_fit_in_one_record() {
		let mut strings = vec![255; 255];
		strings.push(254);
		let largest = parse(txt_of(&strings).as_bytes()).unwrap();
		let wire = largest.raw();
		assert_eq!(u16::from_be_bytes([wire[wire.len() - 65537], wire[wire.len() - 65536]]), u16::MAX);
		assert_eq!(parse(&wire).unwrap(), largest);
		assert_eq!(parse(&serialize(&largest, Encoding::Text)).unwrap(), largest);

		*strings.last_mut().unwrap() = 255;
		assert!(matches!(parse(txt_of(&strings).as_bytes()), Err(ParseError::InvalidData { ty: "TXT", .. })));
		strings.push(1);
		assert!(matches!(parse(txt_of(&strings).as_bytes()), Err(ParseError::InvalidData { ty: "TXT", .. })));
	}

	#[test]
	fn raw_is_wire_form() {
		let record = parse(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		assert_eq!(record.raw(), serialize(&record, Encoding::Wire));
		assert_eq!(record.name().as_str(), "foo.messwithdns.com.");
		assert_eq!(record.ty(), RecordType::A);
		assert_eq!(record.ttl, 300);
	}

	#[test]
	fn wire_trailing_bytes_rejected() {
		let record = parse(b"foo.messwithdns.com. 300 IN A 1.2.3.4").unwrap();
		let mut wire = record.raw();
		wire.push(0);
		assert_eq!(parse(&wire), Err(ParseError::TrailingData(1)));
	}

	#[test]
	fn garbage_rejected() {
		assert!(parse(b"").is_err());
		assert!(parse(&[0xff, 0xfe, 0xfd]).is_err());
		assert!(parse(&[0x00]).is_err());
		assert!(parse(b"{\"Hdr\": {\"Name\": \"foo.messwithdns.com.\"}}").is_err());
		assert!(parse("föö.messwithdns.com. 300 IN A 1.2.3.4".as_bytes()).is_err());
	}
}
