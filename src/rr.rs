//! Resource Records are the fundamental type in the DNS - individual records mapping a name to
//! some data.
//!
//! This module holds structs and utilities for the Resource Records which users may submit. The
//! set of types is closed: anything not listed in [`RecordType`] is refused at parse time.

use core::fmt;
use core::str::FromStr;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::ser::*;

/// A valid domain name.
///
/// It must end with a ".", be no longer than 254 bytes (255 once encoded), consist of only printable ASCII
/// characters other than `"` and `\`, and each label may be no longer than 63 bytes. Names are
/// stored lowercased, so two [`Name`]s compare equal exactly when they are the same DNS name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);
impl Name {
	/// Gets the underlying human-readable domain name
	pub fn as_str(&self) -> &str { &self.0 }

	/// Returns true if this name is `zone` itself or sits below it.
	///
	/// The comparison is on label boundaries, so `evilexample.com.` is not under `example.com.`.
	pub fn is_within(&self, zone: &Name) -> bool {
		if zone.as_str() == "." { return true; }
		match self.0.strip_suffix(zone.as_str()) {
			Some("") => true,
			Some(prefix) => prefix.ends_with('.'),
			None => false,
		}
	}
}
impl core::ops::Deref for Name {
	type Target = str;
	fn deref(&self) -> &str { &self.0 }
}
impl fmt::Display for Name {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&self.0) }
}
impl TryFrom<String> for Name {
	type Error = ParseError;
	fn try_from(mut s: String) -> Result<Name, ParseError> {
		// 254 characters with the final dot is 255 octets on the wire.
		if s.is_empty() || !s.ends_with('.') || s.len() > 254 {
			return Err(ParseError::InvalidName(s));
		}
		// Quotes and backslashes would not survive a trip through presentation format.
		if s.chars().any(|c| !c.is_ascii_graphic() || c == '"' || c == '\\') {
			return Err(ParseError::InvalidName(s));
		}
		if s != "." {
			for label in s[..s.len() - 1].split('.') {
				if label.is_empty() || label.len() > 63 { return Err(ParseError::InvalidName(s)); }
			}
		}
		s.make_ascii_lowercase();
		Ok(Name(s))
	}
}
impl TryFrom<&str> for Name {
	type Error = ParseError;
	fn try_from(s: &str) -> Result<Name, ParseError> {
		Self::try_from(s.to_owned())
	}
}
impl FromStr for Name {
	type Err = ParseError;
	fn from_str(s: &str) -> Result<Name, ParseError> { Self::try_from(s) }
}

/// The type of a resource record, as maintained by IANA.
///
/// Current assignments can be found at
/// <http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4>
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
	/// An IPv4 address
	A,
	/// An authoritative name server
	NS,
	/// A canonical name (alias)
	CName,
	/// A domain name pointer
	PTR,
	/// A mail exchange
	MX,
	/// Text strings
	Txt,
	/// An IPv6 address
	AAAA,
	/// A service locator
	SRV,
}
impl RecordType {
	/// All supported types, in IANA code order.
	pub const ALL: [RecordType; 8] = [
		RecordType::A, RecordType::NS, RecordType::CName, RecordType::PTR, RecordType::MX,
		RecordType::Txt, RecordType::AAAA, RecordType::SRV,
	];

	/// The IANA type code.
	pub const fn code(self) -> u16 {
		match self {
			RecordType::A => 1,
			RecordType::NS => 2,
			RecordType::CName => 5,
			RecordType::PTR => 12,
			RecordType::MX => 15,
			RecordType::Txt => 16,
			RecordType::AAAA => 28,
			RecordType::SRV => 33,
		}
	}

	/// Maps an IANA type code onto a supported type.
	pub fn from_code(code: u16) -> Option<RecordType> {
		Self::ALL.iter().copied().find(|ty| ty.code() == code)
	}

	/// The presentation-format mnemonic, e.g. `"AAAA"`.
	pub const fn mnemonic(self) -> &'static str {
		match self {
			RecordType::A => "A",
			RecordType::NS => "NS",
			RecordType::CName => "CNAME",
			RecordType::PTR => "PTR",
			RecordType::MX => "MX",
			RecordType::Txt => "TXT",
			RecordType::AAAA => "AAAA",
			RecordType::SRV => "SRV",
		}
	}
}
impl fmt::Display for RecordType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.mnemonic()) }
}
impl FromStr for RecordType {
	type Err = ParseError;
	fn from_str(s: &str) -> Result<RecordType, ParseError> {
		Self::ALL.iter().copied().find(|ty| ty.mnemonic().eq_ignore_ascii_case(s))
			.ok_or_else(|| ParseError::UnsupportedType(s.to_owned()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A supported Resource Record
pub enum RR {
	/// An IPv4 resource record
	A(A),
	/// An IPv6 resource record
	AAAA(AAAA),
	/// A name server resource record
	NS(NS),
	/// A Canonical Name record
	CName(CName),
	/// A domain name pointer record
	PTR(PTR),
	/// A mail exchange record
	MX(MX),
	/// A text resource record
	Txt(Txt),
	/// A service locator record
	SRV(SRV),
}
impl RR {
	/// Gets the name this record refers to.
	pub fn name(&self) -> &Name {
		match self {
			RR::A(rr) => StaticRecord::name(rr),
			RR::AAAA(rr) => StaticRecord::name(rr),
			RR::NS(rr) => StaticRecord::name(rr),
			RR::CName(rr) => StaticRecord::name(rr),
			RR::PTR(rr) => StaticRecord::name(rr),
			RR::MX(rr) => StaticRecord::name(rr),
			RR::Txt(rr) => StaticRecord::name(rr),
			RR::SRV(rr) => StaticRecord::name(rr),
		}
	}
	/// Gets the type of this record.
	pub fn ty(&self) -> RecordType {
		match self {
			RR::A(_) => A::TYPE,
			RR::AAAA(_) => AAAA::TYPE,
			RR::NS(_) => NS::TYPE,
			RR::CName(_) => CName::TYPE,
			RR::PTR(_) => PTR::TYPE,
			RR::MX(_) => MX::TYPE,
			RR::Txt(_) => Txt::TYPE,
			RR::SRV(_) => SRV::TYPE,
		}
	}
	/// Returns true if this record answers a question of type `ty`.
	pub fn matches_type(&self, ty: RecordType) -> bool { self.ty() == ty }

	pub(crate) fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		match self {
			RR::A(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::AAAA(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::NS(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::CName(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::PTR(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::MX(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::Txt(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
			RR::SRV(rr) => StaticRecord::write_u16_len_prefixed_data(rr, out),
		}
	}
	/// Writes the presentation-format rdata (everything after the type mnemonic).
	pub fn write_text_data(&self, out: &mut String) {
		match self {
			RR::A(rr) => StaticRecord::write_text_data(rr, out),
			RR::AAAA(rr) => StaticRecord::write_text_data(rr, out),
			RR::NS(rr) => StaticRecord::write_text_data(rr, out),
			RR::CName(rr) => StaticRecord::write_text_data(rr, out),
			RR::PTR(rr) => StaticRecord::write_text_data(rr, out),
			RR::MX(rr) => StaticRecord::write_text_data(rr, out),
			RR::Txt(rr) => StaticRecord::write_text_data(rr, out),
			RR::SRV(rr) => StaticRecord::write_text_data(rr, out),
		}
	}
	/// The presentation-format rdata as a new `String`.
	pub fn text_data(&self) -> String {
		let mut out = String::new();
		self.write_text_data(&mut out);
		out
	}

	pub(crate) fn read_from_data(ty: RecordType, name: Name, data: &[u8], wire_packet: Option<&[u8]>)
	-> Result<RR, ParseError> {
		Ok(match ty {
			RecordType::A => A::read_from_data(name, data, wire_packet)?.into(),
			RecordType::AAAA => AAAA::read_from_data(name, data, wire_packet)?.into(),
			RecordType::NS => NS::read_from_data(name, data, wire_packet)?.into(),
			RecordType::CName => CName::read_from_data(name, data, wire_packet)?.into(),
			RecordType::PTR => PTR::read_from_data(name, data, wire_packet)?.into(),
			RecordType::MX => MX::read_from_data(name, data, wire_packet)?.into(),
			RecordType::Txt => Txt::read_from_data(name, data, wire_packet)?.into(),
			RecordType::SRV => SRV::read_from_data(name, data, wire_packet)?.into(),
		})
	}
	pub(crate) fn read_from_text(ty: RecordType, name: Name, tokens: &[TextToken]) -> Result<RR, ParseError> {
		Ok(match ty {
			RecordType::A => A::read_from_text(name, tokens)?.into(),
			RecordType::AAAA => AAAA::read_from_text(name, tokens)?.into(),
			RecordType::NS => NS::read_from_text(name, tokens)?.into(),
			RecordType::CName => CName::read_from_text(name, tokens)?.into(),
			RecordType::PTR => PTR::read_from_text(name, tokens)?.into(),
			RecordType::MX => MX::read_from_text(name, tokens)?.into(),
			RecordType::Txt => Txt::read_from_text(name, tokens)?.into(),
			RecordType::SRV => SRV::read_from_text(name, tokens)?.into(),
		})
	}
}
impl From<A> for RR { fn from(a: A) -> RR { RR::A(a) } }
impl From<AAAA> for RR { fn from(aaaa: AAAA) -> RR { RR::AAAA(aaaa) } }
impl From<NS> for RR { fn from(ns: NS) -> RR { RR::NS(ns) } }
impl From<CName> for RR { fn from(cname: CName) -> RR { RR::CName(cname) } }
impl From<PTR> for RR { fn from(ptr: PTR) -> RR { RR::PTR(ptr) } }
impl From<MX> for RR { fn from(mx: MX) -> RR { RR::MX(mx) } }
impl From<Txt> for RR { fn from(txt: Txt) -> RR { RR::Txt(txt) } }
impl From<SRV> for RR { fn from(srv: SRV) -> RR { RR::SRV(srv) } }

pub(crate) trait StaticRecord : Ord + Sized {
	const TYPE: RecordType;
	fn name(&self) -> &Name;
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>);
	fn write_text_data(&self, out: &mut String);
	/// `wire_packet` is the enclosing message, if any; compression pointers are refused without one.
	fn read_from_data(name: Name, data: &[u8], wire_packet: Option<&[u8]>) -> Result<Self, ParseError>;
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError>;
}

fn invalid<T>(ty: RecordType, reason: &str) -> Result<T, ParseError> {
	Err(ParseError::InvalidData { ty: ty.mnemonic(), reason: reason.to_owned() })
}

/// Checks the rdata reader consumed everything it was given.
fn data_done(ty: RecordType, data: &[u8]) -> Result<(), ParseError> {
	if data.is_empty() { Ok(()) } else { invalid(ty, "trailing bytes in record data") }
}

fn single_token(ty: RecordType, tokens: &[TextToken]) -> Result<&str, ParseError> {
	match tokens {
		[tok] => text_token_str(tok),
		_ => invalid(ty, "expected exactly one value"),
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// An IPv4 Address resource record
pub struct A {
	/// The name this record is at.
	pub name: Name,
	/// The bytes of the IPv4 address.
	pub address: [u8; 4],
}
impl StaticRecord for A {
	const TYPE: RecordType = RecordType::A;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, data: &[u8], _wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
		let address = data.try_into().or_else(|_| invalid(Self::TYPE, "address must be 4 bytes"))?;
		Ok(A { name, address })
	}
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
		let addr = Ipv4Addr::from_str(single_token(Self::TYPE, tokens)?)
			.or_else(|_| invalid(Self::TYPE, "not an IPv4 address"))?;
		Ok(A { name, address: addr.octets() })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&4u16.to_be_bytes());
		out.extend_from_slice(&self.address);
	}
	fn write_text_data(&self, out: &mut String) {
		*out += &Ipv4Addr::from(self.address).to_string();
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// An IPv6 Address resource record
pub struct AAAA {
	/// The name this record is at.
	pub name: Name,
	/// The bytes of the IPv6 address.
	pub address: [u8; 16],
}
impl StaticRecord for AAAA {
	const TYPE: RecordType = RecordType::AAAA;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, data: &[u8], _wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
		let address = data.try_into().or_else(|_| invalid(Self::TYPE, "address must be 16 bytes"))?;
		Ok(AAAA { name, address })
	}
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
		let addr = Ipv6Addr::from_str(single_token(Self::TYPE, tokens)?)
			.or_else(|_| invalid(Self::TYPE, "not an IPv6 address"))?;
		Ok(AAAA { name, address: addr.octets() })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&16u16.to_be_bytes());
		out.extend_from_slice(&self.address);
	}
	fn write_text_data(&self, out: &mut String) {
		*out += &Ipv6Addr::from(self.address).to_string();
	}
}

/// NS, CNAME and PTR all carry a single domain name as their data.
macro_rules! name_record {
	($(#[$meta: meta])* $ty: ident, $field: ident, $rr_type: expr) => {
		#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
		$(#[$meta])*
		pub struct $ty {
			/// The name this record is at.
			pub name: Name,
			#[allow(missing_docs)]
			pub $field: Name,
		}
		impl StaticRecord for $ty {
			const TYPE: RecordType = $rr_type;
			fn name(&self) -> &Name { &self.name }
			fn read_from_data(name: Name, mut data: &[u8], wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
				let $field = read_wire_packet_name(&mut data, wire_packet)?;
				data_done(Self::TYPE, data)?;
				Ok($ty { name, $field })
			}
			fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
				match tokens {
					[tok] => Ok($ty { name, $field: text_token_name(tok)? }),
					_ => invalid(Self::TYPE, "expected exactly one name"),
				}
			}
			fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
				out.extend_from_slice(&name_len(&self.$field).to_be_bytes());
				write_name(out, &self.$field);
			}
			fn write_text_data(&self, out: &mut String) {
				*out += self.$field.as_str();
			}
		}
	}
}

name_record!(
	/// A Name Server resource record, which indicates the server responsible for handling queries
	/// for a zone.
	NS, name_server, RecordType::NS);
name_record!(
	/// A Canonical Name resource record, referring all queries for this name to another name.
	///
	/// A resolver should use [`CName::canonical_name`] when looking up any further records.
	CName, canonical_name, RecordType::CName);
name_record!(
	/// A pointer record, usually mapping a reverse-lookup name back to a host name.
	PTR, target, RecordType::PTR);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A mail exchange resource record.
pub struct MX {
	/// The name this record is at.
	pub name: Name,
	/// Lower values are preferred.
	pub preference: u16,
	/// The host accepting mail for [`Self::name`].
	pub exchange: Name,
}
impl StaticRecord for MX {
	const TYPE: RecordType = RecordType::MX;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
		let preference = read_u16(&mut data)?;
		let exchange = read_wire_packet_name(&mut data, wire_packet)?;
		data_done(Self::TYPE, data)?;
		Ok(MX { name, preference, exchange })
	}
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
		match tokens {
			[preference, exchange] => Ok(MX {
				name,
				preference: text_token_u16(Self::TYPE, preference)?,
				exchange: text_token_name(exchange)?,
			}),
			_ => invalid(Self::TYPE, "expected <preference> <exchange>"),
		}
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 2 + name_len(&self.exchange);
		out.extend_from_slice(&len.to_be_bytes());
		out.extend_from_slice(&self.preference.to_be_bytes());
		write_name(out, &self.exchange);
	}
	fn write_text_data(&self, out: &mut String) {
		*out += &format!("{} {}", self.preference, self.exchange);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A text resource record, containing arbitrary text data
pub struct Txt {
	/// The name this record is at.
	pub name: Name,
	/// The text record itself.
	///
	/// While this is generally UTF-8-valid, there is no specific requirement that it be, and thus
	/// is an arbitrary series of bytes here. Multiple character-strings are concatenated.
	pub data: Vec<u8>,
}
impl Txt {
	/// The most data which fits in one record once split into 255-byte character-strings.
	pub const MAX_DATA_LEN: usize = 255 * 255 + 254;

	fn chunks(&self) -> impl Iterator<Item = &[u8]> {
		// An empty TXT record is still a single zero-length string.
		let empty: &[u8] = &[];
		let first = if self.data.is_empty() { Some(empty) } else { None };
		first.into_iter().chain(self.data.chunks(255))
	}
}
impl StaticRecord for Txt {
	const TYPE: RecordType = RecordType::Txt;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], _wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
		if data.is_empty() { return invalid(Self::TYPE, "no character-strings"); }
		let mut parsed_data = Vec::with_capacity(data.len());
		while !data.is_empty() {
			let len = read_u8(&mut data)? as usize;
			if data.len() < len { return Err(ParseError::Truncated); }
			parsed_data.extend_from_slice(&data[..len]);
			data = &data[len..];
		}
		Ok(Txt { name, data: parsed_data })
	}
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
		if tokens.is_empty() { return invalid(Self::TYPE, "no character-strings"); }
		let mut data = Vec::new();
		for tok in tokens {
			if tok.len() > 255 { return invalid(Self::TYPE, "character-string longer than 255 bytes"); }
			data.extend_from_slice(tok);
		}
		if data.len() > Self::MAX_DATA_LEN {
			return invalid(Self::TYPE, "more text than fits in one record");
		}
		Ok(Txt { name, data })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		// Parsing caps `data` at MAX_DATA_LEN, so only a hand-built record can saturate here.
		let len = self.chunks().map(|chunk| chunk.len() + 1).sum::<usize>();
		out.extend_from_slice(&u16::try_from(len).unwrap_or(u16::MAX).to_be_bytes());
		for chunk in self.chunks() {
			out.push(u8::try_from(chunk.len()).unwrap_or(u8::MAX));
			out.extend_from_slice(chunk);
		}
	}
	fn write_text_data(&self, out: &mut String) {
		for (idx, chunk) in self.chunks().enumerate() {
			if idx != 0 { out.push(' '); }
			write_quoted_text(out, chunk);
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A service locator resource record (RFC 2782).
pub struct SRV {
	/// The name this record is at, e.g. `_sip._tcp.example.com.`.
	pub name: Name,
	/// Lower values are tried first.
	pub priority: u16,
	/// Relative weight among records with the same priority.
	pub weight: u16,
	/// The port the service listens on.
	pub port: u16,
	/// The host providing the service.
	pub target: Name,
}
impl StaticRecord for SRV {
	const TYPE: RecordType = RecordType::SRV;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: Option<&[u8]>) -> Result<Self, ParseError> {
		let (priority, weight, port) = (read_u16(&mut data)?, read_u16(&mut data)?, read_u16(&mut data)?);
		let target = read_wire_packet_name(&mut data, wire_packet)?;
		data_done(Self::TYPE, data)?;
		Ok(SRV { name, priority, weight, port, target })
	}
	fn read_from_text(name: Name, tokens: &[TextToken]) -> Result<Self, ParseError> {
		match tokens {
			[priority, weight, port, target] => Ok(SRV {
				name,
				priority: text_token_u16(Self::TYPE, priority)?,
				weight: text_token_u16(Self::TYPE, weight)?,
				port: text_token_u16(Self::TYPE, port)?,
				target: text_token_name(target)?,
			}),
			_ => invalid(Self::TYPE, "expected <priority> <weight> <port> <target>"),
		}
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 2 * 3 + name_len(&self.target);
		out.extend_from_slice(&len.to_be_bytes());
		out.extend_from_slice(&self.priority.to_be_bytes());
		out.extend_from_slice(&self.weight.to_be_bytes());
		out.extend_from_slice(&self.port.to_be_bytes());
		write_name(out, &self.target);
	}
	fn write_text_data(&self, out: &mut String) {
		*out += &format!("{} {} {} {}", self.priority, self.weight, self.port, self.target);
	}
}
