//! Serialization/Deserialization logic lives here
//!
//! Records travel in two encodings: the RFC 1035 wire format and the presentation (zone file)
//! format. Both readers here are written against untrusted input and report a [`ParseError`]
//! rather than panicking.

use thiserror::Error;

use crate::rr::*;

/// The reason a record or message failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	/// The input ended in the middle of a field.
	#[error("unexpected end of input")]
	Truncated,
	/// A complete record was read but input remained.
	#[error("{0} unexpected trailing bytes after the record")]
	TrailingData(usize),
	/// A name was not a valid fully-qualified domain name.
	#[error("invalid domain name {0:?} (names must be fully qualified, ending in '.')")]
	InvalidName(String),
	/// The record type is unknown or not one we accept.
	#[error("unsupported record type {0}")]
	UnsupportedType(String),
	/// Only the IN class is served.
	#[error("unsupported record class {0}")]
	UnsupportedClass(String),
	/// The type-specific record data was malformed.
	#[error("invalid {ty} record data: {reason}")]
	InvalidData {
		/// The record type mnemonic.
		ty: &'static str,
		/// What was wrong with it.
		reason: String,
	},
	/// The presentation-format text could not be tokenized or had the wrong shape.
	#[error("malformed record text: {0}")]
	Syntax(String),
	/// A DNS message (as opposed to a single record) was malformed.
	#[error("malformed DNS message: {0}")]
	Message(&'static str),
}

/// The only class we serve.
pub(crate) const CLASS_IN: u16 = 1;

/// More pointers than this in one name can only be a loop.
const MAX_NAME_POINTERS: usize = 32;

pub(crate) fn read_u8(inp: &mut &[u8]) -> Result<u8, ParseError> {
	let res = *inp.first().ok_or(ParseError::Truncated)?;
	*inp = &inp[1..];
	Ok(res)
}
pub(crate) fn read_u16(inp: &mut &[u8]) -> Result<u16, ParseError> {
	if inp.len() < 2 { return Err(ParseError::Truncated); }
	let mut bytes = [0; 2];
	bytes.copy_from_slice(&inp[..2]);
	*inp = &inp[2..];
	Ok(u16::from_be_bytes(bytes))
}
pub(crate) fn read_u32(inp: &mut &[u8]) -> Result<u32, ParseError> {
	if inp.len() < 4 { return Err(ParseError::Truncated); }
	let mut bytes = [0; 4];
	bytes.copy_from_slice(&inp[..4]);
	*inp = &inp[4..];
	Ok(u32::from_be_bytes(bytes))
}

/// Reads a name, following compression pointers into `wire_packet` if one is given.
///
/// On return `inp` is positioned just after the name as it appeared in `inp`, i.e. after the
/// first pointer if there was one.
pub(crate) fn read_wire_packet_name(inp: &mut &[u8], wire_packet: Option<&[u8]>) -> Result<Name, ParseError> {
	let mut name = String::with_capacity(64);
	let mut read: &[u8] = *inp;
	let mut pointers_followed = 0;
	loop {
		let len = read_u8(&mut read)?;
		if len & 0b1100_0000 == 0b1100_0000 {
			let packet = wire_packet
				.ok_or_else(|| ParseError::InvalidName("compressed name outside of a message".to_owned()))?;
			let offset = (((len & 0b0011_1111) as usize) << 8) | read_u8(&mut read)? as usize;
			if pointers_followed == 0 { *inp = &inp[inp.len() - read.len()..]; }
			pointers_followed += 1;
			if pointers_followed > MAX_NAME_POINTERS { return Err(ParseError::Message("name compression loop")); }
			read = packet.get(offset..).ok_or(ParseError::Message("name pointer out of bounds"))?;
			continue;
		}
		if len > 63 { return Err(ParseError::InvalidName(format!("label length {}", len))); }
		if len == 0 {
			if name.is_empty() { name += "."; }
			break;
		}
		let len = len as usize;
		if read.len() < len { return Err(ParseError::Truncated); }
		let label = core::str::from_utf8(&read[..len])
			.map_err(|_| ParseError::InvalidName(String::from_utf8_lossy(&read[..len]).into_owned()))?;
		if label.contains('.') { return Err(ParseError::InvalidName(label.to_owned())); }
		name += label;
		name += ".";
		read = &read[len..];
		if name.len() > 254 { return Err(ParseError::InvalidName(name)); }
	}
	if pointers_followed == 0 { *inp = &inp[inp.len() - read.len()..]; }
	name.try_into()
}

pub(crate) trait Writer { fn write(&mut self, buf: &[u8]); }
impl Writer for Vec<u8> { fn write(&mut self, buf: &[u8]) { self.extend_from_slice(buf); } }
pub(crate) fn write_name<W: Writer>(out: &mut W, name: &str) {
	let canonical_name = name.to_ascii_lowercase();
	if canonical_name == "." {
		out.write(&[0]);
	} else {
		for label in canonical_name.split('.') {
			out.write(&(label.len() as u8).to_be_bytes());
			out.write(label.as_bytes());
		}
	}
}
pub(crate) fn name_len(name: &Name) -> u16 {
	if name.as_str() == "." {
		1
	} else {
		let mut res = 0;
		for label in name.split('.') {
			res += 1 + label.len();
		}
		res as u16
	}
}

/// Writes a full record, with name, type, class, TTL and data, in wire format.
pub fn write_rr(rr: &RR, ttl: u32, out: &mut Vec<u8>) {
	write_name(out, rr.name());
	out.extend_from_slice(&rr.ty().code().to_be_bytes());
	out.extend_from_slice(&CLASS_IN.to_be_bytes());
	out.extend_from_slice(&ttl.to_be_bytes());
	rr.write_u16_len_prefixed_data(out);
}

fn parse_rr_inner(inp: &mut &[u8], wire_packet: Option<&[u8]>) -> Result<(RR, u32), ParseError> {
	let name = read_wire_packet_name(inp, wire_packet)?;
	let ty = read_u16(inp)?;
	let class = read_u16(inp)?;
	if class != CLASS_IN { return Err(ParseError::UnsupportedClass(class.to_string())); }
	let ttl = read_u32(inp)?;
	let data_len = read_u16(inp)? as usize;
	if inp.len() < data_len { return Err(ParseError::Truncated); }
	let data = &inp[..data_len];
	*inp = &inp[data_len..];

	let ty = RecordType::from_code(ty).ok_or_else(|| ParseError::UnsupportedType(ty.to_string()))?;
	Ok((RR::read_from_data(ty, name, data, wire_packet)?, ttl))
}

/// Reads one stand-alone wire-format record (which may not use name compression), returning it
/// and its TTL.
pub(crate) fn parse_rr(inp: &mut &[u8]) -> Result<(RR, u32), ParseError> {
	parse_rr_inner(inp, None)
}

/// Reads one record out of the answer section of `wire_packet`.
pub(crate) fn parse_wire_packet_rr(inp: &mut &[u8], wire_packet: &[u8]) -> Result<(RR, u32), ParseError> {
	parse_rr_inner(inp, Some(wire_packet))
}

/// One whitespace-separated field of presentation-format text, with escapes decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextToken {
	pub(crate) data: Vec<u8>,
	/// Whether any backslash escape was decoded into `data`.
	pub(crate) escaped: bool,
}
impl core::ops::Deref for TextToken {
	type Target = [u8];
	fn deref(&self) -> &[u8] { &self.data }
}

/// Splits one line of presentation-format text into tokens.
///
/// Tokens are separated by whitespace. Double quotes group a token which may contain whitespace.
/// A backslash escapes the next character, and `\DDD` gives a byte in decimal. Line breaks outside
/// quotes are refused, since a submission holds a single record.
pub(crate) fn tokenize_text(line: &[u8]) -> Result<Vec<TextToken>, ParseError> {
	let mut tokens = Vec::new();
	let mut input = line;
	while let [first, rest @ ..] = input {
		if !first.is_ascii_whitespace() { break; }
		input = rest;
	}
	while let [rest @ .., last] = input {
		if !last.is_ascii_whitespace() { break; }
		input = rest;
	}

	let mut pos = 0;
	while pos < input.len() {
		let c = input[pos];
		if c == b'\n' || c == b'\r' {
			return Err(ParseError::Syntax("expected a single record on one line".to_owned()));
		}
		if c.is_ascii_whitespace() { pos += 1; continue; }

		let quoted = c == b'"';
		if quoted { pos += 1; }
		let mut tok = Vec::new();
		let mut escaped = false;
		loop {
			let c = match input.get(pos) {
				Some(c) => *c,
				None if quoted => return Err(ParseError::Syntax("unterminated quoted string".to_owned())),
				None => break,
			};
			if quoted && c == b'"' { pos += 1; break; }
			if !quoted && (c.is_ascii_whitespace() || c == b'"') { break; }
			if c == b'\n' || c == b'\r' {
				return Err(ParseError::Syntax("line break inside a token".to_owned()));
			}
			if c == b'\\' {
				let (byte, used) = read_escape(&input[pos + 1..])?;
				tok.push(byte);
				escaped = true;
				pos += 1 + used;
				continue;
			}
			tok.push(c);
			pos += 1;
		}
		tokens.push(TextToken { data: tok, escaped });
	}
	Ok(tokens)
}

/// Decodes the part of an escape sequence after the backslash.
fn read_escape(after: &[u8]) -> Result<(u8, usize), ParseError> {
	match after {
		[a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
			let val = (a - b'0') as u16 * 100 + (b - b'0') as u16 * 10 + (c - b'0') as u16;
			let byte = u8::try_from(val)
				.map_err(|_| ParseError::Syntax(format!("escape \\{:03} out of range", val)))?;
			Ok((byte, 3))
		},
		[d, ..] if d.is_ascii_digit() => Err(ParseError::Syntax("\\DDD escapes need three digits".to_owned())),
		[c, ..] if *c != b'\n' && *c != b'\r' => Ok((*c, 1)),
		_ => Err(ParseError::Syntax("dangling escape".to_owned())),
	}
}

/// Writes `data` as a quoted character-string, escaping anything which is not printable.
pub(crate) fn write_quoted_text(out: &mut String, data: &[u8]) {
	out.push('"');
	for &b in data {
		match b {
			b'"' | b'\\' => { out.push('\\'); out.push(b as char); },
			0x20..=0x7e => out.push(b as char),
			_ => *out += &format!("\\{:03}", b),
		}
	}
	out.push('"');
}

pub(crate) fn text_token_str(tok: &[u8]) -> Result<&str, ParseError> {
	core::str::from_utf8(tok).map_err(|_| ParseError::Syntax("non-UTF-8 token".to_owned()))
}

/// Reads a name-valued field. Escapes are refused, as they could hide or add a label separator.
pub(crate) fn text_token_name(tok: &TextToken) -> Result<Name, ParseError> {
	let s = text_token_str(tok)?;
	if tok.escaped { return Err(ParseError::InvalidName(s.to_owned())); }
	s.try_into()
}

pub(crate) fn text_token_u16(ty: RecordType, tok: &[u8]) -> Result<u16, ParseError> {
	let s = text_token_str(tok)?;
	s.parse().map_err(|_| ParseError::InvalidData {
		ty: ty.mnemonic(), reason: format!("{:?} is not a number between 0 and 65535", s),
	})
}

/// Reads one presentation-format record: `<name> <ttl> [IN] <type> <data...>`.
pub(crate) fn parse_rr_text(line: &[u8]) -> Result<(RR, u32), ParseError> {
	let tokens = tokenize_text(line)?;
	let mut fields = tokens.iter();
	let name_tok = fields.next().ok_or_else(|| ParseError::Syntax("missing name".to_owned()))?;
	let name = text_token_name(name_tok)?;
	let mut next_field = |what: &str| fields.next()
		.ok_or_else(|| ParseError::Syntax(format!("missing {}", what)))
		.and_then(|tok| text_token_str(tok));

	let ttl_str = next_field("TTL")?;
	let ttl: u32 = ttl_str.parse()
		.map_err(|_| ParseError::Syntax(format!("TTL {:?} is not a number", ttl_str)))?;
	let mut ty_str = next_field("type")?;
	if ty_str.eq_ignore_ascii_case("IN") {
		ty_str = next_field("type")?;
	} else if ["CH", "CS", "HS"].iter().any(|class| ty_str.eq_ignore_ascii_case(class)) {
		return Err(ParseError::UnsupportedClass(ty_str.to_owned()));
	}
	let ty: RecordType = ty_str.parse()?;
	let consumed = tokens.len() - fields.len();
	Ok((RR::read_from_text(ty, name, &tokens[consumed..])?, ttl))
}

/// Writes one presentation-format record, in the form the record text parser reads.
pub fn write_rr_text(rr: &RR, ttl: u32) -> String {
	let mut out = format!("{} {} IN {} ", rr.name(), ttl, rr.ty());
	rr.write_text_data(&mut out);
	out
}
