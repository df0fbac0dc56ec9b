//! Whole DNS messages, as exchanged with resolvers over UDP.
//!
//! We only ever answer: [`parse_query`] reads an inbound question and [`build_response`] writes
//! the authoritative answer for it. [`build_query`] and [`parse_response`] are the client side,
//! used to talk to a running server.

use core::cmp;

use crate::codec::ResourceRecord;
use crate::rr::{Name, RecordType};
use crate::ser::*;
use crate::store::StoredRecord;

const FLAG_QR: u16 = 0x8000;
const OPCODE_MASK: u16 = 0x7800;
const FLAG_AA: u16 = 0x0400;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const RCODE_MASK: u16 = 0x000f;

const TYPE_OPT: u16 = 41;
/// Largest response sent to a client which did not advertise a size with EDNS.
const MAX_UDP_PAYLOAD: u16 = 512;
/// The UDP payload size we advertise ourselves.
const EDNS_PAYLOAD: u16 = 1232;
const OPT_LEN: usize = 11;

/// A response code, as carried in the low four bits of the header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
	/// The question was answered, possibly with no records.
	NoError,
	/// The query could not be understood.
	FormErr,
	/// We failed to look the answer up.
	ServFail,
	/// Nothing exists at the queried name.
	NxDomain,
	/// The query's opcode is not supported.
	NotImp,
	/// We are not authoritative for the queried name.
	Refused,
}
impl Rcode {
	/// The numeric code.
	pub const fn code(self) -> u8 {
		match self {
			Rcode::NoError => 0,
			Rcode::FormErr => 1,
			Rcode::ServFail => 2,
			Rcode::NxDomain => 3,
			Rcode::NotImp => 4,
			Rcode::Refused => 5,
		}
	}
	/// Maps a numeric code back, if it is one of ours.
	pub fn from_code(code: u8) -> Option<Rcode> {
		[Rcode::NoError, Rcode::FormErr, Rcode::ServFail, Rcode::NxDomain, Rcode::NotImp, Rcode::Refused]
			.into_iter().find(|rcode| rcode.code() == code)
	}
}

/// A parsed inbound query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
	/// Transaction id, echoed in the response.
	pub id: u16,
	/// The four-bit opcode. Only 0 (QUERY) is served.
	pub opcode: u8,
	/// Whether the client asked for recursion, echoed in the response.
	pub recursion_desired: bool,
	/// The queried name.
	pub name: Name,
	/// The queried type code, which may be one we do not store.
	pub qtype: u16,
	/// The queried class code.
	pub qclass: u16,
	/// The UDP payload size the client advertised in an EDNS OPT record, if it sent one.
	pub edns: Option<u16>,
	/// The question name as the client sent it, since some resolvers check its case is echoed.
	echo_name: Vec<u8>,
}
impl Query {
	/// The queried type, if it is one we can hold records of.
	pub fn record_type(&self) -> Option<RecordType> { RecordType::from_code(self.qtype) }
}

/// A parsed response, as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	/// Transaction id.
	pub id: u16,
	/// The response code.
	pub rcode: Rcode,
	/// Whether the AA bit was set.
	pub authoritative: bool,
	/// Whether the TC bit was set.
	pub truncated: bool,
	/// The records in the answer section, with their TTLs.
	pub answers: Vec<ResourceRecord>,
}

fn write_opt(out: &mut Vec<u8>) {
	out.push(0); // Root name
	out.extend_from_slice(&TYPE_OPT.to_be_bytes());
	out.extend_from_slice(&EDNS_PAYLOAD.to_be_bytes());
	out.extend_from_slice(&[0, 0, 0, 0]); // Extended rcode, EDNS version 0, no flags
	out.extend_from_slice(&0u16.to_be_bytes()); // No options
}

/// Parses a query message with exactly one question.
pub fn parse_query(packet: &[u8]) -> Result<Query, ParseError> {
	let mut read: &[u8] = packet;
	let id = read_u16(&mut read)?;
	let flags = read_u16(&mut read)?;
	if flags & FLAG_QR != 0 { return Err(ParseError::Message("not a query")); }
	let questions = read_u16(&mut read)?;
	let answers = read_u16(&mut read)?;
	let authorities = read_u16(&mut read)?;
	let additional = read_u16(&mut read)?;
	if questions != 1 { return Err(ParseError::Message("expected exactly one question")); }

	let name_start = read;
	let name = read_wire_packet_name(&mut read, Some(packet))?;
	let consumed = name_start.len() - read.len();
	// The lengths only agree when no compression pointer was followed.
	let echo_name = if consumed == name_len(&name) as usize {
		name_start[..consumed].to_vec()
	} else {
		let mut echo_name = Vec::new();
		write_name(&mut echo_name, &name);
		echo_name
	};
	let qtype = read_u16(&mut read)?;
	let qclass = read_u16(&mut read)?;

	// Only an OPT record is of interest past the question, everything else is skipped.
	let mut edns = None;
	for _ in 0..(answers as u32 + authorities as u32 + additional as u32) {
		read_wire_packet_name(&mut read, Some(packet))?;
		let ty = read_u16(&mut read)?;
		let class = read_u16(&mut read)?;
		read_u32(&mut read)?;
		let data_len = read_u16(&mut read)? as usize;
		if read.len() < data_len { return Err(ParseError::Truncated); }
		read = &read[data_len..];
		if ty == TYPE_OPT { edns = Some(class); }
	}

	Ok(Query {
		id,
		opcode: ((flags & OPCODE_MASK) >> 11) as u8,
		recursion_desired: flags & FLAG_RD != 0,
		name, qtype, qclass, edns, echo_name,
	})
}

/// Builds the authoritative response to `query`.
///
/// Answers which do not fit in the client's UDP payload size are dropped and the TC bit is set.
pub fn build_response(query: &Query, rcode: Rcode, answers: &[StoredRecord]) -> Vec<u8> {
	let limit = query.edns.map_or(MAX_UDP_PAYLOAD, |size| cmp::max(size, MAX_UDP_PAYLOAD)) as usize;
	let mut flags = FLAG_QR | FLAG_AA | ((query.opcode as u16) << 11) | rcode.code() as u16;
	if query.recursion_desired { flags |= FLAG_RD; }

	let mut out = Vec::with_capacity(MAX_UDP_PAYLOAD as usize);
	out.extend_from_slice(&query.id.to_be_bytes());
	out.extend_from_slice(&flags.to_be_bytes());
	out.extend_from_slice(&1u16.to_be_bytes()); // One question
	out.extend_from_slice(&[0; 6]); // Answer, authority and additional counts, filled in below
	out.extend_from_slice(&query.echo_name);
	out.extend_from_slice(&query.qtype.to_be_bytes());
	out.extend_from_slice(&query.qclass.to_be_bytes());

	let reserved = if query.edns.is_some() { OPT_LEN } else { 0 };
	let mut answer_count = 0u16;
	let mut rr_buf = Vec::new();
	for stored in answers {
		rr_buf.clear();
		write_rr(&stored.record.rr, stored.record.ttl, &mut rr_buf);
		if out.len() + rr_buf.len() + reserved > limit || answer_count == u16::MAX {
			out[2] |= (FLAG_TC >> 8) as u8;
			break;
		}
		out.extend_from_slice(&rr_buf);
		answer_count += 1;
	}
	out[6..8].copy_from_slice(&answer_count.to_be_bytes());

	if query.edns.is_some() {
		write_opt(&mut out);
		out[10..12].copy_from_slice(&1u16.to_be_bytes());
	}
	out
}

/// Builds a bare response carrying only `rcode`, for a packet we could not parse as a query.
///
/// Returns `None` if there is no readable header or the packet is itself a response.
pub fn build_error_response(packet: &[u8], rcode: Rcode) -> Option<Vec<u8>> {
	let mut read: &[u8] = packet;
	let id = read_u16(&mut read).ok()?;
	let flags = read_u16(&mut read).ok()?;
	if flags & FLAG_QR != 0 { return None; }
	let flags = FLAG_QR | (flags & (OPCODE_MASK | FLAG_RD)) | rcode.code() as u16;

	let mut out = Vec::with_capacity(12);
	out.extend_from_slice(&id.to_be_bytes());
	out.extend_from_slice(&flags.to_be_bytes());
	out.extend_from_slice(&[0; 8]);
	Some(out)
}

/// Builds a recursion-desired query for `ty` records at `name`, advertising EDNS.
pub fn build_query(name: &Name, ty: RecordType, id: u16) -> Vec<u8> {
	let mut query = Vec::with_capacity(64);
	query.extend_from_slice(&id.to_be_bytes());
	query.extend_from_slice(&FLAG_RD.to_be_bytes());
	query.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1]); // One question, One additional
	write_name(&mut query, name);
	query.extend_from_slice(&ty.code().to_be_bytes());
	query.extend_from_slice(&CLASS_IN.to_be_bytes());
	write_opt(&mut query);
	query
}

/// Parses a response, returning its answer section.
///
/// Authority and additional sections are ignored.
pub fn parse_response(packet: &[u8]) -> Result<Response, ParseError> {
	let mut read: &[u8] = packet;
	let id = read_u16(&mut read)?;
	let flags = read_u16(&mut read)?;
	if flags & FLAG_QR == 0 { return Err(ParseError::Message("not a response")); }
	let rcode = Rcode::from_code((flags & RCODE_MASK) as u8).ok_or(ParseError::Message("unknown rcode"))?;
	let questions = read_u16(&mut read)?;
	let answer_count = read_u16(&mut read)?;
	let _authorities = read_u16(&mut read)?;
	let _additional = read_u16(&mut read)?;

	for _ in 0..questions {
		read_wire_packet_name(&mut read, Some(packet))?;
		read_u16(&mut read)?; // type
		read_u16(&mut read)?; // class
	}

	let mut answers = Vec::with_capacity(answer_count as usize);
	for _ in 0..answer_count {
		let (rr, ttl) = parse_wire_packet_rr(&mut read, packet)?;
		answers.push(ResourceRecord { ttl, rr });
	}

	Ok(Response {
		id,
		rcode,
		authoritative: flags & FLAG_AA != 0,
		truncated: flags & FLAG_TC != 0,
		answers,
	})
}
