//! The network front door: authoritative DNS over UDP, and a small HTTP/1.1 API for managing
//! records.
//!
//! Both listeners are thin. All record handling happens in [`Resolver`] and [`Submissions`], which
//! are called on tokio's blocking pool since the store blocks.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio_crate as tokio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, error, info, warn};

use crate::guard::RootZone;
use crate::message::*;
use crate::pipeline::{SubmitError, Submissions};
use crate::resolver::{Lookup, Resolver};
use crate::rr::Name;
use crate::ser::CLASS_IN;
use crate::store::{RecordId, RecordView, StoredRecord};

const CLASS_ANY: u16 = 255;
/// Opcode bits in the high byte of the header flags.
const OPCODE_BITS: u8 = 0x78;

const MAX_DATAGRAM: usize = 4096;
const MAX_HEAD: usize = 8 * 1024;
const MAX_BODY: usize = 64 * 1024;

/// Answers DNS queries arriving on `socket` until the task is dropped.
pub async fn run_dns(socket: UdpSocket, resolver: Arc<Resolver>, zone: RootZone) {
	let socket = Arc::new(socket);
	let zone = Arc::new(zone);
	if let Ok(addr) = socket.local_addr() {
		info!("Serving DNS for {} on {}", zone.apex(), addr);
	}

	let mut buf = [0; MAX_DATAGRAM];
	loop {
		let (len, peer) = match socket.recv_from(&mut buf).await {
			Ok(res) => res,
			Err(e) => {
				warn!("Failed to receive DNS datagram: {}", e);
				continue;
			},
		};
		let packet = buf[..len].to_vec();
		let (socket, resolver, zone) = (Arc::clone(&socket), Arc::clone(&resolver), Arc::clone(&zone));
		tokio::spawn(async move {
			match tokio::task::spawn_blocking(move || respond(&resolver, &zone, &packet)).await {
				Ok(Some(response)) => {
					if let Err(e) = socket.send_to(&response, peer).await {
						warn!("Failed to send DNS response to {}: {}", peer, e);
					}
				},
				Ok(None) => debug!("Dropping DNS packet from {}", peer),
				Err(e) => error!("DNS handler failed: {}", e),
			}
		});
	}
}

/// Works out the reply to one DNS packet, or `None` if it should be dropped.
fn respond(resolver: &Resolver, zone: &RootZone, packet: &[u8]) -> Option<Vec<u8>> {
	let query = match parse_query(packet) {
		Ok(query) => query,
		Err(e) => {
			debug!("Unparseable DNS query: {}", e);
			let rcode = match packet.get(2) {
				Some(flags) if flags & OPCODE_BITS != 0 => Rcode::NotImp,
				_ => Rcode::FormErr,
			};
			return build_error_response(packet, rcode);
		},
	};
	if query.opcode != 0 {
		return Some(build_response(&query, Rcode::NotImp, &[]));
	}
	debug!("DNS question {} type {}", query.name, query.qtype);
	let (rcode, answers) = answer(resolver, zone, &query);
	Some(build_response(&query, rcode, &answers))
}

fn answer(resolver: &Resolver, zone: &RootZone, query: &Query) -> (Rcode, Vec<StoredRecord>) {
	if (query.qclass != CLASS_IN && query.qclass != CLASS_ANY) || !zone.contains(&query.name) {
		return (Rcode::Refused, Vec::new());
	}
	let lookup = match query.record_type() {
		Some(ty) => resolver.lookup(&query.name, ty),
		None => resolver.exists(&query.name)
			.map(|exists| if exists { Lookup::NoData } else { Lookup::NxDomain }),
	};
	match lookup {
		Ok(Lookup::Answer(records)) => (Rcode::NoError, records),
		Ok(Lookup::NoData) => (Rcode::NoError, Vec::new()),
		Ok(Lookup::NxDomain) if &query.name == zone.apex() => (Rcode::NoError, Vec::new()),
		Ok(Lookup::NxDomain) => (Rcode::NxDomain, Vec::new()),
		Err(e) => {
			error!("Lookup of {} failed: {}", query.name, e);
			(Rcode::ServFail, Vec::new())
		},
	}
}

/// Serves the management API on `listener` until the task is dropped.
///
/// Routes:
///  * `GET /domains/<name>` lists the records at a name
///  * `POST /records/new` creates a record from the request body
///  * `POST /records/<id>` replaces a record from the request body
///  * `DELETE /records/<id>` deletes a record
pub async fn run_http(listener: TcpListener, submissions: Arc<Submissions>) {
	if let Ok(addr) = listener.local_addr() {
		info!("Serving HTTP API on {}", addr);
	}
	loop {
		let (socket, peer) = match listener.accept().await {
			Ok(res) => res,
			Err(e) => {
				warn!("Failed to accept new TCP connection: {}", e);
				continue;
			},
		};
		tokio::spawn(handle_connection(socket, peer, Arc::clone(&submissions)));
	}
}

struct Request {
	method: String,
	path: String,
	body: Vec<u8>,
}

struct HttpResponse {
	status: &'static str,
	content_type: &'static str,
	body: Vec<u8>,
}

impl HttpResponse {
	fn text<S: Into<String>>(status: &'static str, msg: S) -> Self {
		HttpResponse { status, content_type: "text/plain", body: msg.into().into_bytes() }
	}

	fn empty(status: &'static str) -> Self {
		HttpResponse { status, content_type: "text/plain", body: Vec::new() }
	}

	fn json<T: Serialize>(value: &T) -> Self {
		match serde_json::to_vec(value) {
			Ok(body) => HttpResponse { status: "200 OK", content_type: "application/json", body },
			Err(e) => {
				error!("Failed to serialize response: {}", e);
				HttpResponse::text("500 Internal Server Error", "Internal error")
			},
		}
	}

	fn to_bytes(&self) -> Vec<u8> {
		let mut out = format!("HTTP/1.1 {}\r\n", self.status);
		// 204 must not carry a body or its length.
		if !self.status.starts_with("204") {
			out += &format!("Content-Length: {}\r\nContent-Type: {}\r\n", self.body.len(), self.content_type);
		}
		out += "Access-Control-Allow-Origin: *\r\n";
		out += "Access-Control-Allow-Methods: GET, POST, DELETE, OPTIONS\r\n";
		out += "Access-Control-Allow-Headers: Content-Type\r\n";
		out += "Connection: close\r\n\r\n";
		let mut out = out.into_bytes();
		out.extend_from_slice(&self.body);
		out
	}
}

fn bad_request(msg: &'static str) -> HttpResponse {
	HttpResponse::text("400 Bad Request", msg)
}

fn submit_error(e: SubmitError) -> HttpResponse {
	let status = match e {
		SubmitError::Parse(_) => "400 Bad Request",
		SubmitError::Rejected(_) => "403 Forbidden",
		SubmitError::NotFound(_) => "404 Not Found",
		SubmitError::Store(_) => "500 Internal Server Error",
	};
	HttpResponse::text(status, e.to_string())
}

async fn handle_connection(mut socket: TcpStream, peer: SocketAddr, submissions: Arc<Submissions>) {
	let response = match read_request(&mut socket).await {
		Ok(Some(request)) => {
			debug!("{} {} from {}", request.method, request.path, peer);
			match tokio::task::spawn_blocking(move || route(&submissions, &request)).await {
				Ok(response) => response,
				Err(e) => {
					error!("HTTP handler failed: {}", e);
					HttpResponse::text("500 Internal Server Error", "Internal error")
				},
			}
		},
		Ok(None) => return,
		Err(response) => response,
	};
	let _ = socket.write_all(&response.to_bytes()).await;
}

/// Reads one request. `Ok(None)` means the client went away before sending one.
async fn read_request(socket: &mut TcpStream) -> Result<Option<Request>, HttpResponse> {
	let mut buf = Vec::with_capacity(1024);
	let mut chunk = [0; 4096];
	let head_len = loop {
		if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") { break pos; }
		if buf.len() > MAX_HEAD {
			return Err(HttpResponse::text("431 Request Header Fields Too Large", "Request headers too large"));
		}
		match socket.read(&mut chunk).await {
			Ok(0) | Err(_) => return Ok(None),
			Ok(len) => buf.extend_from_slice(&chunk[..len]),
		}
	};

	let head = core::str::from_utf8(&buf[..head_len]).map_err(|_| bad_request("Request is not UTF-8"))?;
	let mut lines = head.split("\r\n");
	let mut parts = lines.next().unwrap_or("").split(' ');
	let (method, target, http_vers) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(method), Some(target), Some(http_vers), None) => (method, target, http_vers),
		_ => return Err(bad_request("Malformed request line")),
	};
	if http_vers != "HTTP/1.1" && http_vers != "HTTP/1.0" {
		return Err(bad_request("Unsupported HTTP version"));
	}

	let mut content_length = 0;
	for line in lines {
		let (key, value) = line.split_once(':').ok_or_else(|| bad_request("Malformed header"))?;
		if key.trim().eq_ignore_ascii_case("content-length") {
			content_length = value.trim().parse().map_err(|_| bad_request("Invalid Content-Length"))?;
		} else if key.trim().eq_ignore_ascii_case("transfer-encoding") {
			return Err(HttpResponse::text("501 Not Implemented", "Transfer-Encoding is not supported"));
		}
	}
	if content_length > MAX_BODY {
		return Err(HttpResponse::text("413 Payload Too Large", "Request body too large"));
	}

	let mut body = buf[head_len + 4..].to_vec();
	while body.len() < content_length {
		match socket.read(&mut chunk).await {
			Ok(0) | Err(_) => return Err(bad_request("Request body ended early")),
			Ok(len) => body.extend_from_slice(&chunk[..len]),
		}
	}
	body.truncate(content_length);

	let path = target.split_once('?').map_or(target, |(path, _)| path);
	Ok(Some(Request { method: method.to_owned(), path: path.to_owned(), body }))
}

fn route(submissions: &Submissions, request: &Request) -> HttpResponse {
	let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
	match (request.method.as_str(), segments.as_slice()) {
		("OPTIONS", _) => HttpResponse::empty("204 No Content"),
		("GET", ["domains", name]) => {
			let name = if name.ends_with('.') { Name::try_from(*name) } else { Name::try_from(format!("{}.", name)) };
			let name = match name {
				Ok(name) => name,
				Err(e) => return HttpResponse::text("400 Bad Request", e.to_string()),
			};
			match submissions.list_by_name(&name) {
				Ok(records) => HttpResponse::json(&records.iter().map(StoredRecord::view).collect::<Vec<RecordView>>()),
				Err(e) => submit_error(e),
			}
		},
		("POST", ["records", "new"]) => match submissions.submit(&request.body) {
			Ok(stored) => HttpResponse::json(&stored.view()),
			Err(e) => submit_error(e),
		},
		("POST", ["records", id]) => {
			let id: RecordId = match id.parse() { Ok(id) => id, Err(_) => return bad_request("Invalid record id") };
			match submissions.resubmit(id, &request.body) {
				Ok(stored) => HttpResponse::json(&stored.view()),
				Err(e) => submit_error(e),
			}
		},
		("DELETE", ["records", id]) => {
			let id: RecordId = match id.parse() { Ok(id) => id, Err(_) => return bad_request("Invalid record id") };
			match submissions.remove(id) {
				Ok(()) => HttpResponse::empty("200 OK"),
				Err(e) => submit_error(e),
			}
		},
		_ => HttpResponse::text("404 Not Found", "Not Found"),
	}
}
