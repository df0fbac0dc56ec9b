//! An authoritative DNS server for a shared playground zone.
//!
//! Anyone may create, change or delete records anywhere under a single root zone (by default
//! `messwithdns.com.`), and the server answers DNS queries for them immediately.
//!
//! The write path runs a submission through the [`codec`], the [`guard`] which keeps it inside
//! the root zone, and finally the [`store`]. It is exposed as [`pipeline::Submissions`]. The read
//! path is the [`resolver`], which answers exact-match questions straight from the store.
//!
//! Most of the crate has no I/O at all. Networking is feature-gated:
//!  * The `tokio` feature (on by default) enables the [`server`] module, serving DNS over UDP and
//!    a small HTTP API to manage records.
//!  * The crate can be built as a binary using the `build_server` feature, configured through the
//!    environment variables described in [`config`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod rr;
pub mod ser;
pub mod codec;
pub mod guard;
pub mod store;
pub mod resolver;
pub mod pipeline;
pub mod message;
pub mod config;

#[cfg(feature = "tokio")]
pub mod server;
