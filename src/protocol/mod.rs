//! File-control daemon protocol
//!
//! The remote backend talks to the daemon only through [`Client`]. Wire
//! framing lives in [`wire`], JSON shapes in [`types`], and the mapping of
//! daemon failures onto [`ErrorKind`](crate::error::ErrorKind) in [`error`].
//!
//! ```ignore
//! use pathops::protocol::Client;
//!
//! let client = Client::connect(RemoteConfig::new("/run/files.socket"))?;
//! let info = client.stat("/etc/hosts", true)?;
//! let data = client.read_file("/etc/hosts")?;
//! ```

pub mod client;
pub mod error;
pub mod types;
pub mod wire;

pub use client::{Client, WriteAttrs};
pub use error::{taxonomy_kind, wire_kind, wire_kind_for, ProtocolError};
pub use types::{Envelope, EnvelopeKind, ErrorResult, FileInfo, FilesRequest, MakeDirItem, RemoveItem};
pub use wire::{Method, Request, Response};

// vim: ts=4
