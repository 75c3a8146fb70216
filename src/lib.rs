//! # pathops - Uniform Local and Remote Path Operations
//!
//! One path API for files on this host and files reachable through a
//! file-control daemon on a Unix socket. Code written against [`PathOps`]
//! behaves the same on both backends: same operations, same error kinds.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pathops::{Encoding, LocalPath, PathOps, RemoteConfig, RemoteRoot, WriteOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let local = LocalPath::new("/tmp/app.conf");
//!     local.write_text("debug = true\n", Encoding::Utf8, &WriteOptions::new())?;
//!
//!     let root = RemoteRoot::connect(RemoteConfig::new("/run/files.socket"))?;
//!     let remote = root.path("/etc/app.conf")?;
//!     remote.write_bytes(&local.read_bytes()?, &WriteOptions::new().mode(0o600))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Backend-Independent Code
//!
//! ```rust,ignore
//! use pathops::{functions, AnyPath, PathOps, WriteOptions};
//!
//! fn deploy(target: &AnyPath) -> pathops::PathResult<bool> {
//!     functions::ensure_contents(&target.join("app.conf"), "debug = true\n", &WriteOptions::new())
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod functions;
pub mod glob;
pub mod local;
pub mod logging;
pub mod metadata;
pub mod path;
pub mod protocol;
pub mod pure;
pub mod remote;

// Re-export commonly used types and functions
pub use config::RemoteConfig;
pub use encoding::Encoding;
pub use error::{ConfigError, ErrorKind, PathError, PathResult};
pub use functions::{ensure_contents, get_fileinfo, rm};
pub use glob::Glob;
pub use local::LocalPath;
pub use metadata::{FileKind, FileMetadata};
pub use path::{AnyPath, DirEntries, ListedEntry, MkdirOptions, PathOps, WriteOptions};
pub use pure::PosixPath;
pub use remote::{RemotePath, RemoteRoot};

// vim: ts=4
